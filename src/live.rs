// src/live.rs

//! Probes for the live boot environment (installer ISO / recovery system).

use std::path::{Path, PathBuf};

use crate::fs::FileSystem;

/// Where the live medium is mounted by the initramfs.
pub const LIVE_MOUNT_POINT: &str = "/run/initramfs/live";

/// Root filesystem image present on every live medium.
pub const SQUASHFS_PATH: &str = "/run/initramfs/live/LiveOS/squashfs.img";

/// Deployment description shipped on the live medium.
pub const INSTALL_DESCRIPTION: &str = "/run/initramfs/live/LiveOS/setup/install.yaml";

pub const KERNEL_CMDLINE: &str = "/proc/cmdline";

/// Kernel argument set by the recovery boot entry.
pub const RECOVERY_MARK: &str = "elemental.recovery";

/// True when running from an installer or recovery medium.
pub fn is_live_media(fs: &dyn FileSystem) -> bool {
    fs.is_file(Path::new(SQUASHFS_PATH))
}

/// True when booted from the recovery entry of a live medium.
pub fn is_recovery(fs: &dyn FileSystem) -> bool {
    if !is_live_media(fs) {
        return false;
    }
    fs.read_to_string(Path::new(KERNEL_CMDLINE))
        .map(|cmdline| cmdline.split_whitespace().any(|arg| arg == RECOVERY_MARK))
        .unwrap_or(false)
}

/// The live medium's description file, if we are on live media and it exists.
pub fn live_description(fs: &dyn FileSystem) -> Option<PathBuf> {
    let path = Path::new(INSTALL_DESCRIPTION);
    (is_live_media(fs) && fs.is_file(path)).then(|| path.to_path_buf())
}
