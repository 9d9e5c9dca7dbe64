// src/deployment/mod.rs

//! The deployment descriptor: everything an install or reset needs to know
//! about disks, boot, security and where the OS comes from.
//!
//! Lifecycle:
//! - [`default_deployment`] produces the standard layout,
//! - [`loader::load_description_file`] merges a YAML description over it,
//! - the flag overlay in [`crate::resolve`] applies CLI overrides,
//! - [`Deployment::sanitize`] validates the result before any engine sees it.

use serde::{Deserialize, Serialize};

use crate::platform::Platform;
use crate::types::{
    BootloaderKind, CryptoPolicy, FileSystemKind, PartitionRole, SnapshotterKind,
};

pub mod loader;
pub mod sanitize;
pub mod source;

pub use loader::load_description_file;
pub use source::ImageSource;

/// Kernel parameter enabling FIPS mode.
pub const FIPS_CMDLINE: &str = "fips=1";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    #[serde(default, rename = "sourceOS", skip_serializing_if = "Option::is_none")]
    pub source_os: Option<ImageSource>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overlay_tree: Option<ImageSource>,

    /// Post-commit configuration script run inside the new OS tree.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_script: Option<String>,

    #[serde(default)]
    pub disks: Vec<Disk>,

    #[serde(default)]
    pub boot_config: BootConfig,

    #[serde(default)]
    pub security: Security,

    #[serde(default)]
    pub snapshotter: Snapshotter,

    #[serde(default)]
    pub firmware: Firmware,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Disk {
    /// Block device, e.g. `/dev/sda`. Empty until a target is chosen.
    #[serde(default, rename = "target")]
    pub device: String,

    #[serde(default)]
    pub partitions: Vec<Partition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Partition {
    #[serde(default)]
    pub label: String,

    #[serde(rename = "function")]
    pub role: PartitionRole,

    pub file_system: FileSystemKind,

    /// Size in MiB; `0` takes the remaining space of the disk.
    #[serde(default)]
    pub size: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mount_point: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rw_volumes: Vec<RwVolume>,
}

/// Read-write subvolume carved out of the (otherwise read-only) system tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RwVolume {
    pub path: String,

    #[serde(default)]
    pub snapshotted: bool,

    #[serde(default)]
    pub no_copy_on_write: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mount_opts: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BootConfig {
    #[serde(default)]
    pub bootloader: BootloaderKind,

    #[serde(default)]
    pub kernel_cmdline: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Security {
    #[serde(default)]
    pub crypto_policy: CryptoPolicy,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshotter {
    #[serde(default)]
    pub name: SnapshotterKind,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Firmware {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub boot_entries: Vec<EfiBootEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EfiBootEntry {
    pub label: String,
    pub loader: String,
    pub disk: String,
}

impl EfiBootEntry {
    /// Shim entry for the given platform on `disk`.
    pub fn default_for(platform: &Platform, disk: &str) -> Self {
        Self {
            label: "elemental-shim".to_string(),
            loader: format!("\\EFI\\ELEMENTAL\\shim{}.efi", platform.arch.efi_suffix()),
            disk: disk.to_string(),
        }
    }
}

impl Partition {
    pub fn new(label: &str, role: PartitionRole, file_system: FileSystemKind) -> Self {
        Self {
            label: label.to_string(),
            role,
            file_system,
            size: 0,
            mount_point: None,
            rw_volumes: Vec::new(),
        }
    }
}

impl RwVolume {
    fn at(path: &str) -> Self {
        Self {
            path: path.to_string(),
            ..Self::default()
        }
    }
}

impl Deployment {
    /// First disk holding a system partition.
    pub fn system_disk(&self) -> Option<&Disk> {
        self.disks
            .iter()
            .find(|d| d.partitions.iter().any(|p| p.role == PartitionRole::System))
    }

    pub fn system_disk_mut(&mut self) -> Option<&mut Disk> {
        self.disks
            .iter_mut()
            .find(|d| d.partitions.iter().any(|p| p.role == PartitionRole::System))
    }

    pub fn system_partition(&self) -> Option<&Partition> {
        self.partitions().find(|p| p.role == PartitionRole::System)
    }

    pub fn system_partition_mut(&mut self) -> Option<&mut Partition> {
        self.disks
            .iter_mut()
            .flat_map(|d| d.partitions.iter_mut())
            .find(|p| p.role == PartitionRole::System)
    }

    /// All partitions of all disks, in order.
    pub fn partitions(&self) -> impl Iterator<Item = &Partition> {
        self.disks.iter().flat_map(|d| d.partitions.iter())
    }

    pub fn is_fips_enabled(&self) -> bool {
        self.security.crypto_policy == CryptoPolicy::Fips
    }
}

/// Append the FIPS kernel parameter unless it is already there.
pub fn append_fips_cmdline(cmdline: &str) -> String {
    if cmdline.split_whitespace().any(|arg| arg == FIPS_CMDLINE) {
        return cmdline.to_string();
    }
    let trimmed = cmdline.trim();
    if trimmed.is_empty() {
        FIPS_CMDLINE.to_string()
    } else {
        format!("{trimmed} {FIPS_CMDLINE}")
    }
}

/// Standard single-disk layout: an ESP plus a btrfs system partition taking
/// the rest of the disk, grub, snapper and the default crypto policy.
pub fn default_deployment() -> Deployment {
    let mut efi = Partition::new("EFI", PartitionRole::Efi, FileSystemKind::Vfat);
    efi.size = 1024;
    efi.mount_point = Some("/boot/efi".to_string());

    let mut system = Partition::new("SYSTEM", PartitionRole::System, FileSystemKind::Btrfs);
    system.mount_point = Some("/".to_string());
    system.rw_volumes = vec![
        RwVolume {
            no_copy_on_write: true,
            ..RwVolume::at("/var")
        },
        RwVolume {
            snapshotted: true,
            ..RwVolume::at("/etc")
        },
        RwVolume::at("/root"),
        RwVolume::at("/opt"),
        RwVolume::at("/srv"),
        RwVolume::at("/home"),
    ];

    Deployment {
        disks: vec![Disk {
            device: String::new(),
            partitions: vec![efi, system],
        }],
        boot_config: BootConfig {
            bootloader: BootloaderKind::Grub,
            kernel_cmdline: String::new(),
        },
        security: Security::default(),
        snapshotter: Snapshotter {
            name: SnapshotterKind::Snapper,
        },
        ..Deployment::default()
    }
}
