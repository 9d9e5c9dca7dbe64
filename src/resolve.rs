// src/resolve.rs

//! Turns CLI flags plus description files into a validated [`Deployment`].
//!
//! Both `install` and `reset` end in the same overlay + sanitize step; they
//! only differ in where the starting descriptor comes from and how the target
//! disk is chosen.

use std::path::Path;

use tracing::{debug, info, warn};

use crate::block;
use crate::cli::{DeploymentFlags, InstallFlags, ResetFlags};
use crate::deployment::{
    append_fips_cmdline, default_deployment, load_description_file, Deployment, EfiBootEntry,
    ImageSource,
};
use crate::errors::{ElementalError, Result};
use crate::live;
use crate::sys::System;
use crate::types::{BootloaderKind, FileSystemKind, SnapshotterKind};

/// Descriptor for a fresh install.
///
/// An explicit `--description` must load. Otherwise the live medium's
/// description is used when present, and the standard layout when not.
pub fn resolve_install(system: &System, flags: &InstallFlags) -> Result<Deployment> {
    let mut d = default_deployment();

    if let Some(path) = &flags.deployment.description {
        load_description_file(system.fs(), path, &mut d)?;
    } else if let Some(path) = live::live_description(system.fs()) {
        load_description_file(system.fs(), &path, &mut d)?;
    } else {
        debug!("no description file given, using default deployment");
    }

    apply_flags(system, &mut d, flags.target.as_deref(), &flags.deployment)?;
    Ok(d)
}

/// Descriptor for a factory reset from the recovery system.
///
/// Reset starts from an empty descriptor: the layout must come from a
/// description file, never from built-in defaults.
pub async fn resolve_reset(system: &System, flags: &ResetFlags) -> Result<Deployment> {
    if !live::is_recovery(system.fs()) {
        return Err(ElementalError::Precondition(
            "reset command requires booting from recovery system".to_string(),
        ));
    }

    let mut d = Deployment::default();
    let path = flags
        .deployment
        .description
        .as_deref()
        .unwrap_or(Path::new(live::INSTALL_DESCRIPTION));
    load_description_file(system.fs(), path, &mut d)?;

    resolve_reset_target(system, &mut d).await?;
    apply_flags(system, &mut d, None, &flags.deployment)?;
    Ok(d)
}

/// Point the system disk at the disk holding the live medium.
pub async fn resolve_reset_target(system: &System, d: &mut Deployment) -> Result<()> {
    let part = block::partition_by_mount_point(system.runner(), live::LIVE_MOUNT_POINT, 1)
        .await
        .map_err(|e| {
            ElementalError::TargetResolution(format!(
                "partition for the live mount point not found: {e:#}"
            ))
        })?;

    let disk = d.system_disk_mut().ok_or_else(|| {
        ElementalError::TargetResolution("no system partition found in deployment".to_string())
    })?;

    info!(device = %part.disk, partition = %part.path, "reset target disk resolved");
    disk.device = part.disk;
    Ok(())
}

/// Apply CLI overrides to `d` and validate the result.
///
/// Unset (or empty) flags leave the descriptor alone; set flags always win.
/// Validation errors are returned unmodified.
pub fn apply_flags(
    system: &System,
    d: &mut Deployment,
    target: Option<&str>,
    flags: &DeploymentFlags,
) -> Result<()> {
    if let Some(target) = non_empty(target) {
        if let Some(disk) = d.system_disk_mut() {
            disk.device = target.to_string();
        }
    }

    if let Some(uri) = non_empty(flags.os_image.as_deref()) {
        d.source_os = Some(parse_source("OS", uri)?);
    }
    if let Some(uri) = non_empty(flags.overlay.as_deref()) {
        d.overlay_tree = Some(parse_source("overlay", uri)?);
    }
    if let Some(script) = non_empty(flags.config_script.as_deref()) {
        d.config_script = Some(script.to_string());
    }
    if let Some(policy) = flags.crypto_policy {
        d.security.crypto_policy = policy;
    }

    if flags.create_boot_entry {
        if let Some(device) = d.system_disk().map(|disk| disk.device.clone()) {
            d.firmware.boot_entries = vec![EfiBootEntry::default_for(system.platform(), &device)];
        }
    }

    set_bootloader(d, flags.bootloader);

    if let Some(cmdline) = non_empty(flags.kernel_cmdline.as_deref()) {
        d.boot_config.kernel_cmdline = cmdline.to_string();
    }
    if d.is_fips_enabled() {
        d.boot_config.kernel_cmdline = append_fips_cmdline(&d.boot_config.kernel_cmdline);
    }

    if let Some(snapshotter) = flags.snapshotter {
        d.snapshotter.name = snapshotter;
        if snapshotter == SnapshotterKind::Overwrite {
            force_plain_system_partition(d);
        }
    }

    d.sanitize()
}

/// `none` is the "not specified" value for the bootloader flag.
pub fn set_bootloader(d: &mut Deployment, bootloader: Option<BootloaderKind>) {
    match bootloader {
        None | Some(BootloaderKind::None) => {}
        Some(kind) => d.boot_config.bootloader = kind,
    }
}

fn force_plain_system_partition(d: &mut Deployment) {
    let Some(sys) = d.system_partition_mut() else {
        return;
    };
    warn!(
        partition = %sys.label,
        "overwrite snapshotter selected: system partition forced to ext4 without read-write volumes"
    );
    sys.file_system = FileSystemKind::Ext4;
    sys.rw_volumes.clear();
}

fn parse_source(what: &'static str, uri: &str) -> Result<ImageSource> {
    ImageSource::from_uri(uri).map_err(|reason| ElementalError::InvalidSource {
        what,
        uri: uri.to_string(),
        reason,
    })
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;
    use crate::platform::Platform;
    use crate::runner::mock::MockRunner;
    use crate::types::CryptoPolicy;

    fn system(fs: MockFileSystem) -> System {
        System::new()
            .with_fs(fs)
            .with_runner(MockRunner::new())
            .with_platform("linux/amd64".parse::<Platform>().unwrap())
    }

    fn install_flags(target: &str, os: &str) -> InstallFlags {
        InstallFlags {
            target: Some(target.to_string()),
            deployment: DeploymentFlags {
                os_image: Some(os.to_string()),
                ..DeploymentFlags::default()
            },
        }
    }

    #[test]
    fn install_with_flags_only() -> Result<()> {
        let sys = system(MockFileSystem::new());
        let d = resolve_install(&sys, &install_flags("/dev/sda", "registry.example.com/os:1"))?;
        assert_eq!(d.system_disk().unwrap().device, "/dev/sda");
        assert!(d.firmware.boot_entries.is_empty());
        Ok(())
    }

    #[test]
    fn boot_entry_uses_system_disk() -> Result<()> {
        let sys = system(MockFileSystem::new());
        let mut flags = install_flags("/dev/vda", "registry.example.com/os:1");
        flags.deployment.create_boot_entry = true;
        let d = resolve_install(&sys, &flags)?;
        assert_eq!(
            d.firmware.boot_entries,
            vec![EfiBootEntry::default_for(sys.platform(), "/dev/vda")]
        );
        Ok(())
    }

    #[test]
    fn unsupported_scheme_is_rejected() {
        let sys = system(MockFileSystem::new());
        let err = resolve_install(&sys, &install_flags("/dev/sda", "https://example.com/os"))
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("image source type not supported"), "{msg}");
        assert!(msg.contains("OS source URI"), "{msg}");
    }

    #[test]
    fn live_description_is_used_when_present() -> Result<()> {
        let fs = MockFileSystem::with_files([
            (live::SQUASHFS_PATH, "img"),
            (live::INSTALL_DESCRIPTION, "sourceOS: dir:///run/os\n"),
        ]);
        let sys = system(fs);
        let mut flags = install_flags("/dev/sda", "");
        flags.deployment.os_image = None;
        let d = resolve_install(&sys, &flags)?;
        assert_eq!(d.source_os, Some(ImageSource::Dir("/run/os".into())));
        Ok(())
    }

    #[test]
    fn fips_is_appended_after_cmdline_override() -> Result<()> {
        let sys = system(MockFileSystem::new());
        let mut flags = install_flags("/dev/sda", "registry.example.com/os:1");
        flags.deployment.kernel_cmdline = Some("console=ttyS0".into());
        flags.deployment.crypto_policy = Some(CryptoPolicy::Fips);
        let d = resolve_install(&sys, &flags)?;
        assert_eq!(d.boot_config.kernel_cmdline, "console=ttyS0 fips=1");
        Ok(())
    }

    #[test]
    fn bootloader_none_keeps_descriptor_value() {
        let mut d = default_deployment();
        set_bootloader(&mut d, Some(BootloaderKind::None));
        assert_eq!(d.boot_config.bootloader, BootloaderKind::Grub);
        set_bootloader(&mut d, None);
        assert_eq!(d.boot_config.bootloader, BootloaderKind::Grub);
    }

    #[test]
    fn overwrite_snapshotter_drops_volumes() -> Result<()> {
        let sys = system(MockFileSystem::new());
        let mut flags = install_flags("/dev/sda", "registry.example.com/os:1");
        flags.deployment.snapshotter = Some(SnapshotterKind::Overwrite);
        let d = resolve_install(&sys, &flags)?;
        let part = d.system_partition().unwrap();
        assert_eq!(part.file_system, FileSystemKind::Ext4);
        assert!(part.rw_volumes.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn reset_outside_recovery_fails() {
        let sys = system(MockFileSystem::new());
        let err = resolve_reset(&sys, &ResetFlags::default()).await.unwrap_err();
        assert!(err.to_string().contains("recovery system"));
    }
}
