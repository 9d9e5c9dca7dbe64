#![allow(dead_code)]

use elemental::cli::{DeploymentFlags, InstallFlags, ResetFlags};
use elemental::fs::mock::MockFileSystem;
use elemental::live;
use elemental::platform::Platform;
use elemental::runner::mock::MockRunner;
use elemental::sys::System;

pub const OS_IMAGE: &str = "registry.example.com/elemental/os:6.1";

/// A complete, valid description (single disk, btrfs root).
pub const VALID_DESCRIPTION: &str = r#"
sourceOS: oci://registry.example.com/elemental/os:6.1
disks:
- target: /dev/vda
  partitions:
  - label: EFI
    function: efi
    fileSystem: vfat
    size: 512
    mountPoint: /boot/efi
  - label: SYSTEM
    function: system
    fileSystem: btrfs
    mountPoint: /
    rwVolumes:
    - path: /var
      noCopyOnWrite: true
    - path: /etc
      snapshotted: true
bootConfig:
  bootloader: grub
  kernelCmdline: console=ttyS0
snapshotter:
  name: snapper
"#;

/// `lsblk --json` output with a single partition mounted at `mount_point`.
pub fn lsblk_json(mount_point: &str, partition: &str, disk: &str) -> String {
    format!(
        r#"{{"blockdevices": [
            {{"path": "{disk}", "type": "disk", "pkname": null, "mountpoints": [null]}},
            {{"label": "RECOVERY", "path": "{partition}", "pkname": "{disk}", "type": "part",
              "fstype": "btrfs", "size": 2726297600, "mountpoints": ["{mount_point}"]}}
        ]}}"#
    )
}

/// A runner that answers every `lsblk` call with `json`.
pub fn lsblk_runner(json: String) -> MockRunner {
    MockRunner::new().with_side_effect(move |program, _| {
        if program == "lsblk" {
            Ok(json.clone().into_bytes())
        } else {
            Ok(Vec::new())
        }
    })
}

/// System with the given filesystem, a no-op runner and `linux/amd64`.
pub fn system_with(fs: MockFileSystem) -> System {
    system_with_runner(fs, MockRunner::new())
}

pub fn system_with_runner(fs: MockFileSystem, runner: MockRunner) -> System {
    System::new()
        .with_fs(fs)
        .with_runner(runner)
        .with_platform("linux/amd64".parse::<Platform>().expect("valid platform"))
}

/// Filesystem of a host booted from the recovery entry of a live medium.
pub fn recovery_fs(description: &str) -> MockFileSystem {
    MockFileSystem::with_files([
        (live::SQUASHFS_PATH, "squashfs"),
        (live::KERNEL_CMDLINE, "root=live:CDLABEL=RECOVERY elemental.recovery quiet"),
        (live::INSTALL_DESCRIPTION, description),
    ])
}

/// Builder for the flag family shared by `install` and `reset`.
///
/// Starts from "nothing specified", unlike the CLI which defaults
/// `--create-boot-entry` and `--verify` to true.
#[derive(Debug, Clone, Default)]
pub struct FlagsBuilder {
    target: Option<String>,
    flags: DeploymentFlags,
}

impl FlagsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn target(mut self, target: &str) -> Self {
        self.target = Some(target.to_string());
        self
    }

    pub fn os_image(mut self, uri: &str) -> Self {
        self.flags.os_image = Some(uri.to_string());
        self
    }

    pub fn overlay(mut self, uri: &str) -> Self {
        self.flags.overlay = Some(uri.to_string());
        self
    }

    pub fn description(mut self, path: &str) -> Self {
        self.flags.description = Some(path.into());
        self
    }

    pub fn cmdline(mut self, cmdline: &str) -> Self {
        self.flags.kernel_cmdline = Some(cmdline.to_string());
        self
    }

    pub fn deployment(mut self, f: impl FnOnce(&mut DeploymentFlags)) -> Self {
        f(&mut self.flags);
        self
    }

    pub fn install(self) -> InstallFlags {
        InstallFlags {
            target: self.target,
            deployment: self.flags,
        }
    }

    pub fn reset(self) -> ResetFlags {
        ResetFlags {
            deployment: self.flags,
        }
    }
}
