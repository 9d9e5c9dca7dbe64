use std::path::Path;

use elemental::cli::DeploymentFlags;
use elemental::deployment::{load_description_file, Deployment, FIPS_CMDLINE};
use elemental::fs::mock::MockFileSystem;
use elemental::resolve::apply_flags;
use elemental::sys::System;
use elemental::types::{BootloaderKind, CryptoPolicy, FileSystemKind, SnapshotterKind};
use elemental_test_utils::builders::{system_with, VALID_DESCRIPTION};
use proptest::prelude::*;

fn loaded(sys: &System) -> Deployment {
    let mut d = Deployment::default();
    load_description_file(sys.fs(), Path::new("/setup.yaml"), &mut d).unwrap();
    d
}

fn system() -> System {
    system_with(MockFileSystem::with_files([("/setup.yaml", VALID_DESCRIPTION)]))
}

fn crypto_policy() -> impl Strategy<Value = CryptoPolicy> {
    prop_oneof![Just(CryptoPolicy::Default), Just(CryptoPolicy::Fips)]
}

fn snapshotter() -> impl Strategy<Value = SnapshotterKind> {
    prop_oneof![Just(SnapshotterKind::Snapper), Just(SnapshotterKind::Overwrite)]
}

proptest! {
    #[test]
    fn unset_flags_leave_descriptor_unchanged(
        device in "/dev/[a-z]{3}",
        cmdline in "[a-z]{1,8}(=[a-z0-9]{1,4})?( [a-z]{1,8})?",
        policy in crypto_policy(),
        snap in snapshotter(),
        script in proptest::option::of("/[a-z]{1,10}\\.sh"),
    ) {
        let sys = system();
        let mut d = loaded(&sys);
        d.disks[0].device = device;
        d.security.crypto_policy = policy;
        d.snapshotter.name = snap;
        d.config_script = script;
        d.boot_config.kernel_cmdline = if policy == CryptoPolicy::Fips {
            format!("{cmdline} {FIPS_CMDLINE}")
        } else {
            cmdline
        };

        let before = d.clone();
        apply_flags(&sys, &mut d, None, &DeploymentFlags::default()).unwrap();
        prop_assert_eq!(d, before);
    }

    #[test]
    fn set_flags_always_win(
        target in "/dev/[a-z]{3}",
        cmdline in "[a-z]{1,8}\\.[a-z]{1,4}=[0-9]{1,3}",
        policy in crypto_policy(),
        tag in "[0-9]{1,3}",
        script in "/[a-z]{1,10}\\.sh",
    ) {
        let sys = system();
        let mut d = loaded(&sys);
        let flags = DeploymentFlags {
            os_image: Some(format!("registry.example.com/os:{tag}")),
            config_script: Some(script.clone()),
            kernel_cmdline: Some(cmdline.clone()),
            crypto_policy: Some(policy),
            bootloader: Some(BootloaderKind::Grub),
            ..DeploymentFlags::default()
        };

        apply_flags(&sys, &mut d, Some(&target), &flags).unwrap();

        prop_assert_eq!(&d.system_disk().unwrap().device, &target);
        prop_assert_eq!(
            d.source_os.as_ref().map(ToString::to_string),
            Some(format!("oci://registry.example.com/os:{tag}"))
        );
        prop_assert_eq!(d.config_script.as_deref(), Some(script.as_str()));
        prop_assert_eq!(d.security.crypto_policy, policy);
        prop_assert_eq!(d.boot_config.bootloader, BootloaderKind::Grub);
        let expected = if policy == CryptoPolicy::Fips {
            format!("{cmdline} {FIPS_CMDLINE}")
        } else {
            cmdline
        };
        prop_assert_eq!(&d.boot_config.kernel_cmdline, &expected);
    }

    #[test]
    fn fips_parameter_is_never_duplicated(cmdline in "[a-z]{1,8}( [a-z]{1,8}){0,3}") {
        let sys = system();
        let mut d = loaded(&sys);
        let flags = DeploymentFlags {
            kernel_cmdline: Some(cmdline),
            crypto_policy: Some(CryptoPolicy::Fips),
            ..DeploymentFlags::default()
        };

        apply_flags(&sys, &mut d, None, &flags).unwrap();
        apply_flags(&sys, &mut d, None, &DeploymentFlags::default()).unwrap();

        let count = d
            .boot_config
            .kernel_cmdline
            .split_whitespace()
            .filter(|arg| *arg == FIPS_CMDLINE)
            .count();
        prop_assert_eq!(count, 1);
    }
}

#[test]
fn overwrite_snapshotter_forces_ext4_without_volumes() {
    let sys = system();
    let mut d = loaded(&sys);
    assert!(!d.system_partition().unwrap().rw_volumes.is_empty());

    let flags = DeploymentFlags {
        snapshotter: Some(SnapshotterKind::Overwrite),
        ..DeploymentFlags::default()
    };
    apply_flags(&sys, &mut d, None, &flags).unwrap();

    let sys_part = d.system_partition().unwrap();
    assert_eq!(sys_part.file_system, FileSystemKind::Ext4);
    assert!(sys_part.rw_volumes.is_empty());
    assert_eq!(d.snapshotter.name, SnapshotterKind::Overwrite);
}

#[test]
fn bootloader_none_does_not_override() {
    let sys = system();
    let mut d = loaded(&sys);
    let flags = DeploymentFlags {
        bootloader: Some(BootloaderKind::None),
        ..DeploymentFlags::default()
    };
    apply_flags(&sys, &mut d, None, &flags).unwrap();
    assert_eq!(d.boot_config.bootloader, BootloaderKind::Grub);
}

#[test]
fn empty_string_flags_are_not_specified() {
    let sys = system();
    let mut d = loaded(&sys);
    let before = d.clone();
    let flags = DeploymentFlags {
        os_image: Some(String::new()),
        overlay: Some(String::new()),
        kernel_cmdline: Some(String::new()),
        config_script: Some(String::new()),
        ..DeploymentFlags::default()
    };
    apply_flags(&sys, &mut d, Some(""), &flags).unwrap();
    assert_eq!(d, before);
}

#[test]
fn malformed_overlay_uri_fails_immediately() {
    let sys = system();
    let mut d = loaded(&sys);
    let flags = DeploymentFlags {
        overlay: Some("ftp://example.com/overlay.tar".into()),
        ..DeploymentFlags::default()
    };
    let err = apply_flags(&sys, &mut d, None, &flags).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("overlay source URI"), "{msg}");
    assert!(msg.contains("image source type not supported"), "{msg}");
}
