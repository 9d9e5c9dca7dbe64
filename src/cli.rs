// src/cli.rs

//! CLI argument parsing using `clap`.
//!
//! Every subcommand gets its own flags struct. The parsed structs are built
//! once per invocation and handed down by reference; nothing here is global.

use std::path::PathBuf;

use clap::{ArgAction, ArgGroup, Args, Parser, Subcommand};

use crate::platform::Platform;
use crate::types::{BootloaderKind, CryptoPolicy, CustomizeMode, ImageType, SnapshotterKind};

/// Default external engine program.
pub const DEFAULT_ENGINE: &str = "elemental-engine";

/// Command-line arguments for `elemental`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "elemental",
    version,
    about = "Install and upgrade immutable operating systems",
    long_about = None
)]
pub struct CliArgs {
    /// Set logging at debug level.
    #[arg(long, global = true)]
    pub debug: bool,

    /// Save logs to a file; accepts a path or `stdout` / `stderr`.
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<String>,

    /// Program implementing the install/build/customize engines.
    #[arg(long, global = true, value_name = "PROGRAM", default_value = DEFAULT_ENGINE)]
    pub engine: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Install an OS image to a target disk
    Install(InstallFlags),
    /// Factory reset the current host from the recovery system
    Reset(ResetFlags),
    /// Build a raw disk image (deprecated, use `customize`)
    Build(BuildFlags),
    /// Customize an installer image based on a release
    Customize(CustomizeFlags),
    /// Manage kernel modules on the system
    Kmod(KernelModulesFlags),
}

/// Overrides shared by `install` and `reset`.
///
/// `None` (or an empty string) means "not specified": the descriptor value
/// is kept. Anything else always wins over the loaded description.
#[derive(Debug, Clone, Default, Args)]
pub struct DeploymentFlags {
    /// Description file to read deployment details from.
    #[arg(short = 'd', long, value_name = "PATH")]
    pub description: Option<PathBuf>,

    /// URI of the image containing the operating system.
    #[arg(long = "os-image", value_name = "URI")]
    pub os_image: Option<String>,

    /// URI of the overlay content for the OS image.
    #[arg(long, value_name = "URI")]
    pub overlay: Option<String>,

    /// Path to the OS image post-commit script.
    #[arg(long = "config", value_name = "PATH")]
    pub config_script: Option<String>,

    /// Create an EFI boot entry for the installed system.
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub create_boot_entry: bool,

    /// Bundled bootloader to install to the ESP.
    #[arg(short = 'b', long, value_enum)]
    pub bootloader: Option<BootloaderKind>,

    /// Kernel command line for the installed system.
    #[arg(long = "cmdline", value_name = "STR")]
    pub kernel_cmdline: Option<String>,

    /// Crypto policy of the installed system.
    #[arg(long, value_enum)]
    pub crypto_policy: Option<CryptoPolicy>,

    /// Snapshotter (`overwrite` is for debugging only).
    #[arg(long, value_enum)]
    pub snapshotter: Option<SnapshotterKind>,

    /// Verify TLS when pulling OCI images.
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub verify: bool,

    /// Load OCI images from the local container storage.
    #[arg(long)]
    pub local: bool,
}

#[derive(Debug, Clone, Default, Args)]
pub struct InstallFlags {
    /// Target disk device.
    #[arg(short = 't', long, value_name = "DEVICE")]
    pub target: Option<String>,

    #[command(flatten)]
    pub deployment: DeploymentFlags,
}

/// Same flag family as `install`; the target disk is discovered.
#[derive(Debug, Clone, Default, Args)]
pub struct ResetFlags {
    #[command(flatten)]
    pub deployment: DeploymentFlags,
}

#[derive(Debug, Clone, Args)]
pub struct BuildFlags {
    /// Full path to the image configuration directory.
    #[arg(long, value_name = "DIR", default_value = "/config")]
    pub config_dir: PathBuf,

    /// Base directory for build working trees.
    #[arg(long, value_name = "DIR", default_value = "_build")]
    pub build_dir: PathBuf,

    /// Type of image to build.
    #[arg(long = "type", value_enum, default_value = "raw")]
    pub image_type: ImageType,

    /// Target platform.
    #[arg(long, default_value_t = Platform::host_string())]
    pub platform: String,

    /// Filepath for the output image [default: <build-dir>/image-<timestamp>.<type>]
    #[arg(short = 'o', long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Load OCI images from the local container storage.
    #[arg(long)]
    pub local: bool,
}

#[derive(Debug, Clone, Args)]
pub struct CustomizeFlags {
    /// Type of the installer media.
    #[arg(long = "type", value_enum, default_value = "iso")]
    pub media_type: ImageType,

    /// Full path to the image configuration directory.
    #[arg(long, value_name = "DIR", default_value = "/config")]
    pub config_dir: PathBuf,

    /// Filepath for the output image [default: <config-dir>/image-<timestamp>.<type>]
    #[arg(short = 'o', long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// `embedded` (config within the image) or `split` (separate directory).
    #[arg(long, value_enum, default_value = "embedded")]
    pub mode: CustomizeMode,

    /// Target platform.
    #[arg(long, default_value_t = Platform::host_string())]
    pub platform: String,

    /// Load OCI images from the local container storage.
    #[arg(long)]
    pub local: bool,
}

#[derive(Debug, Clone, Default, Args)]
#[command(group(ArgGroup::new("operation").required(true).args(["reload", "unload"])))]
pub struct KernelModulesFlags {
    /// Reload kernel modules.
    #[arg(long)]
    pub reload: bool,

    /// [EXPERIMENTAL] Unload kernel modules.
    #[arg(long)]
    pub unload: bool,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn install_flags_default_to_not_specified() {
        let args = CliArgs::try_parse_from(["elemental", "install"]).unwrap();
        let Command::Install(flags) = args.command else {
            panic!("expected install");
        };
        assert!(flags.target.is_none());
        assert!(flags.deployment.bootloader.is_none());
        assert!(flags.deployment.snapshotter.is_none());
        assert!(flags.deployment.create_boot_entry);
        assert!(flags.deployment.verify);
        assert_eq!(args.engine, DEFAULT_ENGINE);
    }

    #[test]
    fn install_accepts_full_flag_family() {
        let args = CliArgs::try_parse_from([
            "elemental", "--debug", "install", "--target", "/dev/sda", "--os-image",
            "registry.example.com/os:1", "--bootloader", "none", "--crypto-policy", "fips",
            "--snapshotter", "overwrite", "--cmdline", "console=ttyS0", "--verify", "false",
        ])
        .unwrap();
        assert!(args.debug);
        let Command::Install(flags) = args.command else {
            panic!("expected install");
        };
        assert_eq!(flags.target.as_deref(), Some("/dev/sda"));
        assert_eq!(flags.deployment.bootloader, Some(BootloaderKind::None));
        assert_eq!(flags.deployment.crypto_policy, Some(CryptoPolicy::Fips));
        assert_eq!(flags.deployment.snapshotter, Some(SnapshotterKind::Overwrite));
        assert!(!flags.deployment.verify);
    }

    #[test]
    fn invalid_enum_values_fail_fast() {
        for args in [
            ["elemental", "install", "--crypto-policy", "weak"],
            ["elemental", "install", "--snapshotter", "zfs"],
            ["elemental", "customize", "--mode", "inline"],
        ] {
            assert!(CliArgs::try_parse_from(args).is_err(), "{args:?}");
        }
    }

    #[test]
    fn reset_has_no_target_flag() {
        assert!(CliArgs::try_parse_from(["elemental", "reset", "--target", "/dev/sda"]).is_err());
        assert!(CliArgs::try_parse_from(["elemental", "reset", "-d", "/setup.yaml"]).is_ok());
    }

    #[test]
    fn kmod_requires_exactly_one_operation() {
        assert!(CliArgs::try_parse_from(["elemental", "kmod"]).is_err());
        assert!(CliArgs::try_parse_from(["elemental", "kmod", "--reload", "--unload"]).is_err());
        assert!(CliArgs::try_parse_from(["elemental", "kmod", "--unload"]).is_ok());
    }

    #[test]
    fn customize_defaults() {
        let args = CliArgs::try_parse_from(["elemental", "customize"]).unwrap();
        let Command::Customize(flags) = args.command else {
            panic!("expected customize");
        };
        assert_eq!(flags.media_type, ImageType::Iso);
        assert_eq!(flags.mode, CustomizeMode::Embedded);
        assert_eq!(flags.config_dir, PathBuf::from("/config"));
        assert_eq!(flags.platform, Platform::host_string());
    }

    #[test]
    fn global_flags_after_subcommand() {
        let args = CliArgs::try_parse_from([
            "elemental", "build", "--log-file", "stdout", "--engine", "/usr/libexec/engine",
        ])
        .unwrap();
        assert_eq!(args.log_file.as_deref(), Some("stdout"));
        assert_eq!(args.engine, "/usr/libexec/engine");
    }
}
