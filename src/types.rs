// src/types.rs

//! Small enum-like value types shared by the CLI, the deployment descriptor
//! and the engines.
//!
//! All of them are strongly typed at the CLI boundary (`clap::ValueEnum`), so
//! an unknown value is rejected before any action runs.

use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// System wide crypto policy of the installed OS.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CryptoPolicy {
    #[default]
    Default,
    Fips,
}

/// Bootloader bundled into the ESP.
///
/// On the command line `none` means "keep whatever the descriptor says".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BootloaderKind {
    #[default]
    Grub,
    None,
}

/// Snapshotter used to commit the OS tree.
///
/// `Overwrite` is a debugging aid: no snapshots, plain ext4 root.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotterKind {
    #[default]
    Snapper,
    Overwrite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileSystemKind {
    Btrfs,
    Ext2,
    Ext4,
    Xfs,
    Vfat,
}

/// Role tag of a partition (`function:` in descriptor files).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartitionRole {
    System,
    Efi,
    Recovery,
    Data,
}

/// Output image / installer media type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ImageType {
    Raw,
    Iso,
}

/// Where the customize command puts the release configuration.
///
/// - `Embedded`: packaged into the image itself.
/// - `Split`: written to a sibling `<image>-config` directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum CustomizeMode {
    #[default]
    Embedded,
    Split,
}

impl CryptoPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            CryptoPolicy::Default => "default",
            CryptoPolicy::Fips => "fips",
        }
    }
}

impl BootloaderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BootloaderKind::Grub => "grub",
            BootloaderKind::None => "none",
        }
    }
}

impl SnapshotterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SnapshotterKind::Snapper => "snapper",
            SnapshotterKind::Overwrite => "overwrite",
        }
    }
}

impl FileSystemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileSystemKind::Btrfs => "btrfs",
            FileSystemKind::Ext2 => "ext2",
            FileSystemKind::Ext4 => "ext4",
            FileSystemKind::Xfs => "xfs",
            FileSystemKind::Vfat => "vfat",
        }
    }
}

impl ImageType {
    /// File extension used for generated image names.
    pub fn extension(&self) -> &'static str {
        match self {
            ImageType::Raw => "raw",
            ImageType::Iso => "iso",
        }
    }
}

impl fmt::Display for CryptoPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for BootloaderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for SnapshotterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for FileSystemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for ImageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}
