// src/image.rs

//! Image definitions consumed by the build and customize engines.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::cli::{BuildFlags, CustomizeFlags};
use crate::errors::{ElementalError, Result};
use crate::fs::FileSystem;
use crate::platform::Platform;
use crate::types::ImageType;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub image_type: ImageType,
    pub platform: Platform,
    pub output_image_name: PathBuf,
}

/// What to build and from which configuration directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Definition {
    pub image: Image,
    pub config_dir: PathBuf,
}

impl Definition {
    /// Validate build flags and turn them into a definition.
    ///
    /// Only raw disk images can be built; installer media go through
    /// `customize`.
    pub fn for_build(fs: &dyn FileSystem, flags: &BuildFlags) -> Result<Self> {
        check_config_dir(fs, &flags.config_dir)?;

        if flags.image_type != ImageType::Raw {
            return Err(ElementalError::ConfigError(format!(
                "image type \"{}\" not supported",
                flags.image_type
            )));
        }

        let platform = Platform::parse(&flags.platform)?;
        let output = flags.output.clone().unwrap_or_else(|| {
            crate::workspace::image_path(&flags.build_dir, flags.image_type)
        });

        Ok(Self {
            image: Image {
                image_type: flags.image_type,
                platform,
                output_image_name: output,
            },
            config_dir: flags.config_dir.clone(),
        })
    }

    /// Definition of the installer media produced by `customize`.
    pub fn for_customize(
        fs: &dyn FileSystem,
        flags: &CustomizeFlags,
        image_path: &Path,
    ) -> Result<Self> {
        let platform = Platform::parse(&flags.platform)?;
        check_config_dir(fs, &flags.config_dir)?;

        Ok(Self {
            image: Image {
                image_type: flags.media_type,
                platform,
                output_image_name: image_path.to_path_buf(),
            },
            config_dir: flags.config_dir.clone(),
        })
    }
}

fn check_config_dir(fs: &dyn FileSystem, dir: &Path) -> Result<()> {
    if fs.is_dir(dir) {
        Ok(())
    } else {
        Err(ElementalError::ConfigError(format!(
            "reading config directory {}: no such directory",
            dir.display()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn build_flags(image_type: ImageType, platform: &str) -> BuildFlags {
        BuildFlags {
            config_dir: PathBuf::from("/config"),
            build_dir: PathBuf::from("/build"),
            image_type,
            platform: platform.to_string(),
            output: None,
            local: false,
        }
    }

    #[test]
    fn build_definition_defaults_output_under_build_dir() -> Result<()> {
        let fs = MockFileSystem::new();
        fs.add_dir("/config");
        let def = Definition::for_build(&fs, &build_flags(ImageType::Raw, "linux/arm64"))?;
        assert!(def.image.output_image_name.starts_with("/build"));
        assert_eq!(def.image.platform.to_string(), "linux/arm64");
        Ok(())
    }

    #[test]
    fn build_rejects_iso_and_missing_config() {
        let fs = MockFileSystem::new();
        let err = Definition::for_build(&fs, &build_flags(ImageType::Raw, "linux/amd64"))
            .unwrap_err();
        assert!(err.to_string().contains("reading config directory"));

        fs.add_dir("/config");
        let err = Definition::for_build(&fs, &build_flags(ImageType::Iso, "linux/amd64"))
            .unwrap_err();
        assert!(err.to_string().contains("not supported"));
    }

    #[test]
    fn malformed_platform() {
        let fs = MockFileSystem::new();
        fs.add_dir("/config");
        let err = Definition::for_build(&fs, &build_flags(ImageType::Raw, "windows"))
            .unwrap_err();
        assert!(err.to_string().contains("malformed platform"));
    }
}
