// src/workspace.rs

//! Working directories an engine writes into while an action runs.
//!
//! Layout of a workspace root:
//! - `overlays/`: extra content layered on top of the OS tree,
//! - `iso-store/`: staging area for installer media (customize only),
//! - an optional config directory living *outside* the root (split mode).

use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, error};

use crate::cli::CustomizeFlags;
use crate::errors::Result;
use crate::fs::FileSystem;
use crate::types::{CustomizeMode, ImageType};

const OVERLAYS_DIR: &str = "overlays";
const ISO_STORE_DIR: &str = "iso-store";
const TEMP_PREFIX: &str = "elemental-";

/// Working directory tree for a single action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    root: PathBuf,
    overlays_dir: PathBuf,
    iso_store_dir: PathBuf,
    config_dir: Option<PathBuf>,
}

impl Output {
    /// Create the workspace on disk.
    ///
    /// Without an explicit `root` a fresh temporary directory is allocated.
    /// `config_dir` is created too but never removed by [`Output::cleanup`].
    /// If a subdirectory cannot be created the root is removed again.
    pub fn create(
        fs: &dyn FileSystem,
        root: Option<&Path>,
        config_dir: Option<&Path>,
    ) -> Result<Self> {
        let root = match root {
            Some(root) => {
                fs.create_dir_all(root)?;
                root.to_path_buf()
            }
            None => fs.temp_dir(TEMP_PREFIX)?,
        };

        let out = Self {
            overlays_dir: root.join(OVERLAYS_DIR),
            iso_store_dir: root.join(ISO_STORE_DIR),
            config_dir: config_dir.map(Path::to_path_buf),
            root,
        };

        let subdirs = fs.create_dir_all(&out.overlays_dir).and_then(|()| match &out.config_dir {
            Some(dir) => fs.create_dir_all(dir),
            None => Ok(()),
        });
        if let Err(err) = subdirs {
            out.cleanup_logged(fs);
            return Err(err.into());
        }

        debug!(root = %out.root.display(), "workspace created");
        Ok(out)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn overlays_dir(&self) -> &Path {
        &self.overlays_dir
    }

    pub fn iso_store_dir(&self) -> &Path {
        &self.iso_store_dir
    }

    pub fn config_dir(&self) -> Option<&Path> {
        self.config_dir.as_deref()
    }

    /// Create the ISO staging directory inside the workspace.
    pub fn ensure_iso_store(&self, fs: &dyn FileSystem) -> Result<()> {
        fs.create_dir_all(&self.iso_store_dir)?;
        Ok(())
    }

    /// Remove the workspace root and everything under it.
    pub fn cleanup(&self, fs: &dyn FileSystem) -> Result<()> {
        fs.remove_dir_all(&self.root)?;
        debug!(root = %self.root.display(), "workspace removed");
        Ok(())
    }

    /// Remove the workspace, logging instead of failing.
    pub fn cleanup_logged(&self, fs: &dyn FileSystem) {
        if let Err(err) = self.cleanup(fs) {
            error!(root = %self.root.display(), error = %err, "failed cleaning up working directory");
        }
    }
}

/// UTC timestamp used in generated file and directory names.
pub fn timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H-%M-%S").to_string()
}

/// `<dir>/image-<timestamp>.<ext>`
pub fn image_path(dir: &Path, image_type: ImageType) -> PathBuf {
    dir.join(format!("image-{}.{}", timestamp(), image_type.extension()))
}

/// `<base>/build-<timestamp>`, the workspace root of a build.
pub fn build_root(base: &Path) -> PathBuf {
    base.join(format!("build-{}", timestamp()))
}

/// Output image path and, in split mode, the sibling configuration directory.
pub fn resolve_output_paths(flags: &CustomizeFlags) -> (PathBuf, Option<PathBuf>) {
    let image = flags
        .output
        .clone()
        .unwrap_or_else(|| image_path(&flags.config_dir, flags.media_type));

    let config_dir = match flags.mode {
        CustomizeMode::Embedded => None,
        CustomizeMode::Split => Some(split_config_dir(&image)),
    };

    (image, config_dir)
}

fn split_config_dir(image: &Path) -> PathBuf {
    let stem = image
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    let parent = image.parent().unwrap_or(Path::new(""));
    parent.join(format!("{stem}-config"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;
    use crate::platform::Platform;

    fn customize_flags(mode: CustomizeMode, output: Option<&str>) -> CustomizeFlags {
        CustomizeFlags {
            media_type: ImageType::Iso,
            config_dir: PathBuf::from("/config"),
            output: output.map(PathBuf::from),
            mode,
            platform: Platform::host_string(),
            local: false,
        }
    }

    #[test]
    fn create_and_cleanup_explicit_root() -> Result<()> {
        let fs = MockFileSystem::new();
        let out = Output::create(&fs, Some(Path::new("/work/build-1")), None)?;
        assert!(fs.is_dir(Path::new("/work/build-1/overlays")));
        assert!(!fs.is_dir(out.iso_store_dir()));

        out.ensure_iso_store(&fs)?;
        assert!(fs.is_dir(Path::new("/work/build-1/iso-store")));

        out.cleanup(&fs)?;
        assert!(!fs.exists(Path::new("/work/build-1")));
        assert!(fs.is_dir(Path::new("/work")));
        Ok(())
    }

    #[test]
    fn temp_root_when_unspecified() -> Result<()> {
        let fs = MockFileSystem::new();
        let out = Output::create(&fs, None, None)?;
        assert!(out.root().starts_with("/tmp"));
        assert!(fs.is_dir(out.overlays_dir()));
        Ok(())
    }

    #[test]
    fn cleanup_keeps_split_config_dir() -> Result<()> {
        let fs = MockFileSystem::new();
        let out = Output::create(&fs, None, Some(Path::new("/out/image-config")))?;
        out.cleanup(&fs)?;
        assert!(fs.is_dir(Path::new("/out/image-config")));
        Ok(())
    }

    #[test]
    fn unusable_config_dir_removes_fresh_root() {
        let fs = MockFileSystem::new();
        fs.add_file("/out/image-config", "not a directory");

        let res = Output::create(&fs, None, Some(Path::new("/out/image-config")));

        assert!(res.is_err());
        assert!(!fs.exists(Path::new("/tmp/elemental-0")));
        assert!(fs.is_file(Path::new("/out/image-config")));
    }

    #[test]
    fn unusable_overlays_dir_removes_explicit_root() {
        let fs = MockFileSystem::new();
        fs.add_file("/work/build-1/overlays", "not a directory");

        let res = Output::create(&fs, Some(Path::new("/work/build-1")), None);

        assert!(res.is_err());
        assert!(!fs.exists(Path::new("/work/build-1")));
    }

    #[test]
    fn failed_cleanup_is_only_logged() -> Result<()> {
        let fs = MockFileSystem::new();
        let out = Output::create(&fs, Some(Path::new("/gone")), None)?;
        fs.remove("/gone");
        assert!(out.cleanup(&fs).is_err());
        out.cleanup_logged(&fs);
        Ok(())
    }

    #[test]
    fn timestamp_shape() {
        let ts = timestamp();
        assert_eq!(ts.len(), "2025-01-31T12-00-00".len());
        assert_eq!(&ts[10..11], "T");
        assert!(!ts.contains(':'));
    }

    #[test]
    fn default_image_path_under_config_dir() {
        let (image, config) = resolve_output_paths(&customize_flags(CustomizeMode::Embedded, None));
        assert!(image.starts_with("/config"));
        let name = image.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("image-") && name.ends_with(".iso"), "{name}");
        assert!(config.is_none());
    }

    #[test]
    fn split_mode_derives_config_dir() {
        let (image, config) =
            resolve_output_paths(&customize_flags(CustomizeMode::Split, Some("/out/my.iso")));
        assert_eq!(image, PathBuf::from("/out/my.iso"));
        assert_eq!(config, Some(PathBuf::from("/out/my-config")));
    }
}
