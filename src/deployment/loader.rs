// src/deployment/loader.rs

use std::path::Path;

use serde_yaml::Value;
use tracing::info;

use crate::deployment::Deployment;
use crate::errors::{ElementalError, Result};
use crate::fs::FileSystem;

/// Read a YAML description file and merge it over `d`.
///
/// Mappings are merged key by key, so a description only needs to mention
/// what it changes; sequences (disks, partitions, volumes...) replace the
/// existing ones wholesale. An empty file leaves `d` untouched.
///
/// On error `d` is left unchanged.
pub fn load_description_file(fs: &dyn FileSystem, path: &Path, d: &mut Deployment) -> Result<()> {
    let data = fs
        .read_to_string(path)
        .map_err(|source| ElementalError::DescriptionRead {
            path: path.to_path_buf(),
            source: source.into(),
        })?;

    let parse_err = |source| ElementalError::DescriptionParse {
        path: path.to_path_buf(),
        source,
    };

    let overlay: Value = serde_yaml::from_str(&data).map_err(parse_err)?;

    let mut merged = serde_yaml::to_value(&*d)?;
    merge_values(&mut merged, overlay);
    *d = serde_yaml::from_value(merged).map_err(parse_err)?;

    info!(path = %path.display(), "loaded deployment description file");
    Ok(())
}

fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (_, Value::Null) => {}
        (Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) if existing.is_mapping() && value.is_mapping() => {
                        merge_values(existing, value);
                    }
                    _ => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}
