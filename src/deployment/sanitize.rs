// src/deployment/sanitize.rs

use std::collections::HashSet;

use crate::deployment::{Deployment, Disk};
use crate::errors::{ElementalError, Result};
use crate::types::{FileSystemKind, PartitionRole, SnapshotterKind};

impl Deployment {
    /// Cross-field validation of a fully merged descriptor.
    ///
    /// Nothing is repaired here; the first inconsistency is reported.
    pub fn sanitize(&self) -> Result<()> {
        validate_layout(self).map_err(ElementalError::InconsistentDeployment)
    }
}

fn validate_layout(d: &Deployment) -> std::result::Result<(), String> {
    if d.disks.is_empty() {
        return Err("no disks defined".to_string());
    }

    ensure_single_system_partition(d)?;
    ensure_valid_efi(d)?;
    ensure_unique_labels(d)?;

    for disk in &d.disks {
        validate_disk(disk)?;
    }

    validate_snapshotter(d)?;

    if d.source_os.is_none() {
        return Err("undefined OS image source".to_string());
    }

    Ok(())
}

fn ensure_single_system_partition(d: &Deployment) -> std::result::Result<(), String> {
    match d.partitions().filter(|p| p.role == PartitionRole::System).count() {
        0 => Err("no system partition defined".to_string()),
        1 => {
            let disk = d.system_disk().map(|disk| disk.device.as_str()).unwrap_or_default();
            if disk.is_empty() {
                Err("no target device defined for the system disk".to_string())
            } else {
                Ok(())
            }
        }
        n => Err(format!("multiple system partitions defined ({n})")),
    }
}

fn ensure_valid_efi(d: &Deployment) -> std::result::Result<(), String> {
    let efi: Vec<_> = d.partitions().filter(|p| p.role == PartitionRole::Efi).collect();
    if efi.len() > 1 {
        return Err(format!("multiple EFI partitions defined ({})", efi.len()));
    }
    if let Some(part) = efi.first() {
        if part.file_system != FileSystemKind::Vfat {
            return Err(format!(
                "EFI partition must be vfat, found {}",
                part.file_system
            ));
        }
    }
    Ok(())
}

fn ensure_unique_labels(d: &Deployment) -> std::result::Result<(), String> {
    let mut seen = HashSet::new();
    for part in d.partitions().filter(|p| !p.label.is_empty()) {
        if !seen.insert(part.label.as_str()) {
            return Err(format!("duplicate partition label '{}'", part.label));
        }
    }
    Ok(())
}

fn validate_disk(disk: &Disk) -> std::result::Result<(), String> {
    let last = disk.partitions.len().saturating_sub(1);
    for (idx, part) in disk.partitions.iter().enumerate() {
        if part.size == 0 && idx != last {
            return Err(format!(
                "partition '{}' without size must be the last one on disk '{}'",
                part.label, disk.device
            ));
        }

        if part.rw_volumes.is_empty() {
            continue;
        }
        if part.file_system != FileSystemKind::Btrfs {
            return Err(format!(
                "read-write volumes require btrfs, partition '{}' is {}",
                part.label, part.file_system
            ));
        }

        let mut paths = HashSet::new();
        for vol in &part.rw_volumes {
            if !vol.path.starts_with('/') {
                return Err(format!("read-write volume path '{}' must be absolute", vol.path));
            }
            if !paths.insert(vol.path.as_str()) {
                return Err(format!("duplicate read-write volume '{}'", vol.path));
            }
        }
    }
    Ok(())
}

fn validate_snapshotter(d: &Deployment) -> std::result::Result<(), String> {
    let Some(sys) = d.system_partition() else {
        return Ok(());
    };
    if d.snapshotter.name == SnapshotterKind::Snapper && sys.file_system != FileSystemKind::Btrfs {
        return Err(format!(
            "snapper snapshotter requires a btrfs system partition, found {}",
            sys.file_system
        ));
    }
    Ok(())
}
