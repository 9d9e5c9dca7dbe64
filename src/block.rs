// src/block.rs

//! Block device queries via `lsblk --json`.

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use tracing::debug;

use crate::runner::CommandRunner;

const LSBLK_COLUMNS: &str = "LABEL,PARTLABEL,PARTUUID,SIZE,FSTYPE,MOUNTPOINTS,PATH,PKNAME,TYPE";
const RETRY_DELAY: Duration = Duration::from_secs(1);

/// A partition as reported by the block layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockPartition {
    pub path: String,
    /// Parent disk device (`pkname`).
    pub disk: String,
    pub label: Option<String>,
    pub file_system: Option<String>,
    pub size: u64,
    pub mount_points: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct LsblkOutput {
    #[serde(default)]
    blockdevices: Vec<LsblkDevice>,
}

#[derive(Debug, Deserialize)]
struct LsblkDevice {
    path: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    pkname: Option<String>,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    partlabel: Option<String>,
    #[serde(default)]
    fstype: Option<String>,
    #[serde(default)]
    size: Option<u64>,
    #[serde(default)]
    mountpoints: Vec<Option<String>>,
    #[serde(default)]
    children: Vec<LsblkDevice>,
}

/// List every partition known to the block layer.
pub async fn list_partitions(runner: &dyn CommandRunner) -> Result<Vec<BlockPartition>> {
    let out = runner
        .run("lsblk", &["-p", "-b", "-n", "-J", "--list", "--output", LSBLK_COLUMNS])
        .await
        .context("listing block devices")?;

    if out.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }

    let parsed: LsblkOutput = serde_json::from_slice(&out).context("parsing lsblk output")?;

    let mut partitions = Vec::new();
    collect_partitions(parsed.blockdevices, &mut partitions);
    Ok(partitions)
}

fn collect_partitions(devices: Vec<LsblkDevice>, out: &mut Vec<BlockPartition>) {
    for dev in devices {
        if dev.kind == "part" {
            out.push(BlockPartition {
                path: dev.path,
                disk: dev.pkname.unwrap_or_default(),
                label: dev.label.or(dev.partlabel),
                file_system: dev.fstype,
                size: dev.size.unwrap_or(0),
                mount_points: dev.mountpoints.into_iter().flatten().collect(),
            });
        }
        collect_partitions(dev.children, out);
    }
}

/// Find the single partition mounted at `mount_point`.
///
/// The lookup is retried up to `attempts` times while nothing matches, since
/// udev may still be settling right after boot. More than one match is an
/// immediate error.
pub async fn partition_by_mount_point(
    runner: &dyn CommandRunner,
    mount_point: &str,
    attempts: usize,
) -> Result<BlockPartition> {
    let attempts = attempts.max(1);

    for attempt in 1..=attempts {
        let mut matches: Vec<BlockPartition> = list_partitions(runner)
            .await?
            .into_iter()
            .filter(|p| p.mount_points.iter().any(|m| m == mount_point))
            .collect();

        match matches.len() {
            1 => {
                let part = matches.remove(0);
                if part.disk.is_empty() {
                    bail!("partition {} has no parent disk", part.path);
                }
                return Ok(part);
            }
            0 => {
                debug!(mount_point, attempt, attempts, "no partition mounted yet");
                if attempt < attempts {
                    tokio::time::sleep(RETRY_DELAY).await;
                }
            }
            n => bail!("{n} partitions mounted at {mount_point}, expected exactly one"),
        }
    }

    Err(anyhow!("no partition mounted at {mount_point}"))
}
