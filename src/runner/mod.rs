// src/runner/mod.rs

//! External command execution.
//!
//! The orchestration layer only shells out for short queries (e.g. `lsblk`),
//! but it does so through [`CommandRunner`] so tests can script the output
//! with [`mock::MockRunner`].

use std::fmt::Debug;
use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;

use anyhow::{bail, Context, Result};
use tokio::process::Command;
use tracing::debug;

pub mod mock;

pub type RunFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<u8>>> + Send + 'a>>;

/// Runs a program to completion and hands back its stdout.
pub trait CommandRunner: Send + Sync + Debug {
    fn run<'a>(&'a self, program: &'a str, args: &'a [&'a str]) -> RunFuture<'a>;
}

/// Production runner backed by `tokio::process`.
#[derive(Debug, Clone, Default)]
pub struct RealRunner;

impl CommandRunner for RealRunner {
    fn run<'a>(&'a self, program: &'a str, args: &'a [&'a str]) -> RunFuture<'a> {
        Box::pin(async move {
            debug!(program, ?args, "running command");

            let output = Command::new(program)
                .args(args)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true)
                .output()
                .await
                .with_context(|| format!("failed to spawn {program}"))?;

            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                bail!(
                    "{program} exited with {}: {}",
                    output.status.code().unwrap_or(-1),
                    stderr.trim()
                );
            }

            Ok(output.stdout)
        })
    }
}
