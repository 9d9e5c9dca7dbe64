// src/exec/process.rs

//! Engine backed by an external program.
//!
//! The job is written as YAML into the workspace and the program is invoked
//! as `<program> <stage> --input <file> [--verify] [--local]`. Kernel module
//! operations use `<program> kmod <list|reload|unload> [modules...]`.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{ChildStderr, Command};
use tracing::{debug, info, warn};

use super::{
    Customizer, EngineFuture, EngineOptions, ImageBuilder, Installer, KernelModules,
};
use crate::cancel::ExecContext;
use crate::deployment::Deployment;
use crate::fs::FileSystem;
use crate::image::Definition;
use crate::workspace::Output;

#[derive(Debug, Clone)]
pub struct ProcessEngine {
    program: String,
    fs: Arc<dyn FileSystem>,
}

impl ProcessEngine {
    pub fn new(program: &str, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            program: program.to_string(),
            fs,
        }
    }

    /// Serialize `job` into the workspace and run `stage` on it.
    async fn run_job<T: Serialize + Sync>(
        &self,
        ctx: &ExecContext,
        stage: &str,
        job: &T,
        output: &Output,
        opts: EngineOptions,
    ) -> Result<()> {
        let input = write_input(self.fs.as_ref(), output, stage, job)?;

        let mut args = vec![
            stage.to_string(),
            "--input".to_string(),
            input.display().to_string(),
        ];
        if opts.verify {
            args.push("--verify".to_string());
        }
        if opts.local {
            args.push("--local".to_string());
        }

        self.spawn(ctx, stage, &args).await.map(|_| ())
    }

    async fn kmod(&self, ctx: &ExecContext, op: &str, modules: &[String]) -> Result<Vec<u8>> {
        let mut args = vec!["kmod".to_string(), op.to_string()];
        args.extend(modules.iter().cloned());
        self.spawn(ctx, "kmod", &args).await
    }

    /// Run the program to completion, killing it if `ctx` is cancelled.
    ///
    /// stderr is streamed to the log as engine progress; stdout is returned.
    async fn spawn(&self, ctx: &ExecContext, stage: &str, args: &[String]) -> Result<Vec<u8>> {
        info!(program = %self.program, ?args, "starting engine process");

        let mut child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("spawning engine '{}' for {stage}", self.program))?;

        let pump = child
            .stderr
            .take()
            .map(|stderr| tokio::spawn(log_stderr(stage.to_string(), stderr)));

        tokio::select! {
            res = child.wait_with_output() => {
                let out = res.with_context(|| format!("waiting for engine '{}'", self.program))?;
                if let Some(pump) = pump {
                    let _ = pump.await;
                }
                let code = out.status.code().unwrap_or(-1);
                debug!(stage, exit_code = code, "engine process exited");
                if !out.status.success() {
                    bail!("{stage} engine exited with code {code}");
                }
                Ok(out.stdout)
            }
            _ = ctx.cancelled() => {
                // Dropping the wait future kills the child (kill_on_drop).
                warn!(stage, "cancellation requested, killing engine process");
                if let Some(pump) = pump {
                    pump.abort();
                }
                bail!("{stage} cancelled")
            }
        }
    }
}

/// Forward engine stderr to the log line by line until EOF.
///
/// Lines are decoded lossily; the pipe is drained even when the engine emits
/// bytes that are not UTF-8.
async fn log_stderr(stage: String, stderr: ChildStderr) {
    let mut reader = BufReader::new(stderr);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                info!(stage = %stage, "{}", line.trim_end());
            }
            Err(err) => {
                warn!(stage = %stage, error = %err, "reading engine stderr failed");
                break;
            }
        }
    }
}

fn write_input<T: Serialize>(
    fs: &dyn FileSystem,
    output: &Output,
    stage: &str,
    job: &T,
) -> Result<PathBuf> {
    let path = output.root().join(format!("{stage}.yaml"));
    let yaml = serde_yaml::to_string(job).with_context(|| format!("serializing {stage} input"))?;
    fs.write(&path, yaml.as_bytes())?;
    debug!(path = %path.display(), "engine input written");
    Ok(path)
}

fn parse_module_list(stdout: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(stdout)
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

impl Installer for ProcessEngine {
    fn install<'a>(
        &'a self,
        ctx: &'a ExecContext,
        deployment: &'a Deployment,
        output: &'a Output,
        opts: EngineOptions,
    ) -> EngineFuture<'a, ()> {
        Box::pin(self.run_job(ctx, "install", deployment, output, opts))
    }

    fn reset<'a>(
        &'a self,
        ctx: &'a ExecContext,
        deployment: &'a Deployment,
        output: &'a Output,
        opts: EngineOptions,
    ) -> EngineFuture<'a, ()> {
        Box::pin(self.run_job(ctx, "reset", deployment, output, opts))
    }
}

impl ImageBuilder for ProcessEngine {
    fn build<'a>(
        &'a self,
        ctx: &'a ExecContext,
        definition: &'a Definition,
        output: &'a Output,
        opts: EngineOptions,
    ) -> EngineFuture<'a, ()> {
        Box::pin(self.run_job(ctx, "build", definition, output, opts))
    }
}

impl Customizer for ProcessEngine {
    fn customize<'a>(
        &'a self,
        ctx: &'a ExecContext,
        definition: &'a Definition,
        output: &'a Output,
        opts: EngineOptions,
    ) -> EngineFuture<'a, ()> {
        Box::pin(self.run_job(ctx, "customize", definition, output, opts))
    }
}

impl KernelModules for ProcessEngine {
    fn list<'a>(&'a self, ctx: &'a ExecContext) -> EngineFuture<'a, Vec<String>> {
        Box::pin(async move {
            let stdout = self.kmod(ctx, "list", &[]).await?;
            Ok(parse_module_list(&stdout))
        })
    }

    fn reload<'a>(&'a self, ctx: &'a ExecContext, modules: &'a [String]) -> EngineFuture<'a, ()> {
        Box::pin(async move { self.kmod(ctx, "reload", modules).await.map(|_| ()) })
    }

    fn unload<'a>(&'a self, ctx: &'a ExecContext, modules: &'a [String]) -> EngineFuture<'a, ()> {
        Box::pin(async move { self.kmod(ctx, "unload", modules).await.map(|_| ()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancelSource;
    use crate::deployment::default_deployment;
    use crate::fs::mock::MockFileSystem;
    use std::path::Path;
    use std::time::Duration;

    #[test]
    fn module_list_skips_blank_lines() {
        let mods = parse_module_list(b"nvidia\n\n  zfs  \n");
        assert_eq!(mods, vec!["nvidia", "zfs"]);
    }

    #[test]
    fn input_is_written_into_workspace() -> Result<()> {
        let fs = MockFileSystem::new();
        let out = Output::create(&fs, Some(Path::new("/work")), None)?;
        let path = write_input(&fs, &out, "install", &default_deployment())?;
        assert_eq!(path, Path::new("/work/install.yaml"));
        assert!(fs.read_to_string(&path)?.contains("bootConfig:"));
        Ok(())
    }

    #[tokio::test]
    async fn missing_program_fails_to_spawn() {
        let engine = ProcessEngine::new(
            "/nonexistent/elemental-engine",
            Arc::new(MockFileSystem::new()),
        );
        let err = engine.list(&ExecContext::background()).await.unwrap_err();
        assert!(err.to_string().contains("spawning engine"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn cancellation_kills_process() {
        let engine = ProcessEngine::new("sleep", Arc::new(MockFileSystem::new()));
        let source = CancelSource::new();
        let ctx = source.context();
        source.cancel();

        let res = tokio::time::timeout(
            Duration::from_secs(5),
            engine.spawn(&ctx, "sleep", &["30".to_string()]),
        )
        .await
        .expect("cancelled engine returns promptly");
        assert!(res.unwrap_err().to_string().contains("cancelled"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn invalid_utf8_on_stderr_keeps_pipe_open() {
        let engine = ProcessEngine::new("sh", Arc::new(MockFileSystem::new()));
        let script = "printf '\\377\\n' >&2; sleep 0.3; \
                      i=0; while [ $i -lt 2000 ]; do echo \"progress $i\" >&2; i=$((i+1)); done; \
                      echo done; exit 0";

        let out = tokio::time::timeout(
            Duration::from_secs(10),
            engine.spawn(
                &ExecContext::background(),
                "install",
                &["-c".to_string(), script.to_string()],
            ),
        )
        .await
        .expect("engine finishes")
        .expect("engine exits successfully");
        assert_eq!(out, b"done\n");
    }
}
