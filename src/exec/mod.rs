// src/exec/mod.rs

//! Pluggable execution engines.
//!
//! Actions never touch disks, images or kernel modules themselves; they hand
//! a validated job plus a workspace to one of these traits. Production code
//! uses [`process::ProcessEngine`], tests provide recording fakes.

use std::fmt::Debug;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use anyhow::Result;

use crate::cancel::ExecContext;
use crate::deployment::Deployment;
use crate::fs::FileSystem;
use crate::image::Definition;
use crate::workspace::Output;

pub mod process;

pub use process::ProcessEngine;

pub type EngineFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Per-invocation switches forwarded to every engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineOptions {
    /// Verify TLS when pulling OCI images.
    pub verify: bool,
    /// Use the local container storage instead of pulling.
    pub local: bool,
}

/// Installs or resets a deployment onto its target disk.
pub trait Installer: Send + Sync + Debug {
    fn install<'a>(
        &'a self,
        ctx: &'a ExecContext,
        deployment: &'a Deployment,
        output: &'a Output,
        opts: EngineOptions,
    ) -> EngineFuture<'a, ()>;

    fn reset<'a>(
        &'a self,
        ctx: &'a ExecContext,
        deployment: &'a Deployment,
        output: &'a Output,
        opts: EngineOptions,
    ) -> EngineFuture<'a, ()>;
}

pub trait ImageBuilder: Send + Sync + Debug {
    fn build<'a>(
        &'a self,
        ctx: &'a ExecContext,
        definition: &'a Definition,
        output: &'a Output,
        opts: EngineOptions,
    ) -> EngineFuture<'a, ()>;
}

pub trait Customizer: Send + Sync + Debug {
    fn customize<'a>(
        &'a self,
        ctx: &'a ExecContext,
        definition: &'a Definition,
        output: &'a Output,
        opts: EngineOptions,
    ) -> EngineFuture<'a, ()>;
}

/// Additional (out-of-tree) kernel modules of the running system.
pub trait KernelModules: Send + Sync + Debug {
    fn list<'a>(&'a self, ctx: &'a ExecContext) -> EngineFuture<'a, Vec<String>>;

    fn reload<'a>(&'a self, ctx: &'a ExecContext, modules: &'a [String]) -> EngineFuture<'a, ()>;

    fn unload<'a>(&'a self, ctx: &'a ExecContext, modules: &'a [String]) -> EngineFuture<'a, ()>;
}

/// The set of engines an invocation may use.
#[derive(Debug, Clone)]
pub struct Engines {
    pub installer: Arc<dyn Installer>,
    pub builder: Arc<dyn ImageBuilder>,
    pub customizer: Arc<dyn Customizer>,
    pub kernel_modules: Arc<dyn KernelModules>,
}

impl Engines {
    /// Every engine backed by the same external program.
    pub fn process(program: &str, fs: Arc<dyn FileSystem>) -> Self {
        let engine = Arc::new(ProcessEngine::new(program, fs));
        Self {
            installer: engine.clone(),
            builder: engine.clone(),
            customizer: engine.clone(),
            kernel_modules: engine,
        }
    }
}
