use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, bail};
use elemental::cancel::ExecContext;
use elemental::deployment::Deployment;
use elemental::exec::{
    Customizer, EngineFuture, EngineOptions, Engines, ImageBuilder, Installer, KernelModules,
};
use elemental::image::Definition;
use elemental::workspace::Output;

/// One recorded engine invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    Install { deployment: Deployment, workspace: PathBuf, opts: EngineOptions },
    Reset { deployment: Deployment, workspace: PathBuf, opts: EngineOptions },
    Build { definition: Definition, workspace: PathBuf },
    Customize { definition: Definition, workspace: PathBuf },
    ListModules,
    Reload(Vec<String>),
    Unload(Vec<String>),
}

/// What every job-running call does after being recorded.
#[derive(Debug, Clone, Default)]
pub enum Behaviour {
    #[default]
    Succeed,
    Fail(String),
    /// Block until the context is cancelled, then fail.
    WaitForCancel,
}

/// A fake engine that:
/// - records every call (with the workspace it was given)
/// - succeeds, fails or waits for cancellation depending on its behaviour.
#[derive(Debug, Clone, Default)]
pub struct FakeEngine {
    calls: Arc<Mutex<Vec<EngineCall>>>,
    behaviour: Behaviour,
    modules: Vec<String>,
    saw_cancel: Arc<AtomicBool>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(msg: &str) -> Self {
        Self {
            behaviour: Behaviour::Fail(msg.to_string()),
            ..Self::default()
        }
    }

    pub fn waiting_for_cancel() -> Self {
        Self {
            behaviour: Behaviour::WaitForCancel,
            ..Self::default()
        }
    }

    pub fn with_modules(mut self, modules: &[&str]) -> Self {
        self.modules = modules.iter().map(|m| m.to_string()).collect();
        self
    }

    /// Bundle this fake as every engine.
    pub fn engines(&self) -> Engines {
        let engine = Arc::new(self.clone());
        Engines {
            installer: engine.clone(),
            builder: engine.clone(),
            customizer: engine.clone(),
            kernel_modules: engine,
        }
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn saw_cancel(&self) -> bool {
        self.saw_cancel.load(Ordering::SeqCst)
    }

    fn record(&self, call: EngineCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn finish<'a>(&'a self, ctx: &'a ExecContext) -> EngineFuture<'a, ()> {
        Box::pin(async move {
            match &self.behaviour {
                Behaviour::Succeed => Ok(()),
                Behaviour::Fail(msg) => Err(anyhow!("{msg}")),
                Behaviour::WaitForCancel => {
                    ctx.cancelled().await;
                    self.saw_cancel.store(true, Ordering::SeqCst);
                    bail!("engine cancelled")
                }
            }
        })
    }
}

impl Installer for FakeEngine {
    fn install<'a>(
        &'a self,
        ctx: &'a ExecContext,
        deployment: &'a Deployment,
        output: &'a Output,
        opts: EngineOptions,
    ) -> EngineFuture<'a, ()> {
        self.record(EngineCall::Install {
            deployment: deployment.clone(),
            workspace: output.root().to_path_buf(),
            opts,
        });
        self.finish(ctx)
    }

    fn reset<'a>(
        &'a self,
        ctx: &'a ExecContext,
        deployment: &'a Deployment,
        output: &'a Output,
        opts: EngineOptions,
    ) -> EngineFuture<'a, ()> {
        self.record(EngineCall::Reset {
            deployment: deployment.clone(),
            workspace: output.root().to_path_buf(),
            opts,
        });
        self.finish(ctx)
    }
}

impl ImageBuilder for FakeEngine {
    fn build<'a>(
        &'a self,
        ctx: &'a ExecContext,
        definition: &'a Definition,
        output: &'a Output,
        _opts: EngineOptions,
    ) -> EngineFuture<'a, ()> {
        self.record(EngineCall::Build {
            definition: definition.clone(),
            workspace: output.root().to_path_buf(),
        });
        self.finish(ctx)
    }
}

impl Customizer for FakeEngine {
    fn customize<'a>(
        &'a self,
        ctx: &'a ExecContext,
        definition: &'a Definition,
        output: &'a Output,
        _opts: EngineOptions,
    ) -> EngineFuture<'a, ()> {
        self.record(EngineCall::Customize {
            definition: definition.clone(),
            workspace: output.root().to_path_buf(),
        });
        self.finish(ctx)
    }
}

impl KernelModules for FakeEngine {
    fn list<'a>(&'a self, _ctx: &'a ExecContext) -> EngineFuture<'a, Vec<String>> {
        self.record(EngineCall::ListModules);
        let modules = self.modules.clone();
        Box::pin(async move { Ok(modules) })
    }

    fn reload<'a>(&'a self, ctx: &'a ExecContext, modules: &'a [String]) -> EngineFuture<'a, ()> {
        self.record(EngineCall::Reload(modules.to_vec()));
        self.finish(ctx)
    }

    fn unload<'a>(&'a self, ctx: &'a ExecContext, modules: &'a [String]) -> EngineFuture<'a, ()> {
        self.record(EngineCall::Unload(modules.to_vec()));
        self.finish(ctx)
    }
}
