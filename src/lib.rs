// src/lib.rs

pub mod actions;
pub mod block;
pub mod cancel;
pub mod cli;
pub mod deployment;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod image;
pub mod live;
pub mod logging;
pub mod platform;
pub mod resolve;
pub mod runner;
pub mod sys;
pub mod types;
pub mod workspace;

use anyhow::Result;
use tracing::debug;

use crate::cancel::ExecContext;
use crate::cli::{CliArgs, Command};
use crate::exec::Engines;
use crate::sys::System;

/// High-level entry point used by `main.rs`.
///
/// Dispatches the parsed subcommand to its action. `ctx` is the ambient
/// cancellation context; each action additionally listens for SIGINT/SIGTERM.
pub async fn run(
    args: &CliArgs,
    system: &System,
    engines: &Engines,
    ctx: &ExecContext,
) -> Result<()> {
    debug!(platform = %system.platform(), "running on host");

    match &args.command {
        Command::Install(flags) => actions::install(system, engines, ctx, flags).await,
        Command::Reset(flags) => actions::reset(system, engines, ctx, flags).await,
        Command::Build(flags) => actions::build(system, engines, ctx, flags).await,
        Command::Customize(flags) => actions::customize(system, engines, ctx, flags).await,
        Command::Kmod(flags) => actions::manage_kernel_modules(engines, ctx, flags).await,
    }
}
