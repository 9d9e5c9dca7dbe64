// src/actions/mod.rs

//! Subcommand handlers.
//!
//! Every action follows the same shape: resolve its job, create a workspace,
//! run the engine under a signal-aware context, clean up, report. Failures
//! before the workspace exists leave nothing behind.

use crate::cli::DeploymentFlags;
use crate::exec::EngineOptions;

pub mod build;
pub mod customize;
pub mod install;
pub mod kmod;
pub mod reset;

pub use build::build;
pub use customize::customize;
pub use install::install;
pub use kmod::manage_kernel_modules;
pub use reset::reset;

impl From<&DeploymentFlags> for EngineOptions {
    fn from(flags: &DeploymentFlags) -> Self {
        Self {
            verify: flags.verify,
            local: flags.local,
        }
    }
}
