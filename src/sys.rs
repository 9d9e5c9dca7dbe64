// src/sys.rs

//! Handle on the host system, passed explicitly to every action.

use std::sync::Arc;

use crate::fs::{FileSystem, RealFileSystem};
use crate::platform::Platform;
use crate::runner::{CommandRunner, RealRunner};

#[derive(Debug, Clone)]
pub struct System {
    fs: Arc<dyn FileSystem>,
    runner: Arc<dyn CommandRunner>,
    platform: Platform,
}

impl System {
    /// The real host: `std::fs`, `tokio::process` and the host platform.
    pub fn new() -> Self {
        Self {
            fs: Arc::new(RealFileSystem),
            runner: Arc::new(RealRunner),
            platform: Platform::host(),
        }
    }

    pub fn with_fs(mut self, fs: impl FileSystem + 'static) -> Self {
        self.fs = Arc::new(fs);
        self
    }

    pub fn with_runner(mut self, runner: impl CommandRunner + 'static) -> Self {
        self.runner = Arc::new(runner);
        self
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub fn fs(&self) -> &dyn FileSystem {
        self.fs.as_ref()
    }

    /// Owned handle for collaborators that outlive a borrow (engines).
    pub fn shared_fs(&self) -> Arc<dyn FileSystem> {
        self.fs.clone()
    }

    pub fn runner(&self) -> &dyn CommandRunner {
        self.runner.as_ref()
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }
}

impl Default for System {
    fn default() -> Self {
        Self::new()
    }
}
