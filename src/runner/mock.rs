// src/runner/mock.rs

use std::fmt;
use std::sync::{Arc, Mutex};

use anyhow::Result;

use super::{CommandRunner, RunFuture};

type SideEffect = dyn Fn(&str, &[&str]) -> Result<Vec<u8>> + Send + Sync;

/// Scriptable runner that records every invocation.
///
/// Without a side effect every command succeeds with empty output.
#[derive(Clone, Default)]
pub struct MockRunner {
    calls: Arc<Mutex<Vec<Vec<String>>>>,
    side_effect: Option<Arc<SideEffect>>,
}

impl MockRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_side_effect<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &[&str]) -> Result<Vec<u8>> + Send + Sync + 'static,
    {
        self.side_effect = Some(Arc::new(f));
        self
    }

    /// Every recorded invocation as `[program, args...]`.
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls
            .lock()
            .map(|c| c.clone())
            .unwrap_or_default()
    }
}

impl fmt::Debug for MockRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockRunner")
            .field("calls", &self.calls())
            .finish_non_exhaustive()
    }
}

impl CommandRunner for MockRunner {
    fn run<'a>(&'a self, program: &'a str, args: &'a [&'a str]) -> RunFuture<'a> {
        if let Ok(mut calls) = self.calls.lock() {
            let mut call = vec![program.to_string()];
            call.extend(args.iter().map(|a| a.to_string()));
            calls.push(call);
        }

        let result = match &self.side_effect {
            Some(f) => f(program, args),
            None => Ok(Vec::new()),
        };
        Box::pin(async move { result })
    }
}
