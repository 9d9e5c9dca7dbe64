// src/cancel.rs

//! Cancellation contexts handed to engines.
//!
//! An [`ExecContext`] is a read-only view on a [`CancelSource`]. Actions derive
//! a fresh context per engine call with [`with_cancellation`], which cancels it
//! on whichever comes first: the caller's own context or a termination signal.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Owning side of a cancellation context.
#[derive(Debug, Clone)]
pub struct CancelSource {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelSource {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Cancel every context derived from this source. Idempotent.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn context(&self) -> ExecContext {
        ExecContext {
            rx: Some(self.tx.subscribe()),
        }
    }
}

impl Default for CancelSource {
    fn default() -> Self {
        Self::new()
    }
}

/// Cancellation view passed to engines.
#[derive(Debug, Clone)]
pub struct ExecContext {
    rx: Option<watch::Receiver<bool>>,
}

impl ExecContext {
    /// A context that is never cancelled.
    pub fn background() -> Self {
        Self { rx: None }
    }

    pub fn is_cancelled(&self) -> bool {
        self.rx.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Resolves once the context is cancelled; pends forever otherwise.
    pub async fn cancelled(&self) {
        let Some(rx) = &self.rx else {
            return std::future::pending().await;
        };
        let mut rx = rx.clone();
        if rx.wait_for(|cancelled| *cancelled).await.is_err() {
            // Source dropped without cancelling.
            std::future::pending::<()>().await;
        }
    }
}

/// Run `run` with a derived context cancelled on the first of `ambient`
/// or `signal`.
///
/// The engine future is always driven to completion: cancellation is only
/// signalled, so the engine can stop cleanly and report its own error. The
/// derived source is dropped on every return path.
pub async fn with_cancellation<T, S, F, Fut>(ambient: &ExecContext, signal: S, run: F) -> T
where
    S: Future<Output = ()>,
    F: FnOnce(ExecContext) -> Fut,
    Fut: Future<Output = T>,
{
    let source = CancelSource::new();
    let engine = run(source.context());
    tokio::pin!(engine);
    tokio::pin!(signal);

    loop {
        tokio::select! {
            out = &mut engine => return out,
            _ = ambient.cancelled(), if !source.is_cancelled() => {
                info!("cancellation requested, stopping engine");
                source.cancel();
            }
            _ = &mut signal, if !source.is_cancelled() => {
                warn!("termination signal received, stopping engine");
                source.cancel();
            }
        }
    }
}

/// Resolves on SIGINT or SIGTERM.
///
/// If the handlers cannot be installed this never resolves; the action then
/// only reacts to its ambient context.
#[cfg(unix)]
pub async fn termination_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let (mut interrupt, mut terminate) =
        match (signal(SignalKind::interrupt()), signal(SignalKind::terminate())) {
            (Ok(i), Ok(t)) => (i, t),
            (Err(e), _) | (_, Err(e)) => {
                warn!(error = %e, "failed to install signal handlers");
                return std::future::pending().await;
            }
        };

    tokio::select! {
        _ = interrupt.recv() => debug!("received SIGINT"),
        _ = terminate.recv() => debug!("received SIGTERM"),
    }
}

#[cfg(not(unix))]
pub async fn termination_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}
