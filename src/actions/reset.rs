// src/actions/reset.rs

use anyhow::{Context, Result};
use tracing::{debug, error, info};

use crate::cancel::{termination_signal, with_cancellation, ExecContext};
use crate::cli::ResetFlags;
use crate::exec::{EngineOptions, Engines};
use crate::resolve::resolve_reset;
use crate::sys::System;
use crate::workspace::Output;

/// `elemental reset`: reinstall the host from its recovery system.
pub async fn reset(
    system: &System,
    engines: &Engines,
    ctx: &ExecContext,
    flags: &ResetFlags,
) -> Result<()> {
    info!("starting reset action");
    debug!(?flags, "reset action called");

    let deployment = resolve_reset(system, flags)
        .await
        .inspect_err(|_| error!("failed to collect reset setup"))
        .context("resolving reset setup")?;

    let output =
        Output::create(system.fs(), None, None).context("creating working directory")?;

    info!("running reset process");

    let installer = engines.installer.as_ref();
    let opts = EngineOptions::from(&flags.deployment);
    let (d, out) = (&deployment, &output);
    let res = with_cancellation(ctx, termination_signal(), move |ctx| async move {
        installer.reset(&ctx, d, out, opts).await
    })
    .await;

    output.cleanup_logged(system.fs());

    res.inspect_err(|_| error!("reset failed"))
        .context("resetting deployment")?;

    info!("reset complete");
    Ok(())
}
