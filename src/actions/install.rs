// src/actions/install.rs

use anyhow::{Context, Result};
use tracing::{debug, error, info};

use crate::cancel::{termination_signal, with_cancellation, ExecContext};
use crate::cli::InstallFlags;
use crate::exec::{EngineOptions, Engines};
use crate::resolve::resolve_install;
use crate::sys::System;
use crate::workspace::Output;

/// `elemental install`
pub async fn install(
    system: &System,
    engines: &Engines,
    ctx: &ExecContext,
    flags: &InstallFlags,
) -> Result<()> {
    info!("starting install action");
    debug!(?flags, "install action called");

    let deployment = resolve_install(system, flags)
        .inspect_err(|_| error!("failed to collect installation setup"))
        .context("resolving install setup")?;

    info!("checked configuration, running installation process");

    let output =
        Output::create(system.fs(), None, None).context("creating working directory")?;

    let installer = engines.installer.as_ref();
    let opts = EngineOptions::from(&flags.deployment);
    let (d, out) = (&deployment, &output);
    let res = with_cancellation(ctx, termination_signal(), move |ctx| async move {
        installer.install(&ctx, d, out, opts).await
    })
    .await;

    output.cleanup_logged(system.fs());

    res.inspect_err(|_| error!("installation failed"))
        .context("installing deployment")?;

    info!("installation complete");
    Ok(())
}
