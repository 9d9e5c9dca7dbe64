// src/actions/customize.rs

use anyhow::{Context, Result};
use tracing::{debug, error, info};

use crate::cancel::{termination_signal, with_cancellation, ExecContext};
use crate::cli::CustomizeFlags;
use crate::exec::{EngineOptions, Engines};
use crate::image::Definition;
use crate::sys::System;
use crate::workspace::{resolve_output_paths, Output};

/// `elemental customize`: produce installer media from a release.
pub async fn customize(
    system: &System,
    engines: &Engines,
    ctx: &ExecContext,
    flags: &CustomizeFlags,
) -> Result<()> {
    info!("customizing image started");

    let (image_path, config_dir) = resolve_output_paths(flags);
    debug!(image = %image_path.display(), ?config_dir, "resolved output paths");

    let definition = Definition::for_customize(system.fs(), flags, &image_path)
        .inspect_err(|_| error!("digesting image definition from customize flags failed"))
        .context("digesting customize definition")?;

    let output = Output::create(system.fs(), None, config_dir.as_deref())
        .context("creating working directory")?;

    let res = match output.ensure_iso_store(system.fs()) {
        Ok(()) => {
            let customizer = engines.customizer.as_ref();
            let opts = EngineOptions {
                verify: true,
                local: flags.local,
            };
            let (def, out) = (&definition, &output);
            with_cancellation(ctx, termination_signal(), move |ctx| async move {
                customizer.customize(&ctx, def, out, opts).await
            })
            .await
            .inspect_err(|_| error!("customizing installer media failed"))
            .context("customizing installer media")
        }
        Err(err) => Err(err).context("creating ISO store directory"),
    };

    debug!("cleaning up working directory");
    output.cleanup_logged(system.fs());
    res?;

    info!(image = %image_path.display(), "customize complete");
    Ok(())
}
