// src/actions/build.rs

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use crate::cancel::{termination_signal, with_cancellation, ExecContext};
use crate::cli::BuildFlags;
use crate::exec::{EngineOptions, Engines};
use crate::image::Definition;
use crate::sys::System;
use crate::workspace::{build_root, Output};

/// `elemental build` (deprecated in favour of `customize`).
pub async fn build(
    system: &System,
    engines: &Engines,
    ctx: &ExecContext,
    flags: &BuildFlags,
) -> Result<()> {
    warn!("build is deprecated, switch to customize going forward");

    info!("reading image configuration");
    let definition = Definition::for_build(system.fs(), flags)
        .inspect_err(|_| error!("input arguments are invalid"))
        .context("validating build arguments")?;
    info!("validated image configuration");

    let root = build_root(&flags.build_dir);
    let output = Output::create(system.fs(), Some(&root), None)
        .context("creating build directory")?;

    info!(
        platform = %definition.image.platform,
        image_type = %definition.image.image_type,
        "starting build process"
    );

    let builder = engines.builder.as_ref();
    let opts = EngineOptions {
        verify: true,
        local: flags.local,
    };
    let (def, out) = (&definition, &output);
    let res = with_cancellation(ctx, termination_signal(), move |ctx| async move {
        builder.build(&ctx, def, out, opts).await
    })
    .await;

    output.cleanup_logged(system.fs());

    res.inspect_err(|_| error!("build process failed"))
        .context("building image")?;

    info!(output = %definition.image.output_image_name.display(), "build process complete");
    Ok(())
}
