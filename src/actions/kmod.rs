// src/actions/kmod.rs

use anyhow::{Context, Result};
use tracing::info;

use crate::cancel::{termination_signal, with_cancellation, ExecContext};
use crate::cli::KernelModulesFlags;
use crate::exec::Engines;

/// `elemental kmod --reload|--unload`
pub async fn manage_kernel_modules(
    engines: &Engines,
    ctx: &ExecContext,
    flags: &KernelModulesFlags,
) -> Result<()> {
    let kmods = engines.kernel_modules.as_ref();

    let modules = kmods
        .list(ctx)
        .await
        .context("listing kernel modules failed, unable to proceed")?;

    if modules.is_empty() {
        info!("no additional kernel modules found, skipping operation");
        return Ok(());
    }
    info!(count = modules.len(), ?modules, "found additional kernel modules");

    let unload = flags.unload;
    let mods = modules.as_slice();
    with_cancellation(ctx, termination_signal(), move |ctx| async move {
        if unload {
            kmods.unload(&ctx, mods).await.context("unloading kernel modules")
        } else {
            kmods.reload(&ctx, mods).await.context("reloading kernel modules")
        }
    })
    .await
}
