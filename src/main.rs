// src/main.rs

use elemental::cancel::ExecContext;
use elemental::exec::Engines;
use elemental::sys::System;
use elemental::{cli, logging, run};

#[tokio::main]
async fn main() {
    if let Err(err) = run_main().await {
        eprintln!("elemental error: {err:?}");
        std::process::exit(1);
    }
}

async fn run_main() -> anyhow::Result<()> {
    let args = cli::parse();
    logging::init_logging(args.debug, args.log_file.as_deref())?;

    let system = System::new();
    let engines = Engines::process(&args.engine, system.shared_fs());
    run(&args, &system, &engines, &ExecContext::background()).await
}
