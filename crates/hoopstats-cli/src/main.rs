// Import entry point.
//
// Startup sequence:
// 1. Initialize tracing (stderr, so stdout carries only the report)
// 2. Load config, bootstrapping config/ from defaults/
// 3. Run schema setup, import and reporting
// 4. Print the report

use anyhow::Context;
use hoopstats_core::{config, pipeline};
use tracing::{info, warn};

fn main() -> anyhow::Result<()> {
    init_tracing()?;
    info!("hoopstats import starting");

    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: database={}, data_dir={}, mode={:?}, reset={}",
        config.database.path, config.import.data_dir, config.import.schema_mode, config.import.reset
    );

    let outcome = pipeline::run(&config).context("import run failed")?;

    if !outcome.import.skipped.is_empty() {
        warn!(
            "{} file(s) skipped: no year in file name",
            outcome.import.skipped.len()
        );
    }

    match outcome.report {
        Some(report) => print!("{report}"),
        None => warn!("Import finished but the report could not be produced"),
    }

    info!(
        "Done: {} files, {} rows",
        outcome.import.files.len(),
        outcome.import.total_rows()
    );
    Ok(())
}

fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let subscriber = fmt::Subscriber::builder()
        .compact()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("hoopstats_core=info,hoopstats_import=info,warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
