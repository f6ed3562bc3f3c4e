use clap::Parser;
use pgdatadiff::utils::{logger, validation::Validate};
use pgdatadiff::{
    CliArgs, ConsoleStatus, DiffConfig, DiffEngine, DiffError, LocalStorage, PgSession,
    ReportWriter,
};

#[tokio::main]
async fn main() {
    let cli = CliArgs::parse();

    logger::init_from_env(cli.verbose);
    tracing::info!("Starting pgdatadiff {}", env!("CARGO_PKG_VERSION"));

    let code = match run(&cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("❌ pgdatadiff failed: {} (Category: {:?})", e, e.category());
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 Suggestion: {}", e.recovery_suggestion());
            e.exit_code()
        }
    };

    std::process::exit(code);
}

async fn run(cli: &CliArgs) -> Result<i32, DiffError> {
    let config = DiffConfig::resolve(cli)?;
    config.validate()?;

    tracing::debug!(
        firstdb = %config.redacted_first(),
        seconddb = %config.redacted_second(),
        options = ?config.options,
        "Resolved configuration"
    );
    if cli.monitor {
        tracing::info!("🔍 System monitoring enabled");
    }

    let policy = config.options.retry;
    let first = PgSession::connect_with_retry(&config.firstdb, "first", &policy).await?;
    let second = PgSession::connect_with_retry(&config.seconddb, "second", &policy).await?;

    let engine = DiffEngine::new_with_monitoring(
        first,
        second,
        config.options.clone(),
        Box::new(ConsoleStatus::detect()),
        cli.monitor,
    )
    .with_labels(config.redacted_first(), config.redacted_second());

    let report = engine.run().await?;

    if let Some(path) = &config.report {
        ReportWriter::new(LocalStorage::new(".")).write(path, &report).await?;
    }

    if report.sequences_skipped {
        tracing::warn!("Sequences were not compared because table data differs");
    }

    Ok(report.exit_code())
}
