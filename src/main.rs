use anyhow::Result;
use clap::Parser;
use docstoaudio::{cli, logging};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file before anything else (silently ignore if missing)
    dotenvy::dotenv().ok();

    let cli_args = cli::Cli::parse();
    // The real subscriber depends on the config, so loading logs to stderr.
    let config = tracing::subscriber::with_default(
        logging::bootstrap_subscriber(cli_args.debug),
        || cli_args.load_config(),
    )?;

    let log_config = logging::LogConfig::new()
        .with_level(config.logging.level.clone())
        .with_debug_mode(cli_args.debug)
        .with_log_file(config.logging.file.clone());

    let _guard = logging::init_logging(log_config)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    tracing::debug!("docstoaudio {} starting", docstoaudio::VERSION);

    cli::run(cli_args, config).await
}
