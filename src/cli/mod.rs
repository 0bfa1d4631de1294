//! CLI Module
//!
//! Command-line interface for docstoaudio using Clap v4.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Config;
use crate::server;

/// docstoaudio - translate documents and read them aloud over HTTP
#[derive(Parser, Debug)]
#[command(name = "docstoaudio")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Run the HTTP server (default)
    Serve {
        /// Address to bind (overrides config)
        #[arg(short, long)]
        bind: Option<String>,

        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Show the effective configuration
    Config {
        /// Show the API key instead of masking it
        #[arg(short, long)]
        show_secrets: bool,
    },

    /// Write a default ./docstoaudio.toml
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

impl Cli {
    /// Load configuration honouring `--config`.
    pub fn load_config(&self) -> Result<Config> {
        match &self.config {
            Some(path) => Config::load_from_path(path),
            None => Config::load(),
        }
    }
}

/// Execute the parsed command line against a loaded configuration.
pub async fn run(cli: Cli, mut config: Config) -> Result<()> {
    let command = cli.command.unwrap_or(Commands::Serve {
        bind: None,
        port: None,
    });

    match command {
        Commands::Serve { bind, port } => {
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            config.validate()?;
            server::start(&config, shutdown_signal()).await
        }
        Commands::Config { show_secrets } => {
            print!("{}", config.to_display_toml(show_secrets)?);
            Ok(())
        }
        Commands::Init { force } => cmd_init(force),
    }
}

fn cmd_init(force: bool) -> Result<()> {
    let path = Config::local_config_path();
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists. Use --force to overwrite.",
            path.display()
        );
    }
    Config::default()
        .save(&path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Wrote {}", path.display());
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => tracing::error!("Failed to listen for shutdown signal: {}", e),
    }
}
