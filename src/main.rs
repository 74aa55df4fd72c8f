// SKYLINE Main Entry Point
// Copyright (c) 2026 Xing_The_Creator | SKYLINE

use anyhow::Context;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use tracing::info;

use skyline_core::cleanup::CleanupSweeper;
use skyline_core::config::AppConfig;
use skyline_core::params::StyleParameters;
use skyline_core::state::AppState;
use skyline_core::{server, store, variation};

#[derive(Parser)]
#[command(name = "skyline")]
#[command(about = "SKYLINE cityscape art backend", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the web server
    Serve {
        /// Port to listen on (overrides SKYLINE_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Print a varied copy of a style parameter record
    Randomize {
        /// Base record as JSON (defaults to the drawing client's defaults)
        #[arg(long)]
        params: Option<String>,

        /// Seed for a reproducible variation
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Run one cleanup sweep and exit
    Cleanup,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    let args = Cli::parse();
    let mut config = AppConfig::from_env()?;

    match args.command {
        Commands::Serve { port } => {
            if let Some(port) = port {
                config.port = port;
            }
            info!("--- SKYLINE v{} ---", env!("CARGO_PKG_VERSION"));

            let store = store::open_store(&config);
            let sweeper = Arc::new(CleanupSweeper::new(
                store.clone(),
                config.output_dir.clone(),
                config.retention,
                config.cleanup_interval,
            ));
            sweeper.start();

            let state = Arc::new(AppState::new(config, store));
            let result = server::start_server(state).await;
            sweeper.stop();
            result?;
        }
        Commands::Randomize { params, seed } => {
            let base = match params {
                Some(json) => serde_json::from_str::<StyleParameters>(&json)
                    .context("--params is not a valid style parameter record")?,
                None => StyleParameters::from_form(&Default::default())?,
            };

            let derived = match seed {
                Some(seed) => variation::randomize(&base, &mut StdRng::seed_from_u64(seed)),
                None => variation::randomize(&base, &mut rand::thread_rng()),
            };
            println!("{}", serde_json::to_string_pretty(&derived)?);
        }
        Commands::Cleanup => {
            let store = store::open_store(&config);
            let sweeper = CleanupSweeper::new(
                store,
                config.output_dir.clone(),
                config.retention,
                config.cleanup_interval,
            );
            let (files, entries) = sweeper.sweep_once()?;
            info!("[CLEANUP] Removed {} files and {} entries", files, entries);
        }
    }

    Ok(())
}
