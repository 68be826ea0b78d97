//! risklab - Main Entry Point
//!
//! Health-risk dataset pipeline with a subcommand CLI.

use clap::Parser;
use risklab::cli::{cmd_analyze, cmd_info, cmd_predict, cmd_train, Cli, Commands};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "risklab=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Info { data, target } => {
            cmd_info(&data, &target)?;
        }
        Commands::Analyze { data, target, x, y, json } => {
            cmd_analyze(&data, &target, x.as_deref(), y.as_deref(), json)?;
        }
        Commands::Train { data, target, features, test_fraction, seed, trees } => {
            cmd_train(&data, &target, &features, test_fraction, seed, trees)?;
        }
        Commands::Predict { data, target, features, test_fraction, seed, trees, values } => {
            cmd_predict(&data, &target, &features, test_fraction, seed, trees, &values)?;
        }
    }

    Ok(())
}
