// SPDX-FileCopyrightText: 2026 Lumi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lumi - a WhatsApp AI agent.
//!
//! This is the binary entry point for the Lumi agent.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod check;
mod serve;

use clap::{Parser, Subcommand};

/// Lumi - a WhatsApp AI agent.
#[derive(Parser, Debug)]
#[command(name = "lumi", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP server and agent.
    Serve,
    /// Validate the configuration and print a summary.
    CheckConfig,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match lumi_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            lumi_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    match cli.command {
        Some(Commands::Serve) => {
            if let Err(e) = serve::run_serve(config).await {
                eprintln!("error: {e}");
                std::process::exit(1);
            }
        }
        Some(Commands::CheckConfig) => check::run_check_config(&config),
        None => {
            println!("lumi: use --help for available commands");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn check_config_subcommand_parses() {
        let cli = Cli::try_parse_from(["lumi", "check-config"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::CheckConfig)));
    }

    #[test]
    fn binary_loads_config_defaults() {
        let config = lumi_config::load_and_validate_str("").expect("default config should be valid");
        assert_eq!(config.agent.name, "Lumi");
    }
}
