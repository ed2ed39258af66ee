//! stepwise CLI entry point.
//!
//! Commands:
//! - `run`     Answer a single query and exit
//! - `chat`    Multi-turn chat over stdin, history kept in memory
//! - `config`  Show the resolved configuration or write a default one

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "stepwise",
    about = "stepwise: a bounded, tool-using LLM agent",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file to use instead of ~/.stepwise/config.toml
    #[arg(short, long, global = true, env = "STEPWISE_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer one query and print the final response
    Run {
        /// The question to answer
        query: String,

        /// Also print the full step trace as JSON
        #[arg(long)]
        trace: bool,
    },

    /// Chat interactively; type 'exit' to quit
    Chat,

    /// Print the resolved configuration (secrets redacted)
    Config {
        /// Write a default config file instead
        #[arg(long)]
        init: bool,

        /// Overwrite an existing file with --init
        #[arg(long, requires = "init")]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries only answers
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Run { query, trace } => commands::run::run(config_path, &query, trace).await?,
        Commands::Chat => commands::chat::run(config_path).await?,
        Commands::Config { init, force } => commands::config_cmd::run(config_path, init, force)?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_run_with_trace() {
        let cli = Cli::try_parse_from(["stepwise", "run", "what time is it?", "--trace"]).unwrap();
        match cli.command {
            Commands::Run { query, trace } => {
                assert_eq!(query, "what time is it?");
                assert!(trace);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn force_requires_init() {
        assert!(Cli::try_parse_from(["stepwise", "config", "--force"]).is_err());
        assert!(Cli::try_parse_from(["stepwise", "config", "--init", "--force"]).is_ok());
    }

    #[test]
    fn global_config_flag() {
        let cli = Cli::try_parse_from(["stepwise", "chat", "--config", "/tmp/s.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/s.toml")));
    }
}
