//! factorlab CLI binary.
//!
//! Provides command-line access to factor listing and single- and
//! multi-factor backtests over a CSV panel.

mod cmd;
mod config;
mod data;

use anyhow::Result;
use clap::{Parser, Subcommand};
use cmd::{OutputFormat, list_factors, run_backtest, run_multi};
use config::RunOptions;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "factorlab")]
#[command(about = "Factor evaluation for equity backtests", long_about = None)]
#[command(version)]
struct Cli {
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available factor definitions
    Factors {
        /// Filter by category (technical, fundamental, custom)
        #[arg(short = 'C', long)]
        category: Option<String>,

        /// Show descriptions and expressions
        #[arg(short, long)]
        verbose: bool,
    },

    /// Backtest a single factor column
    Backtest {
        /// CSV panel with date, symbol, close and factor columns
        input: PathBuf,

        /// Factor column to test
        #[arg(short, long)]
        factor: String,

        /// Restrict to these symbols
        #[arg(short, long, value_delimiter = ',')]
        symbols: Vec<String>,

        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD)
        #[arg(long)]
        end: Option<String>,

        #[command(flatten)]
        options: RunOptions,
    },

    /// Backtest several factor columns and their composite
    Multi {
        /// CSV panel with date, symbol, close and factor columns
        input: PathBuf,

        /// Factor columns to combine
        #[arg(short, long, value_delimiter = ',', required = true)]
        factors: Vec<String>,

        /// Explicit weights as name=value
        #[arg(short, long, value_delimiter = ',', conflicts_with = "optimize")]
        weights: Vec<String>,

        /// Derive weights (ic, sharpe, mean_variance)
        #[arg(short, long)]
        optimize: Option<String>,

        /// Restrict to these symbols
        #[arg(short, long, value_delimiter = ',')]
        symbols: Vec<String>,

        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD)
        #[arg(long)]
        end: Option<String>,

        #[command(flatten)]
        options: RunOptions,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Factors { category, verbose } => {
            list_factors(category.as_deref(), verbose, cli.format)?;
        }
        Commands::Backtest {
            input,
            factor,
            symbols,
            start,
            end,
            options,
        } => {
            run_backtest(
                &input,
                &factor,
                &symbols,
                start.as_deref(),
                end.as_deref(),
                &options,
                cli.format,
            )?;
        }
        Commands::Multi {
            input,
            factors,
            weights,
            optimize,
            symbols,
            start,
            end,
            options,
        } => {
            run_multi(
                &input,
                &factors,
                &weights,
                optimize.as_deref(),
                &symbols,
                start.as_deref(),
                end.as_deref(),
                &options,
                cli.format,
            )?;
        }
    }

    Ok(())
}
