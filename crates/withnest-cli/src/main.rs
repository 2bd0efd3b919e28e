use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use withnest_core::Config;
use withnest_sql::{nested_output_path, NestedQueryRewriter};

/// Default config file looked up in the working directory
const DEFAULT_CONFIG_FILE: &str = "withnest.toml";

/// withnest - Rewrite WITH-clause queries as nested subqueries
#[derive(Parser)]
#[command(name = "withnest")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Query file to rewrite
    #[arg(short, long)]
    filename: PathBuf,

    /// Path to config file (default: withnest.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Do not print the nested query
    #[arg(short, long)]
    quiet: bool,

    /// Print the discovered components, dependencies and aliases as JSON
    #[arg(long)]
    explain: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(cli.config.as_deref(), cli.verbose)?;
    nest_command(&config, &cli)
}

/// Log to stderr; RUST_LOG wins over the verbosity flag
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn load_config(path: Option<&Path>, verbose: bool) -> Result<Config> {
    let default_path = Path::new(DEFAULT_CONFIG_FILE);

    let config = match path {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None if default_path.exists() => Config::from_file(default_path)
            .with_context(|| format!("Failed to load config from {}", default_path.display()))?,
        None => {
            if verbose {
                eprintln!("{}", "No config file found, using defaults".yellow());
            }
            Config::default()
        }
    };

    Ok(config)
}

/// Rewrite the input file and write the nested query next to it
fn nest_command(config: &Config, cli: &Cli) -> Result<()> {
    if cli.verbose {
        eprintln!("{} {}", "Rewriting".cyan(), cli.filename.display());
    }

    let nested = NestedQueryRewriter::from_config(config)
        .rewrite_file(&cli.filename)
        .with_context(|| format!("Failed to rewrite {}", cli.filename.display()))?;

    let output = nested_output_path(&cli.filename, &config.output_suffix);
    nested
        .save_to_file(&output)
        .with_context(|| format!("Failed to write nested query to {}", output.display()))?;

    if cli.verbose {
        eprintln!(
            "{} {} component(s) into {}",
            "✓ Nested".green(),
            nested.summary.build_order.len().saturating_sub(1),
            output.display()
        );
    }

    if cli.explain {
        let summary = serde_json::to_string_pretty(&nested.summary)
            .context("Failed to serialize query summary")?;
        println!("{}", summary);
    }

    if config.print_query && !cli.quiet {
        println!("{}", nested.sql);
    }

    Ok(())
}
