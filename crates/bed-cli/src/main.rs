//! bed - run statements through best-efforts delivery and inspect the
//! transaction log.

mod commands;
mod output;

use anyhow::Result;
use bed_config_and_utils::{init_logging, parse_level, Paths};
use bed_database::ParameterValue;
use clap::{Parser, Subcommand};
use commands::{Environment, ExecArgs};
use std::path::PathBuf;
use tracing::debug;

/// Best-efforts delivery for statements of sharded transactions.
#[derive(Parser)]
#[command(name = "bed")]
#[command(about = "Run statements with write-ahead logging and bounded retry, and inspect pending entries")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (text or json)
    #[arg(short, long, default_value = "text", global = true)]
    format: output::OutputFormat,

    /// Log level (trace, debug, info, warn, error); defaults to the configured level
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Base directory for config, logs and the transaction log (default ~/.bed)
    #[arg(long, env = "BED_HOME", global = true)]
    base_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Log, execute and confirm a statement, retrying it on failure
    Exec {
        /// Target data source name
        #[arg(short, long)]
        data_source: String,
        /// Statement with positional `?` placeholders
        #[arg(short, long)]
        sql: String,
        /// Bind value, repeatable: null, int:<n>, real:<x>, text:<s>, or inferred
        #[arg(short, long = "param", value_parser = commands::parse_param)]
        params: Vec<ParameterValue>,
        /// Event id (generated if omitted)
        #[arg(long)]
        id: Option<String>,
        /// Transaction id (generated if omitted)
        #[arg(long)]
        transaction_id: Option<String>,
    },

    /// List entries awaiting confirmed delivery, oldest first
    Pending {
        /// Maximum entries to list
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Show one pending entry
    Show {
        /// Event id
        id: String,
    },

    /// Print the effective configuration
    Config,
}

fn run(cli: Cli) -> Result<()> {
    let paths = match cli.base_dir {
        Some(dir) => Paths::with_base_dir(dir),
        None => Paths::new()?,
    };
    paths.ensure_dirs()?;
    let env = Environment::load(paths)?;

    let level = cli.log_level.as_deref().unwrap_or(&env.config.log_level);
    let level = parse_level(level).to_string().to_lowercase();
    init_logging("bed-cli", &level, &env.paths, false);
    debug!(base_dir = %env.paths.base_dir().display(), "Configuration loaded");

    match cli.command {
        Commands::Exec {
            data_source,
            sql,
            params,
            id,
            transaction_id,
        } => commands::exec(
            &env,
            ExecArgs {
                data_source,
                sql,
                parameters: params,
                id,
                transaction_id,
            },
            &cli.format,
        ),
        Commands::Pending { limit } => commands::pending(&env, limit, &cli.format),
        Commands::Show { id } => commands::show(&env, &id, &cli.format),
        Commands::Config => commands::config_show(&env, &cli.format),
    }
}

fn main() {
    let cli = Cli::parse();
    let format = cli.format;

    if let Err(e) = run(cli) {
        output::print_error(&format!("{:#}", e), &format);
        std::process::exit(1);
    }
}
