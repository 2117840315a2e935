//! Tether CLI - probe the client's session plumbing from a terminal.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tether_config_and_utils::{init_logging, Config, Paths};

/// Tether command-line interface.
#[derive(Parser)]
#[command(name = "tether")]
#[command(about = "Inspect Tether configuration and render-time sessions")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error). Defaults to the configured level.
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Base directory for config and logs. Defaults to ~/.tether
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a session the way a render pass does and print the snapshot
    Prefetch {
        /// Forwarded identity-provider cookies, e.g. "better-auth.session_token=..."
        #[arg(long, env = "TETHER_CREDENTIAL_HEADER", default_value = "")]
        credential_header: String,
    },
    /// Bind a paginated query as a render pass would and print its initial state
    Query {
        /// Query reference, e.g. "tasks:list"
        name: String,
        /// Query arguments as a JSON object. Omit to skip the query
        #[arg(long)]
        args: Option<String>,
        /// Page size. Defaults to the configured initial_num_items
        #[arg(long, allow_negative_numbers = true)]
        num_items: Option<i64>,
    },
    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let paths = match cli.base_dir {
        Some(base) => Paths::with_base_dir(base),
        None => Paths::new()?,
    };
    let config = Config::load(&paths)?;

    init_logging(&paths, cli.log_level.as_deref().unwrap_or(&config.log_level))?;

    match cli.command {
        Commands::Prefetch { credential_header } => {
            commands::prefetch(&config, &credential_header).await?;
        }
        Commands::Query {
            name,
            args,
            num_items,
        } => {
            commands::query(&config, &name, args.as_deref(), num_items)?;
        }
        Commands::Config => {
            commands::show_config(&config)?;
        }
    }

    Ok(())
}
