//! Handshake CLI - query a social connection graph from the command line.
//!
//! Handshake answers reachability, shortest-chain, neighborhood and growth
//! questions over a graph held in SQLite or in a JSONL snapshot.

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

mod cli;

/// Handshake: bounded traversals over a social connection graph.
#[derive(Parser)]
#[command(name = "handshake")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file (defaults to ./handshake.yaml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Store override: `sqlite:<path>`, `snapshot:<path>` or `memory`
    #[arg(long, global = true)]
    store: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a JSONL snapshot into a SQLite database
    Import {
        /// Snapshot file to read
        snapshot: PathBuf,

        /// Database file to create or extend
        #[arg(long)]
        db: PathBuf,
    },

    /// List users reachable from a user, nearest first
    Reach {
        /// Starting user
        user: String,

        /// Deepest handshake level to report
        #[arg(short = 'd', long, default_value = "3")]
        max_depth: u32,

        /// Maximum number of users to report
        #[arg(short = 'n', long, default_value = "1000")]
        max_total: usize,

        /// Users to remove from the graph for this query (repeatable)
        #[arg(short = 'x', long = "exclude")]
        exclude: Vec<String>,
    },

    /// Show the shortest handshake chain between two users
    Path {
        /// Starting user
        from: String,

        /// Destination user
        to: String,

        /// Longest chain to look for
        #[arg(short = 'd', long, default_value = "6")]
        max_depth: u32,
    },

    /// Show a user's neighborhood with every connection inside it
    Slice {
        /// Center user
        user: String,

        /// Neighborhood radius (1-3)
        #[arg(short = 'd', long, default_value = "2")]
        depth: u32,
    },

    /// Count reachable users per handshake level
    Stats {
        /// Starting user
        user: String,
    },

    /// Show a user's cumulative connection count per day
    Growth {
        /// User to report on
        user: String,

        /// Number of days in the window
        #[arg(long, default_value = "30")]
        days: u32,

        /// Last day of the window, YYYY-MM-DD (defaults to today, UTC)
        #[arg(long)]
        until: Option<NaiveDate>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "handshake=info",
        1 => "handshake=debug",
        _ => "handshake=trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("{}: failed to start runtime: {e}", "error".red().bold());
            return ExitCode::FAILURE;
        }
    };

    let global = cli::GlobalOpts {
        config: cli.config,
        store: cli.store,
        json: cli.json,
    };

    let result = runtime.block_on(async {
        match cli.command {
            Commands::Import { snapshot, db } => cli::import::run(&global, &snapshot, &db).await,
            Commands::Reach {
                user,
                max_depth,
                max_total,
                exclude,
            } => cli::reach::run(&global, &user, max_depth, max_total, &exclude).await,
            Commands::Path {
                from,
                to,
                max_depth,
            } => cli::path::run(&global, &from, &to, max_depth).await,
            Commands::Slice { user, depth } => cli::slice::run(&global, &user, depth).await,
            Commands::Stats { user } => cli::stats::run(&global, &user).await,
            Commands::Growth { user, days, until } => {
                cli::growth::run(&global, &user, days, until).await
            }
        }
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {e}", "error".red().bold());
            for cause in e.chain().skip(1) {
                eprintln!("  {}: {cause}", "caused by".dimmed());
            }
            ExitCode::FAILURE
        }
    }
}
