//! ctq: Conformance Test Query - resolve, list and run conformance test cases.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::Level;

mod commands;
mod suites;

#[derive(Parser)]
#[command(name = "ctq")]
#[command(about = "Conformance Test Query - resolve, list and run conformance test cases")]
#[command(version)]
struct Cli {
    /// Log library events at debug level on stderr
    #[arg(long, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every case a query selects
    #[command(visible_alias = "r")]
    Run {
        /// Query (e.g. demo:*, demo:a,*, unittests:query:*)
        query: String,

        /// Print each case result as it finishes
        #[arg(short = 'v', long)]
        verbose: bool,

        /// Keep debug-level case logs
        #[arg(short = 'd', long)]
        debug: bool,

        /// Print all results as JSON
        #[arg(long = "print-json")]
        print_json: bool,

        /// JSON file of expected failures and skips
        #[arg(short = 'e', long, value_name = "FILE")]
        expectations: Option<PathBuf>,

        /// Config file (default: $CTQ_CONFIG, ./ctq.toml, then the user config dir)
        #[arg(short = 'c', long, value_name = "FILE")]
        config: Option<PathBuf>,
    },

    /// Print the case queries a query selects, one per line
    #[command(visible_alias = "ls")]
    List {
        /// Query (e.g. demo:a,*)
        query: String,
    },

    /// Print the result tree of a query
    Tree {
        /// Query (e.g. demo:*)
        query: String,
    },

    /// List the built-in suites
    Suites,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let debug_run = matches!(cli.command, Commands::Run { debug: true, .. });
    let level = if cli.trace || debug_run { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    let loader = suites::builtin_loader();

    let result = match cli.command {
        Commands::Run { query, verbose, debug, print_json, expectations, config } => {
            let opts = commands::RunOptions {
                verbose,
                debug,
                print_json,
                expectations,
                config,
            };
            commands::run(&loader, &query, opts).await
        }
        Commands::List { query } => commands::list(&loader, &query).await,
        Commands::Tree { query } => commands::tree(&loader, &query).await,
        Commands::Suites => commands::suites(&loader),
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
