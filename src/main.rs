use clap::{Parser, Subcommand};
use jacketforge::config::Config;
use jacketforge::deck::workspace::Workspace;
use jacketforge::population::generate_initial_population;
use std::fs;
use std::process;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON config file; CLI flags are ignored when this is set.
    #[arg(global = true, long)]
    config_file: Option<String>,

    #[command(flatten)]
    config: Config,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a deduplicated initial population and write it as JSON.
    Seed {
        /// Output file; stdout when omitted.
        #[arg(long)]
        out: Option<String>,
    },
    /// Open the workspace, verify the baseline snapshot round-trips, and
    /// report which declared records resolve in the deck.
    Check,
}

fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = match &cli.config_file {
        Some(path) => Config::load_from_file(path),
        None => cli.config,
    };

    let workspace = Workspace::open(&config.problem.project_path).unwrap_or_else(|e| {
        error!("{}", e);
        process::exit(1);
    });
    info!("Workspace deck: {}", workspace.deck_path().display());

    match cli.command {
        Commands::Seed { out } => {
            let population =
                generate_initial_population(&config, &workspace, config.problem.seed)
                    .unwrap_or_else(|e| {
                        error!("{}", e);
                        process::exit(1);
                    });
            info!("Generated {} candidate payload(s)", population.len());

            let body = serde_json::to_string_pretty(&population).unwrap_or_else(|e| {
                error!("Failed to serialize population: {}", e);
                process::exit(1);
            });
            match out {
                Some(path) => {
                    if let Err(e) = fs::write(&path, body) {
                        error!("Failed to write {}: {}", path, e);
                        process::exit(1);
                    }
                    info!("Wrote population to {}", path);
                }
                None => println!("{}", body),
            }
        }
        Commands::Check => {
            if let Err(e) = workspace.restore_baseline().and_then(|_| workspace.restore_baseline()) {
                error!("Baseline restore failed: {}", e);
                process::exit(1);
            }
            info!("Baseline restore: OK (idempotent)");

            let prefixes = config.problem.get_optimizable();
            match workspace.extract_records(&prefixes) {
                Ok(found) => info!(
                    "Resolved {}/{} declared optimizable record(s)",
                    found.len(),
                    prefixes.len()
                ),
                Err(e) => {
                    error!("Record extraction failed: {}", e);
                    process::exit(1);
                }
            }
        }
    }
}
