//! Roster CLI - reviewer assignment for pull requests
//!
//! Manages teams and pull requests in a local SQLite database and keeps
//! reviewer assignments valid as people come and go.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use roster_core::Config;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::{Context, PrArgs, StatsArgs, TeamArgs, UserArgs};

/// Roster: reviewer assignment for pull requests
#[derive(Parser, Debug)]
#[command(name = "roster")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Database file (overrides config and env)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Reviewer cap per pull request (overrides config and env)
    #[arg(long, global = true)]
    max_reviewers: Option<usize>,

    /// Seed for reviewer selection (overrides config and env)
    #[arg(long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show version information
    Version,

    /// Manage teams and their members
    #[command(visible_alias = "t")]
    Team(TeamArgs),

    /// Manage user activity and list reviews
    #[command(visible_alias = "u")]
    User(UserArgs),

    /// Create, merge and reassign pull requests
    Pr(PrArgs),

    /// Show review assignment counts
    Stats(StatsArgs),

    /// Show current configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing; RUST_LOG wins over --verbose
    let default_filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    if cli.verbose {
        tracing::info!("Verbose mode enabled");
    }

    // Load configuration with overrides
    let config = Config::load_with_overrides(cli.max_reviewers, cli.seed, cli.db.clone())?;

    if cli.verbose {
        tracing::info!(
            max_reviewers = config.assignment.max_reviewers,
            seed = ?config.assignment.seed,
            db = ?config.database.path,
            "Configuration loaded"
        );
    }

    let result = match cli.command {
        Some(Commands::Version) => {
            println!("roster {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Some(Commands::Config) => {
            print_config(&config);
            Ok(())
        }
        Some(command) => run(command, &config, cli.json).await,
        None => {
            println!("Roster - reviewer assignment for pull requests");
            println!();
            println!("Use --help for usage information");
            Ok(())
        }
    };

    if let Err(err) = result {
        match err.downcast_ref::<roster_core::Error>() {
            Some(e) => eprintln!("error [{}]: {}", e.code(), e),
            None => eprintln!("error: {:#}", err),
        }
        std::process::exit(1);
    }

    Ok(())
}

/// Run a command that needs the database
async fn run(command: Commands, config: &Config, json: bool) -> anyhow::Result<()> {
    let ctx = Context::open(config, json).await?;
    match command {
        Commands::Team(args) => args.execute(&ctx).await,
        Commands::User(args) => args.execute(&ctx).await,
        Commands::Pr(args) => args.execute(&ctx).await,
        Commands::Stats(args) => args.execute(&ctx).await,
        Commands::Version | Commands::Config => Ok(()),
    }
}

fn print_config(config: &Config) {
    println!("Roster Configuration");
    println!("====================");
    println!();
    println!("Assignment Settings:");
    println!("  max_reviewers: {}", config.assignment.max_reviewers);
    match config.assignment.seed {
        Some(seed) => println!("  seed: {}", seed),
        None => println!("  seed: (random)"),
    }
    println!();
    println!("Database Settings:");
    match config.database.resolved_path() {
        Ok(path) => println!("  path: {}", path.display()),
        Err(e) => println!("  path: ({})", e),
    }
    println!("  max_connections: {}", config.database.max_connections);
    println!();
    if let Some(path) = Config::default_config_path() {
        println!("Config file: {}", path.display());
        if path.exists() {
            println!("  (exists)");
        } else {
            println!("  (not found - using defaults)");
        }
    }
}
