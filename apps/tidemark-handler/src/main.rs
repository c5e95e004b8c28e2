//! tidemark - catalog reconciliation handler
//!
//! - Serve the webhook receiver
//! - Replay a stored delivery
//! - Provision branded custom metadata
//! - Annotate assets with quality results
//! - Star glossary terms for a group
//! - Report verified upstream sources

use clap::{Parser, Subcommand};

use tidemark_handler::commands;
use tidemark_handler::config::HandlerConfig;
use tidemark_handler::error::HandlerResult;
use tidemark_handler::logging::{init_logging, DEFAULT_FILTER};

/// tidemark - keep catalog metadata in line with business rules
#[derive(Parser)]
#[command(name = "tidemark")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the webhook receiver
    Serve(commands::serve::ServeArgs),

    /// Reconcile one stored delivery and print the outcome
    Replay(commands::replay::ReplayArgs),

    /// Deploy the branded custom metadata definitions
    Provision(commands::provision::ProvisionArgs),

    /// Record quality results on an asset
    Annotate(commands::annotate::AnnotateArgs),

    /// Star a glossary's terms for every member of a group
    Star(commands::star::StarArgs),

    /// List verified upstream sources of every asset of a type
    VerifiedSources(commands::sources::SourcesArgs),
}

#[tokio::main]
async fn main() {
    // Load .env if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let config = HandlerConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Configuration error: {e}");
        std::process::exit(2);
    });
    init_logging(DEFAULT_FILTER, config.log_format);

    match run(cli, config).await {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            e.print();
            std::process::exit(e.exit_code());
        }
    }
}

async fn run(cli: Cli, config: HandlerConfig) -> HandlerResult<()> {
    match cli.command {
        Commands::Serve(args) => commands::serve::execute(args, config).await,
        Commands::Replay(args) => commands::replay::execute(args, config).await,
        Commands::Provision(args) => commands::provision::execute(args).await,
        Commands::Annotate(args) => commands::annotate::execute(args).await,
        Commands::Star(args) => commands::star::execute(args).await,
        Commands::VerifiedSources(args) => commands::sources::execute(args).await,
    }
}
