use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use footfall::config::Config;
use footfall::ledger;

#[derive(Parser)]
#[command(name = "footfall-admin")]
#[command(about = "Footfall ledger management CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the ledger tables if they do not exist
    Init,
    /// Print the current totals
    Stats,
    /// Show when a visitor was first seen
    Visitor {
        /// Visitor ID (value of the `vid` cookie)
        visitor_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    if config.database.is_none() {
        println!("⚠ DATABASE_URL is not set; the in-memory ledger of a running server is not reachable from here");
    }

    let ledger = ledger::connect(config.database.as_ref())?;

    match cli.command {
        Commands::Init => {
            ledger
                .init()
                .await
                .context("failed to initialize ledger schema")?;
            println!("✓ Initialized {} ledger", ledger.backend());
        }
        Commands::Stats => {
            let stats = ledger.read_stats().await?;
            println!("{:<20} {}", "Total visits", stats.total_visits);
            println!("{:<20} {}", "Unique visitors", stats.unique_visitors);
        }
        Commands::Visitor { visitor_id } => match ledger.find_visitor(&visitor_id).await? {
            Some(record) => {
                println!(
                    "✓ Visitor '{}' first seen at {} (unix seconds)",
                    record.id, record.first_seen
                );
            }
            None => {
                println!("⚠ Visitor '{}' is not in the ledger", visitor_id);
            }
        },
    }

    Ok(())
}
