mod ledger;
mod scrape;
mod verify_images;

use std::path::PathBuf;

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use vinedb_core::EntityKind;

use crate::ledger::LedgerCommands;
use crate::scrape::ScrapeArgs;

#[derive(Debug, Parser)]
#[command(name = "vinedb")]
#[command(about = "Wine catalog scraper and enrichment pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Resolve source records against the external site and upsert matches
    Scrape(ScrapeArgs),
    /// Inspect or reset the scrape progress ledger
    Ledger {
        /// Progress ledger file
        #[arg(
            long = "ledger",
            global = true,
            env = "VINEDB_LEDGER_PATH",
            default_value = "./data/scrape-progress.json"
        )]
        ledger_path: PathBuf,

        #[command(subcommand)]
        command: LedgerCommands,
    },
    /// HEAD-check stored image URLs and report the broken ones
    VerifyImages {
        /// Restrict to one entity kind (`wine` or `winery`)
        #[arg(long)]
        kind: Option<EntityKind>,

        /// Number of concurrent checks
        #[arg(long, default_value_t = 8)]
        concurrency: usize,
    },
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Apply pending migrations
    Migrate,
    /// Check database connectivity
    Ping,
}

fn load_config() -> anyhow::Result<vinedb_core::AppConfig> {
    vinedb_core::load_app_config_from_env().context("loading configuration")
}

async fn connect(config: &vinedb_core::AppConfig) -> anyhow::Result<sqlx::PgPool> {
    let pool_config = vinedb_db::PoolConfig::from_app_config(config);
    vinedb_db::connect_pool(&config.database_url, pool_config)
        .await
        .context("connecting to database")
}

async fn run_db(command: &DbCommands) -> anyhow::Result<()> {
    let config = load_config()?;
    let pool = connect(&config).await?;
    match command {
        DbCommands::Migrate => {
            let applied = vinedb_db::run_migrations(&pool).await?;
            println!("migrations applied: {applied}");
        }
        DbCommands::Ping => {
            vinedb_db::ping(&pool).await?;
            println!("database reachable");
        }
    }
    pool.close().await;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let level = std::env::var("VINEDB_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Scrape(args)) => {
            let config = load_config()?;
            scrape::run_scrape(&config, &args).await?;
        }
        Some(Commands::Ledger {
            ledger_path,
            command,
        }) => ledger::run_ledger(&ledger_path, &command)?,
        Some(Commands::VerifyImages { kind, concurrency }) => {
            let config = load_config()?;
            let pool = connect(&config).await?;
            let store = vinedb_db::PgCatalogStore::new(pool.clone());
            verify_images::run_verify_images(&store, kind, concurrency).await?;
            pool.close().await;
        }
        Some(Commands::Db { command }) => run_db(&command).await?,
        None => Cli::command().print_help()?,
    }

    Ok(())
}

#[cfg(test)]
mod tests;
