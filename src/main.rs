use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use catalog_vector_sync::commands::{
    SyncArgs, drop_collection, list_collections, lookup, search, show_history, suggest,
    sync_tables,
};
use catalog_vector_sync::config::{Config, run_interactive_config, show_config};
use catalog_vector_sync::indexer::Driver;
use catalog_vector_sync::search::{
    DEFAULT_SEARCH_LIMIT, ProductSearch, ShopSearch, SuggestionQuery,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "catalog-sync")]
#[command(about = "Mirror catalog tables into a vector index and search them")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure the vector store connection and sync settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Sync tables into their collections
    Sync {
        /// Which table set to sync
        #[arg(long, default_value_t = Driver::Process)]
        driver: Driver,
        /// Upsert into existing collections instead of recreating them
        #[arg(long)]
        no_recreate: bool,
        /// Only sync these tables
        #[arg(long = "table", value_name = "NAME")]
        tables: Vec<String>,
        /// Write into an in-process index; the vector store is not touched
        #[arg(long)]
        dry_run: bool,
        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Similarity search in one collection
    Search {
        collection: String,
        query: String,
        #[arg(long, default_value_t = DEFAULT_SEARCH_LIMIT)]
        limit: usize,
        /// Print hits as JSON
        #[arg(long)]
        json: bool,
    },
    /// Product and shop suggestions for free-text terms
    Suggest {
        /// Product search terms
        #[arg(long = "products", value_name = "TERMS")]
        products: Vec<String>,
        /// Product categories
        #[arg(long = "category", value_name = "CATEGORY")]
        categories: Vec<String>,
        /// Shop search terms
        #[arg(long = "shops", value_name = "TERMS")]
        shops: Vec<String>,
    },
    /// Find a synced record by a payload field
    Lookup {
        collection: String,
        value: String,
        #[arg(long, default_value = "id")]
        field: String,
    },
    /// List collections in the vector store
    Collections,
    /// Delete a collection
    Drop {
        collection: String,
        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },
    /// Show recent sync runs
    History {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config()?;
            } else {
                run_interactive_config()?;
            }
        }
        Commands::Sync {
            driver,
            no_recreate,
            tables,
            dry_run,
            json,
        } => {
            let config = Config::load()?;
            let args = SyncArgs {
                driver,
                recreate: !no_recreate,
                tables,
                dry_run,
                json,
            };
            let report = sync_tables(&config, &args).await?;
            if !report.is_success() {
                bail!(
                    "{} of {} tables failed to sync",
                    report.failed_tables().len(),
                    report.tables.len()
                );
            }
        }
        Commands::Search {
            collection,
            query,
            limit,
            json,
        } => {
            search(&Config::load()?, &collection, &query, limit, json)?;
        }
        Commands::Suggest {
            products,
            categories,
            shops,
        } => {
            let query = SuggestionQuery {
                product_search: ProductSearch {
                    keywords: products,
                    categories,
                    features: Vec::new(),
                },
                shop_search: ShopSearch {
                    keywords: shops,
                    features: Vec::new(),
                },
            };
            suggest(&Config::load()?, &query)?;
        }
        Commands::Lookup {
            collection,
            value,
            field,
        } => {
            lookup(&Config::load()?, &collection, &field, &value)?;
        }
        Commands::Collections => {
            list_collections(&Config::load()?)?;
        }
        Commands::Drop { collection, yes } => {
            drop_collection(&Config::load()?, &collection, yes)?;
        }
        Commands::History { limit } => {
            show_history(&Config::load()?, limit).await?;
        }
    }

    Ok(())
}
