mod household;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use household::{Chore, MappingAction, PrefsAction, RestockAction, StockAction};
use larder_order::Pipeline;
use larder_shared::{CartSummary, OrderResult, ShoppingListItem};
use larder_store::app_config::Config;
use larder_store::DbClient;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Build grocery carts from a shopping list and submit them to the retailer
#[derive(Parser)]
#[command(name = "larder")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a cart for review and print it as JSON
    Build(ListArgs),

    /// Build a cart and submit it as an order
    Order(ListArgs),

    /// Submit a previously built cart
    Submit {
        /// Cart JSON written by `larder build`
        #[arg(long)]
        cart: PathBuf,
    },

    /// List pantry staples or change their status
    Stock {
        #[command(subcommand)]
        action: Option<StockAction>,
    },

    /// Show the restock queue, or clear it
    Restock {
        #[command(subcommand)]
        action: Option<RestockAction>,
    },

    /// Brand and price preferences
    Prefs {
        #[command(subcommand)]
        action: PrefsAction,
    },

    /// Pinned and cached products per search term
    Mapping {
        #[command(subcommand)]
        action: MappingAction,
    },
}

/// Work that needs the retailer
enum Job {
    Build(ListArgs),
    Order(ListArgs),
    Submit(PathBuf),
}

enum Work {
    Retailer(Job),
    Household(Chore),
}

#[derive(Args)]
struct ListArgs {
    /// Shopping list as a JSON array of items
    #[arg(long)]
    list: PathBuf,

    /// Also order pantry items that are running low
    #[arg(long)]
    with_restock: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "larder=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::load().context("failed to load configuration")?;

    let output = match route(cli.command) {
        Work::Retailer(job) => {
            let pipeline = Pipeline::bootstrap(&config).await?;
            let result = execute(&pipeline, job).await;
            pipeline.close().await;
            result?
        }
        Work::Household(chore) => {
            // Household commands never need retailer credentials
            let db = DbClient::connect(&config.database.path).await?;
            db.migrate().await?;
            let result = household::execute(&db, chore).await;
            db.close().await;
            result?
        }
    };

    println!("{}", output);
    Ok(())
}

fn route(command: Commands) -> Work {
    match command {
        Commands::Build(args) => Work::Retailer(Job::Build(args)),
        Commands::Order(args) => Work::Retailer(Job::Order(args)),
        Commands::Submit { cart } => Work::Retailer(Job::Submit(cart)),
        Commands::Stock { action } => Work::Household(Chore::Stock(action)),
        Commands::Restock { action } => Work::Household(Chore::Restock(action)),
        Commands::Prefs { action } => Work::Household(Chore::Prefs(action)),
        Commands::Mapping { action } => Work::Household(Chore::Mapping(action)),
    }
}

async fn execute(pipeline: &Pipeline, job: Job) -> Result<String> {
    match job {
        Job::Build(args) => {
            let items: Vec<ShoppingListItem> = read_json(&args.list)?;
            let restock = restock_items(pipeline, args.with_restock).await?;
            let cart = pipeline.build_cart_only(&items, restock.as_deref()).await?;
            Ok(serde_json::to_string_pretty(&cart)?)
        }
        Job::Order(args) => {
            let items: Vec<ShoppingListItem> = read_json(&args.list)?;
            let restock = restock_items(pipeline, args.with_restock).await?;
            let result = pipeline.run(&items, restock.as_deref()).await?;
            order_report(&result)
        }
        Job::Submit(cart) => {
            let cart: CartSummary = read_json(&cart)?;
            let result = pipeline.submit_cart(&cart).await;
            order_report(&result)
        }
    }
}

async fn restock_items(
    pipeline: &Pipeline,
    with_restock: bool,
) -> Result<Option<Vec<ShoppingListItem>>> {
    if !with_restock {
        return Ok(None);
    }
    let queue = pipeline.restock_queue().await?;
    tracing::info!(count = queue.len(), "restock items queued");
    Ok(Some(queue))
}

fn order_report(result: &OrderResult) -> Result<String> {
    if !result.success() {
        anyhow::bail!("order not placed: {}", result.error_message());
    }
    Ok(serde_json::to_string_pretty(result)?)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid JSON in {}", path.display()))
}
