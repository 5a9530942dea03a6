//! Commands that only touch the local database: pantry stock, the restock
//! queue, brand and price preferences, and pinned product mappings.

use anyhow::{bail, Result};
use clap::{Args, Subcommand, ValueEnum};
use larder_shared::{
    BrandMatchType, BrandPreference, BrandPreferenceType, IngredientCategory, InventoryItem,
    InventoryStatus, PriceSensitivity, Product,
};
use larder_store::{DbClient, SqliteMappingCache, SqlitePantryRepository, SqlitePreferenceStore};

pub enum Chore {
    Stock(Option<StockAction>),
    Restock(Option<RestockAction>),
    Prefs(PrefsAction),
    Mapping(MappingAction),
}

#[derive(Subcommand)]
pub enum StockAction {
    /// Start tracking a staple (on hand)
    Add(AddStaple),
    /// Mark a staple as running low
    Low { item: String },
    /// Mark a staple as used up
    Out { item: String },
    /// Mark a staple as back on hand
    Good { item: String },
    /// Stop tracking a staple
    Remove { item: String },
}

#[derive(Args)]
pub struct AddStaple {
    pub item: String,

    /// Aisle category, e.g. dairy or pantry_dry
    #[arg(long, default_value = "other")]
    pub category: String,

    /// Usual amount to reorder
    #[arg(long)]
    pub quantity: Option<f64>,

    #[arg(long)]
    pub unit: Option<String>,

    /// Catalog query to use instead of the display name
    #[arg(long)]
    pub search_term: Option<String>,
}

#[derive(Subcommand)]
pub enum RestockAction {
    /// Mark everything in the queue as back on hand
    Clear,
}

#[derive(Subcommand)]
pub enum PrefsAction {
    /// Prefer or avoid a brand for an ingredient or a whole category
    Brand(BrandRule),
    /// How much weight price carries when choosing products
    Price {
        #[arg(value_enum)]
        level: PriceLevel,
    },
}

#[derive(Args)]
pub struct BrandRule {
    pub brand: String,

    /// Avoid the brand instead of preferring it
    #[arg(long)]
    pub avoid: bool,

    #[arg(long, conflicts_with = "category", required_unless_present = "category")]
    pub ingredient: Option<String>,

    #[arg(long)]
    pub category: Option<String>,

    #[arg(long, default_value = "")]
    pub notes: String,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum PriceLevel {
    Budget,
    Moderate,
    Premium,
}

impl From<PriceLevel> for PriceSensitivity {
    fn from(level: PriceLevel) -> Self {
        match level {
            PriceLevel::Budget => PriceSensitivity::Budget,
            PriceLevel::Moderate => PriceSensitivity::Moderate,
            PriceLevel::Premium => PriceSensitivity::Premium,
        }
    }
}

#[derive(Subcommand)]
pub enum MappingAction {
    /// Always use this product for a search term
    Pin(PinProduct),
    /// Let the search term resolve normally again
    Unpin { term: String },
    /// Forget every cached product for a search term
    Delete { term: String },
}

#[derive(Args)]
pub struct PinProduct {
    pub term: String,

    #[arg(long)]
    pub product_id: String,

    #[arg(long)]
    pub name: String,

    #[arg(long)]
    pub price: f64,

    #[arg(long, default_value = "")]
    pub size: String,
}

pub async fn execute(db: &DbClient, chore: Chore) -> Result<String> {
    match chore {
        Chore::Stock(action) => stock(&SqlitePantryRepository::new(db.pool.clone()), action).await,
        Chore::Restock(action) => {
            restock(&SqlitePantryRepository::new(db.pool.clone()), action).await
        }
        Chore::Prefs(action) => prefs(&SqlitePreferenceStore::new(db.pool.clone()), action).await,
        Chore::Mapping(action) => mapping(&SqliteMappingCache::new(db.pool.clone()), action).await,
    }
}

async fn stock(pantry: &SqlitePantryRepository, action: Option<StockAction>) -> Result<String> {
    let (item, status) = match action {
        None => return Ok(format_inventory(&pantry.inventory().await?)),
        Some(StockAction::Add(staple)) => {
            let category = parse_category(&staple.category)?;
            let mut entry = InventoryItem::new(staple.item.trim().to_lowercase(), title_case(&staple.item));
            entry.category = Some(category);
            entry.default_quantity = staple.quantity;
            entry.default_unit = staple.unit;
            entry.default_search_term = staple.search_term;
            pantry.add_item(&entry).await?;
            return Ok(format!("Added '{}' to inventory.", entry.display_name));
        }
        Some(StockAction::Remove { item }) => {
            if !pantry.remove_item(&item).await? {
                bail!("'{}' not found in inventory", item);
            }
            return Ok(format!("Removed '{}' from inventory.", item));
        }
        Some(StockAction::Low { item }) => (item, InventoryStatus::Low),
        Some(StockAction::Out { item }) => (item, InventoryStatus::Out),
        Some(StockAction::Good { item }) => (item, InventoryStatus::OnHand),
    };

    if !pantry.set_status(&item, status).await? {
        bail!("'{}' not found in inventory", item);
    }
    Ok(format!("Updated '{}' to {}.", item, status.as_str()))
}

async fn restock(pantry: &SqlitePantryRepository, action: Option<RestockAction>) -> Result<String> {
    if let Some(RestockAction::Clear) = action {
        let cleared = pantry.clear_restock_queue().await?;
        return Ok(format!("Cleared {} item(s) from restock queue.", cleared));
    }

    let queue = pantry.restock_queue().await?;
    if queue.is_empty() {
        return Ok("Restock queue is empty.".to_string());
    }
    let lines: Vec<String> = queue
        .iter()
        .map(|item| format!("  {} ({} {})", item.search_term, item.quantity, item.unit))
        .collect();
    Ok(format!("Restock Queue:\n{}", lines.join("\n")))
}

async fn prefs(store: &SqlitePreferenceStore, action: PrefsAction) -> Result<String> {
    match action {
        PrefsAction::Price { level } => {
            let level = PriceSensitivity::from(level);
            store.set_price_sensitivity(level).await?;
            Ok(format!("Price sensitivity set to {}.", level.as_str()))
        }
        PrefsAction::Brand(rule) => {
            let (match_type, match_target) = match (rule.ingredient, rule.category) {
                (Some(ingredient), _) => (BrandMatchType::Ingredient, ingredient),
                (None, Some(category)) => {
                    (BrandMatchType::Category, parse_category(&category)?.as_str().to_string())
                }
                (None, None) => bail!("either --ingredient or --category is required"),
            };
            let preference_type = if rule.avoid {
                BrandPreferenceType::Avoid
            } else {
                BrandPreferenceType::Preferred
            };
            let pref = BrandPreference {
                match_target,
                match_type,
                brand: rule.brand,
                preference_type,
                notes: rule.notes,
            };
            store.add_brand_preference(&pref).await?;

            let verb = if rule.avoid { "Avoiding" } else { "Preferring" };
            Ok(format!("{} {} for {}.", verb, pref.brand, pref.match_target))
        }
    }
}

async fn mapping(cache: &SqliteMappingCache, action: MappingAction) -> Result<String> {
    match action {
        MappingAction::Pin(pin) => {
            let product = Product::new(pin.product_id, pin.name, pin.price, pin.size);
            cache.pin(&pin.term, &product).await?;
            Ok(format!("Pinned '{}' to {}.", pin.term, product.product_id))
        }
        MappingAction::Unpin { term } => {
            if !cache.unpin(&term).await? {
                bail!("no pinned product for '{}'", term);
            }
            Ok(format!("Unpinned '{}'.", term))
        }
        MappingAction::Delete { term } => {
            let removed = cache.delete(&term).await?;
            Ok(format!("Removed {} mapping(s) for '{}'.", removed, term))
        }
    }
}

fn parse_category(raw: &str) -> Result<IngredientCategory> {
    match IngredientCategory::parse(raw) {
        Some(category) => Ok(category),
        None => bail!(
            "invalid category '{}'; valid: produce, meat, dairy, bakery, pantry_dry, frozen, beverages, deli, other",
            raw
        ),
    }
}

fn format_inventory(items: &[InventoryItem]) -> String {
    if items.is_empty() {
        return "No items in inventory.".to_string();
    }
    items
        .iter()
        .map(|item| {
            let category = item.category.map(|c| c.as_str()).unwrap_or("other");
            format!("  {:<24} {:<8} ({})", item.display_name, item.status.as_str(), category)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn title_case(raw: &str) -> String {
    raw.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
