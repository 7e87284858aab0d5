use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One inventory record. Names are stored lowercase and looked up by name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub name: String,
    pub quantity: u32,
    /// Selling price (SP) per unit
    pub price: f64,
    /// Cost price (CP) per unit
    pub cost_price: f64,
    /// Expiry date in DD-MM-YYYY, when tracked
    pub expiry_date: Option<String>,
    /// End-of-day instant derived from `expiry_date`
    pub expiry_at: Option<DateTime<Utc>>,
}

/// Partial update for an existing item. `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct ItemUpdate {
    pub price: Option<f64>,
    pub cost_price: Option<f64>,
    pub quantity: Option<u32>,
    pub expiry_date: Option<String>,
}

impl ItemUpdate {
    pub fn is_empty(&self) -> bool {
        self.price.is_none()
            && self.cost_price.is_none()
            && self.quantity.is_none()
            && self.expiry_date.is_none()
    }
}

/// Outcome of a quantity removal.
#[derive(Debug, Clone)]
pub struct RemoveOutcome {
    pub success: bool,
    pub message: String,
    /// Whether the item reached zero and its record was deleted.
    pub fully_deleted: bool,
}

/// A sale logged implicitly when stock leaves through the voice assistant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleRecord {
    pub item_name: String,
    pub quantity: u32,
    pub selling_price: f64,
    pub cost_price: f64,
    pub revenue: f64,
    pub profit: f64,
    pub timestamp: DateTime<Utc>,
}

/// The persistent inventory store.
///
/// Merge-by-name semantics: `upsert` increments the stored quantity on a
/// repeat add and refreshes prices. Names are normalized to lowercase on the
/// way in, so callers may pass any casing.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    async fn find_by_name(&self, name: &str) -> Result<Option<Item>>;

    /// Create an item, or merge into an existing one of the same name.
    async fn upsert(
        &self,
        name: &str,
        quantity: u32,
        price: f64,
        expiry_date: Option<&str>,
        cost_price: Option<f64>,
    ) -> Result<()>;

    /// Remove up to `quantity` units. Never drives the quantity negative;
    /// deletes the record when it reaches zero.
    async fn remove(&self, name: &str, quantity: u32) -> Result<RemoveOutcome>;

    /// Apply a partial field update to an existing item.
    async fn update_fields(&self, name: &str, updates: ItemUpdate) -> Result<()>;

    async fn list_all(&self) -> Result<Vec<Item>>;

    /// Delete a batch of items by id.
    async fn delete_batch(&self, ids: &[String]) -> Result<()>;
}
