use super::store::{InventoryStore, Item, ItemUpdate, RemoveOutcome, SaleRecord};
use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

/// In-process inventory store backed by a map keyed on the lowercase name.
///
/// Carries the same merge-by-name and delete-at-zero semantics as the
/// production store, so the dispatcher and tests run against it unchanged.
pub struct MemoryStore {
    inner: Mutex<StoreState>,
}

#[derive(Default)]
struct StoreState {
    items: HashMap<String, Item>,
    sales: Vec<SaleRecord>,
}

/// End-of-day instant for a DD-MM-YYYY date string.
fn expiry_instant(date: &str) -> Option<DateTime<Utc>> {
    let parsed = NaiveDate::parse_from_str(date, "%d-%m-%Y").ok()?;
    let end_of_day = parsed.and_hms_opt(23, 59, 59)?;
    Some(Utc.from_utc_datetime(&end_of_day))
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(StoreState::default()),
        }
    }

    /// Sales logged so far, oldest first.
    pub async fn sales(&self) -> Vec<SaleRecord> {
        self.inner.lock().await.sales.clone()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InventoryStore for MemoryStore {
    async fn find_by_name(&self, name: &str) -> Result<Option<Item>> {
        let key = name.to_lowercase();
        Ok(self.inner.lock().await.items.get(&key).cloned())
    }

    async fn upsert(
        &self,
        name: &str,
        quantity: u32,
        price: f64,
        expiry_date: Option<&str>,
        cost_price: Option<f64>,
    ) -> Result<()> {
        let key = name.to_lowercase();
        let mut state = self.inner.lock().await;

        match state.items.get_mut(&key) {
            Some(existing) => {
                existing.quantity += quantity;
                existing.price = price;
                if let Some(cp) = cost_price {
                    existing.cost_price = cp;
                }
                if let Some(date) = expiry_date {
                    existing.expiry_at = expiry_instant(date);
                    existing.expiry_date = Some(date.to_string());
                }
            }
            None => {
                state.items.insert(
                    key.clone(),
                    Item {
                        id: Uuid::new_v4().to_string(),
                        name: key,
                        quantity,
                        price,
                        cost_price: cost_price.unwrap_or(0.0),
                        expiry_date: expiry_date.map(str::to_string),
                        expiry_at: expiry_date.and_then(expiry_instant),
                    },
                );
            }
        }

        Ok(())
    }

    async fn remove(&self, name: &str, quantity: u32) -> Result<RemoveOutcome> {
        let key = name.to_lowercase();
        let mut state = self.inner.lock().await;

        let Some(item) = state.items.get(&key).cloned() else {
            return Ok(RemoveOutcome {
                success: false,
                fully_deleted: false,
                message: format!("I couldn't find any {} in the inventory.", name),
            });
        };

        if item.quantity < quantity {
            return Ok(RemoveOutcome {
                success: false,
                fully_deleted: false,
                message: format!(
                    "You only have {} {}. I can't remove {}.",
                    item.quantity, name, quantity
                ),
            });
        }

        state.sales.push(SaleRecord {
            item_name: item.name.clone(),
            quantity,
            selling_price: item.price,
            cost_price: item.cost_price,
            revenue: quantity as f64 * item.price,
            profit: quantity as f64 * (item.price - item.cost_price),
            timestamp: Utc::now(),
        });

        let remaining = item.quantity - quantity;
        if remaining == 0 {
            state.items.remove(&key);
            Ok(RemoveOutcome {
                success: true,
                fully_deleted: true,
                message: format!("Removed all {}.", name),
            })
        } else {
            if let Some(stored) = state.items.get_mut(&key) {
                stored.quantity = remaining;
            }
            Ok(RemoveOutcome {
                success: true,
                fully_deleted: false,
                message: format!("Removed {} {}.", quantity, name),
            })
        }
    }

    async fn update_fields(&self, name: &str, updates: ItemUpdate) -> Result<()> {
        let key = name.to_lowercase();
        let mut state = self.inner.lock().await;

        let Some(item) = state.items.get_mut(&key) else {
            bail!("no item named {} in the inventory", name);
        };

        if let Some(p) = updates.price {
            item.price = p;
        }
        if let Some(cp) = updates.cost_price {
            item.cost_price = cp;
        }
        if let Some(q) = updates.quantity {
            item.quantity = q;
        }
        if let Some(date) = updates.expiry_date {
            item.expiry_at = expiry_instant(&date);
            item.expiry_date = Some(date);
        }

        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Item>> {
        let state = self.inner.lock().await;
        let mut items: Vec<Item> = state.items.values().cloned().collect();
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(items)
    }

    async fn delete_batch(&self, ids: &[String]) -> Result<()> {
        let mut state = self.inner.lock().await;
        state.items.retain(|_, item| !ids.contains(&item.id));
        Ok(())
    }
}
