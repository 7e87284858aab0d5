use super::slot::DialogueSlot;
use super::tools;
use crate::inventory::{InventoryStore, ItemUpdate};
use crate::remote::ToolCallMessage;
use crate::usage::{self, Account, Feature};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

/// Outcome of one tool call, always sent back into the session so the model
/// can speak it. Never crosses the session boundary as an error.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResult {
    pub success: bool,
    pub message: String,
}

impl ToolResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Inventory-item ids currently selected for bulk voice actions.
///
/// Lives for the lifetime of the screen, independent of any session, so a
/// selection made before a session starts is still actionable by voice.
#[derive(Clone, Default)]
pub struct SelectionSet {
    inner: Arc<Mutex<HashSet<String>>>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, id: impl Into<String>) {
        self.inner.lock().await.insert(id.into());
    }

    pub async fn clear(&self) {
        self.inner.lock().await.clear();
    }

    pub async fn ids(&self) -> Vec<String> {
        self.inner.lock().await.iter().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }
}

/// Completion notice from an asynchronous promo generation.
#[derive(Debug, Clone)]
pub struct PromoNotice {
    pub content: String,
    pub item_count: usize,
}

/// Generates promotional text for a bundle of items.
#[async_trait]
pub trait PromoGenerator: Send + Sync {
    async fn generate(&self, item_names: &[String]) -> anyhow::Result<String>;
}

/// Fills a fixed template instead of calling a generation service.
pub struct TemplatePromo;

#[async_trait]
impl PromoGenerator for TemplatePromo {
    async fn generate(&self, item_names: &[String]) -> anyhow::Result<String> {
        if item_names.is_empty() {
            anyhow::bail!("no items to promote");
        }
        Ok(format!("Special offer today on {}!", item_names.join(", ")))
    }
}

/// Store categories whose items carry expiry dates.
const EXPIRY_TRACKED_CATEGORIES: [&str; 3] = ["medical", "grocery", "sweets"];

/// Strict DD-MM-YYYY check: exact shape, and a real calendar date.
fn valid_expiry_date(s: &str) -> bool {
    let bytes = s.as_bytes();
    if bytes.len() != 10 || bytes[2] != b'-' || bytes[5] != b'-' {
        return false;
    }
    let digits_ok = bytes
        .iter()
        .enumerate()
        .all(|(i, b)| i == 2 || i == 5 || b.is_ascii_digit());
    digits_ok && NaiveDate::parse_from_str(s, "%d-%m-%Y").is_ok()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InitiateAddItemArgs {
    item_name: String,
    quantity: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ProvideQuantityArgs {
    quantity: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProvidePriceArgs {
    price: Option<f64>,
    cost_price: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProvideExpiryArgs {
    expiry_date: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateItemArgs {
    item_name: String,
    new_price: Option<f64>,
    new_cost_price: Option<f64>,
    new_quantity: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoveItemArgs {
    item_name: String,
    quantity: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BulkActionArgs {
    action_type: BulkAction,
}

#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum BulkAction {
    Delete,
    Promote,
    Deselect,
}

/// Executes the eight declared tool intents against the inventory store and
/// the usage gate, tracking the slot-filling state across turns.
///
/// The slot is a plain field: the dispatcher runs on the session's single
/// event loop, so every tool call reads and writes it synchronously within
/// one event tick.
pub struct ToolDispatcher {
    store: Arc<dyn InventoryStore>,
    account: Arc<Mutex<Account>>,
    selection: SelectionSet,
    promo: Arc<dyn PromoGenerator>,
    promo_tx: mpsc::UnboundedSender<PromoNotice>,
    slot: DialogueSlot,
}

impl ToolDispatcher {
    pub fn new(
        store: Arc<dyn InventoryStore>,
        account: Arc<Mutex<Account>>,
        selection: SelectionSet,
        promo: Arc<dyn PromoGenerator>,
        promo_tx: mpsc::UnboundedSender<PromoNotice>,
    ) -> Self {
        Self {
            store,
            account,
            selection,
            promo,
            promo_tx,
            slot: DialogueSlot::Idle,
        }
    }

    /// The current slot state, for inspection.
    pub fn slot(&self) -> &DialogueSlot {
        &self.slot
    }

    /// Abandon any partially specified mutation. Part of session teardown.
    pub fn clear_slot(&mut self) {
        if !self.slot.is_idle() {
            debug!("Clearing partially filled slot: {:?}", self.slot);
        }
        self.slot.clear();
    }

    pub async fn shop_categories(&self) -> Vec<String> {
        self.account.lock().await.categories.clone()
    }

    /// Execute one tool call. Validation failures come back as
    /// `ToolResult { success: false, .. }`; nothing here panics or errors
    /// across the session boundary.
    pub async fn dispatch(&mut self, call: &ToolCallMessage) -> ToolResult {
        info!("Dispatching tool call: {} ({})", call.name, call.call_id);

        match call.name.as_str() {
            tools::INITIATE_ADD_ITEM => self.initiate_add_item(&call.args),
            tools::PROVIDE_ITEM_QUANTITY => self.provide_quantity(&call.args),
            tools::PROVIDE_ITEM_PRICE => self.provide_price(&call.args).await,
            tools::PROVIDE_ITEM_EXPIRY_DATE => self.provide_expiry(&call.args).await,
            tools::UPDATE_ITEM => self.update_item(&call.args).await,
            tools::REMOVE_ITEM => self.remove_item(&call.args).await,
            tools::QUERY_INVENTORY => self.query_inventory().await,
            tools::PERFORM_BULK_ACTION => self.bulk_action(&call.args).await,
            other => {
                warn!("Unknown tool requested: {}", other);
                ToolResult::fail(format!("Sorry, I can't do \"{}\".", other))
            }
        }
    }

    fn initiate_add_item(&mut self, args: &serde_json::Value) -> ToolResult {
        let args: InitiateAddItemArgs = match parse_args(args) {
            Ok(a) => a,
            Err(r) => return r,
        };

        match args.quantity {
            Some(quantity) => {
                self.slot = DialogueSlot::AwaitingPrice {
                    item_name: args.item_name.clone(),
                    quantity,
                };
                ToolResult::ok(format!(
                    "Okay, adding {} {}. What is the Cost Price (CP) and Selling Price (SP)?",
                    quantity, args.item_name
                ))
            }
            None => {
                self.slot = DialogueSlot::AwaitingQuantity {
                    item_name: args.item_name.clone(),
                };
                ToolResult::ok(format!(
                    "Okay, you want to add {}. How many?",
                    args.item_name
                ))
            }
        }
    }

    fn provide_quantity(&mut self, args: &serde_json::Value) -> ToolResult {
        let DialogueSlot::AwaitingQuantity { item_name } = self.slot.clone() else {
            return ToolResult::fail(
                "I'm sorry, I don't know which item you're providing the quantity for.",
            );
        };

        let args: ProvideQuantityArgs = match parse_args(args) {
            Ok(a) => a,
            Err(r) => return r,
        };

        self.slot = DialogueSlot::AwaitingPrice {
            item_name,
            quantity: args.quantity,
        };
        ToolResult::ok(format!(
            "Got it, {}. What is the Cost Price (CP) and Selling Price (SP)?",
            args.quantity
        ))
    }

    async fn provide_price(&mut self, args: &serde_json::Value) -> ToolResult {
        let DialogueSlot::AwaitingPrice {
            item_name,
            quantity,
        } = self.slot.clone()
        else {
            return ToolResult::fail("I don't know which item you're providing the price for.");
        };

        let args: ProvidePriceArgs = match parse_args(args) {
            Ok(a) => a,
            Err(r) => return r,
        };

        // Slot stays put until the user supplies at least the selling price.
        let Some(price) = args.price else {
            return ToolResult::fail("I need at least the Selling Price.");
        };

        self.slot.clear();

        if !self.inventory_growth_allowed().await {
            return ToolResult::fail("Inventory limit reached. Upgrade to add more items.");
        }

        let cost_price = args.cost_price.unwrap_or(0.0);
        if self.needs_expiry().await {
            self.slot = DialogueSlot::AwaitingExpiry {
                item_name,
                quantity,
                price,
                cost_price,
            };
            return ToolResult::ok("Prices set. What is the expiry date? (DD-MM-YYYY)");
        }

        match self
            .store
            .upsert(&item_name, quantity, price, None, args.cost_price)
            .await
        {
            Ok(()) => ToolResult::ok(format!(
                "Great, added {} {}. Cost: {}, Sell: {}",
                quantity, item_name, cost_price, price
            )),
            Err(e) => {
                warn!("Inventory upsert failed: {e:#}");
                ToolResult::fail("Sorry, I couldn't save that item.")
            }
        }
    }

    async fn provide_expiry(&mut self, args: &serde_json::Value) -> ToolResult {
        let DialogueSlot::AwaitingExpiry {
            item_name,
            quantity,
            price,
            cost_price,
        } = self.slot.clone()
        else {
            return ToolResult::fail("I don't know which item needs an expiry date.");
        };

        let args: ProvideExpiryArgs = match parse_args(args) {
            Ok(a) => a,
            Err(r) => return r,
        };

        // Invalid format leaves the slot unchanged so the user can try again.
        if !valid_expiry_date(&args.expiry_date) {
            return ToolResult::fail("Please provide the date in day-month-year format.");
        }

        if !self.inventory_growth_allowed().await {
            return ToolResult::fail("Inventory limit reached. Upgrade to add more items.");
        }

        match self
            .store
            .upsert(
                &item_name,
                quantity,
                price,
                Some(&args.expiry_date),
                Some(cost_price),
            )
            .await
        {
            Ok(()) => {
                self.slot.clear();
                ToolResult::ok(format!(
                    "Added {} with expiry {}.",
                    item_name, args.expiry_date
                ))
            }
            Err(e) => {
                warn!("Inventory upsert failed: {e:#}");
                ToolResult::fail("Sorry, I couldn't save that item.")
            }
        }
    }

    async fn update_item(&mut self, args: &serde_json::Value) -> ToolResult {
        let args: UpdateItemArgs = match parse_args(args) {
            Ok(a) => a,
            Err(r) => return r,
        };

        let found = match self.store.find_by_name(&args.item_name).await {
            Ok(found) => found,
            Err(e) => {
                warn!("Inventory lookup failed: {e:#}");
                return ToolResult::fail("Sorry, I couldn't look that item up.");
            }
        };
        if found.is_none() {
            return ToolResult::fail(format!(
                "I couldn't find {} in your inventory to update.",
                args.item_name
            ));
        }

        let updates = ItemUpdate {
            price: args.new_price,
            cost_price: args.new_cost_price,
            quantity: args.new_quantity,
            expiry_date: None,
        };
        if updates.is_empty() {
            return ToolResult::fail(format!(
                "What would you like to update for {}?",
                args.item_name
            ));
        }

        match self.store.update_fields(&args.item_name, updates).await {
            Ok(()) => ToolResult::ok(format!("Updated {}.", args.item_name)),
            Err(e) => {
                warn!("Inventory update failed: {e:#}");
                ToolResult::fail("Sorry, I couldn't update that item.")
            }
        }
    }

    async fn remove_item(&mut self, args: &serde_json::Value) -> ToolResult {
        let args: RemoveItemArgs = match parse_args(args) {
            Ok(a) => a,
            Err(r) => return r,
        };

        match self.store.remove(&args.item_name, args.quantity).await {
            Ok(outcome) => ToolResult {
                success: outcome.success,
                message: outcome.message,
            },
            Err(e) => {
                warn!("Inventory removal failed: {e:#}");
                ToolResult::fail("Sorry, I couldn't remove that item.")
            }
        }
    }

    async fn query_inventory(&self) -> ToolResult {
        let items = match self.store.list_all().await {
            Ok(items) => items,
            Err(e) => {
                warn!("Inventory listing failed: {e:#}");
                return ToolResult::fail("Sorry, I couldn't read the inventory.");
            }
        };

        if items.is_empty() {
            return ToolResult::ok("The inventory is currently empty.");
        }

        let total_value: f64 = items.iter().map(|i| i.quantity as f64 * i.price).sum();
        let total_count: u32 = items.iter().map(|i| i.quantity).sum();
        let listing = items
            .iter()
            .map(|i| {
                format!(
                    "Item: {}, Qty: {}, CP: {}, SP: {}",
                    i.name, i.quantity, i.cost_price, i.price
                )
            })
            .collect::<Vec<_>>()
            .join("; ");

        ToolResult::ok(format!(
            "Inventory summary: total value (SP) {}, total items {}. List: [{}].",
            total_value, total_count, listing
        ))
    }

    async fn bulk_action(&mut self, args: &serde_json::Value) -> ToolResult {
        let args: BulkActionArgs = match parse_args(args) {
            Ok(a) => a,
            Err(r) => return r,
        };

        if args.action_type == BulkAction::Deselect {
            self.selection.clear().await;
            return ToolResult::ok("Selection cleared.");
        }

        let selected = self.selection.ids().await;
        if selected.is_empty() {
            return ToolResult::fail("No items selected.");
        }

        match args.action_type {
            BulkAction::Delete => match self.store.delete_batch(&selected).await {
                Ok(()) => {
                    self.selection.clear().await;
                    ToolResult::ok(format!("Deleted {} items.", selected.len()))
                }
                Err(e) => {
                    warn!("Batch delete failed: {e:#}");
                    ToolResult::fail("Failed to delete the selected items.")
                }
            },
            BulkAction::Promote => self.spawn_promo(selected).await,
            BulkAction::Deselect => unreachable!("handled above"),
        }
    }

    /// Kick off promo generation without blocking the tool response. The
    /// result arrives later on the promo side channel, and the usage counter
    /// is incremented only on success.
    async fn spawn_promo(&self, selected: Vec<String>) -> ToolResult {
        {
            let account = self.account.lock().await;
            if !usage::allow(account.plan, Feature::Promos, account.usage.promos_generated) {
                return ToolResult::fail("Promo limit reached. Upgrade for more.");
            }
        }

        let items = match self.store.list_all().await {
            Ok(items) => items,
            Err(e) => {
                warn!("Inventory listing failed: {e:#}");
                return ToolResult::fail("Sorry, I couldn't read the selected items.");
            }
        };
        let names: Vec<String> = items
            .into_iter()
            .filter(|i| selected.contains(&i.id))
            .map(|i| i.name)
            .collect();
        let item_count = names.len();

        let promo = Arc::clone(&self.promo);
        let account = Arc::clone(&self.account);
        let promo_tx = self.promo_tx.clone();
        tokio::spawn(async move {
            match promo.generate(&names).await {
                Ok(content) => {
                    account.lock().await.usage.promos_generated += 1;
                    let _ = promo_tx.send(PromoNotice {
                        content,
                        item_count,
                    });
                }
                Err(e) => warn!("Promo generation failed: {e:#}"),
            }
        });

        ToolResult::ok(format!("Generating a promo for {} items.", item_count))
    }

    async fn needs_expiry(&self) -> bool {
        let account = self.account.lock().await;
        account
            .categories
            .iter()
            .any(|c| EXPIRY_TRACKED_CATEGORIES.contains(&c.as_str()))
    }

    /// Gate any mutation that can grow the persistent inventory count.
    async fn inventory_growth_allowed(&self) -> bool {
        let current = match self.store.list_all().await {
            Ok(items) => items.len(),
            Err(e) => {
                warn!("Inventory listing failed while checking limits: {e:#}");
                return false;
            }
        };
        let account = self.account.lock().await;
        usage::allow(account.plan, Feature::InventoryItems, current)
    }
}

fn parse_args<T: DeserializeOwned>(args: &serde_json::Value) -> Result<T, ToolResult> {
    serde_json::from_value(args.clone()).map_err(|e| {
        debug!("Malformed tool arguments: {e}");
        ToolResult::fail("Sorry, I didn't catch that. Could you say it again?")
    })
}
