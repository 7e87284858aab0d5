//! Inventory store abstraction and the in-process implementation.

mod memory;
mod store;

pub use memory::MemoryStore;
pub use store::{InventoryStore, Item, ItemUpdate, RemoveOutcome, SaleRecord};
