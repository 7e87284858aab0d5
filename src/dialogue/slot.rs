/// Where a multi-turn "add an item" intent currently stands.
///
/// Exactly one variant is live at a time. Transitions only move forward
/// through the chain (quantity, then price, then optionally expiry) or reset
/// to `Idle`; the sum type makes illegal combinations, such as awaiting a
/// quantity and a price at once, unrepresentable.
#[derive(Debug, Clone, PartialEq)]
pub enum DialogueSlot {
    Idle,
    AwaitingQuantity {
        item_name: String,
    },
    AwaitingPrice {
        item_name: String,
        quantity: u32,
    },
    AwaitingExpiry {
        item_name: String,
        quantity: u32,
        price: f64,
        cost_price: f64,
    },
}

impl DialogueSlot {
    pub fn is_idle(&self) -> bool {
        matches!(self, DialogueSlot::Idle)
    }

    /// Reset to `Idle`, returning the state that was live.
    pub fn clear(&mut self) -> DialogueSlot {
        std::mem::replace(self, DialogueSlot::Idle)
    }
}

impl Default for DialogueSlot {
    fn default() -> Self {
        DialogueSlot::Idle
    }
}
