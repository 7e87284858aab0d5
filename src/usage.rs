use serde::{Deserialize, Serialize};

/// Subscription tier of a shopkeeper account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Free,
    Pro,
}

/// Features with free-tier ceilings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    /// Number of distinct items in the inventory.
    InventoryItems,
    /// AI image scans (invoice scan, shelf analysis).
    AiScans,
    /// Promotional text generations.
    Promos,
}

/// Free-tier ceilings. The pro plan is unrestricted.
pub const FREE_MAX_INVENTORY_ITEMS: usize = 50;
pub const FREE_MAX_AI_SCANS: usize = 5;
pub const FREE_MAX_PROMOS: usize = 3;

/// Returns whether the account may perform one more gated operation.
///
/// Pure and side-effect free: it only compares the caller-supplied counter
/// against the plan ceiling. A caller that gets `false` back must surface an
/// upgrade prompt and must not proceed with the gated operation.
pub fn allow(plan: Plan, feature: Feature, current_count: usize) -> bool {
    if plan == Plan::Pro {
        return true;
    }
    let limit = match feature {
        Feature::InventoryItems => FREE_MAX_INVENTORY_ITEMS,
        Feature::AiScans => FREE_MAX_AI_SCANS,
        Feature::Promos => FREE_MAX_PROMOS,
    };
    current_count < limit
}

/// Usage counters maintained against an account by the external accounting
/// collaborator. The gate only reads these.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsageCounters {
    pub ai_scans: usize,
    pub promos_generated: usize,
}

/// The slice of a shopkeeper account the dialogue engine needs: plan tier,
/// usage counters, and the store categories that decide whether expiry dates
/// are collected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub plan: Plan,
    pub usage: UsageCounters,
    /// Store categories, e.g. "grocery", "electronics".
    pub categories: Vec<String>,
}

impl Account {
    pub fn free(categories: Vec<String>) -> Self {
        Self {
            plan: Plan::Free,
            usage: UsageCounters::default(),
            categories,
        }
    }

    pub fn pro(categories: Vec<String>) -> Self {
        Self {
            plan: Plan::Pro,
            usage: UsageCounters::default(),
            categories,
        }
    }
}
