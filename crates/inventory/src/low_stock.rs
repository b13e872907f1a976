//! Low-stock detection over already-loaded ledgers.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use locktrack_core::ItemId;

use crate::ledger::LotLedger;

/// Low-stock thresholds: a global default plus per-item overrides.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StockThresholds {
    pub global_default: u64,
    #[serde(default)]
    pub per_item: HashMap<ItemId, u64>,
}

impl StockThresholds {
    pub fn new(global_default: u64) -> Self {
        Self {
            global_default,
            per_item: HashMap::new(),
        }
    }

    pub fn with_override(mut self, item_id: ItemId, threshold: u64) -> Self {
        self.per_item.insert(item_id, threshold);
        self
    }

    /// Item-specific threshold when present, otherwise the global default.
    pub fn threshold_for(&self, item_id: ItemId) -> u64 {
        self.per_item
            .get(&item_id)
            .copied()
            .unwrap_or(self.global_default)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LowStockAlert {
    pub item_id: ItemId,
    pub item_name: Option<String>,
    pub remaining_qty: u64,
    pub threshold: u64,
}

/// Flags items whose remaining stock is positive but at or below threshold.
#[derive(Debug, Clone, Copy, Default)]
pub struct LowStockDetector;

impl LowStockDetector {
    pub fn new() -> Self {
        Self
    }

    /// One alert per item with `0 < remaining <= threshold`, most urgent first.
    ///
    /// Items with nothing left are out of stock, which is reported separately
    /// by [`LowStockDetector::out_of_stock`]. An item without a ledger counts
    /// as having nothing left.
    pub fn evaluate(
        &self,
        items: &[ItemId],
        ledgers: &HashMap<ItemId, LotLedger>,
        thresholds: &StockThresholds,
    ) -> Vec<LowStockAlert> {
        let unique: BTreeSet<ItemId> = items.iter().copied().collect();

        let mut alerts: Vec<LowStockAlert> = unique
            .into_iter()
            .filter_map(|item_id| {
                let ledger = ledgers.get(&item_id)?;
                let remaining_qty = ledger.total_remaining();
                let threshold = thresholds.threshold_for(item_id);
                if remaining_qty == 0 || remaining_qty > threshold {
                    return None;
                }
                Some(LowStockAlert {
                    item_id,
                    item_name: ledger.item_name().map(str::to_string),
                    remaining_qty,
                    threshold,
                })
            })
            .collect();

        alerts.sort_by(|a, b| {
            a.remaining_qty
                .cmp(&b.remaining_qty)
                .then(a.item_id.cmp(&b.item_id))
        });
        alerts
    }

    /// Items with no remaining stock, ordered by item id.
    pub fn out_of_stock(
        &self,
        items: &[ItemId],
        ledgers: &HashMap<ItemId, LotLedger>,
    ) -> Vec<ItemId> {
        let unique: BTreeSet<ItemId> = items.iter().copied().collect();
        unique
            .into_iter()
            .filter(|item_id| {
                ledgers
                    .get(item_id)
                    .map_or(true, |ledger| ledger.total_remaining() == 0)
            })
            .collect()
    }
}
