use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use locktrack_core::{
    Amount, CurrencyError, CurrencyUnit, DomainError, DomainResult, Entity, EntryId, ItemId,
    TenantId,
};

/// Lot lifecycle: open while units remain, closed once exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LotStatus {
    Open,
    Closed,
}

impl LotStatus {
    pub fn for_remaining(remaining_qty: u64) -> Self {
        if remaining_qty == 0 {
            LotStatus::Closed
        } else {
            LotStatus::Open
        }
    }
}

/// One purchase event for one item, tracked as a depletable lot.
///
/// `item_name`/`category` are snapshots taken at purchase time and are not
/// touched when the item is later renamed. `total_cost` is fixed at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryEntry {
    pub id: EntryId,
    pub tenant_id: TenantId,
    pub item_id: ItemId,
    pub item_name: String,
    pub category: Option<String>,
    pub quantity_bought: u64,
    pub unit_cost: Decimal,
    pub total_cost: Decimal,
    pub unit: CurrencyUnit,
    pub bought_at: DateTime<Utc>,
    pub remaining_qty: u64,
    pub status: LotStatus,
    pub notes: Option<String>,
}

/// Input for recording a purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPurchase {
    pub tenant_id: TenantId,
    pub item_id: ItemId,
    pub item_name: String,
    pub category: Option<String>,
    pub quantity: u64,
    pub unit_cost: Amount,
    pub bought_at: DateTime<Utc>,
    pub notes: Option<String>,
}

/// Post-consumption state of one lot, for the caller to persist.
///
/// `previous_remaining` is the value the decision was based on; stores use it
/// as the condition of the update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotUpdate {
    pub entry_id: EntryId,
    pub previous_remaining: u64,
    pub remaining_qty: u64,
    pub status: LotStatus,
}

impl InventoryEntry {
    /// Create a fresh, fully open lot from a purchase.
    pub fn purchase(id: EntryId, cmd: NewPurchase) -> DomainResult<Self> {
        if cmd.quantity == 0 {
            return Err(DomainError::validation("purchase quantity must be positive"));
        }
        if cmd.unit_cost.is_negative() {
            return Err(DomainError::validation("unit cost cannot be negative"));
        }
        if cmd.item_name.trim().is_empty() {
            return Err(DomainError::validation("item name cannot be empty"));
        }
        let total_cost = Decimal::from(cmd.quantity)
            .checked_mul(cmd.unit_cost.value)
            .ok_or_else(|| {
                DomainError::validation(format!(
                    "total cost of {} x {} is out of range",
                    cmd.quantity, cmd.unit_cost
                ))
            })?;

        Ok(Self {
            id,
            tenant_id: cmd.tenant_id,
            item_id: cmd.item_id,
            item_name: cmd.item_name,
            category: cmd.category,
            quantity_bought: cmd.quantity,
            unit_cost: cmd.unit_cost.value,
            total_cost,
            unit: cmd.unit_cost.unit,
            bought_at: cmd.bought_at,
            remaining_qty: cmd.quantity,
            status: LotStatus::Open,
            notes: cmd.notes,
        })
    }

    pub fn unit_cost_amount(&self) -> Amount {
        Amount::new(self.unit_cost, self.unit)
    }

    pub fn total_cost_amount(&self) -> Amount {
        Amount::new(self.total_cost, self.unit)
    }

    /// Cost of `qty` units at this lot's unit cost, in the lot's unit.
    pub fn cost_of(&self, qty: u64) -> Result<Amount, CurrencyError> {
        Decimal::from(qty)
            .checked_mul(self.unit_cost)
            .map(|value| Amount::new(value, self.unit))
            .ok_or(CurrencyError::OutOfRange(self.unit_cost))
    }

    pub fn is_open(&self) -> bool {
        self.status == LotStatus::Open
    }

    pub fn consumed_qty(&self) -> u64 {
        self.quantity_bought - self.remaining_qty.min(self.quantity_bought)
    }

    /// Check the row-level invariants of a lot loaded from storage.
    pub fn validate(&self) -> DomainResult<()> {
        if self.remaining_qty > self.quantity_bought {
            return Err(DomainError::invariant(format!(
                "lot {}: remaining {} exceeds quantity bought {}",
                self.id, self.remaining_qty, self.quantity_bought
            )));
        }
        if self.status != LotStatus::for_remaining(self.remaining_qty) {
            return Err(DomainError::invariant(format!(
                "lot {}: status {:?} does not match remaining {}",
                self.id, self.status, self.remaining_qty
            )));
        }
        if self.unit_cost.is_sign_negative() && !self.unit_cost.is_zero() {
            return Err(DomainError::invariant(format!(
                "lot {}: negative unit cost",
                self.id
            )));
        }
        if self.cost_of(self.quantity_bought).is_err() {
            return Err(DomainError::invariant(format!(
                "lot {}: total cost out of range",
                self.id
            )));
        }
        Ok(())
    }

    /// Set remaining quantity and derive the status from it.
    pub(crate) fn set_remaining(&mut self, remaining_qty: u64) {
        self.remaining_qty = remaining_qty;
        self.status = LotStatus::for_remaining(remaining_qty);
    }
}

impl Entity for InventoryEntry {
    type Id = EntryId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
