use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use locktrack_core::{
    Amount, CurrencyUnit, DomainError, DomainResult, Entity, EntryId, ItemId, SaleId, TenantId,
};
use locktrack_inventory::{Consumption, InventoryEntry};

/// Decimal places kept when revenue is split across lots.
const ALLOCATION_DP: u32 = 8;

/// One recorded sale, drawn against exactly one lot. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sale {
    pub id: SaleId,
    pub tenant_id: TenantId,
    pub entry_id: EntryId,
    pub item_id: ItemId,
    pub quantity_sold: u64,
    /// Revenue, in `unit`.
    pub amount_gained: Decimal,
    pub unit: CurrencyUnit,
    pub sold_at: DateTime<Utc>,
    pub notes: Option<String>,
}

impl Sale {
    pub fn revenue(&self) -> Amount {
        Amount::new(self.amount_gained, self.unit)
    }

    /// Check that `lot` is the lot this sale was drawn from.
    pub fn ensure_drawn_from(&self, lot: &InventoryEntry) -> DomainResult<()> {
        if self.tenant_id != lot.tenant_id {
            return Err(DomainError::invariant("tenant mismatch"));
        }
        if self.entry_id != lot.id {
            return Err(DomainError::invariant(format!(
                "sale {} references lot {}, not {}",
                self.id, self.entry_id, lot.id
            )));
        }
        if self.item_id != lot.item_id {
            return Err(DomainError::invariant(format!(
                "sale {} is for item {}, lot {} holds item {}",
                self.id, self.item_id, lot.id, lot.item_id
            )));
        }
        Ok(())
    }
}

impl Entity for Sale {
    type Id = SaleId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// A sale as entered by the user: an item, a quantity and what was received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSale {
    pub tenant_id: TenantId,
    pub item_id: ItemId,
    pub quantity: u64,
    pub amount_gained: Amount,
    pub sold_at: DateTime<Utc>,
    pub notes: Option<String>,
}

impl NewSale {
    pub fn validate(&self) -> DomainResult<()> {
        if self.quantity == 0 {
            return Err(DomainError::validation("sale quantity must be positive"));
        }
        if self.amount_gained.is_negative() {
            return Err(DomainError::validation("amount gained cannot be negative"));
        }
        Ok(())
    }
}

/// Turn one entered sale into one `Sale` row per lot the FIFO walk touched.
///
/// Revenue is split in proportion to the quantity taken from each lot. Shares
/// are truncated, never rounded up, and the last row absorbs the remainder, so
/// the rows add up exactly and none goes negative.
pub fn allocate_sales(cmd: &NewSale, consumption: &Consumption) -> DomainResult<Vec<Sale>> {
    cmd.validate()?;
    if consumption.item_id != cmd.item_id {
        return Err(DomainError::invariant("consumption is for another item"));
    }
    if !consumption.is_satisfied() || consumption.consumed != cmd.quantity {
        return Err(DomainError::invariant(format!(
            "consumption covers {} of {} units",
            consumption.consumed, cmd.quantity
        )));
    }

    let total_qty = Decimal::from(cmd.quantity);
    let total_revenue = cmd.amount_gained.value;
    let last = consumption.contributions.len().saturating_sub(1);
    let mut unallocated = total_revenue;
    let mut sales = Vec::with_capacity(consumption.contributions.len());

    for (i, c) in consumption.contributions.iter().enumerate() {
        let amount_gained = if i == last {
            unallocated
        } else {
            let share = total_revenue
                .checked_mul(Decimal::from(c.qty_used))
                .and_then(|v| v.checked_div(total_qty))
                .ok_or_else(|| DomainError::validation("amount gained is out of range"))?
                .round_dp_with_strategy(ALLOCATION_DP, RoundingStrategy::ToZero)
                .min(unallocated);
            unallocated -= share;
            share
        };

        sales.push(Sale {
            id: SaleId::new(),
            tenant_id: cmd.tenant_id,
            entry_id: c.entry_id,
            item_id: cmd.item_id,
            quantity_sold: c.qty_used,
            amount_gained,
            unit: cmd.amount_gained.unit,
            sold_at: cmd.sold_at,
            notes: cmd.notes.clone(),
        });
    }

    Ok(sales)
}
