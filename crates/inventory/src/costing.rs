//! FIFO cost-of-goods-sold.
//!
//! One pure planning pass walks the open lots oldest-first. Real consumption
//! applies the plan to the ledger; simulation returns it untouched.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use locktrack_core::{
    Amount, CurrencyError, CurrencyUnit, DenominationConverter, EntryId, ItemId, ValueObject,
};

use crate::ledger::LotLedger;
use crate::lot::{LotStatus, LotUpdate};

/// Whether a consumption advances the ledger or only projects it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsumeMode {
    Real,
    Simulate,
}

/// Cost drawn from a single lot, in that lot's own currency unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostContribution {
    pub entry_id: EntryId,
    pub bought_at: DateTime<Utc>,
    pub unit_cost: Amount,
    pub qty_used: u64,
    pub cost: Amount,
}

impl ValueObject for CostContribution {}

/// Requested quantity exceeded available stock in a simulation.
///
/// Informational: the simulation still covers everything that is available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationCapped {
    pub requested: u64,
    pub available: u64,
    pub shortfall: u64,
}

/// Outcome of walking the ledger for `requested` units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consumption {
    pub item_id: ItemId,
    pub requested: u64,
    /// Units actually covered by lots (`requested - shortfall`).
    pub consumed: u64,
    pub contributions: Vec<CostContribution>,
    /// Ledger total remaining once the contributions are taken.
    pub remaining_after: u64,
    pub shortfall: u64,
    /// New lot states, one per contribution, in FIFO order.
    pub updates: Vec<LotUpdate>,
}

impl Consumption {
    pub fn is_satisfied(&self) -> bool {
        self.shortfall == 0
    }

    /// Cap information when the request could not be fully covered.
    pub fn capped(&self) -> Option<SimulationCapped> {
        (self.shortfall > 0).then(|| SimulationCapped {
            requested: self.requested,
            available: self.consumed,
            shortfall: self.shortfall,
        })
    }

    /// Total cost per currency unit, never mixed.
    pub fn total_cost_by_unit(&self) -> Result<BTreeMap<CurrencyUnit, Decimal>, CurrencyError> {
        let mut totals = BTreeMap::new();
        for c in &self.contributions {
            let total = totals.entry(c.cost.unit).or_insert(Decimal::ZERO);
            *total = total
                .checked_add(c.cost.value)
                .ok_or(CurrencyError::OutOfRange(c.cost.value))?;
        }
        Ok(totals)
    }

    /// Total cost restated in `unit` via base units.
    pub fn total_cost_in(
        &self,
        converter: &DenominationConverter,
        unit: CurrencyUnit,
    ) -> Result<Amount, CurrencyError> {
        converter.sum_in(self.contributions.iter().map(|c| &c.cost), unit)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CostingError {
    /// A real sale asked for more than the open lots hold. Nothing was consumed.
    ///
    /// An item with no open lots reports `available = 0` and
    /// `shortfall = requested`.
    #[error(
        "insufficient stock for item {item_id}: requested {requested}, available {available} (short {shortfall})"
    )]
    InsufficientStock {
        item_id: ItemId,
        requested: u64,
        available: u64,
        shortfall: u64,
    },

    #[error(transparent)]
    Currency(#[from] CurrencyError),
}

/// FIFO costing over a [`LotLedger`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CostingEngine;

impl CostingEngine {
    pub fn new() -> Self {
        Self
    }

    /// Pure planning pass shared by both modes.
    ///
    /// A function of `(ledger snapshot, quantity)` only.
    pub fn plan(&self, ledger: &LotLedger, quantity: u64) -> Result<Consumption, CostingError> {
        let mut left = quantity;
        let mut contributions = Vec::new();
        let mut updates = Vec::new();

        for lot in ledger.open_lots_fifo() {
            if left == 0 {
                break;
            }
            let used = left.min(lot.remaining_qty);
            if used == 0 {
                continue;
            }

            contributions.push(CostContribution {
                entry_id: lot.id,
                bought_at: lot.bought_at,
                unit_cost: lot.unit_cost_amount(),
                qty_used: used,
                cost: lot.cost_of(used)?,
            });

            let remaining_qty = lot.remaining_qty - used;
            updates.push(LotUpdate {
                entry_id: lot.id,
                previous_remaining: lot.remaining_qty,
                remaining_qty,
                status: LotStatus::for_remaining(remaining_qty),
            });

            left -= used;
        }

        let consumed = quantity - left;
        Ok(Consumption {
            item_id: ledger.item_id(),
            requested: quantity,
            consumed,
            contributions,
            remaining_after: ledger.total_remaining() - consumed,
            shortfall: left,
            updates,
        })
    }

    /// Consume `quantity` units.
    ///
    /// `Real` is all-or-nothing: a shortfall rejects the call and leaves the
    /// ledger untouched, otherwise every touched lot is decremented (and closed
    /// when exhausted). Each real call advances the ledger, so one sale must be
    /// consumed exactly once. `Simulate` never touches the ledger and reports a
    /// shortfall as a cap.
    pub fn consume(
        &self,
        ledger: &mut LotLedger,
        quantity: u64,
        mode: ConsumeMode,
    ) -> Result<Consumption, CostingError> {
        match mode {
            ConsumeMode::Simulate => self.simulate(ledger, quantity),
            ConsumeMode::Real => self.consume_real(ledger, quantity),
        }
    }

    /// Hypothetical consumption; the ledger is only borrowed immutably.
    pub fn simulate(&self, ledger: &LotLedger, quantity: u64) -> Result<Consumption, CostingError> {
        self.plan(ledger, quantity)
    }

    fn consume_real(
        &self,
        ledger: &mut LotLedger,
        quantity: u64,
    ) -> Result<Consumption, CostingError> {
        let plan = self.plan(ledger, quantity)?;
        if !plan.is_satisfied() {
            return Err(CostingError::InsufficientStock {
                item_id: ledger.item_id(),
                requested: quantity,
                available: plan.consumed,
                shortfall: plan.shortfall,
            });
        }

        for update in &plan.updates {
            match ledger.entry_mut(update.entry_id) {
                Some(entry) => entry.set_remaining(update.remaining_qty),
                None => unreachable!("planned lot {} missing from its own ledger", update.entry_id),
            }
        }

        Ok(plan)
    }
}
