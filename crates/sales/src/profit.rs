//! Realized and projected profit from FIFO cost basis.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use locktrack_core::{Amount, CurrencyError, DenominationConverter, DomainError};
use locktrack_inventory::{
    CostContribution, CostingEngine, CostingError, InventoryEntry, LotLedger, SimulationCapped,
};

use crate::report::{self, ProfitReport, ReportOptions, ReportWindow};
use crate::sale::Sale;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProfitError {
    /// The lot supplied as a sale's cost basis is not the lot the sale drew from.
    #[error("sale/lot mismatch: {0}")]
    LotMismatch(#[from] DomainError),

    #[error("assumed unit price cannot be negative")]
    NegativePrice,

    #[error(transparent)]
    Costing(#[from] CostingError),

    #[error(transparent)]
    Currency(#[from] CurrencyError),
}

/// Projection of a hypothetical sale. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub requested_qty: u64,
    /// Units the projection covers; below `requested_qty` when capped.
    pub simulated_qty: u64,
    pub assumed_unit_price: Amount,
    pub projected_revenue: Amount,
    pub simulated_cogs: Amount,
    pub projected_profit: Amount,
    /// One entry per lot the hypothetical FIFO walk touched, oldest first.
    pub breakdown: Vec<CostContribution>,
    pub capped: Option<SimulationCapped>,
}

impl SimulationResult {
    pub fn is_capped(&self) -> bool {
        self.capped.is_some()
    }
}

/// Combines sales with lot cost basis.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProfitCalculator {
    converter: DenominationConverter,
    engine: CostingEngine,
}

impl ProfitCalculator {
    pub fn new(converter: DenominationConverter) -> Self {
        Self {
            converter,
            engine: CostingEngine::new(),
        }
    }

    pub fn converter(&self) -> &DenominationConverter {
        &self.converter
    }

    /// `revenue - sum(cost)`, stated in the revenue's unit.
    ///
    /// Contributions in another unit are taken through base units before they
    /// are subtracted. Every profit figure the engine reports comes from here.
    pub fn profit_against(
        &self,
        revenue: &Amount,
        contributions: &[CostContribution],
    ) -> Result<Amount, ProfitError> {
        let cogs = self
            .converter
            .sum_in(contributions.iter().map(|c| &c.cost), revenue.unit)?;
        let profit = revenue
            .value
            .checked_sub(cogs.value)
            .ok_or(CurrencyError::OutOfRange(cogs.value))?;
        Ok(Amount::new(profit, revenue.unit))
    }

    /// Profit of one recorded sale row against the contributions it drew.
    pub fn sale_profit(
        &self,
        sale: &Sale,
        contributions: &[CostContribution],
    ) -> Result<Amount, ProfitError> {
        self.profit_against(&sale.revenue(), contributions)
    }

    /// Historical cost basis of a recorded sale: its quantity at its lot's unit cost.
    pub fn cost_basis(
        &self,
        sale: &Sale,
        lot: &InventoryEntry,
    ) -> Result<CostContribution, ProfitError> {
        sale.ensure_drawn_from(lot)?;
        Ok(CostContribution {
            entry_id: lot.id,
            bought_at: lot.bought_at,
            unit_cost: lot.unit_cost_amount(),
            qty_used: sale.quantity_sold,
            cost: lot.cost_of(sale.quantity_sold)?,
        })
    }

    /// Realized profit of a recorded sale against the lot it drew from.
    pub fn realized_profit(&self, sale: &Sale, lot: &InventoryEntry) -> Result<Amount, ProfitError> {
        let basis = self.cost_basis(sale, lot)?;
        self.sale_profit(sale, std::slice::from_ref(&basis))
    }

    /// Per-period and per-item rollups of revenue and profit inside `window`.
    pub fn aggregate(
        &self,
        sales: &[Sale],
        lots: &[InventoryEntry],
        window: &ReportWindow,
        options: &ReportOptions,
    ) -> Result<ProfitReport, ProfitError> {
        report::aggregate(self, sales, lots, window, options)
    }

    /// Project selling `simulate_qty` units at `assumed_unit_price` each.
    ///
    /// The ledger is only read. Beyond available stock the projection is
    /// capped at what is available and the cap is reported.
    pub fn simulate(
        &self,
        ledger: &LotLedger,
        simulate_qty: u64,
        assumed_unit_price: Amount,
    ) -> Result<SimulationResult, ProfitError> {
        if assumed_unit_price.is_negative() {
            return Err(ProfitError::NegativePrice);
        }

        let consumption = self.engine.simulate(ledger, simulate_qty)?;
        let unit = assumed_unit_price.unit;

        let projected_revenue = Decimal::from(consumption.consumed)
            .checked_mul(assumed_unit_price.value)
            .map(|value| Amount::new(value, unit))
            .ok_or(CurrencyError::OutOfRange(assumed_unit_price.value))?;
        let simulated_cogs = consumption.total_cost_in(&self.converter, unit)?;
        let projected_profit = self.profit_against(&projected_revenue, &consumption.contributions)?;

        Ok(SimulationResult {
            requested_qty: simulate_qty,
            simulated_qty: consumption.consumed,
            assumed_unit_price,
            projected_revenue,
            simulated_cogs,
            projected_profit,
            capped: consumption.capped(),
            breakdown: consumption.contributions,
        })
    }
}
