//! Sale recording and reporting over the storage seams.
//!
//! ```text
//! NewSale
//!   ↓
//! 1. Load the item's lots (tenant-scoped) into a LotLedger
//!   ↓
//! 2. FIFO-consume for real (all-or-nothing)
//!   ↓
//! 3. Split into one Sale row per touched lot
//!   ↓
//! 4. Conditional commit; on conflict re-read and retry
//! ```
//!
//! The domain crates stay pure; this is the only place that talks to a store
//! or logs.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

use locktrack_core::{Amount, CurrencyError, DomainError, EntryId, ItemId, TenantId};
use locktrack_inventory::{
    ConsumeMode, Consumption, CostingEngine, CostingError, InventoryEntry, LotLedger,
    LowStockAlert, LowStockDetector, NewPurchase,
};
use locktrack_sales::{
    NewSale, ProfitCalculator, ProfitError, ProfitReport, ReportWindow, Sale, SimulationResult,
    allocate_sales,
};

use crate::config::EngineConfig;
use crate::store::{LotStore, SettingsStore, StoreError};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Costing(#[from] CostingError),

    #[error(transparent)]
    Profit(#[from] ProfitError),

    #[error(transparent)]
    Currency(#[from] CurrencyError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// Every attempt lost the race to a concurrent sale.
    #[error("sale not recorded: {attempts} attempts hit concurrent updates")]
    ConflictRetriesExhausted { attempts: u32 },
}

/// Outcome of a committed sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedSale {
    /// One row per lot drawn from, oldest lot first.
    pub sales: Vec<Sale>,
    pub cogs: Amount,
    /// Revenue minus COGS, in the revenue's unit.
    pub profit: Amount,
    pub remaining_after: u64,
    /// Commit attempts, including the successful one.
    pub attempts: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LowStockReport {
    pub alerts: Vec<LowStockAlert>,
    pub out_of_stock: Vec<ItemId>,
}

pub struct SaleService<S, T> {
    lots: S,
    settings: T,
    config: EngineConfig,
    engine: CostingEngine,
    calculator: ProfitCalculator,
    detector: LowStockDetector,
}

impl<S, T> SaleService<S, T>
where
    S: LotStore,
    T: SettingsStore,
{
    pub fn new(lots: S, settings: T, config: EngineConfig) -> Self {
        Self {
            lots,
            settings,
            config,
            engine: CostingEngine::new(),
            calculator: ProfitCalculator::new(config.converter()),
            detector: LowStockDetector::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[instrument(
        skip(self, cmd),
        fields(
            tenant_id = %cmd.tenant_id,
            item_id = %cmd.item_id,
            quantity = cmd.quantity,
        )
    )]
    pub fn record_purchase(&self, cmd: NewPurchase) -> Result<InventoryEntry, ServiceError> {
        let entry = InventoryEntry::purchase(EntryId::new(), cmd)?;
        self.lots.insert_lot(entry.clone())?;
        tracing::info!(entry_id = %entry.id, "purchase recorded");
        Ok(entry)
    }

    /// Record a sale against the oldest open lots.
    ///
    /// Rejected with `InsufficientStock` when the item cannot cover the
    /// quantity, and with `ConflictRetriesExhausted` when concurrent sales
    /// keep invalidating the snapshot.
    #[instrument(
        skip(self, cmd),
        fields(
            tenant_id = %cmd.tenant_id,
            item_id = %cmd.item_id,
            quantity = cmd.quantity,
        )
    )]
    pub fn record_sale(&self, cmd: NewSale) -> Result<RecordedSale, ServiceError> {
        cmd.validate()?;

        let mut attempts = 0;
        loop {
            attempts += 1;

            let mut ledger = self.load_ledger(cmd.tenant_id, cmd.item_id)?;
            let consumption = self
                .engine
                .consume(&mut ledger, cmd.quantity, ConsumeMode::Real)?;
            tracing::debug!(
                lots = consumption.contributions.len(),
                remaining_after = consumption.remaining_after,
                "fifo plan"
            );
            let sales = allocate_sales(&cmd, &consumption)?;

            match self
                .lots
                .commit_sale(cmd.tenant_id, &sales, &consumption.updates)
            {
                Ok(()) => {
                    let recorded = self.recorded(&cmd, sales, &consumption, attempts)?;
                    tracing::info!(
                        rows = recorded.sales.len(),
                        profit = %recorded.profit,
                        attempts,
                        "sale recorded"
                    );
                    return Ok(recorded);
                }
                Err(StoreError::Conflict {
                    entry_id,
                    expected,
                    found,
                }) => {
                    tracing::warn!(
                        %entry_id,
                        expected,
                        found,
                        attempts,
                        "concurrent update on lot; re-reading"
                    );
                    if attempts > self.config.max_conflict_retries {
                        return Err(ServiceError::ConflictRetriesExhausted { attempts });
                    }
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Project a sale at `assumed_unit_price` without touching storage.
    #[instrument(skip(self), fields(tenant_id = %tenant_id, item_id = %item_id))]
    pub fn simulate_sale(
        &self,
        tenant_id: TenantId,
        item_id: ItemId,
        quantity: u64,
        assumed_unit_price: Amount,
    ) -> Result<SimulationResult, ServiceError> {
        let ledger = self.load_ledger(tenant_id, item_id)?;
        let result = self
            .calculator
            .simulate(&ledger, quantity, assumed_unit_price)?;
        if let Some(cap) = &result.capped {
            tracing::debug!(
                requested = cap.requested,
                available = cap.available,
                "simulation capped at available stock"
            );
        }
        Ok(result)
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id))]
    pub fn low_stock_report(&self, tenant_id: TenantId) -> Result<LowStockReport, ServiceError> {
        let items = self.lots.list_items(tenant_id)?;
        let ledgers = self.load_ledgers(tenant_id)?;
        let thresholds = self.settings.thresholds(tenant_id)?;

        Ok(LowStockReport {
            alerts: self.detector.evaluate(&items, &ledgers, &thresholds),
            out_of_stock: self.detector.out_of_stock(&items, &ledgers),
        })
    }

    #[instrument(skip(self, window), fields(tenant_id = %tenant_id))]
    pub fn profit_report(
        &self,
        tenant_id: TenantId,
        window: &ReportWindow,
    ) -> Result<ProfitReport, ServiceError> {
        let sales = self.lots.list_sales(tenant_id)?;
        let lots = self.lots.list_lots(tenant_id)?;
        let report =
            self.calculator
                .aggregate(&sales, &lots, window, &self.config.report_options())?;

        if !report.unmatched_sales.is_empty() {
            tracing::warn!(
                count = report.unmatched_sales.len(),
                "sales without a matching lot; counted as revenue only"
            );
        }
        Ok(report)
    }

    /// Human-facing breakdown in the configured display mode.
    pub fn display(&self, amount: &Amount) -> Result<String, ServiceError> {
        Ok(self
            .calculator
            .converter()
            .format(amount, self.config.display_mode)?)
    }

    fn load_ledger(&self, tenant_id: TenantId, item_id: ItemId) -> Result<LotLedger, ServiceError> {
        let rows = self.lots.load_lots(tenant_id, item_id)?;
        Ok(LotLedger::new(tenant_id, item_id, rows)?)
    }

    fn load_ledgers(&self, tenant_id: TenantId) -> Result<HashMap<ItemId, LotLedger>, ServiceError> {
        let mut grouped: HashMap<ItemId, Vec<InventoryEntry>> = HashMap::new();
        for lot in self.lots.list_lots(tenant_id)? {
            grouped.entry(lot.item_id).or_default().push(lot);
        }

        grouped
            .into_iter()
            .map(|(item_id, rows)| -> Result<_, ServiceError> {
                Ok((item_id, LotLedger::new(tenant_id, item_id, rows)?))
            })
            .collect()
    }

    fn recorded(
        &self,
        cmd: &NewSale,
        sales: Vec<Sale>,
        consumption: &Consumption,
        attempts: u32,
    ) -> Result<RecordedSale, ServiceError> {
        let cogs = consumption.total_cost_in(self.calculator.converter(), cmd.amount_gained.unit)?;
        let profit = self
            .calculator
            .profit_against(&cmd.amount_gained, &consumption.contributions)?;
        Ok(RecordedSale {
            sales,
            cogs,
            profit,
            remaining_after: consumption.remaining_after,
            attempts,
        })
    }
}
