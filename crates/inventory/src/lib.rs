//! Inventory lot costing.
//!
//! This crate contains the lot model, the FIFO ledger view of one item's lots,
//! the costing engine that consumes from it and the low-stock detector,
//! implemented purely as deterministic domain logic (no IO, no storage).

pub mod costing;
pub mod ledger;
pub mod lot;
pub mod low_stock;

pub use costing::{
    ConsumeMode, Consumption, CostContribution, CostingEngine, CostingError, SimulationCapped,
};
pub use ledger::LotLedger;
pub use lot::{InventoryEntry, LotStatus, LotUpdate, NewPurchase};
pub use low_stock::{LowStockAlert, LowStockDetector, StockThresholds};
