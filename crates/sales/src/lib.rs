//! Sales and profit.
//!
//! Sale records, realized profit from lot cost basis, per-period/per-item
//! rollups and sale simulation. Pure domain logic: no IO, no storage.

pub mod profit;
pub mod report;
pub mod sale;

pub use profit::{ProfitCalculator, ProfitError, SimulationResult};
pub use report::{Granularity, ProfitReport, ReportOptions, ReportWindow, Rollup};
pub use sale::{NewSale, Sale, allocate_sales};
