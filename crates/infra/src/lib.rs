//! Infrastructure layer: storage seams, configuration and the sale service.

pub mod config;
pub mod service;
pub mod store;

pub use config::{ConfigError, EngineConfig};
pub use service::{LowStockReport, RecordedSale, SaleService, ServiceError};
pub use store::{
    InMemoryLotStore, InMemorySettingsStore, LotStore, SettingsStore, StoreError,
};
