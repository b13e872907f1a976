//! Tenant-isolated persistence seams for lots, sales and settings.

pub mod lot_store;
pub mod settings_store;

pub use lot_store::{InMemoryLotStore, LotStore};
pub use settings_store::{InMemorySettingsStore, SettingsStore};

use locktrack_core::{EntryId, TenantId};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A conditional update found the row changed since it was read.
    #[error("lot {entry_id} changed concurrently: expected {expected} remaining, found {found}")]
    Conflict {
        entry_id: EntryId,
        expected: u64,
        found: u64,
    },

    #[error("lot {0} not found")]
    NotFound(EntryId),

    #[error("duplicate lot {0}")]
    Duplicate(EntryId),

    /// A row addressed to another tenant was handed to a tenant-scoped call.
    #[error("tenant isolation violation: expected {expected}")]
    TenantIsolation { expected: TenantId },

    #[error("store lock poisoned")]
    Poisoned,
}
