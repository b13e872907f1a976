//! `locktrack-core`: shared domain building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, the domain error model and the three-tier currency model.

pub mod currency;
pub mod entity;
pub mod error;
pub mod id;
pub mod value_object;

pub use currency::{
    Amount, Breakdown, CurrencyError, CurrencyUnit, DenominationConverter, DisplayMode,
    RoundingPolicy,
};
pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{EntryId, ItemId, SaleId, TenantId};
pub use value_object::ValueObject;
