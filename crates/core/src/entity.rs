//! Entity trait: identity + continuity across state changes.
//!
//! Lots keep their identity while `remaining_qty` moves; sales keep theirs for
//! the lifetime of the tenant's history.

/// Entity marker + minimal interface.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
