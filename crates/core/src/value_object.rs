//! Value object trait: equality by value, not identity.
//!
//! Amounts, cost contributions and breakdowns have **no identity**. Two of
//! them with the same values are interchangeable.

/// Marker trait for value objects.
///
/// ## Value Object vs Entity
///
/// - **Value Object**: no identity (`Amount { value: 5, unit: WL }` equals any other 5 WL)
/// - **Entity**: has identity (two lots with identical figures are still two lots)
///
/// ## Usage Pattern
///
/// ```
/// use locktrack_core::{Amount, CurrencyUnit, ValueObject};
/// use rust_decimal::Decimal;
///
/// fn assert_value_object<T: ValueObject>(_: &T) {}
///
/// let a = Amount::new(Decimal::from(5), CurrencyUnit::WorldLock);
/// let b = Amount::new(Decimal::from(5), CurrencyUnit::WorldLock);
/// assert_value_object(&a);
/// assert_eq!(a, b);
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
