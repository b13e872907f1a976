//! Three-tier lock currency: units, amounts and denomination conversion.
//!
//! Every tier is a fixed integer multiple of the smallest one (World Lock).
//! The multipliers live in [`CurrencyUnit::multiplier`] and nowhere else.

use core::fmt;
use core::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::value_object::ValueObject;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CurrencyError {
    /// A unit string did not name one of the three tiers.
    #[error("invalid currency unit: {0:?}")]
    InvalidUnit(String),

    /// A base amount is too large to decompose into tier counts.
    #[error("amount {0} is out of range for a denomination breakdown")]
    OutOfRange(Decimal),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("invalid display setting: {0}")]
    InvalidSetting(String),
}

/// Currency tier, ordered smallest to largest.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum CurrencyUnit {
    /// Tier 1, the base unit.
    WorldLock,
    /// Tier 2: 100 World Locks.
    DiamondLock,
    /// Tier 3: 100 Diamond Locks.
    BlueGemLock,
}

impl CurrencyUnit {
    /// All tiers, smallest first.
    pub const ALL: [CurrencyUnit; 3] = [
        CurrencyUnit::WorldLock,
        CurrencyUnit::DiamondLock,
        CurrencyUnit::BlueGemLock,
    ];

    /// The base (smallest) tier.
    pub const BASE: CurrencyUnit = CurrencyUnit::WorldLock;

    /// Number of base units in one unit of this tier.
    pub const fn multiplier(self) -> u64 {
        match self {
            CurrencyUnit::WorldLock => 1,
            CurrencyUnit::DiamondLock => 100,
            CurrencyUnit::BlueGemLock => 10_000,
        }
    }

    pub const fn code(self) -> &'static str {
        match self {
            CurrencyUnit::WorldLock => "WL",
            CurrencyUnit::DiamondLock => "DL",
            CurrencyUnit::BlueGemLock => "BGL",
        }
    }

    /// 1-based tier number.
    pub const fn tier(self) -> u8 {
        match self {
            CurrencyUnit::WorldLock => 1,
            CurrencyUnit::DiamondLock => 2,
            CurrencyUnit::BlueGemLock => 3,
        }
    }
}

impl fmt::Display for CurrencyUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for CurrencyUnit {
    type Err = CurrencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .flat_map(char::to_lowercase)
            .collect();

        match normalized.as_str() {
            "wl" | "worldlock" => Ok(CurrencyUnit::WorldLock),
            "dl" | "diamondlock" => Ok(CurrencyUnit::DiamondLock),
            "bgl" | "bluegemlock" => Ok(CurrencyUnit::BlueGemLock),
            _ => Err(CurrencyError::InvalidUnit(s.to_string())),
        }
    }
}

impl From<CurrencyUnit> for String {
    fn from(value: CurrencyUnit) -> Self {
        value.code().to_string()
    }
}

impl TryFrom<String> for CurrencyUnit {
    type Error = CurrencyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Breakdown display mode: how many tiers a human-facing figure uses.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayMode {
    /// Diamond Locks and World Locks only.
    TwoTier,
    /// Blue Gem Locks, Diamond Locks and World Locks.
    #[default]
    ThreeTier,
}

impl DisplayMode {
    pub const fn max_tier(self) -> CurrencyUnit {
        match self {
            DisplayMode::TwoTier => CurrencyUnit::DiamondLock,
            DisplayMode::ThreeTier => CurrencyUnit::BlueGemLock,
        }
    }
}

impl FromStr for DisplayMode {
    type Err = CurrencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "two_tier" | "two" | "2" => Ok(DisplayMode::TwoTier),
            "three_tier" | "three" | "3" => Ok(DisplayMode::ThreeTier),
            other => Err(CurrencyError::InvalidSetting(format!("unknown display mode {other:?}"))),
        }
    }
}

/// How a fractional base-unit remainder is resolved when breaking an amount down.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundingPolicy {
    /// Round half away from zero.
    #[default]
    Nearest,
    /// Drop the fraction; a breakdown never overstates value.
    Floor,
}

impl FromStr for RoundingPolicy {
    type Err = CurrencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "nearest" | "round" => Ok(RoundingPolicy::Nearest),
            "floor" | "truncate" => Ok(RoundingPolicy::Floor),
            other => Err(CurrencyError::InvalidSetting(format!("unknown rounding policy {other:?}"))),
        }
    }
}

/// A quantity of currency in a single tier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Amount {
    #[serde(with = "rust_decimal::serde::str")]
    pub value: Decimal,
    pub unit: CurrencyUnit,
}

impl ValueObject for Amount {}

impl Amount {
    pub fn new(value: Decimal, unit: CurrencyUnit) -> Self {
        Self { value, unit }
    }

    pub fn zero(unit: CurrencyUnit) -> Self {
        Self::new(Decimal::ZERO, unit)
    }

    /// Value expressed in base units (World Locks).
    pub fn to_base(&self) -> Result<Decimal, CurrencyError> {
        self.value
            .checked_mul(Decimal::from(self.unit.multiplier()))
            .ok_or(CurrencyError::OutOfRange(self.value))
    }

    /// Same value restated in another tier. Exact: no rounding is applied.
    pub fn convert_to(&self, unit: CurrencyUnit) -> Result<Amount, CurrencyError> {
        if unit == self.unit {
            return Ok(*self);
        }
        Ok(Amount::new(
            self.to_base()? / Decimal::from(unit.multiplier()),
            unit,
        ))
    }

    pub fn is_negative(&self) -> bool {
        self.value.is_sign_negative() && !self.value.is_zero()
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value.normalize(), self.unit)
    }
}

impl FromStr for Amount {
    type Err = CurrencyError;

    /// Parses `"<number> <unit>"`, e.g. `"12.5 DL"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let (Some(number), Some(unit), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(CurrencyError::InvalidAmount(s.to_string()));
        };
        let value = Decimal::from_str(number)
            .map_err(|e| CurrencyError::InvalidAmount(format!("{number:?}: {e}")))?;
        Ok(Amount::new(value, unit.parse()?))
    }
}

/// Greedy, largest-tier-first decomposition of a base amount.
///
/// Holds magnitudes only; a negative input is broken down on its absolute
/// value and the caller decides how to show the sign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breakdown {
    parts: Vec<(CurrencyUnit, u64)>,
}

impl ValueObject for Breakdown {}

impl Breakdown {
    /// `(tier, quantity)` pairs, largest tier first.
    pub fn parts(&self) -> &[(CurrencyUnit, u64)] {
        &self.parts
    }

    pub fn quantity_of(&self, unit: CurrencyUnit) -> Option<u64> {
        self.parts.iter().find(|(u, _)| *u == unit).map(|(_, q)| *q)
    }

    /// Reconstitute the base amount this breakdown represents.
    pub fn to_base(&self) -> u128 {
        self.parts
            .iter()
            .map(|(unit, qty)| u128::from(*qty) * u128::from(unit.multiplier()))
            .sum()
    }

    /// Render with a leading minus sign when `negative` is set.
    pub fn format_signed(&self, negative: bool) -> String {
        if negative && self.to_base() != 0 {
            format!("-{self}")
        } else {
            self.to_string()
        }
    }
}

impl fmt::Display for Breakdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (unit, qty)) in self.parts.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{qty} {unit}")?;
        }
        Ok(())
    }
}

/// Converts between tiers and base units, and decomposes base amounts.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct DenominationConverter {
    rounding: RoundingPolicy,
}

impl DenominationConverter {
    pub fn new(rounding: RoundingPolicy) -> Self {
        Self { rounding }
    }

    pub fn rounding(&self) -> RoundingPolicy {
        self.rounding
    }

    pub fn to_base_units(&self, amount: Decimal, unit: CurrencyUnit) -> Result<Decimal, CurrencyError> {
        Amount::new(amount, unit).to_base()
    }

    /// String-typed form used at storage/settings boundaries.
    pub fn to_base_units_str(&self, amount: Decimal, unit: &str) -> Result<Decimal, CurrencyError> {
        let unit: CurrencyUnit = unit.parse()?;
        self.to_base_units(amount, unit)
    }

    pub fn from_base_units(&self, base: Decimal, unit: CurrencyUnit) -> Decimal {
        base / Decimal::from(unit.multiplier())
    }

    /// Sum amounts of mixed tiers into `target`, going through base units.
    pub fn sum_in<'a>(
        &self,
        amounts: impl IntoIterator<Item = &'a Amount>,
        target: CurrencyUnit,
    ) -> Result<Amount, CurrencyError> {
        let mut base = Decimal::ZERO;
        for amount in amounts {
            base = base
                .checked_add(amount.to_base()?)
                .ok_or(CurrencyError::OutOfRange(amount.value))?;
        }
        Ok(Amount::new(self.from_base_units(base, target), target))
    }

    /// Resolve the sub-unit fraction of a non-negative base amount.
    fn settle(&self, base: Decimal) -> Decimal {
        match self.rounding {
            RoundingPolicy::Nearest => {
                base.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            }
            RoundingPolicy::Floor => base.floor(),
        }
    }

    /// Decompose `base_amount` from `max_tier` down to World Locks.
    ///
    /// Zero tiers above the largest non-zero tier are omitted; a zero amount
    /// yields a single `0 WL` part.
    pub fn to_breakdown(
        &self,
        base_amount: Decimal,
        max_tier: CurrencyUnit,
    ) -> Result<Breakdown, CurrencyError> {
        let settled = self.settle(base_amount.abs());
        let mut rest = settled
            .to_u64()
            .ok_or(CurrencyError::OutOfRange(base_amount))?;

        let mut parts = Vec::with_capacity(3);
        for unit in CurrencyUnit::ALL.iter().rev().filter(|u| **u <= max_tier) {
            let divisor = unit.multiplier();
            let qty = rest / divisor;
            rest %= divisor;
            if qty == 0 && parts.is_empty() && *unit != CurrencyUnit::BASE {
                continue;
            }
            parts.push((*unit, qty));
        }

        Ok(Breakdown { parts })
    }

    pub fn breakdown(&self, amount: &Amount, mode: DisplayMode) -> Result<Breakdown, CurrencyError> {
        self.to_breakdown(amount.to_base()?, mode.max_tier())
    }

    /// Human-facing rendering of an amount, sign included.
    pub fn format(&self, amount: &Amount, mode: DisplayMode) -> Result<String, CurrencyError> {
        Ok(self.breakdown(amount, mode)?.format_signed(amount.is_negative()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn converter() -> DenominationConverter {
        DenominationConverter::default()
    }

    #[test]
    fn multipliers_are_nested_hundreds() {
        assert_eq!(CurrencyUnit::WorldLock.multiplier(), 1);
        assert_eq!(CurrencyUnit::DiamondLock.multiplier(), 100);
        assert_eq!(CurrencyUnit::BlueGemLock.multiplier(), 100 * 100);
        assert!(CurrencyUnit::WorldLock < CurrencyUnit::DiamondLock);
        assert!(CurrencyUnit::DiamondLock < CurrencyUnit::BlueGemLock);
    }

    #[test]
    fn to_base_units_multiplies_by_tier() {
        let c = converter();
        assert_eq!(c.to_base_units(dec!(3), CurrencyUnit::DiamondLock), Ok(dec!(300)));
        assert_eq!(c.to_base_units(dec!(1.5), CurrencyUnit::BlueGemLock), Ok(dec!(15000)));
        assert_eq!(c.to_base_units(dec!(7), CurrencyUnit::WorldLock), Ok(dec!(7)));
    }

    #[test]
    fn base_conversion_past_decimal_range_is_an_error() {
        let c = converter();
        assert_eq!(
            c.to_base_units(Decimal::MAX, CurrencyUnit::DiamondLock),
            Err(CurrencyError::OutOfRange(Decimal::MAX))
        );
        assert_eq!(c.to_base_units(Decimal::MAX, CurrencyUnit::WorldLock), Ok(Decimal::MAX));

        let huge = Amount::new(dec!(1e25), CurrencyUnit::BlueGemLock);
        assert!(matches!(
            c.format(&huge, DisplayMode::ThreeTier),
            Err(CurrencyError::OutOfRange(_))
        ));
        assert!(matches!(
            huge.convert_to(CurrencyUnit::WorldLock),
            Err(CurrencyError::OutOfRange(_))
        ));
    }

    #[test]
    fn sum_past_decimal_range_is_an_error() {
        let c = converter();
        let big = Amount::new(Decimal::MAX, CurrencyUnit::WorldLock);
        assert!(matches!(
            c.sum_in(&[big, big], CurrencyUnit::WorldLock),
            Err(CurrencyError::OutOfRange(_))
        ));
    }

    #[test]
    fn unknown_unit_string_is_rejected() {
        let err = converter().to_base_units_str(dec!(1), "gold").unwrap_err();
        assert_eq!(err, CurrencyError::InvalidUnit("gold".to_string()));
    }

    #[test]
    fn unit_parsing_accepts_codes_and_names() {
        assert_eq!("wl".parse::<CurrencyUnit>().unwrap(), CurrencyUnit::WorldLock);
        assert_eq!("Diamond Lock".parse::<CurrencyUnit>().unwrap(), CurrencyUnit::DiamondLock);
        assert_eq!("blue_gem_lock".parse::<CurrencyUnit>().unwrap(), CurrencyUnit::BlueGemLock);
        assert!("".parse::<CurrencyUnit>().is_err());
    }

    #[test]
    fn unit_serde_uses_codes_and_rejects_unknowns() {
        let json = serde_json::to_string(&CurrencyUnit::BlueGemLock).unwrap();
        assert_eq!(json, "\"BGL\"");
        let back: CurrencyUnit = serde_json::from_str("\"dl\"").unwrap();
        assert_eq!(back, CurrencyUnit::DiamondLock);
        assert!(serde_json::from_str::<CurrencyUnit>("\"euro\"").is_err());
    }

    #[test]
    fn breakdown_keeps_interior_zero_tiers() {
        let b = converter()
            .to_breakdown(dec!(10050), CurrencyUnit::BlueGemLock)
            .unwrap();
        assert_eq!(
            b.parts(),
            &[
                (CurrencyUnit::BlueGemLock, 1),
                (CurrencyUnit::DiamondLock, 0),
                (CurrencyUnit::WorldLock, 50),
            ]
        );
        assert_eq!(b.to_string(), "1 BGL 0 DL 50 WL");
    }

    #[test]
    fn breakdown_omits_leading_zero_tiers() {
        let b = converter()
            .to_breakdown(dec!(250), CurrencyUnit::BlueGemLock)
            .unwrap();
        assert_eq!(
            b.parts(),
            &[(CurrencyUnit::DiamondLock, 2), (CurrencyUnit::WorldLock, 50)]
        );
    }

    #[test]
    fn two_tier_mode_folds_largest_tier_into_diamond_locks() {
        let c = converter();
        let b = c.to_breakdown(dec!(10050), DisplayMode::TwoTier.max_tier()).unwrap();
        assert_eq!(
            b.parts(),
            &[(CurrencyUnit::DiamondLock, 100), (CurrencyUnit::WorldLock, 50)]
        );
    }

    #[test]
    fn zero_amount_emits_smallest_tier() {
        let b = converter()
            .to_breakdown(Decimal::ZERO, CurrencyUnit::BlueGemLock)
            .unwrap();
        assert_eq!(b.parts(), &[(CurrencyUnit::WorldLock, 0)]);
    }

    #[test]
    fn negative_amounts_decompose_on_magnitude() {
        let c = converter();
        let b = c.to_breakdown(dec!(-150), CurrencyUnit::BlueGemLock).unwrap();
        assert_eq!(
            b.parts(),
            &[(CurrencyUnit::DiamondLock, 1), (CurrencyUnit::WorldLock, 50)]
        );
        assert_eq!(b.format_signed(true), "-1 DL 50 WL");

        let loss = Amount::new(dec!(-1.5), CurrencyUnit::DiamondLock);
        assert_eq!(c.format(&loss, DisplayMode::ThreeTier).unwrap(), "-1 DL 50 WL");
    }

    #[test]
    fn fractional_remainder_rounds_to_nearest_by_default() {
        let c = converter();
        let up = c.to_breakdown(dec!(149.5), CurrencyUnit::BlueGemLock).unwrap();
        assert_eq!(up.quantity_of(CurrencyUnit::WorldLock), Some(50));
        let down = c.to_breakdown(dec!(149.4), CurrencyUnit::BlueGemLock).unwrap();
        assert_eq!(down.quantity_of(CurrencyUnit::WorldLock), Some(49));
    }

    #[test]
    fn floor_policy_never_overstates() {
        let c = DenominationConverter::new(RoundingPolicy::Floor);
        let b = c.to_breakdown(dec!(149.9), CurrencyUnit::BlueGemLock).unwrap();
        assert_eq!(b.to_base(), 149);
    }

    #[test]
    fn amount_conversion_goes_through_base_units() {
        let a = Amount::new(dec!(250), CurrencyUnit::WorldLock);
        assert_eq!(a.convert_to(CurrencyUnit::DiamondLock).unwrap().value, dec!(2.5));

        let c = converter();
        let total = c.sum_in(
            &[
                Amount::new(dec!(1), CurrencyUnit::BlueGemLock),
                Amount::new(dec!(3), CurrencyUnit::DiamondLock),
                Amount::new(dec!(7), CurrencyUnit::WorldLock),
            ],
            CurrencyUnit::DiamondLock,
        )
        .unwrap();
        assert_eq!(total, Amount::new(dec!(103.07), CurrencyUnit::DiamondLock));
    }

    #[test]
    fn amount_parses_number_and_unit() {
        let a: Amount = "12.5 dl".parse().unwrap();
        assert_eq!(a, Amount::new(dec!(12.5), CurrencyUnit::DiamondLock));
        assert!("12.5".parse::<Amount>().is_err());
        assert!(matches!(
            "3 coins".parse::<Amount>(),
            Err(CurrencyError::InvalidUnit(_))
        ));
        assert_eq!(a.to_string(), "12.5 DL");
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: breaking a non-negative integer down and converting every
        /// part back to base units reproduces the input exactly.
        #[test]
        fn breakdown_round_trips_through_base_units(
            base in 0u64..10_000_000_000u64,
            three_tier in any::<bool>(),
        ) {
            let c = converter();
            let mode = if three_tier { DisplayMode::ThreeTier } else { DisplayMode::TwoTier };
            let b = c.to_breakdown(Decimal::from(base), mode.max_tier()).unwrap();

            let rebuilt: Decimal = b
                .parts()
                .iter()
                .map(|(unit, qty)| c.to_base_units(Decimal::from(*qty), *unit).unwrap())
                .sum();
            prop_assert_eq!(rebuilt, Decimal::from(base));
        }
    }
}
