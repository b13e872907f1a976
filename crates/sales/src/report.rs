//! Period and item rollups for reporting consumers.
//!
//! Totals are kept per currency unit and never folded into one number; the
//! charting and export layers rely on that.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Offset, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use locktrack_core::{Amount, CurrencyError, CurrencyUnit, EntryId, ItemId, SaleId};
use locktrack_inventory::InventoryEntry;

use crate::profit::{ProfitCalculator, ProfitError};
use crate::sale::Sale;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    #[default]
    Day,
    Month,
}

/// Half-open time window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ReportWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Everything ever recorded.
    pub fn all_time() -> Self {
        Self {
            start: DateTime::<Utc>::MIN_UTC,
            end: DateTime::<Utc>::MAX_UTC,
        }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at < self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReportOptions {
    pub granularity: Granularity,
    /// Offset east of UTC in which calendar days/months are cut.
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

impl ReportOptions {
    /// The configured offset; out-of-range values fall back to UTC.
    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes.saturating_mul(60)).unwrap_or(Utc.fix())
    }
}

/// Revenue and profit for one group, per currency unit.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rollup {
    pub revenue: BTreeMap<CurrencyUnit, Decimal>,
    pub profit: BTreeMap<CurrencyUnit, Decimal>,
    pub quantity_sold: u64,
    pub sale_count: usize,
}

impl Rollup {
    fn add_revenue(&mut self, sale: &Sale) -> Result<(), CurrencyError> {
        add_to(&mut self.revenue, &sale.revenue())?;
        self.quantity_sold = self.quantity_sold.saturating_add(sale.quantity_sold);
        self.sale_count += 1;
        Ok(())
    }

    fn add_profit(&mut self, profit: &Amount) -> Result<(), CurrencyError> {
        add_to(&mut self.profit, profit)
    }

    pub fn revenue_in(&self, unit: CurrencyUnit) -> Decimal {
        self.revenue.get(&unit).copied().unwrap_or(Decimal::ZERO)
    }

    pub fn profit_in(&self, unit: CurrencyUnit) -> Decimal {
        self.profit.get(&unit).copied().unwrap_or(Decimal::ZERO)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfitReport {
    pub window: ReportWindow,
    pub granularity: Granularity,
    /// Keyed by the first calendar day of each period.
    pub by_period: BTreeMap<NaiveDate, Rollup>,
    pub by_item: BTreeMap<ItemId, Rollup>,
    pub totals: Rollup,
    /// Sales whose lot was not supplied or did not match; revenue only.
    pub unmatched_sales: Vec<SaleId>,
}

fn add_to(totals: &mut BTreeMap<CurrencyUnit, Decimal>, amount: &Amount) -> Result<(), CurrencyError> {
    let total = totals.entry(amount.unit).or_insert(Decimal::ZERO);
    *total = total
        .checked_add(amount.value)
        .ok_or(CurrencyError::OutOfRange(amount.value))?;
    Ok(())
}

fn period_start(at: DateTime<Utc>, options: &ReportOptions) -> NaiveDate {
    let local = at.with_timezone(&options.offset()).date_naive();
    match options.granularity {
        Granularity::Day => local,
        Granularity::Month => local.with_day(1).unwrap_or(local),
    }
}

pub(crate) fn aggregate(
    calc: &ProfitCalculator,
    sales: &[Sale],
    lots: &[InventoryEntry],
    window: &ReportWindow,
    options: &ReportOptions,
) -> Result<ProfitReport, ProfitError> {
    let lots: HashMap<EntryId, &InventoryEntry> = lots.iter().map(|l| (l.id, l)).collect();

    let mut report = ProfitReport {
        window: *window,
        granularity: options.granularity,
        by_period: BTreeMap::new(),
        by_item: BTreeMap::new(),
        totals: Rollup::default(),
        unmatched_sales: Vec::new(),
    };

    for sale in sales.iter().filter(|s| window.contains(s.sold_at)) {
        let period = report
            .by_period
            .entry(period_start(sale.sold_at, options))
            .or_default();
        let item = report.by_item.entry(sale.item_id).or_default();

        period.add_revenue(sale)?;
        item.add_revenue(sale)?;
        report.totals.add_revenue(sale)?;

        let profit = match lots.get(&sale.entry_id) {
            Some(lot) => match calc.realized_profit(sale, lot) {
                Ok(profit) => Some(profit),
                Err(ProfitError::LotMismatch(_)) => None,
                Err(err) => return Err(err),
            },
            None => None,
        };

        match profit {
            Some(profit) => {
                period.add_profit(&profit)?;
                item.add_profit(&profit)?;
                report.totals.add_profit(&profit)?;
            }
            None => report.unmatched_sales.push(sale.id),
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use locktrack_core::TenantId;
    use locktrack_inventory::NewPurchase;
    use rust_decimal_macros::dec;

    fn at(m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, m, d, h, 0, 0).unwrap()
    }

    fn lot(tenant_id: TenantId, item_id: ItemId, unit_cost: Amount) -> InventoryEntry {
        InventoryEntry::purchase(
            EntryId::new(),
            NewPurchase {
                tenant_id,
                item_id,
                item_name: "Item".to_string(),
                category: None,
                quantity: 100,
                unit_cost,
                bought_at: at(1, 1, 0),
                notes: None,
            },
        )
        .unwrap()
    }

    fn sale(lot: &InventoryEntry, qty: u64, revenue: Amount, sold_at: DateTime<Utc>) -> Sale {
        Sale {
            id: SaleId::new(),
            tenant_id: lot.tenant_id,
            entry_id: lot.id,
            item_id: lot.item_id,
            quantity_sold: qty,
            amount_gained: revenue.value,
            unit: revenue.unit,
            sold_at,
            notes: None,
        }
    }

    fn wl(v: Decimal) -> Amount {
        Amount::new(v, CurrencyUnit::WorldLock)
    }

    fn dl(v: Decimal) -> Amount {
        Amount::new(v, CurrencyUnit::DiamondLock)
    }

    #[test]
    fn groups_by_day_and_item_and_keeps_units_apart() {
        let tenant_id = TenantId::new();
        let sword = ItemId::new();
        let shield = ItemId::new();
        let sword_lot = lot(tenant_id, sword, wl(dec!(5)));
        let shield_lot = lot(tenant_id, shield, dl(dec!(1)));

        let sales = vec![
            sale(&sword_lot, 2, wl(dec!(20)), at(3, 1, 10)),
            sale(&sword_lot, 1, wl(dec!(9)), at(3, 1, 18)),
            sale(&shield_lot, 1, dl(dec!(3)), at(3, 2, 10)),
        ];

        let report = ProfitCalculator::default().aggregate(
            &sales,
            &[sword_lot.clone(), shield_lot.clone()],
            &ReportWindow::all_time(),
            &ReportOptions::default(),
        )
        .unwrap();

        assert_eq!(report.by_period.len(), 2);
        let day1 = &report.by_period[&NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()];
        assert_eq!(day1.revenue_in(CurrencyUnit::WorldLock), dec!(29));
        assert_eq!(day1.profit_in(CurrencyUnit::WorldLock), dec!(14));
        assert_eq!(day1.sale_count, 2);
        assert_eq!(day1.quantity_sold, 3);

        let shield_roll = &report.by_item[&shield];
        assert_eq!(shield_roll.profit_in(CurrencyUnit::DiamondLock), dec!(2));
        assert!(shield_roll.revenue.get(&CurrencyUnit::WorldLock).is_none());

        // never coerced into one figure
        assert_eq!(report.totals.revenue.len(), 2);
        assert_eq!(report.totals.revenue_in(CurrencyUnit::WorldLock), dec!(29));
        assert_eq!(report.totals.revenue_in(CurrencyUnit::DiamondLock), dec!(3));
        assert!(report.unmatched_sales.is_empty());
    }

    #[test]
    fn month_granularity_and_window_filtering() {
        let tenant_id = TenantId::new();
        let item = ItemId::new();
        let l = lot(tenant_id, item, wl(dec!(1)));
        let sales = vec![
            sale(&l, 1, wl(dec!(2)), at(2, 28, 12)),
            sale(&l, 1, wl(dec!(2)), at(3, 1, 12)),
            sale(&l, 1, wl(dec!(2)), at(3, 31, 12)),
            sale(&l, 1, wl(dec!(2)), at(4, 1, 12)),
        ];
        let window = ReportWindow::new(at(3, 1, 0), at(4, 1, 0));
        let options = ReportOptions {
            granularity: Granularity::Month,
            ..ReportOptions::default()
        };

        let report = ProfitCalculator::default().aggregate(&sales, &[l], &window, &options)
            .unwrap();

        assert_eq!(report.by_period.len(), 1);
        let march = &report.by_period[&NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()];
        assert_eq!(march.sale_count, 2);
        assert_eq!(march.profit_in(CurrencyUnit::WorldLock), dec!(2));
    }

    #[test]
    fn periods_are_cut_in_the_configured_offset() {
        let tenant_id = TenantId::new();
        let item = ItemId::new();
        let l = lot(tenant_id, item, wl(dec!(1)));
        // 23:00 UTC on the 1st is already the 2nd at UTC+2
        let sales = vec![sale(&l, 1, wl(dec!(2)), at(3, 1, 23))];
        let options = ReportOptions {
            granularity: Granularity::Day,
            utc_offset_minutes: 120,
        };

        let report = ProfitCalculator::default().aggregate(
            &sales,
            &[l],
            &ReportWindow::all_time(),
            &options,
        )
        .unwrap();
        assert!(report
            .by_period
            .contains_key(&NaiveDate::from_ymd_opt(2024, 3, 2).unwrap()));
    }

    #[test]
    fn sales_without_their_lot_count_revenue_only() {
        let tenant_id = TenantId::new();
        let item = ItemId::new();
        let known = lot(tenant_id, item, wl(dec!(1)));
        let unknown = lot(tenant_id, item, wl(dec!(1)));
        let orphan = sale(&unknown, 1, wl(dec!(4)), at(3, 1, 12));
        let sales = vec![sale(&known, 1, wl(dec!(4)), at(3, 1, 12)), orphan.clone()];

        let report = ProfitCalculator::default().aggregate(
            &sales,
            &[known],
            &ReportWindow::all_time(),
            &ReportOptions::default(),
        )
        .unwrap();

        assert_eq!(report.unmatched_sales, vec![orphan.id]);
        assert_eq!(report.totals.revenue_in(CurrencyUnit::WorldLock), dec!(8));
        assert_eq!(report.totals.profit_in(CurrencyUnit::WorldLock), dec!(3));
    }

    #[test]
    fn totals_past_decimal_range_are_errors() {
        let tenant_id = TenantId::new();
        let item = ItemId::new();
        let l = lot(tenant_id, item, wl(dec!(1)));
        let big = wl(Decimal::MAX - dec!(1));
        let sales = vec![
            sale(&l, 1, big, at(3, 1, 12)),
            sale(&l, 1, big, at(3, 1, 13)),
        ];

        let err = ProfitCalculator::default()
            .aggregate(
                &sales,
                &[l],
                &ReportWindow::new(at(3, 1, 0), at(4, 1, 0)),
                &ReportOptions::default(),
            )
            .unwrap_err();
        assert!(matches!(err, ProfitError::Currency(CurrencyError::OutOfRange(_))));
    }

    #[test]
    fn report_serializes_unit_keyed_maps() {
        let tenant_id = TenantId::new();
        let item = ItemId::new();
        let l = lot(tenant_id, item, wl(dec!(1)));
        let sales = vec![sale(&l, 1, wl(dec!(2)), at(3, 1, 12))];
        let report = ProfitCalculator::default().aggregate(
            &sales,
            &[l],
            &ReportWindow::new(at(3, 1, 0), at(4, 1, 0)),
            &ReportOptions::default(),
        )
        .unwrap();

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["totals"]["revenue"]["WL"], serde_json::json!("2"));
        assert!(json["by_period"].get("2024-03-01").is_some());
    }
}
