use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use locktrack_core::{EntryId, ItemId, TenantId};
use locktrack_inventory::{InventoryEntry, LotUpdate};
use locktrack_sales::Sale;

use super::StoreError;

/// Storage for purchase lots and recorded sales.
///
/// `commit_sale` is the concurrency boundary: it applies every update only if
/// each lot still holds `previous_remaining`, and writes nothing otherwise.
pub trait LotStore: Send + Sync {
    /// All lots of one item, in no particular order.
    fn load_lots(&self, tenant_id: TenantId, item_id: ItemId)
    -> Result<Vec<InventoryEntry>, StoreError>;

    fn list_lots(&self, tenant_id: TenantId) -> Result<Vec<InventoryEntry>, StoreError>;

    /// Distinct items that have at least one lot, ordered by id.
    fn list_items(&self, tenant_id: TenantId) -> Result<Vec<ItemId>, StoreError>;

    fn insert_lot(&self, entry: InventoryEntry) -> Result<(), StoreError>;

    fn commit_sale(
        &self,
        tenant_id: TenantId,
        sales: &[Sale],
        updates: &[LotUpdate],
    ) -> Result<(), StoreError>;

    /// Recorded sales in commit order.
    fn list_sales(&self, tenant_id: TenantId) -> Result<Vec<Sale>, StoreError>;
}

impl<S> LotStore for Arc<S>
where
    S: LotStore + ?Sized,
{
    fn load_lots(
        &self,
        tenant_id: TenantId,
        item_id: ItemId,
    ) -> Result<Vec<InventoryEntry>, StoreError> {
        (**self).load_lots(tenant_id, item_id)
    }

    fn list_lots(&self, tenant_id: TenantId) -> Result<Vec<InventoryEntry>, StoreError> {
        (**self).list_lots(tenant_id)
    }

    fn list_items(&self, tenant_id: TenantId) -> Result<Vec<ItemId>, StoreError> {
        (**self).list_items(tenant_id)
    }

    fn insert_lot(&self, entry: InventoryEntry) -> Result<(), StoreError> {
        (**self).insert_lot(entry)
    }

    fn commit_sale(
        &self,
        tenant_id: TenantId,
        sales: &[Sale],
        updates: &[LotUpdate],
    ) -> Result<(), StoreError> {
        (**self).commit_sale(tenant_id, sales, updates)
    }

    fn list_sales(&self, tenant_id: TenantId) -> Result<Vec<Sale>, StoreError> {
        (**self).list_sales(tenant_id)
    }
}

#[derive(Debug, Default)]
struct Tables {
    lots: HashMap<(TenantId, EntryId), InventoryEntry>,
    sales: HashMap<TenantId, Vec<Sale>>,
}

/// In-memory tenant-isolated store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryLotStore {
    inner: RwLock<Tables>,
}

impl InMemoryLotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LotStore for InMemoryLotStore {
    fn load_lots(
        &self,
        tenant_id: TenantId,
        item_id: ItemId,
    ) -> Result<Vec<InventoryEntry>, StoreError> {
        let tables = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(tables
            .lots
            .iter()
            .filter(|((t, _), lot)| *t == tenant_id && lot.item_id == item_id)
            .map(|(_, lot)| lot.clone())
            .collect())
    }

    fn list_lots(&self, tenant_id: TenantId) -> Result<Vec<InventoryEntry>, StoreError> {
        let tables = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(tables
            .lots
            .iter()
            .filter_map(|((t, _), lot)| (*t == tenant_id).then(|| lot.clone()))
            .collect())
    }

    fn list_items(&self, tenant_id: TenantId) -> Result<Vec<ItemId>, StoreError> {
        let tables = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        let mut items: Vec<ItemId> = tables
            .lots
            .iter()
            .filter_map(|((t, _), lot)| (*t == tenant_id).then_some(lot.item_id))
            .collect();
        items.sort();
        items.dedup();
        Ok(items)
    }

    fn insert_lot(&self, entry: InventoryEntry) -> Result<(), StoreError> {
        let mut tables = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        let key = (entry.tenant_id, entry.id);
        if tables.lots.contains_key(&key) {
            return Err(StoreError::Duplicate(entry.id));
        }
        tables.lots.insert(key, entry);
        Ok(())
    }

    fn commit_sale(
        &self,
        tenant_id: TenantId,
        sales: &[Sale],
        updates: &[LotUpdate],
    ) -> Result<(), StoreError> {
        if sales.iter().any(|s| s.tenant_id != tenant_id) {
            return Err(StoreError::TenantIsolation {
                expected: tenant_id,
            });
        }

        let mut tables = self.inner.write().map_err(|_| StoreError::Poisoned)?;

        // Check every row before touching any of them.
        for update in updates {
            let lot = tables
                .lots
                .get(&(tenant_id, update.entry_id))
                .ok_or(StoreError::NotFound(update.entry_id))?;
            if lot.remaining_qty != update.previous_remaining {
                return Err(StoreError::Conflict {
                    entry_id: update.entry_id,
                    expected: update.previous_remaining,
                    found: lot.remaining_qty,
                });
            }
        }
        for sale in sales {
            if !tables.lots.contains_key(&(tenant_id, sale.entry_id)) {
                return Err(StoreError::NotFound(sale.entry_id));
            }
        }

        for update in updates {
            if let Some(lot) = tables.lots.get_mut(&(tenant_id, update.entry_id)) {
                lot.remaining_qty = update.remaining_qty;
                lot.status = update.status;
            }
        }
        tables
            .sales
            .entry(tenant_id)
            .or_default()
            .extend(sales.iter().cloned());
        Ok(())
    }

    fn list_sales(&self, tenant_id: TenantId) -> Result<Vec<Sale>, StoreError> {
        let tables = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(tables.sales.get(&tenant_id).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use locktrack_core::{Amount, CurrencyUnit, SaleId};
    use locktrack_inventory::{LotStatus, NewPurchase};
    use rust_decimal_macros::dec;

    fn lot(tenant_id: TenantId, item_id: ItemId, qty: u64) -> InventoryEntry {
        InventoryEntry::purchase(
            EntryId::new(),
            NewPurchase {
                tenant_id,
                item_id,
                item_name: "Angel Wings".to_string(),
                category: Some("wings".to_string()),
                quantity: qty,
                unit_cost: Amount::new(dec!(3), CurrencyUnit::WorldLock),
                bought_at: Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
                notes: None,
            },
        )
        .unwrap()
    }

    fn sale_from(lot: &InventoryEntry, qty: u64) -> Sale {
        Sale {
            id: SaleId::new(),
            tenant_id: lot.tenant_id,
            entry_id: lot.id,
            item_id: lot.item_id,
            quantity_sold: qty,
            amount_gained: dec!(10),
            unit: CurrencyUnit::WorldLock,
            sold_at: Utc::now(),
            notes: None,
        }
    }

    fn take(lot: &InventoryEntry, qty: u64) -> LotUpdate {
        let remaining_qty = lot.remaining_qty - qty;
        LotUpdate {
            entry_id: lot.id,
            previous_remaining: lot.remaining_qty,
            remaining_qty,
            status: LotStatus::for_remaining(remaining_qty),
        }
    }

    #[test]
    fn tenants_do_not_see_each_other() {
        let store = InMemoryLotStore::new();
        let t1 = TenantId::new();
        let t2 = TenantId::new();
        let item = ItemId::new();

        store.insert_lot(lot(t1, item, 5)).unwrap();

        assert_eq!(store.load_lots(t1, item).unwrap().len(), 1);
        assert!(store.load_lots(t2, item).unwrap().is_empty());
        assert!(store.list_items(t2).unwrap().is_empty());
    }

    #[test]
    fn duplicate_lot_is_rejected() {
        let store = InMemoryLotStore::new();
        let entry = lot(TenantId::new(), ItemId::new(), 5);
        store.insert_lot(entry.clone()).unwrap();
        assert_eq!(store.insert_lot(entry.clone()), Err(StoreError::Duplicate(entry.id)));
    }

    #[test]
    fn commit_applies_updates_and_appends_sales() {
        let store = InMemoryLotStore::new();
        let entry = lot(TenantId::new(), ItemId::new(), 5);
        store.insert_lot(entry.clone()).unwrap();

        let sale = sale_from(&entry, 5);
        store
            .commit_sale(entry.tenant_id, &[sale.clone()], &[take(&entry, 5)])
            .unwrap();

        let stored = &store.load_lots(entry.tenant_id, entry.item_id).unwrap()[0];
        assert_eq!(stored.remaining_qty, 0);
        assert_eq!(stored.status, LotStatus::Closed);
        assert_eq!(store.list_sales(entry.tenant_id).unwrap(), vec![sale]);
    }

    #[test]
    fn stale_update_conflicts_and_writes_nothing() {
        let store = InMemoryLotStore::new();
        let tenant_id = TenantId::new();
        let item = ItemId::new();
        let a = lot(tenant_id, item, 5);
        let b = lot(tenant_id, item, 5);
        store.insert_lot(a.clone()).unwrap();
        store.insert_lot(b.clone()).unwrap();

        // someone else took 2 from b after we read it
        store.commit_sale(tenant_id, &[], &[take(&b, 2)]).unwrap();

        let err = store
            .commit_sale(
                tenant_id,
                &[sale_from(&a, 5), sale_from(&b, 1)],
                &[take(&a, 5), take(&b, 1)],
            )
            .unwrap_err();
        assert_eq!(
            err,
            StoreError::Conflict {
                entry_id: b.id,
                expected: 5,
                found: 3
            }
        );

        let lots = store.load_lots(tenant_id, item).unwrap();
        let a_now = lots.iter().find(|l| l.id == a.id).unwrap();
        assert_eq!(a_now.remaining_qty, 5);
        assert!(store.list_sales(tenant_id).unwrap().is_empty());
    }

    #[test]
    fn commit_rejects_foreign_tenant_rows() {
        let store = InMemoryLotStore::new();
        let entry = lot(TenantId::new(), ItemId::new(), 5);
        store.insert_lot(entry.clone()).unwrap();

        let other = TenantId::new();
        assert_eq!(
            store.commit_sale(other, &[sale_from(&entry, 1)], &[]),
            Err(StoreError::TenantIsolation { expected: other })
        );
        assert_eq!(
            store.commit_sale(other, &[], &[take(&entry, 1)]),
            Err(StoreError::NotFound(entry.id))
        );
    }
}
