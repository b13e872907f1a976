//! FIFO view over one item's lots.

use std::collections::HashSet;

use locktrack_core::{DomainError, DomainResult, EntryId, ItemId, TenantId};

use crate::lot::{InventoryEntry, LotUpdate};

/// Ordered collection of one item's purchase lots.
///
/// Entries are kept sorted by `(bought_at, id)` so that costing is
/// reproducible whatever order storage returned them in. The ledger holds no
/// state beyond the entries themselves and performs no persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LotLedger {
    tenant_id: TenantId,
    item_id: ItemId,
    entries: Vec<InventoryEntry>,
}

impl LotLedger {
    /// Build a ledger from raw (possibly unsorted) entry rows.
    ///
    /// Every row must belong to `tenant_id`/`item_id` and satisfy the lot
    /// invariants.
    pub fn new(
        tenant_id: TenantId,
        item_id: ItemId,
        entries: impl IntoIterator<Item = InventoryEntry>,
    ) -> DomainResult<Self> {
        let mut seen = HashSet::new();
        let mut entries: Vec<InventoryEntry> = entries.into_iter().collect();

        for entry in &entries {
            if entry.tenant_id != tenant_id {
                return Err(DomainError::invariant("tenant mismatch"));
            }
            if entry.item_id != item_id {
                return Err(DomainError::invariant(format!(
                    "lot {} belongs to item {}, not {}",
                    entry.id, entry.item_id, item_id
                )));
            }
            if !seen.insert(entry.id) {
                return Err(DomainError::invariant(format!("duplicate lot {}", entry.id)));
            }
            entry.validate()?;
        }

        entries.sort_by(|a, b| a.bought_at.cmp(&b.bought_at).then(a.id.cmp(&b.id)));

        Ok(Self {
            tenant_id,
            item_id,
            entries,
        })
    }

    /// An item with no lots yet.
    pub fn empty(tenant_id: TenantId, item_id: ItemId) -> Self {
        Self {
            tenant_id,
            item_id,
            entries: Vec::new(),
        }
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn item_id(&self) -> ItemId {
        self.item_id
    }

    /// All lots (open and closed), oldest first.
    pub fn entries(&self) -> &[InventoryEntry] {
        &self.entries
    }

    pub fn get(&self, entry_id: EntryId) -> Option<&InventoryEntry> {
        self.entries.iter().find(|e| e.id == entry_id)
    }

    /// Open lots, oldest purchase first; ties broken by entry id.
    pub fn open_lots_fifo(&self) -> impl Iterator<Item = &InventoryEntry> + '_ {
        self.entries.iter().filter(|e| e.is_open())
    }

    /// Sum of remaining quantity across open lots.
    pub fn total_remaining(&self) -> u64 {
        self.open_lots_fifo().map(|e| e.remaining_qty).sum()
    }

    pub fn total_bought(&self) -> u64 {
        self.entries.iter().map(|e| e.quantity_bought).sum()
    }

    /// True when no lot has stock left.
    pub fn is_exhausted(&self) -> bool {
        self.open_lots_fifo().next().is_none()
    }

    /// Name snapshot of the most recent purchase.
    pub fn item_name(&self) -> Option<&str> {
        self.entries.last().map(|e| e.item_name.as_str())
    }

    /// Reflect a decrement the caller has persisted (or is about to).
    ///
    /// The update must have been computed against this ledger's current value
    /// and may only lower the remaining quantity.
    pub fn apply_update(&mut self, update: &LotUpdate) -> DomainResult<()> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.id == update.entry_id)
            .ok_or_else(DomainError::not_found)?;

        if entry.remaining_qty != update.previous_remaining {
            return Err(DomainError::conflict(format!(
                "lot {}: expected remaining {}, found {}",
                entry.id, update.previous_remaining, entry.remaining_qty
            )));
        }
        if update.remaining_qty > update.previous_remaining {
            return Err(DomainError::invariant(format!(
                "lot {}: remaining quantity can only decrease",
                entry.id
            )));
        }

        entry.set_remaining(update.remaining_qty);
        Ok(())
    }

    pub(crate) fn entry_mut(&mut self, entry_id: EntryId) -> Option<&mut InventoryEntry> {
        self.entries.iter_mut().find(|e| e.id == entry_id)
    }
}
