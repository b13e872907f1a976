use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use locktrack_core::{ItemId, TenantId};
use locktrack_inventory::StockThresholds;

use super::StoreError;
use crate::config::EngineConfig;

/// Per-tenant low-stock settings.
pub trait SettingsStore: Send + Sync {
    fn thresholds(&self, tenant_id: TenantId) -> Result<StockThresholds, StoreError>;
}

impl<S> SettingsStore for Arc<S>
where
    S: SettingsStore + ?Sized,
{
    fn thresholds(&self, tenant_id: TenantId) -> Result<StockThresholds, StoreError> {
        (**self).thresholds(tenant_id)
    }
}

/// Tenants without a settings row get `global_default` and no overrides.
#[derive(Debug)]
pub struct InMemorySettingsStore {
    global_default: u64,
    inner: RwLock<HashMap<TenantId, StockThresholds>>,
}

impl InMemorySettingsStore {
    pub fn new(global_default: u64) -> Self {
        Self {
            global_default,
            inner: RwLock::new(HashMap::new()),
        }
    }

    /// Global default taken from the engine configuration.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.low_stock_threshold)
    }

    pub fn set_thresholds(
        &self,
        tenant_id: TenantId,
        thresholds: StockThresholds,
    ) -> Result<(), StoreError> {
        let mut map = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        map.insert(tenant_id, thresholds);
        Ok(())
    }

    pub fn set_item_threshold(
        &self,
        tenant_id: TenantId,
        item_id: ItemId,
        threshold: u64,
    ) -> Result<(), StoreError> {
        let mut map = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        map.entry(tenant_id)
            .or_insert_with(|| StockThresholds::new(self.global_default))
            .per_item
            .insert(item_id, threshold);
        Ok(())
    }
}

impl SettingsStore for InMemorySettingsStore {
    fn thresholds(&self, tenant_id: TenantId) -> Result<StockThresholds, StoreError> {
        let map = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(map
            .get(&tenant_id)
            .cloned()
            .unwrap_or_else(|| StockThresholds::new(self.global_default)))
    }
}
