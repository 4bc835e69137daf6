//! Per-run item cache.
//!
//! Series and seasons are looked up once per episode, so every item id is
//! fetched at most once per run. Concurrent lookups of the same id share a
//! single in-flight request.

use crate::models::item::Item;
use crate::services::catalog::Catalog;
use crate::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};

type Slot = Arc<OnceCell<Arc<Item>>>;

/// Item cache scoped to one planning run.
#[derive(Default)]
pub struct ItemCache {
    slots: Mutex<HashMap<String, Slot>>,
}

impl ItemCache {
    pub fn new() -> Self {
        Self::default()
    }

    async fn slot(&self, id: &str) -> Slot {
        let mut slots = self.slots.lock().await;
        slots
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone()
    }

    /// Get an item, fetching it from the catalog on first use.
    ///
    /// A failed fetch is not cached; the next caller retries.
    pub async fn get_or_fetch(&self, catalog: &dyn Catalog, id: &str) -> Result<Arc<Item>> {
        let slot = self.slot(id).await;
        let item = slot
            .get_or_try_init(|| async {
                tracing::debug!("Fetching item {}", id);
                catalog.get_item(id).await.map(Arc::new)
            })
            .await?;
        Ok(item.clone())
    }

    /// Seed the cache with an item obtained from a listing.
    ///
    /// An already cached entry wins.
    pub async fn insert(&self, item: Item) -> Arc<Item> {
        let slot = self.slot(&item.id).await;
        let item = Arc::new(item);
        match slot.set(item.clone()) {
            Ok(()) => item,
            Err(_) => slot.get().cloned().unwrap_or(item),
        }
    }

    pub async fn len(&self) -> usize {
        let slots = self.slots.lock().await;
        slots.values().filter(|s| s.initialized()).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
