//! Single-flight, locale-keyed cache of embedding tables.
//!
//! Each locale maps to a shared cell. The first caller starts the load and
//! every concurrent caller awaits that same load. A loaded table stays for
//! the process lifetime. A failed load is handed to everyone who awaited it
//! and then evicted, so a later query starts a fresh attempt.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::OnceCell;

use crate::catalog::Locale;
use crate::semantic::store::{EmbeddingStore, EmbeddingTable, StoreError};

type LoadResult = Result<Arc<EmbeddingTable>, Arc<StoreError>>;

/// The embedding table for a locale could not be loaded.
#[derive(Debug, Clone, thiserror::Error)]
#[error("vector search unavailable: {0}")]
pub struct VectorUnavailable(pub Arc<StoreError>);

pub struct EmbeddingCache {
    store: Arc<dyn EmbeddingStore>,
    entries: Mutex<HashMap<Locale, Arc<OnceCell<LoadResult>>>>,
}

impl EmbeddingCache {
    pub fn new(store: Arc<dyn EmbeddingStore>) -> Self {
        Self {
            store,
            entries: Mutex::new(HashMap::new()),
        }
    }

    // The map holds no invariant a panicking holder could break.
    fn entries(&self) -> MutexGuard<'_, HashMap<Locale, Arc<OnceCell<LoadResult>>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Get the table for `locale`, loading it on first use.
    pub async fn get(&self, locale: Locale) -> Result<Arc<EmbeddingTable>, VectorUnavailable> {
        let cell = self
            .entries()
            .entry(locale)
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();

        let result = cell
            .get_or_init(|| async {
                log::info!(
                    "loading {} embeddings from {}",
                    locale,
                    self.store.describe()
                );
                match self.store.load(locale).await {
                    Ok(table) => {
                        log::info!("loaded {} {} embeddings", table.len(), locale);
                        Ok(Arc::new(table))
                    }
                    Err(e) => {
                        log::warn!("failed to load {} embeddings: {}", locale, e);
                        Err(Arc::new(e))
                    }
                }
            })
            .await
            .clone();

        if result.is_err() {
            let mut entries = self.entries();
            if entries
                .get(&locale)
                .is_some_and(|current| Arc::ptr_eq(current, &cell))
            {
                entries.remove(&locale);
            }
        }

        result.map_err(VectorUnavailable)
    }

    /// Forget the table for `locale`; the next `get` reloads it.
    #[allow(dead_code)]
    pub fn invalidate(&self, locale: Locale) {
        self.entries().remove(&locale);
    }

    #[allow(dead_code)]
    pub fn is_loaded(&self, locale: Locale) -> bool {
        self.entries()
            .get(&locale)
            .and_then(|cell| cell.get())
            .is_some_and(|result| result.is_ok())
    }
}
