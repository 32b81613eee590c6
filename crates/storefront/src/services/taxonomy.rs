//! Short-lived cache of the read-only taxonomy used by storefront filters.
//!
//! Entries are kept as rendered JSON so a hit skips both the database and
//! serialization. Admin edits show up once the TTL lapses.

use std::future::Future;
use std::time::Duration;

use moka::future::Cache;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use strives_core::{CategoryId, CollectionId};
use strives_db::RepositoryError;

const TTL: Duration = Duration::from_secs(60);

/// Cache key per taxonomy listing.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum TaxonomyKey {
    Categories,
    SubCategories(Option<CategoryId>),
    Collections,
    Collection(CollectionId),
    Colours,
    Materials,
    Tags,
}

/// Cache of taxonomy listings.
#[derive(Clone)]
pub struct TaxonomyCache {
    cache: Cache<TaxonomyKey, Value>,
}

impl Default for TaxonomyCache {
    fn default() -> Self {
        Self::new()
    }
}

impl TaxonomyCache {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cache: Cache::builder().max_capacity(256).time_to_live(TTL).build(),
        }
    }

    /// Return the cached JSON for `key`, loading it on a miss.
    ///
    /// A load that yields `null` (e.g. a missing collection) is not cached.
    ///
    /// # Errors
    ///
    /// Returns the loader's error; nothing is cached in that case.
    pub async fn get_or_load<T, F, Fut>(&self, key: TaxonomyKey, load: F) -> Result<Value, RepositoryError>
    where
        T: Serialize,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, RepositoryError>>,
    {
        if let Some(hit) = self.cache.get(&key).await {
            debug!(?key, "taxonomy cache hit");
            return Ok(hit);
        }

        let value = serde_json::to_value(load().await?)
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;
        if !value.is_null() {
            self.cache.insert(key, value.clone()).await;
        }
        Ok(value)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[tokio::test]
    async fn test_second_read_is_a_hit() {
        let cache = TaxonomyCache::new();
        let loads = AtomicUsize::new(0);
        for _ in 0..3 {
            let value = cache
                .get_or_load(TaxonomyKey::Tags, || async {
                    loads.fetch_add(1, Ordering::SeqCst);
                    Ok(vec!["linen", "silk"])
                })
                .await
                .unwrap();
            assert_eq!(value, serde_json::json!(["linen", "silk"]));
        }
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_entries_are_not_cached() {
        let cache = TaxonomyCache::new();
        let loads = AtomicUsize::new(0);
        for _ in 0..2 {
            let value = cache
                .get_or_load(TaxonomyKey::Collection(CollectionId::new(9)), || async {
                    loads.fetch_add(1, Ordering::SeqCst);
                    Ok(None::<String>)
                })
                .await
                .unwrap();
            assert!(value.is_null());
        }
        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let cache = TaxonomyCache::new();
        let result = cache
            .get_or_load(TaxonomyKey::Colours, || async {
                Err::<Vec<String>, _>(RepositoryError::NotFound)
            })
            .await;
        assert!(result.is_err());
        let value = cache
            .get_or_load(TaxonomyKey::Colours, || async { Ok(vec!["red"]) })
            .await
            .unwrap();
        assert_eq!(value, serde_json::json!(["red"]));
    }
}
