//! Time-boxed in-memory cache in front of the snapshot store.
//!
//! Avoids re-reading and re-deserializing the snapshot file on every
//! fallback read within a short window. Single-writer-many-reader; no
//! cross-process coordination.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio::time::Instant;

use crate::domain::content::ContentItem;

use super::lock::recover;

struct Timed<T> {
    stored_at: Instant,
    value: T,
}

/// Lazily built association from normalized slug to the published item that
/// owns it, kept in collection order: on slug collision or fuzzy lookup the
/// first entry wins, which is what makes repeated lookups deterministic.
pub type SlugIndex = Vec<(String, ContentItem)>;

pub struct SnapshotCache {
    ttl: Duration,
    items: RwLock<Option<Timed<Arc<Vec<ContentItem>>>>>,
    slug_index: RwLock<Option<Timed<Arc<SlugIndex>>>>,
}

impl SnapshotCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            items: RwLock::new(None),
            slug_index: RwLock::new(None),
        }
    }

    /// The cached collection, if younger than the TTL.
    pub fn get(&self) -> Option<Arc<Vec<ContentItem>>> {
        let guard = recover(self.items.read(), "cache.items");
        guard
            .as_ref()
            .filter(|entry| entry.stored_at.elapsed() < self.ttl)
            .map(|entry| Arc::clone(&entry.value))
    }

    pub fn set(&self, items: Vec<ContentItem>) {
        *recover(self.items.write(), "cache.items") = Some(Timed {
            stored_at: Instant::now(),
            value: Arc::new(items),
        });
    }

    pub fn get_slug_index(&self) -> Option<Arc<SlugIndex>> {
        let guard = recover(self.slug_index.read(), "cache.slug_index");
        guard
            .as_ref()
            .filter(|entry| entry.stored_at.elapsed() < self.ttl)
            .map(|entry| Arc::clone(&entry.value))
    }

    pub fn set_slug_index(&self, index: SlugIndex) {
        *recover(self.slug_index.write(), "cache.slug_index") = Some(Timed {
            stored_at: Instant::now(),
            value: Arc::new(index),
        });
    }

    /// Force the next `get` to miss. Called on every snapshot replace so a
    /// fallback read never serves data older than the last write it could
    /// have observed.
    pub fn invalidate(&self) {
        *recover(self.items.write(), "cache.items") = None;
        *recover(self.slug_index.write(), "cache.slug_index") = None;
    }
}
