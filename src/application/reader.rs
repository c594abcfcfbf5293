//! Cascading reader: bounded-latency read views regardless of primary
//! health.
//!
//! Each view tries the primary data source within a per-view deadline. A
//! successful answer is returned immediately and merged into the snapshot
//! in the background; a timeout or transport failure falls back to the
//! in-memory cache, then the snapshot file. The same filtering and sorting
//! runs over live and fallback data, so a degraded page differs only in
//! freshness, never in shape. An empty result is a normal outcome, not a
//! fault.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use time::OffsetDateTime;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::application::error::UpstreamError;
use crate::application::repos::RecentQuery;
use crate::cache::dedup::ReadDedup;
use crate::cache::snapshot_cache::{SlugIndex, SnapshotCache};
use crate::config::AvailabilityConfig;
use crate::domain::content::{ContentItem, ContentKind};
use crate::domain::slug::{derive_slug, normalize_slug, slug_matches};
use crate::infra::primary::DeadlineClient;
use crate::infra::snapshot::SnapshotStore;
use crate::infra::telemetry::{METRIC_READ_FALLBACK_TOTAL, METRIC_READ_PRIMARY_TOTAL};

const TARGET: &str = "scorta::reader";

const DEDUP_KEY_PUBLIC: &str = "read:public_recent";
const DEDUP_KEY_ADMIN: &str = "read:admin_recent";

/// Where a view's data actually came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadSource {
    Primary,
    Cache,
    Snapshot,
}

/// A feed result plus the handle of the opportunistic snapshot refresh, if
/// one was started. Callers that need deterministic visibility (tests,
/// operational tooling) can await the handle; page rendering just drops it.
#[derive(Debug)]
pub struct FeedPage {
    pub items: Vec<ContentItem>,
    pub source: ReadSource,
    pub refresh: Option<JoinHandle<()>>,
}

struct CollectionRead {
    items: Vec<ContentItem>,
    source: ReadSource,
    refresh: Option<JoinHandle<()>>,
}

pub struct CascadingReader {
    client: DeadlineClient,
    store: Arc<SnapshotStore>,
    cache: Arc<SnapshotCache>,
    dedup: ReadDedup<Result<Vec<ContentItem>, UpstreamError>>,
    config: AvailabilityConfig,
}

impl CascadingReader {
    pub fn new(
        client: DeadlineClient,
        store: Arc<SnapshotStore>,
        cache: Arc<SnapshotCache>,
        config: AvailabilityConfig,
    ) -> Self {
        let dedup = ReadDedup::new(config.dedup_window());
        Self {
            client,
            store,
            cache,
            dedup,
            config,
        }
    }

    /// Homepage feed: published items, featured placements first, newest
    /// first.
    pub async fn home_feed(&self) -> FeedPage {
        let read = self.public_collection(self.config.public_deadline()).await;
        let mut items: Vec<ContentItem> = read
            .items
            .into_iter()
            .filter(ContentItem::is_published)
            .collect();
        items.sort_by(|a, b| {
            b.placement
                .home_featured
                .cmp(&a.placement.home_featured)
                .then(b.created_at.cmp(&a.created_at))
        });
        items.truncate(self.config.feed_limit as usize);

        FeedPage {
            items,
            source: read.source,
            refresh: read.refresh,
        }
    }

    /// City/keyword-bucket feed: published items where any of
    /// categories/location/title contains any of the keywords.
    pub async fn keyword_feed(&self, keywords: &[String]) -> FeedPage {
        let read = self.public_collection(self.config.public_deadline()).await;
        let mut items: Vec<ContentItem> = read
            .items
            .into_iter()
            .filter(|item| item.is_published() && item.matches_keywords(keywords))
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        items.truncate(self.config.feed_limit as usize);

        FeedPage {
            items,
            source: read.source,
            refresh: read.refresh,
        }
    }

    /// Published events whose start date is at or after `now`, soonest
    /// first.
    pub async fn upcoming_events(&self, now: OffsetDateTime) -> FeedPage {
        let read = self.public_collection(self.config.public_deadline()).await;
        let mut items: Vec<ContentItem> = read
            .items
            .into_iter()
            .filter(|item| {
                item.is_published()
                    && item.kind == ContentKind::Event
                    && item
                        .event
                        .as_ref()
                        .is_some_and(|event| event.event_date >= now)
            })
            .collect();
        items.sort_by(|a, b| {
            let a_date = a.event.as_ref().map(|event| event.event_date);
            let b_date = b.event.as_ref().map(|event| event.event_date);
            a_date.cmp(&b_date)
        });
        items.truncate(self.config.feed_limit as usize);

        FeedPage {
            items,
            source: read.source,
            refresh: read.refresh,
        }
    }

    /// Public single-item lookup by slug.
    ///
    /// Exact normalized match wins; otherwise the first item in collection
    /// order whose slug shares at least 70% of the requested slug's tokens
    /// is accepted. The fuzzy step keeps old inbound links alive across
    /// minor title edits and is knowingly ambiguous for near-identical
    /// titles.
    pub async fn item_by_slug(&self, requested: &str) -> Option<ContentItem> {
        let requested = normalize_slug(requested);
        if requested.is_empty() {
            return None;
        }

        let index = match self.cache.get_slug_index() {
            Some(index) => index,
            None => {
                let read = self.public_collection(self.config.item_deadline()).await;
                // Settle the opportunistic merge first: its cache
                // invalidation must not clobber the index set below.
                if let Some(refresh) = read.refresh {
                    let _ = refresh.await;
                }
                let index: SlugIndex = read
                    .items
                    .iter()
                    .filter(|item| item.is_published())
                    .filter_map(|item| {
                        derive_slug(&item.title)
                            .ok()
                            .map(|slug| (slug, item.clone()))
                    })
                    .collect();
                self.cache.set_slug_index(index.clone());
                Arc::new(index)
            }
        };

        if let Some((_, item)) = index.iter().find(|(slug, _)| *slug == requested) {
            return Some(item.clone());
        }

        index
            .iter()
            .find(|(slug, _)| slug_matches(&requested, slug))
            .map(|(_, item)| item.clone())
    }

    /// Admin listing: every status, most recently updated first. Uses the
    /// longer admin deadline; correctness beats latency here.
    pub async fn admin_list(&self) -> FeedPage {
        let deadline = self.config.admin_deadline();
        let limit = self.window_limit();
        let client = self.client.clone();
        let outcome = self
            .dedup
            .run(DEDUP_KEY_ADMIN, || async move {
                client.list_recent(RecentQuery::admin(limit), deadline).await
            })
            .await;

        let read = self.resolve(DEDUP_KEY_ADMIN, outcome).await;
        let mut items = read.items;
        items.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

        FeedPage {
            items,
            source: read.source,
            refresh: read.refresh,
        }
    }

    /// Admin lookup by id: all statuses. A definitive "absent" from the
    /// primary is trusted; only failures fall back to the snapshot.
    pub async fn admin_item_by_id(&self, id: Uuid) -> Option<ContentItem> {
        match self
            .client
            .find_by_id(id, self.config.admin_deadline())
            .await
        {
            Ok(found) => {
                counter!(METRIC_READ_PRIMARY_TOTAL).increment(1);
                found
            }
            Err(err) => {
                debug!(target: TARGET, %id, error = %err, "admin lookup falling back to snapshot");
                counter!(METRIC_READ_FALLBACK_TOTAL).increment(1);
                let (items, _) = self.fallback_collection().await;
                items.into_iter().find(|item| item.id == id)
            }
        }
    }

    async fn public_collection(&self, deadline: Duration) -> CollectionRead {
        let limit = self.window_limit();
        let client = self.client.clone();
        let outcome = self
            .dedup
            .run(DEDUP_KEY_PUBLIC, || async move {
                client
                    .list_recent(RecentQuery::public(limit), deadline)
                    .await
            })
            .await;

        self.resolve(DEDUP_KEY_PUBLIC, outcome).await
    }

    async fn resolve(
        &self,
        view: &'static str,
        outcome: Result<Vec<ContentItem>, UpstreamError>,
    ) -> CollectionRead {
        match outcome {
            Ok(items) => {
                counter!(METRIC_READ_PRIMARY_TOTAL).increment(1);
                let refresh = self.spawn_merge(items.clone());
                CollectionRead {
                    items,
                    source: ReadSource::Primary,
                    refresh: Some(refresh),
                }
            }
            Err(err) => {
                debug!(target: TARGET, view, error = %err, "primary unavailable, serving fallback");
                counter!(METRIC_READ_FALLBACK_TOTAL).increment(1);
                let (items, source) = self.fallback_collection().await;
                CollectionRead {
                    items,
                    source,
                    refresh: None,
                }
            }
        }
    }

    async fn fallback_collection(&self) -> (Vec<ContentItem>, ReadSource) {
        if let Some(items) = self.cache.get() {
            return ((*items).clone(), ReadSource::Cache);
        }

        let items = self.store.load().await;
        self.cache.set(items.clone());
        (items, ReadSource::Snapshot)
    }

    /// Merge freshly observed items into the snapshot without blocking the
    /// caller. Items already in the snapshot but absent from this window
    /// are preserved; only a resync replaces the whole collection.
    fn spawn_merge(&self, fresh: Vec<ContentItem>) -> JoinHandle<()> {
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            let mut merged = store.load().await;
            for item in fresh {
                match merged.iter_mut().find(|existing| existing.id == item.id) {
                    Some(existing) => *existing = item,
                    None => merged.push(item),
                }
            }
            if let Err(err) = store.replace(&merged).await {
                warn!(
                    target: TARGET,
                    error = %err,
                    "opportunistic snapshot refresh failed, snapshot left as-is"
                );
            }
        })
    }

    fn window_limit(&self) -> u32 {
        self.config.resync_window_per_kind.saturating_mul(2)
    }
}
