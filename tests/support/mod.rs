//! Shared fixtures: an in-memory primary data source with injectable
//! failure modes, plus item builders and a wired-up environment.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use scorta::application::reader::CascadingReader;
use scorta::application::repos::{ContentRepo, ListScope, RecentQuery, RepoError};
use scorta::application::writer::WriteThroughCoordinator;
use scorta::application::resync::ResyncService;
use scorta::cache::snapshot_cache::SnapshotCache;
use scorta::config::AvailabilityConfig;
use scorta::domain::content::{
    ContentItem, ContentKind, ContentStatus, EventDetails, PlacementFlags,
};
use scorta::infra::primary::DeadlineClient;
use scorta::infra::snapshot::SnapshotStore;

/// Fixed reference instant so orderings are deterministic.
pub const BASE_TS: i64 = 1_700_000_000;

pub fn base_time() -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp(BASE_TS).expect("valid timestamp")
}

pub fn item_at(title: &str, kind: ContentKind, status: ContentStatus, age_secs: i64) -> ContentItem {
    let created = base_time() - time::Duration::seconds(age_secs);
    ContentItem {
        id: Uuid::new_v4(),
        kind,
        title: title.to_string(),
        body: format!("{title} body"),
        excerpt: format!("{title} excerpt"),
        categories: vec!["news".to_string()],
        location: "Hamburg".to_string(),
        image_url: String::new(),
        status,
        placement: PlacementFlags::default(),
        event: None,
        created_at: created,
        updated_at: created,
    }
}

pub fn published_article(title: &str, age_secs: i64) -> ContentItem {
    item_at(title, ContentKind::Article, ContentStatus::Published, age_secs)
}

pub fn draft_article(title: &str, age_secs: i64) -> ContentItem {
    item_at(title, ContentKind::Article, ContentStatus::Draft, age_secs)
}

pub fn published_event(title: &str, age_secs: i64, starts_in_secs: i64) -> ContentItem {
    let mut item = item_at(title, ContentKind::Event, ContentStatus::Published, age_secs);
    item.event = Some(EventDetails {
        event_date: base_time() + time::Duration::seconds(starts_in_secs),
        event_end_date: None,
        organizer: "Organizer".to_string(),
        organizer_contact: "mail@example.org".to_string(),
        venue_address: "Venue 1".to_string(),
        ticket_url: String::new(),
        price: Some(10.0),
        currency: Some("EUR".to_string()),
    });
    item
}

/// In-memory stand-in for the authoritative database with injectable
/// outages, hangs and latency.
#[derive(Default)]
pub struct FakePrimary {
    items: Mutex<Vec<ContentItem>>,
    pub fail_reads: AtomicBool,
    pub fail_writes: AtomicBool,
    pub hang_reads: AtomicBool,
    pub read_delay_ms: AtomicU64,
    pub list_calls: AtomicUsize,
    pub insert_calls: AtomicUsize,
}

impl FakePrimary {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seed(&self, items: Vec<ContentItem>) {
        self.items.lock().expect("fake primary lock").extend(items);
    }

    pub fn items(&self) -> Vec<ContentItem> {
        self.items.lock().expect("fake primary lock").clone()
    }

    async fn gate(&self) -> Result<(), RepoError> {
        let delay = self.read_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.hang_reads.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(RepoError::from_persistence("injected outage"));
        }
        Ok(())
    }
}

#[async_trait]
impl ContentRepo for FakePrimary {
    async fn list_recent(&self, query: RecentQuery) -> Result<Vec<ContentItem>, RepoError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.gate().await?;

        let mut items: Vec<ContentItem> = self
            .items
            .lock()
            .expect("fake primary lock")
            .iter()
            .filter(|item| match query.scope {
                ListScope::Public => item.status == ContentStatus::Published,
                ListScope::Admin => true,
            })
            .filter(|item| query.kind.is_none_or(|kind| item.kind == kind))
            .cloned()
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        items.truncate(query.limit as usize);
        Ok(items)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ContentItem>, RepoError> {
        self.gate().await?;
        Ok(self
            .items
            .lock()
            .expect("fake primary lock")
            .iter()
            .find(|item| item.id == id)
            .cloned())
    }

    async fn insert_item(&self, item: &ContentItem) -> Result<(), RepoError> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RepoError::from_persistence("injected write outage"));
        }
        let mut items = self.items.lock().expect("fake primary lock");
        if items.iter().any(|existing| existing.id == item.id) {
            return Err(RepoError::Duplicate {
                constraint: "content_items_pkey".to_string(),
            });
        }
        items.push(item.clone());
        Ok(())
    }

    async fn update_item(&self, item: &ContentItem) -> Result<(), RepoError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RepoError::from_persistence("injected write outage"));
        }
        let mut items = self.items.lock().expect("fake primary lock");
        match items.iter_mut().find(|existing| existing.id == item.id) {
            Some(existing) => {
                *existing = item.clone();
                Ok(())
            }
            None => Err(RepoError::NotFound),
        }
    }

    async fn delete_item(&self, id: Uuid) -> Result<bool, RepoError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RepoError::from_persistence("injected write outage"));
        }
        let mut items = self.items.lock().expect("fake primary lock");
        let before = items.len();
        items.retain(|existing| existing.id != id);
        Ok(items.len() != before)
    }
}

pub struct TestEnv {
    pub primary: Arc<FakePrimary>,
    pub cache: Arc<SnapshotCache>,
    pub store: Arc<SnapshotStore>,
    pub config: AvailabilityConfig,
    _dir: tempfile::TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = AvailabilityConfig {
            snapshot_path: dir.path().join("snapshot.json"),
            ..AvailabilityConfig::default()
        };
        Self::with_config(dir, config)
    }

    pub fn with_config(dir: tempfile::TempDir, config: AvailabilityConfig) -> Self {
        let primary = FakePrimary::new();
        let cache = Arc::new(SnapshotCache::new(config.cache_ttl()));
        let store = Arc::new(SnapshotStore::new(
            config.snapshot_path.clone(),
            config.snapshot_limits,
            Arc::clone(&cache),
        ));
        Self {
            primary,
            cache,
            store,
            config,
            _dir: dir,
        }
    }

    pub fn client(&self) -> DeadlineClient {
        DeadlineClient::new(Arc::clone(&self.primary) as Arc<dyn ContentRepo>)
    }

    pub fn reader(&self) -> CascadingReader {
        CascadingReader::new(
            self.client(),
            Arc::clone(&self.store),
            Arc::clone(&self.cache),
            self.config.clone(),
        )
    }

    pub fn writer(&self) -> WriteThroughCoordinator {
        WriteThroughCoordinator::new(self.client(), Arc::clone(&self.store), self.config.clone())
    }

    pub fn resync(&self) -> ResyncService {
        ResyncService::new(self.client(), Arc::clone(&self.store), self.config.clone())
    }
}
