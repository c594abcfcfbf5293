//! Write-through coordinator: primary first, snapshot best-effort.
//!
//! A mutation only counts once the primary data source has confirmed it;
//! the snapshot must never contain an item the primary does not. The
//! snapshot patch that follows a confirmed write is awaited before
//! returning, so a caller reading its own write immediately afterwards
//! sees it — but a patch failure is absorbed (logged and counted), leaving
//! the background resync to reconcile. No internal queue: concurrent
//! writers to the same id race at the primary, last write wins.

use std::sync::Arc;

use metrics::counter;
use time::OffsetDateTime;
use tracing::warn;
use uuid::Uuid;

use crate::application::error::{UpstreamError, WriteError};
use crate::application::repos::RepoError;
use crate::config::AvailabilityConfig;
use crate::domain::content::{
    ContentItem, ContentKind, ContentStatus, EventDetails, PlacementFlags,
};
use crate::infra::primary::{DeadlineClient, WriteCallError};
use crate::infra::snapshot::SnapshotStore;
use crate::infra::telemetry::METRIC_SNAPSHOT_PATCH_FAILURE_TOTAL;

const TARGET: &str = "scorta::writer";

#[derive(Debug, Clone)]
pub struct CreateItemInput {
    pub kind: ContentKind,
    pub title: String,
    pub body: String,
    pub excerpt: String,
    pub categories: Vec<String>,
    pub location: String,
    pub image_url: String,
    pub status: ContentStatus,
    pub placement: PlacementFlags,
    pub event: Option<EventDetails>,
}

/// Partial update: only provided fields overwrite, omitted fields keep
/// their prior value. `kind`, `id` and `created_at` are immutable.
#[derive(Debug, Clone, Default)]
pub struct UpdateItemInput {
    pub title: Option<String>,
    pub body: Option<String>,
    pub excerpt: Option<String>,
    pub categories: Option<Vec<String>>,
    pub location: Option<String>,
    pub image_url: Option<String>,
    pub status: Option<ContentStatus>,
    pub placement: Option<PlacementFlags>,
    pub event: Option<EventDetails>,
}

pub struct WriteThroughCoordinator {
    client: DeadlineClient,
    store: Arc<SnapshotStore>,
    config: AvailabilityConfig,
}

impl WriteThroughCoordinator {
    pub fn new(
        client: DeadlineClient,
        store: Arc<SnapshotStore>,
        config: AvailabilityConfig,
    ) -> Self {
        Self {
            client,
            store,
            config,
        }
    }

    pub async fn create_item(&self, input: CreateItemInput) -> Result<ContentItem, WriteError> {
        if input.title.trim().is_empty() {
            return Err(WriteError::validation("title must not be empty"));
        }
        if input.categories.is_empty() {
            return Err(WriteError::validation("at least one category is required"));
        }

        let now = OffsetDateTime::now_utc();
        let item = ContentItem {
            id: Uuid::new_v4(),
            kind: input.kind,
            title: input.title,
            body: input.body,
            excerpt: input.excerpt,
            categories: input.categories,
            location: input.location,
            image_url: input.image_url,
            status: input.status,
            placement: input.placement,
            event: input.event,
            created_at: now,
            updated_at: now,
        };

        self.client
            .insert_item(&item, self.config.admin_deadline())
            .await
            .map_err(map_write_error)?;

        self.patch_upsert(&item).await;
        Ok(item)
    }

    pub async fn update_item(
        &self,
        id: Uuid,
        input: UpdateItemInput,
    ) -> Result<ContentItem, WriteError> {
        if let Some(title) = &input.title
            && title.trim().is_empty()
        {
            return Err(WriteError::validation("title must not be empty"));
        }
        if let Some(categories) = &input.categories
            && categories.is_empty()
        {
            return Err(WriteError::validation("at least one category is required"));
        }

        let deadline = self.config.admin_deadline();
        let mut item = self
            .client
            .find_by_id(id, deadline)
            .await
            .map_err(WriteError::Upstream)?
            .ok_or(WriteError::NotFound)?;

        apply_patch(&mut item, input);
        item.updated_at = OffsetDateTime::now_utc();

        self.client
            .update_item(&item, deadline)
            .await
            .map_err(map_write_error)?;

        self.patch_upsert(&item).await;
        Ok(item)
    }

    pub async fn delete_item(&self, id: Uuid) -> Result<(), WriteError> {
        let deleted = self
            .client
            .delete_item(id, self.config.admin_deadline())
            .await
            .map_err(map_write_error)?;

        if !deleted {
            return Err(WriteError::NotFound);
        }

        // Only a confirmed primary deletion may touch the snapshot.
        let mut items = self.store.load().await;
        let before = items.len();
        items.retain(|existing| existing.id != id);
        if items.len() != before {
            self.patch_replace(&items, "delete").await;
        }
        Ok(())
    }

    /// Patch the changed record into the snapshot: replaced in place when
    /// present, prepended when absent. Failure is absorbed; the primary
    /// write already stands and resync will reconcile.
    async fn patch_upsert(&self, item: &ContentItem) {
        let mut items = self.store.load().await;
        match items.iter_mut().find(|existing| existing.id == item.id) {
            Some(existing) => *existing = item.clone(),
            None => items.insert(0, item.clone()),
        }
        self.patch_replace(&items, "upsert").await;
    }

    async fn patch_replace(&self, items: &[ContentItem], op: &'static str) {
        if let Err(err) = self.store.replace(items).await {
            counter!(METRIC_SNAPSHOT_PATCH_FAILURE_TOTAL).increment(1);
            warn!(
                target: TARGET,
                op,
                error = %err,
                "snapshot patch failed, waiting for background resync"
            );
        }
    }
}

fn apply_patch(item: &mut ContentItem, input: UpdateItemInput) {
    if let Some(title) = input.title {
        item.title = title;
    }
    if let Some(body) = input.body {
        item.body = body;
    }
    if let Some(excerpt) = input.excerpt {
        item.excerpt = excerpt;
    }
    if let Some(categories) = input.categories {
        item.categories = categories;
    }
    if let Some(location) = input.location {
        item.location = location;
    }
    if let Some(image_url) = input.image_url {
        item.image_url = image_url;
    }
    if let Some(status) = input.status {
        item.status = status;
    }
    if let Some(placement) = input.placement {
        item.placement = placement;
    }
    if let Some(event) = input.event {
        item.event = Some(event);
    }
}

fn map_write_error(err: WriteCallError) -> WriteError {
    match err {
        WriteCallError::Upstream(upstream) => WriteError::Upstream(upstream),
        WriteCallError::Repo(RepoError::Duplicate { constraint }) => {
            WriteError::conflict(format!("unique constraint `{constraint}` violated"))
        }
        WriteCallError::Repo(RepoError::NotFound) => WriteError::NotFound,
        WriteCallError::Repo(RepoError::InvalidInput { message }) => {
            WriteError::Validation(message)
        }
        WriteCallError::Repo(RepoError::Timeout) => {
            WriteError::Upstream(UpstreamError::unavailable("database-side timeout"))
        }
        WriteCallError::Repo(err) => WriteError::Upstream(UpstreamError::unavailable(err.to_string())),
    }
}
