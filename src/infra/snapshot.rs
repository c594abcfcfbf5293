//! File-backed snapshot store: the durable fallback copy of the content
//! collection.
//!
//! The whole collection is persisted as one JSON array of bounded-size
//! records. `replace` is the single write entry point for every producer
//! (reader merge, write-through patch, resync) so cache invalidation can
//! never be bypassed. Reads degrade to an empty collection on a missing or
//! corrupt file; a broken snapshot must never take the read path down.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use tracing::warn;
use uuid::Uuid;

use crate::cache::snapshot_cache::SnapshotCache;
use crate::config::SnapshotLimits;
use crate::domain::content::{ContentItem, ContentKind, ContentStatus, EventDetails, PlacementFlags};

const TARGET: &str = "scorta::snapshot";

#[derive(Debug, Error)]
pub enum SnapshotWriteError {
    #[error("failed to serialize snapshot: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to persist snapshot file: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot writer task failed: {0}")]
    Join(String),
}

fn unix_epoch() -> OffsetDateTime {
    OffsetDateTime::UNIX_EPOCH
}

/// On-disk shape of one content item.
///
/// Every field defaults on load so snapshots written by older or newer
/// builds deserialize without faulting. Aliases absorb the historical
/// field-name drift (`image` / `imageUrl` / `image_url`) once, here, instead
/// of in every consumer.
#[derive(Debug, Serialize, Deserialize)]
struct SnapshotRecord {
    id: Uuid,
    #[serde(default = "default_kind")]
    kind: ContentKind,
    #[serde(default)]
    title: String,
    #[serde(default)]
    body: String,
    #[serde(default)]
    excerpt: String,
    #[serde(default)]
    categories: Vec<String>,
    #[serde(default)]
    location: String,
    #[serde(default, alias = "image", alias = "imageUrl")]
    image_url: String,
    #[serde(default)]
    status: ContentStatus,
    #[serde(default)]
    placement: PlacementFlags,
    #[serde(default)]
    event: Option<EventDetails>,
    #[serde(with = "time::serde::rfc3339", default = "unix_epoch")]
    created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339", default = "unix_epoch")]
    updated_at: OffsetDateTime,
}

fn default_kind() -> ContentKind {
    ContentKind::Article
}

impl SnapshotRecord {
    fn project(item: &ContentItem, limits: &SnapshotLimits) -> Self {
        Self {
            id: item.id,
            kind: item.kind,
            title: truncate_chars(&item.title, limits.title_max_chars),
            body: truncate_chars(&item.body, limits.body_max_chars),
            excerpt: truncate_chars(&item.excerpt, limits.excerpt_max_chars),
            categories: item.categories.clone(),
            location: item.location.clone(),
            image_url: item.image_url.clone(),
            status: item.status,
            placement: item.placement,
            event: item.event.clone(),
            created_at: item.created_at,
            updated_at: item.updated_at,
        }
    }

    fn into_item(self) -> ContentItem {
        ContentItem {
            id: self.id,
            kind: self.kind,
            title: self.title,
            body: self.body,
            excerpt: self.excerpt,
            categories: self.categories,
            location: self.location,
            image_url: self.image_url,
            status: self.status,
            placement: self.placement,
            event: self.event,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Truncate to at most `max` characters without splitting a code point.
fn truncate_chars(value: &str, max: usize) -> String {
    match value.char_indices().nth(max) {
        Some((boundary, _)) => value[..boundary].to_string(),
        None => value.to_string(),
    }
}

pub struct SnapshotStore {
    path: PathBuf,
    limits: SnapshotLimits,
    cache: Arc<SnapshotCache>,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>, limits: SnapshotLimits, cache: Arc<SnapshotCache>) -> Self {
        Self {
            path: path.into(),
            limits,
            cache,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The full stored collection.
    ///
    /// A missing file is the cold-start condition and yields an empty
    /// collection; a corrupt file is logged and also yields an empty
    /// collection. Neither is an error to the caller.
    pub async fn load(&self) -> Vec<ContentItem> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(err) => {
                warn!(
                    target: TARGET,
                    path = %self.path.display(),
                    error = %err,
                    "snapshot file unreadable, serving empty collection"
                );
                return Vec::new();
            }
        };

        match serde_json::from_slice::<Vec<SnapshotRecord>>(&bytes) {
            Ok(records) => records.into_iter().map(SnapshotRecord::into_item).collect(),
            Err(err) => {
                warn!(
                    target: TARGET,
                    path = %self.path.display(),
                    error = %err,
                    "snapshot file corrupt, serving empty collection"
                );
                Vec::new()
            }
        }
    }

    /// Atomically overwrite the stored collection and invalidate the cache.
    ///
    /// Items are persisted in canonical order (newest `created_at` first,
    /// id as tie-break) so that replaying the same collection produces a
    /// byte-identical file.
    pub async fn replace(&self, items: &[ContentItem]) -> Result<(), SnapshotWriteError> {
        let mut ordered: Vec<&ContentItem> = items.iter().collect();
        ordered.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));

        let records: Vec<SnapshotRecord> = ordered
            .iter()
            .map(|item| SnapshotRecord::project(item, &self.limits))
            .collect();
        let bytes = serde_json::to_vec(&records)?;

        let path = self.path.clone();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Temp file in the target directory, then rename: a concurrent load
        // observes either the old or the new snapshot, never a partial one.
        tokio::task::spawn_blocking(move || -> Result<(), SnapshotWriteError> {
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
            let mut temp = match dir {
                Some(dir) => tempfile::NamedTempFile::new_in(dir)?,
                None => tempfile::NamedTempFile::new_in(".")?,
            };
            temp.write_all(&bytes)?;
            temp.flush()?;
            temp.persist(&path).map_err(|err| err.error)?;
            Ok(())
        })
        .await
        .map_err(|err| SnapshotWriteError::Join(err.to_string()))??;

        self.cache.invalidate();
        Ok(())
    }
}
