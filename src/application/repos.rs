//! Repository trait describing the primary data source boundary.
//!
//! The authoritative remote database is consumed through this trait; the
//! crate does not specify its wire protocol. `infra::db` provides the
//! production Postgres implementation, tests provide in-memory fakes.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::content::{ContentItem, ContentKind};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Which items a listing query may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListScope {
    /// Published items only.
    Public,
    /// Every status, for admin surfaces and resync.
    Admin,
}

/// A bounded most-recent-first window of items.
#[derive(Debug, Clone, Copy)]
pub struct RecentQuery {
    pub scope: ListScope,
    pub kind: Option<ContentKind>,
    pub limit: u32,
}

impl RecentQuery {
    pub fn public(limit: u32) -> Self {
        Self {
            scope: ListScope::Public,
            kind: None,
            limit,
        }
    }

    pub fn admin(limit: u32) -> Self {
        Self {
            scope: ListScope::Admin,
            kind: None,
            limit,
        }
    }

    pub fn with_kind(mut self, kind: ContentKind) -> Self {
        self.kind = Some(kind);
        self
    }
}

/// Primary data source capability: bounded recent-window queries plus
/// insert/update/delete by id.
#[async_trait]
pub trait ContentRepo: Send + Sync {
    /// Items ordered by `created_at` descending, newest first, capped at
    /// `query.limit`.
    async fn list_recent(&self, query: RecentQuery) -> Result<Vec<ContentItem>, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ContentItem>, RepoError>;

    async fn insert_item(&self, item: &ContentItem) -> Result<(), RepoError>;

    async fn update_item(&self, item: &ContentItem) -> Result<(), RepoError>;

    /// Returns `true` when a row was deleted, `false` when the id was absent.
    async fn delete_item(&self, id: Uuid) -> Result<bool, RepoError>;
}
