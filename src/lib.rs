//! Cascading content-availability layer for content-management sites.
//!
//! Public pages stay fast and available even when the primary database is
//! slow or unreachable: reads cascade from an in-memory cache to an
//! on-disk snapshot to the live database under per-view deadlines, writes
//! land at the primary first and are patched through to the snapshot, and
//! a periodic background resync bounds how stale the snapshot can become.
//!
//! The crate is a library-level subsystem: it owns no routing, rendering,
//! or authentication. Wire it up by implementing (or using the bundled
//! Postgres implementation of) [`application::repos::ContentRepo`] and
//! constructing the services around one shared [`infra::snapshot::SnapshotStore`].

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;

pub use application::error::{UpstreamError, WriteError};
pub use application::reader::{CascadingReader, FeedPage, ReadSource};
pub use application::repos::{ContentRepo, ListScope, RecentQuery, RepoError};
pub use application::resync::{
    ResyncError, ResyncOutcome, ResyncRun, ResyncService, spawn_interval_resync,
};
pub use application::writer::{CreateItemInput, UpdateItemInput, WriteThroughCoordinator};
pub use cache::snapshot_cache::SnapshotCache;
pub use config::{AvailabilityConfig, SnapshotLimits};
pub use domain::content::{
    ContentItem, ContentKind, ContentStatus, EventDetails, PlacementFlags,
};
pub use infra::primary::DeadlineClient;
pub use infra::snapshot::SnapshotStore;
