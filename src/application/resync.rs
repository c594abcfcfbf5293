//! Background resync: bounds how stale the snapshot can become when
//! individual write-through patches are missed or fail.
//!
//! Pulls a bounded recent window per content kind from the primary and
//! replaces the snapshot with the union. Idempotent: two runs with no
//! intervening writes produce byte-identical snapshot files (the store
//! persists in canonical order). Never runs concurrently with itself; an
//! overlapping trigger is skipped, not queued. On failure the existing
//! snapshot is left untouched and the reason is recorded.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use metrics::{counter, histogram};
use time::OffsetDateTime;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::application::error::UpstreamError;
use crate::application::repos::RecentQuery;
use crate::cache::lock::recover;
use crate::config::AvailabilityConfig;
use crate::domain::content::{ContentItem, ContentKind};
use crate::infra::primary::DeadlineClient;
use crate::infra::snapshot::{SnapshotStore, SnapshotWriteError};
use crate::infra::telemetry::{METRIC_RESYNC_DURATION_MS, METRIC_RESYNC_RUNS_TOTAL};

const TARGET: &str = "scorta::resync";

#[derive(Debug, thiserror::Error)]
pub enum ResyncError {
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
    #[error("failed to persist resynced snapshot: {0}")]
    Snapshot(#[from] SnapshotWriteError),
}

/// What the last completed or failed resync did.
#[derive(Debug, Clone, PartialEq)]
pub enum ResyncOutcome {
    Completed {
        items: usize,
        finished_at: OffsetDateTime,
    },
    Failed {
        reason: String,
        finished_at: OffsetDateTime,
    },
}

/// Result of a single trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResyncRun {
    /// The snapshot was refreshed; carries the item count.
    Completed(usize),
    /// Another resync was already in flight; this trigger did nothing.
    Skipped,
}

pub struct ResyncService {
    client: DeadlineClient,
    store: Arc<SnapshotStore>,
    config: AvailabilityConfig,
    running: AtomicBool,
    last_outcome: std::sync::RwLock<Option<ResyncOutcome>>,
}

impl ResyncService {
    pub fn new(
        client: DeadlineClient,
        store: Arc<SnapshotStore>,
        config: AvailabilityConfig,
    ) -> Self {
        Self {
            client,
            store,
            config,
            running: AtomicBool::new(false),
            last_outcome: std::sync::RwLock::new(None),
        }
    }

    /// Refresh the snapshot from the primary now. Skips (rather than
    /// queues) when a resync is already running.
    pub async fn force_resync(&self) -> Result<ResyncRun, ResyncError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Ok(ResyncRun::Skipped);
        }

        let started = std::time::Instant::now();
        let result = self.run_once().await;
        self.running.store(false, Ordering::SeqCst);

        match &result {
            Ok(count) => {
                histogram!(METRIC_RESYNC_DURATION_MS)
                    .record(started.elapsed().as_secs_f64() * 1000.0);
                counter!(METRIC_RESYNC_RUNS_TOTAL, "outcome" => "completed").increment(1);
                info!(target: TARGET, items = count, "resync completed");
                self.record(ResyncOutcome::Completed {
                    items: *count,
                    finished_at: OffsetDateTime::now_utc(),
                });
            }
            Err(err) => {
                counter!(METRIC_RESYNC_RUNS_TOTAL, "outcome" => "failed").increment(1);
                warn!(target: TARGET, error = %err, "resync failed, snapshot left untouched");
                self.record(ResyncOutcome::Failed {
                    reason: err.to_string(),
                    finished_at: OffsetDateTime::now_utc(),
                });
            }
        }

        result.map(ResyncRun::Completed)
    }

    /// The most recent run's outcome, for operational surfaces.
    pub fn last_outcome(&self) -> Option<ResyncOutcome> {
        recover(self.last_outcome.read(), "resync.last_outcome").clone()
    }

    async fn run_once(&self) -> Result<usize, ResyncError> {
        let window = self.config.resync_window_per_kind;
        let deadline = self.config.admin_deadline();

        let articles = self
            .client
            .list_recent(
                RecentQuery::admin(window).with_kind(ContentKind::Article),
                deadline,
            )
            .await?;
        let events = self
            .client
            .list_recent(
                RecentQuery::admin(window).with_kind(ContentKind::Event),
                deadline,
            )
            .await?;

        let mut union: Vec<ContentItem> = articles;
        union.extend(events);
        let count = union.len();

        self.store.replace(&union).await?;
        Ok(count)
    }

    fn record(&self, outcome: ResyncOutcome) {
        *recover(self.last_outcome.write(), "resync.last_outcome") = Some(outcome);
    }
}

/// Run the resync on a fixed cadence until the handle is aborted. The
/// first run happens one full interval after spawning; the host decides
/// whether to force an immediate initial sync.
pub fn spawn_interval_resync(service: Arc<ResyncService>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick of a tokio interval fires immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if let Err(err) = service.force_resync().await {
                warn!(target: TARGET, error = %err, "scheduled resync failed");
            }
        }
    })
}
