//! Configuration layer: typed settings with layered precedence (file → env).

use std::{path::Path, path::PathBuf, time::Duration};

use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;

const DEFAULT_SNAPSHOT_PATH: &str = "data/content-snapshot.json";
const DEFAULT_CACHE_TTL_SECS: u64 = 60;
const DEFAULT_PUBLIC_DEADLINE_SECS: u64 = 3;
const DEFAULT_ITEM_DEADLINE_SECS: u64 = 5;
const DEFAULT_ADMIN_DEADLINE_SECS: u64 = 10;
const DEFAULT_DEDUP_WINDOW_SECS: u64 = 30;
const DEFAULT_RESYNC_INTERVAL_SECS: u64 = 300;
const DEFAULT_RESYNC_WINDOW_PER_KIND: u32 = 50;
const DEFAULT_FEED_LIMIT: u32 = 20;
const DEFAULT_SNAPSHOT_TITLE_MAX_CHARS: usize = 80;
const DEFAULT_SNAPSHOT_EXCERPT_MAX_CHARS: usize = 150;
const DEFAULT_SNAPSHOT_BODY_MAX_CHARS: usize = 100_000;

const ENV_PREFIX: &str = "SCORTA";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}

/// Bounded-size limits applied to snapshot projections of content fields.
/// The primary data source always retains the unbounded originals.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct SnapshotLimits {
    pub title_max_chars: usize,
    pub excerpt_max_chars: usize,
    pub body_max_chars: usize,
}

impl Default for SnapshotLimits {
    fn default() -> Self {
        Self {
            title_max_chars: DEFAULT_SNAPSHOT_TITLE_MAX_CHARS,
            excerpt_max_chars: DEFAULT_SNAPSHOT_EXCERPT_MAX_CHARS,
            body_max_chars: DEFAULT_SNAPSHOT_BODY_MAX_CHARS,
        }
    }
}

/// Settings for the availability layer.
///
/// Deadlines are per-view: latency-sensitive public views fail over to the
/// snapshot quickly, admin views wait longer for the authoritative answer.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AvailabilityConfig {
    /// Location of the on-disk snapshot file.
    pub snapshot_path: PathBuf,
    /// Age after which the in-memory snapshot cache is considered stale.
    pub cache_ttl_secs: u64,
    /// Deadline for primary queries backing public feed views.
    pub public_deadline_secs: u64,
    /// Deadline for primary queries backing single-item lookup.
    pub item_deadline_secs: u64,
    /// Deadline for primary queries backing admin views and writes.
    pub admin_deadline_secs: u64,
    /// Lifetime cap for a shared in-flight read before a new caller leads
    /// its own request.
    pub dedup_window_secs: u64,
    /// Cadence of the periodic background resync.
    pub resync_interval_secs: u64,
    /// Most-recent items pulled per content kind during a resync.
    pub resync_window_per_kind: u32,
    /// Maximum items returned by a feed view.
    pub feed_limit: u32,
    pub snapshot_limits: SnapshotLimits,
}

impl Default for AvailabilityConfig {
    fn default() -> Self {
        Self {
            snapshot_path: PathBuf::from(DEFAULT_SNAPSHOT_PATH),
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            public_deadline_secs: DEFAULT_PUBLIC_DEADLINE_SECS,
            item_deadline_secs: DEFAULT_ITEM_DEADLINE_SECS,
            admin_deadline_secs: DEFAULT_ADMIN_DEADLINE_SECS,
            dedup_window_secs: DEFAULT_DEDUP_WINDOW_SECS,
            resync_interval_secs: DEFAULT_RESYNC_INTERVAL_SECS,
            resync_window_per_kind: DEFAULT_RESYNC_WINDOW_PER_KIND,
            feed_limit: DEFAULT_FEED_LIMIT,
            snapshot_limits: SnapshotLimits::default(),
        }
    }
}

impl AvailabilityConfig {
    /// Load settings, layering an optional TOML file under `SCORTA_*`
    /// environment overrides.
    pub fn load(config_file: Option<&Path>) -> Result<Self, SettingsError> {
        let mut builder = Config::builder();

        if let Some(path) = config_file {
            builder = builder.add_source(File::from(path));
        }

        builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

        Ok(builder.build()?.try_deserialize()?)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn public_deadline(&self) -> Duration {
        Duration::from_secs(self.public_deadline_secs)
    }

    pub fn item_deadline(&self) -> Duration {
        Duration::from_secs(self.item_deadline_secs)
    }

    pub fn admin_deadline(&self) -> Duration {
        Duration::from_secs(self.admin_deadline_secs)
    }

    pub fn dedup_window(&self) -> Duration {
        Duration::from_secs(self.dedup_window_secs)
    }

    pub fn resync_interval(&self) -> Duration {
        Duration::from_secs(self.resync_interval_secs)
    }
}
