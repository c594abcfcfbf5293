//! Deadline-bounded client over the primary data source.
//!
//! Every call races against a deadline; on expiry the in-flight future is
//! dropped (best-effort cancellation) and the caller takes the fallback
//! path immediately. Transport errors get one immediate retry; timeouts do
//! not, because the deadline is already spent.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::application::error::UpstreamError;
use crate::application::repos::{ContentRepo, RecentQuery, RepoError};
use crate::domain::content::ContentItem;

const TARGET: &str = "scorta::primary";

#[derive(Clone)]
pub struct DeadlineClient {
    repo: Arc<dyn ContentRepo>,
}

impl DeadlineClient {
    pub fn new(repo: Arc<dyn ContentRepo>) -> Self {
        Self { repo }
    }

    pub async fn list_recent(
        &self,
        query: RecentQuery,
        deadline: Duration,
    ) -> Result<Vec<ContentItem>, UpstreamError> {
        self.call("list_recent", deadline, || self.repo.list_recent(query))
            .await
    }

    pub async fn find_by_id(
        &self,
        id: Uuid,
        deadline: Duration,
    ) -> Result<Option<ContentItem>, UpstreamError> {
        self.call("find_by_id", deadline, || self.repo.find_by_id(id))
            .await
    }

    /// Write calls surface the raw repository error so the coordinator can
    /// distinguish conflicts from unavailability; only the deadline racing
    /// is shared with the read path.
    pub async fn insert_item(
        &self,
        item: &ContentItem,
        deadline: Duration,
    ) -> Result<(), WriteCallError> {
        self.write_call("insert_item", deadline, || self.repo.insert_item(item))
            .await
    }

    pub async fn update_item(
        &self,
        item: &ContentItem,
        deadline: Duration,
    ) -> Result<(), WriteCallError> {
        self.write_call("update_item", deadline, || self.repo.update_item(item))
            .await
    }

    pub async fn delete_item(&self, id: Uuid, deadline: Duration) -> Result<bool, WriteCallError> {
        self.write_call("delete_item", deadline, || self.repo.delete_item(id))
            .await
    }

    /// Race `op` against the deadline, retrying once on a transport error.
    async fn call<T, F, Fut>(
        &self,
        op_name: &'static str,
        deadline: Duration,
        mut op: F,
    ) -> Result<T, UpstreamError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RepoError>>,
    {
        let started = tokio::time::Instant::now();

        match timeout(deadline, op()).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => {
                debug!(target: TARGET, op = op_name, error = %err, "primary call failed, retrying once");
                let remaining = deadline.saturating_sub(started.elapsed());
                if remaining.is_zero() {
                    return Err(UpstreamError::Timeout { deadline });
                }
                match timeout(remaining, op()).await {
                    Ok(Ok(value)) => Ok(value),
                    Ok(Err(retry_err)) => {
                        warn!(target: TARGET, op = op_name, error = %retry_err, "primary call failed after retry");
                        Err(UpstreamError::unavailable(retry_err.to_string()))
                    }
                    Err(_) => Err(UpstreamError::Timeout { deadline }),
                }
            }
            Err(_) => {
                debug!(target: TARGET, op = op_name, ?deadline, "primary call timed out");
                Err(UpstreamError::Timeout { deadline })
            }
        }
    }

    /// Deadline racing without the retry: writes must not be replayed
    /// blindly, a second insert after an ambiguous failure could duplicate.
    async fn write_call<T, F, Fut>(
        &self,
        op_name: &'static str,
        deadline: Duration,
        op: F,
    ) -> Result<T, WriteCallError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, RepoError>>,
    {
        match timeout(deadline, op()).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(WriteCallError::Repo(err)),
            Err(_) => {
                debug!(target: TARGET, op = op_name, ?deadline, "primary write timed out");
                Err(WriteCallError::Upstream(UpstreamError::Timeout { deadline }))
            }
        }
    }
}

/// Outcome of a deadline-raced write against the primary.
#[derive(Debug)]
pub enum WriteCallError {
    Repo(RepoError),
    Upstream(UpstreamError),
}
