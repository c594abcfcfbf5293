//! Single-flight de-duplication of identical in-flight reads.
//!
//! When multiple callers request the same view concurrently and no fresh
//! cache entry exists, one caller leads the primary query and the rest wait
//! for its result instead of issuing redundant queries. A shared entry only
//! lives for a bounded window; after that a new caller leads again, so one
//! wedged call cannot pin followers forever.

use std::future::Future;
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::broadcast;
use tokio::time::Instant;

struct Inflight<T> {
    started_at: Instant,
    tx: broadcast::Sender<T>,
}

enum Role<T> {
    Leader(broadcast::Sender<T>),
    Follower(broadcast::Receiver<T>),
}

pub struct ReadDedup<T> {
    window: Duration,
    inflight: DashMap<String, Inflight<T>>,
}

impl<T: Clone + Send + 'static> ReadDedup<T> {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            inflight: DashMap::new(),
        }
    }

    /// Run `op` under the given key, sharing one outstanding execution among
    /// concurrent callers. If the leading call is dropped without producing
    /// a result, followers fall back to running `op` themselves.
    pub async fn run<F, Fut>(&self, key: &str, op: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        match self.join(key) {
            Role::Leader(tx) => {
                let value = op().await;
                self.inflight.remove(key);
                // Nobody listening is fine; the value is returned directly.
                let _ = tx.send(value.clone());
                value
            }
            Role::Follower(mut rx) => match rx.recv().await {
                Ok(value) => value,
                Err(_) => op().await,
            },
        }
    }

    fn join(&self, key: &str) -> Role<T> {
        match self.inflight.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().started_at.elapsed() < self.window {
                    Role::Follower(occupied.get().tx.subscribe())
                } else {
                    let (tx, _rx) = broadcast::channel(1);
                    occupied.insert(Inflight {
                        started_at: Instant::now(),
                        tx: tx.clone(),
                    });
                    Role::Leader(tx)
                }
            }
            Entry::Vacant(vacant) => {
                let (tx, _rx) = broadcast::channel(1);
                vacant.insert(Inflight {
                    started_at: Instant::now(),
                    tx: tx.clone(),
                });
                Role::Leader(tx)
            }
        }
    }
}
