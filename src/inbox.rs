//! Inbox poller
//!
//! Every subdirectory of the inbox is a deposit. The poller hands each one to
//! the broker once and keeps it in the in-flight set until a worker is done
//! with it; by then the deposit has been moved to the outbox. A deposit that
//! could not be moved stays in the set until the process restarts.

use crate::observability::Metrics;
use crate::queue::TaskBroker;
use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// Deposits handed out and not yet finished
#[derive(Debug, Default)]
pub struct InFlight {
    paths: Mutex<HashSet<PathBuf>>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if the path is already being processed
    pub fn claim(&self, path: &Path) -> bool {
        self.lock().insert(path.to_path_buf())
    }

    pub fn release(&self, path: &Path) {
        self.lock().remove(path);
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.lock().contains(path)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<PathBuf>> {
        self.paths.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub struct Inbox {
    dir: PathBuf,
    poll_interval: Duration,
    in_flight: Arc<InFlight>,
    metrics: Arc<Metrics>,
}

impl Inbox {
    pub fn new(
        dir: impl Into<PathBuf>,
        poll_interval: Duration,
        in_flight: Arc<InFlight>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            dir: dir.into(),
            poll_interval,
            in_flight,
            metrics,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Poll until `shutdown` flips to true or its sender is dropped
    pub async fn run(&self, broker: &TaskBroker, mut shutdown: watch::Receiver<bool>) {
        info!(inbox = %self.dir.display(), interval_ms = self.poll_interval.as_millis() as u64, "Watching inbox");

        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.scan(broker).await {
                        warn!(inbox = %self.dir.display(), error = %e, "Failed to scan inbox");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Inbox poller stopped");
    }

    /// Hand every new deposit directory to the broker, in name order.
    /// Returns the number of deposits enqueued.
    pub async fn scan(&self, broker: &TaskBroker) -> io::Result<usize> {
        let mut deposits = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                deposits.push(entry.path());
            }
        }
        deposits.sort();

        let mut enqueued = 0;
        for path in deposits {
            if !self.in_flight.claim(&path) {
                continue;
            }

            match broker.enqueue(path.clone()).await {
                Ok(seq) => {
                    debug!(seq, path = %path.display(), "New deposit found");
                    self.metrics.deposit_received();
                    enqueued += 1;
                }
                Err(e) => {
                    error!(error = %e, "Could not hand deposit to a worker");
                    self.in_flight.release(&path);
                }
            }
        }

        Ok(enqueued)
    }
}
