//! Conversion worker pool
//!
//! One tokio task per broker channel. Each worker converts its deposits one
//! at a time; the heavy lifting runs on the blocking pool.

pub mod runner;

pub use runner::run_worker;

use crate::inbox::InFlight;
use crate::observability::Metrics;
use crate::queue::TaskEnvelope;
use crate::task::ConversionTask;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::error;

pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn one worker per receiver
    pub fn spawn(
        receivers: Vec<mpsc::Receiver<TaskEnvelope>>,
        task: Arc<ConversionTask>,
        metrics: Arc<Metrics>,
        in_flight: Arc<InFlight>,
    ) -> Self {
        let handles = receivers
            .into_iter()
            .enumerate()
            .map(|(worker_id, receiver)| {
                tokio::spawn(run_worker(
                    worker_id,
                    receiver,
                    Arc::clone(&task),
                    Arc::clone(&metrics),
                    Arc::clone(&in_flight),
                ))
            })
            .collect();

        Self { handles }
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Wait for every worker to drain its channel
    pub async fn join(self) {
        for (worker_id, handle) in self.handles.into_iter().enumerate() {
            if let Err(e) = handle.await {
                error!(worker_id, error = %e, "Worker panicked");
            }
        }
    }
}
