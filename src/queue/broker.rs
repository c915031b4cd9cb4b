use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// A deposit directory handed to a worker, numbered in arrival order
#[derive(Clone, Debug)]
pub struct TaskEnvelope {
    pub seq: u64,
    pub path: PathBuf,
}

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("worker {worker} stopped, deposit {path} was not delivered")]
    WorkerClosed { worker: usize, path: PathBuf },
}

/// TaskBroker distributes deposit directories over the worker pool
///
/// 1. The inbox calls `broker.enqueue(path)` for every new deposit
/// 2. The envelope goes to the next worker channel, round-robin
/// 3. Channels are bounded; a full channel makes `enqueue` wait (backpressure)
pub struct TaskBroker {
    worker_channels: Vec<mpsc::Sender<TaskEnvelope>>,
    next_worker: AtomicUsize,
    next_seq: AtomicU64,
}

impl TaskBroker {
    /// Create a broker with one channel per worker
    ///
    /// Returns the broker and the receivers, one per worker to spawn.
    pub fn new(num_workers: usize, channel_size: usize) -> (Self, Vec<mpsc::Receiver<TaskEnvelope>>) {
        info!(num_workers, channel_size, "Creating TaskBroker with worker channels");

        let mut worker_channels = Vec::with_capacity(num_workers);
        let mut worker_receivers = Vec::with_capacity(num_workers);

        for worker_id in 0..num_workers {
            let (tx, rx) = mpsc::channel(channel_size);
            worker_channels.push(tx);
            worker_receivers.push(rx);
            debug!(worker_id, "Created worker channel");
        }

        let broker = Self {
            worker_channels,
            next_worker: AtomicUsize::new(0),
            next_seq: AtomicU64::new(0),
        };

        (broker, worker_receivers)
    }

    /// Send a deposit to the next worker and return its sequence number
    pub async fn enqueue(&self, path: PathBuf) -> Result<u64, BrokerError> {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let worker_idx =
            self.next_worker.fetch_add(1, Ordering::Relaxed) % self.worker_channels.len();

        let envelope = TaskEnvelope {
            seq,
            path: path.clone(),
        };

        match self.worker_channels[worker_idx].send(envelope).await {
            Ok(()) => {
                debug!(seq, worker_idx, path = %path.display(), "Deposit sent to worker");
                Ok(seq)
            }
            Err(_) => {
                warn!(seq, worker_idx, path = %path.display(), "Worker channel closed, deposit not delivered");
                Err(BrokerError::WorkerClosed {
                    worker: worker_idx,
                    path,
                })
            }
        }
    }

    pub fn num_workers(&self) -> usize {
        self.worker_channels.len()
    }

    /// Check if all worker channels are still open
    pub fn health_check(&self) -> bool {
        self.worker_channels.iter().all(|ch| !ch.is_closed())
    }
}
