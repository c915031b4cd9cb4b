//! Worker loop - runs the conversion for every deposit on its channel

use crate::inbox::InFlight;
use crate::observability::Metrics;
use crate::queue::TaskEnvelope;
use crate::task::ConversionTask;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

/// Drain `receiver` until the broker is dropped
pub async fn run_worker(
    worker_id: usize,
    mut receiver: mpsc::Receiver<TaskEnvelope>,
    task: Arc<ConversionTask>,
    metrics: Arc<Metrics>,
    in_flight: Arc<InFlight>,
) {
    info!(worker_id, "Worker started");

    while let Some(envelope) = receiver.recv().await {
        debug!(worker_id, seq = envelope.seq, path = %envelope.path.display(), "Worker picked up deposit");

        let report = task.run(&envelope.path).await;
        metrics.record(&report);

        // An unrecoverable deposit stays claimed so the inbox does not hand it out again
        if report.is_unrecoverable() {
            error!(
                worker_id,
                path = %report.path.display(),
                state = %report.state,
                "Deposit left in inbox, operator intervention required"
            );
            continue;
        }

        info!(worker_id, seq = envelope.seq, state = %report.state, "Deposit done");
        in_flight.release(&envelope.path);
    }

    info!(worker_id, "Worker channel closed, stopping");
}
