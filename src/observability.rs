//! Tracing setup and outcome counters

use crate::deposit::State;
use crate::task::TaskReport;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::EnvFilter;

/// Install the global subscriber; `RUST_LOG` overrides the `info` default
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Counters of deposit outcomes
#[derive(Debug, Default)]
pub struct Metrics {
    deposits_received: AtomicU64,
    deposits_accepted: AtomicU64,
    deposits_rejected: AtomicU64,
    deposits_failed: AtomicU64,
    deposits_unrecoverable: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deposit_received(&self) {
        self.deposits_received.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "deposits_received", "Metric incremented");
    }

    pub fn record(&self, report: &TaskReport) {
        let counter = match report.state {
            State::Accepted => &self.deposits_accepted,
            State::Rejected => &self.deposits_rejected,
            State::Failed | State::Pending => &self.deposits_failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);

        if report.is_unrecoverable() {
            self.deposits_unrecoverable.fetch_add(1, Ordering::Relaxed);
        }
        tracing::debug!(state = %report.state, "Outcome recorded");
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            deposits_received: self.deposits_received.load(Ordering::Relaxed),
            deposits_accepted: self.deposits_accepted.load(Ordering::Relaxed),
            deposits_rejected: self.deposits_rejected.load(Ordering::Relaxed),
            deposits_failed: self.deposits_failed.load(Ordering::Relaxed),
            deposits_unrecoverable: self.deposits_unrecoverable.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub deposits_received: u64,
    pub deposits_accepted: u64,
    pub deposits_rejected: u64,
    pub deposits_failed: u64,
    pub deposits_unrecoverable: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn report(state: State, moved: bool) -> TaskReport {
        TaskReport {
            path: PathBuf::from("/inbox/d"),
            state,
            message: String::new(),
            archive: None,
            moved_to: moved.then(|| PathBuf::from("/outbox/d")),
        }
    }

    #[test]
    fn test_record_outcomes() {
        let metrics = Metrics::new();
        metrics.deposit_received();
        metrics.record(&report(State::Accepted, true));
        metrics.record(&report(State::Rejected, true));
        metrics.record(&report(State::Failed, true));
        metrics.record(&report(State::Failed, false));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.deposits_received, 1);
        assert_eq!(snapshot.deposits_accepted, 1);
        assert_eq!(snapshot.deposits_rejected, 1);
        assert_eq!(snapshot.deposits_failed, 2);
        assert_eq!(snapshot.deposits_unrecoverable, 1);
    }
}
