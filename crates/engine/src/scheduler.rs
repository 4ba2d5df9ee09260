use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use common::Notifier;

use crate::orchestrator::RefreshOrchestrator;
use crate::sink::CsvSink;

/// How a single scheduled cycle ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Written and sent to the notifier.
    Delivered { path: PathBuf, rows: usize },
    /// Written, but there was no notifier or the upload failed.
    Persisted { path: PathBuf, rows: usize },
    /// No pair succeeded; nothing written, nothing sent.
    NoData,
    /// Writing the file failed; nothing sent.
    PersistFailed,
    /// The cycle overran its deadline and was abandoned.
    TimedOut,
}

/// Drives the orchestrator on a fixed interval for the life of the process.
pub struct Scheduler {
    orchestrator: RefreshOrchestrator,
    sink: CsvSink,
    notifier: Option<Arc<dyn Notifier>>,
    interval: Duration,
    cycle_timeout: Option<Duration>,
}

impl Scheduler {
    pub fn new(
        orchestrator: RefreshOrchestrator,
        sink: CsvSink,
        notifier: Option<Arc<dyn Notifier>>,
        interval: Duration,
    ) -> Self {
        Self {
            orchestrator,
            sink,
            notifier,
            interval,
            cycle_timeout: None,
        }
    }

    pub fn with_cycle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.cycle_timeout = timeout;
        self
    }

    /// Run one cycle immediately, then one per interval, forever.
    /// A slow cycle delays the next tick rather than stacking ticks up.
    pub async fn run(mut self) {
        info!(interval = ?self.interval, path = %self.sink.path().display(), "Scheduler running");
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let outcome = self.run_once().await;
            info!(?outcome, "Cycle complete; waiting for next tick");
        }
    }

    /// Fetch, persist and notify once. Never panics and never returns an error;
    /// every failure is logged and reflected in the outcome.
    pub async fn run_once(&mut self) -> CycleOutcome {
        self.orchestrator.reset();

        let report = match self.cycle_timeout {
            Some(limit) => match tokio::time::timeout(limit, self.orchestrator.run_cycle()).await {
                Ok(report) => report,
                Err(_) => {
                    warn!(timeout = ?limit, "Refresh cycle timed out; abandoning it");
                    return CycleOutcome::TimedOut;
                }
            },
            None => self.orchestrator.run_cycle().await,
        };

        let Some(snapshot) = report.snapshot.as_ref() else {
            return CycleOutcome::NoData;
        };
        let rows = snapshot.len();

        let path = match self.sink.persist(snapshot) {
            Ok(path) => path,
            Err(e) => {
                error!(error = %e, path = %self.sink.path().display(), "Failed to write snapshot");
                return CycleOutcome::PersistFailed;
            }
        };

        let Some(notifier) = &self.notifier else {
            return CycleOutcome::Persisted { path, rows };
        };
        match notifier.send_snapshot(&path, &report.summary()).await {
            Ok(()) => {
                info!(path = %path.display(), "Snapshot delivered");
                CycleOutcome::Delivered { path, rows }
            }
            Err(e) => {
                error!(error = %e, "Failed to deliver snapshot; file left in place");
                CycleOutcome::Persisted { path, rows }
            }
        }
    }

    pub fn orchestrator(&self) -> &RefreshOrchestrator {
        &self.orchestrator
    }
}
