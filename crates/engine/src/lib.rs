pub mod oanda;
pub mod orchestrator;
pub mod retry;
pub mod scheduler;
pub mod sink;
pub mod snapshot;

pub use oanda::OandaClient;
pub use orchestrator::{CycleReport, PairOutcome, RefreshOrchestrator};
pub use retry::{RetryPolicy, Sleeper, TokioSleeper};
pub use scheduler::{CycleOutcome, Scheduler};
pub use sink::{read_snapshot, CsvSink, SnapshotRecord};
pub use snapshot::{Snapshot, SnapshotRow};
