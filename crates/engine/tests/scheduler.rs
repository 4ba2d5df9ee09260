mod support;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use common::{FetchError, Notifier, Timeframe};
use engine::{read_snapshot, CsvSink, CycleOutcome, RefreshOrchestrator, Scheduler};

use support::*;

fn scheduler(
    source: Arc<ScriptedSource>,
    notifier: Option<Arc<dyn Notifier>>,
) -> (Scheduler, PathBuf) {
    let path = temp_csv();
    let orch = orchestrator(
        source,
        Arc::new(RecordingSleeper::default()),
        watchlist(&["EUR_USD"], &[Timeframe::M5]),
    );
    let sched = Scheduler::new(orch, CsvSink::new(&path), notifier, Duration::from_secs(900));
    (sched, path)
}

fn healthy_source() -> Arc<ScriptedSource> {
    let source = Arc::new(ScriptedSource::new());
    source.reply(
        "EUR_USD",
        Timeframe::M5,
        Ok(rising_series("EUR_USD", Timeframe::M5, 25, now())),
    );
    source
}

#[tokio::test]
async fn delivers_snapshot_with_summary_caption() {
    let notifier = Arc::new(RecordingNotifier::default());
    let (mut sched, path) = scheduler(healthy_source(), Some(notifier.clone()));

    let outcome = sched.run_once().await;
    assert_eq!(
        outcome,
        CycleOutcome::Delivered {
            path: path.clone(),
            rows: 25
        }
    );

    let sent = notifier.sent.lock().unwrap().clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, path);
    assert!(sent[0].1.contains("Pairs: 1/1 ok, rows: 25"));

    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn notifier_failure_keeps_the_file() {
    let notifier = Arc::new(RecordingNotifier {
        fail: true,
        ..Default::default()
    });
    let (mut sched, path) = scheduler(healthy_source(), Some(notifier.clone()));

    let outcome = sched.run_once().await;
    assert_eq!(
        outcome,
        CycleOutcome::Persisted {
            path: path.clone(),
            rows: 25
        }
    );
    assert_eq!(read_snapshot(&path).unwrap().len(), 25);

    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn no_data_sends_nothing() {
    let source = Arc::new(ScriptedSource::new());
    source.reply(
        "EUR_USD",
        Timeframe::M5,
        Err(FetchError::Transport("down".into())),
    );
    let notifier = Arc::new(RecordingNotifier::default());
    let (mut sched, path) = scheduler(source, Some(notifier.clone()));

    assert_eq!(sched.run_once().await, CycleOutcome::NoData);
    assert!(notifier.sent.lock().unwrap().is_empty());
    assert!(!path.exists());
}

#[tokio::test]
async fn without_notifier_snapshot_is_only_persisted() {
    let (mut sched, path) = scheduler(healthy_source(), None);

    let outcome = sched.run_once().await;
    assert!(matches!(outcome, CycleOutcome::Persisted { rows: 25, .. }));
    assert!(path.exists());

    let _ = std::fs::remove_file(&path);
}

#[tokio::test(start_paused = true)]
async fn overrunning_cycle_times_out_without_writing() {
    let path = temp_csv();
    let notifier = Arc::new(RecordingNotifier::default());
    let orch = RefreshOrchestrator::new(
        Arc::new(SlowSource {
            delay: Duration::from_secs(60),
        }),
        Arc::new(RecordingSleeper::default()),
        Arc::new(FixedClock(now())),
        watchlist(&["EUR_USD"], &[Timeframe::M5]),
    );
    let mut sched = Scheduler::new(
        orch,
        CsvSink::new(&path),
        Some(notifier.clone()),
        Duration::from_secs(900),
    )
    .with_cycle_timeout(Some(Duration::from_secs(5)));

    assert_eq!(sched.run_once().await, CycleOutcome::TimedOut);
    assert!(!path.exists());
    assert!(notifier.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn unwritable_path_skips_notification() {
    // parent of the target is a regular file, so the directory cannot exist
    let blocker = temp_csv();
    std::fs::write(&blocker, "not a directory").unwrap();
    let path = blocker.join("market_snapshot.csv");

    let notifier = Arc::new(RecordingNotifier::default());
    let orch = orchestrator(
        healthy_source(),
        Arc::new(RecordingSleeper::default()),
        watchlist(&["EUR_USD"], &[Timeframe::M5]),
    );
    let mut sched = Scheduler::new(
        orch,
        CsvSink::new(&path),
        Some(notifier.clone()),
        Duration::from_secs(900),
    );

    assert_eq!(sched.run_once().await, CycleOutcome::PersistFailed);
    assert!(notifier.sent.lock().unwrap().is_empty());

    let _ = std::fs::remove_file(&blocker);
}
