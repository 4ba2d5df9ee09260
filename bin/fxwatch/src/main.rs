use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use common::{Config, Notifier, SystemClock, Watchlist};
use engine::{CsvSink, CycleOutcome, OandaClient, RefreshOrchestrator, Scheduler, TokioSleeper};
use telegram_notify::TelegramNotifier;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Logging ──────────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // `--once` runs a single cycle and exits with its outcome.
    let once = std::env::args().skip(1).any(|a| a == "--once");

    // ── Config ────────────────────────────────────────────────────────────────
    let cfg = Config::from_env().context("invalid configuration")?;
    info!(
        environment = %cfg.oanda_environment,
        interval = ?cfg.refresh_interval,
        path = %cfg.snapshot_path.display(),
        "FxWatch starting"
    );

    let watchlist = match &cfg.watchlist_path {
        Some(path) => Watchlist::load(path)
            .with_context(|| format!("failed to load watchlist {}", path.display()))?,
        None => {
            info!("WATCHLIST_PATH not set; using built-in watchlist");
            Watchlist::default()
        }
    };
    info!(
        symbols = watchlist.symbols.len(),
        timeframes = watchlist.timeframes.len(),
        "Watchlist loaded"
    );

    // ── Market data ───────────────────────────────────────────────────────────
    let live_quotes = watchlist.live_quotes && cfg.oanda_account_id.is_some();
    if watchlist.live_quotes && !live_quotes {
        warn!("OANDA_ACCOUNT_ID not set; live quotes disabled");
    }
    let source = Arc::new(OandaClient::from_config(&cfg).context("failed to build OANDA client")?);
    let orchestrator = RefreshOrchestrator::new(
        source,
        Arc::new(TokioSleeper),
        Arc::new(SystemClock),
        watchlist,
    )
    .with_live_quotes(live_quotes);

    // ── Telegram ──────────────────────────────────────────────────────────────
    let telegram = match &cfg.telegram {
        Some(target) => Some(Arc::new(
            TelegramNotifier::from_target(target).context("invalid Telegram settings")?,
        )),
        None => {
            warn!("TELEGRAM_TOKEN / TELEGRAM_CHAT_ID not set; snapshots will only be written to disk");
            None
        }
    };
    let notifier = telegram.clone().map(|t| t as Arc<dyn Notifier>);

    let mut scheduler = Scheduler::new(
        orchestrator,
        CsvSink::new(&cfg.snapshot_path),
        notifier,
        cfg.refresh_interval,
    )
    .with_cycle_timeout(cfg.cycle_timeout);

    if once {
        let outcome = scheduler.run_once().await;
        info!(?outcome, "Single cycle finished");
        return match outcome {
            CycleOutcome::Delivered { .. } | CycleOutcome::Persisted { .. } => Ok(()),
            other => anyhow::bail!("cycle did not produce a snapshot: {other:?}"),
        };
    }

    if let Some(bot) = &telegram {
        if let Err(e) = bot.send_text("FxWatch started").await {
            warn!(error = %e, "Startup notice not delivered");
        }
    }

    // ── Run until Ctrl-C ──────────────────────────────────────────────────────
    tokio::select! {
        _ = scheduler.run() => {}
        res = tokio::signal::ctrl_c() => {
            res.context("failed to listen for shutdown signal")?;
            info!("Shutdown signal received. Exiting.");
        }
    }
    Ok(())
}
