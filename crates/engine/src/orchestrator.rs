use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use common::{
    CandleSeries, Clock, CycleState, FetchError, PairState, QuoteSource, Timeframe, Watchlist,
    Window,
};
use features::{correlation_matrix, usd_strength, SeriesFeatures};

use crate::retry::{RetryPolicy, Sleeper};
use crate::snapshot::Snapshot;

/// What happened to one (symbol, timeframe) pair during a cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct PairOutcome {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub state: PairState,
    pub attempts: u32,
    pub error: Option<FetchError>,
    /// Accepted but older than the soft freshness threshold.
    pub delayed: bool,
}

/// Result of one refresh cycle.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub cycle_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub pairs: Vec<PairOutcome>,
    pub quotes_attached: usize,
    /// `None` when no pair succeeded.
    pub snapshot: Option<Snapshot>,
}

impl CycleReport {
    pub fn succeeded(&self) -> usize {
        self.pairs
            .iter()
            .filter(|p| p.state == PairState::Success)
            .count()
    }

    pub fn skipped(&self) -> impl Iterator<Item = &PairOutcome> {
        self.pairs.iter().filter(|p| p.state == PairState::Skipped)
    }

    /// One-paragraph human summary, used as the notification caption.
    pub fn summary(&self) -> String {
        let skipped: Vec<String> = self
            .skipped()
            .map(|p| format!("{} {}", p.symbol, p.timeframe))
            .collect();
        let rows = self.snapshot.as_ref().map_or(0, Snapshot::len);
        let mut text = format!(
            "Market snapshot {}\nPairs: {}/{} ok, rows: {}",
            self.started_at.format("%Y-%m-%d %H:%M UTC"),
            self.succeeded(),
            self.pairs.len(),
            rows,
        );
        if !skipped.is_empty() {
            text.push_str(&format!("\nSkipped: {}", skipped.join(", ")));
        }
        text
    }
}

/// Runs one fetch → features → snapshot pass over the configured matrix.
///
/// Pairs are processed sequentially, symbols outer and timeframes inner, in
/// watchlist order. A failing pair is retried per the [`RetryPolicy`] and
/// then skipped; it never fails the cycle.
pub struct RefreshOrchestrator {
    source: Arc<dyn QuoteSource>,
    sleeper: Arc<dyn Sleeper>,
    clock: Arc<dyn Clock>,
    watchlist: Watchlist,
    retry: RetryPolicy,
    request_delay: Duration,
    live_quotes: bool,
    state: CycleState,
}

impl RefreshOrchestrator {
    pub fn new(
        source: Arc<dyn QuoteSource>,
        sleeper: Arc<dyn Sleeper>,
        clock: Arc<dyn Clock>,
        watchlist: Watchlist,
    ) -> Self {
        Self {
            source,
            sleeper,
            clock,
            retry: RetryPolicy::from_config(&watchlist.retry),
            request_delay: Duration::from_millis(watchlist.request_delay_ms),
            live_quotes: watchlist.live_quotes,
            watchlist,
            state: CycleState::Idle,
        }
    }

    /// Turn live quotes on or off regardless of the watchlist setting.
    pub fn with_live_quotes(mut self, enabled: bool) -> Self {
        self.live_quotes = enabled;
        self
    }

    pub fn state(&self) -> CycleState {
        self.state
    }

    /// Return to `Idle` ahead of the next cycle.
    pub fn reset(&mut self) {
        self.state = CycleState::Idle;
    }

    pub async fn run_cycle(&mut self) -> CycleReport {
        let cycle_id = Uuid::new_v4();
        let span = info_span!("cycle", id = %cycle_id);
        self.run_cycle_inner(cycle_id).instrument(span).await
    }

    async fn run_cycle_inner(&mut self, cycle_id: Uuid) -> CycleReport {
        self.state = CycleState::Running;
        let started_at = self.clock.now();
        let window = self.watchlist.window_at(started_at);
        info!(
            symbols = self.watchlist.symbols.len(),
            timeframes = self.watchlist.timeframes.len(),
            "Refresh cycle started"
        );

        let mut snapshot = Snapshot::new(cycle_id, started_at);
        let mut pairs = Vec::new();
        let mut fetched: Vec<CandleSeries> = Vec::new();
        // index of each fetched series' last snapshot row
        let mut last_rows: Vec<usize> = Vec::new();
        let mut first_request = true;

        let symbols = self.watchlist.symbols.clone();
        let timeframes = self.watchlist.timeframes.clone();
        for symbol in &symbols {
            for &timeframe in &timeframes {
                let mut outcome = PairOutcome {
                    symbol: symbol.clone(),
                    timeframe,
                    state: PairState::Pending,
                    attempts: 0,
                    error: None,
                    delayed: false,
                };

                outcome.state = PairState::Fetching;
                match self
                    .fetch_with_retry(symbol, timeframe, window, &mut outcome, &mut first_request)
                    .await
                {
                    Ok((series, delay_minutes)) => {
                        let features = SeriesFeatures::compute(&series, self.watchlist.atr_period);
                        if let Some(last) = snapshot.push_series(&series, &features, delay_minutes) {
                            fetched.push(series);
                            last_rows.push(last);
                        }
                        outcome.state = PairState::Success;
                    }
                    Err(e) => {
                        warn!(
                            symbol = %symbol,
                            timeframe = %timeframe,
                            attempts = outcome.attempts,
                            error = %e,
                            "Pair skipped this cycle"
                        );
                        outcome.error = Some(e);
                        outcome.state = PairState::Skipped;
                    }
                }
                pairs.push(outcome);
            }
        }

        if fetched.is_empty() {
            warn!("No pair produced data; nothing to persist this cycle");
            self.state = CycleState::Done;
            return CycleReport {
                cycle_id,
                started_at,
                pairs,
                quotes_attached: 0,
                snapshot: None,
            };
        }

        self.attach_cross_features(&mut snapshot, &fetched, &last_rows);
        let quotes_attached = if self.live_quotes {
            self.attach_live_quotes(&mut snapshot, &fetched).await
        } else {
            0
        };

        let report = CycleReport {
            cycle_id,
            started_at,
            pairs,
            quotes_attached,
            snapshot: Some(snapshot),
        };
        info!(
            ok = report.succeeded(),
            skipped = report.skipped().count(),
            quotes = quotes_attached,
            "Refresh cycle finished"
        );
        self.state = CycleState::Done;
        report
    }

    async fn fetch_with_retry(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        window: Window,
        outcome: &mut PairOutcome,
        first_request: &mut bool,
    ) -> Result<(CandleSeries, Option<f64>), FetchError> {
        loop {
            if !std::mem::take(first_request) && !self.request_delay.is_zero() {
                self.sleeper.sleep(self.request_delay).await;
            }
            outcome.attempts += 1;

            let result = match self.source.fetch_candles(symbol, timeframe, window).await {
                Ok(series) if series.is_empty() => Err(FetchError::EmptyResult),
                Ok(series) => self
                    .check_freshness(&series, outcome)
                    .map(|delay| (series, delay)),
                Err(e) => Err(e),
            };

            match result {
                Ok(ok) => return Ok(ok),
                Err(e) if self.retry.should_retry(outcome.attempts, &e) => {
                    let delay = self.retry.delay_for(outcome.attempts);
                    warn!(
                        symbol,
                        timeframe = %timeframe,
                        attempt = outcome.attempts,
                        error = %e,
                        retry_in = ?delay,
                        "Fetch failed, retrying"
                    );
                    self.sleeper.sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Minutes since the latest candle closed, checked against the watchlist
    /// thresholds. Returns the delay to record on the snapshot.
    fn check_freshness(
        &self,
        series: &CandleSeries,
        outcome: &mut PairOutcome,
    ) -> Result<Option<f64>, FetchError> {
        let now = self.clock.now();
        let Some(staleness) = series.staleness(now) else {
            return Err(FetchError::EmptyResult);
        };
        let delay = (staleness - series.timeframe().duration()).num_seconds() as f64 / 60.0;
        let delay = delay.max(0.0);

        let freshness = &self.watchlist.freshness;
        if !freshness.enabled {
            return Ok(Some(delay));
        }
        if delay > freshness.hard_minutes as f64 {
            return Err(FetchError::Stale { minutes: delay });
        }
        if delay > freshness.soft_minutes as f64 {
            outcome.delayed = true;
            warn!(
                symbol = %series.symbol(),
                timeframe = %series.timeframe(),
                delay_minutes = delay,
                "Data delayed but acceptable"
            );
        } else {
            debug!(
                symbol = %series.symbol(),
                timeframe = %series.timeframe(),
                candles = series.len(),
                "Fresh"
            );
        }
        Ok(Some(delay))
    }

    /// USD strength and correlations per timeframe, placed on the last row of
    /// every fetched series of that timeframe.
    fn attach_cross_features(
        &self,
        snapshot: &mut Snapshot,
        fetched: &[CandleSeries],
        last_rows: &[usize],
    ) {
        let timeframes: BTreeSet<Timeframe> = fetched.iter().map(CandleSeries::timeframe).collect();

        for timeframe in timeframes {
            let strength = usd_strength(fetched, timeframe, &self.watchlist.usd_basket);
            let matrix = correlation_matrix(fetched, timeframe);
            debug!(
                timeframe = %timeframe,
                usd_strength = strength,
                correlations = matrix.len(),
                "Cross-symbol features"
            );

            for (series, &last) in fetched.iter().zip(last_rows) {
                if series.timeframe() == timeframe {
                    snapshot.attach_cross(last, strength, &matrix);
                }
            }
        }
    }

    async fn attach_live_quotes(
        &self,
        snapshot: &mut Snapshot,
        fetched: &[CandleSeries],
    ) -> usize {
        let symbols: Vec<String> = fetched
            .iter()
            .map(|s| s.symbol().to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        if !self.request_delay.is_zero() {
            self.sleeper.sleep(self.request_delay).await;
        }
        match self.source.live_quotes(&symbols).await {
            Ok(quotes) => quotes
                .into_iter()
                .map(|q| snapshot.attach_quote(q))
                .filter(|&attached| attached)
                .count(),
            Err(e) => {
                warn!(error = %e, "Live quotes unavailable this cycle");
                0
            }
        }
    }
}
