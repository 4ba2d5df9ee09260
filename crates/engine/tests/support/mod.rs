#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use common::{
    Candle, CandleSeries, Clock, Error, FetchError, LiveQuote, Notifier, QuoteSource, Result,
    Timeframe, Watchlist, Window,
};
use engine::{RefreshOrchestrator, Sleeper};

type Reply = std::result::Result<CandleSeries, FetchError>;

/// Quote source that replays scripted replies per pair. The last reply for a
/// pair repeats forever; unscripted pairs answer `EmptyResult`.
#[derive(Default)]
pub struct ScriptedSource {
    replies: Mutex<HashMap<(String, Timeframe), VecDeque<Reply>>>,
    quotes: Mutex<Option<std::result::Result<Vec<LiveQuote>, FetchError>>>,
    calls: Mutex<Vec<(String, Timeframe)>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(&self, symbol: &str, timeframe: Timeframe, reply: Reply) -> &Self {
        self.replies
            .lock()
            .unwrap()
            .entry((symbol.to_string(), timeframe))
            .or_default()
            .push_back(reply);
        self
    }

    pub fn quotes(&self, quotes: std::result::Result<Vec<LiveQuote>, FetchError>) {
        *self.quotes.lock().unwrap() = Some(quotes);
    }

    pub fn calls(&self) -> Vec<(String, Timeframe)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, symbol: &str, timeframe: Timeframe) -> usize {
        self.calls()
            .iter()
            .filter(|(s, tf)| s == symbol && *tf == timeframe)
            .count()
    }
}

#[async_trait]
impl QuoteSource for ScriptedSource {
    async fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        _window: Window,
    ) -> std::result::Result<CandleSeries, FetchError> {
        self.calls
            .lock()
            .unwrap()
            .push((symbol.to_string(), timeframe));
        let mut replies = self.replies.lock().unwrap();
        match replies.get_mut(&(symbol.to_string(), timeframe)) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) => queue.front().cloned().unwrap(),
            None => Err(FetchError::EmptyResult),
        }
    }

    async fn live_quotes(
        &self,
        symbols: &[String],
    ) -> std::result::Result<Vec<LiveQuote>, FetchError> {
        match self.quotes.lock().unwrap().clone() {
            Some(Ok(quotes)) => Ok(quotes
                .into_iter()
                .filter(|q| symbols.contains(&q.symbol))
                .collect()),
            Some(Err(e)) => Err(e),
            None => Ok(Vec::new()),
        }
    }
}

/// Quote source whose every call takes `delay` of tokio time.
pub struct SlowSource {
    pub delay: Duration,
}

#[async_trait]
impl QuoteSource for SlowSource {
    async fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        _window: Window,
    ) -> std::result::Result<CandleSeries, FetchError> {
        tokio::time::sleep(self.delay).await;
        Ok(rising_series(symbol, timeframe, 25, now()))
    }

    async fn live_quotes(
        &self,
        _symbols: &[String],
    ) -> std::result::Result<Vec<LiveQuote>, FetchError> {
        tokio::time::sleep(self.delay).await;
        Ok(Vec::new())
    }
}

#[derive(Default)]
pub struct RecordingSleeper {
    pub slept: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn durations(&self) -> Vec<Duration> {
        self.slept.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.slept.lock().unwrap().push(duration);
    }
}

pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(PathBuf, String)>>,
    pub fail: bool,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_snapshot(&self, path: &Path, caption: &str) -> Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((path.to_path_buf(), caption.to_string()));
        if self.fail {
            return Err(Error::Notify("chat unreachable".into()));
        }
        Ok(())
    }
}

pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 6, 14, 0, 0).unwrap()
}

/// `n` complete bars ending one bar before `end`, highs and lows rising one
/// pip per bar from 1.1000.
pub fn rising_series(symbol: &str, tf: Timeframe, n: usize, end: DateTime<Utc>) -> CandleSeries {
    let candles = (0..n).map(|i| {
        let ts = end - tf.duration() * (n - i) as i32;
        let high = 1.1000 + 0.0001 * i as f64;
        let low = high - 0.0010;
        Candle::new(ts, low + 0.0002, high, low, high - 0.0002, 100.0, true).unwrap()
    });
    CandleSeries::from_candles(symbol, tf, candles)
}

/// Single bar whose close is `ret` above its open, ending one bar before `end`.
pub fn return_series(symbol: &str, tf: Timeframe, ret: f64, end: DateTime<Utc>) -> CandleSeries {
    let open = 1.0;
    let close = open * (1.0 + ret);
    let candle = Candle::new(
        end - tf.duration(),
        open,
        open.max(close),
        open.min(close),
        close,
        0.0,
        true,
    )
    .unwrap();
    CandleSeries::from_candles(symbol, tf, vec![candle])
}

pub fn watchlist(symbols: &[&str], timeframes: &[Timeframe]) -> Watchlist {
    Watchlist {
        symbols: symbols.iter().map(|s| s.to_string()).collect(),
        timeframes: timeframes.to_vec(),
        request_delay_ms: 0,
        live_quotes: false,
        ..Watchlist::default()
    }
}

pub fn orchestrator(
    source: Arc<ScriptedSource>,
    sleeper: Arc<RecordingSleeper>,
    watchlist: Watchlist,
) -> RefreshOrchestrator {
    RefreshOrchestrator::new(source, sleeper, Arc::new(FixedClock(now())), watchlist)
}

pub fn temp_csv() -> PathBuf {
    std::env::temp_dir().join(format!("fxwatch-{}.csv", uuid::Uuid::new_v4()))
}
