use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Candle duration. The provider granularity and the short label used in
/// snapshots are both derived from the variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Timeframe {
    M5,
    M15,
    H1,
    H4,
    D1,
}

impl Timeframe {
    pub const ALL: [Timeframe; 5] = [
        Timeframe::M5,
        Timeframe::M15,
        Timeframe::H1,
        Timeframe::H4,
        Timeframe::D1,
    ];

    pub fn minutes(self) -> i64 {
        match self {
            Timeframe::M5 => 5,
            Timeframe::M15 => 15,
            Timeframe::H1 => 60,
            Timeframe::H4 => 240,
            Timeframe::D1 => 1440,
        }
    }

    pub fn duration(self) -> Duration {
        Duration::minutes(self.minutes())
    }

    /// OANDA `granularity` query value.
    pub fn granularity(self) -> &'static str {
        match self {
            Timeframe::M5 => "M5",
            Timeframe::M15 => "M15",
            Timeframe::H1 => "H1",
            Timeframe::H4 => "H4",
            Timeframe::D1 => "D",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Timeframe::M5 => "5m",
            Timeframe::M15 => "15m",
            Timeframe::H1 => "1h",
            Timeframe::H4 => "4h",
            Timeframe::D1 => "1d",
        }
    }
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for Timeframe {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "5m" | "M5" => Ok(Timeframe::M5),
            "15m" | "M15" => Ok(Timeframe::M15),
            "1h" | "H1" => Ok(Timeframe::H1),
            "4h" | "H4" => Ok(Timeframe::H4),
            "1d" | "D" | "D1" => Ok(Timeframe::D1),
            other => Err(Error::Config(format!("unknown timeframe '{other}'"))),
        }
    }
}

impl TryFrom<String> for Timeframe {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Timeframe> for String {
    fn from(tf: Timeframe) -> Self {
        tf.label().to_string()
    }
}

/// How much history to request for one pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    /// Half-open `[start, end)` range.
    Range {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    /// The most recent `n` candles.
    Count(u32),
}

/// One fixed-duration price summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Zero when the provider does not report volume.
    pub volume: f64,
    /// False while the interval is still forming.
    pub complete: bool,
}

impl Candle {
    /// Build a candle, rejecting non-finite or negative prices and any
    /// violation of `low <= min(open, close) <= max(open, close) <= high`.
    pub fn new(
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
        complete: bool,
    ) -> Result<Self> {
        let prices = [open, high, low, close];
        if prices.iter().any(|p| !p.is_finite() || *p < 0.0) {
            return Err(Error::InvalidCandle(format!(
                "{timestamp}: prices must be finite and non-negative"
            )));
        }
        if !(low <= open.min(close) && open.max(close) <= high) {
            return Err(Error::InvalidCandle(format!(
                "{timestamp}: OHLC out of order (o={open} h={high} l={low} c={close})"
            )));
        }
        Ok(Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume: if volume.is_finite() && volume > 0.0 { volume } else { 0.0 },
            complete,
        })
    }

    /// Fractional close-vs-open move of this bar.
    pub fn body_return(&self) -> Option<f64> {
        (self.open != 0.0).then(|| (self.close - self.open) / self.open)
    }
}

/// Complete candles for one (symbol, timeframe), strictly ascending by
/// timestamp with no duplicates.
#[derive(Debug, Clone, PartialEq)]
pub struct CandleSeries {
    symbol: String,
    timeframe: Timeframe,
    candles: Vec<Candle>,
}

impl CandleSeries {
    pub fn new(symbol: impl Into<String>, timeframe: Timeframe) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe,
            candles: Vec::new(),
        }
    }

    /// Normalize raw provider candles: drops incomplete bars, sorts by time and
    /// keeps the first candle seen for each timestamp.
    pub fn from_candles(
        symbol: impl Into<String>,
        timeframe: Timeframe,
        candles: impl IntoIterator<Item = Candle>,
    ) -> Self {
        let mut candles: Vec<Candle> = candles.into_iter().filter(|c| c.complete).collect();
        candles.sort_by_key(|c| c.timestamp);
        candles.dedup_by_key(|c| c.timestamp);
        Self {
            symbol: symbol.into(),
            timeframe,
            candles,
        }
    }

    /// Insert a candle at its time position. Returns `false` (and leaves the
    /// series untouched) for incomplete candles or an already-present timestamp.
    pub fn append(&mut self, candle: Candle) -> bool {
        if !candle.complete {
            return false;
        }
        match self
            .candles
            .binary_search_by_key(&candle.timestamp, |c| c.timestamp)
        {
            Ok(_) => false,
            Err(idx) => {
                self.candles.insert(idx, candle);
                true
            }
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.close).collect()
    }

    /// `now - last timestamp`, or `None` for an empty series.
    ///
    /// This is measured from the bar's open. The refresh orchestrator
    /// subtracts one timeframe to judge freshness from the bar's close.
    pub fn staleness(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.last().map(|c| now - c.timestamp)
    }

    pub fn into_candles(self) -> Vec<Candle> {
        self.candles
    }
}

/// Bid/ask captured once per cycle for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveQuote {
    pub symbol: String,
    pub bid: f64,
    pub ask: f64,
    pub time: DateTime<Utc>,
}

impl LiveQuote {
    pub fn mid(&self) -> f64 {
        (self.bid + self.ask) / 2.0
    }
}

/// Which OANDA trading endpoint the credentials belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TradingEnvironment {
    #[default]
    Practice,
    Live,
}

impl TradingEnvironment {
    pub fn rest_base_url(self) -> &'static str {
        match self {
            TradingEnvironment::Practice => "https://api-fxpractice.oanda.com/v3",
            TradingEnvironment::Live => "https://api-fxtrade.oanda.com/v3",
        }
    }
}

impl std::fmt::Display for TradingEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradingEnvironment::Practice => write!(f, "practice"),
            TradingEnvironment::Live => write!(f, "live"),
        }
    }
}

/// Refresh cycle lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CycleState {
    #[default]
    Idle,
    Running,
    Done,
}

impl std::fmt::Display for CycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CycleState::Idle => write!(f, "idle"),
            CycleState::Running => write!(f, "running"),
            CycleState::Done => write!(f, "done"),
        }
    }
}

/// Per-pair progress inside one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairState {
    Pending,
    Fetching,
    Success,
    Skipped,
}
