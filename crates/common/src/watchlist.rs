use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result, Timeframe, Window};

/// Longest `lookback_days` range accepted.
pub const MAX_LOOKBACK_DAYS: u32 = 3650;

/// The (symbol, timeframe) matrix and pipeline tuning, loaded from TOML.
///
/// Example `config/watchlist.toml`:
/// ```toml
/// symbols = ["EUR_USD", "USD_JPY"]
/// timeframes = ["5m", "1h"]
/// candle_count = 500
///
/// [retry]
/// max_attempts = 3
/// delay_ms = 2000
///
/// [freshness]
/// soft_minutes = 10
/// hard_minutes = 120
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Watchlist {
    /// Provider instrument identifiers, iterated in this order.
    pub symbols: Vec<String>,
    /// Iterated in this order inside each symbol.
    pub timeframes: Vec<Timeframe>,
    /// Number of most recent candles to request. Ignored when
    /// `lookback_days` is set.
    pub candle_count: u32,
    /// Request an explicit `[now - days, now)` range instead of a count.
    pub lookback_days: Option<u32>,
    /// USD pairs averaged into the dollar-strength score.
    pub usd_basket: Vec<String>,
    pub atr_period: usize,
    pub retry: RetryConfig,
    /// Pause between consecutive provider calls.
    pub request_delay_ms: u64,
    pub freshness: FreshnessConfig,
    /// Fetch bid/ask once per cycle (needs `OANDA_ACCOUNT_ID`).
    pub live_quotes: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FreshnessConfig {
    pub enabled: bool,
    /// Beyond this the series is accepted but logged as delayed.
    pub soft_minutes: i64,
    /// Beyond this the pair is skipped for the cycle.
    pub hard_minutes: i64,
}

impl Default for Watchlist {
    fn default() -> Self {
        Self {
            symbols: [
                "EUR_USD", "GBP_USD", "USD_JPY", "USD_CHF", "AUD_USD", "NZD_USD", "USD_CAD",
                "EUR_GBP", "XAU_USD", "XAG_USD", "BCO_USD", "NAS100_USD",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            timeframes: Timeframe::ALL.to_vec(),
            candle_count: 500,
            lookback_days: None,
            usd_basket: [
                "EUR_USD", "GBP_USD", "AUD_USD", "NZD_USD", "USD_JPY", "USD_CHF", "USD_CAD",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            atr_period: 14,
            retry: RetryConfig::default(),
            request_delay_ms: 150,
            freshness: FreshnessConfig::default(),
            live_quotes: true,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_ms: 2000,
        }
    }
}

impl Default for FreshnessConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            soft_minutes: 10,
            hard_minutes: 120,
        }
    }
}

impl Watchlist {
    /// Load from a TOML file and validate it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read watchlist at '{}': {e}", path.display()))
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let watchlist: Watchlist = toml::from_str(content)?;
        watchlist.validate()?;
        Ok(watchlist)
    }

    fn validate(&self) -> Result<()> {
        if self.symbols.is_empty() {
            return Err(Error::Config("watchlist has no symbols".into()));
        }
        if self.timeframes.is_empty() {
            return Err(Error::Config("watchlist has no timeframes".into()));
        }
        if self.retry.max_attempts == 0 {
            return Err(Error::Config("retry.max_attempts must be at least 1".into()));
        }
        if self.atr_period == 0 {
            return Err(Error::Config("atr_period must be at least 1".into()));
        }
        if let Some(days) = self.lookback_days {
            if days == 0 || days > MAX_LOOKBACK_DAYS {
                return Err(Error::Config(format!(
                    "lookback_days must be between 1 and {MAX_LOOKBACK_DAYS}, got {days}"
                )));
            }
        }
        if self.lookback_days.is_none() && self.candle_count == 0 {
            return Err(Error::Config("candle_count must be positive".into()));
        }
        if self.freshness.soft_minutes > self.freshness.hard_minutes {
            return Err(Error::Config(
                "freshness.soft_minutes exceeds freshness.hard_minutes".into(),
            ));
        }
        Ok(())
    }

    /// The request window for a cycle starting at `now`.
    pub fn window_at(&self, now: DateTime<Utc>) -> Window {
        match self.lookback_days {
            Some(days) => Window::Range {
                start: now - Duration::days(i64::from(days)),
                end: now,
            },
            None => Window::Count(self.candle_count),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let w = Watchlist::parse("").unwrap();
        assert_eq!(w.symbols.len(), 12);
        assert_eq!(w.timeframes, Timeframe::ALL.to_vec());
        assert_eq!(w.retry.max_attempts, 3);
        assert_eq!(w.freshness.hard_minutes, 120);
    }

    #[test]
    fn parses_partial_overrides() {
        let w = Watchlist::parse(
            r#"
            symbols = ["EUR_USD"]
            timeframes = ["M15", "4h"]
            lookback_days = 7

            [retry]
            max_attempts = 5
            "#,
        )
        .unwrap();
        assert_eq!(w.symbols, vec!["EUR_USD".to_string()]);
        assert_eq!(w.timeframes, vec![Timeframe::M15, Timeframe::H4]);
        assert_eq!(w.retry.max_attempts, 5);
        assert_eq!(w.retry.delay_ms, 2000);

        let now = Utc::now();
        assert_eq!(
            w.window_at(now),
            Window::Range {
                start: now - Duration::days(7),
                end: now
            }
        );
    }

    #[test]
    fn rejects_unknown_timeframe_and_zero_attempts() {
        assert!(Watchlist::parse(r#"timeframes = ["2h"]"#).is_err());
        assert!(Watchlist::parse("[retry]\nmax_attempts = 0").is_err());
    }

    #[test]
    fn rejects_out_of_range_lookback() {
        assert!(matches!(
            Watchlist::parse("lookback_days = 4000000000"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            Watchlist::parse("lookback_days = 0"),
            Err(Error::Config(_))
        ));

        let w = Watchlist::parse(&format!("lookback_days = {MAX_LOOKBACK_DAYS}")).unwrap();
        let now = Utc::now();
        assert!(matches!(w.window_at(now), Window::Range { end, .. } if end == now));
    }
}
