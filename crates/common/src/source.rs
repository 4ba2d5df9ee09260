use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{CandleSeries, FetchError, LiveQuote, Result, Timeframe, Window};

/// Abstraction over the remote market-data service.
///
/// `OandaClient` implements this against the OANDA v3 REST API. Tests use a
/// scripted in-memory source. Implementations never retry; the refresh
/// orchestrator owns the retry policy so it is uniform across providers.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Fetch complete candles for one pair, sorted ascending and deduplicated.
    async fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        window: Window,
    ) -> Result<CandleSeries, FetchError>;

    /// Current bid/ask for each symbol the provider knows about.
    /// Symbols missing from the response are simply absent from the result.
    async fn live_quotes(&self, symbols: &[String]) -> Result<Vec<LiveQuote>, FetchError>;
}

/// Delivers a written snapshot file to its destination (a chat, a channel).
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_snapshot(&self, path: &Path, caption: &str) -> Result<()>;
}

/// Source of "now", injected so freshness checks are testable.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
