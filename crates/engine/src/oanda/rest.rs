use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use common::{
    Candle, CandleSeries, Config, Error, FetchError, LiveQuote, QuoteSource, Result, Timeframe,
    Window,
};

/// REST client for the OANDA v3 instruments and pricing endpoints.
pub struct OandaClient {
    api_key: String,
    base_url: String,
    account_id: Option<String>,
    http: Client,
}

impl OandaClient {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        account_id: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = Client::builder()
            .use_rustls_tls()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Http(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            account_id,
            http,
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        Self::new(
            &cfg.oanda_api_key,
            &cfg.oanda_base_url,
            cfg.oanda_account_id.clone(),
            cfg.request_timeout,
        )
    }

    async fn authorized_get(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<String, FetchError> {
        let url = format!("{}{path}", self.base_url);

        let resp = self
            .http
            .get(&url)
            .bearer_auth(&self.api_key)
            .query(query)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(FetchError::RemoteRejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}

#[async_trait]
impl QuoteSource for OandaClient {
    async fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        window: Window,
    ) -> Result<CandleSeries, FetchError> {
        let mut query = vec![
            ("granularity", timeframe.granularity().to_string()),
            ("price", "M".to_string()),
        ];
        match window {
            Window::Count(n) => query.push(("count", n.to_string())),
            Window::Range { start, end } => {
                query.push(("from", start.to_rfc3339()));
                query.push(("to", end.to_rfc3339()));
            }
        }

        debug!(symbol, timeframe = %timeframe, "Requesting candles from OANDA");
        let body = self
            .authorized_get(&format!("/instruments/{symbol}/candles"), &query)
            .await?;
        parse_candles(symbol, timeframe, &body)
    }

    async fn live_quotes(&self, symbols: &[String]) -> Result<Vec<LiveQuote>, FetchError> {
        let Some(account_id) = &self.account_id else {
            debug!("No OANDA account id configured; skipping live quotes");
            return Ok(Vec::new());
        };
        if symbols.is_empty() {
            return Ok(Vec::new());
        }

        let body = self
            .authorized_get(
                &format!("/accounts/{account_id}/pricing"),
                &[("instruments", symbols.join(","))],
            )
            .await?;
        parse_pricing(&body)
    }
}

// ─── Response parsing ────────────────────────────────────────────────────────

/// Turn an instruments/candles payload into a normalized series.
///
/// Incomplete bars, bars without mid prices and bars that fail OHLC
/// validation are dropped. A payload with nothing usable left is
/// `FetchError::EmptyResult`.
pub fn parse_candles(
    symbol: &str,
    timeframe: Timeframe,
    body: &str,
) -> Result<CandleSeries, FetchError> {
    let resp: CandlesResponse = serde_json::from_str(body).map_err(malformed)?;

    let candles = resp.candles.into_iter().filter(|c| c.complete).filter_map(|c| {
        let mid = c.mid?;
        let parsed = (
            mid.o.parse::<f64>(),
            mid.h.parse::<f64>(),
            mid.l.parse::<f64>(),
            mid.c.parse::<f64>(),
        );
        let (Ok(open), Ok(high), Ok(low), Ok(close)) = parsed else {
            warn!(symbol, time = %c.time, "Unparseable candle prices, dropping");
            return None;
        };
        match Candle::new(c.time, open, high, low, close, c.volume, c.complete) {
            Ok(candle) => Some(candle),
            Err(e) => {
                warn!(symbol, error = %e, "Dropping invalid candle");
                None
            }
        }
    });

    let series = CandleSeries::from_candles(symbol, timeframe, candles);
    if series.is_empty() {
        return Err(FetchError::EmptyResult);
    }
    Ok(series)
}

/// Turn an accounts/pricing payload into quotes, using the best bid and ask.
pub fn parse_pricing(body: &str) -> Result<Vec<LiveQuote>, FetchError> {
    let resp: PricingResponse = serde_json::from_str(body).map_err(malformed)?;

    Ok(resp
        .prices
        .into_iter()
        .filter_map(|p| {
            let bid = p.bids.first()?.price.parse::<f64>().ok()?;
            let ask = p.asks.first()?.price.parse::<f64>().ok()?;
            Some(LiveQuote {
                symbol: p.instrument,
                bid,
                ask,
                time: p.time,
            })
        })
        .collect())
}

fn malformed(e: serde_json::Error) -> FetchError {
    FetchError::RemoteRejected {
        status: 200,
        body: format!("malformed payload: {e}"),
    }
}

#[derive(Deserialize)]
struct CandlesResponse {
    #[serde(default)]
    candles: Vec<CandleItem>,
}

#[derive(Deserialize)]
struct CandleItem {
    complete: bool,
    #[serde(default)]
    volume: f64,
    time: DateTime<Utc>,
    mid: Option<Ohlc>,
}

#[derive(Deserialize)]
struct Ohlc {
    o: String,
    h: String,
    l: String,
    c: String,
}

#[derive(Deserialize)]
struct PricingResponse {
    #[serde(default)]
    prices: Vec<PriceItem>,
}

#[derive(Deserialize)]
struct PriceItem {
    instrument: String,
    time: DateTime<Utc>,
    #[serde(default)]
    bids: Vec<PriceBucket>,
    #[serde(default)]
    asks: Vec<PriceBucket>,
}

#[derive(Deserialize)]
struct PriceBucket {
    price: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    const CANDLES: &str = r#"{
        "instrument": "EUR_USD",
        "granularity": "M5",
        "candles": [
            {"complete": true, "volume": 120, "time": "2024-05-06T10:05:00.000000000Z",
             "mid": {"o": "1.07610", "h": "1.07650", "l": "1.07590", "c": "1.07640"}},
            {"complete": true, "volume": 98, "time": "2024-05-06T10:00:00.000000000Z",
             "mid": {"o": "1.07600", "h": "1.07620", "l": "1.07580", "c": "1.07610"}},
            {"complete": true, "volume": 5, "time": "2024-05-06T10:10:00.000000000Z",
             "mid": {"o": "1.07640", "h": "1.07600", "l": "1.07700", "c": "1.07650"}},
            {"complete": false, "volume": 12, "time": "2024-05-06T10:15:00.000000000Z",
             "mid": {"o": "1.07650", "h": "1.07660", "l": "1.07640", "c": "1.07655"}}
        ]
    }"#;

    #[test]
    fn parses_sorts_and_filters_candles() {
        let series = parse_candles("EUR_USD", Timeframe::M5, CANDLES).unwrap();
        // inverted bar and the incomplete bar are gone
        assert_eq!(series.len(), 2);
        let first = &series.candles()[0];
        assert_eq!(first.timestamp.to_rfc3339(), "2024-05-06T10:00:00+00:00");
        assert!((first.close - 1.07610).abs() < 1e-12);
        assert_eq!(first.volume, 98.0);
        assert!(series.candles().iter().all(|c| c.complete));
    }

    #[test]
    fn only_incomplete_candles_is_empty_result() {
        let body = r#"{"candles": [{"complete": false, "volume": 1,
            "time": "2024-05-06T10:15:00Z",
            "mid": {"o": "1.0", "h": "1.0", "l": "1.0", "c": "1.0"}}]}"#;
        assert_eq!(
            parse_candles("EUR_USD", Timeframe::M5, body),
            Err(FetchError::EmptyResult)
        );
        assert_eq!(
            parse_candles("EUR_USD", Timeframe::M5, r#"{"candles": []}"#),
            Err(FetchError::EmptyResult)
        );
    }

    #[test]
    fn garbage_body_is_rejection() {
        let err = parse_candles("EUR_USD", Timeframe::M5, "<html>").unwrap_err();
        assert!(matches!(err, FetchError::RemoteRejected { .. }));
        assert!(err.is_retryable());
    }

    #[test]
    fn parses_best_bid_and_ask() {
        let body = r#"{"prices": [
            {"instrument": "EUR_USD", "time": "2024-05-06T10:16:01.123456789Z",
             "bids": [{"price": "1.07650", "liquidity": 1000000}],
             "asks": [{"price": "1.07660", "liquidity": 1000000}]},
            {"instrument": "USD_JPY", "time": "2024-05-06T10:16:01Z", "bids": [], "asks": []}
        ]}"#;
        let quotes = parse_pricing(body).unwrap();
        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].symbol, "EUR_USD");
        assert!((quotes[0].mid() - 1.07655).abs() < 1e-9);
    }
}
