use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Notification failed: {0}")]
    Notify(String),

    #[error("Invalid candle: {0}")]
    InvalidCandle(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failure to obtain a usable series for one (symbol, timeframe) pair.
///
/// None of these abort a refresh cycle; the orchestrator retries the
/// retryable ones and otherwise skips the pair.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    /// Network failure or timeout.
    #[error("transport failure: {0}")]
    Transport(String),

    /// Non-success status, quota exhaustion or an unreadable payload.
    #[error("provider rejected request (HTTP {status}): {body}")]
    RemoteRejected { status: u16, body: String },

    #[error("provider returned no usable candles")]
    EmptyResult,

    /// Latest complete candle is older than the hard freshness ceiling.
    #[error("latest candle is {minutes:.1} min old")]
    Stale { minutes: f64 },
}

impl FetchError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FetchError::Transport(_) | FetchError::RemoteRejected { .. }
        )
    }
}
