pub mod config;
pub mod error;
pub mod source;
pub mod types;
pub mod watchlist;

pub use config::{Config, TelegramTarget};
pub use error::{Error, FetchError, Result};
pub use source::{Clock, Notifier, QuoteSource, SystemClock};
pub use types::*;
pub use watchlist::{FreshnessConfig, RetryConfig, Watchlist};
