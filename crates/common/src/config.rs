use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::{Error, Result, TradingEnvironment};

/// All configuration loaded from environment variables at startup.
/// Built once and passed by reference; business logic never reads the
/// environment itself.
#[derive(Debug, Clone)]
pub struct Config {
    // OANDA
    pub oanda_api_key: String,
    pub oanda_environment: TradingEnvironment,
    pub oanda_base_url: String,
    /// Needed only for the pricing endpoint. Without it live quotes are skipped.
    pub oanda_account_id: Option<String>,

    // Telegram
    pub telegram: Option<TelegramTarget>,

    // Output
    pub snapshot_path: PathBuf,

    // Timing
    pub refresh_interval: Duration,
    pub request_timeout: Duration,
    pub cycle_timeout: Option<Duration>,

    // Watchlist file path; the built-in watchlist is used when unset
    pub watchlist_path: Option<PathBuf>,
}

/// Bot credential plus destination chat (numeric id or `@channel`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelegramTarget {
    pub token: String,
    pub chat_id: String,
}

impl Config {
    /// Load all configuration from environment variables.
    /// Loads `.env` if present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv(); // ignore error if .env not present
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        let oanda_environment = match env.optional("OANDA_ENVIRONMENT") {
            None => TradingEnvironment::Practice,
            Some(v) => match v.to_lowercase().as_str() {
                "practice" => TradingEnvironment::Practice,
                "live" => TradingEnvironment::Live,
                other => {
                    return Err(Error::Config(format!(
                        "OANDA_ENVIRONMENT must be 'practice' or 'live', got: '{other}'"
                    )))
                }
            },
        };

        let oanda_base_url = env
            .optional("OANDA_BASE_URL")
            .unwrap_or_else(|| oanda_environment.rest_base_url().to_string());
        Url::parse(&oanda_base_url)
            .map_err(|e| Error::Config(format!("OANDA_BASE_URL '{oanda_base_url}': {e}")))?;

        let telegram = match (env.optional("TELEGRAM_TOKEN"), env.optional("TELEGRAM_CHAT_ID")) {
            (Some(token), Some(chat_id)) => Some(TelegramTarget { token, chat_id }),
            (None, None) => None,
            (Some(_), None) => {
                return Err(Error::Config(
                    "TELEGRAM_TOKEN is set but TELEGRAM_CHAT_ID is missing".into(),
                ))
            }
            (None, Some(_)) => {
                return Err(Error::Config(
                    "TELEGRAM_CHAT_ID is set but TELEGRAM_TOKEN is missing".into(),
                ))
            }
        };

        let refresh_interval = Duration::from_secs(env.parsed("REFRESH_INTERVAL_SECS")?.unwrap_or(900));
        if refresh_interval.is_zero() {
            return Err(Error::Config("REFRESH_INTERVAL_SECS must be positive".into()));
        }

        Ok(Config {
            oanda_api_key: env.required("OANDA_API_KEY")?,
            oanda_environment,
            oanda_base_url: oanda_base_url.trim_end_matches('/').to_string(),
            oanda_account_id: env.optional("OANDA_ACCOUNT_ID"),
            telegram,
            snapshot_path: env
                .optional("SNAPSHOT_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("market_snapshot.csv")),
            refresh_interval,
            request_timeout: Duration::from_secs(env.parsed("REQUEST_TIMEOUT_SECS")?.unwrap_or(10)),
            cycle_timeout: env.parsed::<u64>("CYCLE_TIMEOUT_SECS")?.map(Duration::from_secs),
            watchlist_path: env.optional("WATCHLIST_PATH").map(PathBuf::from),
        })
    }
}

struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn required(&self, key: &str) -> Result<String> {
        self.optional(key).ok_or_else(|| {
            Error::Config(format!(
                "Required environment variable '{key}' is not set. Check your .env file."
            ))
        })
    }

    fn parsed<T: std::str::FromStr>(&self, key: &str) -> Result<Option<T>> {
        self.optional(key)
            .map(|v| {
                v.parse::<T>()
                    .map_err(|_| Error::Config(format!("{key} is not a valid number: '{v}'")))
            })
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn minimal_env_uses_defaults() {
        let cfg = Config::from_lookup(lookup(&[("OANDA_API_KEY", "secret")])).unwrap();
        assert_eq!(cfg.oanda_environment, TradingEnvironment::Practice);
        assert_eq!(cfg.oanda_base_url, "https://api-fxpractice.oanda.com/v3");
        assert_eq!(cfg.refresh_interval, Duration::from_secs(900));
        assert_eq!(cfg.request_timeout, Duration::from_secs(10));
        assert_eq!(cfg.cycle_timeout, None);
        assert!(cfg.telegram.is_none());
        assert_eq!(cfg.snapshot_path, PathBuf::from("market_snapshot.csv"));
    }

    #[test]
    fn missing_api_key_fails_fast() {
        let err = Config::from_lookup(lookup(&[])).unwrap_err();
        assert!(err.to_string().contains("OANDA_API_KEY"));
    }

    #[test]
    fn live_environment_selects_trade_endpoint() {
        let cfg = Config::from_lookup(lookup(&[
            ("OANDA_API_KEY", "k"),
            ("OANDA_ENVIRONMENT", "LIVE"),
        ]))
        .unwrap();
        assert_eq!(cfg.oanda_base_url, "https://api-fxtrade.oanda.com/v3");
    }

    #[test]
    fn telegram_requires_token_and_chat() {
        let err = Config::from_lookup(lookup(&[
            ("OANDA_API_KEY", "k"),
            ("TELEGRAM_TOKEN", "bot"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("TELEGRAM_CHAT_ID"));

        let cfg = Config::from_lookup(lookup(&[
            ("OANDA_API_KEY", "k"),
            ("TELEGRAM_TOKEN", "bot"),
            ("TELEGRAM_CHAT_ID", "-100123"),
        ]))
        .unwrap();
        assert_eq!(cfg.telegram.unwrap().chat_id, "-100123");
    }

    #[test]
    fn rejects_garbage_numbers_and_urls() {
        assert!(Config::from_lookup(lookup(&[
            ("OANDA_API_KEY", "k"),
            ("REFRESH_INTERVAL_SECS", "soon"),
        ]))
        .is_err());
        assert!(Config::from_lookup(lookup(&[
            ("OANDA_API_KEY", "k"),
            ("OANDA_BASE_URL", "not a url"),
        ]))
        .is_err());
    }
}
