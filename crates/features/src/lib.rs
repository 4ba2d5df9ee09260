//! Feature engine: pure, deterministic functions over candle series.
//!
//! Insufficient data never panics or errors. Single-value features return
//! `Option` and the caller writes `None` as an empty cell.

pub mod correlation;
pub mod indicators;
pub mod usd_strength;

pub use correlation::{correlation_matrix, CorrelationMatrix};
pub use indicators::*;
pub use usd_strength::usd_strength;

use common::CandleSeries;

/// Everything computed from a single series.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesFeatures {
    /// Rolling ATR aligned with the series' candles.
    pub atr: Vec<Option<f64>>,
    pub structure: Option<MarketStructure>,
    pub liquidity: Liquidity,
    pub volatility: Option<VolatilityRegime>,
}

impl SeriesFeatures {
    pub fn compute(series: &CandleSeries, atr_period: usize) -> Self {
        let candles = series.candles();
        Self {
            atr: atr_series(candles, atr_period),
            structure: market_structure(candles),
            liquidity: liquidity_label(candles),
            volatility: volatility_regime(candles, atr_period),
        }
    }

    pub fn latest_atr(&self) -> Option<f64> {
        self.atr.last().copied().flatten()
    }
}
