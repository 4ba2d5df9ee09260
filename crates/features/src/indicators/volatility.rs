use common::Candle;

use super::atr::atr_series;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolatilityRegime {
    HighVolatility,
    LowVolatility,
}

impl std::fmt::Display for VolatilityRegime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VolatilityRegime::HighVolatility => write!(f, "HighVolatility"),
            VolatilityRegime::LowVolatility => write!(f, "LowVolatility"),
        }
    }
}

/// Latest ATR above the mean of the whole ATR series is high volatility.
pub fn volatility_regime(candles: &[Candle], atr_period: usize) -> Option<VolatilityRegime> {
    let values: Vec<f64> = atr_series(candles, atr_period).into_iter().flatten().collect();
    let latest = *values.last()?;
    let mean = values.iter().sum::<f64>() / values.len() as f64;

    Some(if latest > mean {
        VolatilityRegime::HighVolatility
    } else {
        VolatilityRegime::LowVolatility
    })
}
