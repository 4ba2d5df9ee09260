use std::collections::HashSet;

use common::Candle;

/// Decimal places used when matching equal highs/lows.
pub const LIQUIDITY_DECIMALS: i32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liquidity {
    EqualHighLiquidity,
    EqualLowLiquidity,
    NoClearLiquidity,
}

impl std::fmt::Display for Liquidity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Liquidity::EqualHighLiquidity => write!(f, "EqualHighLiquidity"),
            Liquidity::EqualLowLiquidity => write!(f, "EqualLowLiquidity"),
            Liquidity::NoClearLiquidity => write!(f, "NoClearLiquidity"),
        }
    }
}

/// Look for repeated highs, then repeated lows, at 4-decimal precision.
pub fn liquidity_label(candles: &[Candle]) -> Liquidity {
    if has_repeat(candles.iter().map(|c| c.high)) {
        Liquidity::EqualHighLiquidity
    } else if has_repeat(candles.iter().map(|c| c.low)) {
        Liquidity::EqualLowLiquidity
    } else {
        Liquidity::NoClearLiquidity
    }
}

fn has_repeat(prices: impl Iterator<Item = f64>) -> bool {
    let scale = 10f64.powi(LIQUIDITY_DECIMALS);
    let mut seen = HashSet::new();
    prices
        .map(|p| (p * scale).round() as i64)
        .any(|key| !seen.insert(key))
}
