use common::Candle;

/// Bars examined by the break-of-structure check, including the latest one.
pub const STRUCTURE_LOOKBACK: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructureBreak {
    BullishBreak,
    BearishBreak,
    NoBreak,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Uptrend,
    Downtrend,
    Range,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarketStructure {
    pub structure: StructureBreak,
    pub trend: Trend,
}

impl std::fmt::Display for StructureBreak {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StructureBreak::BullishBreak => write!(f, "BullishBreak"),
            StructureBreak::BearishBreak => write!(f, "BearishBreak"),
            StructureBreak::NoBreak => write!(f, "NoBreak"),
        }
    }
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Trend::Uptrend => write!(f, "Uptrend"),
            Trend::Downtrend => write!(f, "Downtrend"),
            Trend::Range => write!(f, "Range"),
        }
    }
}

/// Compare the latest bar against the 19 bars before it.
///
/// A new high wins over a new low when the latest bar does both.
/// Returns `None` with fewer than [`STRUCTURE_LOOKBACK`] bars.
pub fn market_structure(candles: &[Candle]) -> Option<MarketStructure> {
    if candles.len() < STRUCTURE_LOOKBACK {
        return None;
    }
    let (latest, prior) = candles.split_last()?;
    let window = &prior[prior.len() - (STRUCTURE_LOOKBACK - 1)..];

    let prior_high = window.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max);
    let prior_low = window.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);

    let (structure, trend) = if latest.high > prior_high {
        (StructureBreak::BullishBreak, Trend::Uptrend)
    } else if latest.low < prior_low {
        (StructureBreak::BearishBreak, Trend::Downtrend)
    } else {
        (StructureBreak::NoBreak, Trend::Range)
    };
    Some(MarketStructure { structure, trend })
}
