use common::{CandleSeries, Timeframe};

/// Synthetic dollar-strength score for one timeframe.
///
/// Takes the close-vs-open return of the latest bar of every basket pair
/// that quotes USD, flips the sign when USD is the base currency, and
/// averages. Returns `0.0` when no basket pair has data.
pub fn usd_strength(series: &[CandleSeries], timeframe: Timeframe, basket: &[String]) -> f64 {
    let returns: Vec<f64> = series
        .iter()
        .filter(|s| s.timeframe() == timeframe)
        .filter(|s| s.symbol().contains("USD") && basket.iter().any(|b| b == s.symbol()))
        .filter_map(|s| {
            let ret = s.last()?.body_return()?;
            Some(if s.symbol().starts_with("USD") { -ret } else { ret })
        })
        .collect();

    if returns.is_empty() {
        return 0.0;
    }
    returns.iter().sum::<f64>() / returns.len() as f64
}
