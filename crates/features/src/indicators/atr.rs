use common::Candle;

/// Average True Range.
///
/// True range of a bar is `max(high - low, |high - prev_close|, |low - prev_close|)`,
/// so the first bar has none. ATR is the simple moving average of the last
/// `period` true ranges and is `None` until `period + 1` bars are available.
pub fn average_true_range(candles: &[Candle], period: usize) -> Option<f64> {
    atr_series(candles, period).last().copied().flatten()
}

/// Rolling ATR aligned with `candles`: entry `i` is the ATR ending at bar `i`.
pub fn atr_series(candles: &[Candle], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; candles.len()];
    if period == 0 || candles.len() < period + 1 {
        return out;
    }

    let ranges: Vec<f64> = candles
        .windows(2)
        .map(|w| true_range(&w[1], w[0].close))
        .collect();

    // ranges[j] belongs to bar j + 1
    let mut sum: f64 = ranges[..period].iter().sum();
    out[period] = Some(sum / period as f64);
    for j in period..ranges.len() {
        sum += ranges[j] - ranges[j - period];
        out[j + 1] = Some((sum / period as f64).max(0.0));
    }
    out
}

fn true_range(bar: &Candle, prev_close: f64) -> f64 {
    (bar.high - bar.low)
        .max((bar.high - prev_close).abs())
        .max((bar.low - prev_close).abs())
}
