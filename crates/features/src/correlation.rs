use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use common::{CandleSeries, Timeframe};

/// Symmetric pairwise correlation of close-to-close returns for one timeframe.
/// Pairs without enough overlapping data are absent; the diagonal is omitted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CorrelationMatrix {
    values: BTreeMap<(String, String), f64>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        self.values.get(&(a.to_string(), b.to_string())).copied()
    }

    /// Correlations of `symbol` against every other symbol, ordered by name.
    pub fn row<'a>(&'a self, symbol: &'a str) -> impl Iterator<Item = (&'a str, f64)> + 'a {
        self.values
            .iter()
            .filter(move |((a, _), _)| a == symbol)
            .map(|((_, b), v)| (b.as_str(), *v))
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }
}

/// Pearson correlation of percent-change series across the symbols that have
/// data for `timeframe`. Returns are aligned on candle timestamps before
/// correlating. Fewer than two symbols yields an empty matrix.
pub fn correlation_matrix(series: &[CandleSeries], timeframe: Timeframe) -> CorrelationMatrix {
    let returns: BTreeMap<&str, HashMap<DateTime<Utc>, f64>> = series
        .iter()
        .filter(|s| s.timeframe() == timeframe && s.len() >= 2)
        .map(|s| (s.symbol(), pct_changes(s)))
        .collect();

    let mut matrix = CorrelationMatrix::default();
    if returns.len() < 2 {
        return matrix;
    }

    let symbols: Vec<&str> = returns.keys().copied().collect();
    for (i, a) in symbols.iter().enumerate() {
        for b in &symbols[i + 1..] {
            let (xs, ys) = align(&returns[a], &returns[b]);
            if let Some(corr) = pearson(&xs, &ys) {
                matrix.values.insert((a.to_string(), b.to_string()), corr);
                matrix.values.insert((b.to_string(), a.to_string()), corr);
            }
        }
    }
    matrix
}

fn pct_changes(series: &CandleSeries) -> HashMap<DateTime<Utc>, f64> {
    series
        .candles()
        .windows(2)
        .filter(|w| w[0].close != 0.0)
        .map(|w| (w[1].timestamp, (w[1].close - w[0].close) / w[0].close))
        .collect()
}

fn align(a: &HashMap<DateTime<Utc>, f64>, b: &HashMap<DateTime<Utc>, f64>) -> (Vec<f64>, Vec<f64>) {
    let mut stamps: Vec<&DateTime<Utc>> = a.keys().filter(|t| b.contains_key(*t)).collect();
    stamps.sort();
    stamps.into_iter().map(|t| (a[t], b[t])).unzip()
}

fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    let n = xs.len();
    if n < 2 {
        return None;
    }
    let mean_x = xs.iter().sum::<f64>() / n as f64;
    let mean_y = ys.iter().sum::<f64>() / n as f64;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some((cov / (var_x.sqrt() * var_y.sqrt())).clamp(-1.0, 1.0))
}
