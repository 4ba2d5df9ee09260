use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

use common::{Candle, CandleSeries, LiveQuote, Timeframe};
use features::{
    session_label, CorrelationMatrix, Liquidity, SeriesFeatures, Session, StructureBreak, Trend,
    VolatilityRegime,
};

/// Fixed leading columns of the snapshot file. Correlation columns
/// (`corr_<SYMBOL>`) follow, sorted by symbol.
pub const BASE_COLUMNS: [&str; 19] = [
    "symbol",
    "timeframe",
    "time",
    "open",
    "high",
    "low",
    "close",
    "volume",
    "atr",
    "session",
    "structure",
    "trend",
    "liquidity",
    "volatility",
    "delay_minutes",
    "usd_strength",
    "bid",
    "ask",
    "mid",
];

pub const CORRELATION_PREFIX: &str = "corr_";

/// One candle of one (symbol, timeframe) pair with its derived columns.
///
/// `atr` and `session` are per bar. Series-level labels, the freshness delay,
/// cross-symbol features and the live quote sit on the last row of a series
/// and are `None` elsewhere.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotRow {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub candle: Candle,
    pub atr: Option<f64>,
    pub session: Session,
    pub structure: Option<StructureBreak>,
    pub trend: Option<Trend>,
    pub liquidity: Option<Liquidity>,
    pub volatility: Option<VolatilityRegime>,
    pub delay_minutes: Option<f64>,
    pub usd_strength: Option<f64>,
    pub correlations: BTreeMap<String, f64>,
    pub quote: Option<LiveQuote>,
}

impl SnapshotRow {
    fn new(symbol: &str, timeframe: Timeframe, candle: Candle, atr: Option<f64>) -> Self {
        Self {
            symbol: symbol.to_string(),
            timeframe,
            session: session_label(candle.timestamp),
            candle,
            atr,
            structure: None,
            trend: None,
            liquidity: None,
            volatility: None,
            delay_minutes: None,
            usd_strength: None,
            correlations: BTreeMap::new(),
            quote: None,
        }
    }

    /// Cells in column order; `correlation_columns` are the symbols behind the
    /// trailing `corr_*` headers.
    pub fn record(&self, correlation_columns: &[String]) -> Vec<String> {
        let c = &self.candle;
        let mut cells = vec![
            self.symbol.clone(),
            self.timeframe.to_string(),
            c.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            c.open.to_string(),
            c.high.to_string(),
            c.low.to_string(),
            c.close.to_string(),
            c.volume.to_string(),
            opt(self.atr),
            self.session.to_string(),
            opt(self.structure),
            opt(self.trend),
            opt(self.liquidity),
            opt(self.volatility),
            opt(self.delay_minutes),
            opt(self.usd_strength),
            opt(self.quote.as_ref().map(|q| q.bid)),
            opt(self.quote.as_ref().map(|q| q.ask)),
            opt(self.quote.as_ref().map(LiveQuote::mid)),
        ];
        cells.extend(
            correlation_columns
                .iter()
                .map(|sym| opt(self.correlations.get(sym))),
        );
        cells
    }
}

fn opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// The consolidated output of one refresh cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub cycle_id: Uuid,
    pub generated_at: DateTime<Utc>,
    rows: Vec<SnapshotRow>,
}

impl Snapshot {
    pub fn new(cycle_id: Uuid, generated_at: DateTime<Utc>) -> Self {
        Self {
            cycle_id,
            generated_at,
            rows: Vec::new(),
        }
    }

    /// Append one row per candle of `series` with its single-series features.
    /// Returns the index of the series' last row, or `None` for an empty series.
    pub fn push_series(
        &mut self,
        series: &CandleSeries,
        features: &SeriesFeatures,
        delay_minutes: Option<f64>,
    ) -> Option<usize> {
        let symbol = series.symbol();
        let timeframe = series.timeframe();
        for (i, candle) in series.candles().iter().enumerate() {
            let atr = features.atr.get(i).copied().flatten();
            self.rows
                .push(SnapshotRow::new(symbol, timeframe, candle.clone(), atr));
        }

        let last = self.rows.len().checked_sub(1).filter(|_| !series.is_empty())?;
        let row = &mut self.rows[last];
        row.structure = features.structure.map(|s| s.structure);
        row.trend = features.structure.map(|s| s.trend);
        row.liquidity = Some(features.liquidity);
        row.volatility = features.volatility;
        row.delay_minutes = delay_minutes;
        Some(last)
    }

    /// Attach cross-symbol values to the row at `index`.
    pub fn attach_cross(&mut self, index: usize, usd_strength: f64, matrix: &CorrelationMatrix) {
        if let Some(row) = self.rows.get_mut(index) {
            row.usd_strength = Some(usd_strength);
            row.correlations = matrix
                .row(&row.symbol)
                .map(|(other, v)| (other.to_string(), v))
                .collect();
        }
    }

    /// Attach a quote to the most recent row of its symbol. Ties across
    /// timeframes go to the row added first. Returns `false` when the symbol
    /// has no rows.
    pub fn attach_quote(&mut self, quote: LiveQuote) -> bool {
        let mut target: Option<usize> = None;
        for (i, row) in self.rows.iter().enumerate() {
            if row.symbol != quote.symbol {
                continue;
            }
            match target {
                Some(t) if self.rows[t].candle.timestamp >= row.candle.timestamp => {}
                _ => target = Some(i),
            }
        }
        match target {
            Some(i) => {
                self.rows[i].quote = Some(quote);
                true
            }
            None => false,
        }
    }

    pub fn rows(&self) -> &[SnapshotRow] {
        &self.rows
    }

    pub fn rows_for<'a>(
        &'a self,
        symbol: &'a str,
        timeframe: Timeframe,
    ) -> impl Iterator<Item = &'a SnapshotRow> + 'a {
        self.rows
            .iter()
            .filter(move |r| r.symbol == symbol && r.timeframe == timeframe)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Symbols that appear as correlation partners anywhere in the snapshot.
    pub fn correlation_columns(&self) -> Vec<String> {
        self.rows
            .iter()
            .flat_map(|r| r.correlations.keys().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Header row: base columns followed by `corr_<SYMBOL>` columns.
    pub fn header(&self) -> Vec<String> {
        BASE_COLUMNS
            .iter()
            .map(|c| c.to_string())
            .chain(
                self.correlation_columns()
                    .iter()
                    .map(|s| format!("{CORRELATION_PREFIX}{s}")),
            )
            .collect()
    }
}
