use crate::value_objects::bar::Bar;

/// One aligned observation of both legs on the same trading day.
#[derive(Debug, Clone, PartialEq)]
struct AlignedRow {
    timestamp: i64,
    lead_close: f64,
    lag_close: f64,
    lead_volume: f64,
}

/// Rolling statistics at the latest aligned bar. All values are finite.
#[derive(Debug, Clone, PartialEq)]
pub struct SpreadStats {
    pub timestamp: i64,
    pub lead_close: f64,
    pub lag_close: f64,
    pub spread: f64,
    pub zscore: f64,
    pub lead_ret: f64,
    pub lag_ret: f64,
    pub lead_gap: f64,
    pub rvol: f64,
    pub lead_vol: f64,
    pub lag_vol: f64,
}

/// Price series for the pair, aligned by timestamp intersection.
#[derive(Debug)]
pub struct SpreadSeries {
    rows: Vec<AlignedRow>,
    lookback: usize,
}

impl SpreadSeries {
    pub fn from_bars(lead: &[Bar], lag: &[Bar], lookback: usize) -> Result<Self, String> {
        if lookback < 2 {
            return Err("lookback must be >= 2".to_string());
        }

        let mut rows = Vec::new();
        let mut lag_idx = 0usize;
        let mut last_ts: Option<i64> = None;
        for lead_bar in lead {
            while lag_idx < lag.len() && lag[lag_idx].timestamp < lead_bar.timestamp {
                lag_idx += 1;
            }
            if lag_idx >= lag.len() {
                break;
            }
            let lag_bar = &lag[lag_idx];
            if lag_bar.timestamp != lead_bar.timestamp {
                continue;
            }
            // Skip duplicates so a repeated bar cannot shift the window.
            if last_ts == Some(lead_bar.timestamp) {
                continue;
            }
            if !valid_close(lead_bar) || !valid_close(lag_bar) {
                continue;
            }
            last_ts = Some(lead_bar.timestamp);
            rows.push(AlignedRow {
                timestamp: lead_bar.timestamp,
                lead_close: lead_bar.close,
                lag_close: lag_bar.close,
                lead_volume: lead_bar.volume,
            });
        }

        Ok(Self { rows, lookback })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn latest_timestamp(&self) -> Option<i64> {
        self.rows.last().map(|row| row.timestamp)
    }

    pub fn latest_closes(&self) -> Option<(f64, f64)> {
        self.rows.last().map(|row| (row.lead_close, row.lag_close))
    }

    /// Statistics at the last aligned bar, or None when the window is not
    /// fully populated or any statistic degenerates.
    pub fn latest(&self) -> Option<SpreadStats> {
        let n = self.rows.len();
        if n < self.lookback + 1 {
            return None;
        }

        let last = &self.rows[n - 1];
        let prev = &self.rows[n - 2];

        let spreads: Vec<f64> = self.rows[n - self.lookback..]
            .iter()
            .map(|row| row.lead_close - row.lag_close)
            .collect();
        let spread = last.lead_close - last.lag_close;
        let spread_mean = mean(&spreads);
        let spread_std = sample_std(&spreads, spread_mean)?;
        if spread_std <= 0.0 {
            return None;
        }
        let zscore = (spread - spread_mean) / spread_std;

        if prev.lead_close <= 0.0 || prev.lag_close <= 0.0 {
            return None;
        }
        let lead_ret = last.lead_close / prev.lead_close - 1.0;
        let lag_ret = last.lag_close / prev.lag_close - 1.0;

        let volumes: Vec<f64> = self.rows[n - self.lookback..]
            .iter()
            .map(|row| row.lead_volume)
            .collect();
        let volume_mean = mean(&volumes);
        if volume_mean <= 0.0 {
            return None;
        }
        let rvol = last.lead_volume / volume_mean;

        let lead_vol = rolling_return_std(&self.rows[n - self.lookback - 1..], |row| row.lead_close)?;
        let lag_vol = rolling_return_std(&self.rows[n - self.lookback - 1..], |row| row.lag_close)?;

        let stats = SpreadStats {
            timestamp: last.timestamp,
            lead_close: last.lead_close,
            lag_close: last.lag_close,
            spread,
            zscore,
            lead_ret,
            lag_ret,
            lead_gap: lead_ret,
            rvol,
            lead_vol,
            lag_vol,
        };

        if [
            stats.spread,
            stats.zscore,
            stats.lead_ret,
            stats.lag_ret,
            stats.rvol,
            stats.lead_vol,
            stats.lag_vol,
        ]
        .iter()
        .all(|value| value.is_finite())
        {
            Some(stats)
        } else {
            None
        }
    }
}

fn valid_close(bar: &Bar) -> bool {
    bar.close.is_finite() && bar.close > 0.0 && bar.volume.is_finite() && bar.volume >= 0.0
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn sample_std(values: &[f64], mean: f64) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let var = values
        .iter()
        .map(|value| {
            let diff = value - mean;
            diff * diff
        })
        .sum::<f64>()
        / (values.len() as f64 - 1.0);
    Some(var.sqrt())
}

fn rolling_return_std(rows: &[AlignedRow], close: impl Fn(&AlignedRow) -> f64) -> Option<f64> {
    let mut returns = Vec::with_capacity(rows.len().saturating_sub(1));
    for pair in rows.windows(2) {
        let prev = close(&pair[0]);
        if prev <= 0.0 {
            return None;
        }
        returns.push(close(&pair[1]) / prev - 1.0);
    }
    let m = mean(&returns);
    sample_std(&returns, m)
}
