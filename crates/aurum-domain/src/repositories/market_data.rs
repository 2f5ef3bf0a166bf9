use crate::value_objects::bar::Bar;

#[derive(Debug, Clone)]
pub struct BarsQuery {
    pub symbol: String,
    /// Trailing number of daily bars to return.
    pub days: usize,
}

#[derive(Debug, Default, Clone)]
pub struct DataQualityReport {
    pub rows: usize,
    pub duplicates: usize,
    pub out_of_order: usize,
    pub invalid_close: usize,
    pub first_timestamp: Option<i64>,
    pub last_timestamp: Option<i64>,
}

pub trait PriceFeed {
    fn daily_bars(&self, query: &BarsQuery) -> Result<(Vec<Bar>, DataQualityReport), String>;
}

/// Quality accounting shared by all feed adapters. Bars are expected in
/// ascending timestamp order; weekend/holiday gaps are normal for daily data
/// and are not counted.
pub fn data_quality_from_bars(bars: &[Bar]) -> DataQualityReport {
    let mut report = DataQualityReport {
        rows: bars.len(),
        ..DataQualityReport::default()
    };
    if bars.is_empty() {
        return report;
    }

    report.first_timestamp = Some(bars[0].timestamp);
    report.last_timestamp = Some(bars[bars.len() - 1].timestamp);

    let mut last_ts: Option<i64> = None;
    for bar in bars {
        if !bar.close.is_finite() || bar.close <= 0.0 {
            report.invalid_close += 1;
        }
        if let Some(prev) = last_ts {
            if bar.timestamp == prev {
                report.duplicates += 1;
            } else if bar.timestamp < prev {
                report.out_of_order += 1;
            }
        }
        last_ts = Some(bar.timestamp);
        report.last_timestamp = Some(bar.timestamp);
    }

    report
}
