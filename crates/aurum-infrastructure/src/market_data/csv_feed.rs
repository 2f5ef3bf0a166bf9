use crate::market_data::parse_timestamp;
use aurum_domain::repositories::market_data::{
    data_quality_from_bars, BarsQuery, DataQualityReport, PriceFeed,
};
use aurum_domain::value_objects::bar::Bar;
use serde::Deserialize;
use std::fs::File;
use std::path::PathBuf;

#[derive(Debug, Deserialize)]
struct OhlcvRecord {
    timestamp_utc: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

/// Daily bars from one CSV file per symbol (`<dir>/<SYMBOL>.csv`), with the
/// `timestamp_utc,open,high,low,close,volume` header.
pub struct CsvPriceFeed {
    dir: PathBuf,
}

impl CsvPriceFeed {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }
}

impl PriceFeed for CsvPriceFeed {
    fn daily_bars(&self, query: &BarsQuery) -> Result<(Vec<Bar>, DataQualityReport), String> {
        let path = self.dir.join(format!("{}.csv", query.symbol));
        let file = File::open(&path)
            .map_err(|err| format!("failed to open bars CSV {}: {}", path.display(), err))?;
        let mut reader = csv::Reader::from_reader(file);

        let mut bars: Vec<Bar> = Vec::new();
        for result in reader.deserialize::<OhlcvRecord>() {
            let record = result
                .map_err(|err| format!("failed to parse CSV row in {}: {}", path.display(), err))?;
            bars.push(Bar {
                symbol: query.symbol.clone(),
                timestamp: parse_timestamp(&record.timestamp_utc)?,
                open: record.open,
                high: record.high,
                low: record.low,
                close: record.close,
                volume: record.volume,
            });
        }

        let report = data_quality_from_bars(&bars);
        if bars.len() > query.days {
            bars.drain(..bars.len() - query.days);
        }
        Ok((bars, report))
    }
}

#[cfg(test)]
mod tests {
    use super::CsvPriceFeed;
    use aurum_domain::repositories::market_data::{BarsQuery, PriceFeed};
    use std::fs;
    use std::path::PathBuf;

    fn write_fixture(dir: &PathBuf, symbol: &str, rows: &[&str]) {
        fs::create_dir_all(dir).expect("create fixture dir");
        let mut contents = String::from("timestamp_utc,open,high,low,close,volume\n");
        for row in rows {
            contents.push_str(row);
            contents.push('\n');
        }
        fs::write(dir.join(format!("{}.csv", symbol)), contents).expect("write fixture");
    }

    #[test]
    fn loads_and_tails_daily_bars() {
        let dir = PathBuf::from("/tmp/aurum_csv_feed_tail");
        let _ = fs::remove_dir_all(&dir);
        write_fixture(
            &dir,
            "GLD",
            &[
                "2026-08-03,180,181,179,180.5,1000",
                "2026-08-04,180.5,182,180,181.2,1100",
                "2026-08-05,181.2,183,181,182.9,1250",
            ],
        );

        let feed = CsvPriceFeed::new(dir);
        let (bars, report) = feed
            .daily_bars(&BarsQuery {
                symbol: "GLD".to_string(),
                days: 2,
            })
            .unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(report.rows, 3);
        assert_eq!(bars[1].close, 182.9);
        assert!(bars[0].timestamp < bars[1].timestamp);
    }

    #[test]
    fn missing_file_is_an_error() {
        let feed = CsvPriceFeed::new(PathBuf::from("/tmp/aurum_csv_feed_missing"));
        let err = feed
            .daily_bars(&BarsQuery {
                symbol: "GLD".to_string(),
                days: 5,
            })
            .expect_err("expected missing file error");
        assert!(err.contains("failed to open bars CSV"));
    }
}
