use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub run: RunConfig,
    pub pair: PairConfig,
    pub signal: SignalSection,
    pub sizing: SizingSection,
    pub data: DataConfig,
    pub broker: BrokerConfig,
    pub paths: PathsConfig,
    pub metrics: Option<MetricsSection>,
}

#[derive(Debug, Deserialize)]
pub struct RunConfig {
    pub run_id: String,
    pub initial_capital: f64,
}

#[derive(Debug, Deserialize)]
pub struct PairConfig {
    pub lead: String,
    pub lag: String,
}

#[derive(Debug, Deserialize)]
pub struct SignalSection {
    pub lookback: usize,
    pub entry_z: f64,
    pub exit_z: f64,
    pub gap_threshold: f64,
    pub volume_multiplier: f64,
    pub confirm_filters: bool,
    pub hold_days: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SizingSection {
    pub use_vol_scaling: bool,
    pub max_leverage: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedMode {
    Csv,
    Alpaca,
}

impl fmt::Display for FeedMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedMode::Csv => write!(f, "csv"),
            FeedMode::Alpaca => write!(f, "alpaca"),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DataConfig {
    pub feed: FeedMode,
    pub csv_dir: Option<String>,
    pub data_url: Option<String>,
    pub lookback_days: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrokerMode {
    Sim,
    Alpaca,
}

impl fmt::Display for BrokerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BrokerMode::Sim => write!(f, "sim"),
            BrokerMode::Alpaca => write!(f, "alpaca"),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BrokerConfig {
    pub mode: BrokerMode,
    pub base_url: String,
    pub timeout_ms: u64,
    pub retries: u32,
    pub poll_interval_ms: u64,
    pub fill_timeout_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct PathsConfig {
    pub state_dir: String,
}

#[derive(Debug, Deserialize)]
pub struct MetricsSection {
    pub risk_free_rate: Option<f64>,
    pub annualization_factor: Option<f64>,
}

pub fn load_config(path: &Path) -> Result<(Config, String), String> {
    let contents = fs::read_to_string(path)
        .map_err(|err| format!("failed to read config {}: {}", path.display(), err))?;
    let config: Config = toml::from_str(&contents)
        .map_err(|err| format!("failed to parse TOML {}: {}", path.display(), err))?;
    validate(&config)?;
    Ok((config, contents))
}

pub fn validate(config: &Config) -> Result<(), String> {
    if config.run.run_id.trim().is_empty() {
        return Err("run.run_id must not be empty".to_string());
    }
    if !(config.run.initial_capital.is_finite() && config.run.initial_capital > 0.0) {
        return Err("run.initial_capital must be positive".to_string());
    }
    if config.pair.lead == config.pair.lag {
        return Err("pair.lead and pair.lag must differ".to_string());
    }
    if config.signal.lookback < 2 {
        return Err("signal.lookback must be >= 2".to_string());
    }
    if !(config.signal.entry_z.is_finite() && config.signal.entry_z > 0.0) {
        return Err("signal.entry_z must be positive".to_string());
    }
    if !(config.signal.exit_z.is_finite() && config.signal.exit_z >= 0.0) {
        return Err("signal.exit_z must be >= 0".to_string());
    }
    if config.signal.exit_z >= config.signal.entry_z {
        return Err("signal.exit_z must be below signal.entry_z".to_string());
    }
    if !(config.signal.volume_multiplier.is_finite() && config.signal.volume_multiplier > 0.0) {
        return Err("signal.volume_multiplier must be positive".to_string());
    }
    if let Some(hold_days) = config.signal.hold_days {
        if hold_days < 0 {
            return Err("signal.hold_days must be >= 0".to_string());
        }
    }
    if !(config.sizing.max_leverage.is_finite() && config.sizing.max_leverage > 0.0) {
        return Err("sizing.max_leverage must be positive".to_string());
    }
    if config.data.lookback_days <= config.signal.lookback {
        return Err("data.lookback_days must exceed signal.lookback".to_string());
    }
    match config.data.feed {
        FeedMode::Csv => {
            if config.data.csv_dir.as_deref().map(str::trim).unwrap_or("").is_empty() {
                return Err("data.csv_dir is required when data.feed = \"csv\"".to_string());
            }
        }
        FeedMode::Alpaca => {
            if config.data.data_url.as_deref().map(str::trim).unwrap_or("").is_empty() {
                return Err("data.data_url is required when data.feed = \"alpaca\"".to_string());
            }
        }
    }
    if config.broker.timeout_ms == 0 {
        return Err("broker.timeout_ms must be positive".to_string());
    }
    if config.broker.fill_timeout_ms == 0 {
        return Err("broker.fill_timeout_ms must be positive".to_string());
    }
    if config.paths.state_dir.trim().is_empty() {
        return Err("paths.state_dir must not be empty".to_string());
    }
    Ok(())
}
