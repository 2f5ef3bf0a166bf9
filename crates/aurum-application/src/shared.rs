use crate::config::Config;
use aurum_domain::entities::metrics::MetricsConfig;
use aurum_domain::services::signal::SignalConfig;
use aurum_domain::services::sizing::SizingConfig;
use aurum_domain::value_objects::pair::PairSpec;
use sha2::{Digest, Sha256};

pub fn parse_duration_like(value: &str) -> Result<i64, String> {
    let trimmed = value.trim();
    if trimmed.len() < 2 {
        return Err(format!("invalid duration: {}", value));
    }

    let (number_part, unit) = trimmed.split_at(trimmed.len() - 1);
    let multiplier = match unit {
        "s" | "S" => 1,
        "m" | "M" => 60,
        "h" | "H" => 3600,
        "d" | "D" => 86_400,
        _ => return Err(format!("unsupported duration unit: {}", unit)),
    };
    let number: i64 = number_part
        .parse()
        .map_err(|_| format!("invalid duration: {}", value))?;
    if number <= 0 {
        return Err(format!("duration must be positive: {}", value));
    }
    Ok(number * multiplier)
}

pub fn config_fingerprint(config_toml: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(config_toml.as_bytes());
    let digest = hasher.finalize();
    digest.iter().map(|byte| format!("{:02x}", byte)).collect()
}

pub fn resolve_pair(config: &Config) -> PairSpec {
    PairSpec::new(config.pair.lead.clone(), config.pair.lag.clone())
}

pub fn resolve_signal_config(config: &Config) -> SignalConfig {
    SignalConfig {
        entry_z: config.signal.entry_z,
        exit_z: config.signal.exit_z,
        gap_threshold: config.signal.gap_threshold,
        volume_multiplier: config.signal.volume_multiplier,
        confirm_filters: config.signal.confirm_filters,
        hold_days: config.signal.hold_days,
    }
}

pub fn resolve_sizing_config(config: &Config) -> SizingConfig {
    SizingConfig {
        capital: config.run.initial_capital,
        use_vol_scaling: config.sizing.use_vol_scaling,
        max_leverage: config.sizing.max_leverage,
    }
}

pub fn resolve_metrics_config(config: &Config) -> MetricsConfig {
    let risk_free_rate = config
        .metrics
        .as_ref()
        .and_then(|metrics| metrics.risk_free_rate)
        .unwrap_or(0.0);
    let annualization_factor = config
        .metrics
        .as_ref()
        .and_then(|metrics| metrics.annualization_factor);
    MetricsConfig {
        risk_free_rate,
        annualization_factor,
    }
}

#[cfg(test)]
mod tests {
    use super::{config_fingerprint, parse_duration_like};

    #[test]
    fn parse_duration_like_handles_units() {
        assert_eq!(parse_duration_like("5s").unwrap(), 5);
        assert_eq!(parse_duration_like("2m").unwrap(), 120);
        assert_eq!(parse_duration_like("1h").unwrap(), 3600);
        assert_eq!(parse_duration_like("1d").unwrap(), 86_400);
    }

    #[test]
    fn parse_duration_like_rejects_garbage() {
        assert!(parse_duration_like("").is_err());
        assert!(parse_duration_like("10x").is_err());
        assert!(parse_duration_like("-5s").is_err());
    }

    #[test]
    fn fingerprint_is_stable_and_content_sensitive() {
        let first = config_fingerprint("[run]\nrun_id = \"a\"\n");
        let second = config_fingerprint("[run]\nrun_id = \"a\"\n");
        let different = config_fingerprint("[run]\nrun_id = \"b\"\n");
        assert_eq!(first, second);
        assert_ne!(first, different);
        assert_eq!(first.len(), 64);
    }
}
