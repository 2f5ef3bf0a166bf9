use crate::services::spread::SpreadStats;

#[derive(Debug, Clone)]
pub struct SizingConfig {
    pub capital: f64,
    pub use_vol_scaling: bool,
    pub max_leverage: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LegSizes {
    pub lead_qty: f64,
    pub lag_qty: f64,
    pub scale: f64,
}

impl LegSizes {
    pub fn is_tradeable(&self) -> bool {
        self.lead_qty >= 1.0 && self.lag_qty >= 1.0
    }
}

/// Volatility-scaled notional, whole shares per leg.
pub fn size_entry(config: &SizingConfig, stats: &SpreadStats) -> Result<LegSizes, String> {
    if config.capital <= 0.0 || !config.capital.is_finite() {
        return Err("sizing capital must be positive".to_string());
    }
    if stats.lead_close <= 0.0 || stats.lag_close <= 0.0 {
        return Err("sizing requires positive close prices".to_string());
    }

    let scale = if config.use_vol_scaling {
        let combined = stats.lead_vol + stats.lag_vol;
        if combined <= 0.0 || !combined.is_finite() {
            return Err("sizing requires positive combined volatility".to_string());
        }
        (1.0 / combined).min(config.max_leverage)
    } else {
        1.0
    };

    let notional = config.capital * scale;
    Ok(LegSizes {
        lead_qty: (notional / stats.lead_close).floor(),
        lag_qty: (notional / stats.lag_close).floor(),
        scale,
    })
}
