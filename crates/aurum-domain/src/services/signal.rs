use crate::services::spread::SpreadStats;
use crate::value_objects::position_state::PositionState;

#[derive(Debug, Clone)]
pub struct SignalConfig {
    pub entry_z: f64,
    pub exit_z: f64,
    pub gap_threshold: f64,
    pub volume_multiplier: f64,
    pub confirm_filters: bool,
    pub hold_days: Option<i64>,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            entry_z: 1.0,
            exit_z: 0.5,
            gap_threshold: 0.01,
            volume_multiplier: 1.2,
            confirm_filters: true,
            hold_days: Some(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub state: PositionState,
    pub spread: f64,
    pub zscore: f64,
    pub reason: String,
}

impl Decision {
    fn flat(reason: &str) -> Self {
        Self {
            state: PositionState::Flat,
            spread: 0.0,
            zscore: 0.0,
            reason: reason.to_string(),
        }
    }
}

/// Pure decision function: identical inputs always yield the same decision.
#[derive(Debug, Clone)]
pub struct SignalEngine {
    config: SignalConfig,
}

impl SignalEngine {
    pub fn new(config: SignalConfig) -> Self {
        Self { config }
    }

    pub fn evaluate(
        &self,
        stats: Option<&SpreadStats>,
        current: PositionState,
        held_days: Option<i64>,
    ) -> Decision {
        let Some(stats) = stats else {
            return match current {
                // Never exit blind: keep the book until data returns.
                PositionState::Flat => Decision::flat("insufficient_history"),
                state => Decision {
                    state,
                    spread: 0.0,
                    zscore: 0.0,
                    reason: "insufficient_history".to_string(),
                },
            };
        };

        let decided = match current {
            PositionState::Flat => self.evaluate_entry(stats),
            state => self.evaluate_exit(stats, state, held_days),
        };

        Decision {
            spread: stats.spread,
            zscore: stats.zscore,
            ..decided
        }
    }

    fn evaluate_entry(&self, stats: &SpreadStats) -> Decision {
        if stats.zscore >= self.config.entry_z && self.long_filters_pass(stats) {
            return Decision {
                state: PositionState::Long,
                spread: 0.0,
                zscore: 0.0,
                reason: "entry_long".to_string(),
            };
        }
        if stats.zscore <= -self.config.entry_z && self.short_filters_pass(stats) {
            return Decision {
                state: PositionState::Short,
                spread: 0.0,
                zscore: 0.0,
                reason: "entry_short".to_string(),
            };
        }
        Decision::flat("no_entry")
    }

    fn evaluate_exit(
        &self,
        stats: &SpreadStats,
        current: PositionState,
        held_days: Option<i64>,
    ) -> Decision {
        if stats.zscore.abs() <= self.config.exit_z {
            return Decision {
                state: PositionState::Flat,
                spread: 0.0,
                zscore: 0.0,
                reason: "exit_threshold".to_string(),
            };
        }
        if let (Some(max_days), Some(held)) = (self.config.hold_days, held_days) {
            if held >= max_days {
                return Decision {
                    state: PositionState::Flat,
                    spread: 0.0,
                    zscore: 0.0,
                    reason: "exit_hold_days".to_string(),
                };
            }
        }
        Decision {
            state: current,
            spread: 0.0,
            zscore: 0.0,
            reason: "hold".to_string(),
        }
    }

    fn long_filters_pass(&self, stats: &SpreadStats) -> bool {
        if !self.config.confirm_filters {
            return true;
        }
        stats.lead_gap > self.config.gap_threshold
            && stats.lag_ret < stats.lead_ret / 2.0
            && stats.rvol > self.config.volume_multiplier
    }

    fn short_filters_pass(&self, stats: &SpreadStats) -> bool {
        if !self.config.confirm_filters {
            return true;
        }
        stats.lead_gap < -self.config.gap_threshold
            && stats.lag_ret > stats.lead_ret / 2.0
            && stats.rvol > self.config.volume_multiplier
    }
}
