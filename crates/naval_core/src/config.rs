//! Simulation tunables.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::data::VictoryCondition;
use crate::error::{Result, SimError};

/// Scheduler rates, tolerances and toggles for one battle.
///
/// Immutable once the battle is constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Wall-clock tick period in milliseconds.
    pub tick_period_ms: u64,
    /// Ticks between radio broadcasts.
    pub radio_rate: u32,
    /// Ticks between radar scans.
    pub radar_scan_rate: u32,
    /// Ticks between path replans.
    pub path_update_rate: u32,
    /// Ticks between target locks.
    pub target_lock_rate: u32,
    /// Distance at which a checkpoint counts as reached.
    pub checkpoint_tolerance: f64,
    /// Seed for fire control and shell spread.
    pub seed: u64,
    /// Require a clear line of sight for radar contacts.
    pub los_blocks_detection: bool,
    /// Spend shells that hit an island or leave the scene.
    pub shells_stop_at_islands: bool,
    /// End condition.
    pub victory: VictoryCondition,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_period_ms: 25,
            radio_rate: 19,
            radar_scan_rate: 9,
            path_update_rate: 99,
            target_lock_rate: 9,
            checkpoint_tolerance: 500.0,
            seed: 0,
            los_blocks_detection: false,
            shells_stop_at_islands: true,
            victory: VictoryCondition::Elimination,
        }
    }
}

impl SimConfig {
    /// Parse from RON; missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::ConfigParse`] on malformed RON.
    pub fn from_ron_str(text: &str) -> Result<Self> {
        Ok(ron::from_str(text)?)
    }

    /// Set the seed.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Tick period as a duration.
    #[must_use]
    pub const fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_period_ms)
    }

    /// Reject rates of zero and non-positive tolerances.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidInput`] naming the field.
    pub fn validate(&self) -> Result<()> {
        let rates = [
            ("tick_period_ms", self.tick_period_ms),
            ("radio_rate", u64::from(self.radio_rate)),
            ("radar_scan_rate", u64::from(self.radar_scan_rate)),
            ("path_update_rate", u64::from(self.path_update_rate)),
            ("target_lock_rate", u64::from(self.target_lock_rate)),
        ];
        if let Some((name, _)) = rates.iter().find(|(_, v)| *v == 0) {
            return Err(SimError::InvalidInput(format!("{name} must be positive")));
        }
        if self.checkpoint_tolerance <= 0.0 {
            return Err(SimError::InvalidInput(
                "checkpoint_tolerance must be positive".into(),
            ));
        }
        Ok(())
    }
}
