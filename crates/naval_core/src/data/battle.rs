//! Persisted battle setup.

use serde::{Deserialize, Serialize};

use crate::map_generation::MapConfig;

/// Playable area preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MapSize {
    /// 20 km square.
    #[default]
    Small,
    /// 30 km square.
    Medium,
    /// 40 km square.
    Large,
}

impl MapSize {
    /// Playable side length in world units.
    #[must_use]
    pub const fn extent(self) -> u32 {
        match self {
            Self::Small => 20_000,
            Self::Medium => 30_000,
            Self::Large => 40_000,
        }
    }
}

/// Island coverage preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Obstruction {
    /// Open ocean.
    None,
    /// Scattered islands.
    #[default]
    Low,
    /// Archipelago.
    Medium,
    /// Dense archipelago.
    High,
}

impl Obstruction {
    /// Target share of playable cells covered by islands.
    #[must_use]
    pub const fn ratio(self) -> f64 {
        match self {
            Self::None => 0.0,
            Self::Low => 0.05,
            Self::Medium => 0.1,
            Self::High => 0.2,
        }
    }
}

/// Opponent strength preset; scales the enemy's funds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Difficulty {
    /// Enemy gets 75% of the player's funds.
    Easy,
    /// Equal funds.
    #[default]
    Normal,
    /// Enemy gets 130%.
    Hard,
}

impl Difficulty {
    /// Multiplier applied to the enemy's funds.
    #[must_use]
    pub const fn enemy_funds_factor(self) -> f64 {
        match self {
            Self::Easy => 0.75,
            Self::Normal => 1.0,
            Self::Hard => 1.3,
        }
    }
}

/// How a battle ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VictoryCondition {
    /// Last side with ships afloat wins.
    #[default]
    Elimination,
    /// Battle ends after a number of ticks; the larger fleet wins.
    /// Elimination still ends it early.
    TimeLimit {
        /// Ticks until the battle ends.
        ticks: u64,
    },
}

/// Island size bounds in cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObstacleBounds {
    /// Minimum width.
    pub min_width: usize,
    /// Maximum width.
    pub max_width: usize,
    /// Minimum height.
    pub min_height: usize,
    /// Maximum height.
    pub max_height: usize,
}

impl Default for ObstacleBounds {
    fn default() -> Self {
        Self {
            min_width: 2,
            max_width: 6,
            min_height: 2,
            max_height: 6,
        }
    }
}

/// Map and battle setup as chosen before a battle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BattleSetup {
    /// Use the preset fields instead of `obstacles`.
    pub preset: bool,
    /// Playable area preset.
    pub size: MapSize,
    /// Island coverage preset.
    pub obstruction: Obstruction,
    /// Opponent strength.
    pub difficulty: Difficulty,
    /// Player funds for the fleet director.
    pub funds: u32,
    /// End condition.
    pub victory: VictoryCondition,
    /// Cell size in world units.
    pub resolution: u32,
    /// Island size bounds, used when `preset` is false.
    pub obstacles: ObstacleBounds,
    /// Border band ratio.
    pub extension: f64,
    /// Map seed.
    pub seed: u64,
}

impl Default for BattleSetup {
    fn default() -> Self {
        Self {
            preset: true,
            size: MapSize::default(),
            obstruction: Obstruction::default(),
            difficulty: Difficulty::default(),
            funds: 3_000,
            victory: VictoryCondition::default(),
            resolution: 500,
            obstacles: ObstacleBounds::default(),
            extension: 0.25,
            seed: 12345,
        }
    }
}

impl BattleSetup {
    /// Map generation parameters for this setup.
    #[must_use]
    pub fn map_config(&self) -> MapConfig {
        let bounds = if self.preset {
            ObstacleBounds::default()
        } else {
            self.obstacles
        };
        MapConfig {
            playable_width: self.size.extent(),
            playable_height: self.size.extent(),
            extension_ratio: self.extension,
            cell_size: self.resolution,
            max_obstruction: self.obstruction.ratio(),
            obstacle_min_width: bounds.min_width,
            obstacle_max_width: bounds.max_width,
            obstacle_min_height: bounds.min_height,
            obstacle_max_height: bounds.max_height,
            seed: self.seed,
            ..MapConfig::default()
        }
    }

    /// Funds available to the enemy fleet.
    #[must_use]
    pub fn enemy_funds(&self) -> u32 {
        (f64::from(self.funds) * self.difficulty.enemy_funds_factor()).round() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_setup_map() {
        let config = BattleSetup::default().map_config();
        assert_eq!(config.playable_width, 20_000);
        assert_eq!(config.cell_size, 500);
        assert!((config.max_obstruction - 0.05).abs() < 1e-12);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_custom_obstacles_only_without_preset() {
        let mut setup = BattleSetup {
            obstacles: ObstacleBounds {
                min_width: 1,
                max_width: 2,
                min_height: 1,
                max_height: 2,
            },
            ..BattleSetup::default()
        };
        assert_eq!(setup.map_config().obstacle_max_width, 6);
        setup.preset = false;
        assert_eq!(setup.map_config().obstacle_max_width, 2);
    }

    #[test]
    fn test_enemy_funds() {
        let setup = BattleSetup {
            difficulty: Difficulty::Hard,
            funds: 1_000,
            ..BattleSetup::default()
        };
        assert_eq!(setup.enemy_funds(), 1_300);
    }

    #[test]
    fn test_parse_partial_setup() {
        let setup: BattleSetup =
            ron::from_str("(size: Large, victory: TimeLimit(ticks: 4000))").unwrap();
        assert_eq!(setup.size, MapSize::Large);
        assert_eq!(setup.victory, VictoryCondition::TimeLimit { ticks: 4_000 });
        assert_eq!(setup.funds, 3_000);
    }
}
