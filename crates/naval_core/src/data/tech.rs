//! Ship technology levels and their effects.

use serde::{Deserialize, Serialize};

/// Highest level any technology can reach.
pub const MAX_TECH_LEVEL: u8 = 2;

/// Upgradeable ship technologies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TechKind {
    /// Gun laying; tightens per-gun dispersion.
    Guns,
    /// Fire-control director; lowers the base target-velocity error.
    FireControl,
    /// Fire-control computer; shortens the error correction interval.
    Computer,
    /// Search radar; extends detection range.
    Radar,
}

impl TechKind {
    /// All technologies in canonical order.
    pub const ALL: [Self; 4] = [Self::Guns, Self::FireControl, Self::Computer, Self::Radar];
}

/// Per-ship technology levels, each in `0..=2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TechLevels {
    /// Gun level.
    pub guns: u8,
    /// Fire-control level.
    pub fire_control: u8,
    /// Computer level.
    pub computer: u8,
    /// Radar level.
    pub radar: u8,
}

impl TechLevels {
    /// Same level for every technology.
    #[must_use]
    pub const fn uniform(level: u8) -> Self {
        Self {
            guns: level,
            fire_control: level,
            computer: level,
            radar: level,
        }
    }

    /// Level of one technology.
    #[must_use]
    pub const fn level(&self, kind: TechKind) -> u8 {
        match kind {
            TechKind::Guns => self.guns,
            TechKind::FireControl => self.fire_control,
            TechKind::Computer => self.computer,
            TechKind::Radar => self.radar,
        }
    }

    /// Raise one technology by a level. Returns `false` if already maxed.
    pub fn upgrade(&mut self, kind: TechKind) -> bool {
        let slot = match kind {
            TechKind::Guns => &mut self.guns,
            TechKind::FireControl => &mut self.fire_control,
            TechKind::Computer => &mut self.computer,
            TechKind::Radar => &mut self.radar,
        };
        if *slot >= MAX_TECH_LEVEL {
            return false;
        }
        *slot += 1;
        true
    }

    /// Clamp every level into `0..=2`.
    #[must_use]
    pub fn clamped(self) -> Self {
        Self {
            guns: self.guns.min(MAX_TECH_LEVEL),
            fire_control: self.fire_control.min(MAX_TECH_LEVEL),
            computer: self.computer.min(MAX_TECH_LEVEL),
            radar: self.radar.min(MAX_TECH_LEVEL),
        }
    }
}

/// Augmentation factors and upgrade prices, indexed by level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TechTable {
    /// Detection range bonus: `range = base × (1 + radar_aug[level])`.
    pub radar_aug: [f64; 3],
    /// Dispersion reduction: `accuracy = base × (1 − gun_factor[level])`.
    pub gun_factor: [f64; 3],
    /// Base fire-control error reduction.
    pub fire_control_factor: [f64; 3],
    /// Correction interval reduction.
    pub computer_factor: [f64; 3],
    /// Price of reaching each level from the one below (index 0 unused).
    pub upgrade_cost: [u32; 3],
}

impl Default for TechTable {
    fn default() -> Self {
        Self {
            radar_aug: [0.0, 0.1, 0.2],
            gun_factor: [0.0, 0.15, 0.3],
            fire_control_factor: [0.0, 0.2, 0.4],
            computer_factor: [0.0, 0.25, 0.5],
            upgrade_cost: [0, 100, 200],
        }
    }
}

impl TechTable {
    fn at(table: &[f64; 3], level: u8) -> f64 {
        table[usize::from(level.min(MAX_TECH_LEVEL))]
    }

    /// Radar augmentation for a level.
    #[must_use]
    pub fn radar(&self, level: u8) -> f64 {
        Self::at(&self.radar_aug, level)
    }

    /// Gun dispersion factor for a level.
    #[must_use]
    pub fn guns(&self, level: u8) -> f64 {
        Self::at(&self.gun_factor, level)
    }

    /// Fire-control factor for a level.
    #[must_use]
    pub fn fire_control(&self, level: u8) -> f64 {
        Self::at(&self.fire_control_factor, level)
    }

    /// Computer factor for a level.
    #[must_use]
    pub fn computer(&self, level: u8) -> f64 {
        Self::at(&self.computer_factor, level)
    }

    /// Price of raising a technology from `current` to `current + 1`,
    /// `None` when already at the top.
    #[must_use]
    pub fn next_upgrade_cost(&self, current: u8) -> Option<u32> {
        (current < MAX_TECH_LEVEL).then(|| self.upgrade_cost[usize::from(current) + 1])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upgrade_stops_at_max() {
        let mut techs = TechLevels::default();
        assert!(techs.upgrade(TechKind::Radar));
        assert!(techs.upgrade(TechKind::Radar));
        assert!(!techs.upgrade(TechKind::Radar));
        assert_eq!(techs.radar, 2);
        assert_eq!(techs.level(TechKind::Guns), 0);
    }

    #[test]
    fn test_clamped() {
        let techs = TechLevels::uniform(7).clamped();
        assert_eq!(techs, TechLevels::uniform(2));
    }

    #[test]
    fn test_table_lookup() {
        let table = TechTable::default();
        assert_eq!(table.radar(0), 0.0);
        assert!((table.radar(2) - 0.2).abs() < 1e-12);
        // Out-of-range levels read the top entry
        assert!((table.guns(9) - 0.3).abs() < 1e-12);
        assert_eq!(table.next_upgrade_cost(0), Some(100));
        assert_eq!(table.next_upgrade_cost(1), Some(200));
        assert_eq!(table.next_upgrade_cost(2), None);
    }
}
