//! Ballistic shells.
//!
//! A shell flies in a straight line at its spawn heading, losing a fixed
//! amount of speed every tick. It is spent once it has travelled its
//! effective range (commanded range plus spread, capped at the size
//! class's maximum range) or once it stalls.

use serde::{Deserialize, Serialize};

use crate::ids::{ProjectileId, ShipId};
use crate::math::{movement_by, Vec2};
use crate::side::Side;

/// Shell caliber class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShellSize {
    /// Secondary battery.
    Small,
    /// Cruiser guns.
    Medium,
    /// Capital guns.
    Large,
}

/// Shell type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ShellType {
    /// Armor piercing; penetration falls off with speed.
    #[default]
    Ap,
    /// High explosive; no penetration.
    He,
}

/// Ballistic parameters of one size class.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShellSpec {
    /// Muzzle speed in units per tick.
    pub base_speed: f64,
    /// Speed lost per tick.
    pub deceleration: f64,
    /// Hard range cap.
    pub max_range: f64,
    /// Half-width of the uniform range spread applied at spawn.
    pub range_dispersion: f64,
    /// AP damage.
    pub ap_damage: f64,
    /// HE damage.
    pub he_damage: f64,
    /// AP penetration at muzzle speed.
    pub penetration: f64,
}

impl ShellSize {
    /// Ballistic table for this size.
    #[must_use]
    pub const fn spec(self) -> ShellSpec {
        match self {
            Self::Small => ShellSpec {
                base_speed: 20.0,
                deceleration: 0.008,
                max_range: 12_000.0,
                range_dispersion: 150.0,
                ap_damage: 50.0,
                he_damage: 70.0,
                penetration: 60.0,
            },
            Self::Medium => ShellSpec {
                base_speed: 25.0,
                deceleration: 0.01,
                max_range: 16_000.0,
                range_dispersion: 220.0,
                ap_damage: 120.0,
                he_damage: 150.0,
                penetration: 150.0,
            },
            Self::Large => ShellSpec {
                base_speed: 30.0,
                deceleration: 0.015,
                max_range: 21_000.0,
                range_dispersion: 300.0,
                ap_damage: 250.0,
                he_damage: 300.0,
                penetration: 350.0,
            },
        }
    }
}

/// Outcome of a projectile tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flight {
    /// Still travelling.
    InFlight,
    /// Reached its range or stalled; remove it.
    Spent,
}

/// A shell in flight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projectile {
    id: ProjectileId,
    owner: ShipId,
    side: Side,
    size: ShellSize,
    kind: ShellType,
    position: Vec2,
    heading: f64,
    speed: f64,
    travelled: f64,
    effective_range: f64,
    damage: f64,
    penetration: f64,
}

impl Projectile {
    /// Spawn a shell. `effective_range` is the already-perturbed
    /// commanded range; it is capped at the size's maximum.
    #[must_use]
    pub fn new(
        id: ProjectileId,
        owner: ShipId,
        side: Side,
        size: ShellSize,
        kind: ShellType,
        position: Vec2,
        heading: f64,
        effective_range: f64,
    ) -> Self {
        let spec = size.spec();
        let (damage, penetration) = match kind {
            ShellType::Ap => (spec.ap_damage, spec.penetration),
            ShellType::He => (spec.he_damage, 0.0),
        };
        Self {
            id,
            owner,
            side,
            size,
            kind,
            position,
            heading,
            speed: spec.base_speed,
            travelled: 0.0,
            effective_range: effective_range.clamp(0.0, spec.max_range),
            damage,
            penetration,
        }
    }

    /// Advance one tick.
    pub fn tick(&mut self) -> Flight {
        let spec = self.size.spec();
        self.position = movement_by(self.position, self.speed, self.heading);
        self.travelled += self.speed;
        self.speed = (self.speed - spec.deceleration).max(0.0);
        if self.kind == ShellType::Ap {
            self.penetration = spec.penetration * self.speed / spec.base_speed;
        }

        if self.travelled >= self.effective_range || self.speed <= 0.0 {
            Flight::Spent
        } else {
            Flight::InFlight
        }
    }

    /// Projectile id.
    #[must_use]
    pub const fn id(&self) -> ProjectileId {
        self.id
    }

    /// Firing ship.
    #[must_use]
    pub const fn owner(&self) -> ShipId {
        self.owner
    }

    /// Firing side.
    #[must_use]
    pub const fn side(&self) -> Side {
        self.side
    }

    /// Size class.
    #[must_use]
    pub const fn size(&self) -> ShellSize {
        self.size
    }

    /// Shell type.
    #[must_use]
    pub const fn kind(&self) -> ShellType {
        self.kind
    }

    /// Current position.
    #[must_use]
    pub const fn position(&self) -> Vec2 {
        self.position
    }

    /// Heading in degrees.
    #[must_use]
    pub const fn heading(&self) -> f64 {
        self.heading
    }

    /// Current speed.
    #[must_use]
    pub const fn speed(&self) -> f64 {
        self.speed
    }

    /// Distance flown so far.
    #[must_use]
    pub const fn travelled(&self) -> f64 {
        self.travelled
    }

    /// Range at which the shell is spent.
    #[must_use]
    pub const fn effective_range(&self) -> f64 {
        self.effective_range
    }

    /// Damage carried.
    #[must_use]
    pub const fn damage(&self) -> f64 {
        self.damage
    }

    /// Current penetration.
    #[must_use]
    pub const fn penetration(&self) -> f64 {
        self.penetration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shell(size: ShellSize, kind: ShellType, range: f64) -> Projectile {
        Projectile::new(
            ProjectileId(1),
            ShipId(1),
            Side::Ally,
            size,
            kind,
            Vec2::ZERO,
            0.0,
            range,
        )
    }

    fn fly(projectile: &mut Projectile) -> u32 {
        let mut ticks = 0;
        while projectile.tick() == Flight::InFlight {
            ticks += 1;
            assert!(ticks < 100_000, "shell never spent");
        }
        ticks + 1
    }

    #[test]
    fn test_first_tick_moves_at_muzzle_speed() {
        let mut p = shell(ShellSize::Large, ShellType::Ap, 10_000.0);
        assert_eq!(p.tick(), Flight::InFlight);
        assert!((p.position().x - 30.0).abs() < 1e-9);
        assert!(p.position().y.abs() < 1e-9);
        assert!((p.speed() - (30.0 - 0.015)).abs() < 1e-12);
    }

    #[test]
    fn test_spent_within_one_tick_of_range() {
        let mut p = shell(ShellSize::Medium, ShellType::He, 3_000.0);
        fly(&mut p);
        assert!(p.travelled() >= 3_000.0);
        assert!(p.travelled() <= 3_000.0 + ShellSize::Medium.spec().base_speed);
    }

    #[test]
    fn test_range_capped_at_size_maximum() {
        let p = shell(ShellSize::Small, ShellType::Ap, 50_000.0);
        assert_eq!(p.effective_range(), 12_000.0);
    }

    #[test]
    fn test_ap_penetration_decays_with_speed() {
        let mut p = shell(ShellSize::Large, ShellType::Ap, 20_000.0);
        let mut last = p.penetration();
        for _ in 0..100 {
            p.tick();
            assert!(p.penetration() < last);
            last = p.penetration();
        }
        let expected = 350.0 * p.speed() / 30.0;
        assert!((p.penetration() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_he_has_no_penetration() {
        let mut p = shell(ShellSize::Large, ShellType::He, 5_000.0);
        p.tick();
        assert_eq!(p.penetration(), 0.0);
        assert_eq!(p.damage(), 300.0);
    }

    #[test]
    fn test_every_size_reaches_its_max_range() {
        for size in [ShellSize::Small, ShellSize::Medium, ShellSize::Large] {
            let mut p = shell(size, ShellType::Ap, f64::INFINITY);
            fly(&mut p);
            assert!(p.travelled() >= size.spec().max_range, "{size:?} stalled early");
        }
    }
}
