//! Gun turrets and their fire-control pipeline.
//!
//! Each tick a turret with a target:
//! 1. counts down its reload
//! 2. periodically shrinks its fire-control error
//! 3. leads the target using a noisy velocity estimate
//! 4. slews toward the solution at its rotation rate
//! 5. fires a volley once aligned within one degree and loaded
//!
//! Range is not a firing condition: shells commanded past their maximum
//! range are cut off there by the projectile.
//!
//! Without a target it slews back to the ship's heading.
//!
//! The target velocity is estimated per tick from successive
//! [`Turret::set_target`] samples, so it refreshes at the ship's
//! target-lock rate rather than every tick.

use serde::{Deserialize, Serialize};

use crate::clock::Countdown;
use crate::data::{TechLevels, TechTable};
use crate::ids::ShipId;
use crate::math::{normalize_angle, proportional, smallest_angle, Vec2};
use crate::projectile::{ShellSize, ShellType};
use crate::rng::{uniform, SimRng};

/// Fire-control error right after acquiring a target, before tech.
pub const BASE_FC_ERROR: f64 = 0.3;

/// Share of the base error removed per correction.
pub const FC_REDUCTION_RATE: f64 = 0.1;

/// Ticks between corrections, before tech.
pub const FC_CORRECTION_RATE: u32 = 40;

/// Largest azimuth error at which a volley may be fired, in degrees.
pub const FIRING_WINDOW: f64 = 1.0;

/// Turret size class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TurretSize {
    /// Single-gun mount.
    Small,
    /// Twin mount.
    Medium,
    /// Triple mount.
    Large,
}

/// Static parameters of a turret size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TurretSpec {
    /// Guns per volley.
    pub guns: u32,
    /// Slew rate in degrees per tick.
    pub rotation_speed: f64,
    /// Ticks between volleys.
    pub reload: u32,
    /// Base per-gun dispersion half-angle in degrees.
    pub dispersion: f64,
    /// Mount length along the barrels.
    pub width: f64,
    /// Mount breadth across the barrels.
    pub height: f64,
    /// Shell fired.
    pub shell: ShellSize,
}

impl TurretSize {
    /// Parameters for this size.
    #[must_use]
    pub const fn spec(self) -> TurretSpec {
        match self {
            Self::Small => TurretSpec {
                guns: 1,
                rotation_speed: 2.0,
                reload: 60,
                dispersion: 1.0,
                width: 40.0,
                height: 20.0,
                shell: ShellSize::Small,
            },
            Self::Medium => TurretSpec {
                guns: 2,
                rotation_speed: 1.2,
                reload: 120,
                dispersion: 0.7,
                width: 60.0,
                height: 30.0,
                shell: ShellSize::Medium,
            },
            Self::Large => TurretSpec {
                guns: 3,
                rotation_speed: 0.8,
                reload: 200,
                dispersion: 0.5,
                width: 80.0,
                height: 40.0,
                shell: ShellSize::Large,
            },
        }
    }
}

/// One shell leaving a barrel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shot {
    /// Muzzle position in world units.
    pub position: Vec2,
    /// Heading in degrees, dispersion included.
    pub heading: f64,
    /// Perturbed commanded range.
    pub range: f64,
}

/// Where the turret sits this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mounting {
    /// Turret world position.
    pub origin: Vec2,
    /// Parent ship heading in degrees.
    pub ship_heading: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct TargetSample {
    position: Vec2,
    tick: u64,
}

/// A gun turret owned by a ship.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turret {
    size: TurretSize,
    /// Offset from the ship center in the ship frame (+x forward).
    mount: Vec2,
    azimuth: f64,
    reload: u32,
    shell_type: ShellType,
    accuracy: f64,
    target: Option<ShipId>,
    last_sample: Option<TargetSample>,
    velocity: Vec2,
    range: f64,
    fc_error: f64,
    fc_base_error: f64,
    fc_correction: Countdown,
}

impl Turret {
    /// Create a loaded turret pointing along `azimuth`.
    #[must_use]
    pub fn new(
        size: TurretSize,
        mount: Vec2,
        azimuth: f64,
        techs: &TechLevels,
        table: &TechTable,
    ) -> Self {
        let spec = size.spec();
        let fc_base_error = BASE_FC_ERROR * (1.0 - table.fire_control(techs.fire_control));
        let correction =
            (f64::from(FC_CORRECTION_RATE) * (1.0 - table.computer(techs.computer))).round();
        Self {
            size,
            mount,
            azimuth: normalize_angle(azimuth),
            reload: 0,
            shell_type: ShellType::default(),
            accuracy: spec.dispersion * (1.0 - table.guns(techs.guns)),
            target: None,
            last_sample: None,
            velocity: Vec2::ZERO,
            range: 0.0,
            fc_error: fc_base_error,
            fc_base_error,
            fc_correction: Countdown::new(correction.max(1.0) as u32),
        }
    }

    /// Assign, refresh or clear the target.
    ///
    /// Re-assigning the same target updates the velocity estimate from
    /// the displacement since the previous sample. A different target
    /// restarts tracking with zero velocity and base fire-control error.
    pub fn set_target(&mut self, target: Option<(ShipId, Vec2)>, tick: u64) {
        let Some((id, position)) = target else {
            self.clear_target();
            return;
        };

        if self.target == Some(id) {
            if let Some(previous) = self.last_sample {
                let dt = tick.saturating_sub(previous.tick);
                if dt > 0 {
                    self.velocity = (position - previous.position) * (1.0 / dt as f64);
                }
            }
        } else {
            self.target = Some(id);
            self.velocity = Vec2::ZERO;
            self.range = 0.0;
            self.fc_error = self.fc_base_error;
            self.fc_correction = Countdown::new(self.fc_correction.period());
            self.fc_correction.arm();
        }
        self.last_sample = Some(TargetSample { position, tick });
    }

    /// Choose the shell type for future volleys.
    pub fn set_shell_type(&mut self, shell_type: ShellType) {
        self.shell_type = shell_type;
    }

    fn clear_target(&mut self) {
        self.target = None;
        self.last_sample = None;
        self.velocity = Vec2::ZERO;
        self.range = 0.0;
    }

    /// Advance one tick.
    ///
    /// `target_position` is the live position of the current target, or
    /// `None` if it no longer exists, which clears the target. Returns the
    /// volley when one is fired.
    pub fn tick(
        &mut self,
        mounting: Mounting,
        target_position: Option<Vec2>,
        rng: &mut SimRng,
    ) -> Option<Vec<Shot>> {
        self.reload = self.reload.saturating_sub(1);

        if self.target.is_some() && target_position.is_none() {
            self.clear_target();
        }

        let Some(target) = target_position.filter(|_| self.target.is_some()) else {
            self.slew_toward(mounting.ship_heading);
            return None;
        };

        if self.fc_correction.expire() {
            self.fc_error =
                (self.fc_error - self.fc_base_error * FC_REDUCTION_RATE).max(0.0);
        }

        let solution = self.firing_solution(mounting.origin, target, rng);
        self.slew_toward(solution);

        let aligned = smallest_angle(solution, self.azimuth).abs() <= FIRING_WINDOW;
        let spec = self.size.spec();
        if aligned && self.reload == 0 {
            self.reload = spec.reload;
            return Some(self.volley(mounting.origin, rng));
        }
        None
    }

    fn firing_solution(&mut self, origin: Vec2, target: Vec2, rng: &mut SimRng) -> f64 {
        let mut velocity = self.velocity;
        velocity.x += uniform(rng, self.fc_error * velocity.x.abs());
        velocity.y += uniform(rng, self.fc_error * velocity.y.abs());

        // Flight time from the cached range; live distance until one exists
        let range = if self.range > 0.0 {
            self.range
        } else {
            origin.distance(target)
        };
        let flight_time = range / self.size.spec().shell.spec().base_speed;
        let predicted = target + velocity * flight_time;
        let delta = predicted - origin;
        let range = delta.length();
        self.range = range;

        if range <= f64::EPSILON {
            return self.azimuth;
        }
        let angle = (delta.x / range).clamp(-1.0, 1.0).acos().to_degrees();
        if delta.y < 0.0 {
            -angle
        } else {
            angle
        }
    }

    fn slew_toward(&mut self, heading: f64) {
        let rate = self.size.spec().rotation_speed;
        let step = proportional(0.0, 0.0, rate, Some(smallest_angle(heading, self.azimuth)));
        self.azimuth = normalize_angle(self.azimuth + step);
    }

    fn volley(&self, origin: Vec2, rng: &mut SimRng) -> Vec<Shot> {
        let spec = self.size.spec();
        let shell = spec.shell.spec();
        let guns = spec.guns;
        (0..guns)
            .map(|gun| {
                let lateral =
                    f64::from(gun + 1) * spec.height / f64::from(guns + 1) - spec.height / 2.0;
                let muzzle = Vec2::new(spec.width / 2.0, lateral).rotated(self.azimuth);
                Shot {
                    position: origin + muzzle,
                    heading: self.azimuth + uniform(rng, self.accuracy),
                    range: self.range + uniform(rng, shell.range_dispersion),
                }
            })
            .collect()
    }

    /// Size class.
    #[must_use]
    pub const fn size(&self) -> TurretSize {
        self.size
    }

    /// Mount offset in the ship frame.
    #[must_use]
    pub const fn mount(&self) -> Vec2 {
        self.mount
    }

    /// World position for a ship pose.
    #[must_use]
    pub fn world_position(&self, ship_center: Vec2, ship_heading: f64) -> Vec2 {
        ship_center + self.mount.rotated(ship_heading)
    }

    /// Azimuth in degrees, world frame.
    #[must_use]
    pub const fn azimuth(&self) -> f64 {
        self.azimuth
    }

    /// Ticks until loaded.
    #[must_use]
    pub const fn reload_remaining(&self) -> u32 {
        self.reload
    }

    /// Selected shell type.
    #[must_use]
    pub const fn shell_type(&self) -> ShellType {
        self.shell_type
    }

    /// Dispersion half-angle in degrees, tech included.
    #[must_use]
    pub const fn accuracy(&self) -> f64 {
        self.accuracy
    }

    /// Current target.
    #[must_use]
    pub const fn target(&self) -> Option<ShipId> {
        self.target
    }

    /// Estimated target velocity per tick.
    #[must_use]
    pub const fn estimated_velocity(&self) -> Vec2 {
        self.velocity
    }

    /// Range to the last predicted impact point.
    #[must_use]
    pub const fn range(&self) -> f64 {
        self.range
    }

    /// Current fire-control error.
    #[must_use]
    pub const fn fc_error(&self) -> f64 {
        self.fc_error
    }

    /// Maximum range of this turret's shells.
    #[must_use]
    pub fn max_range(&self) -> f64 {
        self.size.spec().shell.spec().max_range
    }
}
