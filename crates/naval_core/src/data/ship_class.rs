//! Data-driven ship class definitions.
//!
//! A class is a nested document with one section per concern, so a
//! catalog file reads like the ship's spec sheet:
//!
//! ```ron
//! ShipClass(
//!     naming: (tag: "dd", name: "Destroyer"),
//!     geometry: (width: 300.0, height: 40.0),
//!     hull: (
//!         max_hp: 1000.0, armor: 20.0, max_shield: 0.0,
//!         max_speed: 12.0, max_accel: 0.6, turn_rate: 0.5,
//!         concealment: 0.6, detection_range: 8000.0,
//!     ),
//!     weapons: [(size: Small, offset: (x: 100.0, y: 0.0))],
//!     cost: 300,
//! )
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::math::Vec2;
use crate::turret::TurretSize;

use super::tech::TechLevels;

/// Identification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Naming {
    /// Short unique tag used by spawn commands (e.g. `"dd"`).
    pub tag: String,
    /// Display name.
    pub name: String,
}

/// Hull rectangle in world units; `width` lies along the heading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    /// Length along the heading.
    pub width: f64,
    /// Beam.
    pub height: f64,
}

/// Hull and machinery.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hull {
    /// Hit points.
    pub max_hp: f64,
    /// Armor thickness.
    pub armor: f64,
    /// Shield points.
    pub max_shield: f64,
    /// Top speed in units per tick.
    pub max_speed: f64,
    /// Speed change per tick, used for both acceleration and braking.
    pub max_accel: f64,
    /// Degrees per tick.
    pub turn_rate: f64,
    /// How hard the ship is to spot, in `[0, 1]`.
    pub concealment: f64,
    /// Detection range before radar tech.
    pub detection_range: f64,
}

/// A turret position on the hull.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TurretMount {
    /// Turret size.
    pub size: TurretSize,
    /// Offset from the hull center in the ship frame (+x forward).
    pub offset: Vec2,
}

/// Per-class overrides of the scheduler rates, in ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Refresh {
    /// Path replan interval.
    pub path_update: Option<u32>,
    /// Radar scan interval.
    pub radar_scan: Option<u32>,
    /// Target lock interval.
    pub target_lock: Option<u32>,
}

/// Critical component hit points. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CritComponents {
    /// Engine room.
    pub engine: f64,
    /// Steering gear.
    pub rudder: f64,
    /// Fire-control director.
    pub fire_control: f64,
    /// Magazine.
    pub magazine: f64,
}

impl Default for CritComponents {
    fn default() -> Self {
        Self {
            engine: 100.0,
            rudder: 100.0,
            fire_control: 100.0,
            magazine: 100.0,
        }
    }
}

/// Speed order fractions of `max_speed`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeedParams {
    /// Maneuvering speed.
    pub slow: f64,
    /// Half ahead.
    pub half: f64,
    /// Full ahead.
    pub full: f64,
}

impl Default for SpeedParams {
    fn default() -> Self {
        Self {
            slow: 0.25,
            half: 0.5,
            full: 1.0,
        }
    }
}

/// A ship class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipClass {
    /// Identification.
    pub naming: Naming,
    /// Hull rectangle.
    pub geometry: Geometry,
    /// Hull and machinery.
    pub hull: Hull,
    /// Turrets from bow to stern.
    #[serde(default)]
    pub weapons: Vec<TurretMount>,
    /// Technology levels a freshly spawned ship starts with.
    #[serde(default)]
    pub techs: TechLevels,
    /// Scheduler overrides.
    #[serde(default)]
    pub refresh: Refresh,
    /// Critical components.
    #[serde(default)]
    pub crit_components: CritComponents,
    /// Speed order fractions.
    #[serde(default)]
    pub speed_params: SpeedParams,
    /// Purchase price.
    pub cost: u32,
}

impl ShipClass {
    /// Class tag.
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.naming.tag
    }

    /// Check the class for values the simulation cannot work with.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidInput`] naming the class and the bad field.
    pub fn validate(&self) -> Result<()> {
        let fail = |field: &str| {
            Err(SimError::InvalidInput(format!(
                "ship class '{}': {field}",
                self.naming.tag
            )))
        };

        if self.naming.tag.is_empty() {
            return fail("empty tag");
        }
        if self.geometry.width <= 0.0 || self.geometry.height <= 0.0 {
            return fail("geometry must be positive");
        }
        let hull = &self.hull;
        if hull.max_speed <= 0.0 || hull.max_accel <= 0.0 || hull.turn_rate <= 0.0 {
            return fail("max_speed, max_accel and turn_rate must be positive");
        }
        if !(0.0..=1.0).contains(&hull.concealment) {
            return fail("concealment must lie in [0, 1]");
        }
        if hull.detection_range <= 0.0 {
            return fail("detection_range must be positive");
        }
        let speeds = &self.speed_params;
        if !(0.0 < speeds.slow && speeds.slow <= speeds.half && speeds.half <= speeds.full && speeds.full <= 1.0)
        {
            return fail("speed_params must satisfy 0 < slow <= half <= full <= 1");
        }
        Ok(())
    }
}

/// The set of ship classes available to a battle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipCatalog {
    /// Classes in catalog order.
    pub classes: Vec<ShipClass>,
}

impl ShipCatalog {
    /// Parse a catalog from RON and validate it.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::ConfigParse`] on malformed RON and
    /// [`SimError::InvalidInput`] on invalid classes or duplicate tags.
    pub fn from_ron_str(text: &str) -> Result<Self> {
        let catalog: Self = ron::from_str(text)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Validate every class and reject duplicate tags.
    ///
    /// # Errors
    ///
    /// Returns the first class error found.
    pub fn validate(&self) -> Result<()> {
        for (i, class) in self.classes.iter().enumerate() {
            class.validate()?;
            if self.classes[..i].iter().any(|c| c.tag() == class.tag()) {
                return Err(SimError::InvalidInput(format!(
                    "duplicate ship class tag '{}'",
                    class.tag()
                )));
            }
        }
        Ok(())
    }

    /// Look up a class by tag.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::UnknownShipClass`] if no class has this tag.
    pub fn get(&self, tag: &str) -> Result<&ShipClass> {
        self.classes
            .iter()
            .find(|c| c.tag() == tag)
            .ok_or_else(|| SimError::UnknownShipClass(tag.to_string()))
    }

    /// Class tags in catalog order.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.classes.iter().map(ShipClass::tag)
    }
}

fn mount(size: TurretSize, x: f64) -> TurretMount {
    TurretMount {
        size,
        offset: Vec2::new(x, 0.0),
    }
}

impl Default for ShipCatalog {
    /// Destroyer, light cruiser and battleship.
    fn default() -> Self {
        Self {
            classes: vec![
                ShipClass {
                    naming: Naming {
                        tag: "dd".into(),
                        name: "Destroyer".into(),
                    },
                    geometry: Geometry {
                        width: 300.0,
                        height: 40.0,
                    },
                    hull: Hull {
                        max_hp: 1_000.0,
                        armor: 20.0,
                        max_shield: 0.0,
                        max_speed: 12.0,
                        max_accel: 0.6,
                        turn_rate: 0.5,
                        concealment: 0.6,
                        detection_range: 8_000.0,
                    },
                    weapons: vec![
                        mount(TurretSize::Small, 100.0),
                        mount(TurretSize::Small, -100.0),
                    ],
                    techs: TechLevels::default(),
                    refresh: Refresh::default(),
                    crit_components: CritComponents::default(),
                    speed_params: SpeedParams::default(),
                    cost: 300,
                },
                ShipClass {
                    naming: Naming {
                        tag: "cl".into(),
                        name: "Light Cruiser".into(),
                    },
                    geometry: Geometry {
                        width: 400.0,
                        height: 55.0,
                    },
                    hull: Hull {
                        max_hp: 2_500.0,
                        armor: 60.0,
                        max_shield: 100.0,
                        max_speed: 10.0,
                        max_accel: 0.5,
                        turn_rate: 0.3,
                        concealment: 0.4,
                        detection_range: 9_000.0,
                    },
                    weapons: vec![
                        mount(TurretSize::Medium, 130.0),
                        mount(TurretSize::Medium, 0.0),
                        mount(TurretSize::Medium, -130.0),
                    ],
                    techs: TechLevels::default(),
                    refresh: Refresh::default(),
                    crit_components: CritComponents {
                        engine: 200.0,
                        rudder: 150.0,
                        fire_control: 150.0,
                        magazine: 200.0,
                    },
                    speed_params: SpeedParams::default(),
                    cost: 600,
                },
                ShipClass {
                    naming: Naming {
                        tag: "bb".into(),
                        name: "Battleship".into(),
                    },
                    geometry: Geometry {
                        width: 600.0,
                        height: 90.0,
                    },
                    hull: Hull {
                        max_hp: 6_000.0,
                        armor: 150.0,
                        max_shield: 300.0,
                        max_speed: 8.0,
                        max_accel: 0.3,
                        turn_rate: 0.2,
                        concealment: 0.2,
                        detection_range: 10_000.0,
                    },
                    weapons: vec![
                        mount(TurretSize::Large, 200.0),
                        mount(TurretSize::Large, 60.0),
                        mount(TurretSize::Large, -200.0),
                    ],
                    techs: TechLevels::default(),
                    refresh: Refresh::default(),
                    crit_components: CritComponents {
                        engine: 400.0,
                        rudder: 300.0,
                        fire_control: 300.0,
                        magazine: 500.0,
                    },
                    speed_params: SpeedParams {
                        slow: 0.3,
                        half: 0.55,
                        full: 1.0,
                    },
                    cost: 1_200,
                },
            ],
        }
    }
}
