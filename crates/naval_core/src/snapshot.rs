//! Read-only views of battle state for hosts and renderers.

use serde::{Deserialize, Serialize};

use crate::data::{CritComponents, TechLevels};
use crate::ids::{ProjectileId, ShipId};
use crate::math::Vec2;
use crate::projectile::{Projectile, ShellSize, ShellType};
use crate::ship::{Ship, SpeedOrder};
use crate::side::Side;
use crate::turret::TurretSize;
use crate::world::World;

/// One ship as seen from outside the simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipSnapshot {
    /// Ship id.
    pub id: ShipId,
    /// Class tag.
    pub class: String,
    /// Owning side.
    pub side: Side,
    /// Hull center.
    pub center: Vec2,
    /// Heading in degrees.
    pub heading: f64,
    /// Speed in world units per tick.
    pub speed: f64,
    /// Hit points.
    pub hp: f64,
    /// Hull maximum.
    pub max_hp: f64,
    /// Shield.
    pub shield: f64,
    /// Critical components.
    pub crit_components: CritComponents,
    /// Radar range including tech.
    pub detection_range: f64,
    /// Current gun target.
    pub target: Option<ShipId>,
    /// Route destination.
    pub destination: Option<Vec2>,
    /// Turret azimuths, bow to stern.
    pub turret_azimuths: Vec<f64>,
}

impl From<&Ship> for ShipSnapshot {
    fn from(ship: &Ship) -> Self {
        Self {
            id: ship.id(),
            class: ship.class().to_string(),
            side: ship.side(),
            center: ship.center(),
            heading: ship.heading(),
            speed: ship.speed(),
            hp: ship.hp(),
            max_hp: ship.hull().max_hp,
            shield: ship.shield(),
            crit_components: ship.crit_components(),
            detection_range: ship.detection_range(),
            target: ship.target(),
            destination: ship.navigation().destination,
            turret_azimuths: ship.turrets().iter().map(|t| t.azimuth()).collect(),
        }
    }
}

/// One shell in flight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectileSnapshot {
    /// Shell id.
    pub id: ProjectileId,
    /// Firing ship.
    pub owner: ShipId,
    /// Caliber.
    pub size: ShellSize,
    /// Shell type.
    pub kind: ShellType,
    /// Position.
    pub position: Vec2,
    /// Heading in degrees.
    pub heading: f64,
}

impl From<&Projectile> for ProjectileSnapshot {
    fn from(p: &Projectile) -> Self {
        Self {
            id: p.id(),
            owner: p.owner(),
            size: p.size(),
            kind: p.kind(),
            position: p.position(),
            heading: p.heading(),
        }
    }
}

/// The whole battle at one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleSnapshot {
    /// Ticks completed.
    pub tick: u64,
    /// Whether the clock is running.
    pub running: bool,
    /// Ships in id order.
    pub ships: Vec<ShipSnapshot>,
    /// Shells in flight, oldest first.
    pub projectiles: Vec<ProjectileSnapshot>,
}

impl BattleSnapshot {
    /// Capture the world.
    #[must_use]
    pub fn capture(world: &World, running: bool) -> Self {
        Self {
            tick: world.tick(),
            running,
            ships: world.ships().iter_sorted().map(ShipSnapshot::from).collect(),
            projectiles: world.projectiles().iter().map(ProjectileSnapshot::from).collect(),
        }
    }

    /// Ships on one side.
    pub fn side(&self, side: Side) -> impl Iterator<Item = &ShipSnapshot> {
        self.ships.iter().filter(move |s| s.side == side)
    }
}

/// Per-turret detail for the selected-ship panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurretStats {
    /// Size class.
    pub size: TurretSize,
    /// Azimuth in degrees.
    pub azimuth: f64,
    /// Ticks until loaded.
    pub reload_remaining: u32,
    /// Loaded shell type.
    pub shell_type: ShellType,
    /// Current fire-control error.
    pub fc_error: f64,
    /// Range of the last firing solution.
    pub range: f64,
}

/// Detailed stats of one ship, refreshed by hosts every tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipStats {
    /// Summary.
    pub ship: ShipSnapshot,
    /// Technology levels.
    pub techs: TechLevels,
    /// Engine order in effect.
    pub order: SpeedOrder,
    /// Player speed override.
    pub speed_override: Option<SpeedOrder>,
    /// Own radar contacts.
    pub detected: Vec<ShipId>,
    /// Own and relayed contacts.
    pub known_contacts: Vec<ShipId>,
    /// Contacts within gun range.
    pub in_range: Vec<ShipId>,
    /// Player-chosen target.
    pub manual_target: Option<ShipId>,
    /// Checkpoints still ahead.
    pub remaining_checkpoints: usize,
    /// Turrets, bow to stern.
    pub turrets: Vec<TurretStats>,
}

impl From<&Ship> for ShipStats {
    fn from(ship: &Ship) -> Self {
        let nav = ship.navigation();
        Self {
            ship: ShipSnapshot::from(ship),
            techs: ship.techs(),
            order: ship.order(),
            speed_override: ship.speed_override(),
            detected: ship.detected().to_vec(),
            known_contacts: ship.known_contacts(),
            in_range: ship.in_range().to_vec(),
            manual_target: ship.manual_target(),
            remaining_checkpoints: nav.checkpoints.len().saturating_sub(nav.current),
            turrets: ship
                .turrets()
                .iter()
                .map(|t| TurretStats {
                    size: t.size(),
                    azimuth: t.azimuth(),
                    reload_remaining: t.reload_remaining(),
                    shell_type: t.shell_type(),
                    fc_error: t.fc_error(),
                    range: t.range(),
                })
                .collect(),
        }
    }
}
