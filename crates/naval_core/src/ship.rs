//! Ships: motion, navigation, sensing state and turret ownership.
//!
//! A ship is a single value built from its [`ShipClass`]; class
//! differences live entirely in data. The per-tick schedule that needs
//! the rest of the world (replans, radar, target locks, movement) is
//! driven by the ship system in [`crate::systems`]; this module holds
//! the per-ship pieces of it.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::clock::Countdown;
use crate::config::SimConfig;
use crate::data::{CritComponents, Geometry, Hull, ShipClass, SpeedParams, TechLevels, TechTable};
use crate::error::Result;
use crate::ids::ShipId;
use crate::math::{
    brake_distance, normalize_angle, parallelepiped_center, proportional, rotation_centers,
    rotation_radius, smallest_angle, Vec2,
};
use crate::pathfinding::{OccupancyGrid, Pathfinder};
use crate::side::Side;
use crate::turret::{Mounting, Turret};

/// Engine order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SpeedOrder {
    /// All stop.
    #[default]
    Stop,
    /// Maneuvering speed.
    Slow,
    /// Half ahead.
    Half,
    /// Full ahead.
    Full,
}

impl SpeedOrder {
    /// Fraction of top speed for this order.
    #[must_use]
    pub fn fraction(self, params: &SpeedParams) -> f64 {
        match self {
            Self::Stop => 0.0,
            Self::Slow => params.slow,
            Self::Half => params.half,
            Self::Full => params.full,
        }
    }
}

/// Planned route toward a destination.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Navigation {
    /// Requested end point.
    pub destination: Option<Vec2>,
    /// Remaining checkpoints; the last one is the destination itself.
    pub checkpoints: Vec<Vec2>,
    /// Index of the checkpoint being steered for.
    pub current: usize,
}

impl Navigation {
    /// Checkpoint being steered for.
    #[must_use]
    pub fn checkpoint(&self) -> Option<Vec2> {
        self.checkpoints.get(self.current).copied()
    }

    fn clear(&mut self) {
        self.destination = None;
        self.checkpoints.clear();
        self.current = 0;
    }
}

/// Result of the movement phase before the grounding check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Motion {
    /// Speed after this tick's acceleration.
    pub speed: f64,
    /// Center after this tick's advance.
    pub center: Vec2,
    /// Order that produced the speed.
    pub order: SpeedOrder,
}

/// A ship in the battle.
#[derive(Debug, Clone)]
pub struct Ship {
    id: ShipId,
    class: String,
    side: Side,
    geometry: Geometry,
    hull: Hull,
    speed_params: SpeedParams,
    crit_components: CritComponents,
    techs: TechLevels,
    detection_range: f64,
    hp: f64,
    shield: f64,

    center: Vec2,
    heading: f64,
    speed: f64,
    rot_direction: i8,
    order: SpeedOrder,
    speed_override: Option<SpeedOrder>,

    turrets: Vec<Turret>,

    nav: Navigation,
    pathfinder: Pathfinder,

    detected: Vec<ShipId>,
    radio_contacts: Vec<ShipId>,
    in_range: Vec<ShipId>,
    target: Option<ShipId>,
    manual_target: Option<ShipId>,

    path_update: Countdown,
    radar_scan: Countdown,
    target_lock: Countdown,
}

impl Ship {
    /// Build a ship of `class` centered on `center`.
    #[must_use]
    pub fn new(
        id: ShipId,
        class: &ShipClass,
        side: Side,
        center: Vec2,
        heading: f64,
        techs: TechLevels,
        table: &TechTable,
        config: &SimConfig,
        grid: &OccupancyGrid,
    ) -> Self {
        let techs = techs.clamped();
        let heading = normalize_angle(heading);
        let turrets = class
            .weapons
            .iter()
            .map(|mount| Turret::new(mount.size, mount.offset, heading, &techs, table))
            .collect();
        let refresh = class.refresh;

        Self {
            id,
            class: class.tag().to_string(),
            side,
            geometry: class.geometry,
            hull: class.hull,
            speed_params: class.speed_params,
            crit_components: class.crit_components,
            techs,
            detection_range: class.hull.detection_range * (1.0 + table.radar(techs.radar)),
            hp: class.hull.max_hp,
            shield: class.hull.max_shield,
            center,
            heading,
            speed: 0.0,
            rot_direction: 0,
            order: SpeedOrder::Stop,
            speed_override: None,
            turrets,
            nav: Navigation::default(),
            pathfinder: Pathfinder::new(grid),
            detected: Vec::new(),
            radio_contacts: Vec::new(),
            in_range: Vec::new(),
            target: None,
            manual_target: None,
            path_update: Countdown::new(refresh.path_update.unwrap_or(config.path_update_rate)),
            radar_scan: Countdown::new(refresh.radar_scan.unwrap_or(config.radar_scan_rate)),
            target_lock: Countdown::new(refresh.target_lock.unwrap_or(config.target_lock_rate)),
        }
    }

    // ---- Navigation ----

    /// Plan a route to `point` and start following it.
    ///
    /// The start node is dropped and the final node is replaced by the
    /// exact destination.
    ///
    /// # Errors
    ///
    /// Returns the pathfinder's error; the ship is then left without a route.
    pub fn set_destination(&mut self, point: Vec2) -> Result<()> {
        self.nav.clear();
        let checkpoints = self.plan(point)?;
        self.nav.destination = Some(point);
        self.nav.checkpoints = checkpoints;
        self.path_update.arm();
        debug!(ship = %self.id, x = point.x, y = point.y, checkpoints = self.nav.checkpoints.len(), "Destination set");
        Ok(())
    }

    /// Replan toward the current destination from the current position.
    ///
    /// On failure the destination is kept so a later replan can retry.
    pub fn update_path(&mut self) {
        let Some(destination) = self.nav.destination else {
            return;
        };
        match self.plan(destination) {
            Ok(checkpoints) => {
                self.nav.checkpoints = checkpoints;
                self.nav.current = 0;
                debug!(ship = %self.id, checkpoints = self.nav.checkpoints.len(), "Path replanned");
            }
            Err(err) => {
                self.nav.checkpoints.clear();
                self.nav.current = 0;
                warn!(ship = %self.id, %err, "Replan failed, holding");
            }
        }
        self.path_update.arm();
    }

    fn plan(&mut self, point: Vec2) -> Result<Vec<Vec2>> {
        let mut checkpoints = self.pathfinder.find_path(self.center, point)?;
        if !checkpoints.is_empty() {
            checkpoints.remove(0);
        }
        match checkpoints.last_mut() {
            Some(last) => *last = point,
            None => checkpoints.push(point),
        }
        Ok(checkpoints)
    }

    /// Abandon the route.
    pub fn clear_path(&mut self) {
        self.nav.clear();
    }

    /// Route state.
    #[must_use]
    pub const fn navigation(&self) -> &Navigation {
        &self.nav
    }

    /// True when a destination is set and not yet reached.
    #[must_use]
    pub const fn has_destination(&self) -> bool {
        self.nav.destination.is_some()
    }

    /// Replan on the next tick.
    pub fn force_replan(&mut self) {
        self.path_update.trigger();
    }

    pub(crate) fn path_update_due(&mut self) -> bool {
        self.path_update.expire()
    }

    pub(crate) fn radar_scan_due(&mut self) -> bool {
        self.radar_scan.expire()
    }

    pub(crate) fn target_lock_due(&mut self) -> bool {
        self.target_lock.expire()
    }

    // ---- Motion ----

    /// Radius of the hardest turn at the current speed.
    #[must_use]
    pub fn rotation_radius(&self) -> f64 {
        rotation_radius(self.speed, self.hull.turn_rate)
    }

    /// Port and starboard turning-circle centers.
    #[must_use]
    pub fn rotation_centers(&self) -> (Vec2, Vec2) {
        rotation_centers(self.center, self.heading, self.speed, self.hull.turn_rate)
    }

    /// Check whether `point` lies inside the turning circle on the side
    /// the ship is currently turning toward, i.e. cannot be reached
    /// without overshooting. A ship steering straight reaches everything.
    #[must_use]
    pub fn is_inside_turn_circle(&self, point: Vec2) -> bool {
        let (port, starboard) = self.rotation_centers();
        let center = match self.rot_direction {
            1 => starboard,
            -1 => port,
            _ => return false,
        };
        center.distance(point) < self.rotation_radius()
    }

    fn steer_toward(&mut self, point: Vec2) {
        let delta = point - self.center;
        if delta.length() <= f64::EPSILON {
            self.rot_direction = 0;
            return;
        }
        let desired = delta.y.atan2(delta.x).to_degrees();
        let step = proportional(
            0.0,
            0.0,
            self.hull.turn_rate,
            Some(smallest_angle(desired, self.heading)),
        );
        self.heading = normalize_angle(self.heading + step);
        self.rot_direction = if step > 1e-12 {
            1
        } else if step < -1e-12 {
            -1
        } else {
            0
        };
    }

    fn select_speed_order(&self) -> SpeedOrder {
        let Some(checkpoint) = self.nav.checkpoint() else {
            return self.speed_override.unwrap_or(SpeedOrder::Stop);
        };
        if self.center.distance(checkpoint) <= brake_distance(self.speed, self.hull.max_accel) {
            return SpeedOrder::Stop;
        }
        if self.is_inside_turn_circle(checkpoint) {
            return SpeedOrder::Slow;
        }
        self.speed_override.unwrap_or(SpeedOrder::Full)
    }

    /// Steer toward the current checkpoint and compute this tick's motion.
    ///
    /// Heading is updated in place; speed and position are returned so the
    /// caller can check the new center against the grid before committing.
    pub fn plan_motion(&mut self) -> Motion {
        match self.nav.checkpoint() {
            Some(checkpoint) => self.steer_toward(checkpoint),
            None => self.rot_direction = 0,
        }
        let order = self.select_speed_order();
        let target_speed = self.hull.max_speed * order.fraction(&self.speed_params);
        let speed = (self.speed + proportional(target_speed, self.speed, self.hull.max_accel, None))
            .max(0.0);
        Motion {
            speed,
            center: self.center + Vec2::from_heading(self.heading) * speed,
            order,
        }
    }

    /// Commit a planned motion.
    pub fn apply_motion(&mut self, motion: Motion) {
        self.speed = motion.speed;
        self.center = motion.center;
        self.order = motion.order;
    }

    /// Hold position and shed speed after the planned center was blocked.
    pub fn hold_position(&mut self) {
        self.speed = (self.speed - self.hull.max_accel).max(0.0);
        self.order = SpeedOrder::Stop;
        self.force_replan();
    }

    /// Advance past the current checkpoint if within `tolerance`.
    ///
    /// Returns true when the last checkpoint was reached and the route cleared.
    pub fn advance_checkpoint(&mut self, tolerance: f64) -> bool {
        let Some(checkpoint) = self.nav.checkpoint() else {
            return false;
        };
        if self.center.distance(checkpoint) > tolerance {
            return false;
        }
        self.nav.current += 1;
        if self.nav.current >= self.nav.checkpoints.len() {
            debug!(ship = %self.id, "Destination reached");
            self.nav.clear();
            return true;
        }
        false
    }

    /// Set or clear the engine order used when no route constrains speed.
    pub fn set_speed_override(&mut self, order: Option<SpeedOrder>) {
        self.speed_override = order;
    }

    // ---- Sensing and targeting ----

    /// Replace the own radar contacts.
    pub fn set_detected(&mut self, mut contacts: Vec<ShipId>) {
        contacts.sort_unstable();
        contacts.dedup();
        self.detected = contacts;
    }

    /// Replace the contacts relayed by radio.
    pub fn receive_radio_comm(&mut self, mut contacts: Vec<ShipId>) {
        contacts.sort_unstable();
        contacts.dedup();
        self.radio_contacts = contacts;
    }

    /// Own and radio contacts, sorted and deduplicated.
    #[must_use]
    pub fn known_contacts(&self) -> Vec<ShipId> {
        let mut all: Vec<ShipId> = self
            .detected
            .iter()
            .chain(&self.radio_contacts)
            .copied()
            .collect();
        all.sort_unstable();
        all.dedup();
        all
    }

    /// Replace the contacts within gun range.
    pub fn set_in_range(&mut self, mut contacts: Vec<ShipId>) {
        contacts.sort_unstable();
        contacts.dedup();
        self.in_range = contacts;
    }

    /// Drop every reference to ships that no longer exist.
    pub fn forget_missing(&mut self, exists: impl Fn(ShipId) -> bool) {
        self.detected.retain(|id| exists(*id));
        self.radio_contacts.retain(|id| exists(*id));
        self.in_range.retain(|id| exists(*id));
        if self.target.is_some_and(|id| !exists(id)) {
            self.target = None;
        }
        if self.manual_target.is_some_and(|id| !exists(id)) {
            self.manual_target = None;
        }
    }

    /// First ship in gun range, if any.
    #[must_use]
    pub fn auto_select_target(&self) -> Option<ShipId> {
        self.in_range.first().copied()
    }

    /// Pick this lock's target: the manual choice while it is in range,
    /// otherwise the automatic one.
    pub fn lock_target(&mut self) -> Option<ShipId> {
        self.target = match self.manual_target {
            Some(manual) if self.in_range.contains(&manual) => Some(manual),
            _ => self.auto_select_target(),
        };
        self.target
    }

    /// Set or clear the manual target.
    pub fn select_target(&mut self, target: Option<ShipId>) {
        self.manual_target = target;
    }

    /// Longest range among the turrets.
    #[must_use]
    pub fn max_gun_range(&self) -> f64 {
        self.turrets
            .iter()
            .map(Turret::max_range)
            .fold(0.0, f64::max)
    }

    // ---- Turrets ----

    /// Turrets from bow to stern.
    #[must_use]
    pub fn turrets(&self) -> &[Turret] {
        &self.turrets
    }

    /// Mutable turrets.
    pub fn turrets_mut(&mut self) -> &mut [Turret] {
        &mut self.turrets
    }

    /// Where a turret sits on the current pose.
    #[must_use]
    pub fn mounting(&self, turret: usize) -> Option<Mounting> {
        self.turrets.get(turret).map(|t| Mounting {
            origin: t.world_position(self.center, self.heading),
            ship_heading: self.heading,
        })
    }

    // ---- Accessors ----

    /// Ship id.
    #[must_use]
    pub const fn id(&self) -> ShipId {
        self.id
    }

    /// Class tag.
    #[must_use]
    pub fn class(&self) -> &str {
        &self.class
    }

    /// Side.
    #[must_use]
    pub const fn side(&self) -> Side {
        self.side
    }

    /// Hull center.
    #[must_use]
    pub const fn center(&self) -> Vec2 {
        self.center
    }

    /// Top-left corner of the unrotated hull rectangle.
    #[must_use]
    pub fn top_left(&self) -> Vec2 {
        Vec2::new(
            self.center.x - self.geometry.width / 2.0,
            self.center.y - self.geometry.height / 2.0,
        )
    }

    /// Hull rectangle.
    #[must_use]
    pub const fn geometry(&self) -> Geometry {
        self.geometry
    }

    /// Heading in degrees, `(-180, 180]`.
    #[must_use]
    pub const fn heading(&self) -> f64 {
        self.heading
    }

    /// Speed in units per tick.
    #[must_use]
    pub const fn speed(&self) -> f64 {
        self.speed
    }

    /// Last engine order.
    #[must_use]
    pub const fn order(&self) -> SpeedOrder {
        self.order
    }

    /// Engine order override.
    #[must_use]
    pub const fn speed_override(&self) -> Option<SpeedOrder> {
        self.speed_override
    }

    /// Current turn direction: `+1`, `-1` or `0`.
    #[must_use]
    pub const fn rot_direction(&self) -> i8 {
        self.rot_direction
    }

    /// Hull parameters.
    #[must_use]
    pub const fn hull(&self) -> &Hull {
        &self.hull
    }

    /// Technology levels.
    #[must_use]
    pub const fn techs(&self) -> TechLevels {
        self.techs
    }

    /// Critical components.
    #[must_use]
    pub const fn crit_components(&self) -> CritComponents {
        self.crit_components
    }

    /// Hit points.
    #[must_use]
    pub const fn hp(&self) -> f64 {
        self.hp
    }

    /// Shield points.
    #[must_use]
    pub const fn shield(&self) -> f64 {
        self.shield
    }

    /// Detection range, radar tech included.
    #[must_use]
    pub const fn detection_range(&self) -> f64 {
        self.detection_range
    }

    /// Concealment in `[0, 1]`.
    #[must_use]
    pub const fn concealment(&self) -> f64 {
        self.hull.concealment
    }

    /// Own radar contacts.
    #[must_use]
    pub fn detected(&self) -> &[ShipId] {
        &self.detected
    }

    /// Radio-relayed contacts.
    #[must_use]
    pub fn radio_contacts(&self) -> &[ShipId] {
        &self.radio_contacts
    }

    /// Contacts within gun range.
    #[must_use]
    pub fn in_range(&self) -> &[ShipId] {
        &self.in_range
    }

    /// Locked target.
    #[must_use]
    pub const fn target(&self) -> Option<ShipId> {
        self.target
    }

    /// Manual target.
    #[must_use]
    pub const fn manual_target(&self) -> Option<ShipId> {
        self.manual_target
    }

    /// Hull center of the rectangle with the given top-left corner.
    #[must_use]
    pub fn center_of(top_left: Vec2, geometry: Geometry) -> Vec2 {
        parallelepiped_center(top_left, geometry.width, geometry.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ShipCatalog;

    fn open_grid() -> OccupancyGrid {
        OccupancyGrid::new(40, 40, 500)
    }

    fn ship_at(center: Vec2, heading: f64) -> Ship {
        let catalog = ShipCatalog::default();
        Ship::new(
            ShipId(1),
            catalog.get("cl").unwrap(),
            Side::Ally,
            center,
            heading,
            TechLevels::default(),
            &TechTable::default(),
            &SimConfig::default(),
            &open_grid(),
        )
    }

    fn step(ship: &mut Ship) {
        let motion = ship.plan_motion();
        ship.apply_motion(motion);
        ship.advance_checkpoint(500.0);
    }

    #[test]
    fn test_detection_range_includes_radar() {
        let catalog = ShipCatalog::default();
        let ship = Ship::new(
            ShipId(1),
            catalog.get("dd").unwrap(),
            Side::Enemy,
            Vec2::new(1_000.0, 1_000.0),
            0.0,
            TechLevels {
                radar: 2,
                ..TechLevels::default()
            },
            &TechTable::default(),
            &SimConfig::default(),
            &open_grid(),
        );
        assert!((ship.detection_range() - 8_000.0 * 1.2).abs() < 1e-9);
        assert_eq!(ship.turrets().len(), 2);
    }

    #[test]
    fn test_destination_checkpoints_end_exactly() {
        let mut ship = ship_at(Vec2::new(2_600.0, 2_600.0), 0.0);
        ship.set_destination(Vec2::new(7_300.0, 2_700.0)).unwrap();
        let nav = ship.navigation();
        assert_eq!(nav.checkpoints.last(), Some(&Vec2::new(7_300.0, 2_700.0)));
        // Start node dropped
        assert_ne!(nav.checkpoints.first(), Some(&Vec2::new(2_500.0, 2_500.0)));
    }

    #[test]
    fn test_destination_in_same_cell() {
        let mut ship = ship_at(Vec2::new(2_600.0, 2_600.0), 0.0);
        ship.set_destination(Vec2::new(2_900.0, 2_900.0)).unwrap();
        assert_eq!(ship.navigation().checkpoints, vec![Vec2::new(2_900.0, 2_900.0)]);
    }

    #[test]
    fn test_stops_without_route() {
        let mut ship = ship_at(Vec2::new(5_000.0, 5_000.0), 0.0);
        let motion = ship.plan_motion();
        assert_eq!(motion.order, SpeedOrder::Stop);
        assert_eq!(motion.speed, 0.0);
    }

    #[test]
    fn test_speed_override_without_route() {
        let mut ship = ship_at(Vec2::new(5_000.0, 5_000.0), 0.0);
        ship.set_speed_override(Some(SpeedOrder::Half));
        for _ in 0..40 {
            step(&mut ship);
        }
        assert!((ship.speed() - 5.0).abs() < 1e-9);
        assert!(ship.center().x > 5_000.0);
    }

    #[test]
    fn test_acceleration_and_turn_are_bounded() {
        let mut ship = ship_at(Vec2::new(10_000.0, 10_000.0), 0.0);
        ship.set_destination(Vec2::new(10_000.0, 2_000.0)).unwrap();
        let hull = *ship.hull();
        for _ in 0..300 {
            let (speed, heading) = (ship.speed(), ship.heading());
            step(&mut ship);
            assert!((ship.speed() - speed).abs() <= hull.max_accel + 1e-9);
            assert!(smallest_angle(ship.heading(), heading).abs() <= hull.turn_rate + 1e-9);
        }
    }

    #[test]
    fn test_reaches_destination_on_open_sea() {
        let mut ship = ship_at(Vec2::new(3_000.0, 3_000.0), 0.0);
        let goal = Vec2::new(9_000.0, 3_000.0);
        ship.set_destination(goal).unwrap();
        let mut arrived = false;
        for _ in 0..2_000 {
            step(&mut ship);
            if !ship.has_destination() {
                arrived = true;
                break;
            }
        }
        assert!(arrived);
        assert!(ship.center().distance(goal) <= 500.0);
    }

    #[test]
    fn test_turn_circle_check() {
        let mut ship = ship_at(Vec2::new(5_000.0, 5_000.0), 0.0);
        ship.speed = 10.0;
        ship.rot_direction = 1;
        let radius = ship.rotation_radius();
        // Point just beside the ship on the turning side
        assert!(ship.is_inside_turn_circle(Vec2::new(5_000.0, 5_000.0 + radius)));
        assert!(!ship.is_inside_turn_circle(Vec2::new(5_000.0 + 3.0 * radius, 5_000.0)));
        ship.rot_direction = 0;
        assert!(!ship.is_inside_turn_circle(Vec2::new(5_000.0, 5_000.0 + radius)));
    }

    #[test]
    fn test_manual_target_overrides_while_in_range() {
        let mut ship = ship_at(Vec2::new(5_000.0, 5_000.0), 0.0);
        ship.set_in_range(vec![ShipId(7), ShipId(3)]);
        assert_eq!(ship.lock_target(), Some(ShipId(3)));

        ship.select_target(Some(ShipId(7)));
        assert_eq!(ship.lock_target(), Some(ShipId(7)));

        ship.set_in_range(vec![ShipId(3)]);
        assert_eq!(ship.lock_target(), Some(ShipId(3)));
        assert_eq!(ship.manual_target(), Some(ShipId(7)));
    }

    #[test]
    fn test_forget_missing_clears_references() {
        let mut ship = ship_at(Vec2::new(5_000.0, 5_000.0), 0.0);
        ship.set_detected(vec![ShipId(2), ShipId(3)]);
        ship.receive_radio_comm(vec![ShipId(3), ShipId(4)]);
        ship.set_in_range(vec![ShipId(3)]);
        ship.lock_target();
        ship.select_target(Some(ShipId(3)));

        ship.forget_missing(|id| id != ShipId(3));
        assert_eq!(ship.known_contacts(), vec![ShipId(2), ShipId(4)]);
        assert_eq!(ship.target(), None);
        assert_eq!(ship.manual_target(), None);
    }

    #[test]
    fn test_hold_position_sheds_speed_and_replans() {
        let mut ship = ship_at(Vec2::new(5_000.0, 5_000.0), 0.0);
        ship.speed = 4.0;
        ship.path_update.arm();
        ship.hold_position();
        assert!((ship.speed() - 3.5).abs() < 1e-12);
        assert!(ship.path_update_due());
    }
}
