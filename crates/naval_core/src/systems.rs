//! Tick subscribers that move ships, fire turrets and fly shells.
//!
//! Subscribed in the order radio, ships, turrets, projectiles, so
//! turrets read ship positions after every ship has moved this tick and
//! shells fired this tick already fly once before it ends.

use tracing::debug;

use crate::clock::Tickable;
use crate::ids::ShipId;
use crate::math::Vec2;
use crate::pathfinding::Cell;
use crate::projectile::{Flight, Projectile};
use crate::ship::Ship;
use crate::world::{VolleyEvent, World};

/// Ship navigation, sensing, target locking and movement.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShipSystem;

impl ShipSystem {
    /// Run one ship's tick. The ship is taken out of the registry while it
    /// updates so world queries see every other ship.
    pub fn update(world: &mut World, id: ShipId) {
        let Some(mut ship) = world.ships.remove(id) else {
            return;
        };
        Self::navigate(&mut ship);
        Self::sense(world, &mut ship);
        Self::lock(world, &mut ship);
        Self::advance(world, &mut ship);
        world.ships.insert(ship);
    }

    fn navigate(ship: &mut Ship) {
        if ship.has_destination() && ship.path_update_due() {
            ship.update_path();
        }
    }

    fn sense(world: &World, ship: &mut Ship) {
        if !ship.radar_scan_due() {
            return;
        }
        ship.set_detected(world.ships_in_detection_range(ship));

        let center = ship.center();
        let reach = ship.max_gun_range();
        let in_range = ship
            .known_contacts()
            .into_iter()
            .filter(|id| {
                world
                    .ship(*id)
                    .is_some_and(|other| other.center().distance(center) <= reach)
            })
            .collect();
        ship.set_in_range(in_range);
    }

    fn lock(world: &World, ship: &mut Ship) {
        if !ship.target_lock_due() {
            return;
        }
        let sample = ship
            .lock_target()
            .and_then(|target| world.ship(target).map(|t| (target, t.center())));
        let tick = world.tick();
        for turret in ship.turrets_mut() {
            turret.set_target(sample, tick);
        }
    }

    fn advance(world: &World, ship: &mut Ship) {
        let motion = ship.plan_motion();
        if world.grid().is_point_traversable(motion.center) {
            ship.apply_motion(motion);
        } else {
            debug!(ship = %ship.id(), "Grounding guard: holding position");
            ship.hold_position();
        }
        ship.advance_checkpoint(world.config().checkpoint_tolerance);
    }
}

impl Tickable<World> for ShipSystem {
    fn tick(&mut self, world: &mut World) {
        for id in world.ships.sorted_ids() {
            Self::update(world, id);
        }
    }

    fn name(&self) -> &'static str {
        "ships"
    }
}

/// Turret fire control and volley dispatch.
#[derive(Debug, Clone, Copy, Default)]
pub struct TurretSystem;

impl TurretSystem {
    fn fire(world: &mut World, id: ShipId) {
        let Some(mut ship) = world.ships.remove(id) else {
            return;
        };

        for index in 0..ship.turrets().len() {
            let Some(mounting) = ship.mounting(index) else {
                continue;
            };
            let target: Option<Vec2> = ship.turrets()[index]
                .target()
                .and_then(|t| world.ship(t))
                .map(Ship::center);

            let turret = &mut ship.turrets_mut()[index];
            let Some(shots) = turret.tick(mounting, target, &mut world.rng) else {
                continue;
            };

            let (size, kind) = (turret.size().spec().shell, turret.shell_type());
            let (owner, side) = (ship.id(), ship.side());
            let projectiles = shots
                .into_iter()
                .map(|shot| {
                    world.spawn_projectile(|pid| {
                        Projectile::new(
                            pid,
                            owner,
                            side,
                            size,
                            kind,
                            shot.position,
                            shot.heading,
                            shot.range,
                        )
                    })
                })
                .collect::<Vec<_>>();
            debug!(ship = %owner, turret = index, shells = projectiles.len(), "Volley");
            world.events.volleys.push(VolleyEvent {
                ship: owner,
                turret: index,
                projectiles,
            });
        }

        world.ships.insert(ship);
    }
}

impl Tickable<World> for TurretSystem {
    fn tick(&mut self, world: &mut World) {
        for id in world.ships.sorted_ids() {
            Self::fire(world, id);
        }
    }

    fn name(&self) -> &'static str {
        "turrets"
    }
}

/// Shell flight and removal.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectileSystem;

impl Tickable<World> for ProjectileSystem {
    fn tick(&mut self, world: &mut World) {
        let stop_at_islands = world.config().shells_stop_at_islands;
        let mut spent = Vec::new();

        for projectile in &mut world.projectiles {
            let mut done = projectile.tick() == Flight::Spent;
            if !done && stop_at_islands {
                let cell = world
                    .grid
                    .world_to_cell(projectile.position())
                    .and_then(|(row, col)| world.grid.get(row, col));
                done = matches!(cell, None | Some(Cell::Island));
            }
            if done {
                spent.push(projectile.id());
            }
        }

        world.remove_projectiles(&spent);
        world.events.projectiles_spent.extend(spent);
    }

    fn name(&self) -> &'static str {
        "projectiles"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::data::{ShipCatalog, TechLevels, TechTable};
    use crate::pathfinding::{CellRect, OccupancyGrid};
    use crate::side::Side;

    fn world(grid: OccupancyGrid) -> World {
        World::new(
            SimConfig::default(),
            ShipCatalog::default(),
            TechTable::default(),
            grid,
            Vec::new(),
        )
    }

    fn run(world: &mut World, subscriber: &mut dyn Tickable<World>) -> crate::world::TickEvents {
        world.begin_tick();
        subscriber.tick(world);
        world.end_tick()
    }

    #[test]
    fn test_ship_system_locks_first_enemy_in_range() {
        let mut world = world(OccupancyGrid::new(40, 40, 500));
        let ally = world
            .add_ship("bb", Side::Ally, Vec2::new(5_000.0, 5_000.0), 0.0, TechLevels::default())
            .unwrap();
        let enemy = world
            .add_ship("dd", Side::Enemy, Vec2::new(8_000.0, 5_000.0), 180.0, TechLevels::default())
            .unwrap();

        run(&mut world, &mut ShipSystem);

        let ship = world.ship(ally).unwrap();
        assert_eq!(ship.detected(), &[enemy]);
        assert_eq!(ship.in_range(), &[enemy]);
        assert_eq!(ship.target(), Some(enemy));
        assert!(ship.turrets().iter().all(|t| t.target() == Some(enemy)));
    }

    #[test]
    fn test_turret_system_spawns_volley() {
        let mut world = world(OccupancyGrid::new(40, 40, 500));
        let ally = world
            .add_ship("bb", Side::Ally, Vec2::new(5_000.0, 5_000.0), 0.0, TechLevels::default())
            .unwrap();
        world
            .add_ship("dd", Side::Enemy, Vec2::new(8_000.0, 5_000.0), 180.0, TechLevels::default())
            .unwrap();

        run(&mut world, &mut ShipSystem);
        let events = run(&mut world, &mut TurretSystem);

        let from_ally: Vec<_> = events.volleys.iter().filter(|v| v.ship == ally).collect();
        assert_eq!(from_ally.len(), 3);
        assert!(from_ally.iter().all(|v| v.projectiles.len() == 3));
        assert!(world
            .projectiles()
            .iter()
            .all(|p| p.owner() != ally || p.side() == Side::Ally));
    }

    #[test]
    fn test_grounding_guard_holds_position() {
        let mut grid = OccupancyGrid::new(40, 40, 500);
        for (row, col) in CellRect::new(0, 11, 40, 2).cells() {
            grid.set(row, col, Cell::Island);
        }
        let mut world = world(grid);
        let id = world
            .add_ship("dd", Side::Ally, Vec2::new(5_400.0, 5_000.0), 0.0, TechLevels::default())
            .unwrap();
        world
            .ship_mut(id)
            .unwrap()
            .set_speed_override(Some(crate::ship::SpeedOrder::Full));

        for _ in 0..200 {
            run(&mut world, &mut ShipSystem);
            let center = world.ship(id).unwrap().center();
            assert!(world.grid().is_point_traversable(center));
        }
    }

    #[test]
    fn test_shells_stop_at_islands() {
        let mut grid = OccupancyGrid::new(40, 40, 500);
        for (row, col) in CellRect::new(0, 12, 40, 1).cells() {
            grid.set(row, col, Cell::Island);
        }
        let mut world = world(grid);
        let id = world.spawn_projectile(|pid| {
            Projectile::new(
                pid,
                ShipId(1),
                Side::Ally,
                crate::projectile::ShellSize::Small,
                crate::projectile::ShellType::Ap,
                Vec2::new(5_990.0, 5_000.0),
                0.0,
                10_000.0,
            )
        });

        let events = run(&mut world, &mut ProjectileSystem);
        assert_eq!(events.projectiles_spent, vec![id]);
        assert!(world.projectiles().is_empty());
    }

    #[test]
    fn test_shells_fly_over_islands_when_disabled() {
        let mut grid = OccupancyGrid::new(40, 40, 500);
        grid.set(10, 12, Cell::Island);
        let mut world = World::new(
            SimConfig {
                shells_stop_at_islands: false,
                ..SimConfig::default()
            },
            ShipCatalog::default(),
            TechTable::default(),
            grid,
            Vec::new(),
        );
        world.spawn_projectile(|pid| {
            Projectile::new(
                pid,
                ShipId(1),
                Side::Ally,
                crate::projectile::ShellSize::Small,
                crate::projectile::ShellType::He,
                Vec2::new(5_990.0, 5_100.0),
                0.0,
                10_000.0,
            )
        });
        let events = run(&mut world, &mut ProjectileSystem);
        assert!(events.projectiles_spent.is_empty());
        assert_eq!(world.projectiles().len(), 1);
    }
}
