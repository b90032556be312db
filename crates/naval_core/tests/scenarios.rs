//! End-to-end battle scenarios with literal values.
//!
//! All maps use 500-unit cells on a 20 km sea with a 0.25 border, so the
//! playable rectangle is `[5000, 25000]` on both axes.

use std::cmp::Ordering;

use naval_core::data::TechTable;
use naval_core::pathfinding::{Cell, CellRect, OccupancyGrid, Pathfinder};
use naval_core::prelude::*;
use naval_core::priority_queue::{HeapItem, PriorityQueue};
use naval_core::turret::TurretSize;
use naval_test_utils::fixtures::{open_sea, test_catalog, test_class};

// =============================================================================
// Heap
// =============================================================================

#[derive(Debug)]
struct Item {
    key: usize,
    priority: i32,
}

impl HeapItem for Item {
    fn priority_cmp(&self, other: &Self) -> Ordering {
        self.priority.cmp(&other.priority)
    }

    fn heap_key(&self) -> usize {
        self.key
    }
}

#[test]
fn heap_sort_orders_priorities_descending() {
    let mut queue = PriorityQueue::new();
    for (key, priority) in [3, 1, 4, 1, 5, 9, 2, 6].into_iter().enumerate() {
        queue.add(Item { key, priority });
    }
    let sorted: Vec<i32> = std::iter::from_fn(|| queue.try_remove_top())
        .map(|item| item.priority)
        .collect();
    assert_eq!(sorted, vec![9, 6, 5, 4, 3, 2, 1, 1]);
}

// =============================================================================
// Pathfinding
// =============================================================================

#[test]
fn diagonal_path_on_empty_grid() {
    let grid = OccupancyGrid::new(40, 40, 500);
    let mut pathfinder = Pathfinder::new(&grid);
    let path = pathfinder
        .find_path(Vec2::new(0.0, 0.0), Vec2::new(19_000.0, 19_000.0))
        .unwrap();

    assert_eq!(pathfinder.last_stats().cost, Some(38 * 14));
    assert_eq!(path.first(), Some(&Vec2::new(0.0, 0.0)));
    assert_eq!(path.last(), Some(&Vec2::new(19_000.0, 19_000.0)));
    assert!(path
        .iter()
        .all(|p| (0.0..20_000.0).contains(&p.x) && (0.0..20_000.0).contains(&p.y)));
}

#[test]
fn path_routes_around_island() {
    let mut grid = OccupancyGrid::new(40, 40, 500);
    let island = CellRect::new(10, 10, 11, 11);
    for (row, col) in island.cells() {
        grid.set(row, col, Cell::Island);
    }
    let mut pathfinder = Pathfinder::new(&grid);
    let path = pathfinder
        .find_path(Vec2::new(2_500.0, 2_500.0), Vec2::new(12_500.0, 12_500.0))
        .unwrap();

    for point in &path {
        let (row, col) = grid.world_to_cell(*point).unwrap();
        assert!(!island.contains(row, col), "path enters island at {row},{col}");
    }
    for pair in path.windows(2) {
        let step = pair[1] - pair[0];
        assert!(step.x.abs() <= 500.0 && step.y.abs() <= 500.0);
    }
}

// =============================================================================
// Ships
// =============================================================================

#[test]
fn ship_reaches_waypoint() {
    let mut sim = open_sea();
    let ship = sim
        .spawn_ship("scout", Side::Ally, Vec2::new(7_500.0, 7_500.0), TechLevels::default())
        .unwrap();
    let goal = Vec2::new(12_500.0, 7_500.0);
    sim.set_destination(ship, goal).unwrap();
    sim.start();

    // Straight run at 9/tick, heading already on course: arrival is
    // declared once within the checkpoint tolerance of the goal
    let (max_speed, max_accel) = (9.0_f64, 0.5_f64);
    let run = goal.distance(Vec2::new(7_500.0, 7_500.0)) - sim.world().config().checkpoint_tolerance;
    let earliest = (run / max_speed).floor() as u32 - 1;
    let budget = (run / max_speed).ceil() as u32 + 2 * (max_speed / max_accel).ceil() as u32;
    let mut arrived_at = None;
    for tick in 0..budget {
        sim.tick();
        if !sim.world().ship(ship).unwrap().has_destination() {
            arrived_at = Some(tick);
            break;
        }
    }
    let arrived_at = arrived_at.unwrap_or_else(|| panic!("no arrival within {budget} ticks"));
    assert!(arrived_at >= earliest, "arrived at tick {arrived_at}, faster than full speed");

    // Coast to a stop, then check the final position
    for _ in 0..40 {
        sim.tick();
    }
    let state = sim.ship_stats(ship).unwrap();
    assert_eq!(state.ship.speed, 0.0);
    assert!(state.ship.center.distance(goal) <= 500.0);
}

#[test]
fn turret_fires_full_volley_at_enemy() {
    let mut sim = open_sea();
    let shooter = sim
        .spawn_ship("gunboat", Side::Ally, Vec2::new(5_000.0, 5_000.0), TechLevels::default())
        .unwrap();
    let target = sim
        .spawn_ship("scout", Side::Enemy, Vec2::new(8_000.0, 5_000.0), TechLevels::default())
        .unwrap();
    sim.start();

    let radar = sim.world().config().radar_scan_rate;
    let lock = sim.world().config().target_lock_rate;
    let reload = TurretSize::Large.spec().reload;

    let volley = (0..radar + lock + reload)
        .flat_map(|_| sim.tick().volleys)
        .find(|v| v.ship == shooter)
        .expect("gunboat fired");
    assert_eq!(volley.projectiles.len(), 3);

    let shells: Vec<_> = sim
        .world()
        .projectiles()
        .iter()
        .filter(|p| volley.projectiles.contains(&p.id()))
        .collect();
    assert_eq!(shells.len(), 3);
    for shell in shells {
        assert_eq!(shell.owner(), shooter);
        assert_eq!(shell.size(), ShellSize::Large);
        assert!(smallest_heading_error(shell.heading()) <= 1.0 + 0.5);
    }
    assert_eq!(sim.world().ship(shooter).unwrap().target(), Some(target));
}

fn smallest_heading_error(heading: f64) -> f64 {
    naval_core::math::smallest_angle(heading, 0.0).abs()
}

fn detection_sim(distance: f64) -> (Simulation, ShipId, ShipId) {
    let mut picket = test_class("picket", 9.0, 0.5, 0.13, &[]);
    picket.hull.detection_range = 5_000.0;
    let mut stealth = test_class("stealth", 9.0, 0.5, 0.13, &[]);
    stealth.hull.concealment = 0.5;

    let mut catalog = test_catalog();
    catalog.classes.extend([picket, stealth]);
    let mut sim = Simulation::from_parts(
        SimConfig::default(),
        &MapConfig::default().with_max_obstruction(0.0),
        catalog,
        TechTable::default(),
    )
    .unwrap();

    let a = sim
        .spawn_ship("picket", Side::Ally, Vec2::new(10_000.0, 10_000.0), TechLevels::default())
        .unwrap();
    let b = sim
        .spawn_ship(
            "stealth",
            Side::Enemy,
            Vec2::new(10_000.0 + distance, 10_000.0),
            TechLevels::default(),
        )
        .unwrap();
    sim.start();
    sim.tick();
    (sim, a, b)
}

#[test]
fn concealment_shrinks_detection_range() {
    // Effective range: 5000 - (5000 - 1000) * 0.5 = 3000
    let (sim, a, _) = detection_sim(3_500.0);
    assert!(sim.ship_stats(a).unwrap().detected.is_empty());

    let (sim, a, b) = detection_sim(2_500.0);
    assert_eq!(sim.ship_stats(a).unwrap().detected, vec![b]);
}

#[test]
fn radio_shares_contacts_across_side() {
    let mut sim = open_sea();
    let spotter = sim
        .spawn_ship("scout", Side::Ally, Vec2::new(15_000.0, 10_000.0), TechLevels::default())
        .unwrap();
    let far = sim
        .spawn_ship("gunboat", Side::Ally, Vec2::new(6_000.0, 22_000.0), TechLevels::default())
        .unwrap();
    let enemy = sim
        .spawn_ship("scout", Side::Enemy, Vec2::new(20_000.0, 10_000.0), TechLevels::default())
        .unwrap();
    sim.start();

    // Radio runs before radar on the first tick, so the first shared
    // picture arrives one radio period later.
    let rate = u64::from(sim.world().config().radio_rate);
    for _ in 0..=rate {
        sim.tick();
    }

    assert_eq!(sim.ship_stats(spotter).unwrap().detected, vec![enemy]);
    let far_stats = sim.ship_stats(far).unwrap();
    assert!(far_stats.detected.is_empty());
    assert_eq!(far_stats.known_contacts, vec![enemy]);
}
