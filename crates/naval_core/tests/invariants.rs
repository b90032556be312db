//! Properties that hold on every tick of every battle.

use std::cmp::Ordering;
use std::collections::HashMap;

use naval_core::math::{normalize_angle, smallest_angle};
use naval_core::pathfinding::{Cell, OccupancyGrid, Pathfinder};
use naval_core::prelude::*;
use naval_core::priority_queue::{HeapItem, PriorityQueue};
use naval_test_utils::determinism::strategies::{
    arb_angle, arb_cell, arb_playable_point, arb_priorities, arb_techs,
};
use naval_test_utils::determinism::verify_simulation_determinism;
use naval_test_utils::fixtures::{duel, island_sea, open_sea, skirmish, spawn_near};
use proptest::prelude::*;

const EPS: f64 = 1e-9;

fn check_every_tick(sim: &mut Simulation, ticks: u32) {
    let mut previous: HashMap<ShipId, (f64, f64)> = HashMap::new();
    for _ in 0..ticks {
        sim.tick();
        let world = sim.world();
        for ship in world.ships().iter_sorted() {
            assert!(
                world.grid().is_point_traversable(ship.center()),
                "{} grounded at {:?} on tick {}",
                ship.id(),
                ship.center(),
                world.tick()
            );
            if let Some((heading, speed)) = previous.get(&ship.id()) {
                let hull = ship.hull();
                assert!(smallest_angle(ship.heading(), *heading).abs() <= hull.turn_rate + EPS);
                assert!((ship.speed() - speed).abs() <= hull.max_accel + EPS);
            }
            previous.insert(ship.id(), (ship.heading(), ship.speed()));
        }
        for shell in world.projectiles() {
            assert!(shell.travelled() <= shell.effective_range() + shell.size().spec().base_speed);
        }
    }
}

#[test]
fn skirmish_keeps_kinematic_invariants() {
    for seed in [1, 7, 42] {
        let mut sim = skirmish(seed);
        check_every_tick(&mut sim, 1_500);
    }
}

#[test]
fn ships_steer_around_islands() {
    let mut sim = island_sea(3, 0.2);
    let mut ids = Vec::new();
    for (i, y) in [7_000.0, 12_000.0, 17_000.0, 22_000.0].into_iter().enumerate() {
        let id = spawn_near(&mut sim, "scout", Side::Ally, Vec2::new(6_000.0, y), 500.0);
        let goal = Vec2::new(23_500.0, 29_000.0 - y - 500.0 * i as f64);
        let _ = sim.set_destination(id, goal);
        ids.push(id);
    }
    sim.start();
    check_every_tick(&mut sim, 3_000);
}

#[test]
fn battles_replay_identically() {
    assert!(verify_simulation_determinism(|| skirmish(99), 500));
}

#[test]
fn duels_replay_identically() {
    let setup = || {
        let (mut sim, _, _) = duel("gunboat", "gunboat", 4_000.0);
        sim.start();
        sim
    };
    assert!(verify_simulation_determinism(setup, 400));
}

#[test]
fn map_reset_reproduces_islands() {
    let config = MapConfig::default().with_seed(77);
    let mut generator = naval_core::map_generation::MapGenerator::new(config).unwrap();
    let first = generator.generate();
    let cells = generator.grid().cells().to_vec();
    generator.reset();
    let second = generator.generate();
    assert_eq!(first, second);
    assert_eq!(cells, generator.grid().cells());
}

fn blocked_grid(blocked: &[(usize, usize)]) -> OccupancyGrid {
    let mut grid = OccupancyGrid::new(20, 20, 500);
    for &(row, col) in blocked {
        grid.set(row, col, Cell::Island);
    }
    grid
}

#[derive(Debug, Clone, Copy)]
struct Ranked {
    key: usize,
    priority: i32,
}

impl HeapItem for Ranked {
    fn priority_cmp(&self, other: &Self) -> Ordering {
        self.priority.cmp(&other.priority)
    }

    fn heap_key(&self) -> usize {
        self.key
    }
}

proptest! {
    #[test]
    fn angles_wrap_into_half_open_turn(a in arb_angle(), b in arb_angle()) {
        let wrapped = normalize_angle(a);
        prop_assert!(wrapped > -180.0 && wrapped <= 180.0);
        prop_assert!(normalize_angle(wrapped - a).abs() < EPS);

        let turn = smallest_angle(a, b);
        prop_assert!(turn > -180.0 && turn <= 180.0);
        prop_assert!(normalize_angle(b + turn - a).abs() < EPS);
        let sum = turn + smallest_angle(b, a);
        prop_assert!(sum.abs() < EPS || (sum - 360.0).abs() < EPS);
    }

    #[test]
    fn heap_drains_in_priority_order(priorities in arb_priorities(64)) {
        let mut queue = PriorityQueue::new();
        for (key, &priority) in priorities.iter().enumerate() {
            queue.add(Ranked { key, priority });
        }
        let drained: Vec<i32> = queue.drain_sorted().iter().map(|r| r.priority).collect();
        let mut expected = priorities.clone();
        expected.sort_unstable_by(|a, b| b.cmp(a));
        prop_assert_eq!(drained, expected);
        prop_assert!(queue.is_empty());
    }

    #[test]
    fn fleets_stay_within_funds(
        funds in 0u32..20_000,
        weights in arb_priorities(4),
        radar_weight in 0u32..5,
    ) {
        let doctrine = Doctrine {
            name: "random".into(),
            ship_priorities: ["dd", "cl", "bb"]
                .iter()
                .zip(&weights)
                .map(|(tag, weight)| ((*tag).to_string(), weight.unsigned_abs()))
                .collect(),
            tech_priorities: vec![(TechKind::Radar, radar_weight), (TechKind::Guns, 1)],
        };
        let catalog = ShipCatalog::default();
        match compose(funds, &doctrine, &catalog, &TechTable::default()) {
            Ok(plan) => {
                prop_assert!(plan.leftover <= funds);
                let hulls: u64 = plan
                    .ships
                    .iter()
                    .map(|ship| u64::from(catalog.get(&ship.class).map_or(0, |c| c.cost)))
                    .sum();
                prop_assert!(hulls + u64::from(plan.leftover) <= u64::from(funds));
            }
            Err(SimError::InvalidInput(_)) => {
                prop_assert!(doctrine.ship_priorities.iter().all(|(_, w)| *w == 0));
            }
            Err(other) => prop_assert!(false, "unexpected error {other}"),
        }
    }

    #[test]
    fn open_sea_accepts_any_playable_spawn(
        position in arb_playable_point(),
        techs in arb_techs(),
    ) {
        let mut sim = open_sea();
        let id = sim.spawn_ship("gunboat", Side::Ally, position, techs).unwrap();
        let ship = sim.world().ship(id).unwrap();
        let table = TechTable::default();
        prop_assert_eq!(ship.techs(), techs);
        let expected = ship.hull().detection_range * (1.0 + table.radar(techs.radar));
        prop_assert!((ship.detection_range() - expected).abs() < EPS);
        prop_assert!(ship.detection_range() >= ship.hull().detection_range);
        prop_assert!(ship.turrets().iter().all(|t| t.accuracy() <= t.size().spec().dispersion));
    }

    #[test]
    fn paths_are_contiguous_and_traversable(
        blocked in prop::collection::vec(arb_cell(20, 20), 0..120),
        start in arb_cell(20, 20),
        goal in arb_cell(20, 20),
    ) {
        let grid = blocked_grid(&blocked);
        let mut pathfinder = Pathfinder::new(&grid);
        if let Ok(path) = pathfinder.find_path_cells(start, goal) {
            prop_assert_eq!(path.first(), Some(&start));
            prop_assert_eq!(path.last(), Some(&goal));
            for pair in path.windows(2) {
                let (a, b) = (pair[0], pair[1]);
                prop_assert!(a.0.abs_diff(b.0) <= 1 && a.1.abs_diff(b.1) <= 1);
                prop_assert!(grid.is_traversable(b.0, b.1));
            }
            let stats = pathfinder.last_stats();
            prop_assert!(stats.cost.is_some_and(|cost| stats.max_expanded_f <= cost));
        }
    }

    #[test]
    fn same_cell_path_is_single_node(cell in arb_cell(20, 20)) {
        let grid = blocked_grid(&[]);
        let mut pathfinder = Pathfinder::new(&grid);
        prop_assert_eq!(pathfinder.find_path_cells(cell, cell).unwrap(), vec![cell]);
    }
}
