//! Fleet radio relay.
//!
//! Every `radio_rate` ticks each side pools the radar contacts of all its
//! ships and broadcasts the deduplicated union back to every ship on that
//! side. Each side's union is built from its own ships only.

use std::collections::BTreeSet;

use tracing::debug;

use crate::clock::{Countdown, Tickable};
use crate::ids::ShipId;
use crate::side::Side;
use crate::world::{RadioBroadcast, World};

/// Periodic per-side contact sharing.
#[derive(Debug, Clone)]
pub struct RadioRelay {
    schedule: Countdown,
}

impl RadioRelay {
    /// Create a relay broadcasting every `rate` ticks, starting with the first.
    #[must_use]
    pub const fn new(rate: u32) -> Self {
        Self {
            schedule: Countdown::new(rate),
        }
    }

    /// Union of the radar contacts of one side's ships.
    #[must_use]
    pub fn side_contacts(world: &World, side: Side) -> Vec<ShipId> {
        let union: BTreeSet<ShipId> = world
            .ships()
            .iter_sorted()
            .filter(|ship| ship.side() == side)
            .flat_map(|ship| ship.detected().iter().copied())
            .collect();
        union.into_iter().collect()
    }

    /// Pool and broadcast now, regardless of the schedule.
    pub fn broadcast(world: &mut World) {
        for side in Side::ALL {
            let contacts = Self::side_contacts(world, side);
            for id in world.ships.sorted_ids() {
                if let Some(ship) = world.ships.get_mut(id) {
                    if ship.side() == side {
                        ship.receive_radio_comm(contacts.clone());
                    }
                }
            }
            debug!(side = side.display_name(), contacts = contacts.len(), "Radio broadcast");
            world.events.radio_broadcasts.push(RadioBroadcast { side, contacts });
        }
    }
}

impl Tickable<World> for RadioRelay {
    fn tick(&mut self, world: &mut World) {
        if self.schedule.expire() {
            Self::broadcast(world);
        }
    }

    fn name(&self) -> &'static str {
        "radio"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::data::{ShipCatalog, TechLevels, TechTable};
    use crate::math::Vec2;
    use crate::pathfinding::OccupancyGrid;

    fn world() -> World {
        World::new(
            SimConfig::default(),
            ShipCatalog::default(),
            TechTable::default(),
            OccupancyGrid::new(40, 40, 500),
            Vec::new(),
        )
    }

    fn spawn(world: &mut World, side: Side, x: f64) -> ShipId {
        world
            .add_ship("dd", side, Vec2::new(x, 1_000.0), 0.0, TechLevels::default())
            .unwrap()
    }

    #[test]
    fn test_each_side_gets_its_own_union() {
        let mut world = world();
        let a1 = spawn(&mut world, Side::Ally, 1_000.0);
        let a2 = spawn(&mut world, Side::Ally, 2_000.0);
        let e1 = spawn(&mut world, Side::Enemy, 3_000.0);
        let e2 = spawn(&mut world, Side::Enemy, 4_000.0);

        world.ship_mut(a1).unwrap().set_detected(vec![e1]);
        world.ship_mut(a2).unwrap().set_detected(vec![e2, e1]);
        world.ship_mut(e2).unwrap().set_detected(vec![a2]);

        world.begin_tick();
        RadioRelay::broadcast(&mut world);

        assert_eq!(world.ship(a1).unwrap().radio_contacts(), &[e1, e2]);
        assert_eq!(world.ship(a2).unwrap().radio_contacts(), &[e1, e2]);
        assert_eq!(world.ship(e1).unwrap().radio_contacts(), &[a2]);
        assert_eq!(world.ship(e2).unwrap().radio_contacts(), &[a2]);

        let events = world.end_tick();
        assert_eq!(events.radio_broadcasts.len(), 2);
        assert_eq!(events.radio_broadcasts[1].side, Side::Enemy);
    }

    #[test]
    fn test_relay_schedule() {
        let mut world = world();
        let mut relay = RadioRelay::new(19);
        let mut broadcasts = Vec::new();
        for tick in 0..40 {
            world.begin_tick();
            relay.tick(&mut world);
            if !world.end_tick().radio_broadcasts.is_empty() {
                broadcasts.push(tick);
            }
        }
        assert_eq!(broadcasts, vec![0, 19, 38]);
    }
}
