//! Fleet director: turns a funds budget and a doctrine into a fleet.
//!
//! Funds are split across ship classes in proportion to the doctrine's
//! ship priorities and spent on whole ships at base cost. Whatever is
//! left buys tech upgrades, handed out round-robin across the fleet so
//! every ship gets one upgrade before any ship gets a second.
//!
//! All arithmetic is integer, so a plan depends only on its inputs.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::data::{ShipCatalog, TechKind, TechLevels, TechTable};
use crate::error::{Result, SimError};
use crate::rng::{uniform_usize, SimRng};

/// Purchase priorities for one fleet style.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Doctrine {
    /// Display name.
    pub name: String,
    /// Relative weight of each ship class tag.
    pub ship_priorities: Vec<(String, u32)>,
    /// Relative weight of each technology; zero never upgrades it.
    pub tech_priorities: Vec<(TechKind, u32)>,
}

impl Doctrine {
    /// Technologies with a positive weight, highest first. Ties keep
    /// the listed order.
    #[must_use]
    pub fn tech_order(&self) -> Vec<TechKind> {
        let mut ranked: Vec<_> = self
            .tech_priorities
            .iter()
            .filter(|(_, weight)| *weight > 0)
            .copied()
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.into_iter().map(|(kind, _)| kind).collect()
    }
}

/// The static set of doctrines a director chooses from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoctrineTable {
    /// Doctrines in table order.
    pub doctrines: Vec<Doctrine>,
}

impl Default for DoctrineTable {
    fn default() -> Self {
        let doctrine = |name: &str, ships: [u32; 3], techs: [u32; 4]| Doctrine {
            name: name.to_string(),
            ship_priorities: ["dd", "cl", "bb"]
                .iter()
                .zip(ships)
                .map(|(tag, weight)| ((*tag).to_string(), weight))
                .collect(),
            tech_priorities: TechKind::ALL.into_iter().zip(techs).collect(),
        };
        Self {
            doctrines: vec![
                doctrine("balanced", [1, 1, 1], [2, 2, 1, 1]),
                doctrine("screen", [3, 2, 0], [1, 1, 1, 3]),
                doctrine("battle_line", [1, 1, 3], [3, 2, 2, 0]),
            ],
        }
    }
}

impl DoctrineTable {
    /// Parse from RON.
    ///
    /// # Errors
    ///
    /// [`SimError::ConfigParse`] on malformed RON, [`SimError::InvalidInput`]
    /// for an empty table.
    pub fn from_ron_str(text: &str) -> Result<Self> {
        let table: Self = ron::from_str(text)?;
        if table.doctrines.is_empty() {
            return Err(SimError::InvalidInput("doctrine table is empty".into()));
        }
        Ok(table)
    }

    /// Look up a doctrine by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Doctrine> {
        self.doctrines.iter().find(|d| d.name == name)
    }

    /// Pick a doctrine at random.
    pub fn pick(&self, rng: &mut SimRng) -> Option<&Doctrine> {
        let last = self.doctrines.len().checked_sub(1)?;
        self.doctrines.get(uniform_usize(rng, 0, last))
    }
}

/// One ship to deploy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedShip {
    /// Class tag.
    pub class: String,
    /// Technology levels bought for it.
    pub techs: TechLevels,
}

/// Result of [`compose`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetPlan {
    /// Ships grouped by class in doctrine order.
    pub ships: Vec<PlannedShip>,
    /// Funds not spent.
    pub leftover: u32,
}

impl FleetPlan {
    /// Ships of one class.
    #[must_use]
    pub fn count(&self, class: &str) -> usize {
        self.ships.iter().filter(|s| s.class == class).count()
    }
}

/// Buy a fleet with `funds` following `doctrine`.
///
/// # Errors
///
/// [`SimError::UnknownShipClass`] when the doctrine names a class the
/// catalog lacks, [`SimError::InvalidInput`] when every ship weight is zero.
pub fn compose(
    funds: u32,
    doctrine: &Doctrine,
    catalog: &ShipCatalog,
    tech_table: &TechTable,
) -> Result<FleetPlan> {
    let total: u64 = doctrine
        .ship_priorities
        .iter()
        .map(|(_, weight)| u64::from(*weight))
        .sum();
    if total == 0 {
        return Err(SimError::InvalidInput(format!(
            "doctrine '{}' has no ship priorities",
            doctrine.name
        )));
    }

    let mut plan = FleetPlan::default();
    let mut spent = 0u64;
    for (tag, weight) in &doctrine.ship_priorities {
        let class = catalog.get(tag)?;
        let share = u64::from(funds) * u64::from(*weight) / total;
        let count = if class.cost == 0 {
            0
        } else {
            share / u64::from(class.cost)
        };
        spent += count * u64::from(class.cost);
        plan.ships.extend((0..count).map(|_| PlannedShip {
            class: tag.clone(),
            techs: class.techs,
        }));
    }
    let mut leftover = u64::from(funds).saturating_sub(spent);

    let order = doctrine.tech_order();
    loop {
        let mut upgraded = false;
        for ship in &mut plan.ships {
            let choice = order.iter().copied().find_map(|kind| {
                tech_table
                    .next_upgrade_cost(ship.techs.level(kind))
                    .filter(|cost| u64::from(*cost) <= leftover)
                    .map(|cost| (kind, cost))
            });
            if let Some((kind, cost)) = choice {
                ship.techs.upgrade(kind);
                leftover -= u64::from(cost);
                upgraded = true;
            }
        }
        if !upgraded {
            break;
        }
    }

    plan.leftover = u32::try_from(leftover).unwrap_or(u32::MAX);
    debug!(
        doctrine = %doctrine.name,
        funds,
        ships = plan.ships.len(),
        leftover = plan.leftover,
        "Fleet composed"
    );
    Ok(plan)
}
