//! Scenario loading and battle construction.
//!
//! A scenario names the simulation tunables, the map setup and the
//! forces of both sides. Forces are either doctrine-composed fleets or
//! individually placed ships.
//!
//! ```ron
//! Scenario(
//!     name: "Channel skirmish",
//!     setup: (size: Small, obstruction: Low, funds: 3000, seed: 7),
//!     fleets: [
//!         (side: Ally, doctrine: Some("balanced"), anchor: (6000.0, 6000.0),
//!          destination: Some((22000.0, 6000.0))),
//!         (side: Enemy, anchor: (24000.0, 6000.0)),
//!     ],
//! )
//! ```

use std::path::{Path, PathBuf};

use naval_core::config::SimConfig;
use naval_core::data::{BattleSetup, ShipCatalog, TechLevels, TechTable};
use naval_core::error::SimError;
use naval_core::fleet::{compose, DoctrineTable};
use naval_core::ids::ShipId;
use naval_core::math::Vec2;
use naval_core::rng::seeded;
use naval_core::side::Side;
use naval_core::simulation::Simulation;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// The simulation rejected the scenario.
    #[error("Simulation error: {0}")]
    Simulation(#[from] SimError),
    /// A fleet names a doctrine the table does not have.
    #[error("Unknown doctrine: {0}")]
    UnknownDoctrine(String),
    /// Failed to write output.
    #[error("Failed to encode output: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A doctrine-composed fleet, deployed as a column along +y.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FleetSetup {
    /// Owning side.
    pub side: Side,
    /// Doctrine name; a seeded random pick when absent.
    #[serde(default)]
    pub doctrine: Option<String>,
    /// Funds override. Defaults to the setup's funds for the ally and the
    /// difficulty-scaled funds for the enemy.
    #[serde(default)]
    pub funds: Option<u32>,
    /// Position of the first ship.
    pub anchor: (f64, f64),
    /// Distance between consecutive ships.
    #[serde(default = "default_spacing")]
    pub spacing: f64,
    /// Destination of the first ship; the others keep their column offset.
    #[serde(default)]
    pub destination: Option<(f64, f64)>,
}

/// Spawn attempts per ship before an obstructed position is an error.
const MAX_NUDGES: u32 = 20;

fn default_spacing() -> f64 {
    1_500.0
}

/// A single ship placed by hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipPlacement {
    /// Ship class tag.
    pub class: String,
    /// Owning side.
    pub side: Side,
    /// Spawn position.
    pub position: (f64, f64),
    /// Installed tech levels.
    #[serde(default)]
    pub techs: TechLevels,
    /// Initial destination.
    #[serde(default)]
    pub destination: Option<(f64, f64)>,
}

/// A complete scenario configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Simulation tunables. The victory condition is taken from `setup`.
    #[serde(default)]
    pub config: SimConfig,
    /// Map and battle setup.
    #[serde(default)]
    pub setup: BattleSetup,
    /// Ship catalog file, relative to the scenario file. The built-in
    /// catalog is used when absent.
    #[serde(default)]
    pub catalog: Option<PathBuf>,
    /// Doctrine table file, relative to the scenario file.
    #[serde(default)]
    pub doctrines: Option<PathBuf>,
    /// Doctrine-composed fleets.
    #[serde(default)]
    pub fleets: Vec<FleetSetup>,
    /// Hand-placed ships.
    #[serde(default)]
    pub ships: Vec<ShipPlacement>,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            name: "Default Skirmish".to_string(),
            config: SimConfig::default(),
            setup: BattleSetup::default(),
            catalog: None,
            doctrines: None,
            fleets: vec![
                FleetSetup {
                    side: Side::Ally,
                    doctrine: Some("balanced".to_string()),
                    funds: None,
                    anchor: (6_000.0, 6_000.0),
                    spacing: default_spacing(),
                    destination: Some((22_000.0, 6_000.0)),
                },
                FleetSetup {
                    side: Side::Enemy,
                    doctrine: Some("balanced".to_string()),
                    funds: None,
                    anchor: (24_000.0, 6_000.0),
                    spacing: default_spacing(),
                    destination: Some((8_000.0, 6_000.0)),
                },
            ],
            ships: Vec::new(),
        }
    }
}

/// Scenario plus the data files it references, resolved and parsed.
#[derive(Debug, Clone)]
pub struct LoadedScenario {
    /// The scenario itself.
    pub scenario: Scenario,
    /// Ship classes.
    pub catalog: ShipCatalog,
    /// Doctrines for fleet composition.
    pub doctrines: DoctrineTable,
}

impl Scenario {
    /// Load a scenario from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Load from a RON string.
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        Ok(ron::from_str(ron)?)
    }

    /// Load a scenario file and the catalog and doctrine files it names.
    pub fn load_with_data<P: AsRef<Path>>(path: P) -> Result<LoadedScenario, ScenarioError> {
        let path = path.as_ref();
        let scenario = Self::load(path)?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));

        let catalog = match &scenario.catalog {
            Some(file) => load_catalog(base.join(file))?,
            None => ShipCatalog::default(),
        };
        let doctrines = match &scenario.doctrines {
            Some(file) => DoctrineTable::from_ron_str(&read_existing(&base.join(file))?)?,
            None => DoctrineTable::default(),
        };

        Ok(LoadedScenario {
            scenario,
            catalog,
            doctrines,
        })
    }

    /// Build the battle: generate the map, compose and deploy the fleets,
    /// place the single ships and issue their first orders. The clock is
    /// left paused.
    pub fn build(
        &self,
        catalog: ShipCatalog,
        doctrines: &DoctrineTable,
    ) -> Result<Simulation, ScenarioError> {
        let config = SimConfig {
            victory: self.setup.victory,
            ..self.config.clone()
        };
        let map = self.setup.map_config();
        let nudge = f64::from(map.cell_size);
        let mut sim = Simulation::from_parts(config, &map, catalog, TechTable::default())?;
        let report = sim.generate_map(map)?;
        info!(
            scenario = %self.name,
            islands = report.islands.len(),
            obstruction = report.obstruction_ratio,
            saturated = report.saturated,
            "Scenario map ready"
        );

        let mut rng = seeded(self.setup.seed);
        for fleet in &self.fleets {
            let doctrine = match &fleet.doctrine {
                Some(name) => doctrines
                    .get(name)
                    .ok_or_else(|| ScenarioError::UnknownDoctrine(name.clone()))?,
                None => doctrines
                    .pick(&mut rng)
                    .ok_or_else(|| ScenarioError::UnknownDoctrine("<random>".to_string()))?,
            };
            let funds = fleet.funds.unwrap_or(match fleet.side {
                Side::Ally => self.setup.funds,
                Side::Enemy => self.setup.enemy_funds(),
            });
            let plan = compose(
                funds,
                doctrine,
                sim.world().catalog(),
                sim.world().tech_table(),
            )?;
            info!(
                side = fleet.side.display_name(),
                doctrine = %doctrine.name,
                funds,
                ships = plan.ships.len(),
                leftover = plan.leftover,
                "Fleet composed"
            );

            let anchor = Vec2::new(fleet.anchor.0, fleet.anchor.1);
            for (i, planned) in plan.ships.iter().enumerate() {
                let offset = Vec2::new(0.0, fleet.spacing * i as f64);
                let position = anchor + offset;
                let id =
                    spawn_clear(&mut sim, &planned.class, fleet.side, position, planned.techs, nudge)?;
                if let Some((x, y)) = fleet.destination {
                    order_destination(&mut sim, id, Vec2::new(x, y) + offset);
                }
            }
        }

        for placement in &self.ships {
            let position = Vec2::new(placement.position.0, placement.position.1);
            let id = sim.spawn_ship(
                &placement.class,
                placement.side,
                position,
                placement.techs,
            )?;
            if let Some((x, y)) = placement.destination {
                order_destination(&mut sim, id, Vec2::new(x, y));
            }
        }

        Ok(sim)
    }
}

/// Spawn at `position`, or at the first open water found stepping
/// `nudge` along +y when islands cover it.
fn spawn_clear(
    sim: &mut Simulation,
    class: &str,
    side: Side,
    position: Vec2,
    techs: TechLevels,
    nudge: f64,
) -> Result<ShipId, ScenarioError> {
    let mut last = None;
    for step in 0..MAX_NUDGES {
        let candidate = position + Vec2::new(0.0, nudge * f64::from(step));
        match sim.spawn_ship(class, side, candidate, techs) {
            Ok(id) => return Ok(id),
            Err(err @ SimError::PositionObstructed { .. }) => last = Some(err),
            Err(err) => return Err(err.into()),
        }
    }
    Err(last
        .unwrap_or_else(|| SimError::InvalidInput(format!("no open water near {position:?}")))
        .into())
}

/// An unreachable destination leaves the ship idle rather than failing
/// the scenario.
fn order_destination(sim: &mut Simulation, id: ShipId, goal: Vec2) {
    if let Err(error) = sim.set_destination(id, goal) {
        warn!(ship = %id, %error, "Destination rejected");
    }
}

fn read_existing(path: &Path) -> Result<String, ScenarioError> {
    if !path.exists() {
        return Err(ScenarioError::FileNotFound(path.display().to_string()));
    }
    Ok(std::fs::read_to_string(path)?)
}

/// Read, parse and validate a ship catalog file.
pub fn load_catalog<P: AsRef<Path>>(path: P) -> Result<ShipCatalog, ScenarioError> {
    let text = read_existing(path.as_ref())?;
    Ok(ShipCatalog::from_ron_str(&text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use naval_core::data::{MapSize, Obstruction};
    use std::io::Write;

    #[test]
    fn test_default_scenario_builds() {
        let scenario = Scenario::default();
        let sim = scenario
            .build(ShipCatalog::default(), &DoctrineTable::default())
            .unwrap();
        let state = sim.query_state();
        assert!(state.side(Side::Ally).count() > 0);
        assert!(state.side(Side::Enemy).count() > 0);
        assert!(!sim.is_running());
    }

    #[test]
    fn test_parse_from_ron() {
        let ron = r#"
            Scenario(
                name: "Test",
                setup: (size: Small, obstruction: None, funds: 1000, seed: 3),
                ships: [
                    (class: "dd", side: Ally, position: (7500.0, 7500.0)),
                    (class: "bb", side: Enemy, position: (20000.0, 7500.0),
                     destination: Some((15000.0, 7500.0))),
                ],
            )
        "#;
        let scenario = Scenario::from_ron_str(ron).unwrap();
        assert_eq!(scenario.setup.size, MapSize::Small);
        assert_eq!(scenario.setup.obstruction, Obstruction::None);
        assert_eq!(scenario.ships.len(), 2);
        assert!(scenario.fleets.is_empty());
        assert_eq!(scenario.config, SimConfig::default());

        let sim = scenario
            .build(ShipCatalog::default(), &DoctrineTable::default())
            .unwrap();
        assert_eq!(sim.query_state().ships.len(), 2);
    }

    #[test]
    fn test_victory_comes_from_setup() {
        let ron = r#"
            Scenario(
                name: "Timed",
                setup: (obstruction: None, victory: TimeLimit(ticks: 10)),
            )
        "#;
        let scenario = Scenario::from_ron_str(ron).unwrap();
        let sim = scenario
            .build(ShipCatalog::default(), &DoctrineTable::default())
            .unwrap();
        assert_eq!(
            sim.world().config().victory,
            naval_core::data::VictoryCondition::TimeLimit { ticks: 10 }
        );
    }

    #[test]
    fn test_unknown_doctrine_rejected() {
        let mut scenario = Scenario::default();
        scenario.fleets[0].doctrine = Some("kamikaze".to_string());
        let err = scenario
            .build(ShipCatalog::default(), &DoctrineTable::default())
            .unwrap_err();
        assert!(matches!(err, ScenarioError::UnknownDoctrine(name) if name == "kamikaze"));
    }

    #[test]
    fn test_missing_file() {
        let err = Scenario::load("/nonexistent/battle.ron").unwrap_err();
        assert!(matches!(err, ScenarioError::FileNotFound(_)));
    }

    #[test]
    fn test_load_with_relative_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = ShipCatalog::default();
        let text = ron::ser::to_string_pretty(&catalog, ron::ser::PrettyConfig::default()).unwrap();
        std::fs::write(dir.path().join("ships.ron"), text).unwrap();

        let path = dir.path().join("battle.ron");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, r#"Scenario(name: "Files", catalog: Some("ships.ron"))"#).unwrap();

        let loaded = Scenario::load_with_data(&path).unwrap();
        assert_eq!(loaded.scenario.name, "Files");
        assert_eq!(loaded.catalog, catalog);
    }

    #[test]
    fn test_spawn_on_border_fails() {
        let ron = r#"
            Scenario(
                name: "Bad",
                setup: (obstruction: None),
                ships: [(class: "dd", side: Ally, position: (100.0, 100.0))],
            )
        "#;
        let err = Scenario::from_ron_str(ron)
            .unwrap()
            .build(ShipCatalog::default(), &DoctrineTable::default())
            .unwrap_err();
        assert!(matches!(err, ScenarioError::Simulation(_)));
    }
}
