//! Headless battle runner.
//!
//! Loads a battle scenario from RON, plays it without graphics and writes
//! the battle state as JSON lines. Also validates ship catalogs.
//!
//! - **stdout**: JSON records (snapshots, then a summary)
//! - **stderr**: logs
//!
//! # Example
//!
//! ```bash
//! # Play 2000 ticks, snapshot every 200
//! cargo run -p naval_headless -- run --scenario battle.ron --ticks 2000 --every 200
//!
//! # Check a catalog before using it
//! cargo run -p naval_headless -- validate --catalog ships.ron
//! ```

pub mod runner;
pub mod scenario;

pub use runner::{run, OutputRecord, RunOptions, RunSummary};
pub use scenario::{load_catalog, FleetSetup, LoadedScenario, Scenario, ScenarioError, ShipPlacement};
