//! Battle playback with JSON output.
//!
//! Output is JSON lines: one `snapshot` record every `every` ticks and a
//! final `summary` record.

use std::io::Write;
use std::thread;
use std::time::{Duration, Instant};

use naval_core::simulation::{Outcome, Simulation};
use naval_core::snapshot::BattleSnapshot;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::scenario::ScenarioError;

/// Playback settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Tick budget.
    pub ticks: u64,
    /// Ticks between snapshots; 0 disables them.
    pub every: u64,
    /// Drive the clock from wall time instead of stepping it.
    pub realtime: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            ticks: 1_000,
            every: 100,
            realtime: false,
        }
    }
}

/// End-of-run statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Ticks simulated.
    pub ticks: u64,
    /// Result when playback stopped.
    pub outcome: Outcome,
    /// Final determinism hash.
    pub state_hash: u64,
    /// Volleys fired over the run.
    pub volleys: usize,
    /// Shells spent over the run.
    pub projectiles_spent: usize,
    /// Snapshots written.
    pub snapshots: usize,
}

/// One line of output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputRecord {
    /// Periodic battle state.
    Snapshot(BattleSnapshot),
    /// Final statistics.
    Summary(RunSummary),
}

fn emit<W: Write>(out: &mut W, record: &OutputRecord) -> Result<(), ScenarioError> {
    serde_json::to_writer(&mut *out, record)?;
    writeln!(out)?;
    Ok(())
}

/// Run `sim` until the tick budget is spent or the battle is decided.
///
/// The clock is started if it is paused.
pub fn run<W: Write>(
    sim: &mut Simulation,
    options: RunOptions,
    out: &mut W,
) -> Result<RunSummary, ScenarioError> {
    if !sim.is_running() {
        sim.start();
    }
    let first_tick = sim.elapsed();
    let mut summary = RunSummary {
        ticks: 0,
        outcome: sim.outcome(),
        state_hash: sim.state_hash(),
        volleys: 0,
        projectiles_spent: 0,
        snapshots: 0,
    };

    let period = Duration::from_millis(sim.world().config().tick_period_ms);
    let mut last_pump = Instant::now();
    let mut next_snapshot = options.every;

    while summary.ticks < options.ticks && summary.outcome == Outcome::Ongoing {
        let events = if options.realtime {
            thread::sleep(period);
            let now = Instant::now();
            let events = sim.pump(now - last_pump);
            last_pump = now;
            events
        } else {
            vec![sim.tick()]
        };

        for tick_events in &events {
            summary.volleys += tick_events.volleys.len();
            summary.projectiles_spent += tick_events.projectiles_spent.len();
        }
        summary.ticks = sim.elapsed() - first_tick;

        // A realtime pump can cover several ticks; snapshot once per crossing
        if options.every > 0 && summary.ticks >= next_snapshot {
            emit(out, &OutputRecord::Snapshot(sim.query_state()))?;
            summary.snapshots += 1;
            next_snapshot = (summary.ticks / options.every + 1) * options.every;
            debug!(tick = sim.elapsed(), "Snapshot written");
        }
        summary.outcome = sim.outcome();
    }

    summary.state_hash = sim.state_hash();
    info!(
        ticks = summary.ticks,
        outcome = ?summary.outcome,
        volleys = summary.volleys,
        "Run complete"
    );
    emit(out, &OutputRecord::Summary(summary.clone()))?;
    Ok(summary)
}
