//! Fixed-period tick dispatcher.
//!
//! The clock owns an ordered list of [`Tickable`] subscribers and runs
//! each exactly once per tick, in registration order, against a shared
//! context. Periodic behaviour inside subscribers is expressed with
//! [`Countdown`]s rather than timers, so nothing ever blocks inside a tick.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Something the clock advances once per tick.
pub trait Tickable<C> {
    /// Perform one update against the shared context.
    fn tick(&mut self, ctx: &mut C);

    /// Name used in logs.
    fn name(&self) -> &'static str;
}

/// Run state of a [`Clock`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ClockState {
    /// Ticks are ignored.
    #[default]
    Stopped,
    /// Ticks run subscribers.
    Running,
}

/// Fixed-period tick dispatcher.
pub struct Clock<C> {
    period: Duration,
    state: ClockState,
    elapsed: u64,
    backlog: Duration,
    subscribers: Vec<Box<dyn Tickable<C>>>,
}

impl<C> std::fmt::Debug for Clock<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Clock")
            .field("period", &self.period)
            .field("state", &self.state)
            .field("elapsed", &self.elapsed)
            .field(
                "subscribers",
                &self.subscribers.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl<C> Clock<C> {
    /// Create a stopped clock with no subscribers.
    ///
    /// A zero period is raised to one millisecond.
    #[must_use]
    pub fn new(period: Duration) -> Self {
        Self {
            period: period.max(Duration::from_millis(1)),
            state: ClockState::Stopped,
            elapsed: 0,
            backlog: Duration::ZERO,
            subscribers: Vec::new(),
        }
    }

    /// Register a subscriber. It runs after every earlier subscriber.
    pub fn subscribe(&mut self, subscriber: Box<dyn Tickable<C>>) {
        self.subscribers.push(subscriber);
    }

    /// Number of subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Begin accepting ticks.
    pub fn start(&mut self) {
        self.state = ClockState::Running;
    }

    /// Stop accepting ticks. Time accumulated in `pump` is dropped.
    pub fn stop(&mut self) {
        self.state = ClockState::Stopped;
        self.backlog = Duration::ZERO;
    }

    /// Current run state.
    #[must_use]
    pub const fn state(&self) -> ClockState {
        self.state
    }

    /// Check if the clock is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state == ClockState::Running
    }

    /// Ticks run since creation.
    #[must_use]
    pub const fn elapsed(&self) -> u64 {
        self.elapsed
    }

    /// Tick period.
    #[must_use]
    pub const fn period(&self) -> Duration {
        self.period
    }

    /// Run one tick if the clock is running. Returns whether it ran.
    pub fn tick(&mut self, ctx: &mut C) -> bool {
        if !self.is_running() {
            return false;
        }
        for subscriber in &mut self.subscribers {
            subscriber.tick(ctx);
        }
        self.elapsed += 1;
        true
    }

    /// Feed wall-clock time and run every tick that became due.
    ///
    /// `on_tick` runs after each tick with the context, before the next
    /// tick starts. Returns the number of ticks run.
    pub fn pump(&mut self, ctx: &mut C, dt: Duration, mut on_tick: impl FnMut(&mut C)) -> u32 {
        if !self.is_running() {
            return 0;
        }
        self.backlog += dt;
        let mut ran = 0;
        while self.backlog >= self.period && self.is_running() {
            self.backlog -= self.period;
            self.tick(ctx);
            on_tick(ctx);
            ran += 1;
        }
        ran
    }
}

/// Per-entity periodic trigger.
///
/// Fires on the first check and then once every `period` checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Countdown {
    period: u32,
    remaining: u32,
}

impl Countdown {
    /// Create a countdown that fires on its first check.
    #[must_use]
    pub const fn new(period: u32) -> Self {
        Self {
            period: if period == 0 { 1 } else { period },
            remaining: 0,
        }
    }

    /// Advance one check. Returns true when the countdown expires.
    pub fn expire(&mut self) -> bool {
        if self.remaining == 0 {
            self.remaining = self.period - 1;
            true
        } else {
            self.remaining -= 1;
            false
        }
    }

    /// Restart a full period.
    pub fn arm(&mut self) {
        self.remaining = self.period - 1;
    }

    /// Make the next check fire.
    pub fn trigger(&mut self) {
        self.remaining = 0;
    }

    /// Checks left before the next expiry.
    #[must_use]
    pub const fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Period in checks.
    #[must_use]
    pub const fn period(&self) -> u32 {
        self.period
    }
}
