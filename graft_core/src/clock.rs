// Copyright 2026 the Graft Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scheduling clocks.
//!
//! The work loop consults a [`SchedulingClock`] only at yield points, after
//! each unit of work. The remaining slice time is measured against
//! [`SchedulerConfig::slice_budget`](crate::scheduler::SchedulerConfig::slice_budget)
//! from the clock's [`now`](SchedulingClock::now) at the start of the slice.

use crate::lane::Lane;
use crate::time::{Duration, HostTime};

/// Time source and preemption signal for the cooperative work loop.
pub trait SchedulingClock {
    /// Current host time.
    fn now(&mut self) -> HostTime;

    /// Whether the embedder knows of a request with a strictly higher
    /// priority than `running` that has not been submitted yet (for example,
    /// queued input events). Returning `true` makes the loop yield.
    fn higher_priority_pending(&mut self, running: Lane) -> bool {
        _ = running;
        false
    }
}

/// A clock backed by a closure returning the host time.
#[derive(Debug)]
pub struct FnClock<F>(pub F);

impl<F: FnMut() -> HostTime> SchedulingClock for FnClock<F> {
    fn now(&mut self) -> HostTime {
        (self.0)()
    }
}

/// A deterministic clock that advances by a fixed step on every read.
///
/// Intended for tests and replays: with a step of `s` and a slice budget of
/// `b`, a slice yields after roughly `b / s` units of work.
#[derive(Clone, Copy, Debug)]
pub struct SteppedClock {
    /// Time returned by the next read.
    pub now: HostTime,
    /// Amount added after every read.
    pub step: Duration,
    /// A not-yet-submitted request to report through
    /// [`higher_priority_pending`](SchedulingClock::higher_priority_pending).
    pub pending: Option<Lane>,
}

impl SteppedClock {
    /// Creates a clock starting at zero.
    #[must_use]
    pub const fn new(step: Duration) -> Self {
        Self {
            now: HostTime(0),
            step,
            pending: None,
        }
    }

    /// A clock that never advances, so budgets never run out.
    #[must_use]
    pub const fn frozen() -> Self {
        Self::new(Duration::ZERO)
    }
}

impl SchedulingClock for SteppedClock {
    fn now(&mut self) -> HostTime {
        let t = self.now;
        self.now = self.now.saturating_add(self.step);
        t
    }

    fn higher_priority_pending(&mut self, running: Lane) -> bool {
        self.pending.is_some_and(|lane| lane > running)
    }
}
