// Copyright 2026 the Graft Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for the work loop.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that the
//! reconciler calls as passes begin, yield, get preempted, and commit. All
//! method bodies default to no-ops, so implementing only the events you care
//! about is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace` feature
//! is **off**, every `Tracer` method compiles to nothing (zero overhead). When
//! **on**, each method performs a single `Option` branch before dispatching.
//!
//! Structured *logging* is separate: see the `tracing` crate feature.
//!
//! # Crate features
//!
//! - `trace`: enables the `Tracer` method bodies (one branch per call).

use crate::lane::Lane;
use crate::reconciler::RootId;
use crate::time::HostTime;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Why a slice ended before its pass completed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum YieldReason {
    /// The slice budget ran out.
    Budget,
    /// A request with a strictly higher lane is waiting.
    HigherPriority,
}

impl YieldReason {
    /// Short name for diagnostics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Budget => "budget",
            Self::HigherPriority => "higher-priority",
        }
    }
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when a fresh rendering pass starts.
#[derive(Clone, Copy, Debug)]
pub struct PassBeginEvent {
    /// Root being rendered.
    pub root: RootId,
    /// Lane of the pass.
    pub lane: Lane,
    /// Monotonic pass counter (per reconciler).
    pub pass: u64,
    /// Host time at the start of the pass.
    pub timestamp: HostTime,
    /// Whether priority preemption is suppressed for this pass.
    pub protected: bool,
}

/// Emitted at the end of every work slice.
#[derive(Clone, Copy, Debug)]
pub struct SliceEvent {
    /// Root being rendered.
    pub root: RootId,
    /// Lane of the pass.
    pub lane: Lane,
    /// Pass counter.
    pub pass: u64,
    /// Host time when the slice started.
    pub start: HostTime,
    /// Host time when the slice ended.
    pub end: HostTime,
    /// Work items processed in the slice.
    pub items: u32,
}

/// Emitted when a pass yields control and is suspended.
#[derive(Clone, Copy, Debug)]
pub struct YieldEvent {
    /// Root being rendered.
    pub root: RootId,
    /// Lane of the pass.
    pub lane: Lane,
    /// Pass counter.
    pub pass: u64,
    /// Host time of the yield.
    pub timestamp: HostTime,
    /// Why the slice ended.
    pub reason: YieldReason,
    /// Work items left on the stack.
    pub remaining: u32,
}

/// Emitted when an in-flight pass is discarded for a higher lane.
#[derive(Clone, Copy, Debug)]
pub struct PreemptEvent {
    /// Root whose pass was discarded.
    pub root: RootId,
    /// Lane of the discarded pass.
    pub lane: Lane,
    /// Lane that took over.
    pub by: Lane,
    /// Counter of the discarded pass.
    pub pass: u64,
    /// Host time of the preemption.
    pub timestamp: HostTime,
    /// Effect records thrown away.
    pub discarded_effects: u32,
    /// Consecutive background preemptions on this root, including this one.
    pub consecutive: u32,
}

/// Emitted when a pass is abandoned because of an internal inconsistency.
#[derive(Clone, Copy, Debug)]
pub struct AbandonEvent {
    /// Root whose pass was abandoned.
    pub root: RootId,
    /// Lane of the abandoned pass.
    pub lane: Lane,
    /// Pass counter.
    pub pass: u64,
    /// Host time of the abandonment.
    pub timestamp: HostTime,
}

/// Marks the start of a commit.
#[derive(Clone, Copy, Debug)]
pub struct CommitBeginEvent {
    /// Root being committed.
    pub root: RootId,
    /// Lane of the pass.
    pub lane: Lane,
    /// Pass counter.
    pub pass: u64,
    /// Host time at the start of the commit.
    pub timestamp: HostTime,
    /// Effect records to replay.
    pub effects: u32,
}

/// Marks the end of a commit.
#[derive(Clone, Copy, Debug)]
pub struct CommitEndEvent {
    /// Root that was committed.
    pub root: RootId,
    /// Lane of the pass.
    pub lane: Lane,
    /// Pass counter.
    pub pass: u64,
    /// Host time at the end of the commit.
    pub timestamp: HostTime,
    /// Records applied.
    pub applied: u32,
    /// Records the host rejected.
    pub failed: u32,
    /// Records skipped because an ancestor failed.
    pub skipped: u32,
}

/// Per-pass summary, emitted after a commit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommitSummary {
    /// Root that was committed.
    pub root: RootId,
    /// Lane of the pass.
    pub lane: Lane,
    /// Pass counter.
    pub pass: u64,
    /// Host time when the pass started.
    pub started_at: HostTime,
    /// Host time when the commit finished.
    pub committed_at: HostTime,
    /// Number of slices the pass took.
    pub slices: u32,
    /// Work items processed over the whole pass.
    pub items: u64,
    /// Ticks spent inside slices.
    pub render_ticks: u64,
    /// Ticks spent committing.
    pub commit_ticks: u64,
    /// Effect records replayed.
    pub effects: u32,
    /// Records the host rejected.
    pub failed: u32,
    /// Description errors found while diffing.
    pub description_errors: u32,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the work loop.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called when a fresh pass starts.
    fn on_pass_begin(&mut self, e: &PassBeginEvent) {
        _ = e;
    }

    /// Called at the end of every slice.
    fn on_slice(&mut self, e: &SliceEvent) {
        _ = e;
    }

    /// Called when a pass yields.
    fn on_yield(&mut self, e: &YieldEvent) {
        _ = e;
    }

    /// Called when a pass is preempted.
    fn on_preempt(&mut self, e: &PreemptEvent) {
        _ = e;
    }

    /// Called when a pass is abandoned.
    fn on_abandon(&mut self, e: &AbandonEvent) {
        _ = e;
    }

    /// Called at the start of a commit.
    fn on_commit_begin(&mut self, e: &CommitBeginEvent) {
        _ = e;
    }

    /// Called at the end of a commit.
    fn on_commit_end(&mut self, e: &CommitEndEvent) {
        _ = e;
    }

    /// Called with a per-pass summary.
    fn on_commit_summary(&mut self, s: &CommitSummary) {
        _ = s;
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing. When
/// **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

/// Generates one dispatching `Tracer` method per sink callback.
macro_rules! tracer_methods {
    ($($(#[$meta:meta])* $name:ident => $hook:ident($ty:ty);)*) => {
        $(
            $(#[$meta])*
            #[inline]
            pub fn $name(&mut self, e: &$ty) {
                #[cfg(feature = "trace")]
                if let Some(s) = &mut self.sink {
                    s.$hook(e);
                }
                #[cfg(not(feature = "trace"))]
                {
                    _ = e;
                }
            }
        )*
    };
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    tracer_methods! {
        /// Emits a [`PassBeginEvent`].
        pass_begin => on_pass_begin(PassBeginEvent);
        /// Emits a [`SliceEvent`].
        slice => on_slice(SliceEvent);
        /// Emits a [`YieldEvent`].
        yielded => on_yield(YieldEvent);
        /// Emits a [`PreemptEvent`].
        preempt => on_preempt(PreemptEvent);
        /// Emits an [`AbandonEvent`].
        abandon => on_abandon(AbandonEvent);
        /// Emits a [`CommitBeginEvent`].
        commit_begin => on_commit_begin(CommitBeginEvent);
        /// Emits a [`CommitEndEvent`].
        commit_end => on_commit_end(CommitEndEvent);
        /// Emits a [`CommitSummary`].
        commit_summary => on_commit_summary(CommitSummary);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_yield() -> YieldEvent {
        YieldEvent {
            root: RootId(0),
            lane: Lane::Background,
            pass: 3,
            timestamp: HostTime(1_000),
            reason: YieldReason::Budget,
            remaining: 12,
        }
    }

    fn sample_summary() -> CommitSummary {
        CommitSummary {
            root: RootId(0),
            lane: Lane::Urgent,
            pass: 4,
            started_at: HostTime(0),
            committed_at: HostTime(500),
            slices: 2,
            items: 40,
            render_ticks: 400,
            commit_ticks: 100,
            effects: 6,
            failed: 0,
            description_errors: 0,
        }
    }

    #[test]
    fn noop_sink_compiles() {
        let mut sink = NoopSink;
        sink.on_yield(&sample_yield());
        sink.on_commit_summary(&sample_summary());
    }

    #[test]
    fn tracer_none_does_nothing() {
        let mut tracer = Tracer::none();
        tracer.yielded(&sample_yield());
        tracer.commit_summary(&sample_summary());
    }

    #[cfg(feature = "trace")]
    #[test]
    fn tracer_dispatches_to_sink() {
        use alloc::vec::Vec;

        struct RecordingSink {
            yields: Vec<u64>,
        }
        impl TraceSink for RecordingSink {
            fn on_yield(&mut self, e: &YieldEvent) {
                self.yields.push(e.pass);
            }
        }

        let mut sink = RecordingSink { yields: Vec::new() };
        let mut tracer = Tracer::new(&mut sink);
        tracer.yielded(&sample_yield());
        drop(tracer);
        assert_eq!(sink.yields, &[3]);
    }
}
