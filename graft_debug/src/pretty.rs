// Copyright 2026 the Graft Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr). Timestamps
//! are converted to microseconds using a [`Timebase`].

use std::io::Write;

use graft_core::time::{HostTime, Timebase};
use graft_core::trace::{
    AbandonEvent, CommitBeginEvent, CommitEndEvent, CommitSummary, PassBeginEvent, PreemptEvent,
    SliceEvent, TraceSink, YieldEvent,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
    timebase: Timebase,
    /// Skip per-slice lines; passes with many slices get noisy.
    quiet_slices: bool,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink")
            .field("timebase", &self.timebase)
            .field("quiet_slices", &self.quiet_slices)
            .finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr(timebase: Timebase) -> Self {
        Self::with_writer(Box::new(std::io::stderr()), timebase)
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W, timebase: Timebase) -> Self {
        Self {
            writer,
            timebase,
            quiet_slices: false,
        }
    }

    /// Suppresses `[slice]` lines.
    #[must_use]
    pub fn quiet_slices(mut self) -> Self {
        self.quiet_slices = true;
        self
    }

    /// Consumes the sink and returns the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn ticks_to_us(&self, ticks: u64) -> f64 {
        self.timebase.ticks_to_nanos(ticks) as f64 / 1000.0
    }

    fn host_us(&self, t: HostTime) -> f64 {
        self.ticks_to_us(t.ticks())
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_pass_begin(&mut self, e: &PassBeginEvent) {
        let protected = if e.protected { " protected" } else { "" };
        let _ = writeln!(
            self.writer,
            "[pass] {} lane={} pass={} at {:.1}µs{protected}",
            e.root,
            e.lane,
            e.pass,
            self.host_us(e.timestamp),
        );
    }

    fn on_slice(&mut self, e: &SliceEvent) {
        if self.quiet_slices {
            return;
        }
        let _ = writeln!(
            self.writer,
            "[slice] {} pass={} items={} {:.1}µs..{:.1}µs",
            e.root,
            e.pass,
            e.items,
            self.host_us(e.start),
            self.host_us(e.end),
        );
    }

    fn on_yield(&mut self, e: &YieldEvent) {
        let _ = writeln!(
            self.writer,
            "[yield] {} pass={} reason={} remaining={}",
            e.root,
            e.pass,
            e.reason.as_str(),
            e.remaining,
        );
    }

    fn on_preempt(&mut self, e: &PreemptEvent) {
        let _ = writeln!(
            self.writer,
            "[preempt] {} pass={} lane={} by={} discarded={} consecutive={}",
            e.root, e.pass, e.lane, e.by, e.discarded_effects, e.consecutive,
        );
    }

    fn on_abandon(&mut self, e: &AbandonEvent) {
        let _ = writeln!(
            self.writer,
            "[abandon] {} pass={} lane={} at {:.1}µs",
            e.root,
            e.pass,
            e.lane,
            self.host_us(e.timestamp),
        );
    }

    fn on_commit_begin(&mut self, e: &CommitBeginEvent) {
        let _ = writeln!(
            self.writer,
            "[commit:begin] {} pass={} effects={}",
            e.root, e.pass, e.effects,
        );
    }

    fn on_commit_end(&mut self, e: &CommitEndEvent) {
        let _ = writeln!(
            self.writer,
            "[commit:end] {} pass={} applied={} failed={} skipped={}",
            e.root, e.pass, e.applied, e.failed, e.skipped,
        );
    }

    fn on_commit_summary(&mut self, s: &CommitSummary) {
        let status = if s.failed == 0 && s.description_errors == 0 {
            "clean"
        } else {
            "ERRORS"
        };
        let _ = writeln!(
            self.writer,
            "[summary] {} lane={} pass={} slices={} items={} render={:.1}µs \
             commit={:.1}µs effects={} {status}",
            s.root,
            s.lane,
            s.pass,
            s.slices,
            s.items,
            self.ticks_to_us(s.render_ticks),
            self.ticks_to_us(s.commit_ticks),
            s.effects,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graft_core::lane::Lane;
    use graft_core::reconciler::RootId;
    use graft_core::trace::YieldReason;

    #[test]
    fn pretty_print_yield() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new(), Timebase::NANOS);
        sink.on_yield(&YieldEvent {
            root: RootId(2),
            lane: Lane::Background,
            pass: 9,
            timestamp: HostTime(1_000),
            reason: YieldReason::HigherPriority,
            remaining: 4,
        });
        let output = String::from_utf8(sink.into_inner()).unwrap();
        assert!(output.starts_with("[yield] root#2"), "got: {output}");
        assert!(output.contains("reason=higher-priority"), "got: {output}");
    }

    #[test]
    fn quiet_slices_skips_slice_lines() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new(), Timebase::NANOS).quiet_slices();
        sink.on_slice(&SliceEvent {
            root: RootId(0),
            lane: Lane::Urgent,
            pass: 0,
            start: HostTime(0),
            end: HostTime(2_000),
            items: 10,
        });
        sink.on_commit_begin(&CommitBeginEvent {
            root: RootId(0),
            lane: Lane::Urgent,
            pass: 0,
            timestamp: HostTime(2_000),
            effects: 3,
        });
        let output = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(output, "[commit:begin] root#0 pass=0 effects=3\n");
    }
}
