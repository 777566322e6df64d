// Copyright 2026 the Graft Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads recorded bytes from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes [Chrome Trace Event Format][spec] JSON to the given writer.
//! Each root is a process and each lane a thread, so preemption shows up as
//! a background track interrupted by urgent activity.
//!
//! [spec]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Value, json};

use graft_core::lane::Lane;
use graft_core::time::Timebase;

use crate::recorder::{RecordedEvent, decode};

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
///
/// Timestamps are converted to microseconds using the provided [`Timebase`].
pub fn export(bytes: &[u8], timebase: Timebase, writer: &mut dyn Write) -> io::Result<()> {
    let us = |ticks: u64| ticks_to_us(ticks, timebase);
    let mut events: Vec<Value> = Vec::new();

    for recorded in decode(bytes) {
        match recorded {
            RecordedEvent::PassBegin(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "PassBegin",
                    "cat": "Scheduler",
                    "ts": us(e.timestamp.ticks()),
                    "pid": e.root.0,
                    "tid": lane_tid(e.lane),
                    "s": "t",
                    "args": {
                        "pass": e.pass,
                        "protected": e.protected,
                    }
                }));
            }
            RecordedEvent::Slice(e) => {
                events.push(json!({
                    "ph": "X",
                    "name": "Slice",
                    "cat": "Render",
                    "ts": us(e.start.ticks()),
                    "dur": us(e.end.ticks().saturating_sub(e.start.ticks())),
                    "pid": e.root.0,
                    "tid": lane_tid(e.lane),
                    "args": {
                        "pass": e.pass,
                        "items": e.items,
                    }
                }));
            }
            RecordedEvent::Yield(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "Yield",
                    "cat": "Scheduler",
                    "ts": us(e.timestamp.ticks()),
                    "pid": e.root.0,
                    "tid": lane_tid(e.lane),
                    "s": "t",
                    "args": {
                        "pass": e.pass,
                        "reason": e.reason.as_str(),
                        "remaining": e.remaining,
                    }
                }));
            }
            RecordedEvent::Preempt(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "Preempt",
                    "cat": "Scheduler",
                    "ts": us(e.timestamp.ticks()),
                    "pid": e.root.0,
                    "tid": lane_tid(e.lane),
                    "s": "p",
                    "args": {
                        "pass": e.pass,
                        "by": e.by.as_str(),
                        "discarded_effects": e.discarded_effects,
                        "consecutive": e.consecutive,
                    }
                }));
            }
            RecordedEvent::Abandon(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "Abandon",
                    "cat": "Scheduler",
                    "ts": us(e.timestamp.ticks()),
                    "pid": e.root.0,
                    "tid": lane_tid(e.lane),
                    "s": "p",
                    "args": {
                        "pass": e.pass,
                    }
                }));
            }
            RecordedEvent::CommitBegin(e) => {
                events.push(json!({
                    "ph": "B",
                    "name": "Commit",
                    "cat": "Commit",
                    "ts": us(e.timestamp.ticks()),
                    "pid": e.root.0,
                    "tid": lane_tid(e.lane),
                    "args": {
                        "pass": e.pass,
                        "effects": e.effects,
                    }
                }));
            }
            RecordedEvent::CommitEnd(e) => {
                events.push(json!({
                    "ph": "E",
                    "name": "Commit",
                    "cat": "Commit",
                    "ts": us(e.timestamp.ticks()),
                    "pid": e.root.0,
                    "tid": lane_tid(e.lane),
                    "args": {
                        "applied": e.applied,
                        "failed": e.failed,
                        "skipped": e.skipped,
                    }
                }));
            }
            RecordedEvent::CommitSummary(s) => {
                events.push(json!({
                    "ph": "i",
                    "name": "CommitSummary",
                    "cat": "Summary",
                    "ts": us(s.committed_at.ticks()),
                    "pid": s.root.0,
                    "tid": lane_tid(s.lane),
                    "s": "p",
                    "args": {
                        "pass": s.pass,
                        "slices": s.slices,
                        "items": s.items,
                        "render_us": us(s.render_ticks),
                        "commit_us": us(s.commit_ticks),
                        "effects": s.effects,
                        "failed": s.failed,
                        "description_errors": s.description_errors,
                    }
                }));
            }
        }
    }

    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}

fn lane_tid(lane: Lane) -> u8 {
    match lane {
        Lane::Urgent => 0,
        Lane::Background => 1,
    }
}

fn ticks_to_us(ticks: u64, timebase: Timebase) -> f64 {
    timebase.ticks_to_nanos(ticks) as f64 / 1000.0
}
