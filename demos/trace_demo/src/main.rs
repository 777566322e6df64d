// Copyright 2026 the Graft Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scripted reconciliation session that exercises the tracing pipeline.
//!
//! Renders a small list app into a [`MemoryHost`], then interleaves
//! background list updates with urgent title edits so that background passes
//! get preempted and retried. Events go to both a
//! [`PrettyPrintSink`](graft_debug::pretty::PrettyPrintSink) on stderr and a
//! [`RecorderSink`](graft_debug::recorder::RecorderSink), which is exported
//! as a Chrome trace JSON file at the end.
//!
//! Set `RUST_LOG=graft_core=trace` to see the engine's own log events too.

use std::fs::File;
use std::io::{self, BufWriter};

use graft_backend_memory::MemoryHost;
use graft_core::clock::SteppedClock;
use graft_core::commit::CommitReport;
use graft_core::describe::{Node, NodeRef, TreeSource};
use graft_core::lane::Lane;
use graft_core::reconciler::{Reconciler, RootId, WorkOutcome};
use graft_core::scheduler::SchedulerConfig;
use graft_core::time::{Duration, Timebase};
use graft_core::trace::{
    AbandonEvent, CommitBeginEvent, CommitEndEvent, CommitSummary, PassBeginEvent, PreemptEvent,
    SliceEvent, TraceSink, Tracer, YieldEvent,
};
use graft_debug::pretty::PrettyPrintSink;
use graft_debug::recorder::RecorderSink;
use tracing_subscriber::EnvFilter;

const ITEMS: u64 = 400;
/// Clock advance per read: 20µs of simulated work per unit.
const STEP_NS: u64 = 20_000;

/// Application state rendered by both lanes.
struct App {
    title: String,
    items: Vec<u64>,
}

impl TreeSource for App {
    fn describe(&mut self, _root: RootId, _lane: Lane) -> NodeRef {
        Node::element("main")
            .child(Node::element("h1").child(Node::text(self.title.as_str())))
            .child(
                Node::element("ul").attr("count", self.items.len() as i64).children(
                    self.items.iter().map(|&i| {
                        Node::element("li")
                            .key(i)
                            .attr("done", i % 3 == 0)
                            .child(Node::text(format!("item {i}")))
                    }),
                ),
            )
            .build()
    }
}

/// Forwards every event to two sinks.
struct Tee<A, B>(A, B);

impl<A: TraceSink, B: TraceSink> TraceSink for Tee<A, B> {
    fn on_pass_begin(&mut self, e: &PassBeginEvent) {
        self.0.on_pass_begin(e);
        self.1.on_pass_begin(e);
    }

    fn on_slice(&mut self, e: &SliceEvent) {
        self.0.on_slice(e);
        self.1.on_slice(e);
    }

    fn on_yield(&mut self, e: &YieldEvent) {
        self.0.on_yield(e);
        self.1.on_yield(e);
    }

    fn on_preempt(&mut self, e: &PreemptEvent) {
        self.0.on_preempt(e);
        self.1.on_preempt(e);
    }

    fn on_abandon(&mut self, e: &AbandonEvent) {
        self.0.on_abandon(e);
        self.1.on_abandon(e);
    }

    fn on_commit_begin(&mut self, e: &CommitBeginEvent) {
        self.0.on_commit_begin(e);
        self.1.on_commit_begin(e);
    }

    fn on_commit_end(&mut self, e: &CommitEndEvent) {
        self.0.on_commit_end(e);
        self.1.on_commit_end(e);
    }

    fn on_commit_summary(&mut self, s: &CommitSummary) {
        self.0.on_commit_summary(s);
        self.1.on_commit_summary(s);
    }
}

/// Runs `slices` calls to `work`, or fewer if the reconciler goes idle.
fn run_slices(
    rec: &mut Reconciler,
    app: &mut App,
    host: &mut MemoryHost,
    clock: &mut SteppedClock,
    tracer: &mut Tracer<'_>,
    slices: usize,
) {
    for _ in 0..slices {
        match rec.work_traced(app, host, clock, tracer) {
            WorkOutcome::Idle => return,
            WorkOutcome::Aborted { root, error } => eprintln!("{root} aborted: {error}"),
            WorkOutcome::Yielded { .. } | WorkOutcome::Committed(_) => {}
        }
    }
}

fn main() -> io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("graft_core=info")),
        )
        .with_writer(io::stderr)
        .init();

    let timebase = Timebase::NANOS;
    let mut sinks = Tee(
        PrettyPrintSink::stderr(timebase).quiet_slices(),
        RecorderSink::new(),
    );

    let mut host = MemoryHost::new();
    let mut rec = Reconciler::new(SchedulerConfig::interactive());
    let mut clock = SteppedClock::new(Duration(STEP_NS));
    let root = rec.mount(host.container());
    rec.add_observer(|report: &CommitReport| {
        let c = report.counts();
        println!(
            "{} {} pass {}: +{} -{} moves={} attrs={} texts={} failed={}",
            report.root,
            report.lane,
            report.pass,
            c.inserts,
            c.removes,
            c.moves,
            c.attribute_updates,
            c.text_updates,
            report.failed.len(),
        );
    });

    let mut app = App {
        title: String::from("Groceries"),
        items: (0..ITEMS).collect(),
    };

    {
        let mut tracer = Tracer::new(&mut sinks);

        // Initial render.
        rec.request_update(root, Lane::Urgent).expect("root is mounted");
        run_slices(&mut rec, &mut app, &mut host, &mut clock, &mut tracer, usize::MAX);

        // A background reorder, interrupted by typing in the title.
        app.items.reverse();
        rec.request_update(root, Lane::Background).expect("root is mounted");
        for typed in ["Groceries!", "Groceries!!", "Groceries!!!"] {
            run_slices(&mut rec, &mut app, &mut host, &mut clock, &mut tracer, 2);
            typed.clone_into(&mut app.title);
            rec.request_update(root, Lane::Urgent).expect("root is mounted");
        }
        run_slices(&mut rec, &mut app, &mut host, &mut clock, &mut tracer, usize::MAX);

        // Drop every other item in the background.
        app.items.retain(|i| i % 2 == 0);
        rec.request_update(root, Lane::Background).expect("root is mounted");
        rec.request_update(root, Lane::Background).expect("root is mounted");
        run_slices(&mut rec, &mut app, &mut host, &mut clock, &mut tracer, usize::MAX);
    }

    let removed = rec.unmount(root, &mut host).expect("root is mounted");
    println!(
        "unmounted {}: {} removals, {} host nodes left",
        removed.root,
        removed.counts().removes,
        host.live_nodes()
    );

    let Tee(_, recorder) = sinks;
    let path = "graft-trace.json";
    let mut writer = BufWriter::new(File::create(path)?);
    graft_debug::chrome::export(recorder.as_bytes(), timebase, &mut writer)?;
    println!("wrote {path} ({} bytes recorded)", recorder.as_bytes().len());
    Ok(())
}
