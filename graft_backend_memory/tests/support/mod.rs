// Copyright 2026 the Graft Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shared harness for the integration tests.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use graft_backend_memory::{MemoryHost, html};
use graft_core::clock::SteppedClock;
use graft_core::commit::CommitReport;
use graft_core::describe::NodeRef;
use graft_core::lane::Lane;
use graft_core::reconciler::{Reconciler, RootId, WorkOutcome};
use graft_core::scheduler::SchedulerConfig;
use graft_core::time::Duration;

/// One mounted root over a [`MemoryHost`].
pub(crate) struct Harness {
    pub(crate) host: MemoryHost,
    pub(crate) rec: Reconciler,
    pub(crate) root: RootId,
    pub(crate) clock: SteppedClock,
}

impl Harness {
    /// A root whose slices stop after `budget` clock reads.
    pub(crate) fn budgeted(budget: u64) -> Self {
        let config = SchedulerConfig {
            slice_budget: Duration(budget),
            max_background_preemptions: 3,
        };
        Self::with(MemoryHost::new(), config, SteppedClock::new(Duration(1)))
    }

    /// A root that never yields on budget.
    pub(crate) fn unbounded() -> Self {
        Self::with(
            MemoryHost::new(),
            SchedulerConfig::default(),
            SteppedClock::frozen(),
        )
    }

    pub(crate) fn with(host: MemoryHost, config: SchedulerConfig, clock: SteppedClock) -> Self {
        let mut rec = Reconciler::new(config);
        let root = rec.mount(host.container());
        Self {
            host,
            rec,
            root,
            clock,
        }
    }

    /// Requests `lane`, runs to idle, and returns the single commit.
    pub(crate) fn render(&mut self, desc: &NodeRef, lane: Lane) -> CommitReport {
        self.rec.request_update(self.root, lane).unwrap();
        let mut reports = commits(self.rec.run_until_idle(
            &mut |_: RootId, _: Lane| desc.clone(),
            &mut self.host,
            &mut self.clock,
        ));
        assert_eq!(reports.len(), 1, "one request, one commit");
        reports.pop().unwrap()
    }

    pub(crate) fn html(&self) -> String {
        self.host.html(self.host.container())
    }

    /// Asserts that the host shows `desc` and the committed tree is sound.
    pub(crate) fn assert_shows(&self, desc: &NodeRef) {
        assert_eq!(self.html(), html::describe(desc), "host matches description");
        let tree = self.rec.current_tree(self.root).unwrap();
        assert_eq!(tree.check_invariants(), Ok(()), "committed tree is consistent");
    }
}

/// Unwraps committed outcomes, panicking on anything else.
pub(crate) fn commits(outcomes: Vec<WorkOutcome>) -> Vec<CommitReport> {
    outcomes
        .into_iter()
        .map(|outcome| match outcome {
            WorkOutcome::Committed(report) => report,
            other => panic!("unexpected outcome: {other:?}"),
        })
        .collect()
}
