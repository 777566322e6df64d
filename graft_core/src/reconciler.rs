// Copyright 2026 the Graft Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The multi-root reconciler.
//!
//! A [`Reconciler`] owns any number of mounted roots. Each root has a
//! committed `current` snapshot, a spare arena that becomes the next
//! work-in-progress tree, pending lane requests, and at most one in-flight
//! pass. The embedder drives everything through [`Reconciler::work`], one
//! cooperative slice per call:
//!
//! ```text
//!   request_update(root, lane)
//!       │
//!       ▼
//!   work() ──► pick root ──► preempt? ──► start or resume pass
//!                                               │
//!                          ┌── Yielded ◄── run slice ──► Aborted
//!                          │                    │
//!                          ▼                    ▼
//!                    next work()      commit ──► observers ──► Committed
//! ```
//!
//! Committing is a single call: the host is never observed between two
//! effects of one pass by anything outside the committer.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;
use core::mem;

use crate::clock::SchedulingClock;
use crate::commit::{self, CommitObserver, CommitReport, Observers};
use crate::describe::TreeSource;
use crate::effect::{EffectOp, EffectRecord, UnitRef};
use crate::error::InvariantViolation;
use crate::host::{HostHandle, HostTree};
use crate::lane::{Lane, LaneSet};
use crate::logging::{debug, error, trace};
use crate::scheduler::{RenderPass, RootScheduler, RootState, SchedulerConfig, SliceEnd};
use crate::time::HostTime;
use crate::trace::{
    AbandonEvent, CommitBeginEvent, CommitEndEvent, CommitSummary, PassBeginEvent, PreemptEvent,
    SliceEvent, Tracer, YieldEvent,
};
use crate::unit::{PendingEffect, UnitTree};

/// Identifies a mounted root.
///
/// Ids are never reused within one reconciler.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RootId(pub u32);

impl fmt::Display for RootId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "root#{}", self.0)
    }
}

/// What one call to [`Reconciler::work`] did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WorkOutcome {
    /// Nothing was pending.
    Idle,
    /// A pass yielded and will resume on a later call.
    Yielded {
        /// Root of the pass.
        root: RootId,
        /// Lane of the pass.
        lane: Lane,
    },
    /// A pass completed and was committed.
    Committed(CommitReport),
    /// A pass hit an internal inconsistency and was abandoned. The root is
    /// idle with its last committed tree intact.
    Aborted {
        /// Root of the pass.
        root: RootId,
        /// What went wrong.
        error: InvariantViolation,
    },
}

#[derive(Debug)]
struct Root {
    container: HostHandle,
    current: UnitTree,
    spare: UnitTree,
    scheduler: RootScheduler,
    pass: Option<RenderPass>,
    state: RootState,
}

impl Root {
    /// Highest lane this root wants to work on.
    fn urgency(&self) -> Option<Lane> {
        let running = self.pass.as_ref().map(|p| p.lane);
        self.scheduler.pending.highest().max(running)
    }

    /// Returns the pass's arena to the spare slot, emptied.
    fn recycle(&mut self, mut wip: UnitTree, serial: u32) {
        wip.reset(serial);
        self.spare = wip;
    }
}

/// Drives reconciliation for a set of roots.
pub struct Reconciler {
    config: SchedulerConfig,
    roots: Vec<Option<Root>>,
    observers: Observers,
    next_serial: u32,
    next_pass: u64,
}

impl fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reconciler")
            .field("config", &self.config)
            .field("roots", &self.roots)
            .field("observers", &self.observers.len())
            .field("next_serial", &self.next_serial)
            .field("next_pass", &self.next_pass)
            .finish()
    }
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}

fn bump(counter: &mut u32) -> u32 {
    let serial = *counter;
    *counter = counter.wrapping_add(1).max(1);
    serial
}

impl Reconciler {
    /// Creates a reconciler with no roots.
    #[must_use]
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            roots: Vec::new(),
            observers: Vec::new(),
            next_serial: 1,
            next_pass: 0,
        }
    }

    /// Scheduler configuration.
    #[must_use]
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Registers an observer notified after every commit.
    pub fn add_observer(&mut self, observer: impl CommitObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Mounts a new, empty root rendering into `container`.
    ///
    /// Nothing is rendered until an update is requested.
    pub fn mount(&mut self, container: HostHandle) -> RootId {
        let id = RootId(u32::try_from(self.roots.len()).unwrap_or(u32::MAX));
        let current = UnitTree::new(bump(&mut self.next_serial));
        let spare = UnitTree::new(bump(&mut self.next_serial));
        self.roots.push(Some(Root {
            container,
            current,
            spare,
            scheduler: RootScheduler::default(),
            pass: None,
            state: RootState::Idle,
        }));
        debug!(root = id.0, container = container.0, "root mounted");
        id
    }

    /// Removes a root's host nodes in one commit and forgets the root.
    ///
    /// Any in-flight pass is discarded. Observers see the removal as an
    /// urgent commit.
    pub fn unmount<H: HostTree + ?Sized>(
        &mut self,
        root: RootId,
        host: &mut H,
    ) -> Result<CommitReport, InvariantViolation> {
        let mut entry = self
            .roots
            .get_mut(root.0 as usize)
            .and_then(Option::take)
            .ok_or(InvariantViolation::UnknownRoot(root))?;

        let mut records = Vec::new();
        if let Some(top) = entry.current.root() {
            let mut tops = Vec::new();
            entry.current.top_host_units(top, &mut tops);
            records.extend(tops.into_iter().filter_map(|unit| {
                entry.current.host(unit).map(|handle| EffectRecord {
                    target: UnitRef::Current(unit),
                    handle: Some(handle),
                    op: EffectOp::Remove,
                    cause: PendingEffect::Delete,
                })
            }));
        }

        let mut wip = match entry.pass.take() {
            Some(pass) => pass.wip,
            None => mem::replace(&mut entry.spare, UnitTree::new(0)),
        };
        wip.reset(bump(&mut self.next_serial));
        let replay = commit::replay(host, entry.container, &entry.current, &mut wip, records)?;

        let pass = self.next_pass;
        self.next_pass += 1;
        let report = CommitReport {
            root,
            lane: Lane::Urgent,
            pass,
            applied: replay.applied,
            failed: replay.failed,
            skipped: replay.skipped,
            description_errors: Vec::new(),
        };
        debug!(root = root.0, removed = report.applied.len(), "root unmounted");
        for observer in &mut self.observers {
            observer.on_commit(&report);
        }
        Ok(report)
    }

    /// Requests a re-render of `root` in `lane`.
    ///
    /// Returns `Ok(false)` when the request coalesced into one already
    /// pending for that lane.
    pub fn request_update(&mut self, root: RootId, lane: Lane) -> Result<bool, InvariantViolation> {
        let entry = self.root_mut(root)?;
        let fresh = entry.scheduler.request(lane);
        trace!(root = root.0, %lane, fresh, "update requested");
        Ok(fresh)
    }

    /// Scheduling state of a root, or `None` if it is not mounted.
    #[must_use]
    pub fn state(&self, root: RootId) -> Option<RootState> {
        self.root(root).map(|r| r.state)
    }

    /// Committed snapshot of a root.
    #[must_use]
    pub fn current_tree(&self, root: RootId) -> Option<&UnitTree> {
        self.root(root).map(|r| &r.current)
    }

    /// Host container a root renders into.
    #[must_use]
    pub fn container(&self, root: RootId) -> Option<HostHandle> {
        self.root(root).map(|r| r.container)
    }

    /// Lanes requested on a root that have not started rendering.
    #[must_use]
    pub fn pending(&self, root: RootId) -> Option<LaneSet> {
        self.root(root).map(|r| r.scheduler.pending)
    }

    /// Requests on a root absorbed by an already-pending lane.
    #[must_use]
    pub fn coalesced(&self, root: RootId) -> Option<u32> {
        self.root(root).map(|r| r.scheduler.coalesced)
    }

    /// Iterates mounted roots.
    pub fn roots(&self) -> impl Iterator<Item = RootId> + '_ {
        self.roots
            .iter()
            .enumerate()
            .filter(|(_, r)| r.is_some())
            .filter_map(|(i, _)| u32::try_from(i).ok().map(RootId))
    }

    /// Returns `true` when no root has pending or in-flight work.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.roots.iter().flatten().all(|r| r.urgency().is_none())
    }

    /// Runs one cooperative slice of work.
    pub fn work<S, H, C>(&mut self, source: &mut S, host: &mut H, clock: &mut C) -> WorkOutcome
    where
        S: TreeSource + ?Sized,
        H: HostTree + ?Sized,
        C: SchedulingClock + ?Sized,
    {
        self.work_traced(source, host, clock, &mut Tracer::none())
    }

    /// Runs one cooperative slice of work, reporting to `tracer`.
    ///
    /// Picks the root with the highest outstanding lane (lowest id on ties).
    /// If that root's pass is outranked by a pending request and not
    /// protected, the pass is discarded and a fresh one starts.
    pub fn work_traced<S, H, C>(
        &mut self,
        source: &mut S,
        host: &mut H,
        clock: &mut C,
        tracer: &mut Tracer<'_>,
    ) -> WorkOutcome
    where
        S: TreeSource + ?Sized,
        H: HostTree + ?Sized,
        C: SchedulingClock + ?Sized,
    {
        let Some(index) = self.pick_root() else {
            return WorkOutcome::Idle;
        };
        let id = RootId(u32::try_from(index).unwrap_or(u32::MAX));
        let pending = self
            .roots
            .iter()
            .flatten()
            .fold(LaneSet::EMPTY, |acc, r| acc.union(r.scheduler.pending));
        let config = self.config;
        let Some(root) = self.roots.get_mut(index).and_then(Option::as_mut) else {
            return WorkOutcome::Idle;
        };

        if let Some(pass) = root.pass.take_if(|p| {
            !p.protected && root.scheduler.pending.has_higher_than(p.lane)
        }) {
            let by = root.scheduler.pending.highest().unwrap_or(pass.lane);
            let discarded = u32::try_from(pass.effects.len()).unwrap_or(u32::MAX);
            let consecutive = root.scheduler.preempted(pass.lane);
            let timestamp = clock.now();
            debug!(root = id.0, lane = %pass.lane, %by, pass = pass.pass, discarded, "pass preempted");
            tracer.preempt(&PreemptEvent {
                root: id,
                lane: pass.lane,
                by,
                pass: pass.pass,
                timestamp,
                discarded_effects: discarded,
                consecutive,
            });
            root.recycle(pass.wip, bump(&mut self.next_serial));
        }

        if root.pass.is_none() {
            let Some(lane) = root.scheduler.take_next() else {
                return WorkOutcome::Idle;
            };
            let protected = root.scheduler.protects(lane, &config);
            let wip = mem::replace(&mut root.spare, UnitTree::new(0));
            let desc = source.describe(id, lane);
            let started_at = clock.now();
            let pass = self.next_pass;
            self.next_pass += 1;
            debug!(root = id.0, %lane, pass, protected, "pass started");
            tracer.pass_begin(&PassBeginEvent {
                root: id,
                lane,
                pass,
                timestamp: started_at,
                protected,
            });
            let prior = root.current.root();
            root.pass = Some(RenderPass::new(lane, pass, protected, wip, desc, prior, started_at));
        }

        let Some(pass) = root.pass.as_mut() else {
            return WorkOutcome::Idle;
        };
        let lane = pass.lane;
        root.state = RootState::Rendering(lane);
        let slice = match pass.run_slice(&root.current, clock, config.slice_budget, pending) {
            Ok(slice) => slice,
            Err(violation) => {
                let timestamp = clock.now();
                let number = pass.pass;
                if let Some(pass) = root.pass.take() {
                    root.recycle(pass.wip, bump(&mut self.next_serial));
                }
                return self.abandon(index, id, lane, number, timestamp, violation, tracer);
            }
        };
        tracer.slice(&SliceEvent {
            root: id,
            lane,
            pass: pass.pass,
            start: slice.start,
            end: slice.finish,
            items: slice.items,
        });

        match slice.end {
            SliceEnd::Yield(reason) => {
                let remaining = u32::try_from(pass.queue.len()).unwrap_or(u32::MAX);
                trace!(root = id.0, %lane, pass = pass.pass, reason = reason.as_str(), remaining, "pass yielded");
                tracer.yielded(&YieldEvent {
                    root: id,
                    lane,
                    pass: pass.pass,
                    timestamp: slice.finish,
                    reason,
                    remaining,
                });
                root.state = RootState::Suspended(lane);
                WorkOutcome::Yielded { root: id, lane }
            }
            SliceEnd::Complete => match root.pass.take() {
                Some(pass) => self.commit(index, id, pass, host, clock, tracer),
                None => WorkOutcome::Idle,
            },
        }
    }

    /// Calls [`work`](Self::work) until nothing is pending, collecting every
    /// outcome other than [`WorkOutcome::Yielded`].
    pub fn run_until_idle<S, H, C>(
        &mut self,
        source: &mut S,
        host: &mut H,
        clock: &mut C,
    ) -> Vec<WorkOutcome>
    where
        S: TreeSource + ?Sized,
        H: HostTree + ?Sized,
        C: SchedulingClock + ?Sized,
    {
        self.run_until_idle_traced(source, host, clock, &mut Tracer::none())
    }

    /// [`run_until_idle`](Self::run_until_idle), reporting to `tracer`.
    pub fn run_until_idle_traced<S, H, C>(
        &mut self,
        source: &mut S,
        host: &mut H,
        clock: &mut C,
        tracer: &mut Tracer<'_>,
    ) -> Vec<WorkOutcome>
    where
        S: TreeSource + ?Sized,
        H: HostTree + ?Sized,
        C: SchedulingClock + ?Sized,
    {
        let mut outcomes = Vec::new();
        loop {
            match self.work_traced(source, host, clock, tracer) {
                WorkOutcome::Idle => return outcomes,
                WorkOutcome::Yielded { .. } => {}
                outcome => outcomes.push(outcome),
            }
        }
    }

    fn root(&self, id: RootId) -> Option<&Root> {
        self.roots.get(id.0 as usize).and_then(Option::as_ref)
    }

    fn root_mut(&mut self, id: RootId) -> Result<&mut Root, InvariantViolation> {
        self.roots
            .get_mut(id.0 as usize)
            .and_then(Option::as_mut)
            .ok_or(InvariantViolation::UnknownRoot(id))
    }

    fn pick_root(&self) -> Option<usize> {
        let mut best: Option<(usize, Lane)> = None;
        for (index, root) in self.roots.iter().enumerate() {
            let Some(lane) = root.as_ref().and_then(Root::urgency) else {
                continue;
            };
            if best.is_none_or(|(_, b)| lane > b) {
                best = Some((index, lane));
            }
        }
        best.map(|(index, _)| index)
    }

    fn abandon(
        &mut self,
        index: usize,
        id: RootId,
        lane: Lane,
        pass: u64,
        timestamp: HostTime,
        violation: InvariantViolation,
        tracer: &mut Tracer<'_>,
    ) -> WorkOutcome {
        if let Some(root) = self.roots.get_mut(index).and_then(Option::as_mut) {
            root.state = RootState::Idle;
        }
        error!(root = id.0, %lane, pass, error = %violation, "pass abandoned");
        tracer.abandon(&AbandonEvent {
            root: id,
            lane,
            pass,
            timestamp,
        });
        WorkOutcome::Aborted {
            root: id,
            error: violation,
        }
    }

    fn commit<H, C>(
        &mut self,
        index: usize,
        id: RootId,
        mut pass: RenderPass,
        host: &mut H,
        clock: &mut C,
        tracer: &mut Tracer<'_>,
    ) -> WorkOutcome
    where
        H: HostTree + ?Sized,
        C: SchedulingClock + ?Sized,
    {
        let Some(root) = self.roots.get_mut(index).and_then(Option::as_mut) else {
            return WorkOutcome::Idle;
        };
        root.state = RootState::Committing;
        let commit_start = clock.now();
        let records = pass.effects.take();
        let effects = u32::try_from(records.len()).unwrap_or(u32::MAX);
        tracer.commit_begin(&CommitBeginEvent {
            root: id,
            lane: pass.lane,
            pass: pass.pass,
            timestamp: commit_start,
            effects,
        });

        let mut wip = mem::replace(&mut pass.wip, UnitTree::new(0));
        let replayed = wip
            .check_invariants()
            .and_then(|()| commit::replay(host, root.container, &root.current, &mut wip, records));
        let replay = match replayed {
            Ok(replay) => replay,
            Err(violation) => {
                root.recycle(wip, bump(&mut self.next_serial));
                let timestamp = clock.now();
                return self.abandon(index, id, pass.lane, pass.pass, timestamp, violation, tracer);
            }
        };

        wip.clear_priors();
        let old = mem::replace(&mut root.current, wip);
        root.recycle(old, bump(&mut self.next_serial));
        root.scheduler.committed(pass.lane);
        root.state = RootState::Idle;

        let committed_at = clock.now();
        let report = CommitReport {
            root: id,
            lane: pass.lane,
            pass: pass.pass,
            applied: replay.applied,
            failed: replay.failed,
            skipped: replay.skipped,
            description_errors: mem::take(&mut pass.errors),
        };
        let applied = u32::try_from(report.applied.len()).unwrap_or(u32::MAX);
        let failed = u32::try_from(report.failed.len()).unwrap_or(u32::MAX);
        let skipped = u32::try_from(report.skipped.len()).unwrap_or(u32::MAX);
        debug!(root = id.0, lane = %pass.lane, pass = pass.pass, applied, failed, skipped, "pass committed");
        tracer.commit_end(&CommitEndEvent {
            root: id,
            lane: pass.lane,
            pass: pass.pass,
            timestamp: committed_at,
            applied,
            failed,
            skipped,
        });
        tracer.commit_summary(&CommitSummary {
            root: id,
            lane: pass.lane,
            pass: pass.pass,
            started_at: pass.started_at,
            committed_at,
            slices: pass.slices,
            items: pass.items,
            render_ticks: pass.render_ticks,
            commit_ticks: committed_at.saturating_duration_since(commit_start).ticks(),
            effects,
            failed,
            description_errors: u32::try_from(report.description_errors.len()).unwrap_or(u32::MAX),
        });

        for observer in &mut self.observers {
            observer.on_commit(&report);
        }
        WorkOutcome::Committed(report)
    }
}

#[cfg(test)]
mod tests {
    use alloc::rc::Rc;
    use alloc::string::String;
    use alloc::vec;
    use core::cell::{Cell, RefCell};

    use super::*;
    use crate::clock::SteppedClock;
    use crate::describe::{Node, NodeRef};
    use crate::host::{HostError, HostNodeKind};
    use crate::time::Duration;
    use crate::unit::{AttrDelta, Attributes};

    /// Minimal host keeping a child list per node.
    struct MiniHost {
        tags: Vec<Option<String>>,
        text: Vec<String>,
        children: Vec<Vec<u64>>,
    }

    impl MiniHost {
        fn new() -> Self {
            Self {
                tags: vec![Some(String::from("root"))],
                text: vec![String::new()],
                children: vec![Vec::new()],
            }
        }

        fn html(&self) -> String {
            let mut out = String::new();
            for &c in &self.children[0] {
                self.write(c, &mut out);
            }
            out
        }

        fn write(&self, handle: u64, out: &mut String) {
            let i = handle as usize;
            match &self.tags[i] {
                None => out.push_str(&self.text[i]),
                Some(tag) => {
                    out.push_str(&alloc::format!("<{tag}>"));
                    for &c in &self.children[i] {
                        self.write(c, out);
                    }
                    out.push_str(&alloc::format!("</{tag}>"));
                }
            }
        }

        fn detach(&mut self, child: u64) {
            for list in &mut self.children {
                list.retain(|&c| c != child);
            }
        }
    }

    impl HostTree for MiniHost {
        fn create_node(
            &mut self,
            kind: HostNodeKind<'_>,
            _attributes: &Attributes,
        ) -> Result<HostHandle, HostError> {
            self.tags.push(match kind {
                HostNodeKind::Element(tag) => Some(String::from(tag)),
                HostNodeKind::Text => None,
            });
            self.text.push(String::new());
            self.children.push(Vec::new());
            Ok(HostHandle(self.tags.len() as u64 - 1))
        }

        fn insert_before(
            &mut self,
            parent: HostHandle,
            child: HostHandle,
            reference: Option<HostHandle>,
        ) -> Result<(), HostError> {
            self.detach(child.0);
            let list = &mut self.children[parent.0 as usize];
            let at = reference
                .and_then(|r| list.iter().position(|&c| c == r.0))
                .unwrap_or(list.len());
            list.insert(at, child.0);
            Ok(())
        }

        fn remove_child(&mut self, parent: HostHandle, child: HostHandle) -> Result<(), HostError> {
            let list = &mut self.children[parent.0 as usize];
            let at = list
                .iter()
                .position(|&c| c == child.0)
                .ok_or(HostError::UnknownHandle(child))?;
            list.remove(at);
            Ok(())
        }

        fn update_attributes(&mut self, _: HostHandle, _: &AttrDelta) -> Result<(), HostError> {
            Ok(())
        }

        fn set_text(&mut self, handle: HostHandle, value: &str) -> Result<(), HostError> {
            self.text[handle.0 as usize] = String::from(value);
            Ok(())
        }
    }

    /// Host that hands out the same handle for every node.
    struct StuckHost;

    impl HostTree for StuckHost {
        fn create_node(&mut self, _: HostNodeKind<'_>, _: &Attributes) -> Result<HostHandle, HostError> {
            Ok(HostHandle(7))
        }
        fn insert_before(&mut self, _: HostHandle, _: HostHandle, _: Option<HostHandle>) -> Result<(), HostError> {
            Ok(())
        }
        fn remove_child(&mut self, _: HostHandle, _: HostHandle) -> Result<(), HostError> {
            Ok(())
        }
        fn update_attributes(&mut self, _: HostHandle, _: &AttrDelta) -> Result<(), HostError> {
            Ok(())
        }
        fn set_text(&mut self, _: HostHandle, _: &str) -> Result<(), HostError> {
            Ok(())
        }
    }

    fn page(title: &str, body: &str) -> NodeRef {
        Node::element("div")
            .child(Node::element("h1").child(Node::text(title)))
            .child(Node::element("p").child(Node::text(body)))
            .build()
    }

    fn list(keys: &[u64]) -> NodeRef {
        Node::element("ul")
            .children(keys.iter().map(|&k| {
                Node::element("li")
                    .key(k)
                    .child(Node::text(alloc::format!("{k}")))
            }))
            .build()
    }

    fn committed(outcomes: &[WorkOutcome]) -> Vec<&CommitReport> {
        outcomes
            .iter()
            .filter_map(|o| match o {
                WorkOutcome::Committed(r) => Some(r),
                _ => None,
            })
            .collect()
    }

    /// Mounts one root, renders `first`, and returns everything needed to
    /// render again.
    fn mounted(first: NodeRef) -> (Reconciler, RootId, MiniHost, Rc<RefCell<NodeRef>>) {
        let mut rec = Reconciler::default();
        let mut host = MiniHost::new();
        let root = rec.mount(HostHandle(0));
        let tree = Rc::new(RefCell::new(first));
        let t = tree.clone();
        rec.request_update(root, Lane::Urgent).unwrap();
        let outcomes = rec.run_until_idle(
            &mut |_: RootId, _: Lane| t.borrow().clone(),
            &mut host,
            &mut SteppedClock::frozen(),
        );
        assert_eq!(committed(&outcomes).len(), 1, "initial render commits once");
        (rec, root, host, tree)
    }

    fn rerender(
        rec: &mut Reconciler,
        root: RootId,
        host: &mut MiniHost,
        tree: &Rc<RefCell<NodeRef>>,
        next: NodeRef,
    ) -> CommitReport {
        *tree.borrow_mut() = next;
        rec.request_update(root, Lane::Urgent).unwrap();
        let t = tree.clone();
        let mut outcomes = rec.run_until_idle(
            &mut |_: RootId, _: Lane| t.borrow().clone(),
            host,
            &mut SteppedClock::frozen(),
        );
        assert_eq!(outcomes.len(), 1, "one pass per request");
        match outcomes.pop() {
            Some(WorkOutcome::Committed(report)) => report,
            other => panic!("expected a commit, got {other:?}"),
        }
    }

    #[test]
    fn initial_render_builds_host_tree() {
        let (rec, root, host, _) = mounted(page("Hello", "Welcome"));
        assert_eq!(host.html(), "<div><h1>Hello</h1><p>Welcome</p></div>");
        assert_eq!(rec.state(root), Some(RootState::Idle));
        assert_eq!(rec.current_tree(root).map(UnitTree::len), Some(5));
    }

    #[test]
    fn text_changes_update_in_place() {
        let (mut rec, root, mut host, tree) = mounted(page("Hello", "Welcome"));
        let root_handle = |rec: &Reconciler| {
            let tree = rec.current_tree(root)?;
            tree.host(tree.root()?)
        };
        let before = root_handle(&rec);
        assert!(before.is_some(), "root element has a host node");

        let report = rerender(&mut rec, root, &mut host, &tree, page("Hello World!", "Updated paragraph"));
        let counts = report.counts();
        assert_eq!(counts.text_updates, 2);
        assert_eq!(counts.total(), 2, "no structural effects");
        assert!(report.is_clean());
        assert_eq!(
            host.html(),
            "<div><h1>Hello World!</h1><p>Updated paragraph</p></div>"
        );
        assert_eq!(root_handle(&rec), before, "host handle reused");
    }

    #[test]
    fn rotation_moves_one_child() {
        let (mut rec, root, mut host, tree) = mounted(list(&[1, 2, 3]));
        let report = rerender(&mut rec, root, &mut host, &tree, list(&[3, 1, 2]));
        let counts = report.counts();
        assert_eq!(counts.moves, 1);
        assert_eq!(counts.inserts + counts.removes, 0, "only moves");
        assert_eq!(host.html(), "<ul><li>3</li><li>1</li><li>2</li></ul>");
    }

    #[test]
    fn root_kind_change_replaces_subtree() {
        let header = || Node::composite("Header").child(Node::element("h1").child(Node::text("Hi")));
        let (mut rec, root, mut host, tree) =
            mounted(Node::element("div").child(header()).build());
        let report = rerender(
            &mut rec,
            root,
            &mut host,
            &tree,
            Node::element("section").child(header()).build(),
        );
        let counts = report.counts();
        assert_eq!(counts.removes, 1, "old div removed once");
        assert_eq!(counts.inserts, 3, "section, h1 and text inserted");
        assert_eq!(host.html(), "<section><h1>Hi</h1></section>");
    }

    #[test]
    fn self_reconciliation_is_empty() {
        let (mut rec, root, mut host, tree) = mounted(page("a", "b"));
        let report = rerender(&mut rec, root, &mut host, &tree, page("a", "b"));
        assert!(report.applied.is_empty());
    }

    #[test]
    fn background_requests_coalesce() {
        let mut rec = Reconciler::default();
        let root = rec.mount(HostHandle(0));
        assert!(rec.request_update(root, Lane::Background).unwrap());
        assert!(!rec.request_update(root, Lane::Background).unwrap());
        assert!(!rec.request_update(root, Lane::Background).unwrap());
        assert_eq!(rec.coalesced(root), Some(2));

        let calls = Cell::new(0);
        let outcomes = rec.run_until_idle(
            &mut |_: RootId, _: Lane| {
                calls.set(calls.get() + 1);
                page("a", "b")
            },
            &mut MiniHost::new(),
            &mut SteppedClock::frozen(),
        );
        assert_eq!(committed(&outcomes).len(), 1);
        assert_eq!(calls.get(), 1, "one traversal for three requests");
        assert!(rec.is_idle());
    }

    #[test]
    fn urgent_preempts_background_without_leaking_effects() {
        let config = SchedulerConfig {
            slice_budget: Duration(2),
            max_background_preemptions: 3,
        };
        let mut rec = Reconciler::new(config);
        let mut host = MiniHost::new();
        let mut clock = SteppedClock::new(Duration(1));
        let root = rec.mount(HostHandle(0));
        let mut source = |_: RootId, lane: Lane| match lane {
            Lane::Urgent => page("urgent", "u"),
            Lane::Background => list(&[1, 2, 3, 4, 5]),
        };

        rec.request_update(root, Lane::Background).unwrap();
        assert_eq!(
            rec.work(&mut source, &mut host, &mut clock),
            WorkOutcome::Yielded {
                root,
                lane: Lane::Background
            }
        );
        assert_eq!(rec.state(root), Some(RootState::Suspended(Lane::Background)));

        rec.request_update(root, Lane::Urgent).unwrap();
        let first = loop {
            if let WorkOutcome::Committed(report) = rec.work(&mut source, &mut host, &mut clock) {
                break report;
            }
        };
        assert_eq!(first.lane, Lane::Urgent);
        assert_eq!(host.html(), "<div><h1>urgent</h1><p>u</p></div>");
        assert_eq!(rec.pending(root), Some(LaneSet::single(Lane::Background)));

        let rest = rec.run_until_idle(&mut source, &mut host, &mut clock);
        let reports = committed(&rest);
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].lane, Lane::Background);
        assert_eq!(
            host.html(),
            "<ul><li>1</li><li>2</li><li>3</li><li>4</li><li>5</li></ul>"
        );
    }

    #[test]
    fn protected_background_pass_is_not_discarded() {
        let config = SchedulerConfig {
            slice_budget: Duration(2),
            max_background_preemptions: 1,
        };
        let mut rec = Reconciler::new(config);
        let mut host = MiniHost::new();
        let mut clock = SteppedClock::new(Duration(1));
        let root = rec.mount(HostHandle(0));
        let mut source = |_: RootId, lane: Lane| match lane {
            Lane::Urgent => page("urgent", "u"),
            Lane::Background => list(&[1, 2, 3]),
        };

        // First background pass is discarded by an urgent request.
        rec.request_update(root, Lane::Background).unwrap();
        rec.work(&mut source, &mut host, &mut clock);
        rec.request_update(root, Lane::Urgent).unwrap();
        let urgent = loop {
            if let WorkOutcome::Committed(report) = rec.work(&mut source, &mut host, &mut clock) {
                break report;
            }
        };
        assert_eq!(urgent.lane, Lane::Urgent);

        // The retry is protected and survives another urgent request.
        assert!(matches!(
            rec.work(&mut source, &mut host, &mut clock),
            WorkOutcome::Yielded {
                lane: Lane::Background,
                ..
            }
        ));
        rec.request_update(root, Lane::Urgent).unwrap();
        let next = loop {
            if let WorkOutcome::Committed(report) = rec.work(&mut source, &mut host, &mut clock) {
                break report;
            }
        };
        assert_eq!(next.lane, Lane::Background, "protected pass commits first");
        assert_eq!(rec.pending(root), Some(LaneSet::single(Lane::Urgent)));
    }

    #[test]
    fn urgent_root_runs_first() {
        let mut rec = Reconciler::default();
        let mut host = MiniHost::new();
        let a = rec.mount(HostHandle(0));
        let b = rec.mount(HostHandle(0));
        rec.request_update(a, Lane::Background).unwrap();
        rec.request_update(b, Lane::Urgent).unwrap();
        let outcomes = rec.run_until_idle(
            &mut |root: RootId, _: Lane| Node::element("x").key(u64::from(root.0)).build(),
            &mut host,
            &mut SteppedClock::frozen(),
        );
        let roots: Vec<RootId> = committed(&outcomes).iter().map(|r| r.root).collect();
        assert_eq!(roots, [b, a]);
    }

    #[test]
    fn observers_see_every_commit() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let (mut rec, root, mut host, tree) = mounted(page("a", "b"));
        rec.add_observer(move |report: &CommitReport| sink.borrow_mut().push(report.counts().total()));
        rerender(&mut rec, root, &mut host, &tree, page("a", "c"));
        rerender(&mut rec, root, &mut host, &tree, page("a", "c"));
        assert_eq!(*seen.borrow(), [1, 0]);
    }

    #[test]
    fn duplicate_host_handles_abort_the_pass() {
        let mut rec = Reconciler::default();
        let root = rec.mount(HostHandle(0));
        let mut clock = SteppedClock::frozen();
        let mut source = |_: RootId, _: Lane| {
            Node::element("a")
                .child(Node::element("b"))
                .child(Node::element("c"))
                .build()
        };
        rec.request_update(root, Lane::Urgent).unwrap();
        let first = rec.run_until_idle(&mut source, &mut StuckHost, &mut clock);
        assert_eq!(committed(&first).len(), 1);

        rec.request_update(root, Lane::Urgent).unwrap();
        let second = rec.run_until_idle(&mut source, &mut StuckHost, &mut clock);
        assert_eq!(
            second,
            [WorkOutcome::Aborted {
                root,
                error: InvariantViolation::SharedHostHandle(HostHandle(7)),
            }]
        );
        assert_eq!(rec.state(root), Some(RootState::Idle));
        assert_eq!(rec.current_tree(root).map(UnitTree::len), Some(3));
        assert!(rec.is_idle(), "aborted passes are not retried");
    }

    #[test]
    fn unmount_removes_host_nodes() {
        let (mut rec, root, mut host, _) = mounted(
            Node::fragment()
                .child(Node::element("a"))
                .child(Node::element("b"))
                .build(),
        );
        assert_eq!(host.html(), "<a></a><b></b>");
        let report = rec.unmount(root, &mut host).unwrap();
        assert_eq!(report.counts().removes, 2);
        assert_eq!(host.html(), "");
        assert_eq!(rec.state(root), None);
        assert_eq!(
            rec.request_update(root, Lane::Urgent),
            Err(InvariantViolation::UnknownRoot(root))
        );
    }
}
