// Copyright 2026 the Graft Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cooperative, lane-aware scheduling of rendering passes.
//!
//! Each root owns a [`RootState`] machine:
//!
//! ```text
//!            request_update
//!   Idle ─────────────────────► Rendering(lane) ◄──┐
//!    ▲                            │      │   resume│
//!    │ discard (preempted)        │      └──► Suspended(lane)
//!    ├────────────────────────────┤   yield
//!    │                            │ walk complete
//!    └──────── Committing ◄───────┘
//! ```
//!
//! A pass walks its work-in-progress tree with an explicit stack of
//! [`WorkItem`]s, so pausing is simply not popping and resuming is popping
//! again. Yield checks happen only between work items.
//!
//! # Starvation bound
//!
//! An urgent request discards an in-flight background pass, which is then
//! retried from scratch. After
//! [`max_background_preemptions`](SchedulerConfig::max_background_preemptions)
//! consecutive discards on one root, the next background pass is
//! *protected*: it still yields when its budget runs out, but is not
//! discarded and resumes before any urgent pass starts on that root. The
//! counter resets when a background pass commits.

use alloc::vec::Vec;

use crate::clock::SchedulingClock;
use crate::describe::NodeRef;
use crate::diff::Differ;
use crate::effect::EffectList;
use crate::error::{DescriptionError, InvariantViolation};
use crate::lane::{Lane, LaneSet};
use crate::time::{Duration, HostTime};
use crate::trace::YieldReason;
use crate::unit::{UnitId, UnitTree};

/// Configuration for the scheduler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Time a slice may run before yielding, in clock ticks.
    pub slice_budget: Duration,
    /// Consecutive background preemptions on a root after which the next
    /// background pass is protected.
    pub max_background_preemptions: u32,
}

impl SchedulerConfig {
    /// Short slices for input-driven applications.
    #[must_use]
    pub const fn interactive() -> Self {
        Self {
            // 4ms at 1ns tick resolution.
            slice_budget: Duration::from_millis(4),
            max_background_preemptions: 3,
        }
    }

    /// Long slices and an aggressive starvation bound for bulk updates.
    #[must_use]
    pub const fn batch() -> Self {
        Self {
            slice_budget: Duration::from_millis(16),
            max_background_preemptions: 1,
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::interactive()
    }
}

/// Scheduling state of one root.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RootState {
    /// No pass in flight.
    Idle,
    /// A pass for the lane is running a slice.
    Rendering(Lane),
    /// A pass for the lane yielded and will resume on a later slice.
    Suspended(Lane),
    /// The committer is replaying effects.
    Committing,
}

impl RootState {
    /// Lane of the in-flight pass, if any.
    #[must_use]
    pub const fn lane(self) -> Option<Lane> {
        match self {
            Self::Rendering(lane) | Self::Suspended(lane) => Some(lane),
            Self::Idle | Self::Committing => None,
        }
    }
}

/// One step of the depth-first walk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WorkItem {
    /// Diff the unit and build its children.
    Begin(UnitId),
    /// All children are done; roll the unit's counts into its parent.
    Complete(UnitId),
}

/// The explicit stack driving a pass.
#[derive(Clone, Debug, Default)]
pub struct WorkQueue {
    stack: Vec<WorkItem>,
}

impl WorkQueue {
    /// Pushes an item.
    pub fn push(&mut self, item: WorkItem) {
        self.stack.push(item);
    }

    /// Pops the next item.
    pub fn pop(&mut self) -> Option<WorkItem> {
        self.stack.pop()
    }

    /// Number of pending items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stack.len()
    }

    /// Returns `true` when the walk is done.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Drops every item.
    pub fn clear(&mut self) {
        self.stack.clear();
    }
}

/// How a slice ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SliceEnd {
    /// The walk completed; the pass is ready to commit.
    Complete,
    /// The pass yielded.
    Yield(YieldReason),
}

/// Outcome of one slice.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Slice {
    pub(crate) end: SliceEnd,
    pub(crate) start: HostTime,
    pub(crate) finish: HostTime,
    pub(crate) items: u32,
}

/// An in-flight rendering pass.
#[derive(Debug)]
pub(crate) struct RenderPass {
    pub(crate) lane: Lane,
    pub(crate) pass: u64,
    pub(crate) protected: bool,
    pub(crate) wip: UnitTree,
    pub(crate) queue: WorkQueue,
    pub(crate) effects: EffectList,
    pub(crate) errors: Vec<DescriptionError>,
    // -- Statistics --
    pub(crate) started_at: HostTime,
    pub(crate) slices: u32,
    pub(crate) items: u64,
    pub(crate) render_ticks: u64,
}

impl RenderPass {
    /// Starts a pass over `desc`, reusing `wip` as the arena.
    ///
    /// `wip` must be empty. The new root unit is diffed against `prior`.
    pub(crate) fn new(
        lane: Lane,
        pass: u64,
        protected: bool,
        mut wip: UnitTree,
        desc: NodeRef,
        prior: Option<UnitId>,
        started_at: HostTime,
    ) -> Self {
        let root = wip.alloc(desc, prior);
        wip.set_root(root);
        let mut queue = WorkQueue::default();
        queue.push(WorkItem::Begin(root));
        Self {
            lane,
            pass,
            protected,
            wip,
            queue,
            effects: EffectList::new(),
            errors: Vec::new(),
            started_at,
            slices: 0,
            items: 0,
            render_ticks: 0,
        }
    }

    /// Processes one work item. Returns whether work remains.
    pub(crate) fn step(&mut self, current: &UnitTree) -> Result<bool, InvariantViolation> {
        let Some(item) = self.queue.pop() else {
            return Ok(false);
        };
        match item {
            WorkItem::Begin(unit) => {
                let before = self.effects.len();
                let decision = Differ {
                    current,
                    wip: &mut self.wip,
                    effects: &mut self.effects,
                    errors: &mut self.errors,
                }
                .begin_unit(unit)?;
                let own = u32::try_from(self.effects.len() - before).unwrap_or(u32::MAX);
                self.wip.add_subtree_effects(unit, own);

                self.queue.push(WorkItem::Complete(unit));
                if decision.descends() {
                    let mut child = self.wip.last_child(unit);
                    while let Some(c) = child {
                        self.queue.push(WorkItem::Begin(c));
                        child = self.wip.prev_sibling(c);
                    }
                }
            }
            WorkItem::Complete(unit) => {
                self.wip.check(unit)?;
                if !self.wip.kind(unit).accepts_children() && self.wip.first_child(unit).is_some()
                {
                    return Err(InvariantViolation::TextWithChildren(unit));
                }
                if let Some(parent) = self.wip.parent(unit) {
                    let total = self.wip.subtree_effects(unit);
                    self.wip.add_subtree_effects(parent, total);
                }
            }
        }
        self.items += 1;
        Ok(!self.queue.is_empty())
    }

    /// Runs work items until the walk completes or a yield condition holds.
    ///
    /// `pending` is the set of lanes requested anywhere in the reconciler
    /// that have not started rendering. At least one item is processed.
    pub(crate) fn run_slice<C: SchedulingClock + ?Sized>(
        &mut self,
        current: &UnitTree,
        clock: &mut C,
        budget: Duration,
        pending: LaneSet,
    ) -> Result<Slice, InvariantViolation> {
        let start = clock.now();
        let mut items = 0_u32;
        let end = loop {
            let more = self.step(current)?;
            items = items.saturating_add(1);
            if !more {
                break SliceEnd::Complete;
            }
            if !self.protected
                && (pending.has_higher_than(self.lane) || clock.higher_priority_pending(self.lane))
            {
                break SliceEnd::Yield(YieldReason::HigherPriority);
            }
            if clock.now().saturating_duration_since(start) >= budget {
                break SliceEnd::Yield(YieldReason::Budget);
            }
        };
        let finish = clock.now();
        self.slices += 1;
        self.render_ticks += finish.saturating_duration_since(start).ticks();
        Ok(Slice {
            end,
            start,
            finish,
            items,
        })
    }
}

/// Per-root request bookkeeping.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct RootScheduler {
    /// Lanes requested that have not started rendering.
    pub(crate) pending: LaneSet,
    /// Requests absorbed by an already-pending lane.
    pub(crate) coalesced: u32,
    /// Background passes discarded in a row.
    pub(crate) consecutive_preemptions: u32,
}

impl RootScheduler {
    /// Records a request. Returns `false` if it coalesced into a pending one.
    pub(crate) fn request(&mut self, lane: Lane) -> bool {
        let fresh = self.pending.insert(lane);
        if !fresh {
            self.coalesced = self.coalesced.saturating_add(1);
        }
        fresh
    }

    /// Removes and returns the highest pending lane.
    pub(crate) fn take_next(&mut self) -> Option<Lane> {
        let lane = self.pending.highest()?;
        self.pending.remove(lane);
        Some(lane)
    }

    /// Whether a new pass in `lane` must not be preempted.
    pub(crate) fn protects(&self, lane: Lane, config: &SchedulerConfig) -> bool {
        lane == Lane::Background && self.consecutive_preemptions >= config.max_background_preemptions
    }

    /// Records a discarded pass, re-queueing its lane. Returns the
    /// consecutive background preemption count.
    pub(crate) fn preempted(&mut self, lane: Lane) -> u32 {
        self.pending.insert(lane);
        if lane == Lane::Background {
            self.consecutive_preemptions = self.consecutive_preemptions.saturating_add(1);
        }
        self.consecutive_preemptions
    }

    /// Records a committed pass.
    pub(crate) fn committed(&mut self, lane: Lane) {
        if lane == Lane::Background {
            self.consecutive_preemptions = 0;
        }
    }
}
