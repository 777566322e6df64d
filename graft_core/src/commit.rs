// Copyright 2026 the Graft Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Replaying a pass's effect records against the host tree.
//!
//! The committer is the only code that calls [`HostTree`]. It runs inside a
//! single, non-interruptible call once a pass has walked its whole tree.
//!
//! # Positioning
//!
//! Inserts and moves are positioned relative to the *reference sibling*: the
//! first host node after the unit, in document order under the same host
//! parent, that is already in its final place. The search descends into
//! composite, fragment and placeholder siblings and climbs through
//! host-less ancestors. Units whose own insert or move has not been applied
//! yet are skipped. When nothing qualifies the node is appended.
//!
//! # Failure containment
//!
//! When the host rejects a call, the record's target unit is marked failed
//! and later records for that unit or its descendants are skipped. Already
//! applied mutations stay applied. A unit whose insert failed is committed
//! without a host handle, so the next pass replaces it.

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec::Vec;

use hashbrown::HashSet;

use crate::describe::Node;
use crate::effect::{EffectCounts, EffectOp, EffectRecord, UnitRef};
use crate::error::{DescriptionError, EngineError, InvariantViolation};
use crate::host::{HostError, HostHandle, HostTree};
use crate::lane::Lane;
use crate::logging::error;
use crate::reconciler::RootId;
use crate::unit::{UnitId, UnitKind, UnitTree};

/// A record the host rejected.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FailedEffect {
    /// The rejected record.
    pub record: EffectRecord,
    /// What the host reported.
    pub error: HostError,
}

/// Everything a commit did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitReport {
    /// Root that was committed.
    pub root: RootId,
    /// Lane of the pass.
    pub lane: Lane,
    /// Pass counter.
    pub pass: u64,
    /// Records applied, in replay order.
    pub applied: Vec<EffectRecord>,
    /// Records the host rejected.
    pub failed: Vec<FailedEffect>,
    /// Records skipped because their unit or an ancestor failed.
    pub skipped: Vec<EffectRecord>,
    /// Problems found in the description while diffing.
    pub description_errors: Vec<DescriptionError>,
}

impl CommitReport {
    /// Returns `true` if every record was applied and the description was
    /// well formed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty() && self.description_errors.is_empty()
    }

    /// Counts applied records by operation.
    #[must_use]
    pub fn counts(&self) -> EffectCounts {
        EffectCounts::of(&self.applied)
    }

    /// Iterates the contained errors: description errors first, then host
    /// failures.
    pub fn errors(&self) -> impl Iterator<Item = EngineError> + '_ {
        self.description_errors
            .iter()
            .cloned()
            .map(EngineError::from)
            .chain(self.failed.iter().map(|f| EngineError::from(f.error.clone())))
    }
}

/// Receives a [`CommitReport`] after every commit.
pub trait CommitObserver {
    /// Called once the host tree and the current snapshot agree.
    fn on_commit(&mut self, report: &CommitReport);
}

impl<F: FnMut(&CommitReport)> CommitObserver for F {
    fn on_commit(&mut self, report: &CommitReport) {
        self(report);
    }
}

impl core::fmt::Debug for dyn CommitObserver {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("CommitObserver")
    }
}

/// Registered observers.
pub(crate) type Observers = Vec<Box<dyn CommitObserver>>;

/// Result of replaying one effect list.
#[derive(Debug, Default)]
pub(crate) struct Replay {
    pub(crate) applied: Vec<EffectRecord>,
    pub(crate) failed: Vec<FailedEffect>,
    pub(crate) skipped: Vec<EffectRecord>,
}

/// Replays `records` against `host`.
///
/// `current` is the committed snapshot (target of removals) and `wip` the
/// snapshot being promoted (target of everything else). Host handles of
/// inserted units are written into `wip`.
pub(crate) fn replay<H: HostTree + ?Sized>(
    host: &mut H,
    container: HostHandle,
    current: &UnitTree,
    wip: &mut UnitTree,
    records: Vec<EffectRecord>,
) -> Result<Replay, InvariantViolation> {
    let unplaced = records
        .iter()
        .filter(|r| matches!(r.op, EffectOp::Insert | EffectOp::Move))
        .filter_map(|r| match r.target {
            UnitRef::WorkInProgress(id) => Some(id.index()),
            UnitRef::Current(_) => None,
        })
        .collect();
    let mut committer = Committer {
        host,
        container,
        current,
        wip,
        unplaced,
        failed_wip: Vec::new(),
        failed_current: Vec::new(),
    };

    let mut out = Replay::default();
    for mut record in records {
        if committer.contained(record.target) {
            out.skipped.push(record);
            continue;
        }
        match committer.apply(&mut record) {
            Ok(()) => out.applied.push(record),
            Err(Fault::Host(err)) => {
                error!(unit = ?record.target, op = record.op.name(), error = %err, "host rejected effect");
                committer.mark_failed(record.target);
                out.failed.push(FailedEffect { record, error: err });
            }
            Err(Fault::Invariant(violation)) => return Err(violation),
        }
    }
    Ok(out)
}

/// Why applying one record failed.
enum Fault {
    Host(HostError),
    Invariant(InvariantViolation),
}

impl From<HostError> for Fault {
    fn from(err: HostError) -> Self {
        Self::Host(err)
    }
}

impl From<InvariantViolation> for Fault {
    fn from(violation: InvariantViolation) -> Self {
        Self::Invariant(violation)
    }
}

struct Committer<'a, H: HostTree + ?Sized> {
    host: &'a mut H,
    container: HostHandle,
    current: &'a UnitTree,
    wip: &'a mut UnitTree,
    /// Slots of wip units with an insert or move not yet applied.
    unplaced: HashSet<u32>,
    failed_wip: Vec<UnitId>,
    failed_current: Vec<UnitId>,
}

impl<H: HostTree + ?Sized> Committer<'_, H> {
    fn contained(&self, target: UnitRef) -> bool {
        match target {
            UnitRef::WorkInProgress(id) => self
                .failed_wip
                .iter()
                .any(|&f| self.wip.is_ancestor_or_self(f, id)),
            UnitRef::Current(id) => self
                .failed_current
                .iter()
                .any(|&f| self.current.is_ancestor_or_self(f, id)),
        }
    }

    fn mark_failed(&mut self, target: UnitRef) {
        match target {
            UnitRef::WorkInProgress(id) => {
                self.failed_wip.push(id);
                // Fresh descriptions on the path keep the next pass from
                // bailing out above the failed subtree.
                let mut node = Some(id);
                while let Some(unit) = node {
                    let fresh = Rc::new(Node::clone(self.wip.description(unit)));
                    self.wip.set_description(unit, fresh);
                    node = self.wip.parent(unit);
                }
            }
            UnitRef::Current(id) => self.failed_current.push(id),
        }
    }

    fn apply(&mut self, record: &mut EffectRecord) -> Result<(), Fault> {
        match (&record.op, record.target) {
            (EffectOp::Insert, UnitRef::WorkInProgress(unit)) => {
                let handle = self.insert(unit)?;
                record.handle = Some(handle);
            }
            (EffectOp::Move, UnitRef::WorkInProgress(unit)) => self.move_unit(unit)?,
            (EffectOp::Remove, UnitRef::Current(unit)) => {
                let handle = expect_handle(record.handle, unit)?;
                self.remove(unit, handle)?;
            }
            (EffectOp::UpdateAttributes(delta), UnitRef::WorkInProgress(unit)) => {
                let handle = expect_handle(record.handle, unit)?;
                self.host.update_attributes(handle, delta)?;
            }
            (EffectOp::SetText(text), UnitRef::WorkInProgress(unit)) => {
                let handle = expect_handle(record.handle, unit)?;
                self.host.set_text(handle, text)?;
            }
            (_, target) => return Err(InvariantViolation::BrokenLink(target.id()).into()),
        }
        Ok(())
    }

    fn insert(&mut self, unit: UnitId) -> Result<HostHandle, Fault> {
        self.wip.check(unit)?;
        let kind = self.wip.kind(unit).clone();
        let node_kind = kind
            .host_kind()
            .ok_or(InvariantViolation::BrokenLink(unit))?;
        let handle = self.host.create_node(node_kind, self.wip.attributes(unit))?;
        if let Err(fault) = self.place(unit, &kind, handle) {
            self.host.release_node(handle);
            return Err(fault);
        }
        self.wip.set_host(unit, Some(handle));
        self.unplaced.remove(&unit.index());
        Ok(handle)
    }

    /// Fills in and attaches a freshly created node.
    fn place(&mut self, unit: UnitId, kind: &UnitKind, handle: HostHandle) -> Result<(), Fault> {
        if *kind == UnitKind::Text {
            let text = self.wip.text(unit).unwrap_or_default();
            self.host.set_text(handle, text)?;
        }
        let parent = self.host_parent(unit)?;
        let reference = self.reference_sibling(unit);
        self.host.insert_before(parent, handle, reference)?;
        Ok(())
    }

    fn move_unit(&mut self, unit: UnitId) -> Result<(), Fault> {
        self.wip.check(unit)?;
        let parent = self.host_parent(unit)?;
        let reference = self.reference_sibling(unit);
        let mut tops = Vec::new();
        self.wip.top_host_units(unit, &mut tops);
        // Tops without a handle are inserted later by their own records.
        for handle in tops.into_iter().filter_map(|top| self.wip.host(top)) {
            self.host.insert_before(parent, handle, reference)?;
        }
        self.unplaced.remove(&unit.index());
        Ok(())
    }

    fn remove(&mut self, unit: UnitId, handle: HostHandle) -> Result<(), Fault> {
        self.current.check(unit)?;
        let parent = match self.current.host_ancestor(unit) {
            Some(a) => expect_handle(self.current.host(a), a)?,
            None => self.container,
        };
        self.host.remove_child(parent, handle)?;
        let released: Vec<HostHandle> = self
            .current
            .descendants(unit)
            .filter_map(|u| self.current.host(u))
            .collect();
        // Reverse pre-order: children before parents.
        for h in released.into_iter().rev() {
            self.host.release_node(h);
        }
        Ok(())
    }

    /// Handle of the nearest host-facing ancestor, or the container.
    fn host_parent(&self, unit: UnitId) -> Result<HostHandle, InvariantViolation> {
        match self.wip.host_ancestor(unit) {
            Some(a) => expect_handle(self.wip.host(a), a),
            None => Ok(self.container),
        }
    }

    fn reference_sibling(&self, unit: UnitId) -> Option<HostHandle> {
        let mut node = unit;
        loop {
            let mut sibling = self.wip.next_sibling(node);
            while let Some(s) = sibling {
                if let Some(h) = self.first_placed(s) {
                    return Some(h);
                }
                sibling = self.wip.next_sibling(s);
            }
            let parent = self.wip.parent(node)?;
            if self.wip.kind(parent).is_host_facing() {
                return None;
            }
            node = parent;
        }
    }

    /// First placed host node in the subtree at `unit`, in document order.
    fn first_placed(&self, unit: UnitId) -> Option<HostHandle> {
        if self.unplaced.contains(&unit.index()) {
            return None;
        }
        if self.wip.kind(unit).is_host_facing() {
            return self.wip.host(unit);
        }
        self.wip.children(unit).find_map(|c| self.first_placed(c))
    }
}

fn expect_handle(handle: Option<HostHandle>, unit: UnitId) -> Result<HostHandle, InvariantViolation> {
    handle.ok_or(InvariantViolation::BrokenLink(unit))
}
