// Copyright 2026 the Graft Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Effect records and the per-pass effect accumulator.
//!
//! The differ never touches the host tree. Instead it appends one
//! [`EffectRecord`] per required host mutation to the pass's [`EffectList`],
//! and the committer replays the list in order once the pass completes.

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::fmt;

use crate::host::HostHandle;
use crate::unit::{AttrDelta, PendingEffect, UnitId};

/// A unit in one of the two snapshots of a root.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitRef {
    /// A unit of the committed tree (the target of removals).
    Current(UnitId),
    /// A unit of the tree being built.
    WorkInProgress(UnitId),
}

impl UnitRef {
    /// Returns the referenced id.
    #[must_use]
    pub fn id(self) -> UnitId {
        match self {
            Self::Current(id) | Self::WorkInProgress(id) => id,
        }
    }
}

impl fmt::Debug for UnitRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Current(id) => write!(f, "cur:{id:?}"),
            Self::WorkInProgress(id) => write!(f, "wip:{id:?}"),
        }
    }
}

/// A host mutation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EffectOp {
    /// Create the unit's host node and insert it before its next placed
    /// host sibling. Attributes and text come from the unit's description.
    Insert,
    /// Detach the unit's host node from its host parent and release it,
    /// along with every host node below it.
    Remove,
    /// Reposition the unit's host nodes before its next placed host sibling.
    Move,
    /// Apply an attribute delta to an element.
    UpdateAttributes(AttrDelta),
    /// Replace the content of a text node.
    SetText(Rc<str>),
}

impl EffectOp {
    /// Short name for logs and traces.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Remove => "remove",
            Self::Move => "move",
            Self::UpdateAttributes(_) => "update-attributes",
            Self::SetText(_) => "set-text",
        }
    }
}

/// One pending host mutation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EffectRecord {
    /// The unit the mutation is for.
    pub target: UnitRef,
    /// The unit's host handle. Known at diff time for reused and removed
    /// units; filled in by the committer for inserts.
    pub handle: Option<HostHandle>,
    /// The mutation.
    pub op: EffectOp,
    /// Why the record exists. Removal and insertion caused by a kind or key
    /// change carry [`PendingEffect::Replace`].
    pub cause: PendingEffect,
}

impl EffectRecord {
    /// Returns `true` for insert, remove and move records.
    #[must_use]
    pub fn is_structural(&self) -> bool {
        matches!(self.op, EffectOp::Insert | EffectOp::Remove | EffectOp::Move)
    }
}

/// Ordered, append-only list of effect records for one pass.
///
/// No deduplication happens here: redundant records for the same handle are
/// applied in order.
#[derive(Clone, Debug, Default)]
pub struct EffectList {
    records: Vec<EffectRecord>,
}

impl EffectList {
    /// Creates an empty list.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    /// Appends a record.
    pub fn push(&mut self, record: EffectRecord) {
        self.records.push(record);
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if no records have been accumulated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns the records in emission order.
    #[must_use]
    pub fn as_slice(&self) -> &[EffectRecord] {
        &self.records
    }

    /// Drops every record, keeping capacity.
    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Moves the records out, leaving the list empty.
    pub fn take(&mut self) -> Vec<EffectRecord> {
        core::mem::take(&mut self.records)
    }
}

/// Counts records by operation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EffectCounts {
    /// Insert records.
    pub inserts: u32,
    /// Remove records.
    pub removes: u32,
    /// Move records.
    pub moves: u32,
    /// Attribute updates.
    pub attribute_updates: u32,
    /// Text updates.
    pub text_updates: u32,
}

impl EffectCounts {
    /// Tallies a slice of records.
    #[must_use]
    pub fn of(records: &[EffectRecord]) -> Self {
        let mut counts = Self::default();
        for record in records {
            let slot = match record.op {
                EffectOp::Insert => &mut counts.inserts,
                EffectOp::Remove => &mut counts.removes,
                EffectOp::Move => &mut counts.moves,
                EffectOp::UpdateAttributes(_) => &mut counts.attribute_updates,
                EffectOp::SetText(_) => &mut counts.text_updates,
            };
            *slot += 1;
        }
        counts
    }

    /// Total number of records.
    #[must_use]
    pub const fn total(self) -> u32 {
        self.inserts + self.removes + self.moves + self.attribute_updates + self.text_updates
    }
}
