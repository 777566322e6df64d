// Copyright 2026 the Graft Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error taxonomy.
//!
//! - [`DescriptionError`]: malformed tree description. Recovered locally
//!   (positional matching) and reported through the commit report.
//! - [`HostError`](crate::host::HostError): the host rejected a mutation.
//!   Contained to the affected subtree and reported through the commit
//!   report.
//! - [`InvariantViolation`]: a defect in the engine. Aborts the pass; the
//!   root returns to idle with its last committed tree intact.

use crate::host::{HostError, HostHandle};
use crate::reconciler::RootId;
use crate::unit::{Key, UnitId};

/// A recoverable problem with a tree description.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DescriptionError {
    /// Two siblings share a key. The sibling group is matched by position
    /// instead of by key.
    #[error("duplicate key {key} among children of {parent:?}; matched by position")]
    DuplicateKey {
        /// Work-in-progress unit whose children collided.
        parent: UnitId,
        /// The repeated key.
        key: Key,
    },
}

/// An internal consistency failure.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum InvariantViolation {
    /// A unit id does not refer to a live slot in the snapshot it names.
    #[error("stale unit id {0:?}")]
    StaleUnit(UnitId),
    /// A unit id from one snapshot was used against another.
    #[error("unit {id:?} used against snapshot {expected}")]
    SnapshotMismatch {
        /// The offending id.
        id: UnitId,
        /// Serial of the snapshot it was used with.
        expected: u32,
    },
    /// The root id is not mounted.
    #[error("unknown root {0:?}")]
    UnknownRoot(RootId),
    /// Parent, child and sibling links disagree.
    #[error("broken topology at {0:?}")]
    BrokenLink(UnitId),
    /// A text unit has children.
    #[error("text unit {0:?} has children")]
    TextWithChildren(UnitId),
    /// Two live units claim the same host handle.
    #[error("host handle {0:?} is shared by two units")]
    SharedHostHandle(HostHandle),
}

/// Any error surfaced by the engine.
///
/// [`CommitReport::errors`](crate::commit::CommitReport::errors) yields
/// these so callers can log a report with one match.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// Malformed description, recovered.
    #[error(transparent)]
    Description(#[from] DescriptionError),
    /// Host rejected an operation.
    #[error(transparent)]
    Host(#[from] HostError),
    /// Engine defect; the pass was abandoned.
    #[error(transparent)]
    Invariant(#[from] InvariantViolation),
}
