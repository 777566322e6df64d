// Copyright 2026 the Graft Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Host tree contract for backend integrations.
//!
//! Graft splits host-specific work into *backend* crates. Each backend
//! implements [`HostTree`] over some mutable external tree (DOM nodes, an
//! in-memory node table, a native widget hierarchy). The core never reads
//! host state back; it only issues the five mutations below, and only from
//! the committer.
//!
//! # Crate boundaries
//!
//! `graft_core` owns the data model, diffing, scheduling, and this contract
//! module. Backend crates depend on `graft_core` and provide host glue.
//! Application code depends on both and wires them together around a
//! [`Reconciler`](crate::reconciler::Reconciler).

use alloc::string::String;
use core::fmt;

use crate::unit::{AttrDelta, Attributes};

/// An opaque reference to a node in the host tree.
///
/// Handles are minted by [`HostTree::create_node`] (or supplied by the
/// application for root containers). Core code passes them through without
/// interpreting the value.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HostHandle(pub u64);

impl fmt::Debug for HostHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostHandle({})", self.0)
    }
}

/// What kind of host node to create.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HostNodeKind<'a> {
    /// An element with the given tag.
    Element(&'a str),
    /// A text node; its content is delivered by a following
    /// [`HostTree::set_text`] call.
    Text,
}

/// The host operation that failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HostOp {
    /// [`HostTree::create_node`].
    CreateNode,
    /// [`HostTree::insert_before`].
    InsertBefore,
    /// [`HostTree::remove_child`].
    RemoveChild,
    /// [`HostTree::update_attributes`].
    UpdateAttributes,
    /// [`HostTree::set_text`].
    SetText,
}

impl fmt::Display for HostOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::CreateNode => "create-node",
            Self::InsertBefore => "insert-before",
            Self::RemoveChild => "remove-child",
            Self::UpdateAttributes => "update-attributes",
            Self::SetText => "set-text",
        })
    }
}

/// A rejected host mutation.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    /// The handle does not name a live host node.
    #[error("unknown host handle {0:?}")]
    UnknownHandle(HostHandle),
    /// The host refused the operation.
    #[error("host rejected {op} on {handle:?}")]
    Rejected {
        /// Operation that was refused.
        op: HostOp,
        /// Node the operation targeted.
        handle: HostHandle,
    },
    /// Backend-specific failure.
    #[error("{0}")]
    Backend(String),
}

/// Applies mutations to a host tree.
///
/// All calls originate from the committer, inside one non-interruptible
/// replay of a pass's effects. Implementations may fail any call; the
/// committer skips the rest of the affected subtree and reports the failure.
pub trait HostTree {
    /// Creates a detached host node.
    fn create_node(
        &mut self,
        kind: HostNodeKind<'_>,
        attributes: &Attributes,
    ) -> Result<HostHandle, HostError>;

    /// Inserts `child` under `parent` before `reference`, or appends it when
    /// `reference` is `None`. If `child` is already attached it is moved.
    fn insert_before(
        &mut self,
        parent: HostHandle,
        child: HostHandle,
        reference: Option<HostHandle>,
    ) -> Result<(), HostError>;

    /// Detaches `child` from `parent`.
    fn remove_child(&mut self, parent: HostHandle, child: HostHandle) -> Result<(), HostError>;

    /// Applies an attribute delta to an element.
    fn update_attributes(&mut self, handle: HostHandle, delta: &AttrDelta)
    -> Result<(), HostError>;

    /// Replaces the content of a text node.
    fn set_text(&mut self, handle: HostHandle, value: &str) -> Result<(), HostError>;

    /// Called once for every host node of a removed subtree after its
    /// removal was applied, and for a created node that could not be
    /// attached. Backends may free associated resources.
    fn release_node(&mut self, handle: HostHandle) {
        _ = handle;
    }
}
