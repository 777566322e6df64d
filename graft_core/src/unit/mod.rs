// Copyright 2026 the Graft Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Unit tree data model.
//!
//! A *unit* is a node in a reconciled tree. Each unit has:
//!
//! - An identity ([`UnitId`]): a slot index tagged with the serial of the
//!   snapshot that allocated it. Ids go stale when their snapshot is reset,
//!   which turns cross-snapshot mix-ups into detectable errors.
//! - Topology: parent, first/last child, and sibling links forming an
//!   ordered tree.
//! - Content shared with the [`Node`](crate::describe::Node) description it
//!   was built from: [`kind`](UnitTree::kind), [`key`](UnitTree::key),
//!   [`attributes`](UnitTree::attributes) and [`text`](UnitTree::text).
//! - Reconciliation state: the [`host`](UnitTree::host) handle, the
//!   [`prior`](UnitTree::prior) version in the current snapshot, and the
//!   [`pending`](UnitTree::pending) effect tag.
//!
//! Units are stored in struct-of-arrays layout with index-based links, so a
//! current snapshot and a work-in-progress snapshot can coexist and refer to
//! each other without ownership cycles. Only work-in-progress units point at
//! current units, never the reverse.

mod attributes;
mod id;
mod kind;
mod traverse;
mod tree;

pub use attributes::{AttrDelta, AttrValue, Attributes};
pub use id::{INVALID, UnitId};
pub use kind::{Key, Name, PendingEffect, UnitKind};
pub use traverse::{Children, Descendants};
pub use tree::UnitTree;
