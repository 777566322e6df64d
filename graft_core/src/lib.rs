// Copyright 2026 the Graft Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Interruptible reconciliation of UI trees.
//!
//! `graft_core` keeps a host tree (a DOM, an in-memory node table, a native
//! widget hierarchy) in agreement with a stream of desired tree
//! descriptions. The walk that computes the changes can be paused, resumed,
//! or thrown away in favor of more urgent work; the changes themselves are
//! applied in one uninterrupted commit. The crate is `no_std` compatible
//! (with `alloc`) and stores units in struct-of-arrays arenas addressed by
//! snapshot-checked ids.
//!
//! # Architecture
//!
//! ```text
//!   request_update(root, lane)
//!       │
//!       ▼
//!   Reconciler::work() ──► TreeSource::describe() ──► RenderPass
//!                                                        │
//!          ┌── yield (budget / higher lane) ◄── Begin/Complete items
//!          │                                             │
//!          ▼                                       Differ ──► EffectList
//!     next work()                                        │
//!                               ┌────────────────────────┘
//!                               ▼
//!         Committer ──► HostTree ──► swap current ◄── CommitObserver
//! ```
//!
//! **[`unit`]**: Struct-of-arrays unit trees with snapshot-checked ids.
//! Each root keeps a committed tree and a spare arena for the next pass.
//!
//! **[`describe`]**: Immutable, reference-counted tree descriptions and the
//! [`TreeSource`](describe::TreeSource) capability that produces them.
//!
//! **[`diff`]**: Single-level unit decisions and the keyed children
//! list diff.
//!
//! **[`effect`]**: Effect records accumulated by a pass.
//!
//! **[`scheduler`]**: Lanes of work, explicit work stacks, slice budgets,
//! and the starvation bound.
//!
//! **[`commit`]**: Replays a pass's effects against the host and reports
//! what happened.
//!
//! **[`reconciler`]**: Multi-root driver tying the above together.
//!
//! **[`host`]**: The [`HostTree`](host::HostTree) trait that backends
//! implement.
//!
//! **[`clock`]**: The [`SchedulingClock`](clock::SchedulingClock)
//! consulted at yield points.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types for
//! work-loop instrumentation, with the zero-overhead
//! [`Tracer`](trace::Tracer) wrapper.
//!
//! # Example
//!
//! ```
//! use graft_core::clock::SteppedClock;
//! use graft_core::describe::Node;
//! use graft_core::host::{HostError, HostHandle, HostNodeKind, HostTree};
//! use graft_core::lane::Lane;
//! use graft_core::reconciler::{Reconciler, RootId, WorkOutcome};
//! use graft_core::unit::{AttrDelta, Attributes};
//!
//! // A host that only counts nodes.
//! #[derive(Default)]
//! struct Counting(u64);
//!
//! impl HostTree for Counting {
//!     fn create_node(&mut self, _: HostNodeKind<'_>, _: &Attributes) -> Result<HostHandle, HostError> {
//!         self.0 += 1;
//!         Ok(HostHandle(self.0))
//!     }
//!     fn insert_before(&mut self, _: HostHandle, _: HostHandle, _: Option<HostHandle>) -> Result<(), HostError> {
//!         Ok(())
//!     }
//!     fn remove_child(&mut self, _: HostHandle, _: HostHandle) -> Result<(), HostError> {
//!         Ok(())
//!     }
//!     fn update_attributes(&mut self, _: HostHandle, _: &AttrDelta) -> Result<(), HostError> {
//!         Ok(())
//!     }
//!     fn set_text(&mut self, _: HostHandle, _: &str) -> Result<(), HostError> {
//!         Ok(())
//!     }
//! }
//!
//! let mut reconciler = Reconciler::default();
//! let root = reconciler.mount(HostHandle(0));
//! reconciler.request_update(root, Lane::Urgent).unwrap();
//!
//! let mut source = |_: RootId, _: Lane| {
//!     Node::element("p").child(Node::text("hello")).build()
//! };
//! let mut host = Counting::default();
//! let outcomes = reconciler.run_until_idle(&mut source, &mut host, &mut SteppedClock::frozen());
//! assert!(matches!(&outcomes[..], [WorkOutcome::Committed(report)] if report.counts().inserts == 2));
//! assert_eq!(host.0, 2);
//! ```
//!
//! # Crate features
//!
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).
//! - `tracing` (disabled by default): Emits structured log events through
//!   the `tracing` crate for pass starts, commits, yields, description
//!   errors and host failures.

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod clock;
pub mod commit;
pub mod describe;
pub mod diff;
pub mod effect;
pub mod error;
pub mod host;
pub mod lane;
mod logging;
pub mod reconciler;
pub mod scheduler;
pub mod time;
pub mod trace;
pub mod unit;
