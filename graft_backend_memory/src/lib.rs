// Copyright 2026 the Graft Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! In-memory host tree for graft.
//!
//! [`MemoryHost`] implements [`HostTree`](graft_core::host::HostTree) over a
//! slot table of nodes. It validates every call the way a strict DOM would
//! (unknown handles, inserting a node into its own subtree, removing a node
//! from the wrong parent, setting text on an element) and can be told to
//! reject calls on purpose with a [`FaultPlan`].
//!
//! [`html`] renders a container's children as an HTML-like string, and
//! renders a description the same way, so tests can compare the host tree
//! against what was described:
//!
//! ```
//! use graft_backend_memory::{MemoryHost, html};
//! use graft_core::clock::SteppedClock;
//! use graft_core::describe::Node;
//! use graft_core::lane::Lane;
//! use graft_core::reconciler::{Reconciler, RootId};
//!
//! let mut host = MemoryHost::new();
//! let mut reconciler = Reconciler::default();
//! let root = reconciler.mount(host.container());
//!
//! let tree = Node::element("p").attr("class", "greeting").child(Node::text("hi")).build();
//! reconciler.request_update(root, Lane::Urgent).unwrap();
//! reconciler.run_until_idle(
//!     &mut |_: RootId, _: Lane| tree.clone(),
//!     &mut host,
//!     &mut SteppedClock::frozen(),
//! );
//! assert_eq!(host.html(host.container()), r#"<p class="greeting">hi</p>"#);
//! assert_eq!(host.html(host.container()), html::describe(&tree));
//! ```

mod fault;
mod host;
pub mod html;

pub use fault::FaultPlan;
pub use host::{MemKind, MemNode, MemoryHost};
