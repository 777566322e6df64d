// Copyright 2026 the Graft Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! DOM host tree for graft.
//!
//! [`DomHost`] implements [`HostTree`](graft_core::host::HostTree) on top of
//! `web-sys`. Host handles index a table of live DOM nodes; containers are
//! existing elements registered with [`DomHost::add_container`].
//!
//! ```no_run
//! use graft_backend_web::DomHost;
//! use graft_core::reconciler::Reconciler;
//!
//! let mut host = DomHost::from_window().expect("running in a browser");
//! let body = host.document().body().expect("document has a body");
//! let container = host.add_container(body.into());
//! let mut reconciler = Reconciler::default();
//! let root = reconciler.mount(container);
//! # let _ = root;
//! ```

#![no_std]

extern crate alloc;

mod dom;

pub use dom::DomHost;
