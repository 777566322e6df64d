// Copyright 2026 the Graft Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Deliberate host failures.

use graft_core::host::{HostError, HostHandle, HostOp};

/// Which calls a [`MemoryHost`](crate::MemoryHost) rejects.
///
/// Rules combine: a call fails if any rule matches. Injected failures are
/// reported as [`HostError::Backend`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FaultPlan {
    nth_call: Option<u64>,
    handles: Vec<HostHandle>,
    ops: Vec<HostOp>,
}

impl FaultPlan {
    /// A plan that rejects nothing.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Rejects the `n`th mutation call (1-based, counting every call since
    /// the host was created).
    #[must_use]
    pub fn fail_nth_call(mut self, n: u64) -> Self {
        self.nth_call = Some(n);
        self
    }

    /// Rejects every call whose target is `handle`.
    #[must_use]
    pub fn fail_handle(mut self, handle: HostHandle) -> Self {
        self.handles.push(handle);
        self
    }

    /// Rejects every call of the given kind.
    #[must_use]
    pub fn fail_op(mut self, op: HostOp) -> Self {
        self.ops.push(op);
        self
    }

    /// Returns `true` if the plan rejects nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nth_call.is_none() && self.handles.is_empty() && self.ops.is_empty()
    }

    pub(crate) fn check(
        &self,
        call: u64,
        op: HostOp,
        target: Option<HostHandle>,
    ) -> Result<(), HostError> {
        let hit = self.nth_call == Some(call)
            || self.ops.contains(&op)
            || target.is_some_and(|t| self.handles.contains(&t));
        if hit {
            Err(HostError::Backend(format!("injected {op} failure on call {call}")))
        } else {
            Ok(())
        }
    }
}
