// Copyright 2026 the Graft Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Unit identity.

use core::fmt;

/// Sentinel value indicating "no unit" in index fields.
pub const INVALID: u32 = u32::MAX;

/// A handle to a unit in a [`UnitTree`](super::UnitTree).
///
/// Contains both a slot index and the serial of the snapshot that allocated
/// it. Every time an arena is cleared for reuse its serial changes, so ids
/// from a discarded work-in-progress tree, or from the retired current tree,
/// fail validation instead of silently aliasing new units.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct UnitId {
    /// Slot index into the arena's arrays.
    pub(crate) idx: u32,
    /// Serial of the owning snapshot.
    pub(crate) snapshot: u32,
}

impl UnitId {
    /// Returns the raw slot index (for diagnostics only).
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.idx
    }

    /// Returns the serial of the snapshot this id belongs to.
    #[inline]
    #[must_use]
    pub const fn snapshot(self) -> u32 {
        self.snapshot
    }
}

impl fmt::Debug for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UnitId({}@snap{})", self.idx, self.snapshot)
    }
}
