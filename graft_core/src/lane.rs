// Copyright 2026 the Graft Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Priority lanes.
//!
//! A [`Lane`] tags every update request. Lanes are totally ordered:
//! [`Lane::Urgent`] outranks [`Lane::Background`], so an urgent request
//! preempts an in-flight background pass while a background request never
//! preempts urgent work.
//!
//! [`LaneSet`] is the per-root set of pending requests. Requesting a lane
//! that is already pending is a no-op apart from a diagnostic counter, which
//! is how repeated background requests coalesce into a single traversal.

use core::fmt;

/// A priority class for update requests.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Lane {
    /// Deferred or batched updates.
    Background = 0,
    /// Updates driven directly by user input.
    Urgent = 1,
}

impl Lane {
    /// All lanes, highest priority first.
    pub const ALL: [Self; 2] = [Self::Urgent, Self::Background];

    /// Returns a short lowercase name for diagnostics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Background => "background",
            Self::Urgent => "urgent",
        }
    }

    const fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

impl fmt::Display for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A compact set of pending lanes.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct LaneSet(u8);

impl LaneSet {
    /// The empty set.
    pub const EMPTY: Self = Self(0);

    /// Creates a set containing a single lane.
    #[must_use]
    pub const fn single(lane: Lane) -> Self {
        Self(lane.bit())
    }

    /// Adds `lane`, returning `true` if it was not already present.
    pub fn insert(&mut self, lane: Lane) -> bool {
        let was_present = self.contains(lane);
        self.0 |= lane.bit();
        !was_present
    }

    /// Removes `lane`, returning `true` if it was present.
    pub fn remove(&mut self, lane: Lane) -> bool {
        let was_present = self.contains(lane);
        self.0 &= !lane.bit();
        was_present
    }

    /// Returns whether `lane` is in the set.
    #[must_use]
    pub const fn contains(self, lane: Lane) -> bool {
        self.0 & lane.bit() != 0
    }

    /// Returns `true` if no lane is pending.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns the highest-priority lane in the set.
    #[must_use]
    pub fn highest(self) -> Option<Lane> {
        Lane::ALL.into_iter().find(|&lane| self.contains(lane))
    }

    /// Returns the union of two sets.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Returns whether the set holds a lane strictly above `lane`.
    #[must_use]
    pub fn has_higher_than(self, lane: Lane) -> bool {
        self.highest().is_some_and(|highest| highest > lane)
    }
}

impl fmt::Debug for LaneSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set()
            .entries(Lane::ALL.into_iter().filter(|&lane| self.contains(lane)))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urgent_outranks_background() {
        assert!(Lane::Urgent > Lane::Background);
    }

    #[test]
    fn repeated_insert_coalesces() {
        let mut set = LaneSet::EMPTY;
        assert!(set.insert(Lane::Background));
        assert!(!set.insert(Lane::Background), "second request coalesces");
        assert_eq!(set.highest(), Some(Lane::Background));
        assert!(set.remove(Lane::Background));
        assert!(set.is_empty());
    }

    #[test]
    fn highest_prefers_urgent() {
        let mut set = LaneSet::single(Lane::Background);
        set.insert(Lane::Urgent);
        assert_eq!(set.highest(), Some(Lane::Urgent));
        assert!(set.has_higher_than(Lane::Background));
        assert!(!set.has_higher_than(Lane::Urgent));
    }
}
