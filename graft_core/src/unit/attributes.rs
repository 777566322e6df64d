// Copyright 2026 the Graft Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Ordered attribute maps and attribute-level deltas.

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::fmt;

use super::kind::Name;

/// An attribute value.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum AttrValue {
    /// String value.
    Str(Rc<str>),
    /// Integer value.
    Int(i64),
    /// Boolean value (present/absent flags on the web).
    Bool(bool),
}

impl fmt::Debug for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => write!(f, "{s:?}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::Int(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        Self::Str(Rc::from(value))
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Insertion-ordered mapping from attribute name to value.
///
/// Attribute lists are short, so lookups are linear scans over a `Vec`,
/// which also preserves the author's ordering for host mutation.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Attributes {
    entries: Vec<(Name, AttrValue)>,
}

impl Attributes {
    /// Creates an empty attribute map.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Sets `name` to `value`, keeping the original position if the name was
    /// already present.
    pub fn set(&mut self, name: impl Into<Name>, value: impl Into<AttrValue>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Removes `name`, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<AttrValue> {
        let pos = self.entries.iter().position(|(n, _)| &**n == name)?;
        Some(self.entries.remove(pos).1)
    }

    /// Returns the value for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.entries
            .iter()
            .find(|(n, _)| &**n == name)
            .map(|(_, v)| v)
    }

    /// Iterates entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&Name, &AttrValue)> {
        self.entries.iter().map(|(n, v)| (n, v))
    }

    /// Number of attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no attributes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Computes the delta that turns `self` into `next`.
    #[must_use]
    pub fn diff(&self, next: &Self) -> AttrDelta {
        let mut delta = AttrDelta::default();
        for (name, value) in &next.entries {
            if self.get(name) != Some(value) {
                delta.set.push((name.clone(), value.clone()));
            }
        }
        for (name, _) in &self.entries {
            if next.get(name).is_none() {
                delta.removed.push(name.clone());
            }
        }
        delta
    }

    /// Applies a delta in place.
    pub fn apply(&mut self, delta: &AttrDelta) {
        for name in &delta.removed {
            self.remove(name);
        }
        for (name, value) in &delta.set {
            self.set(name.clone(), value.clone());
        }
    }
}

impl fmt::Debug for Attributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<N: Into<Name>, V: Into<AttrValue>> FromIterator<(N, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut attrs = Self::new();
        for (name, value) in iter {
            attrs.set(name, value);
        }
        attrs
    }
}

/// Attribute-level changes between two versions of an element.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AttrDelta {
    /// Added or changed entries, in the new version's order.
    pub set: Vec<(Name, AttrValue)>,
    /// Names present before but absent now, in the old version's order.
    pub removed: Vec<Name>,
}

impl AttrDelta {
    /// Returns `true` if nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.removed.is_empty()
    }
}
