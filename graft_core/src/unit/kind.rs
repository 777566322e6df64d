// Copyright 2026 the Graft Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Unit categories, keys, and pending-effect tags.

use alloc::rc::Rc;
use alloc::string::String;
use core::fmt;

use crate::host::HostNodeKind;

/// A shared, immutable name (element tag, component name, attribute name).
pub type Name = Rc<str>;

/// The category of a unit.
///
/// Two kinds are equal only when both the variant and the tag or component
/// name match, so `div` and `section` are different kinds.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum UnitKind {
    /// A host element such as `div`.
    Element(Name),
    /// A host text node.
    Text,
    /// A component boundary. Owns no host node.
    Composite(Name),
    /// A transparent grouping of children. Owns no host node.
    Fragment,
    /// An empty slot that keeps sibling positions stable. Owns no host node.
    Placeholder,
}

impl UnitKind {
    /// Returns `true` for kinds that own a host node.
    #[must_use]
    pub fn is_host_facing(&self) -> bool {
        matches!(self, Self::Element(_) | Self::Text)
    }

    /// Returns the host node kind to create, if any.
    #[must_use]
    pub fn host_kind(&self) -> Option<HostNodeKind<'_>> {
        match self {
            Self::Element(tag) => Some(HostNodeKind::Element(tag)),
            Self::Text => Some(HostNodeKind::Text),
            Self::Composite(_) | Self::Fragment | Self::Placeholder => None,
        }
    }

    /// Returns whether units of this kind may have children.
    #[must_use]
    pub fn accepts_children(&self) -> bool {
        !matches!(self, Self::Text | Self::Placeholder)
    }
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Element(tag) => write!(f, "<{tag}>"),
            Self::Text => f.write_str("#text"),
            Self::Composite(name) => write!(f, "{name}()"),
            Self::Fragment => f.write_str("<>"),
            Self::Placeholder => f.write_str("#empty"),
        }
    }
}

/// A stable identity hint supplied by the tree author.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    /// Integer key, typically a record id.
    Int(u64),
    /// String key.
    Str(Rc<str>),
}

impl From<u64> for Key {
    fn from(value: u64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Self::Str(Rc::from(value))
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Self::Str(Rc::from(value))
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "#{v}"),
            Self::Str(s) => write!(f, "{s:?}"),
        }
    }
}

/// What a work-in-progress unit requires relative to its prior version.
///
/// Diffing only tags units; the matching host mutations are recorded as
/// [`EffectRecord`](crate::effect::EffectRecord)s. A unit that is both moved
/// and updated keeps the [`Move`](Self::Move) tag.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PendingEffect {
    /// Reused as-is.
    #[default]
    None,
    /// Reused with attribute or text changes.
    Update,
    /// New; no prior version.
    Insert,
    /// Scheduled for removal (effect records only).
    Delete,
    /// Reused, but repositioned among its siblings.
    Move,
    /// Prior version had a different kind or key and is replaced wholesale.
    Replace,
}
