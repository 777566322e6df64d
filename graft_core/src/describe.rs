// Copyright 2026 the Graft Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tree descriptions.
//!
//! A [`Node`] is an immutable description of the desired tree, produced by
//! application code through a [`TreeSource`]. Descriptions are reference
//! counted ([`NodeRef`]) so that a source can hand back an unchanged subtree
//! from a previous render. The differ treats a pointer-identical description
//! as proof that the subtree is unchanged and copies the prior units without
//! diffing them.
//!
//! ```
//! use graft_core::describe::Node;
//!
//! let tree = Node::element("ul")
//!     .attr("class", "todo")
//!     .child(Node::element("li").key(1_u64).child(Node::text("milk")))
//!     .child(Node::element("li").key(2_u64).child(Node::text("eggs")))
//!     .build();
//! assert_eq!(tree.children_ref().len(), 2);
//! ```

use alloc::rc::Rc;
use alloc::vec::Vec;

use crate::lane::Lane;
use crate::reconciler::RootId;
use crate::unit::{AttrValue, Attributes, Key, Name, UnitKind};

/// A shared description node.
pub type NodeRef = Rc<Node>;

/// One element of a tree description.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Node {
    kind: UnitKind,
    key: Option<Key>,
    attributes: Attributes,
    text: Option<Rc<str>>,
    children: Vec<NodeRef>,
}

impl Node {
    fn with_kind(kind: UnitKind) -> Self {
        Self {
            kind,
            key: None,
            attributes: Attributes::new(),
            text: None,
            children: Vec::new(),
        }
    }

    /// A host element with the given tag.
    #[must_use]
    pub fn element(tag: impl Into<Name>) -> Self {
        Self::with_kind(UnitKind::Element(tag.into()))
    }

    /// A host text node.
    #[must_use]
    pub fn text(value: impl Into<Rc<str>>) -> Self {
        let mut node = Self::with_kind(UnitKind::Text);
        node.text = Some(value.into());
        node
    }

    /// A component boundary.
    #[must_use]
    pub fn composite(name: impl Into<Name>) -> Self {
        Self::with_kind(UnitKind::Composite(name.into()))
    }

    /// A transparent grouping of children.
    #[must_use]
    pub fn fragment() -> Self {
        Self::with_kind(UnitKind::Fragment)
    }

    /// An empty slot.
    #[must_use]
    pub fn placeholder() -> Self {
        Self::with_kind(UnitKind::Placeholder)
    }

    /// Sets the key.
    #[must_use]
    pub fn key(mut self, key: impl Into<Key>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Sets an attribute.
    #[must_use]
    pub fn attr(mut self, name: impl Into<Name>, value: impl Into<AttrValue>) -> Self {
        self.attributes.set(name, value);
        self
    }

    /// Appends a child.
    ///
    /// Children of text and placeholder nodes are ignored.
    #[must_use]
    pub fn child(mut self, child: impl Into<NodeRef>) -> Self {
        if self.kind.accepts_children() {
            self.children.push(child.into());
        }
        self
    }

    /// Appends several children.
    #[must_use]
    pub fn children<I>(mut self, children: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<NodeRef>,
    {
        if self.kind.accepts_children() {
            self.children.extend(children.into_iter().map(Into::into));
        }
        self
    }

    /// Wraps the node in a [`NodeRef`].
    #[must_use]
    pub fn build(self) -> NodeRef {
        Rc::new(self)
    }

    /// Returns the kind.
    #[must_use]
    pub fn kind(&self) -> &UnitKind {
        &self.kind
    }

    /// Returns the key, if any.
    #[must_use]
    pub fn key_ref(&self) -> Option<&Key> {
        self.key.as_ref()
    }

    /// Returns the attributes.
    #[must_use]
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Returns the text content (text nodes only).
    #[must_use]
    pub fn text_value(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Returns the child descriptions.
    #[must_use]
    pub fn children_ref(&self) -> &[NodeRef] {
        &self.children
    }

    /// Counts the nodes in this description, including `self`.
    #[must_use]
    pub fn node_count(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(|c| c.node_count())
            .sum::<usize>()
    }
}

/// Produces the desired tree for a root.
///
/// Called once at the start of every rendering pass for that root. The
/// returned description must not depend on host state.
pub trait TreeSource {
    /// Describes the desired tree of `root` for a pass in `lane`.
    fn describe(&mut self, root: RootId, lane: Lane) -> NodeRef;
}

impl<F> TreeSource for F
where
    F: FnMut(RootId, Lane) -> NodeRef,
{
    fn describe(&mut self, root: RootId, lane: Lane) -> NodeRef {
        self(root, lane)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_collects_children_in_order() {
        let node = Node::element("div")
            .child(Node::text("a"))
            .children([Node::text("b"), Node::text("c")])
            .build();
        let texts: Vec<_> = node
            .children_ref()
            .iter()
            .filter_map(|c| c.text_value())
            .collect();
        assert_eq!(texts, ["a", "b", "c"]);
        assert_eq!(node.node_count(), 4);
    }

    #[test]
    fn text_nodes_drop_children() {
        let node = Node::text("leaf").child(Node::text("ignored"));
        assert!(node.children_ref().is_empty());
    }

    #[test]
    fn key_and_attributes_are_recorded() {
        let node = Node::element("li").key("x").attr("id", "first").attr("n", 3_i64);
        assert_eq!(node.key_ref(), Some(&Key::from("x")));
        assert_eq!(node.attributes().len(), 2);
    }
}
