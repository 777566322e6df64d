// Copyright 2026 the Graft Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The node table.

use graft_core::host::{HostError, HostHandle, HostNodeKind, HostOp, HostTree};
use graft_core::unit::{AttrDelta, Attributes};

use crate::fault::FaultPlan;

/// What a host node is.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MemKind {
    /// A root container supplied to [`Reconciler::mount`](graft_core::reconciler::Reconciler::mount).
    Container,
    /// An element with a tag.
    Element(String),
    /// A text node and its content.
    Text(String),
}

/// One node in a [`MemoryHost`].
#[derive(Clone, Debug)]
pub struct MemNode {
    kind: MemKind,
    attributes: Attributes,
    parent: Option<HostHandle>,
    children: Vec<HostHandle>,
}

impl MemNode {
    fn new(kind: MemKind, attributes: Attributes) -> Self {
        Self {
            kind,
            attributes,
            parent: None,
            children: Vec::new(),
        }
    }

    /// What the node is.
    #[must_use]
    pub fn kind(&self) -> &MemKind {
        &self.kind
    }

    /// Current attributes (always empty for text nodes).
    #[must_use]
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Parent node, if attached.
    #[must_use]
    pub fn parent(&self) -> Option<HostHandle> {
        self.parent
    }

    /// Children in order.
    #[must_use]
    pub fn children(&self) -> &[HostHandle] {
        &self.children
    }
}

/// An in-memory [`HostTree`].
///
/// Handles are slot indices. Released slots are never reused, so a stale
/// handle is always reported as unknown.
#[derive(Clone, Debug)]
pub struct MemoryHost {
    nodes: Vec<Option<MemNode>>,
    faults: FaultPlan,
    calls: u64,
    released: u64,
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryHost {
    /// Creates a host with a single container at [`container`](Self::container).
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![Some(MemNode::new(MemKind::Container, Attributes::new()))],
            faults: FaultPlan::none(),
            calls: 0,
            released: 0,
        }
    }

    /// The container created with the host.
    #[must_use]
    pub fn container(&self) -> HostHandle {
        HostHandle(0)
    }

    /// Creates another container, for mounting a second root.
    pub fn add_container(&mut self) -> HostHandle {
        self.push(MemNode::new(MemKind::Container, Attributes::new()))
    }

    /// Replaces the fault plan.
    pub fn set_faults(&mut self, faults: FaultPlan) {
        self.faults = faults;
    }

    /// Builder form of [`set_faults`](Self::set_faults).
    #[must_use]
    pub fn with_faults(mut self, faults: FaultPlan) -> Self {
        self.faults = faults;
        self
    }

    /// Looks up a live node.
    #[must_use]
    pub fn node(&self, handle: HostHandle) -> Option<&MemNode> {
        self.nodes.get(usize::try_from(handle.0).ok()?)?.as_ref()
    }

    /// Text content of a text node.
    #[must_use]
    pub fn text(&self, handle: HostHandle) -> Option<&str> {
        match self.node(handle)?.kind() {
            MemKind::Text(text) => Some(text),
            MemKind::Container | MemKind::Element(_) => None,
        }
    }

    /// Number of mutation calls received, including rejected ones.
    #[must_use]
    pub fn calls(&self) -> u64 {
        self.calls
    }

    /// Number of nodes released through [`HostTree::release_node`].
    #[must_use]
    pub fn released(&self) -> u64 {
        self.released
    }

    /// Number of live non-container nodes, attached or not.
    #[must_use]
    pub fn live_nodes(&self) -> usize {
        self.nodes
            .iter()
            .flatten()
            .filter(|n| n.kind != MemKind::Container)
            .count()
    }

    /// Renders the children of `handle` as an HTML-like string.
    ///
    /// See [`html`](crate::html) for the format.
    #[must_use]
    pub fn html(&self, handle: HostHandle) -> String {
        let mut out = String::new();
        if let Some(node) = self.node(handle) {
            for &child in node.children() {
                crate::html::write_host(self, child, &mut out);
            }
        }
        out
    }

    fn push(&mut self, node: MemNode) -> HostHandle {
        let handle = HostHandle(self.nodes.len() as u64);
        self.nodes.push(Some(node));
        handle
    }

    fn node_mut(&mut self, handle: HostHandle) -> Result<&mut MemNode, HostError> {
        usize::try_from(handle.0)
            .ok()
            .and_then(|i| self.nodes.get_mut(i))
            .and_then(Option::as_mut)
            .ok_or(HostError::UnknownHandle(handle))
    }

    fn live(&self, handle: HostHandle) -> Result<&MemNode, HostError> {
        self.node(handle).ok_or(HostError::UnknownHandle(handle))
    }

    /// Counts the call and applies the fault plan.
    fn enter(&mut self, op: HostOp, target: Option<HostHandle>) -> Result<(), HostError> {
        self.calls += 1;
        self.faults.check(self.calls, op, target)
    }

    /// Whether `ancestor` is `handle` or one of its ancestors.
    fn contains(&self, ancestor: HostHandle, mut handle: HostHandle) -> bool {
        loop {
            if handle == ancestor {
                return true;
            }
            match self.node(handle).and_then(MemNode::parent) {
                Some(parent) => handle = parent,
                None => return false,
            }
        }
    }

    fn detach(&mut self, child: HostHandle) -> Result<(), HostError> {
        let Some(parent) = self.live(child)?.parent else {
            return Ok(());
        };
        self.node_mut(parent)?.children.retain(|&c| c != child);
        self.node_mut(child)?.parent = None;
        Ok(())
    }
}

impl HostTree for MemoryHost {
    fn create_node(
        &mut self,
        kind: HostNodeKind<'_>,
        attributes: &Attributes,
    ) -> Result<HostHandle, HostError> {
        self.enter(HostOp::CreateNode, None)?;
        let node = match kind {
            HostNodeKind::Element(tag) => MemNode::new(MemKind::Element(tag.into()), attributes.clone()),
            HostNodeKind::Text => MemNode::new(MemKind::Text(String::new()), Attributes::new()),
        };
        Ok(self.push(node))
    }

    fn insert_before(
        &mut self,
        parent: HostHandle,
        child: HostHandle,
        reference: Option<HostHandle>,
    ) -> Result<(), HostError> {
        self.enter(HostOp::InsertBefore, Some(child))?;
        let rejected = |handle| HostError::Rejected {
            op: HostOp::InsertBefore,
            handle,
        };
        if matches!(self.live(parent)?.kind, MemKind::Text(_)) {
            return Err(rejected(parent));
        }
        self.live(child)?;
        if self.contains(child, parent) {
            return Err(rejected(child));
        }
        if let Some(r) = reference {
            if r == child || self.live(r)?.parent != Some(parent) {
                return Err(rejected(r));
            }
        }

        self.detach(child)?;
        let list = &mut self.node_mut(parent)?.children;
        let at = reference
            .and_then(|r| list.iter().position(|&c| c == r))
            .unwrap_or(list.len());
        list.insert(at, child);
        self.node_mut(child)?.parent = Some(parent);
        Ok(())
    }

    fn remove_child(&mut self, parent: HostHandle, child: HostHandle) -> Result<(), HostError> {
        self.enter(HostOp::RemoveChild, Some(child))?;
        self.live(parent)?;
        if self.live(child)?.parent != Some(parent) {
            return Err(HostError::Rejected {
                op: HostOp::RemoveChild,
                handle: child,
            });
        }
        self.detach(child)
    }

    fn update_attributes(&mut self, handle: HostHandle, delta: &AttrDelta) -> Result<(), HostError> {
        self.enter(HostOp::UpdateAttributes, Some(handle))?;
        let node = self.node_mut(handle)?;
        if !matches!(node.kind, MemKind::Element(_)) {
            return Err(HostError::Rejected {
                op: HostOp::UpdateAttributes,
                handle,
            });
        }
        node.attributes.apply(delta);
        Ok(())
    }

    fn set_text(&mut self, handle: HostHandle, value: &str) -> Result<(), HostError> {
        self.enter(HostOp::SetText, Some(handle))?;
        match &mut self.node_mut(handle)?.kind {
            MemKind::Text(text) => {
                value.clone_into(text);
                Ok(())
            }
            MemKind::Container | MemKind::Element(_) => Err(HostError::Rejected {
                op: HostOp::SetText,
                handle,
            }),
        }
    }

    fn release_node(&mut self, handle: HostHandle) {
        if let Some(slot) = usize::try_from(handle.0)
            .ok()
            .and_then(|i| self.nodes.get_mut(i))
            && slot.take().is_some()
        {
            self.released += 1;
        }
    }
}
