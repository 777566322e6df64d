// Copyright 2026 the Graft Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! DOM node table.

use alloc::format;
use alloc::vec::Vec;

use graft_core::host::{HostError, HostHandle, HostNodeKind, HostOp, HostTree};
use graft_core::unit::{AttrDelta, AttrValue, Attributes};
use wasm_bindgen::{JsCast as _, JsValue};
use web_sys::{Document, Element, Node};

/// A [`HostTree`] over live DOM nodes.
///
/// Handles are slot indices into a node table. Released slots are never
/// reused, so a stale handle is always reported as unknown.
pub struct DomHost {
    document: Document,
    nodes: Vec<Option<Node>>,
}

impl core::fmt::Debug for DomHost {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DomHost")
            .field("document", &"Document")
            .field("nodes_len", &self.nodes.len())
            .finish()
    }
}

impl DomHost {
    /// Creates a host that creates nodes in `document`.
    #[must_use]
    pub fn new(document: Document) -> Self {
        Self {
            document,
            nodes: Vec::new(),
        }
    }

    /// Creates a host for the document of the global `window`.
    #[must_use]
    pub fn from_window() -> Option<Self> {
        web_sys::window()?.document().map(Self::new)
    }

    /// The document nodes are created in.
    #[must_use]
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Registers an existing element as a root container.
    pub fn add_container(&mut self, element: Element) -> HostHandle {
        self.push(element.into())
    }

    /// Returns the DOM node behind a handle.
    #[must_use]
    pub fn node(&self, handle: HostHandle) -> Option<&Node> {
        self.nodes.get(usize::try_from(handle.0).ok()?)?.as_ref()
    }

    fn push(&mut self, node: Node) -> HostHandle {
        let handle = HostHandle(self.nodes.len() as u64);
        self.nodes.push(Some(node));
        handle
    }

    fn live(&self, handle: HostHandle) -> Result<&Node, HostError> {
        self.node(handle).ok_or(HostError::UnknownHandle(handle))
    }

    fn element(&self, handle: HostHandle, op: HostOp) -> Result<&Element, HostError> {
        self.live(handle)?
            .dyn_ref::<Element>()
            .ok_or(HostError::Rejected { op, handle })
    }
}

/// Maps a DOM exception to a host error.
fn backend(op: HostOp, err: &JsValue) -> HostError {
    HostError::Backend(format!("{op} failed: {err:?}"))
}

/// Writes one attribute. `false` booleans are absent, `true` ones empty.
fn write_attribute(element: &Element, name: &str, value: &AttrValue) -> Result<(), JsValue> {
    match value {
        AttrValue::Bool(false) => element.remove_attribute(name),
        AttrValue::Bool(true) => element.set_attribute(name, ""),
        AttrValue::Str(s) => element.set_attribute(name, s),
        AttrValue::Int(v) => element.set_attribute(name, &format!("{v}")),
    }
}

impl HostTree for DomHost {
    fn create_node(
        &mut self,
        kind: HostNodeKind<'_>,
        attributes: &Attributes,
    ) -> Result<HostHandle, HostError> {
        let op = HostOp::CreateNode;
        let node: Node = match kind {
            HostNodeKind::Element(tag) => {
                let element = self
                    .document
                    .create_element(tag)
                    .map_err(|e| backend(op, &e))?;
                for (name, value) in attributes.iter() {
                    write_attribute(&element, name, value).map_err(|e| backend(op, &e))?;
                }
                element.into()
            }
            HostNodeKind::Text => self.document.create_text_node("").into(),
        };
        Ok(self.push(node))
    }

    fn insert_before(
        &mut self,
        parent: HostHandle,
        child: HostHandle,
        reference: Option<HostHandle>,
    ) -> Result<(), HostError> {
        let op = HostOp::InsertBefore;
        let reference = reference.map(|r| self.live(r)).transpose()?;
        self.live(parent)?
            .insert_before(self.live(child)?, reference)
            .map_err(|e| backend(op, &e))?;
        Ok(())
    }

    fn remove_child(&mut self, parent: HostHandle, child: HostHandle) -> Result<(), HostError> {
        let child_node = self.live(child)?;
        let parent_node = self.live(parent)?;
        if child_node.parent_node().as_ref() != Some(parent_node) {
            return Err(HostError::Rejected {
                op: HostOp::RemoveChild,
                handle: child,
            });
        }
        parent_node
            .remove_child(child_node)
            .map_err(|e| backend(HostOp::RemoveChild, &e))?;
        Ok(())
    }

    fn update_attributes(&mut self, handle: HostHandle, delta: &AttrDelta) -> Result<(), HostError> {
        let op = HostOp::UpdateAttributes;
        let element = self.element(handle, op)?;
        for name in &delta.removed {
            element
                .remove_attribute(name)
                .map_err(|e| backend(op, &e))?;
        }
        for (name, value) in &delta.set {
            write_attribute(element, name, value).map_err(|e| backend(op, &e))?;
        }
        Ok(())
    }

    fn set_text(&mut self, handle: HostHandle, value: &str) -> Result<(), HostError> {
        let node = self.live(handle)?;
        if node.node_type() != Node::TEXT_NODE {
            return Err(HostError::Rejected {
                op: HostOp::SetText,
                handle,
            });
        }
        node.set_text_content(Some(value));
        Ok(())
    }

    fn release_node(&mut self, handle: HostHandle) {
        if let Some(slot) = usize::try_from(handle.0)
            .ok()
            .and_then(|i| self.nodes.get_mut(i))
        {
            *slot = None;
        }
    }
}
