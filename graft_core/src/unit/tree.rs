// Copyright 2026 the Graft Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Struct-of-arrays unit storage: allocation, topology, and reconciliation state.

use alloc::vec;
use alloc::vec::Vec;

use hashbrown::HashSet;

use crate::describe::NodeRef;
use crate::error::InvariantViolation;
use crate::host::HostHandle;

use super::attributes::Attributes;
use super::id::{INVALID, UnitId};
use super::kind::{Key, PendingEffect, UnitKind};
use super::traverse::{Children, Descendants};

/// Struct-of-arrays storage for one tree snapshot.
///
/// Units are addressed by [`UnitId`] handles. A snapshot is built front to
/// back during a rendering pass and never frees individual units; instead
/// the whole arena is [`reset`](Self::reset) when the snapshot is discarded
/// or retired. Each reset installs a new serial so that every id handed out
/// before it becomes stale.
#[derive(Debug)]
pub struct UnitTree {
    // -- Topology --
    pub(crate) parent: Vec<u32>,
    pub(crate) first_child: Vec<u32>,
    pub(crate) last_child: Vec<u32>,
    pub(crate) next_sibling: Vec<u32>,
    pub(crate) prev_sibling: Vec<u32>,

    // -- Content (shared with the description) --
    pub(crate) desc: Vec<NodeRef>,

    // -- Reconciliation state --
    pub(crate) host: Vec<Option<HostHandle>>,
    pub(crate) prior: Vec<Option<UnitId>>,
    pub(crate) pending: Vec<PendingEffect>,
    pub(crate) subtree_effects: Vec<u32>,

    // -- Identity --
    serial: u32,
    root: u32,
}

impl UnitTree {
    /// Creates an empty snapshot with the given serial.
    #[must_use]
    pub fn new(serial: u32) -> Self {
        Self {
            parent: Vec::new(),
            first_child: Vec::new(),
            last_child: Vec::new(),
            next_sibling: Vec::new(),
            prev_sibling: Vec::new(),
            desc: Vec::new(),
            host: Vec::new(),
            prior: Vec::new(),
            pending: Vec::new(),
            subtree_effects: Vec::new(),
            serial,
            root: INVALID,
        }
    }

    /// Returns the serial of this snapshot.
    #[must_use]
    pub fn serial(&self) -> u32 {
        self.serial
    }

    /// Returns the number of units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.desc.len()
    }

    /// Returns `true` if the snapshot holds no units.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.desc.is_empty()
    }

    /// Returns the root unit, if one has been installed.
    #[must_use]
    pub fn root(&self) -> Option<UnitId> {
        (self.root != INVALID).then(|| self.id_at(self.root))
    }

    /// Returns whether `id` refers to a unit of this snapshot.
    #[must_use]
    pub fn contains(&self, id: UnitId) -> bool {
        id.snapshot == self.serial && (id.idx as usize) < self.len()
    }

    // -- Allocation API --

    /// Allocates a detached unit built from `desc`.
    pub(crate) fn alloc(&mut self, desc: NodeRef, prior: Option<UnitId>) -> UnitId {
        let idx = u32::try_from(self.desc.len()).unwrap_or(INVALID);
        assert!(idx != INVALID, "unit arena exhausted");
        self.parent.push(INVALID);
        self.first_child.push(INVALID);
        self.last_child.push(INVALID);
        self.next_sibling.push(INVALID);
        self.prev_sibling.push(INVALID);
        self.desc.push(desc);
        self.host.push(None);
        self.prior.push(prior);
        self.pending.push(PendingEffect::None);
        self.subtree_effects.push(0);
        self.id_at(idx)
    }

    /// Builds a detached unit that shares kind, key, attributes, text and
    /// description with `prior` and carries its host handle.
    ///
    /// The new unit records `prior` as its prior version. Children are not
    /// copied.
    pub fn clone_for_update(
        &mut self,
        prior_tree: &Self,
        prior: UnitId,
    ) -> Result<UnitId, InvariantViolation> {
        let p = prior_tree.check(prior)?;
        let id = self.alloc(prior_tree.desc[p].clone(), Some(prior));
        self.host[id.idx as usize] = prior_tree.host[p];
        Ok(id)
    }

    /// Copies the children of `src` (in `src_tree`) under `dst`, recursively,
    /// via [`clone_for_update`](Self::clone_for_update).
    ///
    /// Returns the number of units copied.
    pub(crate) fn copy_children_from(
        &mut self,
        dst: UnitId,
        src_tree: &Self,
        src: UnitId,
    ) -> Result<usize, InvariantViolation> {
        src_tree.check(src)?;
        self.check(dst)?;
        let mut copied = 0;
        let mut stack = vec![(src, dst)];
        while let Some((s, d)) = stack.pop() {
            for child in src_tree.children(s) {
                let copy = self.clone_for_update(src_tree, child)?;
                self.append_child(d, copy);
                stack.push((child, copy));
                copied += 1;
            }
        }
        Ok(copied)
    }

    /// Installs `id` as the root unit.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or the unit has a parent.
    pub(crate) fn set_root(&mut self, id: UnitId) {
        let idx = self.validate(id);
        assert!(self.parent[idx] == INVALID, "root unit has a parent");
        self.root = id.idx;
    }

    /// Clears every unit and installs a new serial, keeping capacity.
    pub fn reset(&mut self, serial: u32) {
        self.parent.clear();
        self.first_child.clear();
        self.last_child.clear();
        self.next_sibling.clear();
        self.prev_sibling.clear();
        self.desc.clear();
        self.host.clear();
        self.prior.clear();
        self.pending.clear();
        self.subtree_effects.clear();
        self.serial = serial;
        self.root = INVALID;
    }

    // -- Topology API --

    /// Adds `child` as the last child of `parent`.
    ///
    /// # Panics
    ///
    /// Panics if either handle is stale, or if `child` already has a parent.
    pub(crate) fn append_child(&mut self, parent: UnitId, child: UnitId) {
        let p = self.validate(parent);
        let c = self.validate(child);
        assert!(self.parent[c] == INVALID, "child already has a parent");

        self.parent[c] = parent.idx;
        self.next_sibling[c] = INVALID;
        let last = self.last_child[p];
        self.prev_sibling[c] = last;
        if last == INVALID {
            self.first_child[p] = child.idx;
        } else {
            self.next_sibling[last as usize] = child.idx;
        }
        self.last_child[p] = child.idx;
    }

    /// Returns the parent of a unit, if any.
    #[must_use]
    pub fn parent(&self, id: UnitId) -> Option<UnitId> {
        let idx = self.validate(id);
        self.link(self.parent[idx])
    }

    /// Returns the next sibling of a unit, if any.
    #[must_use]
    pub fn next_sibling(&self, id: UnitId) -> Option<UnitId> {
        let idx = self.validate(id);
        self.link(self.next_sibling[idx])
    }

    /// Returns the previous sibling of a unit, if any.
    #[must_use]
    pub fn prev_sibling(&self, id: UnitId) -> Option<UnitId> {
        let idx = self.validate(id);
        self.link(self.prev_sibling[idx])
    }

    /// Returns the first child of a unit, if any.
    #[must_use]
    pub fn first_child(&self, id: UnitId) -> Option<UnitId> {
        let idx = self.validate(id);
        self.link(self.first_child[idx])
    }

    /// Returns the last child of a unit, if any.
    #[must_use]
    pub fn last_child(&self, id: UnitId) -> Option<UnitId> {
        let idx = self.validate(id);
        self.link(self.last_child[idx])
    }

    /// Returns an iterator over the direct children of a unit.
    #[must_use]
    pub fn children(&self, id: UnitId) -> Children<'_> {
        let idx = self.validate(id);
        Children::new(self, self.first_child[idx])
    }

    /// Returns a pre-order iterator over the subtree rooted at `id`.
    #[must_use]
    pub fn descendants(&self, id: UnitId) -> Descendants<'_> {
        self.validate(id);
        Descendants::new(self, id.idx)
    }

    /// Returns whether `ancestor` is `id` or one of its ancestors.
    #[must_use]
    pub fn is_ancestor_or_self(&self, ancestor: UnitId, id: UnitId) -> bool {
        if !self.contains(ancestor) || !self.contains(id) {
            return false;
        }
        let mut n = id.idx;
        while n != INVALID {
            if n == ancestor.idx {
                return true;
            }
            n = self.parent[n as usize];
        }
        false
    }

    /// Returns the nearest strict ancestor that owns a host node.
    #[must_use]
    pub fn host_ancestor(&self, id: UnitId) -> Option<UnitId> {
        let idx = self.validate(id);
        let mut n = self.parent[idx];
        while n != INVALID {
            if self.desc[n as usize].kind().is_host_facing() {
                return Some(self.id_at(n));
            }
            n = self.parent[n as usize];
        }
        None
    }

    /// Appends the outermost host-facing units of the subtree at `id` to
    /// `out`, in document order.
    ///
    /// For a host-facing unit this is the unit itself. For composite,
    /// fragment and placeholder units it is the host-facing units reachable
    /// without crossing another host-facing unit.
    pub fn top_host_units(&self, id: UnitId, out: &mut Vec<UnitId>) {
        self.validate(id);
        let mut stack = vec![id.idx];
        while let Some(idx) = stack.pop() {
            if self.desc[idx as usize].kind().is_host_facing() {
                out.push(self.id_at(idx));
                continue;
            }
            let mut c = self.last_child[idx as usize];
            while c != INVALID {
                stack.push(c);
                c = self.prev_sibling[c as usize];
            }
        }
    }

    // -- Property getters --

    /// Returns the kind of a unit.
    #[must_use]
    pub fn kind(&self, id: UnitId) -> &UnitKind {
        let idx = self.validate(id);
        self.desc[idx].kind()
    }

    /// Returns the key of a unit, if any.
    #[must_use]
    pub fn key(&self, id: UnitId) -> Option<&Key> {
        let idx = self.validate(id);
        self.desc[idx].key_ref()
    }

    /// Returns the attributes of a unit.
    #[must_use]
    pub fn attributes(&self, id: UnitId) -> &Attributes {
        let idx = self.validate(id);
        self.desc[idx].attributes()
    }

    /// Returns the text content of a text unit.
    #[must_use]
    pub fn text(&self, id: UnitId) -> Option<&str> {
        let idx = self.validate(id);
        self.desc[idx].text_value()
    }

    /// Returns the description a unit was built from.
    #[must_use]
    pub fn description(&self, id: UnitId) -> &NodeRef {
        let idx = self.validate(id);
        &self.desc[idx]
    }

    /// Returns the host handle of a unit, if one has been created.
    #[must_use]
    pub fn host(&self, id: UnitId) -> Option<HostHandle> {
        let idx = self.validate(id);
        self.host[idx]
    }

    /// Returns the prior version of a unit (an id in the current snapshot).
    #[must_use]
    pub fn prior(&self, id: UnitId) -> Option<UnitId> {
        let idx = self.validate(id);
        self.prior[idx]
    }

    /// Returns the pending-effect tag of a unit.
    #[must_use]
    pub fn pending(&self, id: UnitId) -> PendingEffect {
        let idx = self.validate(id);
        self.pending[idx]
    }

    /// Returns the number of effect records emitted for the subtree at `id`.
    ///
    /// Only complete once the unit's work item has completed.
    #[must_use]
    pub fn subtree_effects(&self, id: UnitId) -> u32 {
        let idx = self.validate(id);
        self.subtree_effects[idx]
    }

    // -- Reconciliation setters --

    pub(crate) fn set_host(&mut self, id: UnitId, handle: Option<HostHandle>) {
        let idx = self.validate(id);
        self.host[idx] = handle;
    }

    pub(crate) fn set_prior(&mut self, id: UnitId, prior: Option<UnitId>) {
        let idx = self.validate(id);
        self.prior[idx] = prior;
    }

    pub(crate) fn set_pending(&mut self, id: UnitId, pending: PendingEffect) {
        let idx = self.validate(id);
        self.pending[idx] = pending;
    }

    pub(crate) fn set_description(&mut self, id: UnitId, desc: NodeRef) {
        let idx = self.validate(id);
        self.desc[idx] = desc;
    }

    pub(crate) fn add_subtree_effects(&mut self, id: UnitId, count: u32) {
        let idx = self.validate(id);
        self.subtree_effects[idx] = self.subtree_effects[idx].saturating_add(count);
    }

    /// Drops every prior-version link. Called once the snapshot is promoted.
    pub(crate) fn clear_priors(&mut self) {
        self.prior.fill(None);
    }

    // -- Validation --

    /// Checks that `id` belongs to this snapshot, returning its slot.
    pub fn check(&self, id: UnitId) -> Result<usize, InvariantViolation> {
        if id.snapshot != self.serial {
            return Err(InvariantViolation::SnapshotMismatch {
                id,
                expected: self.serial,
            });
        }
        if (id.idx as usize) >= self.len() {
            return Err(InvariantViolation::StaleUnit(id));
        }
        Ok(id.idx as usize)
    }

    /// Verifies link symmetry, childless text units, and host-handle
    /// uniqueness.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let len = u32::try_from(self.len()).unwrap_or(INVALID);
        let in_range = |i: u32| i == INVALID || i < len;
        let mut handles = HashSet::new();

        for idx in 0..len {
            let i = idx as usize;
            let id = self.id_at(idx);
            let (p, prev, next) = (self.parent[i], self.prev_sibling[i], self.next_sibling[i]);
            let (first, last) = (self.first_child[i], self.last_child[i]);
            if ![p, prev, next, first, last].into_iter().all(in_range) {
                return Err(InvariantViolation::BrokenLink(id));
            }
            if next != INVALID
                && (self.prev_sibling[next as usize] != idx || self.parent[next as usize] != p)
            {
                return Err(InvariantViolation::BrokenLink(id));
            }
            if prev != INVALID && self.next_sibling[prev as usize] != idx {
                return Err(InvariantViolation::BrokenLink(id));
            }
            if p != INVALID {
                let p = p as usize;
                if (prev == INVALID) != (self.first_child[p] == idx)
                    || (next == INVALID) != (self.last_child[p] == idx)
                {
                    return Err(InvariantViolation::BrokenLink(id));
                }
            } else if prev != INVALID || next != INVALID {
                return Err(InvariantViolation::BrokenLink(id));
            }
            if first != INVALID && self.parent[first as usize] != idx {
                return Err(InvariantViolation::BrokenLink(id));
            }
            if (first == INVALID) != (last == INVALID) {
                return Err(InvariantViolation::BrokenLink(id));
            }
            if first != INVALID && !self.desc[i].kind().accepts_children() {
                return Err(InvariantViolation::TextWithChildren(id));
            }
            if let Some(handle) = self.host[i] {
                if !handles.insert(handle) {
                    return Err(InvariantViolation::SharedHostHandle(handle));
                }
            }
        }
        Ok(())
    }

    // -- Internal helpers --

    #[inline]
    pub(crate) fn id_at(&self, idx: u32) -> UnitId {
        UnitId {
            idx,
            snapshot: self.serial,
        }
    }

    #[inline]
    fn link(&self, idx: u32) -> Option<UnitId> {
        (idx != INVALID).then(|| self.id_at(idx))
    }

    /// Panics if the handle is stale, returning its slot otherwise.
    fn validate(&self, id: UnitId) -> usize {
        assert!(
            self.contains(id),
            "stale UnitId: {id:?} (snapshot {}, {} units)",
            self.serial,
            self.len()
        );
        id.idx as usize
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;
    use crate::describe::Node;

    fn el(tag: &str) -> NodeRef {
        Node::element(tag).build()
    }

    #[test]
    fn append_and_query_children() {
        let mut tree = UnitTree::new(1);
        let parent = tree.alloc(el("ul"), None);
        let a = tree.alloc(el("li"), None);
        let b = tree.alloc(el("li"), None);
        tree.append_child(parent, a);
        tree.append_child(parent, b);
        tree.set_root(parent);

        assert_eq!(tree.root(), Some(parent));
        assert_eq!(tree.parent(a), Some(parent));
        assert_eq!(tree.next_sibling(a), Some(b));
        assert_eq!(tree.prev_sibling(b), Some(a));
        let kids: Vec<_> = tree.children(parent).collect();
        assert_eq!(kids, vec![a, b]);
        assert!(tree.check_invariants().is_ok());
    }

    #[test]
    fn descendants_are_pre_order() {
        let mut tree = UnitTree::new(1);
        let root = tree.alloc(el("div"), None);
        let a = tree.alloc(el("a"), None);
        let a1 = tree.alloc(el("b"), None);
        let c = tree.alloc(el("c"), None);
        tree.append_child(root, a);
        tree.append_child(a, a1);
        tree.append_child(root, c);

        let order: Vec<_> = tree.descendants(root).collect();
        assert_eq!(order, vec![root, a, a1, c]);
        let sub: Vec<_> = tree.descendants(a).collect();
        assert_eq!(sub, vec![a, a1], "walk stays inside the subtree");
    }

    #[test]
    fn top_host_units_look_through_fragments() {
        let mut tree = UnitTree::new(1);
        let frag = tree.alloc(Node::fragment().build(), None);
        let inner = tree.alloc(Node::composite("Row").build(), None);
        let x = tree.alloc(el("x"), None);
        let x_child = tree.alloc(el("y"), None);
        let z = tree.alloc(el("z"), None);
        tree.append_child(frag, inner);
        tree.append_child(inner, x);
        tree.append_child(x, x_child);
        tree.append_child(frag, z);

        let mut out = Vec::new();
        tree.top_host_units(frag, &mut out);
        assert_eq!(out, vec![x, z]);
        assert_eq!(tree.host_ancestor(x_child), Some(x));
        assert_eq!(tree.host_ancestor(x), None);
    }

    #[test]
    fn clone_for_update_shares_description_and_handle() {
        let mut current = UnitTree::new(1);
        let desc = el("p");
        let prior = current.alloc(desc.clone(), None);
        current.set_host(prior, Some(HostHandle(7)));

        let mut wip = UnitTree::new(2);
        let unit = wip.clone_for_update(&current, prior).unwrap();
        assert!(alloc::rc::Rc::ptr_eq(wip.description(unit), &desc));
        assert_eq!(wip.host(unit), Some(HostHandle(7)));
        assert_eq!(wip.prior(unit), Some(prior));
    }

    #[test]
    fn copy_children_preserves_order_and_shape() {
        let mut current = UnitTree::new(1);
        let root = current.alloc(el("div"), None);
        let a = current.alloc(el("a"), None);
        let b = current.alloc(el("b"), None);
        let b1 = current.alloc(el("i"), None);
        current.append_child(root, a);
        current.append_child(root, b);
        current.append_child(b, b1);

        let mut wip = UnitTree::new(2);
        let copy = wip.clone_for_update(&current, root).unwrap();
        assert_eq!(wip.copy_children_from(copy, &current, root).unwrap(), 3);
        let tags: Vec<_> = wip
            .descendants(copy)
            .map(|u| alloc::format!("{}", wip.kind(u)))
            .collect();
        assert_eq!(tags, ["<div>", "<a>", "<b>", "<i>"]);
    }

    #[test]
    fn reset_invalidates_old_ids() {
        let mut tree = UnitTree::new(1);
        let id = tree.alloc(el("div"), None);
        assert!(tree.contains(id));
        tree.reset(2);
        assert!(!tree.contains(id));
        assert!(tree.is_empty());
        assert_eq!(
            tree.check(id),
            Err(InvariantViolation::SnapshotMismatch { id, expected: 2 })
        );
    }

    #[test]
    fn shared_handles_are_detected() {
        let mut tree = UnitTree::new(1);
        let root = tree.alloc(el("div"), None);
        let a = tree.alloc(el("a"), None);
        tree.append_child(root, a);
        tree.set_host(root, Some(HostHandle(1)));
        tree.set_host(a, Some(HostHandle(1)));
        assert_eq!(
            tree.check_invariants(),
            Err(InvariantViolation::SharedHostHandle(HostHandle(1)))
        );
    }

    #[test]
    #[should_panic(expected = "child already has a parent")]
    fn append_attached_child_panics() {
        let mut tree = UnitTree::new(1);
        let p1 = tree.alloc(el("a"), None);
        let p2 = tree.alloc(el("b"), None);
        let c = tree.alloc(el("c"), None);
        tree.append_child(p1, c);
        tree.append_child(p2, c);
    }

    #[test]
    #[should_panic(expected = "stale UnitId")]
    fn stale_handle_panics_on_kind() {
        let mut tree = UnitTree::new(1);
        let id = tree.alloc(el("div"), None);
        tree.reset(2);
        let _ = tree.kind(id);
    }

    #[test]
    #[should_panic(expected = "stale UnitId")]
    fn foreign_snapshot_panics_on_parent() {
        let mut a = UnitTree::new(1);
        let b = UnitTree::new(2);
        let id = a.alloc(el("div"), None);
        let _ = b.parent(id);
    }
}
