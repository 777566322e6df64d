// Copyright 2026 the Graft Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tree traversal utilities.

use super::id::{INVALID, UnitId};
use super::tree::UnitTree;

/// An iterator over the direct children of a unit.
///
/// Created by [`UnitTree::children`].
#[derive(Debug)]
pub struct Children<'a> {
    tree: &'a UnitTree,
    current: u32,
}

impl<'a> Children<'a> {
    pub(crate) fn new(tree: &'a UnitTree, first: u32) -> Self {
        Self {
            tree,
            current: first,
        }
    }
}

impl Iterator for Children<'_> {
    type Item = UnitId;

    fn next(&mut self) -> Option<UnitId> {
        if self.current == INVALID {
            return None;
        }
        let idx = self.current;
        self.current = self.tree.next_sibling[idx as usize];
        Some(self.tree.id_at(idx))
    }
}

/// A pre-order iterator over a subtree, starting with its root.
///
/// Created by [`UnitTree::descendants`]. Walks the sibling links directly,
/// so it needs no auxiliary stack.
#[derive(Debug)]
pub struct Descendants<'a> {
    tree: &'a UnitTree,
    start: u32,
    current: u32,
}

impl<'a> Descendants<'a> {
    pub(crate) fn new(tree: &'a UnitTree, start: u32) -> Self {
        Self {
            tree,
            start,
            current: start,
        }
    }
}

impl Iterator for Descendants<'_> {
    type Item = UnitId;

    fn next(&mut self) -> Option<UnitId> {
        if self.current == INVALID {
            return None;
        }
        let idx = self.current;
        let tree = self.tree;

        self.current = if tree.first_child[idx as usize] != INVALID {
            tree.first_child[idx as usize]
        } else {
            let mut n = idx;
            loop {
                if n == self.start {
                    break INVALID;
                }
                let next = tree.next_sibling[n as usize];
                if next != INVALID {
                    break next;
                }
                n = tree.parent[n as usize];
                if n == INVALID {
                    break INVALID;
                }
            }
        };
        Some(tree.id_at(idx))
    }
}
