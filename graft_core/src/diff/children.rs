// Copyright 2026 the Graft Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Sibling-list reconciliation.
//!
//! Children are matched between the prior and the new list by key. Unkeyed
//! children get an implicit key: their index among the unkeyed siblings, so
//! keyed siblings moving around do not disturb positional matches. When a
//! sibling group contains a repeated key the whole group is matched by
//! position instead.
//!
//! Reused children whose old positions form a longest increasing
//! subsequence (in new order) stay put; every other reused child gets one
//! move. For a permutation that is exactly `n - LCS(old, new)` moves.

use alloc::vec;
use alloc::vec::Vec;

use hashbrown::{HashMap, HashSet};

use crate::describe::NodeRef;
use crate::effect::{EffectOp, EffectRecord, UnitRef};
use crate::error::{DescriptionError, InvariantViolation};
use crate::unit::{Key, PendingEffect, UnitId};

use super::Differ;

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
enum Slot<'k> {
    Keyed(&'k Key),
    Implicit(usize),
}

/// Assigns match slots to a sibling list. Returns the first repeated key.
fn slots<'k>(keys: impl Iterator<Item = Option<&'k Key>>) -> (Vec<Slot<'k>>, Option<&'k Key>) {
    let mut out = Vec::new();
    let mut seen = HashSet::new();
    let mut duplicate = None;
    let mut unkeyed = 0;
    for key in keys {
        let slot = match key {
            Some(key) => {
                if !seen.insert(key) {
                    duplicate.get_or_insert(key);
                }
                Slot::Keyed(key)
            }
            None => {
                unkeyed += 1;
                Slot::Implicit(unkeyed - 1)
            }
        };
        out.push(slot);
    }
    (out, duplicate)
}

impl Differ<'_> {
    /// Builds the work-in-progress children of `parent` from `desc`,
    /// matching them against the children of `prior`.
    pub(super) fn reconcile_children(
        &mut self,
        parent: UnitId,
        prior: Option<UnitId>,
        desc: &NodeRef,
    ) -> Result<(), InvariantViolation> {
        let current = self.current;
        let new_children = desc.children_ref();
        let old_children: Vec<UnitId> = match prior {
            Some(prior) => current.children(prior).collect(),
            None => Vec::new(),
        };

        let matches = self.match_children(parent, &old_children, new_children);

        // Removals of old children with no counterpart.
        let mut used = vec![false; old_children.len()];
        for &old in matches.iter().flatten() {
            used[old] = true;
        }
        for (&old, &is_used) in old_children.iter().zip(&used) {
            if !is_used {
                self.remove_subtree(old, PendingEffect::Delete);
            }
        }

        // Work-in-progress children, in new order.
        let mut reused = Vec::new();
        let mut ids = Vec::with_capacity(new_children.len());
        for (n, child) in new_children.iter().enumerate() {
            let prior = matches[n].map(|o| old_children[o]);
            let id = self.wip.alloc(child.clone(), prior);
            self.wip.append_child(parent, id);
            ids.push(id);
            if let Some(o) = matches[n] {
                current.check(old_children[o])?;
                let old_desc = current.description(old_children[o]);
                if old_desc.kind() == child.kind() && old_desc.key_ref() == child.key_ref() {
                    reused.push((n, o));
                }
            }
        }

        // Moves, left to right.
        let order: Vec<usize> = reused.iter().map(|&(_, o)| o).collect();
        let keep = lis_mask(&order);
        for (&(n, o), keep) in reused.iter().zip(keep) {
            if keep {
                continue;
            }
            self.wip.set_pending(ids[n], PendingEffect::Move);
            self.effects.push(EffectRecord {
                target: UnitRef::WorkInProgress(ids[n]),
                handle: current.host(old_children[o]),
                op: EffectOp::Move,
                cause: PendingEffect::Move,
            });
        }
        Ok(())
    }

    /// For every new child, the index of its matched old child.
    fn match_children(
        &mut self,
        parent: UnitId,
        old: &[UnitId],
        new: &[NodeRef],
    ) -> Vec<Option<usize>> {
        let current = self.current;
        let (old_slots, old_dup) = slots(old.iter().map(|&u| current.key(u)));
        let (new_slots, new_dup) = slots(new.iter().map(|n| n.key_ref()));

        if let Some(key) = new_dup {
            self.report(DescriptionError::DuplicateKey {
                parent,
                key: key.clone(),
            });
        }
        if old_dup.is_some() || new_dup.is_some() {
            return (0..new.len()).map(|i| (i < old.len()).then_some(i)).collect();
        }

        let index: HashMap<Slot<'_>, usize> = old_slots
            .into_iter()
            .enumerate()
            .map(|(i, slot)| (slot, i))
            .collect();
        new_slots
            .iter()
            .map(|slot| index.get(slot).copied())
            .collect()
    }
}

/// Marks the members of one longest strictly increasing subsequence.
///
/// Patience sorting with predecessor links, `O(n log n)`.
pub(crate) fn lis_mask(seq: &[usize]) -> Vec<bool> {
    const NONE: usize = usize::MAX;
    let mut tails: Vec<usize> = Vec::new();
    let mut prev = vec![NONE; seq.len()];
    for (i, &x) in seq.iter().enumerate() {
        let pos = tails.partition_point(|&t| seq[t] < x);
        if pos > 0 {
            prev[i] = tails[pos - 1];
        }
        if pos == tails.len() {
            tails.push(i);
        } else {
            tails[pos] = i;
        }
    }
    let mut keep = vec![false; seq.len()];
    let mut k = tails.last().copied().unwrap_or(NONE);
    while k != NONE {
        keep[k] = true;
        k = prev[k];
    }
    keep
}
