// Copyright 2026 the Graft Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Single-level diffing of work-in-progress units against their priors.
//!
//! The differ is a pure function of the current snapshot and the unit being
//! begun: it decides what the unit needs, emits the matching effect records,
//! and builds (but does not visit) the unit's work-in-progress children.
//! It knows nothing about lanes, budgets, or yielding; the scheduler decides
//! when each unit is begun.
//!
//! Per-unit decision:
//!
//! | prior                        | description            | decision  |
//! |------------------------------|------------------------|-----------|
//! | absent                       | any                    | insert    |
//! | different kind or key        | any                    | replace   |
//! | same kind and key            | pointer-identical      | bailout   |
//! | same kind and key            | otherwise              | update    |
//!
//! Effects emitted while beginning one unit, in order: the unit's own
//! removal/insertion or update, then removals of deleted old children, then
//! moves of reused children from left to right.

mod children;

use alloc::rc::Rc;
use alloc::vec::Vec;

use crate::describe::NodeRef;
use crate::effect::{EffectList, EffectOp, EffectRecord, UnitRef};
use crate::error::{DescriptionError, InvariantViolation};
use crate::logging::warn;
use crate::unit::{PendingEffect, UnitId, UnitKind, UnitTree};

/// What the differ decided for one unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Decision {
    /// No prior version; the subtree is built fresh.
    Insert,
    /// The prior version is structurally incompatible and is replaced.
    Replace,
    /// Reused; attributes or text may have changed.
    Update,
    /// Reused along with its whole subtree, without diffing it.
    Bailout,
}

impl Decision {
    /// Whether the scheduler should visit the unit's children.
    #[must_use]
    pub const fn descends(self) -> bool {
        !matches!(self, Self::Bailout)
    }
}

/// Borrowed state of one pass, as seen by the differ.
pub(crate) struct Differ<'a> {
    pub(crate) current: &'a UnitTree,
    pub(crate) wip: &'a mut UnitTree,
    pub(crate) effects: &'a mut EffectList,
    pub(crate) errors: &'a mut Vec<DescriptionError>,
}

impl Differ<'_> {
    /// Decides what `unit` needs, emits its effects, and builds its children.
    pub(crate) fn begin_unit(&mut self, unit: UnitId) -> Result<Decision, InvariantViolation> {
        self.wip.check(unit)?;
        let desc = self.wip.description(unit).clone();
        let moved = self.wip.pending(unit) == PendingEffect::Move;
        let current = self.current;

        let Some(prior) = self.wip.prior(unit) else {
            self.insert(unit, desc.kind(), PendingEffect::Insert);
            self.reconcile_children(unit, None, &desc)?;
            return Ok(Decision::Insert);
        };
        current.check(prior)?;
        let old = current.description(prior);

        let incompatible = old.kind() != desc.kind()
            || old.key_ref() != desc.key_ref()
            || (desc.kind().is_host_facing() && current.host(prior).is_none());
        if incompatible {
            self.remove_subtree(prior, PendingEffect::Replace);
            self.wip.set_prior(unit, None);
            self.wip.set_host(unit, None);
            self.insert(unit, desc.kind(), PendingEffect::Replace);
            self.reconcile_children(unit, None, &desc)?;
            return Ok(Decision::Replace);
        }

        self.wip.set_host(unit, current.host(prior));
        if Rc::ptr_eq(old, &desc) {
            self.wip.copy_children_from(unit, current, prior)?;
            return Ok(Decision::Bailout);
        }

        let changed = self.update(unit, old, &desc);
        if changed && !moved {
            self.wip.set_pending(unit, PendingEffect::Update);
        }
        self.reconcile_children(unit, Some(prior), &desc)?;
        Ok(Decision::Update)
    }

    fn insert(&mut self, unit: UnitId, kind: &UnitKind, cause: PendingEffect) {
        self.wip.set_pending(unit, cause);
        if kind.is_host_facing() {
            self.effects.push(EffectRecord {
                target: UnitRef::WorkInProgress(unit),
                handle: None,
                op: EffectOp::Insert,
                cause,
            });
        }
    }

    /// Emits attribute or text updates. Returns whether anything changed.
    fn update(&mut self, unit: UnitId, old: &NodeRef, new: &NodeRef) -> bool {
        let handle = self.wip.host(unit);
        let op = match new.kind() {
            UnitKind::Element(_) => {
                let delta = old.attributes().diff(new.attributes());
                (!delta.is_empty()).then_some(EffectOp::UpdateAttributes(delta))
            }
            UnitKind::Text => match (old.text_value(), new.text_value()) {
                (a, b) if a == b => None,
                (_, b) => Some(EffectOp::SetText(Rc::from(b.unwrap_or_default()))),
            },
            UnitKind::Composite(_) | UnitKind::Fragment | UnitKind::Placeholder => None,
        };
        let Some(op) = op else {
            return false;
        };
        self.effects.push(EffectRecord {
            target: UnitRef::WorkInProgress(unit),
            handle,
            op,
            cause: PendingEffect::Update,
        });
        true
    }

    /// Emits removals for the outermost host nodes of a current subtree.
    pub(crate) fn remove_subtree(&mut self, prior: UnitId, cause: PendingEffect) {
        let mut tops = Vec::new();
        self.current.top_host_units(prior, &mut tops);
        for top in tops {
            if let Some(handle) = self.current.host(top) {
                self.effects.push(EffectRecord {
                    target: UnitRef::Current(top),
                    handle: Some(handle),
                    op: EffectOp::Remove,
                    cause,
                });
            }
        }
    }

    fn report(&mut self, error: DescriptionError) {
        warn!(%error, "description error");
        self.errors.push(error);
    }
}
