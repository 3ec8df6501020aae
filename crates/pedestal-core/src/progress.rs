//! Per-tick progress state machine.

use crate::config::StationConfig;
use crate::fixed::Ticks;
use crate::item::{ItemCatalog, ItemStack};
use crate::rule::Rule;
use crate::station::{Station, TickReport, slot_cap};
use crate::world::TickContext;

/// Counter, target and the last matched rule.
///
/// `counter` stays within `0..=target`. The cached rule is never persisted.
#[derive(Debug, Clone, Default)]
pub struct CraftingProgress {
    pub(crate) counter: Ticks,
    pub(crate) target: Ticks,
    pub(crate) cached: Option<Rule>,
}

impl CraftingProgress {
    pub fn counter(&self) -> Ticks {
        self.counter
    }

    pub fn target(&self) -> Ticks {
        self.target
    }

    pub fn cached(&self) -> Option<&Rule> {
        self.cached.as_ref()
    }

    /// The externally visible activity flag.
    pub fn is_active(&self) -> bool {
        self.counter > 0
    }

    pub fn phase(&self) -> CraftingPhase {
        if self.is_active() {
            CraftingPhase::Accepting
        } else {
            CraftingPhase::Idle
        }
    }

    /// Drop the cached rule and restart from zero.
    pub fn invalidate(&mut self) {
        self.cached = None;
        self.counter = 0;
    }
}

/// Where the progress state machine ended up after one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CraftingPhase {
    /// Counter at zero.
    #[default]
    Idle,
    /// Counter in `1..target`.
    Accepting,
    /// Counter reached target this tick and completion ran.
    CompletingThisTick,
}

/// Whether the output slot can take one more run of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanAccept {
    NoRule,
    /// Output slot holds something the rule output does not stack with.
    Mismatch,
    /// Output stacks, but another run would exceed a cap.
    Full,
    Empty,
    Fits,
}

impl CanAccept {
    pub fn is_accepting(self) -> bool {
        matches!(self, CanAccept::Empty | CanAccept::Fits)
    }
}

/// Can the output slot absorb one more run of `rule`?
///
/// The whole output count must fit under both the container's per-slot cap
/// and the item's own stacking cap.
pub fn can_accept(
    rule: Option<&Rule>,
    output_slot: Option<&ItemStack>,
    catalog: &dyn ItemCatalog,
    config: &StationConfig,
) -> CanAccept {
    let Some(rule) = rule else {
        return CanAccept::NoRule;
    };
    let produced = rule.output();
    match output_slot {
        None => CanAccept::Empty,
        Some(held) if !held.stacks_with(produced) => CanAccept::Mismatch,
        Some(held) => {
            if held.count.saturating_add(produced.count) <= slot_cap(held, catalog, config) {
                CanAccept::Fits
            } else {
                CanAccept::Full
            }
        }
    }
}

impl Station {
    /// One step of the progress state machine for the resolved rule.
    pub(crate) fn advance(&mut self, rule: Option<&Rule>, ctx: &mut TickContext<'_>, report: &mut TickReport) -> CraftingPhase {
        let verdict = can_accept(rule, self.slots.output(), ctx.catalog, ctx.config);
        let Some(rule) = rule.filter(|_| verdict.is_accepting()) else {
            if self.progress.counter > 0 {
                tracing::trace!(?verdict, counter = self.progress.counter, "progress aborted");
            }
            self.progress.counter = 0;
            return CraftingPhase::Idle;
        };

        self.progress.counter += 1;
        debug_assert!(self.progress.counter <= self.progress.target, "counter overran target");
        if self.progress.counter < self.progress.target {
            return CraftingPhase::Accepting;
        }

        self.progress.counter = 0;
        report.dirty = true;
        report.crafted = self.complete(rule, ctx, &mut report.events);
        CraftingPhase::CompletingThisTick
    }
}
