//! The station: one slot container plus its crafting state.
//!
//! # Tick pipeline
//!
//! Each call to [`Station::tick`] runs, in order:
//!
//! 1. **Resolve** (enabled only): find the active rule, cached first
//!    (see [`cache`](crate::cache)).
//! 2. **Progress** (enabled only): advance or reset the counter and run
//!    completion when it reaches the target (see
//!    [`progress`](crate::progress), [`completion`](crate::completion)).
//! 3. **Dispatch** (always): drain the output slot upward (see
//!    [`dispatch`](crate::dispatch)).
//!
//! Side effects come back as [`StationEvent`]s in the [`TickReport`].

use crate::config::StationConfig;
use crate::dispatch::DispatchOutcome;
use crate::event::StationEvent;
use crate::fixed::Fixed64;
use crate::id::OwnerId;
use crate::item::{ItemCatalog, ItemStack};
use crate::progress::{CraftingPhase, CraftingProgress};
use crate::rng::SimRng;
use crate::rule::RuleSource;
use crate::serialize::StationRecord;
use crate::slots::{Face, OUTPUT_SLOT, SlotChange, SlotContainer, SlotError, TEMPLATE_SLOT, exposed_slots};
use crate::world::TickContext;
use serde::{Deserialize, Serialize};

/// Display name reported for stations without a named owner.
pub const UNKNOWN_OWNER: &str = "unknown";

/// Ordinal upgrade level of a station. Only ever increases.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StationTier(pub u8);

/// The actor a station belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub id: OwnerId,
    pub name: String,
}

/// Everything one tick produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub events: Vec<StationEvent>,
    pub phase: CraftingPhase,
    /// A completion ran and consumed inputs this tick.
    pub crafted: bool,
    /// State worth persisting changed this tick.
    pub dirty: bool,
    /// `None` when the output slot was empty.
    pub dispatch: Option<DispatchOutcome>,
}

/// An automated crafting station.
///
/// Serializes through [`StationRecord`](crate::serialize::StationRecord).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(into = "StationRecord", from = "StationRecord")]
pub struct Station {
    pub(crate) slots: SlotContainer,
    pub(crate) progress: CraftingProgress,
    pub(crate) pending_reward: Fixed64,
    pub(crate) tier: StationTier,
    pub(crate) owner: Option<Owner>,
    pub(crate) rng: SimRng,
}

impl Station {
    pub fn new(config: &StationConfig) -> Self {
        Self::with_tier(StationTier::default(), config)
    }

    pub fn with_tier(tier: StationTier, config: &StationConfig) -> Self {
        Self {
            slots: SlotContainer::new(),
            progress: CraftingProgress::default(),
            pending_reward: Fixed64::ZERO,
            tier,
            owner: None,
            rng: SimRng::new(config.rng_seed),
        }
    }

    // -- Accessors --

    pub fn slots(&self) -> &SlotContainer {
        &self.slots
    }

    pub fn progress(&self) -> &CraftingProgress {
        &self.progress
    }

    pub fn pending_reward(&self) -> Fixed64 {
        self.pending_reward
    }

    pub fn tier(&self) -> StationTier {
        self.tier
    }

    pub fn owner(&self) -> Option<&Owner> {
        self.owner.as_ref()
    }

    pub fn owner_name(&self) -> &str {
        self.owner.as_ref().map_or(UNKNOWN_OWNER, |o| o.name.as_str())
    }

    /// Assign the owner. Ownership is set once; later calls are ignored and
    /// return `false`.
    pub fn set_owner(&mut self, owner: Owner) -> bool {
        if self.owner.is_some() {
            return false;
        }
        self.owner = Some(owner);
        true
    }

    // -- Tick --

    /// Advance the station by one tick.
    pub fn tick(&mut self, ctx: &mut TickContext<'_>) -> TickReport {
        let mut report = TickReport::default();

        if ctx.world.is_enabled() {
            let was_active = self.progress.is_active();
            let rule = self.resolve(ctx, &mut report.events);
            report.phase = self.advance(rule.as_ref(), ctx, &mut report);

            let active = self.progress.is_active();
            if active != was_active {
                report.dirty = true;
                report.events.push(StationEvent::ActivityChanged { active });
            }
        } else {
            tracing::trace!("station disabled, skipping progress");
        }

        if self.slots.output().is_some() {
            let outcome = self.dispatch(report.crafted, ctx, &mut report.events);
            report.dirty |= outcome.moved_items();
            report.dispatch = Some(outcome);
        }

        debug_assert!(self.progress.counter() <= self.progress.target() || self.progress.target() == 0);
        report
    }

    // -- Slot access --

    /// Write a slot directly (manual placement or host sync). The count is
    /// clamped to both stacking caps. Replacing grid or catalyst contents
    /// with something other than a restock drops the cached rule and resets
    /// progress. Emptying the output slot forfeits the pending reward.
    pub fn set_stack(
        &mut self,
        slot: usize,
        stack: Option<ItemStack>,
        catalog: &dyn ItemCatalog,
        config: &StationConfig,
    ) -> Result<(), SlotError> {
        let stack = stack.map(|mut s| {
            s.count = s.count.min(slot_cap(&s, catalog, config));
            s
        });
        let change = self.slots.set(slot, stack)?;
        if slot < TEMPLATE_SLOT && change == SlotChange::Replaced {
            self.progress.invalidate();
        }
        if slot == OUTPUT_SLOT && self.slots.output().is_none() {
            self.pending_reward = Fixed64::ZERO;
        }
        Ok(())
    }

    /// Split up to `amount` units off a slot. Emptying the output slot
    /// forfeits the pending reward.
    pub fn take_stack(&mut self, slot: usize, amount: u32) -> Result<Option<ItemStack>, SlotError> {
        let taken = self.slots.take(slot, amount)?;
        if slot == OUTPUT_SLOT && self.slots.output().is_none() {
            self.pending_reward = Fixed64::ZERO;
        }
        Ok(taken)
    }

    pub fn exposed_slots(&self, face: Face, config: &StationConfig) -> Vec<usize> {
        exposed_slots(face, self.tier, config)
    }

    /// Automation insertion check: the face must expose the slot and the
    /// slot's policy must accept the stack.
    pub fn is_insertable(
        &self,
        slot: usize,
        stack: &ItemStack,
        face: Face,
        catalog: &dyn ItemCatalog,
        rules: &dyn RuleSource,
        config: &StationConfig,
    ) -> bool {
        self.exposed_slots(face, config).contains(&slot)
            && self.slots.is_insertable(slot, stack, catalog, rules)
    }

    /// Only the output slot can be extracted, and only from below.
    pub fn is_extractable(&self, slot: usize, face: Face) -> bool {
        slot == OUTPUT_SLOT && face == Face::Down
    }

    /// Insert through a face, filling exposed slots in order: merge into
    /// matching stacks first, then empty slots. Returns what did not fit.
    pub fn insert(
        &mut self,
        stack: ItemStack,
        face: Face,
        catalog: &dyn ItemCatalog,
        rules: &dyn RuleSource,
        config: &StationConfig,
    ) -> Option<ItemStack> {
        let mut remaining = stack;
        for merge_pass in [true, false] {
            for slot in self.exposed_slots(face, config) {
                if remaining.is_empty() {
                    return None;
                }
                if !self.slots.is_insertable(slot, &remaining, catalog, rules) {
                    continue;
                }
                let cap = slot_cap(&remaining, catalog, config);
                let held = match self.slots.get(slot) {
                    Some(existing) if merge_pass && existing.stacks_with(&remaining) => existing.count,
                    None if !merge_pass => 0,
                    _ => continue,
                };
                let moved = cap.saturating_sub(held).min(remaining.count);
                if moved == 0 {
                    continue;
                }
                let placed = remaining.with_count(held + moved);
                // Slot index comes from the exposure table, always in range.
                if self.set_stack(slot, Some(placed), catalog, config).is_ok() {
                    remaining.count -= moved;
                }
            }
        }
        (!remaining.is_empty()).then_some(remaining)
    }

    /// Extract up to `amount` units of output from below.
    pub fn extract(&mut self, face: Face, amount: u32) -> Option<ItemStack> {
        if !self.is_extractable(OUTPUT_SLOT, face) {
            return None;
        }
        let taken = self.slots.take(OUTPUT_SLOT, amount).ok().flatten();
        if self.slots.output().is_none() {
            self.pending_reward = Fixed64::ZERO;
        }
        taken
    }
}

/// The count a slot may hold for this stack.
pub(crate) fn slot_cap(stack: &ItemStack, catalog: &dyn ItemCatalog, config: &StationConfig) -> u32 {
    config.max_per_slot.min(catalog.max_stack(stack.item_type))
}
