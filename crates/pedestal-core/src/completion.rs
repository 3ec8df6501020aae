//! Completion: consume inputs, then upgrade the station or accumulate output.

use crate::event::StationEvent;
use crate::fixed::Fixed64;
use crate::item::ItemStack;
use crate::progress::can_accept;
use crate::rule::Rule;
use crate::slots::{GRID_SLOTS, OUTPUT_SLOT};
use crate::station::Station;
use crate::world::TickContext;

/// Which way a completion resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The station's tier was raised; the output slot was left alone.
    Upgrade,
    /// The rule output was added to the output slot.
    Accumulate,
}

impl Station {
    /// Run one completion of `rule`. Returns `false` without touching
    /// anything when the output slot can no longer take the result.
    pub(crate) fn complete(&mut self, rule: &Rule, ctx: &TickContext<'_>, events: &mut Vec<StationEvent>) -> bool {
        if !can_accept(Some(rule), self.slots.output(), ctx.catalog, ctx.config).is_accepting() {
            tracing::debug!(rule = %rule.name(), "completion refused, output cannot accept");
            return false;
        }

        self.consume_grid(ctx);
        if let Some(cost) = rule.catalysts() {
            for (catalyst, amount) in cost.iter().filter(|(_, n)| *n > 0) {
                let removed = self.slots.shrink(catalyst.slot(), amount);
                debug_assert_eq!(removed, amount, "catalyst {catalyst:?} short at completion");
            }
        }

        let outcome = self.apply_outcome(rule, ctx, events);

        // Pending reward only lives while there is output to carry it.
        self.pending_reward = if self.slots.output().is_some() {
            rule.reward()
        } else {
            Fixed64::ZERO
        };

        if let Rule::Primary(primary) = rule
            && let Some(owner) = &self.owner
        {
            events.push(StationEvent::Crafted {
                owner: owner.id,
                rule: primary.id,
                output: primary.output.clone(),
            });
        }

        tracing::debug!(rule = %rule.name(), ?outcome, reward = %self.pending_reward, "completed");
        true
    }

    /// Take one unit from every occupied grid slot, or swap in the item's
    /// remainder when it declares one.
    fn consume_grid(&mut self, ctx: &TickContext<'_>) {
        for slot in 0..GRID_SLOTS {
            let Some(stack) = self.slots.get(slot) else {
                continue;
            };
            match ctx.catalog.remainder(stack.item_type) {
                Some(remainder) => {
                    self.slots.replace(slot, Some(ItemStack::new(remainder, 1)));
                }
                None => {
                    self.slots.shrink(slot, 1);
                }
            }
        }
    }

    fn apply_outcome(&mut self, rule: &Rule, ctx: &TickContext<'_>, events: &mut Vec<StationEvent>) -> Outcome {
        let produced = rule.output();
        if rule.is_primary()
            && let Some(to) = ctx.catalog.station_tier(produced.item_type)
            && to > self.tier
        {
            let from = self.tier;
            self.tier = to;
            tracing::debug!(?from, ?to, "station upgraded");
            events.push(StationEvent::Upgraded { from, to });
            return Outcome::Upgrade;
        }

        let merged = match self.slots.output() {
            None => produced.clone(),
            Some(held) => held.with_count(held.count + produced.count),
        };
        self.slots.replace(OUTPUT_SLOT, Some(merged));
        Outcome::Accumulate
    }
}
