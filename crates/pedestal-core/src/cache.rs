//! Active rule resolution with a sticky last-match cache.
//!
//! Precedence, in order:
//!
//! 1. cached primary rule that still matches the container;
//! 2. cached fallback rule that still matches the 3×3 projection;
//! 3. first primary rule in the registry, provided its owner gate permits
//!    (a denied gate ends resolution: no fallback is tried);
//! 4. first fallback rule;
//! 5. nothing, and the cache is cleared.
//!
//! Steps 3 to 5 restart progress from zero.

use crate::event::StationEvent;
use crate::rule::Rule;
use crate::station::Station;
use crate::world::TickContext;

impl Station {
    /// Resolve the rule that currently applies, updating the cache and the
    /// progress target.
    pub fn resolve_active_rule(&mut self, ctx: &mut TickContext<'_>) -> Option<Rule> {
        self.resolve(ctx, &mut Vec::new())
    }

    pub(crate) fn resolve(&mut self, ctx: &mut TickContext<'_>, events: &mut Vec<StationEvent>) -> Option<Rule> {
        ctx.scratch.load(&self.slots);

        let still_matches = match &self.progress.cached {
            Some(Rule::Primary(rule)) => ctx.rules.primary_matches(rule, &self.slots, ctx.scratch),
            Some(Rule::Fallback(rule)) => ctx.rules.fallback_matches(rule, ctx.scratch),
            None => false,
        };
        if still_matches {
            return self.progress.cached.clone();
        }

        self.progress.counter = 0;

        if let Some(primary) = ctx.rules.first_primary(&self.slots, ctx.scratch) {
            if let Some(gate) = &primary.gate
                && !ctx.world.owner_permits(self.owner.as_ref(), gate)
            {
                tracing::debug!(rule = %primary.name, "owner gate denied primary rule");
                return None;
            }
            return Some(self.adopt(Rule::Primary(primary), ctx, events));
        }

        if let Some(fallback) = ctx.rules.first_fallback(ctx.scratch) {
            return Some(self.adopt(Rule::Fallback(fallback), ctx, events));
        }

        self.progress.cached = None;
        None
    }

    fn adopt(&mut self, rule: Rule, ctx: &TickContext<'_>, events: &mut Vec<StationEvent>) -> Rule {
        self.progress.target = rule.duration(ctx.config).max(1);
        tracing::debug!(
            rule = %rule.name(),
            primary = rule.is_primary(),
            target = self.progress.target,
            "adopted rule"
        );
        events.push(StationEvent::RuleAdopted { rule: rule.id() });
        self.progress.cached = Some(rule.clone());
        rule
    }
}
