//! Output dispatch: drain the output slot into the space above the station.

use crate::config::StationConfig;
use crate::event::{FeedbackCue, StationEvent, Velocity};
use crate::fixed::Fixed64;
use crate::rule::Rule;
use crate::slots::{Face, OUTPUT_SLOT};
use crate::station::Station;
use crate::world::{Above, TickContext};

/// What happened to the buffered output this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Spawned into open space.
    Ejected,
    /// A receiver took the whole stack.
    Delivered,
    /// A receiver took some or none of it; the rest stays buffered.
    Partial { delivered: u32, remaining: u32 },
    /// Nothing above can take output.
    Blocked,
}

impl DispatchOutcome {
    /// The output slot is empty afterwards.
    pub fn emptied(self) -> bool {
        matches!(self, DispatchOutcome::Ejected | DispatchOutcome::Delivered)
    }

    pub fn moved_items(self) -> bool {
        match self {
            DispatchOutcome::Ejected | DispatchOutcome::Delivered => true,
            DispatchOutcome::Partial { delivered, .. } => delivered > 0,
            DispatchOutcome::Blocked => false,
        }
    }
}

impl Station {
    /// Try to hand off the output slot. `crafted` says whether a completion
    /// ran this tick; blocked output is only reported then.
    pub(crate) fn dispatch(
        &mut self,
        crafted: bool,
        ctx: &mut TickContext<'_>,
        events: &mut Vec<StationEvent>,
    ) -> DispatchOutcome {
        debug_assert!(self.slots.output().is_some(), "dispatch with an empty output slot");
        let Some(stack) = self.slots.output().cloned() else {
            return DispatchOutcome::Blocked;
        };

        let outcome = match ctx.world.above() {
            Above::Open => {
                self.slots.replace(OUTPUT_SLOT, None);
                events.push(StationEvent::ItemSpawned {
                    stack,
                    velocity: Velocity::upward(ctx.config.eject_speed),
                });
                DispatchOutcome::Ejected
            }
            Above::Receiver(receiver) => {
                let offered = stack.count;
                let rest = receiver
                    .try_insert(stack.clone(), Face::Down)
                    .filter(|r| !r.is_empty());
                let remaining = rest.as_ref().map_or(0, |r| r.count.min(offered));
                let delivered = offered - remaining;
                if delivered > 0 {
                    events.push(StationEvent::ItemDelivered {
                        stack: stack.with_count(delivered),
                    });
                }
                match rest {
                    None => {
                        self.slots.replace(OUTPUT_SLOT, None);
                        DispatchOutcome::Delivered
                    }
                    Some(_) => {
                        self.slots.replace(OUTPUT_SLOT, Some(stack.with_count(remaining)));
                        DispatchOutcome::Partial { delivered, remaining }
                    }
                }
            }
            Above::Obstructed => DispatchOutcome::Blocked,
        };

        if outcome.emptied() {
            self.realize_reward(ctx.config, events);
            events.push(StationEvent::Feedback(self.success_cue()));
        } else if crafted {
            tracing::debug!(?outcome, "output blocked after completion");
            events.push(StationEvent::Feedback(FeedbackCue::Blocked));
        } else {
            tracing::trace!(?outcome, "output still buffered");
        }
        outcome
    }

    /// Round the pending reward into whole units and emit them.
    fn realize_reward(&mut self, config: &StationConfig, events: &mut Vec<StationEvent>) {
        if self.pending_reward > Fixed64::ZERO {
            let amount = config.reward_rounding.round(self.pending_reward, &mut self.rng);
            if amount > 0 {
                events.push(StationEvent::RewardSpawned { amount });
            }
        }
        self.pending_reward = Fixed64::ZERO;
    }

    /// The cue for a successful hand-off, taken from the cached rule.
    fn success_cue(&self) -> FeedbackCue {
        self.progress
            .cached
            .as_ref()
            .map_or(FeedbackCue::GenericCraft, Rule::success_cue)
    }
}
