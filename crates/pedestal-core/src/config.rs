//! Station configuration.
//!
//! One [`StationConfig`] is shared by every station of a kind. It carries the
//! tunables the tick pipeline reads: container cap, fallback duration, how
//! fractional rewards are rounded, which catalysts each tier exposes
//! laterally, and how hard dispatched items are ejected.

use crate::fixed::{Fixed64, Ticks};
use crate::rng::SimRng;
use crate::slots::Catalyst;
use crate::station::StationTier;
use serde::{Deserialize, Serialize};

/// Errors reported by [`StationConfig::validate`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("max_per_slot must be at least 1")]
    ZeroSlotCap,
    #[error("fallback_duration must be at least 1 tick")]
    ZeroFallbackDuration,
    #[error("tier {tier} exposes {count} catalysts, at most {} exist", Catalyst::ALL.len())]
    TooManyCatalysts { tier: u8, count: u8 },
    #[error("exposure entries must be sorted by ascending min_tier")]
    UnsortedExposure,
}

/// How a fractional pending reward becomes a whole number of units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardRounding {
    /// Floor, plus one more unit with probability equal to the fraction.
    #[default]
    Stochastic,
    /// Round to nearest, halves round up.
    HalfUp,
    /// Always round down.
    Floor,
}

impl RewardRounding {
    /// Round a non-negative amount. Negative amounts round to zero.
    pub fn round(self, amount: Fixed64, rng: &mut SimRng) -> u32 {
        if amount <= Fixed64::ZERO {
            return 0;
        }
        let whole: u32 = amount.int().to_num();
        let frac = amount.frac();
        match self {
            RewardRounding::Stochastic => whole + u32::from(rng.chance(frac)),
            RewardRounding::HalfUp => whole + u32::from(frac >= Fixed64::from_num(0.5)),
            RewardRounding::Floor => whole,
        }
    }
}

/// Number of catalyst kinds exposed to lateral faces from a tier upward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierExposure {
    pub min_tier: StationTier,
    pub catalysts: u8,
}

/// Tunables shared by all stations of one kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StationConfig {
    /// Container-wide cap on a single slot's count.
    pub max_per_slot: u32,
    /// Duration of every fallback rule.
    pub fallback_duration: Ticks,
    pub reward_rounding: RewardRounding,
    /// Lateral catalyst exposure, ascending by `min_tier`. Tiers below the
    /// first entry expose nothing laterally.
    pub exposure: Vec<TierExposure>,
    /// Upward speed given to items ejected into open space.
    pub eject_speed: Fixed64,
    /// Seed for each new station's reward RNG.
    pub rng_seed: u64,
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            max_per_slot: 64,
            fallback_duration: 20,
            reward_rounding: RewardRounding::Stochastic,
            exposure: vec![
                TierExposure { min_tier: StationTier(0), catalysts: 3 },
                TierExposure { min_tier: StationTier(4), catalysts: 4 },
                TierExposure { min_tier: StationTier(5), catalysts: 5 },
            ],
            eject_speed: Fixed64::from_num(0.1),
            rng_seed: 0x5EED,
        }
    }
}

impl StationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_per_slot == 0 {
            return Err(ConfigError::ZeroSlotCap);
        }
        if self.fallback_duration == 0 {
            return Err(ConfigError::ZeroFallbackDuration);
        }
        for entry in &self.exposure {
            if usize::from(entry.catalysts) > Catalyst::ALL.len() {
                return Err(ConfigError::TooManyCatalysts {
                    tier: entry.min_tier.0,
                    count: entry.catalysts,
                });
            }
        }
        if self.exposure.windows(2).any(|w| w[0].min_tier >= w[1].min_tier) {
            return Err(ConfigError::UnsortedExposure);
        }
        Ok(())
    }

    /// Catalyst kinds a lateral face exposes at the given tier.
    pub fn lateral_catalysts(&self, tier: StationTier) -> &'static [Catalyst] {
        let count = self
            .exposure
            .iter()
            .rev()
            .find(|e| e.min_tier <= tier)
            .map_or(0, |e| usize::from(e.catalysts).min(Catalyst::ALL.len()));
        &Catalyst::ALL[..count]
    }
}
