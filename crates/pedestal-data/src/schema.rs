//! Serde structs mirroring the on-disk data files.
//!
//! Names are plain strings here; [`crate::loader`] resolves them into ids
//! while building the registry. Fractional values are `f64` and only become
//! fixed-point once loaded.

use pedestal_core::config::{RewardRounding, StationConfig, TierExposure};
use pedestal_core::fixed::{f64_to_fixed64, fixed64_to_f64};
use pedestal_core::slots::Catalyst;
use pedestal_core::station::StationTier;
use serde::Deserialize;
use std::collections::BTreeMap;

// ===========================================================================
// Items
// ===========================================================================

/// An item type definition.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemData {
    pub name: String,
    #[serde(default = "default_max_stack")]
    pub max_stack: u32,
    /// Item left in the grid when one unit is consumed (e.g. an empty bucket).
    #[serde(default)]
    pub remainder: Option<String>,
    /// Producing this item upgrades a station to the given tier.
    #[serde(default)]
    pub tier: Option<u8>,
    #[serde(default)]
    pub template: bool,
    /// Marks the item as the catalyst of this kind.
    #[serde(default)]
    pub catalyst: Option<Catalyst>,
}

fn default_max_stack() -> u32 {
    64
}

/// TOML wrapper: `[[items]]` array of tables.
#[derive(Debug, Clone, Deserialize)]
pub struct TomlItems {
    pub items: Vec<ItemData>,
}

// ===========================================================================
// Rules
// ===========================================================================

/// Which rule family a definition belongs to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKindData {
    #[default]
    Primary,
    Fallback,
}

/// One grid cell: a single item name, or a list of accepted names.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum IngredientData {
    One(String),
    AnyOf(Vec<String>),
}

impl IngredientData {
    pub fn names(&self) -> &[String] {
        match self {
            IngredientData::One(name) => std::slice::from_ref(name),
            IngredientData::AnyOf(names) => names,
        }
    }
}

/// Grid arrangement of a rule.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternData {
    /// Rows of single-character keys; a space is an empty cell. Short rows
    /// are padded with empty cells to the widest row.
    Shaped {
        rows: Vec<String>,
        key: BTreeMap<String, IngredientData>,
    },
    Shapeless { ingredients: Vec<IngredientData> },
}

/// Rule output.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OutputData {
    /// Short form: `("item_name", count)`.
    Short(String, u32),
    Full {
        item: String,
        #[serde(default = "default_count")]
        count: u32,
    },
}

fn default_count() -> u32 {
    1
}

impl OutputData {
    pub fn item(&self) -> &str {
        match self {
            OutputData::Short(item, _) | OutputData::Full { item, .. } => item,
        }
    }

    pub fn count(&self) -> u32 {
        match *self {
            OutputData::Short(_, count) | OutputData::Full { count, .. } => count,
        }
    }
}

/// Catalyst amounts consumed per run, by kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CatalystData {
    pub cyan: u32,
    pub magenta: u32,
    pub yellow: u32,
    pub black: u32,
    pub white: u32,
}

impl CatalystData {
    /// Non-zero amounts in slot order.
    pub fn amounts(&self) -> impl Iterator<Item = (Catalyst, u32)> {
        [self.cyan, self.magenta, self.yellow, self.black, self.white]
            .into_iter()
            .zip(Catalyst::ALL)
            .filter(|&(amount, _)| amount > 0)
            .map(|(amount, catalyst)| (catalyst, amount))
    }

    pub fn is_free(&self) -> bool {
        self.amounts().next().is_none()
    }
}

/// A rule definition. Fallback rules only use `pattern` and `output`.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleData {
    pub name: String,
    #[serde(default)]
    pub kind: RuleKindData,
    pub pattern: PatternData,
    pub output: OutputData,
    /// Ticks per run. Required for primary rules.
    #[serde(default)]
    pub duration: Option<u32>,
    #[serde(default)]
    pub catalysts: CatalystData,
    #[serde(default)]
    pub reward: f64,
    /// Advancement the owner must hold.
    #[serde(default)]
    pub gate: Option<u32>,
    #[serde(default)]
    pub sound: Option<u32>,
}

/// TOML wrapper: `[[rules]]` array of tables.
#[derive(Debug, Clone, Deserialize)]
pub struct TomlRules {
    pub rules: Vec<RuleData>,
}

// ===========================================================================
// Station config
// ===========================================================================

/// Lateral exposure entry.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ExposureData {
    pub min_tier: u8,
    pub catalysts: u8,
}

/// Station tunables. Every field is optional and defaults to
/// [`StationConfig::default`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConfigData {
    pub max_per_slot: u32,
    pub fallback_duration: u32,
    pub reward_rounding: RewardRounding,
    pub exposure: Vec<ExposureData>,
    pub eject_speed: f64,
    pub rng_seed: u64,
}

impl Default for ConfigData {
    fn default() -> Self {
        let config = StationConfig::default();
        Self {
            max_per_slot: config.max_per_slot,
            fallback_duration: config.fallback_duration,
            reward_rounding: config.reward_rounding,
            exposure: config
                .exposure
                .iter()
                .map(|e| ExposureData {
                    min_tier: e.min_tier.0,
                    catalysts: e.catalysts,
                })
                .collect(),
            eject_speed: fixed64_to_f64(config.eject_speed),
            rng_seed: config.rng_seed,
        }
    }
}

impl ConfigData {
    pub fn into_config(self) -> StationConfig {
        StationConfig {
            max_per_slot: self.max_per_slot,
            fallback_duration: self.fallback_duration,
            reward_rounding: self.reward_rounding,
            exposure: self
                .exposure
                .into_iter()
                .map(|e| TierExposure {
                    min_tier: StationTier(e.min_tier),
                    catalysts: e.catalysts,
                })
                .collect(),
            eject_speed: f64_to_fixed64(self.eject_speed),
            rng_seed: self.rng_seed,
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================
