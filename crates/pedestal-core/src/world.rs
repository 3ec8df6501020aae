//! Host capabilities a station needs during a tick.
//!
//! The station never reaches into the world. Everything it asks of its
//! surroundings goes through the traits here, bundled per tick in a
//! [`TickContext`].

use crate::config::StationConfig;
use crate::id::ItemTypeId;
use crate::item::{ItemCatalog, ItemStack};
use crate::rule::{RuleGate, RuleSource};
use crate::slots::{CraftingGrid, Face};
use crate::station::Owner;

/// Something adjacent that accepts items.
pub trait Receiver {
    /// Offer a stack entering through `from` (the receiver's own face).
    /// Returns whatever did not fit.
    fn try_insert(&mut self, stack: ItemStack, from: Face) -> Option<ItemStack>;
}

/// What occupies the space directly above the station.
pub enum Above<'a> {
    /// Free space: output is ejected as a free item.
    Open,
    /// An inventory that output is handed to.
    Receiver(&'a mut dyn Receiver),
    /// Solid, non-receiving.
    Obstructed,
}

impl std::fmt::Debug for Above<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Above::Open => f.write_str("Open"),
            Above::Receiver(_) => f.write_str("Receiver(..)"),
            Above::Obstructed => f.write_str("Obstructed"),
        }
    }
}

/// The host's view of the station's surroundings.
pub trait StationWorld {
    /// Whether the station may progress this tick (e.g. not redstone-locked).
    fn is_enabled(&self) -> bool;

    fn above(&mut self) -> Above<'_>;

    /// Whether the owner may run a gated rule. Stations without an owner
    /// ask with `None`.
    fn owner_permits(&self, owner: Option<&Owner>, gate: &RuleGate) -> bool;
}

/// Everything one tick borrows from its caller.
pub struct TickContext<'a> {
    pub rules: &'a dyn RuleSource,
    pub catalog: &'a dyn ItemCatalog,
    pub config: &'a StationConfig,
    pub world: &'a mut dyn StationWorld,
    /// Caller-owned 3×3 scratch view, reloaded before every fallback test.
    pub scratch: &'a mut CraftingGrid,
}

// ---------------------------------------------------------------------------
// ItemBuffer: reference receiver
// ---------------------------------------------------------------------------

/// A bounded multi-stack inventory usable as a [`Receiver`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemBuffer {
    pub stacks: Vec<ItemStack>,
    pub capacity: u32,
}

impl ItemBuffer {
    pub fn new(capacity: u32) -> Self {
        Self {
            stacks: Vec::new(),
            capacity,
        }
    }

    /// Add a stack. Returns the amount that didn't fit.
    #[must_use = "overflow count indicates items that did not fit"]
    pub fn add(&mut self, stack: &ItemStack) -> u32 {
        let space = self.capacity.saturating_sub(self.total());
        let to_add = stack.count.min(space);
        if to_add > 0 {
            match self.stacks.iter_mut().find(|s| s.stacks_with(stack)) {
                Some(existing) => existing.count += to_add,
                None => self.stacks.push(stack.with_count(to_add)),
            }
        }
        stack.count - to_add
    }

    pub fn quantity(&self, item: ItemTypeId) -> u32 {
        self.stacks
            .iter()
            .filter(|s| s.item_type == item)
            .map(|s| s.count)
            .sum()
    }

    pub fn total(&self) -> u32 {
        self.stacks.iter().map(|s| s.count).sum()
    }
}

impl Receiver for ItemBuffer {
    fn try_insert(&mut self, stack: ItemStack, _from: Face) -> Option<ItemStack> {
        let overflow = self.add(&stack);
        (overflow > 0).then(|| stack.with_count(overflow))
    }
}
