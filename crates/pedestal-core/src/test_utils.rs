//! Shared test helpers for unit tests, integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests, integration tests, and benchmarks (via the
//! `test-utils` feature).

use crate::config::StationConfig;
use crate::fixed::Fixed64;
use crate::id::{AdvancementId, SoundId, StationId};
use crate::item::{ItemCatalog, ItemStack};
use crate::registry::{ItemDef, Registry, RegistryBuilder};
use crate::rule::{FallbackRule, Ingredient, Pattern, PrimaryRule, RuleGate, RuleSource};
use crate::slots::{Catalyst, CraftingGrid, SlotContainer};
use crate::station::{Owner, Station, StationTier};
use crate::workshop::WorkshopWorld;
use crate::world::{Above, ItemBuffer, StationWorld, TickContext};
use std::cell::Cell;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

// ===========================================================================
// Fixed-point helper
// ===========================================================================

pub fn fixed(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

// ===========================================================================
// Sample registry
// ===========================================================================

/// A small registry covering every rule shape the station handles.
///
/// Primaries, in scan order:
/// - `infused_planks`: one log + 2 cyan, 40 ticks, 8 plank, reward 1.5, sound 7
/// - `polished_stone`: two stone side by side + 1 black, gated on advancement 1
/// - `onyx_upgrade`: one onyx shard + 4 black, produces a tier-4 station item
///
/// Fallbacks: `planks` (log to 4 plank), `stone_pair` (two stone to bricks),
/// `cake` (milk bucket + plank, the bucket stays behind).
pub fn sample_registry() -> Registry {
    let mut b = RegistryBuilder::new();
    let stone = b.register_item(ItemDef::new("stone"));
    let plank = b.register_item(ItemDef::new("plank"));
    let log = b.register_item(ItemDef::new("log"));
    for (catalyst, name) in [
        (Catalyst::Cyan, "cyan_powder"),
        (Catalyst::Magenta, "magenta_powder"),
        (Catalyst::Yellow, "yellow_powder"),
        (Catalyst::Black, "black_powder"),
        (Catalyst::White, "white_powder"),
    ] {
        let id = b.register_item(ItemDef::new(name));
        b.set_catalyst(catalyst, id);
    }
    b.register_item(ItemDef::new("template").as_template().with_max_stack(1));
    b.register_item(ItemDef::new("pickaxe").with_max_stack(1));
    let bucket = b.register_item(ItemDef::new("bucket").with_max_stack(16));
    let milk = b.register_item(ItemDef::new("milk_bucket").with_max_stack(1).with_remainder(bucket));
    let cake = b.register_item(ItemDef::new("cake").with_max_stack(1));
    let shard = b.register_item(ItemDef::new("onyx_shard"));
    let onyx_station = b.register_item(ItemDef::new("onyx_station").with_tier(StationTier(4)));
    let polished = b.register_item(ItemDef::new("polished_stone"));
    let bricks = b.register_item(ItemDef::new("stone_bricks"));

    b.register_primary(
        PrimaryRule::new(
            "infused_planks",
            Pattern::shapeless(vec![Ingredient::of(log)]),
            ItemStack::new(plank, 8),
            40,
        )
        .with_catalyst(Catalyst::Cyan, 2)
        .with_reward(fixed(1.5))
        .with_sound(SoundId(7)),
    );
    b.register_primary(
        PrimaryRule::new(
            "polished_stone",
            Pattern::shaped(2, 1, vec![Ingredient::of(stone), Ingredient::of(stone)]),
            ItemStack::new(polished, 2),
            30,
        )
        .with_catalyst(Catalyst::Black, 1)
        .with_gate(AdvancementId(1)),
    );
    b.register_primary(
        PrimaryRule::new(
            "onyx_upgrade",
            Pattern::shapeless(vec![Ingredient::of(shard)]),
            ItemStack::new(onyx_station, 1),
            10,
        )
        .with_catalyst(Catalyst::Black, 4)
        .with_reward(fixed(2.0)),
    );

    b.register_fallback(FallbackRule::new(
        "planks",
        Pattern::shapeless(vec![Ingredient::of(log)]),
        ItemStack::new(plank, 4),
    ));
    b.register_fallback(FallbackRule::new(
        "stone_pair",
        Pattern::shaped(2, 1, vec![Ingredient::of(stone), Ingredient::of(stone)]),
        ItemStack::new(bricks, 1),
    ));
    b.register_fallback(FallbackRule::new(
        "cake",
        Pattern::shapeless(vec![Ingredient::of(milk), Ingredient::of(plank)]),
        ItemStack::new(cake, 1),
    ));

    b.build().expect("sample registry is valid")
}

/// Write `count` of the named item into a slot with the default config.
pub fn put(station: &mut Station, registry: &Registry, slot: usize, name: &str, count: u32) {
    let item = registry
        .item_id(name)
        .unwrap_or_else(|| panic!("unknown item {name}"));
    station
        .set_stack(slot, Some(ItemStack::new(item, count)), registry, &StationConfig::default())
        .expect("slot in range");
}

pub fn context<'a>(
    rules: &'a dyn RuleSource,
    catalog: &'a dyn ItemCatalog,
    config: &'a StationConfig,
    world: &'a mut dyn StationWorld,
    scratch: &'a mut CraftingGrid,
) -> TickContext<'a> {
    TickContext {
        rules,
        catalog,
        config,
        world,
        scratch,
    }
}

// ===========================================================================
// Worlds
// ===========================================================================

#[derive(Debug, Clone)]
enum TestAbove {
    Open,
    Receiver(ItemBuffer),
    Obstructed,
}

/// Single-station world with a configurable space above.
#[derive(Debug, Clone)]
pub struct TestWorld {
    above: TestAbove,
    pub enabled: bool,
    pub permit_gates: bool,
}

impl TestWorld {
    fn with_above(above: TestAbove) -> Self {
        Self {
            above,
            enabled: true,
            permit_gates: true,
        }
    }

    pub fn open() -> Self {
        Self::with_above(TestAbove::Open)
    }

    pub fn obstructed() -> Self {
        Self::with_above(TestAbove::Obstructed)
    }

    pub fn with_receiver(buffer: ItemBuffer) -> Self {
        Self::with_above(TestAbove::Receiver(buffer))
    }

    pub fn denying_gates(mut self) -> Self {
        self.permit_gates = false;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn receiver(&self) -> Option<&ItemBuffer> {
        match &self.above {
            TestAbove::Receiver(buffer) => Some(buffer),
            _ => None,
        }
    }
}

impl StationWorld for TestWorld {
    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn above(&mut self) -> Above<'_> {
        match &mut self.above {
            TestAbove::Open => Above::Open,
            TestAbove::Receiver(buffer) => Above::Receiver(buffer),
            TestAbove::Obstructed => Above::Obstructed,
        }
    }

    fn owner_permits(&self, _owner: Option<&Owner>, _gate: &RuleGate) -> bool {
        self.permit_gates
    }
}

/// Multi-station world: open space everywhere unless configured otherwise.
#[derive(Debug, Clone, Default)]
pub struct SharedWorld {
    disabled: HashSet<StationId>,
    obstructed: HashSet<StationId>,
    receivers: HashMap<StationId, ItemBuffer>,
    pub permit_gates: bool,
}

impl SharedWorld {
    pub fn open() -> Self {
        Self {
            permit_gates: true,
            ..Self::default()
        }
    }

    pub fn disable(&mut self, station: StationId) {
        self.disabled.insert(station);
    }

    pub fn enable(&mut self, station: StationId) {
        self.disabled.remove(&station);
    }

    pub fn obstruct(&mut self, station: StationId) {
        self.obstructed.insert(station);
    }

    pub fn attach_receiver(&mut self, station: StationId, buffer: ItemBuffer) {
        self.receivers.insert(station, buffer);
    }

    pub fn receiver(&self, station: StationId) -> Option<&ItemBuffer> {
        self.receivers.get(&station)
    }
}

impl WorkshopWorld for SharedWorld {
    fn is_enabled(&self, station: StationId) -> bool {
        !self.disabled.contains(&station)
    }

    fn above(&mut self, station: StationId) -> Above<'_> {
        if self.obstructed.contains(&station) {
            return Above::Obstructed;
        }
        match self.receivers.get_mut(&station) {
            Some(buffer) => Above::Receiver(buffer),
            None => Above::Open,
        }
    }

    fn owner_permits(&self, _station: StationId, _owner: Option<&Owner>, _gate: &RuleGate) -> bool {
        self.permit_gates
    }
}

// ===========================================================================
// Instrumented rule source
// ===========================================================================

/// Delegates to a [`Registry`] and counts full registry scans.
pub struct CountingRules<'a> {
    inner: &'a Registry,
    scans: Cell<usize>,
}

impl<'a> CountingRules<'a> {
    pub fn new(inner: &'a Registry) -> Self {
        Self {
            inner,
            scans: Cell::new(0),
        }
    }

    pub fn scans(&self) -> usize {
        self.scans.get()
    }
}

impl RuleSource for CountingRules<'_> {
    fn first_primary(&self, container: &SlotContainer, grid: &CraftingGrid) -> Option<Arc<PrimaryRule>> {
        self.scans.set(self.scans.get() + 1);
        self.inner.first_primary(container, grid)
    }

    fn first_fallback(&self, grid: &CraftingGrid) -> Option<Arc<FallbackRule>> {
        self.scans.set(self.scans.get() + 1);
        self.inner.first_fallback(grid)
    }

    fn primary_matches(&self, rule: &PrimaryRule, container: &SlotContainer, grid: &CraftingGrid) -> bool {
        self.inner.primary_matches(rule, container, grid)
    }

    fn stored_rule(&self, template: &ItemStack) -> Option<crate::rule::Rule> {
        self.inner.stored_rule(template)
    }
}
