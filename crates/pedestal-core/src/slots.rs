//! The station's fixed 16-slot container and its insertion policy.
//!
//! Layout:
//!
//! | slots    | zone |
//! |----------|------|
//! | `0..9`   | crafting grid, row-major 3×3 |
//! | `9..14`  | catalysts, one per [`Catalyst`] |
//! | `14`     | recipe template |
//! | `15`     | output buffer |

use crate::config::StationConfig;
use crate::item::{ItemCatalog, ItemStack};
use crate::rule::{Pattern, RuleSource};
use crate::station::StationTier;
use serde::{Deserialize, Serialize};

pub const GRID_WIDTH: usize = 3;
pub const GRID_SLOTS: usize = GRID_WIDTH * GRID_WIDTH;
pub const CATALYST_START: usize = GRID_SLOTS;
pub const TEMPLATE_SLOT: usize = 14;
pub const OUTPUT_SLOT: usize = 15;
pub const SLOT_COUNT: usize = 16;

/// Errors from direct container access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SlotError {
    #[error("slot {0} is out of range (container has {SLOT_COUNT} slots)")]
    OutOfRange(usize),
}

// ---------------------------------------------------------------------------
// Catalysts and faces
// ---------------------------------------------------------------------------

/// The five catalyst kinds, each with a dedicated slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Catalyst {
    Cyan,
    Magenta,
    Yellow,
    Black,
    White,
}

impl Catalyst {
    /// All kinds in slot order. Lower tiers expose a prefix of this list.
    pub const ALL: [Catalyst; 5] = [
        Catalyst::Cyan,
        Catalyst::Magenta,
        Catalyst::Yellow,
        Catalyst::Black,
        Catalyst::White,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn slot(self) -> usize {
        CATALYST_START + self.index()
    }

    pub fn from_slot(slot: usize) -> Option<Self> {
        slot.checked_sub(CATALYST_START)
            .and_then(|i| Catalyst::ALL.get(i).copied())
    }
}

/// A face of the station, as seen by an adjacent block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Face {
    Down,
    Up,
    North,
    South,
    West,
    East,
}

impl Face {
    pub fn is_lateral(self) -> bool {
        !matches!(self, Face::Down | Face::Up)
    }
}

/// What a slot is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    Grid,
    Catalyst(Catalyst),
    Template,
    Output,
}

pub fn zone(slot: usize) -> Option<Zone> {
    match slot {
        s if s < GRID_SLOTS => Some(Zone::Grid),
        TEMPLATE_SLOT => Some(Zone::Template),
        OUTPUT_SLOT => Some(Zone::Output),
        s => Catalyst::from_slot(s).map(Zone::Catalyst),
    }
}

/// Slots reachable from a face. The template slot is never exposed.
pub fn exposed_slots(face: Face, tier: StationTier, config: &StationConfig) -> Vec<usize> {
    match face {
        Face::Down => vec![OUTPUT_SLOT],
        Face::Up => (0..GRID_SLOTS).collect(),
        _ => config
            .lateral_catalysts(tier)
            .iter()
            .map(|c| c.slot())
            .collect(),
    }
}

/// Grid slot index to ingredient index for a stored pattern `recipe_width`
/// wide. `None` for the padding columns right of the pattern.
pub fn template_ingredient_index(slot: usize, recipe_width: usize) -> Option<usize> {
    let column = slot % GRID_WIDTH;
    if column >= recipe_width {
        return None;
    }
    Some((slot / GRID_WIDTH) * recipe_width + column)
}

// ---------------------------------------------------------------------------
// SlotContainer
// ---------------------------------------------------------------------------

/// How a write changed a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotChange {
    /// Same item (and data) as before, only the count differs.
    Restock,
    /// The slot now holds something different, or became empty.
    Replaced,
}

/// Fixed-size ordered container. Empty slots are `None`; zero-count stacks
/// are never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotContainer {
    slots: Vec<Option<ItemStack>>,
}

impl Default for SlotContainer {
    fn default() -> Self {
        Self::new()
    }
}

impl SlotContainer {
    pub fn new() -> Self {
        Self {
            slots: vec![None; SLOT_COUNT],
        }
    }

    pub fn get(&self, slot: usize) -> Option<&ItemStack> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    pub fn is_occupied(&self, slot: usize) -> bool {
        self.get(slot).is_some()
    }

    /// Replace a slot's contents.
    pub fn set(&mut self, slot: usize, stack: Option<ItemStack>) -> Result<SlotChange, SlotError> {
        let cell = self.slots.get_mut(slot).ok_or(SlotError::OutOfRange(slot))?;
        let stack = stack.filter(|s| !s.is_empty());
        let change = match (cell.as_ref(), stack.as_ref()) {
            (Some(old), Some(new)) if old.stacks_with(new) => SlotChange::Restock,
            _ => SlotChange::Replaced,
        };
        *cell = stack;
        Ok(change)
    }

    /// Split up to `amount` units off a slot.
    pub fn take(&mut self, slot: usize, amount: u32) -> Result<Option<ItemStack>, SlotError> {
        let cell = self.slots.get_mut(slot).ok_or(SlotError::OutOfRange(slot))?;
        let Some(stack) = cell.as_mut() else {
            return Ok(None);
        };
        let taken = amount.min(stack.count);
        if taken == 0 {
            return Ok(None);
        }
        let split = stack.with_count(taken);
        stack.count -= taken;
        if stack.count == 0 {
            *cell = None;
        }
        Ok(Some(split))
    }

    /// Overwrite a slot the engine itself manages. Out-of-range indices are
    /// ignored, as in `shrink`.
    pub(crate) fn replace(&mut self, slot: usize, stack: Option<ItemStack>) {
        if let Some(cell) = self.slots.get_mut(slot) {
            *cell = stack.filter(|s| !s.is_empty());
        }
    }

    /// Remove up to `amount` units in place. Returns the amount removed.
    pub(crate) fn shrink(&mut self, slot: usize, amount: u32) -> u32 {
        let Some(cell) = self.slots.get_mut(slot) else {
            return 0;
        };
        let Some(stack) = cell.as_mut() else {
            return 0;
        };
        let removed = amount.min(stack.count);
        stack.count -= removed;
        if stack.count == 0 {
            *cell = None;
        }
        removed
    }

    pub fn grid(&self) -> &[Option<ItemStack>] {
        &self.slots[..GRID_SLOTS]
    }

    pub fn output(&self) -> Option<&ItemStack> {
        self.get(OUTPUT_SLOT)
    }

    pub fn template(&self) -> Option<&ItemStack> {
        self.get(TEMPLATE_SLOT)
    }

    /// Units held in a catalyst slot, provided they are the catalyst's item.
    pub fn catalyst_count(&self, catalyst: Catalyst, catalog: &dyn ItemCatalog) -> u32 {
        match (self.get(catalyst.slot()), catalog.catalyst_item(catalyst)) {
            (Some(stack), Some(item)) if stack.item_type == item => stack.count,
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &ItemStack)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|s| (i, s)))
    }

    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|s| *s = None);
    }

    // -- Insertion policy --

    /// Face-independent placement policy (manual placement).
    pub fn is_valid(&self, slot: usize, stack: &ItemStack, catalog: &dyn ItemCatalog) -> bool {
        match zone(slot) {
            Some(Zone::Grid) => true,
            Some(Zone::Catalyst(c)) => catalog.catalyst_item(c) == Some(stack.item_type),
            Some(Zone::Template) => catalog.is_template(stack.item_type),
            Some(Zone::Output) | None => false,
        }
    }

    /// Automation insertion policy for one slot.
    ///
    /// Grid slots accept anything unless a template occupies the template
    /// slot; then only an empty slot whose position in the stored pattern
    /// accepts the stack.
    pub fn is_insertable(
        &self,
        slot: usize,
        stack: &ItemStack,
        catalog: &dyn ItemCatalog,
        rules: &dyn RuleSource,
    ) -> bool {
        if zone(slot) != Some(Zone::Grid) {
            return self.is_valid(slot, stack, catalog);
        }
        let Some(template) = self.template().filter(|t| catalog.is_template(t.item_type)) else {
            return true;
        };
        if self.is_occupied(slot) {
            return false;
        }
        let Some(stored) = rules.stored_rule(template) else {
            return false;
        };
        let pattern = stored.pattern();
        let width = match pattern {
            Pattern::Shaped { width, .. } => usize::from(*width),
            Pattern::Shapeless { .. } => GRID_WIDTH,
        };
        template_ingredient_index(slot, width)
            .and_then(|i| pattern.ingredients().get(i))
            .is_some_and(|ingredient| ingredient.test(Some(stack)))
    }
}

// ---------------------------------------------------------------------------
// CraftingGrid
// ---------------------------------------------------------------------------

/// A 3×3 view of the crafting grid used for fallback matching.
///
/// Owned by the caller and reloaded from the container on every use, so one
/// grid can serve any number of stations without carrying state between them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CraftingGrid {
    cells: [Option<ItemStack>; GRID_SLOTS],
}

impl CraftingGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite every cell with the container's grid zone.
    pub fn load(&mut self, container: &SlotContainer) {
        for (cell, slot) in self.cells.iter_mut().zip(container.grid()) {
            cell.clone_from(slot);
        }
    }

    pub fn from_cells(cells: [Option<ItemStack>; GRID_SLOTS]) -> Self {
        Self { cells }
    }

    pub fn cell(&self, index: usize) -> Option<&ItemStack> {
        self.cells.get(index).and_then(Option::as_ref)
    }

    pub fn at(&self, x: usize, y: usize) -> Option<&ItemStack> {
        if x >= GRID_WIDTH || y >= GRID_WIDTH {
            return None;
        }
        self.cell(y * GRID_WIDTH + x)
    }

    pub fn occupied(&self) -> impl Iterator<Item = &ItemStack> {
        self.cells.iter().filter_map(Option::as_ref)
    }

    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(Option::is_none)
    }
}
