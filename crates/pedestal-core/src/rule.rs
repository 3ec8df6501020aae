//! Production rules and the reference grid matcher.
//!
//! Two families compete for the station's contents:
//!
//! - [`PrimaryRule`]: a pattern plus catalyst costs, its own duration, a
//!   fractional reward and optionally an owner gate and a sound.
//! - [`FallbackRule`]: a plain 3×3 crafting pattern with the configured
//!   fallback duration and nothing else.
//!
//! Both are immutable and shared behind `Arc`; [`Rule`] is the tagged union
//! the tick pipeline works with.

use crate::config::StationConfig;
use crate::event::FeedbackCue;
use crate::fixed::{Fixed64, Ticks};
use crate::id::{AdvancementId, ItemTypeId, RuleId, SoundId};
use crate::item::{ItemCatalog, ItemStack};
use crate::slots::{Catalyst, CraftingGrid, GRID_SLOTS, GRID_WIDTH, SlotContainer};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Ingredients and patterns
// ---------------------------------------------------------------------------

/// A predicate over one grid cell: any of `options`, or an empty cell when
/// `options` is empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    pub options: Vec<ItemTypeId>,
}

impl Ingredient {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn of(item: ItemTypeId) -> Self {
        Self { options: vec![item] }
    }

    pub fn any_of(items: impl IntoIterator<Item = ItemTypeId>) -> Self {
        Self {
            options: items.into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    pub fn test(&self, stack: Option<&ItemStack>) -> bool {
        match stack {
            None => self.options.is_empty(),
            Some(s) => self.options.contains(&s.item_type),
        }
    }
}

/// Arrangement of ingredients a rule expects in the grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Pattern {
    /// Row-major `width × height` block, placed at any offset and optionally
    /// mirrored horizontally. Cells outside the block must be empty.
    Shaped {
        width: u8,
        height: u8,
        cells: Vec<Ingredient>,
    },
    /// Every ingredient matched by exactly one occupied cell, in any position.
    Shapeless { ingredients: Vec<Ingredient> },
}

impl Pattern {
    pub fn shaped(width: u8, height: u8, cells: Vec<Ingredient>) -> Self {
        Pattern::Shaped { width, height, cells }
    }

    pub fn shapeless(ingredients: Vec<Ingredient>) -> Self {
        Pattern::Shapeless { ingredients }
    }

    pub fn ingredients(&self) -> &[Ingredient] {
        match self {
            Pattern::Shaped { cells, .. } => cells,
            Pattern::Shapeless { ingredients } => ingredients,
        }
    }

    pub fn matches(&self, grid: &CraftingGrid) -> bool {
        match self {
            Pattern::Shaped { width, height, cells } => {
                shaped_matches(usize::from(*width), usize::from(*height), cells, grid)
            }
            Pattern::Shapeless { ingredients } => shapeless_matches(ingredients, grid),
        }
    }
}

fn shaped_matches(width: usize, height: usize, cells: &[Ingredient], grid: &CraftingGrid) -> bool {
    if width == 0 || height == 0 || width > GRID_WIDTH || height > GRID_WIDTH {
        return false;
    }
    if cells.len() != width * height || cells.iter().all(Ingredient::is_empty) {
        return false;
    }
    for oy in 0..=GRID_WIDTH - height {
        for ox in 0..=GRID_WIDTH - width {
            for mirrored in [false, true] {
                if shaped_at(width, height, cells, grid, (ox, oy), mirrored) {
                    return true;
                }
            }
        }
    }
    false
}

fn shaped_at(
    width: usize,
    height: usize,
    cells: &[Ingredient],
    grid: &CraftingGrid,
    (ox, oy): (usize, usize),
    mirrored: bool,
) -> bool {
    for y in 0..GRID_WIDTH {
        for x in 0..GRID_WIDTH {
            let cell = grid.at(x, y);
            let inside = (ox..ox + width).contains(&x) && (oy..oy + height).contains(&y);
            let ok = if inside {
                let px = x - ox;
                let px = if mirrored { width - 1 - px } else { px };
                cells[(y - oy) * width + px].test(cell)
            } else {
                cell.is_none()
            };
            if !ok {
                return false;
            }
        }
    }
    true
}

fn shapeless_matches(ingredients: &[Ingredient], grid: &CraftingGrid) -> bool {
    let wanted: Vec<&Ingredient> = ingredients.iter().filter(|i| !i.is_empty()).collect();
    let present: Vec<&ItemStack> = grid.occupied().collect();
    if wanted.is_empty() || wanted.len() != present.len() {
        return false;
    }
    let mut used = [false; GRID_SLOTS];
    assign(&wanted, &present, &mut used)
}

/// Backtracking assignment of ingredients to occupied cells (at most 9 each).
fn assign(wanted: &[&Ingredient], present: &[&ItemStack], used: &mut [bool; GRID_SLOTS]) -> bool {
    let Some((first, rest)) = wanted.split_first() else {
        return true;
    };
    for (i, stack) in present.iter().enumerate() {
        if used[i] || !first.test(Some(stack)) {
            continue;
        }
        used[i] = true;
        if assign(rest, present, used) {
            return true;
        }
        used[i] = false;
    }
    false
}

// ---------------------------------------------------------------------------
// Catalyst costs and gates
// ---------------------------------------------------------------------------

/// Per-kind catalyst amounts consumed by a primary rule, indexed by [`Catalyst`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalystCost(pub [u32; 5]);

impl CatalystCost {
    pub fn get(&self, catalyst: Catalyst) -> u32 {
        self.0[catalyst.index()]
    }

    pub fn with(mut self, catalyst: Catalyst, amount: u32) -> Self {
        self.0[catalyst.index()] = amount;
        self
    }

    pub fn is_free(&self) -> bool {
        self.0.iter().all(|&n| n == 0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Catalyst, u32)> + '_ {
        Catalyst::ALL.iter().map(|&c| (c, self.get(c)))
    }
}

/// Restricts a primary rule to owners who have earned an advancement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleGate {
    pub advancement: AdvancementId,
}

// ---------------------------------------------------------------------------
// Rule families
// ---------------------------------------------------------------------------

/// The station's own rule family.
#[derive(Debug, Clone, PartialEq)]
pub struct PrimaryRule {
    /// Assigned by the registry on registration.
    pub id: RuleId,
    pub name: String,
    pub pattern: Pattern,
    pub duration: Ticks,
    pub catalysts: CatalystCost,
    /// Fractional reward accrued on completion.
    pub reward: Fixed64,
    pub output: ItemStack,
    pub gate: Option<RuleGate>,
    pub sound: Option<SoundId>,
}

impl PrimaryRule {
    pub fn new(name: impl Into<String>, pattern: Pattern, output: ItemStack, duration: Ticks) -> Self {
        Self {
            id: RuleId(0),
            name: name.into(),
            pattern,
            duration,
            catalysts: CatalystCost::default(),
            reward: Fixed64::ZERO,
            output,
            gate: None,
            sound: None,
        }
    }

    pub fn with_catalyst(mut self, catalyst: Catalyst, amount: u32) -> Self {
        self.catalysts = self.catalysts.with(catalyst, amount);
        self
    }

    pub fn with_reward(mut self, reward: Fixed64) -> Self {
        self.reward = reward;
        self
    }

    pub fn with_gate(mut self, advancement: AdvancementId) -> Self {
        self.gate = Some(RuleGate { advancement });
        self
    }

    pub fn with_sound(mut self, sound: SoundId) -> Self {
        self.sound = Some(sound);
        self
    }

    /// Reference matcher: the grid fits the pattern and every catalyst slot
    /// holds at least the required amount of its catalyst item.
    pub fn matches(&self, container: &SlotContainer, grid: &CraftingGrid, catalog: &dyn ItemCatalog) -> bool {
        self.pattern.matches(grid)
            && self
                .catalysts
                .iter()
                .all(|(c, amount)| amount == 0 || container.catalyst_count(c, catalog) >= amount)
    }
}

/// A generic crafting rule the station also honours, at a fixed duration.
#[derive(Debug, Clone, PartialEq)]
pub struct FallbackRule {
    /// Assigned by the registry on registration.
    pub id: RuleId,
    pub name: String,
    pub pattern: Pattern,
    pub output: ItemStack,
}

impl FallbackRule {
    pub fn new(name: impl Into<String>, pattern: Pattern, output: ItemStack) -> Self {
        Self {
            id: RuleId(0),
            name: name.into(),
            pattern,
            output,
        }
    }

    pub fn matches(&self, grid: &CraftingGrid) -> bool {
        self.pattern.matches(grid)
    }
}

/// Either rule family. Cheap to clone.
#[derive(Debug, Clone)]
pub enum Rule {
    Primary(Arc<PrimaryRule>),
    Fallback(Arc<FallbackRule>),
}

impl Rule {
    pub fn id(&self) -> RuleId {
        match self {
            Rule::Primary(r) => r.id,
            Rule::Fallback(r) => r.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Rule::Primary(r) => &r.name,
            Rule::Fallback(r) => &r.name,
        }
    }

    pub fn pattern(&self) -> &Pattern {
        match self {
            Rule::Primary(r) => &r.pattern,
            Rule::Fallback(r) => &r.pattern,
        }
    }

    pub fn duration(&self, config: &StationConfig) -> Ticks {
        match self {
            Rule::Primary(r) => r.duration,
            Rule::Fallback(_) => config.fallback_duration,
        }
    }

    pub fn output(&self) -> &ItemStack {
        match self {
            Rule::Primary(r) => &r.output,
            Rule::Fallback(r) => &r.output,
        }
    }

    /// Catalysts consumed on completion. Fallback rules consume none.
    pub fn catalysts(&self) -> Option<&CatalystCost> {
        match self {
            Rule::Primary(r) => Some(&r.catalysts),
            Rule::Fallback(_) => None,
        }
    }

    pub fn reward(&self) -> Fixed64 {
        match self {
            Rule::Primary(r) => r.reward,
            Rule::Fallback(_) => Fixed64::ZERO,
        }
    }

    pub fn is_primary(&self) -> bool {
        matches!(self, Rule::Primary(_))
    }

    /// The cue played when this rule's output is handed off.
    pub fn success_cue(&self) -> FeedbackCue {
        match self {
            Rule::Primary(r) => r.sound.map_or(FeedbackCue::GenericCraft, FeedbackCue::RuleSound),
            Rule::Fallback(_) => FeedbackCue::GenericCraft,
        }
    }

    /// Identity comparison: the very same registry entry.
    pub fn same_as(&self, other: &Rule) -> bool {
        match (self, other) {
            (Rule::Primary(a), Rule::Primary(b)) => Arc::ptr_eq(a, b),
            (Rule::Fallback(a), Rule::Fallback(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

// ---------------------------------------------------------------------------
// RuleSource port
// ---------------------------------------------------------------------------

/// The rule registries the station queries. Implementations must return the
/// first match under a stable ordering.
pub trait RuleSource {
    fn first_primary(&self, container: &SlotContainer, grid: &CraftingGrid) -> Option<Arc<PrimaryRule>>;

    fn first_fallback(&self, grid: &CraftingGrid) -> Option<Arc<FallbackRule>>;

    /// Re-test a cached primary rule against current contents.
    fn primary_matches(&self, rule: &PrimaryRule, container: &SlotContainer, grid: &CraftingGrid) -> bool;

    /// Re-test a cached fallback rule against the 3×3 projection.
    fn fallback_matches(&self, rule: &FallbackRule, grid: &CraftingGrid) -> bool {
        rule.matches(grid)
    }

    /// The rule a template stack has stored, if it resolves.
    fn stored_rule(&self, _template: &ItemStack) -> Option<Rule> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(n: u32) -> ItemTypeId {
        ItemTypeId(n)
    }

    fn grid(cells: [Option<u32>; 9]) -> CraftingGrid {
        CraftingGrid::from_cells(cells.map(|c| c.map(|n| ItemStack::new(item(n), 1))))
    }

    #[test]
    fn ingredient_test() {
        let any = Ingredient::any_of([item(1), item(2)]);
        assert!(any.test(Some(&ItemStack::new(item(2), 5))));
        assert!(!any.test(Some(&ItemStack::new(item(3), 1))));
        assert!(!any.test(None));
        assert!(Ingredient::empty().test(None));
        assert!(!Ingredient::empty().test(Some(&ItemStack::new(item(1), 1))));
    }

    #[test]
    fn shaped_matches_at_any_offset() {
        // Vertical stick: plank over plank.
        let p = Pattern::shaped(1, 2, vec![Ingredient::of(item(1)), Ingredient::of(item(1))]);
        assert!(p.matches(&grid([Some(1), None, None, Some(1), None, None, None, None, None])));
        assert!(p.matches(&grid([None, None, None, None, None, Some(1), None, None, Some(1)])));
        assert!(!p.matches(&grid([Some(1), None, None, None, None, None, Some(1), None, None])));
        // Extra item outside the block.
        assert!(!p.matches(&grid([Some(1), Some(2), None, Some(1), None, None, None, None, None])));
    }

    #[test]
    fn shaped_matches_mirrored() {
        // L shape: a b / a _
        let p = Pattern::shaped(
            2,
            2,
            vec![
                Ingredient::of(item(1)),
                Ingredient::of(item(2)),
                Ingredient::of(item(1)),
                Ingredient::empty(),
            ],
        );
        assert!(p.matches(&grid([Some(1), Some(2), None, Some(1), None, None, None, None, None])));
        assert!(p.matches(&grid([Some(2), Some(1), None, None, Some(1), None, None, None, None])));
        assert!(!p.matches(&grid([Some(2), Some(1), None, Some(1), None, None, None, None, None])));
    }

    #[test]
    fn shaped_rejects_degenerate_patterns() {
        let empty = Pattern::shaped(1, 1, vec![Ingredient::empty()]);
        assert!(!empty.matches(&CraftingGrid::new()));
        let wrong_len = Pattern::shaped(2, 2, vec![Ingredient::of(item(1))]);
        assert!(!wrong_len.matches(&grid([Some(1), None, None, None, None, None, None, None, None])));
    }

    #[test]
    fn shapeless_matches_any_arrangement() {
        let p = Pattern::shapeless(vec![
            Ingredient::of(item(1)),
            Ingredient::any_of([item(2), item(3)]),
        ]);
        assert!(p.matches(&grid([None, None, Some(3), None, None, None, Some(1), None, None])));
        assert!(p.matches(&grid([Some(2), Some(1), None, None, None, None, None, None, None])));
        // Too many items.
        assert!(!p.matches(&grid([Some(2), Some(1), Some(1), None, None, None, None, None, None])));
        // Wrong items.
        assert!(!p.matches(&grid([Some(1), Some(1), None, None, None, None, None, None, None])));
        assert!(!p.matches(&CraftingGrid::new()));
    }

    #[test]
    fn shapeless_backtracks() {
        // First ingredient accepts both items, second only item 1: a greedy
        // pick of item 1 for the first ingredient would fail.
        let p = Pattern::shapeless(vec![
            Ingredient::any_of([item(1), item(2)]),
            Ingredient::of(item(1)),
        ]);
        assert!(p.matches(&grid([Some(1), Some(2), None, None, None, None, None, None, None])));
    }

    #[test]
    fn catalyst_cost_accessors() {
        let cost = CatalystCost::default().with(Catalyst::Black, 3);
        assert_eq!(cost.get(Catalyst::Black), 3);
        assert_eq!(cost.get(Catalyst::Cyan), 0);
        assert!(!cost.is_free());
        assert!(CatalystCost::default().is_free());
        assert_eq!(cost.iter().filter(|(_, n)| *n > 0).count(), 1);
    }

    #[test]
    fn rule_accessors_by_family() {
        let cfg = StationConfig::default();
        let primary = Rule::Primary(Arc::new(
            PrimaryRule::new("p", Pattern::shapeless(vec![Ingredient::of(item(1))]), ItemStack::new(item(9), 1), 40)
                .with_reward(Fixed64::from_num(1.5))
                .with_sound(SoundId(4)),
        ));
        let fallback = Rule::Fallback(Arc::new(FallbackRule::new(
            "f",
            Pattern::shapeless(vec![Ingredient::of(item(1))]),
            ItemStack::new(item(8), 4),
        )));
        assert_eq!(primary.duration(&cfg), 40);
        assert_eq!(fallback.duration(&cfg), 20);
        assert_eq!(primary.reward(), Fixed64::from_num(1.5));
        assert_eq!(fallback.reward(), Fixed64::ZERO);
        assert!(primary.catalysts().is_some());
        assert!(fallback.catalysts().is_none());
        assert_eq!(primary.success_cue(), FeedbackCue::RuleSound(SoundId(4)));
        assert_eq!(fallback.success_cue(), FeedbackCue::GenericCraft);
        assert!(primary.same_as(&primary.clone()));
        assert!(!primary.same_as(&fallback));
    }
}
