use crate::fixed::Fixed64;
use crate::id::{ItemTypeId, PropertyId, RuleId};
use crate::item::{ItemCatalog, ItemStack};
use crate::rule::{FallbackRule, PrimaryRule, Rule, RuleSource};
use crate::slots::{Catalyst, CraftingGrid, SlotContainer};
use crate::station::StationTier;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Property on a template stack holding the id of the rule it stores.
pub const TEMPLATE_RULE: PropertyId = PropertyId(u16::MAX);

/// An item type definition in the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemDef {
    pub name: String,
    pub max_stack: u32,
    /// Left in the grid when one unit is consumed.
    pub remainder: Option<ItemTypeId>,
    /// Producing this item upgrades a station to the given tier.
    pub tier: Option<StationTier>,
    pub template: bool,
}

impl ItemDef {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            max_stack: 64,
            remainder: None,
            tier: None,
            template: false,
        }
    }

    pub fn with_max_stack(mut self, max_stack: u32) -> Self {
        self.max_stack = max_stack;
        self
    }

    pub fn with_remainder(mut self, remainder: ItemTypeId) -> Self {
        self.remainder = Some(remainder);
        self
    }

    pub fn with_tier(mut self, tier: StationTier) -> Self {
        self.tier = Some(tier);
        self
    }

    pub fn as_template(mut self) -> Self {
        self.template = true;
        self
    }
}

#[derive(Debug, Clone)]
enum RuleDef {
    Primary(PrimaryRule),
    Fallback(FallbackRule),
}

impl RuleDef {
    fn name(&self) -> &str {
        match self {
            RuleDef::Primary(r) => &r.name,
            RuleDef::Fallback(r) => &r.name,
        }
    }

    fn item_refs(&self) -> Vec<ItemTypeId> {
        let (pattern, output) = match self {
            RuleDef::Primary(r) => (&r.pattern, &r.output),
            RuleDef::Fallback(r) => (&r.pattern, &r.output),
        };
        pattern
            .ingredients()
            .iter()
            .flat_map(|i| i.options.iter().copied())
            .chain(std::iter::once(output.item_type))
            .collect()
    }
}

/// Builder for constructing an immutable Registry.
/// Three-phase lifecycle: registration -> mutation -> finalization.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    items: Vec<ItemDef>,
    item_name_to_id: HashMap<String, ItemTypeId>,
    catalysts: [Option<ItemTypeId>; 5],
    rules: Vec<RuleDef>,
    rule_name_to_id: HashMap<String, RuleId>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Phase 1: Register an item type. Returns its ID.
    pub fn register_item(&mut self, def: ItemDef) -> ItemTypeId {
        let id = ItemTypeId(self.items.len() as u32);
        self.item_name_to_id.entry(def.name.clone()).or_insert(id);
        self.items.push(def);
        id
    }

    /// Phase 1: Assign the item a catalyst slot accepts.
    pub fn set_catalyst(&mut self, catalyst: Catalyst, item: ItemTypeId) {
        self.catalysts[catalyst.index()] = Some(item);
    }

    /// Phase 1: Register a primary rule. Ids are shared with fallback rules
    /// and follow registration order.
    pub fn register_primary(&mut self, mut rule: PrimaryRule) -> RuleId {
        let id = RuleId(self.rules.len() as u32);
        rule.id = id;
        self.rule_name_to_id.entry(rule.name.clone()).or_insert(id);
        self.rules.push(RuleDef::Primary(rule));
        id
    }

    /// Phase 1: Register a fallback rule.
    pub fn register_fallback(&mut self, mut rule: FallbackRule) -> RuleId {
        let id = RuleId(self.rules.len() as u32);
        rule.id = id;
        self.rule_name_to_id.entry(rule.name.clone()).or_insert(id);
        self.rules.push(RuleDef::Fallback(rule));
        id
    }

    /// Phase 2: Mutate an existing item by name.
    pub fn mutate_item<F>(&mut self, name: &str, f: F) -> Result<(), RegistryError>
    where
        F: FnOnce(&mut ItemDef),
    {
        let id = self
            .item_name_to_id
            .get(name)
            .ok_or(RegistryError::NotFound(name.to_string()))?;
        f(&mut self.items[id.0 as usize]);
        Ok(())
    }

    /// Phase 2: Mutate an existing primary rule by name.
    pub fn mutate_primary<F>(&mut self, name: &str, f: F) -> Result<(), RegistryError>
    where
        F: FnOnce(&mut PrimaryRule),
    {
        let id = self
            .rule_name_to_id
            .get(name)
            .ok_or(RegistryError::NotFound(name.to_string()))?;
        match &mut self.rules[id.0 as usize] {
            RuleDef::Primary(rule) => {
                f(rule);
                Ok(())
            }
            RuleDef::Fallback(_) => Err(RegistryError::NotFound(name.to_string())),
        }
    }

    pub fn item_id(&self, name: &str) -> Option<ItemTypeId> {
        self.item_name_to_id.get(name).copied()
    }

    pub fn rule_id(&self, name: &str) -> Option<RuleId> {
        self.rule_name_to_id.get(name).copied()
    }

    /// Phase 3: Finalize and build the immutable registry.
    pub fn build(self) -> Result<Registry, RegistryError> {
        let item_ref = |id: ItemTypeId| -> Result<(), RegistryError> {
            if id.0 as usize >= self.items.len() {
                return Err(RegistryError::InvalidItemRef(id));
            }
            Ok(())
        };

        let mut seen = HashSet::new();
        for item in &self.items {
            if !seen.insert(item.name.as_str()) {
                return Err(RegistryError::DuplicateName(item.name.clone()));
            }
            if item.max_stack == 0 {
                return Err(RegistryError::ZeroMaxStack(item.name.clone()));
            }
            if let Some(remainder) = item.remainder {
                item_ref(remainder)?;
            }
        }
        for (index, item) in self.catalysts.iter().enumerate() {
            if let Some(item) = *item {
                item_ref(item)?;
                if self.items[item.0 as usize].template {
                    return Err(RegistryError::TemplateAsCatalyst(Catalyst::ALL[index]));
                }
            }
        }

        let mut seen = HashSet::new();
        for rule in &self.rules {
            if !seen.insert(rule.name()) {
                return Err(RegistryError::DuplicateName(rule.name().to_string()));
            }
            for id in rule.item_refs() {
                item_ref(id)?;
            }
        }

        let template_item = self
            .items
            .iter()
            .position(|i| i.template)
            .map(|i| ItemTypeId(i as u32));

        let mut rules = Vec::with_capacity(self.rules.len());
        let mut primaries = Vec::new();
        let mut fallbacks = Vec::new();
        for def in self.rules {
            match def {
                RuleDef::Primary(r) => {
                    let r = Arc::new(r);
                    primaries.push(Arc::clone(&r));
                    rules.push(Rule::Primary(r));
                }
                RuleDef::Fallback(r) => {
                    let r = Arc::new(r);
                    fallbacks.push(Arc::clone(&r));
                    rules.push(Rule::Fallback(r));
                }
            }
        }

        Ok(Registry {
            items: self.items,
            item_name_to_id: self.item_name_to_id,
            catalysts: self.catalysts,
            template_item,
            rules,
            primaries,
            fallbacks,
            rule_name_to_id: self.rule_name_to_id,
        })
    }
}

/// Immutable registry. Frozen after build(). Thread-safe to share.
///
/// Rules are scanned in registration order, so the first registered match
/// always wins.
#[derive(Debug)]
pub struct Registry {
    items: Vec<ItemDef>,
    item_name_to_id: HashMap<String, ItemTypeId>,
    catalysts: [Option<ItemTypeId>; 5],
    template_item: Option<ItemTypeId>,
    rules: Vec<Rule>,
    primaries: Vec<Arc<PrimaryRule>>,
    fallbacks: Vec<Arc<FallbackRule>>,
    rule_name_to_id: HashMap<String, RuleId>,
}

impl Registry {
    pub fn get_item(&self, id: ItemTypeId) -> Option<&ItemDef> {
        self.items.get(id.0 as usize)
    }

    pub fn item_id(&self, name: &str) -> Option<ItemTypeId> {
        self.item_name_to_id.get(name).copied()
    }

    pub fn rule_id(&self, name: &str) -> Option<RuleId> {
        self.rule_name_to_id.get(name).copied()
    }

    pub fn rule(&self, id: RuleId) -> Option<&Rule> {
        self.rules.get(id.0 as usize)
    }

    pub fn rule_by_name(&self, name: &str) -> Option<&Rule> {
        self.rule_id(name).and_then(|id| self.rule(id))
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn primaries(&self) -> &[Arc<PrimaryRule>] {
        &self.primaries
    }

    pub fn fallbacks(&self) -> &[Arc<FallbackRule>] {
        &self.fallbacks
    }

    /// A template stack storing the given rule. `None` when no template
    /// item is registered or the rule is unknown.
    pub fn template_for(&self, rule: RuleId) -> Option<ItemStack> {
        let item = self.template_item?;
        self.rule(rule)?;
        let value = Fixed64::checked_from_num(rule.0)?;
        Some(ItemStack::new(item, 1).with_property(TEMPLATE_RULE, value))
    }
}

impl ItemCatalog for Registry {
    fn max_stack(&self, item: ItemTypeId) -> u32 {
        self.get_item(item).map_or(0, |i| i.max_stack)
    }

    fn remainder(&self, item: ItemTypeId) -> Option<ItemTypeId> {
        self.get_item(item).and_then(|i| i.remainder)
    }

    fn station_tier(&self, item: ItemTypeId) -> Option<StationTier> {
        self.get_item(item).and_then(|i| i.tier)
    }

    fn catalyst_item(&self, catalyst: Catalyst) -> Option<ItemTypeId> {
        self.catalysts[catalyst.index()]
    }

    fn is_template(&self, item: ItemTypeId) -> bool {
        self.get_item(item).is_some_and(|i| i.template)
    }
}

impl RuleSource for Registry {
    fn first_primary(&self, container: &SlotContainer, grid: &CraftingGrid) -> Option<Arc<PrimaryRule>> {
        self.primaries
            .iter()
            .find(|r| r.matches(container, grid, self))
            .cloned()
    }

    fn first_fallback(&self, grid: &CraftingGrid) -> Option<Arc<FallbackRule>> {
        self.fallbacks.iter().find(|r| r.matches(grid)).cloned()
    }

    fn primary_matches(&self, rule: &PrimaryRule, container: &SlotContainer, grid: &CraftingGrid) -> bool {
        rule.matches(container, grid, self)
    }

    fn stored_rule(&self, template: &ItemStack) -> Option<Rule> {
        if !self.is_template(template.item_type) {
            return None;
        }
        let id = template.get_property(TEMPLATE_RULE)?.checked_to_num::<u32>()?;
        self.rule(RuleId(id)).cloned()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid item reference: {0:?}")]
    InvalidItemRef(ItemTypeId),
    #[error("duplicate name: {0}")]
    DuplicateName(String),
    #[error("item {0} has a max stack of zero")]
    ZeroMaxStack(String),
    #[error("catalyst {0:?} is assigned a template item")]
    TemplateAsCatalyst(Catalyst),
}
