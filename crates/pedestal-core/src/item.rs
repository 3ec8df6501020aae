use crate::fixed::Fixed64;
use crate::id::{ItemTypeId, PropertyId};
use crate::slots::Catalyst;
use crate::station::StationTier;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A stack of interchangeable items with optional auxiliary data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    pub item_type: ItemTypeId,
    pub count: u32,
    /// Auxiliary data (e.g. a template's stored rule). Stacks only merge
    /// when their properties are identical.
    #[serde(default)]
    pub properties: BTreeMap<PropertyId, Fixed64>,
}

impl ItemStack {
    pub fn new(item_type: ItemTypeId, count: u32) -> Self {
        Self {
            item_type,
            count,
            properties: BTreeMap::new(),
        }
    }

    /// Builder-style variant of [`set_property`](Self::set_property).
    pub fn with_property(mut self, id: PropertyId, value: Fixed64) -> Self {
        self.properties.insert(id, value);
        self
    }

    pub fn set_property(&mut self, id: PropertyId, value: Fixed64) {
        self.properties.insert(id, value);
    }

    pub fn get_property(&self, id: PropertyId) -> Option<Fixed64> {
        self.properties.get(&id).copied()
    }

    /// Whether `other` could merge into this stack (same type, same data).
    pub fn stacks_with(&self, other: &ItemStack) -> bool {
        self.item_type == other.item_type && self.properties == other.properties
    }

    /// A copy of this stack carrying `count` units instead.
    pub fn with_count(&self, count: u32) -> Self {
        Self {
            item_type: self.item_type,
            count,
            properties: self.properties.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Static facts about item types that the station consults.
///
/// Implemented by [`Registry`](crate::registry::Registry); hosts with their
/// own item database implement it directly.
pub trait ItemCatalog {
    /// The item type's own stacking cap.
    fn max_stack(&self, item: ItemTypeId) -> u32;

    /// The item left behind in a grid slot when one unit is consumed
    /// (an emptied bucket, say). `None` means the unit is simply used up.
    fn remainder(&self, item: ItemTypeId) -> Option<ItemTypeId>;

    /// The station tier this item designates, if producing it is an upgrade.
    fn station_tier(&self, item: ItemTypeId) -> Option<StationTier>;

    /// The only item accepted by the given catalyst slot.
    fn catalyst_item(&self, catalyst: Catalyst) -> Option<ItemTypeId>;

    /// Whether the item is a recipe template.
    fn is_template(&self, item: ItemTypeId) -> bool;
}
