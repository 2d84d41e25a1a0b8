//! The static item catalog.
//!
//! Built once at startup and shared read-only (`Arc<ItemCatalog>`) by the
//! battle engine and the inventory operations.

use std::fmt;

use super::item::{
    Item, ItemAttribute, ItemAttributeKind, ItemEffectEmitter, SimpleItem, Target, Trigger,
    TriggerEvent,
};
use super::player::EquipmentSlot;

/// A catalog entry: shop metadata plus the prototype item.
pub struct ItemType {
    pub id: u32,
    pub name: String,
    pub description: String,
    pub cost: i64,
    pub slots: Vec<EquipmentSlot>,
    pub can_buy: bool,
    pub can_sell: bool,
    prototype: Box<dyn Item>,
}

impl ItemType {
    pub fn new(
        id: u32,
        name: &str,
        description: &str,
        cost: i64,
        slots: Vec<EquipmentSlot>,
        prototype: impl Item + 'static,
    ) -> Self {
        Self {
            id,
            name: name.to_string(),
            description: description.to_string(),
            cost,
            slots,
            can_buy: true,
            can_sell: true,
            prototype: Box::new(prototype),
        }
    }

    pub fn not_for_sale(mut self) -> Self {
        self.can_buy = false;
        self.can_sell = false;
        self
    }

    /// A fresh, independent instance for one wearer in one battle.
    pub fn instantiate(&self) -> Box<dyn Item> {
        self.prototype.clone_item()
    }

    pub fn static_attributes(&self) -> &[ItemAttribute] {
        self.prototype.static_attributes()
    }

    pub fn slots_label(&self) -> String {
        self.slots
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Debug for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemType")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("cost", &self.cost)
            .field("slots", &self.slots)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub struct ItemCatalog {
    types: Vec<ItemType>,
}

impl ItemCatalog {
    pub fn empty() -> Self {
        Self { types: Vec::new() }
    }

    /// Add an item type. A later entry with the same id replaces the earlier one.
    pub fn with(mut self, item_type: ItemType) -> Self {
        self.types.retain(|t| t.id != item_type.id);
        self.types.push(item_type);
        self
    }

    pub fn get(&self, id: u32) -> Option<&ItemType> {
        self.types.iter().find(|t| t.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ItemType> {
        self.types.iter()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl Default for ItemCatalog {
    /// The standard item set.
    fn default() -> Self {
        use EquipmentSlot::{Feet, Head, LeftHand, Leggings, RightHand, Torso};
        use ItemAttributeKind as K;

        let hands = || vec![RightHand, LeftHand];

        ItemCatalog::empty()
            .with(ItemType::new(
                0,
                "Poor mans boots",
                "Simple boots that increase your stamina by 1",
                1,
                vec![Feet],
                SimpleItem::single(K::Stamina, 1.0),
            ))
            .with(ItemType::new(
                1,
                "Watermelon",
                "Increases your stamina by 5",
                10,
                vec![Head],
                SimpleItem::single(K::Stamina, 5.0),
            ))
            .with(ItemType::new(
                2,
                "Knife",
                "Increases your strength by 5",
                10,
                hands(),
                SimpleItem::single(K::Strength, 5.0),
            ))
            .with(ItemType::new(
                3,
                "Speeeed Bootz",
                "Increases your agility by 5",
                10,
                vec![Feet],
                SimpleItem::single(K::Agility, 5.0),
            ))
            .with(ItemType::new(
                4,
                "Holy Torso",
                "Every other turn you heal 2 damage",
                10,
                vec![Torso],
                ItemEffectEmitter::new(
                    vec![ItemAttribute::new(K::Stamina, 2.0)],
                    vec![Trigger::new(
                        TriggerEvent::Turn,
                        0.0,
                        Target::Wearer,
                        |ctx, target| {
                            if ctx.turn() % 2 == 0 {
                                ctx.deal_damage(target, -2.0, "Holy Torso");
                            }
                        },
                    )],
                ),
            ))
            .with(ItemType::new(
                5,
                "Basic Wand",
                "On attacks there's a 20% chance the wand will shoot flowers and heal your opponent for 10 damage",
                10,
                vec![LeftHand, RightHand],
                ItemEffectEmitter::new(
                    vec![ItemAttribute::new(K::Strength, 5.0)],
                    vec![Trigger::new(
                        TriggerEvent::Attack,
                        0.2,
                        Target::Opponent,
                        |ctx, target| ctx.deal_damage(target, -10.0, "Flowers"),
                    )],
                ),
            ))
            .with(ItemType::new(
                6,
                "Paper airplane",
                "20% chance you stun the enemy for 4 turns on attack",
                20,
                hands(),
                ItemEffectEmitter::new(
                    vec![],
                    vec![Trigger::new(
                        TriggerEvent::Attack,
                        0.2,
                        Target::Opponent,
                        |ctx, target| ctx.stun(target, 4, "Paper airplane"),
                    )],
                ),
            ))
            .with(ItemType::new(
                7,
                "War Paint",
                "Increases your focus, your miss chance is decreased by 10%",
                10,
                vec![RightHand, LeftHand, Head, Feet, Leggings, Torso],
                SimpleItem::single(K::MissChance, -10.0),
            ))
    }
}
