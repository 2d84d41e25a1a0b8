//! Persistent characters: identity, progression, money and inventory.
//!
//! Leveling is purely derived from XP: every 10 XP is one level and every level
//! grants one attribute point. The formulas here are shared by the stats
//! display and by [`BattlePlayer`](super::combatant::BattlePlayer).

use serde::{Deserialize, Serialize};
use std::fmt;

use super::attribute::{AttributeContainer, AttributeType};
use super::catalog::ItemType;
use super::errors::{GameError, GameResult};

/// XP needed per level.
pub const XP_PER_LEVEL: i64 = 10;

pub fn level_from_xp(xp: i64) -> i64 {
    xp / XP_PER_LEVEL + 1
}

/// XP at which `level` starts.
pub fn xp_for_level(level: i64) -> i64 {
    (level - 1) * XP_PER_LEVEL
}

/// Percent chance to dodge an incoming hit. Ranges over `[20, 100)`.
pub fn dodge_chance(agility: f32) -> f32 {
    (agility / (agility + 100.0)) * 80.0 + 20.0
}

/// Percent chance for an outgoing hit to miss. Ranges over `(0, 50]`.
pub fn miss_chance(agility: f32) -> f32 {
    50.0 - (agility / (agility + 100.0)) * 50.0
}

/// Named body location. `None` marks an unequipped inventory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EquipmentSlot {
    #[default]
    None,
    Head,
    RightHand,
    LeftHand,
    Feet,
    Torso,
    Leggings,
}

impl EquipmentSlot {
    pub const WEARABLE: [EquipmentSlot; 6] = [
        EquipmentSlot::Head,
        EquipmentSlot::RightHand,
        EquipmentSlot::LeftHand,
        EquipmentSlot::Feet,
        EquipmentSlot::Torso,
        EquipmentSlot::Leggings,
    ];

    /// Case-insensitive parse. Unknown names return `None` (the Option, not the slot).
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "none" => Some(EquipmentSlot::None),
            "head" => Some(EquipmentSlot::Head),
            "righthand" => Some(EquipmentSlot::RightHand),
            "lefthand" => Some(EquipmentSlot::LeftHand),
            "feet" => Some(EquipmentSlot::Feet),
            "torso" => Some(EquipmentSlot::Torso),
            "leggings" => Some(EquipmentSlot::Leggings),
            _ => None,
        }
    }

    pub fn is_equipped(&self) -> bool {
        *self != EquipmentSlot::None
    }
}

impl fmt::Display for EquipmentSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EquipmentSlot::None => "None",
            EquipmentSlot::Head => "Head",
            EquipmentSlot::RightHand => "RightHand",
            EquipmentSlot::LeftHand => "LeftHand",
            EquipmentSlot::Feet => "Feet",
            EquipmentSlot::Torso => "Torso",
            EquipmentSlot::Leggings => "Leggings",
        };
        f.write_str(name)
    }
}

/// An inventory entry. Equipped when `equipment_slot` is not `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerItem {
    pub item_type_id: u32,
    #[serde(default)]
    pub equipment_slot: EquipmentSlot,
}

impl PlayerItem {
    pub fn new(item_type_id: u32) -> Self {
        Self {
            item_type_id,
            equipment_slot: EquipmentSlot::None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Player {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub xp: i64,
    #[serde(default)]
    pub money: i64,
    #[serde(default)]
    pub wins: u32,
    #[serde(default)]
    pub losses: u32,
    #[serde(default)]
    pub attributes: AttributeContainer,
    #[serde(default)]
    pub inventory: Vec<PlayerItem>,
}

impl Player {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn level(&self) -> i64 {
        level_from_xp(self.xp)
    }

    pub fn max_health(&self) -> i64 {
        self.level() + self.attributes.get(AttributeType::Stamina) as i64 + 10
    }

    pub fn base_damage(&self) -> f32 {
        (self.level() + self.attributes.get(AttributeType::Strength) as i64) as f32 + 2.0
    }

    pub fn used_attribute_points(&self) -> i64 {
        self.attributes.total() as i64
    }

    pub fn available_attribute_points(&self) -> i64 {
        self.level() - self.used_attribute_points()
    }

    /// Spend `amount` free points on `attribute`. Nothing changes on error.
    pub fn upgrade_attribute(&mut self, attribute: AttributeType, amount: i32) -> GameResult<()> {
        if amount < 1 {
            return Err(GameError::InvalidAttributeAmount(amount));
        }
        let available = self.available_attribute_points();
        if available < amount as i64 {
            return Err(GameError::InsufficientPoints {
                attribute,
                requested: amount,
                available: available.max(0) as i32,
            });
        }
        self.attributes.modify(attribute, amount);
        Ok(())
    }

    /// Put inventory entry `index` into `slot`, or the item's first allowed slot.
    ///
    /// Whatever previously occupied the slot is unequipped first so at most one
    /// entry holds any wearable slot. Returns the slot used.
    pub fn equip_item(
        &mut self,
        index: usize,
        slot: Option<EquipmentSlot>,
        item_type: &ItemType,
    ) -> GameResult<EquipmentSlot> {
        if index >= self.inventory.len() {
            return Err(GameError::InvalidInventorySlot(index));
        }
        if self.inventory[index].item_type_id != item_type.id {
            return Err(GameError::UnknownItem(self.inventory[index].item_type_id));
        }

        let slot = match slot {
            Some(s) => s,
            None => item_type.slots.first().copied().unwrap_or(EquipmentSlot::None),
        };
        if !slot.is_equipped() || !item_type.slots.contains(&slot) {
            return Err(GameError::SlotNotAllowed {
                item: item_type.name.clone(),
                slot,
            });
        }

        for entry in self.inventory.iter_mut() {
            if entry.equipment_slot == slot {
                entry.equipment_slot = EquipmentSlot::None;
            }
        }
        self.inventory[index].equipment_slot = slot;
        Ok(slot)
    }

    /// Unequip by inventory index. Returns the item id if something was worn.
    pub fn unequip_index(&mut self, index: usize) -> GameResult<Option<u32>> {
        let entry = self
            .inventory
            .get_mut(index)
            .ok_or(GameError::InvalidInventorySlot(index))?;
        if !entry.equipment_slot.is_equipped() {
            return Ok(None);
        }
        entry.equipment_slot = EquipmentSlot::None;
        Ok(Some(entry.item_type_id))
    }

    /// Strip whatever is worn in `slot`.
    pub fn unequip_slot(&mut self, slot: EquipmentSlot) -> Option<u32> {
        if !slot.is_equipped() {
            return None;
        }
        let entry = self
            .inventory
            .iter_mut()
            .find(|e| e.equipment_slot == slot)?;
        entry.equipment_slot = EquipmentSlot::None;
        Some(entry.item_type_id)
    }

    pub fn equipped_items(&self) -> impl Iterator<Item = &PlayerItem> {
        self.inventory.iter().filter(|e| e.equipment_slot.is_equipped())
    }

    /// Purchase one `item_type`. Money never goes negative.
    pub fn buy_item(&mut self, item_type: &ItemType) -> GameResult<()> {
        if !item_type.can_buy {
            return Err(GameError::NotTradable(item_type.name.clone()));
        }
        self.ensure_money(item_type.cost)?;
        self.money -= item_type.cost;
        self.inventory.push(PlayerItem::new(item_type.id));
        Ok(())
    }

    /// Sell inventory entry `index` back for half its cost. Returns the refund.
    pub fn sell_item(&mut self, index: usize, item_type: &ItemType) -> GameResult<i64> {
        let entry = self
            .inventory
            .get(index)
            .ok_or(GameError::InvalidInventorySlot(index))?;
        if entry.item_type_id != item_type.id {
            return Err(GameError::UnknownItem(entry.item_type_id));
        }
        if !item_type.can_sell {
            return Err(GameError::NotTradable(item_type.name.clone()));
        }
        self.inventory.remove(index);
        let refund = item_type.cost / 2;
        self.money += refund;
        Ok(refund)
    }

    /// Give an item for free (admin grant).
    pub fn grant_item(&mut self, item_type: &ItemType) {
        self.inventory.push(PlayerItem::new(item_type.id));
    }

    pub fn ensure_money(&self, need: i64) -> GameResult<()> {
        if self.money < need {
            return Err(GameError::InsufficientFunds {
                name: self.name.clone(),
                have: self.money,
                need,
            });
        }
        Ok(())
    }
}
