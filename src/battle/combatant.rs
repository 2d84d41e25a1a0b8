//! Per-battle combatant state.
//!
//! A [`BattlePlayer`] wraps a locked [`Player`] for the length of one fight. It
//! owns fresh copies of the player's equipped items and the transient combat
//! state (health, stun, item-derived attributes and chance modifiers). Nothing
//! here is persisted; settlement writes back to the player afterwards.

use log::warn;

use super::attribute::{AttributeContainer, AttributeType};
use super::catalog::ItemCatalog;
use super::engine::Arena;
use super::item::{Binding, EffectContext, Item, ItemAttributeKind, TriggerEvent};
use super::player::{dodge_chance, miss_chance, xp_for_level, Player};

/// Which participant of a battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Initiator,
    Defender,
}

impl Side {
    pub fn other(self) -> Side {
        match self {
            Side::Initiator => Side::Defender,
            Side::Defender => Side::Initiator,
        }
    }
}

/// What the damage primitives need to know about the acting side.
#[derive(Debug, Clone)]
pub struct Striker {
    pub name: String,
    pub miss_chance: f32,
}

pub struct BattlePlayer<'b> {
    pub player: &'b Player,
    pub health: f32,
    /// Bonuses from equipped items only; permanent points live on the player.
    pub attributes: AttributeContainer,
    pub equipped_items: Vec<Box<dyn Item>>,
    /// Turns left to skip.
    pub stun_duration: u32,
    pub modified_miss_chance: f32,
    pub modified_dodge_chance: f32,
    pub modified_damage: f32,
}

impl<'b> BattlePlayer<'b> {
    pub fn new(player: &'b Player) -> Self {
        Self {
            player,
            health: 0.0,
            attributes: AttributeContainer::new(),
            equipped_items: Vec::new(),
            stun_duration: 0,
            modified_miss_chance: 0.0,
            modified_dodge_chance: 0.0,
            modified_damage: 0.0,
        }
    }

    /// Equip copies of every worn item and fill health.
    ///
    /// Inventory entries that reference an unknown item type are logged and
    /// skipped.
    pub fn init(&mut self, binding: Binding, catalog: &ItemCatalog) {
        let player = self.player;
        for entry in player.equipped_items() {
            let Some(item_type) = catalog.get(entry.item_type_id) else {
                warn!(
                    "Unknown item {} on {} ({}), skipping",
                    entry.item_type_id, player.name, player.id
                );
                continue;
            };
            let mut item = item_type.instantiate();
            item.init(binding);
            item.apply(self);
            self.equipped_items.push(item);
        }
        self.health = self.max_health();
    }

    pub fn name(&self) -> &str {
        &self.player.name
    }

    pub fn max_health(&self) -> f32 {
        (self.player.max_health() + self.attributes.get(AttributeType::Stamina) as i64) as f32
    }

    /// Permanent points plus item bonuses.
    pub fn combined_attribute(&self, kind: AttributeType) -> i32 {
        self.player.attributes.get(kind) + self.attributes.get(kind)
    }

    pub fn dodge_chance(&self) -> f32 {
        dodge_chance(self.combined_attribute(AttributeType::Agility) as f32)
            + self.modified_dodge_chance
    }

    pub fn miss_chance(&self) -> f32 {
        miss_chance(self.combined_attribute(AttributeType::Agility) as f32)
            + self.modified_miss_chance
    }

    pub fn damage(&self) -> f32 {
        self.player.base_damage()
            + self.attributes.get(AttributeType::Strength) as f32
            + self.modified_damage
    }

    pub fn is_defeated(&self) -> bool {
        self.health <= 0.0
    }

    pub fn striker(&self) -> Striker {
        Striker {
            name: self.player.name.clone(),
            miss_chance: self.miss_chance(),
        }
    }

    /// Route a static item bonus to attributes or chance modifiers.
    pub fn apply_item_attribute(&mut self, kind: ItemAttributeKind, amount: f32) {
        match kind {
            ItemAttributeKind::Strength => {
                self.attributes.modify(AttributeType::Strength, amount as i32)
            }
            ItemAttributeKind::Agility => {
                self.attributes.modify(AttributeType::Agility, amount as i32)
            }
            ItemAttributeKind::Stamina => {
                self.attributes.modify(AttributeType::Stamina, amount as i32)
            }
            ItemAttributeKind::DodgeChance => self.modified_dodge_chance += amount,
            ItemAttributeKind::MissChance => self.modified_miss_chance += amount,
        }
    }

    pub fn next_turn(&mut self, opponent: &mut BattlePlayer<'b>, arena: &mut Arena<'b>) {
        self.fire(TriggerEvent::Turn, opponent, arena);
    }

    pub fn attack(&mut self, opponent: &mut BattlePlayer<'b>, arena: &mut Arena<'b>) {
        self.fire(TriggerEvent::Attack, opponent, arena);
    }

    pub fn defend(&mut self, opponent: &mut BattlePlayer<'b>, arena: &mut Arena<'b>) {
        self.fire(TriggerEvent::Defend, opponent, arena);
    }

    fn fire(&mut self, event: TriggerEvent, opponent: &mut BattlePlayer<'b>, arena: &mut Arena<'b>) {
        // Items are detached while their hooks run so each hook can borrow the wearer.
        let mut items = std::mem::take(&mut self.equipped_items);
        for item in items.iter_mut() {
            let mut ctx = EffectContext {
                wearer: &mut *self,
                opponent: &mut *opponent,
                arena: &mut *arena,
            };
            match event {
                TriggerEvent::Turn => item.on_turn(&mut ctx),
                TriggerEvent::Attack => item.on_attack(&mut ctx),
                TriggerEvent::Defend => item.on_defend(&mut ctx),
            }
        }
        items.append(&mut self.equipped_items);
        self.equipped_items = items;
    }
}

/// Multi-line stats block for a player, including item bonuses.
pub fn stats_summary(player: &Player, catalog: &ItemCatalog) -> String {
    let level = player.level();
    let next = xp_for_level(level + 1) - xp_for_level(level);
    let current = player.xp - xp_for_level(level);

    let mut bp = BattlePlayer::new(player);
    bp.init(
        Binding {
            wearer: Side::Initiator,
            battle_id: uuid::Uuid::nil(),
        },
        catalog,
    );

    let general = format!(
        " - Level: {}\n - Attribute points: {}\n - XP: {} ({})\n - Money {}$\n - Wins: {}\n - Losses: {}",
        level,
        player.available_attribute_points(),
        current,
        next,
        player.money,
        player.wins,
        player.losses
    );
    let attributes = format!(
        " - Strength: {} (+{}) (increases damage)\n - Stamina: {} (+{}) (increases health)\n - Agility: {} (+{}) (increases dodge chance, decreases miss chance)",
        player.attributes.get(AttributeType::Strength),
        bp.attributes.get(AttributeType::Strength),
        player.attributes.get(AttributeType::Stamina),
        bp.attributes.get(AttributeType::Stamina),
        player.attributes.get(AttributeType::Agility),
        bp.attributes.get(AttributeType::Agility),
    );
    let stats = format!(
        " - Health: {:.2}\n - Damage {:.2}\n - Dodge Chance: {:.2}%\n - Miss Chance: {:.2}%",
        bp.max_health(),
        bp.damage(),
        bp.dodge_chance(),
        bp.miss_chance()
    );
    format!("{}\n\n{}\n\n{}", general, attributes, stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::player::{EquipmentSlot, PlayerItem};

    fn binding() -> Binding {
        Binding {
            wearer: Side::Defender,
            battle_id: uuid::Uuid::nil(),
        }
    }

    #[test]
    fn init_aggregates_item_bonuses() {
        let catalog = ItemCatalog::default();
        let mut player = Player::new("1", "alice");
        player.attributes.set(AttributeType::Stamina, 1);
        player.attributes.set(AttributeType::Agility, 2);
        player.inventory = vec![
            PlayerItem {
                item_type_id: 1, // Watermelon, Stamina +5
                equipment_slot: EquipmentSlot::Head,
            },
            PlayerItem {
                item_type_id: 3, // Speeeed Bootz, Agility +5
                equipment_slot: EquipmentSlot::Feet,
            },
            PlayerItem::new(2), // Knife, not worn
            PlayerItem {
                item_type_id: 7, // War Paint, MissChance -10
                equipment_slot: EquipmentSlot::Torso,
            },
        ];

        let mut bp = BattlePlayer::new(&player);
        bp.init(binding(), &catalog);

        assert_eq!(bp.equipped_items.len(), 3);
        assert_eq!(bp.attributes.get(AttributeType::Stamina), 5);
        assert_eq!(bp.attributes.get(AttributeType::Strength), 0);
        assert_eq!(bp.combined_attribute(AttributeType::Agility), 7);
        // level 1 + stamina 1 + 10, plus the melon
        assert_eq!(bp.max_health(), 17.0);
        assert_eq!(bp.health, 17.0);
        assert_eq!(bp.miss_chance(), miss_chance(7.0) - 10.0);
        assert_eq!(bp.dodge_chance(), dodge_chance(7.0));
        assert_eq!(bp.damage(), 3.0);
    }

    #[test]
    fn unknown_items_are_skipped() {
        let catalog = ItemCatalog::default();
        let mut player = Player::new("1", "alice");
        player.inventory = vec![
            PlayerItem {
                item_type_id: 404,
                equipment_slot: EquipmentSlot::Head,
            },
            PlayerItem {
                item_type_id: 2,
                equipment_slot: EquipmentSlot::RightHand,
            },
        ];
        let mut bp = BattlePlayer::new(&player);
        bp.init(binding(), &catalog);
        assert_eq!(bp.equipped_items.len(), 1);
        assert_eq!(bp.damage(), 8.0);
    }

    #[test]
    fn stats_summary_mentions_item_bonus() {
        let catalog = ItemCatalog::default();
        let mut player = Player::new("1", "alice");
        player.inventory = vec![PlayerItem {
            item_type_id: 2,
            equipment_slot: EquipmentSlot::LeftHand,
        }];
        let text = stats_summary(&player, &catalog);
        assert!(text.contains(" - Level: 1"));
        assert!(text.contains("Strength: 0 (+5)"));
        assert!(text.contains("Damage 8.00"));
    }
}
