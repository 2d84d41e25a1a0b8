//! Generated opponents for single-player battles.

use std::fmt;
use uuid::Uuid;

use super::attribute::AttributeType;
use super::player::{xp_for_level, Player};
use super::rng::Roller;

/// Id prefix that marks a player as generated.
pub const MONSTER_ID_PREFIX: &str = "monster:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonsterModifier {
    Normal,
    Tough,
    Boss,
}

impl MonsterModifier {
    /// Extra levels granted by the modifier.
    pub fn bonus(self) -> i64 {
        match self {
            MonsterModifier::Normal => 1,
            MonsterModifier::Tough => 2,
            MonsterModifier::Boss => 5,
        }
    }

    /// 60% normal, 30% tough, 10% boss.
    pub fn roll(roller: &mut dyn Roller) -> Self {
        let n = roller.roll();
        if n < 0.6 {
            MonsterModifier::Normal
        } else if n < 0.9 {
            MonsterModifier::Tough
        } else {
            MonsterModifier::Boss
        }
    }
}

impl fmt::Display for MonsterModifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MonsterModifier::Normal => "Normal",
            MonsterModifier::Tough => "Tough",
            MonsterModifier::Boss => "Boss",
        };
        f.write_str(s)
    }
}

/// A monster family that appears for player levels in `[lvl_start, lvl_end)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonsterType {
    pub name: String,
    pub lvl_start: i64,
    pub lvl_end: i64,
}

impl MonsterType {
    pub fn new(name: &str, lvl_start: i64, lvl_end: i64) -> Self {
        Self {
            name: name.to_string(),
            lvl_start,
            lvl_end,
        }
    }

    fn covers(&self, level: i64) -> bool {
        level >= self.lvl_start && level < self.lvl_end
    }
}

#[derive(Debug, Clone)]
pub struct Monster {
    pub player: Player,
    pub modifier: MonsterModifier,
}

pub struct MonsterGenerator {
    types: Vec<MonsterType>,
}

impl Default for MonsterGenerator {
    fn default() -> Self {
        Self::new(vec![
            MonsterType::new("Blob", 0, 5),
            MonsterType::new("Bushes", 0, 5),
            MonsterType::new("Bird", 5, 10),
            MonsterType::new("Cat", 5, 10),
            MonsterType::new("Dog", 10, 15),
            MonsterType::new("Deer", 10, 15),
            MonsterType::new("God", 15, 100),
            MonsterType::new("Lamp", 100, 1000),
        ])
    }
}

impl MonsterGenerator {
    pub fn new(types: Vec<MonsterType>) -> Self {
        Self { types }
    }

    /// Pick a family for `level`, or "Bot" when none covers it.
    pub fn monster_type(&self, level: i64, roller: &mut dyn Roller) -> MonsterType {
        let pool: Vec<&MonsterType> = self.types.iter().filter(|t| t.covers(level)).collect();
        if pool.is_empty() {
            return MonsterType::new("Bot", 0, 0);
        }
        pool[roller.pick(pool.len())].clone()
    }

    /// Build an opponent for a player of `level`. All attribute points are
    /// spent at random.
    pub fn get_monster(&self, level: i64, roller: &mut dyn Roller) -> Monster {
        let monster_type = self.monster_type(level, roller);
        let modifier = MonsterModifier::roll(roller);

        let mut player = Player::new(
            format!("{}{}", MONSTER_ID_PREFIX, Uuid::new_v4()),
            format!("{} {}", modifier, monster_type.name),
        );
        player.xp = xp_for_level((level - 1) + modifier.bonus()).max(0);
        player.money = 2 + modifier.bonus() * 2;

        while player.available_attribute_points() > 0 {
            let n = roller.roll();
            let attribute = if n < 0.33 {
                AttributeType::Strength
            } else if n < 0.66 {
                AttributeType::Agility
            } else {
                AttributeType::Stamina
            };
            player.attributes.modify(attribute, 1);
        }

        Monster { player, modifier }
    }
}
