//! Battle engine: persistent players, items with triggered effects, the
//! per-fight combatant model, the battle state machine and the registry that
//! keeps every player in at most one battle.

pub mod attribute;
pub mod catalog;
pub mod combatant;
pub mod engine;
pub mod errors;
pub mod item;
pub mod manager;
pub mod monster;
pub mod player;
pub mod rng;
pub mod roster;

pub use attribute::{AttributeContainer, AttributeType};
pub use catalog::{ItemCatalog, ItemType};
pub use combatant::{stats_summary, BattlePlayer, Side};
pub use engine::{Arena, Battle, BattleOutcome, BattleState};
pub use errors::{GameError, GameResult};
pub use item::{
    EffectContext, Item, ItemAttribute, ItemAttributeKind, ItemEffectEmitter, SimpleItem, Target,
    Trigger, TriggerEvent,
};
pub use manager::BattleManager;
pub use monster::{Monster, MonsterGenerator, MonsterModifier};
pub use player::{EquipmentSlot, Player, PlayerItem};
pub use rng::{seeded_rollers, Roller, RollerFactory, ScriptedRoller, SeededRoller};
pub use roster::{transfer_money, PlayerHandle, PlayerRoster};
