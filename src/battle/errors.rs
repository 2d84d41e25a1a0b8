use thiserror::Error;

use super::attribute::AttributeType;
use super::player::EquipmentSlot;

/// Errors raised by player, inventory and battle-request operations.
#[derive(Debug, Error)]
pub enum GameError {
    /// Spending more attribute points than the player's level grants.
    #[error("insufficient attribute points: requested {requested} {attribute}, {available} available")]
    InsufficientPoints {
        attribute: AttributeType,
        requested: i32,
        available: i32,
    },

    /// Attribute upgrades must be by at least one point.
    #[error("invalid attribute amount: {0}")]
    InvalidAttributeAmount(i32),

    /// A player does not hold enough money for a purchase, transfer or stake.
    #[error("{name} does not have enough money ({have}$ of {need}$)")]
    InsufficientFunds { name: String, have: i64, need: i64 },

    /// An item id with no catalog entry.
    #[error("unknown item: #{0}")]
    UnknownItem(u32),

    /// An inventory index outside the player's inventory.
    #[error("inventory slot {0} does not exist")]
    InvalidInventorySlot(usize),

    /// The item type cannot be worn in the requested slot.
    #[error("{item} cannot be equipped as {slot}")]
    SlotNotAllowed { item: String, slot: EquipmentSlot },

    /// The catalog marks the item as not for sale (or not sellable).
    #[error("{0} cannot be traded")]
    NotTradable(String),

    /// One of the participants already has an active battle.
    #[error("{0} is already in a battle")]
    AlreadyInBattle(String),

    /// Accept was called with no pending battle for that player.
    #[error("no pending battles")]
    NoPendingBattle,

    #[error("you can't fight yourself")]
    SelfBattle,

    /// Negative stakes or non-positive transfers.
    #[error("invalid amount: {0}")]
    InvalidAmount(i64),

    /// No roster entry matches the given id or name.
    #[error("unknown player: {0}")]
    UnknownPlayer(String),

    /// Admin-only operation attempted by a regular player.
    #[error("{0} is not allowed to do that")]
    NotAdmin(String),
}

pub type GameResult<T> = Result<T, GameError>;
