//! Item behaviour: static bonuses plus event-triggered effects.
//!
//! Catalog entries hold a prototype [`Item`]; every battle equips a fresh
//! [`Item::clone_item`] of it. The clone owns all of its mutable state (such as
//! which one-shot triggers already fired) so a fight can never leak state back
//! into the catalog or into another fight.

use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use super::combatant::{BattlePlayer, Side};
use super::engine::Arena;

/// What a static item bonus modifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemAttributeKind {
    Strength,
    Agility,
    Stamina,
    DodgeChance,
    MissChance,
}

impl fmt::Display for ItemAttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ItemAttributeKind::Strength => "Strength",
            ItemAttributeKind::Agility => "Agility",
            ItemAttributeKind::Stamina => "Stamina",
            ItemAttributeKind::DodgeChance => "DodgeChance",
            ItemAttributeKind::MissChance => "MissChance",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ItemAttribute {
    pub kind: ItemAttributeKind,
    pub amount: f32,
}

impl ItemAttribute {
    pub fn new(kind: ItemAttributeKind, amount: f32) -> Self {
        Self { kind, amount }
    }
}

/// Where an item sits for the current fight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding {
    pub wearer: Side,
    pub battle_id: uuid::Uuid,
}

/// Behaviour shared by every equippable item.
///
/// Hooks default to no-ops and `apply`/`remove` default to adding or
/// subtracting [`Item::static_attributes`], so a plain stat item only has to
/// provide its attributes and a clone. `clone_item` must be a deep copy: the
/// returned value may not share any mutable state with `self`.
pub trait Item: Send + Sync + fmt::Debug {
    /// Bind this copy to one side of one battle. Called before `apply`.
    fn init(&mut self, _binding: Binding) {}

    fn apply(&self, wearer: &mut BattlePlayer<'_>) {
        for attr in self.static_attributes() {
            wearer.apply_item_attribute(attr.kind, attr.amount);
        }
    }

    /// Exact inverse of `apply`.
    fn remove(&self, wearer: &mut BattlePlayer<'_>) {
        for attr in self.static_attributes() {
            wearer.apply_item_attribute(attr.kind, -attr.amount);
        }
    }

    fn on_turn(&mut self, _ctx: &mut EffectContext<'_, '_>) {}
    fn on_attack(&mut self, _ctx: &mut EffectContext<'_, '_>) {}
    fn on_defend(&mut self, _ctx: &mut EffectContext<'_, '_>) {}

    fn static_attributes(&self) -> &[ItemAttribute];

    fn clone_item(&self) -> Box<dyn Item>;
}

impl Clone for Box<dyn Item> {
    fn clone(&self) -> Self {
        self.clone_item()
    }
}

/// The view an item hook gets of the fight: its wearer, the opponent and the
/// battle's damage/stun primitives.
pub struct EffectContext<'c, 'b> {
    pub wearer: &'c mut BattlePlayer<'b>,
    pub opponent: &'c mut BattlePlayer<'b>,
    pub arena: &'c mut Arena<'b>,
}

impl<'c, 'b> EffectContext<'c, 'b> {
    pub fn turn(&self) -> u32 {
        self.arena.turn()
    }

    pub fn roll(&mut self) -> f32 {
        self.arena.roll()
    }

    /// Damage (or heal, when negative) `target` on behalf of the wearer.
    pub fn deal_damage(&mut self, target: Target, amount: f32, source: &str) {
        let striker = self.wearer.striker();
        let receiver = match target {
            Target::Wearer => &mut *self.wearer,
            Target::Opponent => &mut *self.opponent,
        };
        self.arena.deal_damage(&striker, receiver, amount, source);
    }

    pub fn stun(&mut self, target: Target, turns: u32, source: &str) {
        let striker = self.wearer.striker();
        let receiver = match target {
            Target::Wearer => &mut *self.wearer,
            Target::Opponent => &mut *self.opponent,
        };
        self.arena.stun(&striker, receiver, turns, source);
    }
}

/// Pure static bonus item. Also the building block for richer items.
#[derive(Debug, Clone, Default)]
pub struct SimpleItem {
    pub attributes: Vec<ItemAttribute>,
    binding: Option<Binding>,
}

impl SimpleItem {
    pub fn new(attributes: Vec<ItemAttribute>) -> Self {
        Self {
            attributes,
            binding: None,
        }
    }

    pub fn single(kind: ItemAttributeKind, amount: f32) -> Self {
        Self::new(vec![ItemAttribute::new(kind, amount)])
    }
}

impl Item for SimpleItem {
    fn init(&mut self, binding: Binding) {
        self.binding = Some(binding);
    }

    fn static_attributes(&self) -> &[ItemAttribute] {
        &self.attributes
    }

    fn clone_item(&self) -> Box<dyn Item> {
        Box::new(self.clone())
    }
}

/// Who a trigger's effect lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Target {
    Wearer,
    Opponent,
}

/// The battle event a trigger listens to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerEvent {
    Turn,
    Attack,
    Defend,
}

/// Effect body run when a trigger fires.
pub type EffectFn = Arc<dyn Fn(&mut EffectContext<'_, '_>, Target) + Send + Sync>;

/// A probabilistic, event-gated effect.
///
/// `chance` is a probability in `[0, 1]`; `0` means the trigger always fires.
#[derive(Clone)]
pub struct Trigger {
    pub event: TriggerEvent,
    pub chance: f32,
    pub target: Target,
    pub only_once: bool,
    pub effect: EffectFn,
}

impl Trigger {
    pub fn new<F>(event: TriggerEvent, chance: f32, target: Target, effect: F) -> Self
    where
        F: Fn(&mut EffectContext<'_, '_>, Target) + Send + Sync + 'static,
    {
        Self {
            event,
            chance,
            target,
            only_once: false,
            effect: Arc::new(effect),
        }
    }

    pub fn once(mut self) -> Self {
        self.only_once = true;
        self
    }

    /// Roll for this trigger and run the effect on success.
    fn maybe_fire(&self, ctx: &mut EffectContext<'_, '_>) -> bool {
        if self.chance != 0.0 && ctx.roll() > self.chance {
            return false;
        }
        (self.effect)(ctx, self.target);
        true
    }
}

impl fmt::Debug for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Trigger")
            .field("event", &self.event)
            .field("chance", &self.chance)
            .field("target", &self.target)
            .field("only_once", &self.only_once)
            .finish_non_exhaustive()
    }
}

/// Static bonuses plus a list of triggers fired on turn/attack/defend events.
#[derive(Debug, Clone, Default)]
pub struct ItemEffectEmitter {
    pub base: SimpleItem,
    pub triggers: Vec<Trigger>,
    // indices of one-shot triggers that already fired in this fight
    fired: Vec<usize>,
}

impl ItemEffectEmitter {
    pub fn new(attributes: Vec<ItemAttribute>, triggers: Vec<Trigger>) -> Self {
        Self {
            base: SimpleItem::new(attributes),
            triggers,
            fired: Vec::new(),
        }
    }

    pub fn fired(&self) -> &[usize] {
        &self.fired
    }

    fn handle_trigger(&mut self, event: TriggerEvent, ctx: &mut EffectContext<'_, '_>) {
        for (i, trigger) in self.triggers.iter().enumerate() {
            if trigger.event != event {
                continue;
            }
            if trigger.only_once && self.fired.contains(&i) {
                continue;
            }
            if !trigger.maybe_fire(ctx) {
                continue;
            }
            if let Some(binding) = self.base.binding {
                debug!(
                    "Battle {}: {:?} trigger #{} fired for the {:?}",
                    binding.battle_id, event, i, binding.wearer
                );
            }
            if trigger.only_once {
                self.fired.push(i);
            }
        }
    }
}

impl Item for ItemEffectEmitter {
    fn init(&mut self, binding: Binding) {
        self.base.init(binding);
        self.fired.clear();
    }

    fn on_turn(&mut self, ctx: &mut EffectContext<'_, '_>) {
        self.handle_trigger(TriggerEvent::Turn, ctx);
    }

    fn on_attack(&mut self, ctx: &mut EffectContext<'_, '_>) {
        self.handle_trigger(TriggerEvent::Attack, ctx);
    }

    fn on_defend(&mut self, ctx: &mut EffectContext<'_, '_>) {
        self.handle_trigger(TriggerEvent::Defend, ctx);
    }

    fn static_attributes(&self) -> &[ItemAttribute] {
        self.base.static_attributes()
    }

    fn clone_item(&self) -> Box<dyn Item> {
        Box::new(self.clone())
    }
}
