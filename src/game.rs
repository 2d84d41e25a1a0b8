//! The game as seen by a chat front end.
//!
//! [`Game`] is built once at startup from its collaborators (catalog, roster,
//! chat sink, randomness) and passed by reference to whatever turns chat
//! commands into calls. It lives for the whole process and owns no global
//! state; tests build as many as they like.

use log::info;
use std::fmt::Write;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::battle::attribute::AttributeType;
use crate::battle::catalog::ItemCatalog;
use crate::battle::combatant::stats_summary;
use crate::battle::engine::{Battle, BattleOutcome};
use crate::battle::errors::{GameError, GameResult};
use crate::battle::manager::BattleManager;
use crate::battle::monster::MonsterGenerator;
use crate::battle::player::EquipmentSlot;
use crate::battle::rng::{entropy_rollers, RollerFactory};
use crate::battle::roster::{transfer_money, PlayerHandle, PlayerRoster};
use crate::config::GameConfig;
use crate::messaging::ChatSink;

/// Task running one battle; resolves to `None` if the fight faulted.
pub type BattleTask = JoinHandle<Option<BattleOutcome>>;

pub struct Game {
    config: GameConfig,
    catalog: Arc<ItemCatalog>,
    roster: Arc<PlayerRoster>,
    manager: Arc<BattleManager>,
    monsters: MonsterGenerator,
    chat: Arc<dyn ChatSink>,
    rollers: RollerFactory,
}

impl Game {
    pub fn new(
        config: GameConfig,
        catalog: Arc<ItemCatalog>,
        roster: Arc<PlayerRoster>,
        chat: Arc<dyn ChatSink>,
    ) -> Self {
        let manager = Arc::new(BattleManager::new(
            catalog.clone(),
            chat.clone(),
            config.battle_timeout(),
        ));
        Self {
            config,
            catalog,
            roster,
            manager,
            monsters: MonsterGenerator::default(),
            chat,
            rollers: entropy_rollers(),
        }
    }

    /// Replace the per-battle random source (seeded runs, tests).
    pub fn with_rollers(mut self, rollers: RollerFactory) -> Self {
        self.rollers = rollers;
        self
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn catalog(&self) -> &ItemCatalog {
        &self.catalog
    }

    pub fn roster(&self) -> &Arc<PlayerRoster> {
        &self.roster
    }

    pub fn manager(&self) -> &Arc<BattleManager> {
        &self.manager
    }

    /// Start the expiry sweep.
    pub fn spawn_sweeper(&self) -> JoinHandle<()> {
        tokio::spawn(self.manager.clone().run(self.config.sweep_interval()))
    }

    async fn player(&self, id: &str, name: &str) -> PlayerHandle {
        self.roster.get_create_player(id, name).await
    }

    /// Challenge another player. The defender has to accept before the
    /// battle timeout.
    pub async fn request_battle(
        &self,
        channel: &str,
        initiator: (&str, &str),
        defender: (&str, &str),
        stake: Option<i64>,
    ) -> GameResult<()> {
        if initiator.0 == defender.0 {
            return Err(GameError::SelfBattle);
        }
        let stake = stake.unwrap_or(self.config.default_stake);
        if stake < 0 {
            return Err(GameError::InvalidAmount(stake));
        }

        let attacker = self.player(initiator.0, initiator.1).await;
        let target = self.player(defender.0, defender.1).await;
        for handle in [&attacker, &target] {
            if self.manager.is_busy(handle.id()).await {
                return Err(GameError::AlreadyInBattle(handle.name().to_string()));
            }
            handle.lock().await.ensure_money(stake)?;
        }

        let battle = Battle::new(attacker.clone(), target.clone(), stake, channel)
            .with_roller((self.rollers)());
        if !self.manager.maybe_add_battle(battle).await {
            return Err(GameError::AlreadyInBattle(target.name().to_string()));
        }

        self.chat.send_message(
            channel,
            &format!(
                "<@{}> **{}** challenged you to a battle for **{}$**! You have {} seconds to accept",
                target.id(),
                attacker.name(),
                stake,
                self.config.battle_timeout_secs
            ),
        );
        Ok(())
    }

    pub async fn accept_battle(&self, player_id: &str) -> GameResult<BattleTask> {
        self.manager
            .accept_battle(player_id)
            .await
            .ok_or(GameError::NoPendingBattle)
    }

    /// Fight a generated monster right away. Losing costs nothing; winning
    /// pays the monster's money.
    pub async fn fight_monster(&self, channel: &str, id: &str, name: &str) -> GameResult<BattleTask> {
        let human = self.player(id, name).await;
        if self.manager.is_busy(id).await {
            return Err(GameError::AlreadyInBattle(human.name().to_string()));
        }
        let level = human.lock().await.level();

        let mut roller = (self.rollers)();
        let monster = self.monsters.get_monster(level, roller.as_mut());
        let stake = monster.player.money;
        info!(
            "{} meets {} (level {})",
            human.name(),
            monster.player.name,
            monster.player.level()
        );
        self.chat.send_message(
            channel,
            &format!(
                "**{}** encountered a **{}** (level {})!",
                human.name(),
                monster.player.name,
                monster.player.level()
            ),
        );

        let battle = Battle::new(human, PlayerHandle::new(monster.player), stake, channel)
            .monster()
            .with_roller(roller);
        Ok(self.manager.spawn_battle(battle))
    }

    pub async fn stats(&self, id: &str, name: &str) -> String {
        let handle = self.player(id, name).await;
        let player = handle.lock().await;
        stats_summary(&player, &self.catalog)
    }

    /// Spend attribute points. Returns the points left.
    pub async fn upgrade(
        &self,
        id: &str,
        name: &str,
        attribute: AttributeType,
        amount: i32,
    ) -> GameResult<i64> {
        let handle = self.player(id, name).await;
        let mut player = handle.lock().await;
        player.upgrade_attribute(attribute, amount)?;
        Ok(player.available_attribute_points())
    }

    /// Items for sale, one per line.
    pub fn shop(&self) -> String {
        let mut out = String::from("**Shop**");
        for item in self.catalog.iter().filter(|t| t.can_buy) {
            let _ = write!(
                out,
                "\n#{} **{}** - {}$ [{}]: {}",
                item.id,
                item.name,
                item.cost,
                item.slots_label(),
                item.description
            );
        }
        out
    }

    /// Buy item `item_id`. Returns its name.
    pub async fn buy(&self, id: &str, name: &str, item_id: u32) -> GameResult<String> {
        let item_type = self
            .catalog
            .get(item_id)
            .ok_or(GameError::UnknownItem(item_id))?;
        let handle = self.player(id, name).await;
        handle.lock().await.buy_item(item_type)?;
        Ok(item_type.name.clone())
    }

    /// Sell inventory entry `index`. Returns the refund.
    pub async fn sell(&self, id: &str, name: &str, index: usize) -> GameResult<i64> {
        let handle = self.player(id, name).await;
        let mut player = handle.lock().await;
        let item_id = player
            .inventory
            .get(index)
            .ok_or(GameError::InvalidInventorySlot(index))?
            .item_type_id;
        let item_type = self
            .catalog
            .get(item_id)
            .ok_or(GameError::UnknownItem(item_id))?;
        player.sell_item(index, item_type)
    }

    pub async fn inventory(&self, id: &str, name: &str) -> String {
        let handle = self.player(id, name).await;
        let player = handle.lock().await;
        if player.inventory.is_empty() {
            return "Your inventory is empty".to_string();
        }
        let mut out = String::from("**Inventory**");
        for (i, entry) in player.inventory.iter().enumerate() {
            let item_name = self
                .catalog
                .get(entry.item_type_id)
                .map(|t| t.name.as_str())
                .unwrap_or("???");
            if entry.equipment_slot.is_equipped() {
                let _ = write!(out, "\n{}: {} ({})", i, item_name, entry.equipment_slot);
            } else {
                let _ = write!(out, "\n{}: {}", i, item_name);
            }
        }
        out
    }

    pub async fn equip(
        &self,
        id: &str,
        name: &str,
        index: usize,
        slot: Option<EquipmentSlot>,
    ) -> GameResult<EquipmentSlot> {
        let handle = self.player(id, name).await;
        let mut player = handle.lock().await;
        let item_id = player
            .inventory
            .get(index)
            .ok_or(GameError::InvalidInventorySlot(index))?
            .item_type_id;
        let item_type = self
            .catalog
            .get(item_id)
            .ok_or(GameError::UnknownItem(item_id))?;
        player.equip_item(index, slot, item_type)
    }

    pub async fn unequip(&self, id: &str, name: &str, index: usize) -> GameResult<Option<u32>> {
        let handle = self.player(id, name).await;
        let result = handle.lock().await.unequip_index(index);
        result
    }

    /// Admin grant of a free item.
    pub async fn give_item(
        &self,
        admin_id: &str,
        target: (&str, &str),
        item_id: u32,
    ) -> GameResult<()> {
        if !self.config.is_admin(admin_id) {
            return Err(GameError::NotAdmin(admin_id.to_string()));
        }
        let item_type = self
            .catalog
            .get(item_id)
            .ok_or(GameError::UnknownItem(item_id))?;
        let handle = self.player(target.0, target.1).await;
        handle.lock().await.grant_item(item_type);
        info!("{} granted {} to {}", admin_id, item_type.name, target.0);
        Ok(())
    }

    pub async fn give_money(&self, from: (&str, &str), to: (&str, &str), amount: i64) -> GameResult<()> {
        let payer = self.player(from.0, from.1).await;
        let payee = self.player(to.0, to.1).await;
        transfer_money(&payer, &payee, amount).await
    }
}
