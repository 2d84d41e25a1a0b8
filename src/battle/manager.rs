//! Registry of pending and running battles.
//!
//! The registry is the only place that enforces "one battle per player". All
//! registry changes (add, accept, sweep) happen under one mutex. Each battle
//! has its own `RwLock`, held for writing by the task that runs it, so the
//! registry never waits on a running battle: a battle whose lock is taken is
//! simply treated as running.

use log::{debug, error, info};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Duration;
use uuid::Uuid;

use super::catalog::ItemCatalog;
use super::engine::{Battle, BattleOutcome};
use crate::messaging::ChatSink;

pub type SharedBattle = Arc<RwLock<Battle>>;

struct TrackedBattle {
    id: Uuid,
    initiator_id: String,
    defender_id: String,
    battle: SharedBattle,
}

impl TrackedBattle {
    fn involves(&self, player_id: &str) -> bool {
        self.initiator_id == player_id || self.defender_id == player_id
    }

    /// Finished battles no longer block their players. A locked battle is running.
    fn is_active(&self) -> bool {
        match self.battle.try_read() {
            Ok(b) => !b.is_finished(),
            Err(_) => true,
        }
    }

    fn is_pending(&self) -> bool {
        match self.battle.try_read() {
            Ok(b) => b.is_pending(),
            Err(_) => false,
        }
    }
}

pub struct BattleManager {
    battles: Mutex<Vec<TrackedBattle>>,
    catalog: Arc<ItemCatalog>,
    chat: Arc<dyn ChatSink>,
    timeout: Duration,
}

impl BattleManager {
    pub fn new(catalog: Arc<ItemCatalog>, chat: Arc<dyn ChatSink>, timeout: Duration) -> Self {
        Self {
            battles: Mutex::new(Vec::new()),
            catalog,
            chat,
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Register `battle` unless one of its players is already in an active one.
    pub async fn maybe_add_battle(&self, battle: Battle) -> bool {
        let mut battles = self.battles.lock().await;
        let initiator_id = battle.initiator.id().to_string();
        let defender_id = battle.defender.id().to_string();

        let busy = battles.iter().any(|t| {
            (t.involves(&initiator_id) || t.involves(&defender_id)) && t.is_active()
        });
        if busy {
            debug!("Rejected battle {} vs {}: already battling", initiator_id, defender_id);
            return false;
        }

        info!("Registered battle {} ({} vs {})", battle.id, initiator_id, defender_id);
        battles.push(TrackedBattle {
            id: battle.id,
            initiator_id,
            defender_id,
            battle: Arc::new(RwLock::new(battle)),
        });
        true
    }

    /// Whether `player_id` is part of an active registered battle.
    pub async fn is_busy(&self, player_id: &str) -> bool {
        self.battles
            .lock()
            .await
            .iter()
            .any(|t| t.involves(player_id) && t.is_active())
    }

    /// Start the pending battle where `player_id` is the defender.
    pub async fn maybe_accept_battle(&self, player_id: &str) -> bool {
        self.accept_battle(player_id).await.is_some()
    }

    /// Like [`maybe_accept_battle`](Self::maybe_accept_battle) but hands back
    /// the battle task.
    pub async fn accept_battle(&self, player_id: &str) -> Option<JoinHandle<Option<BattleOutcome>>> {
        let battles = self.battles.lock().await;
        let tracked = battles
            .iter()
            .find(|t| t.defender_id == player_id && t.is_pending())?;
        info!("Battle {} accepted by {}", tracked.id, player_id);
        Some(self.launch(tracked.battle.clone()))
    }

    /// Run a battle without registering it (monster fights).
    pub fn spawn_battle(&self, battle: Battle) -> JoinHandle<Option<BattleOutcome>> {
        self.launch(Arc::new(RwLock::new(battle)))
    }

    /// Run `battle` in its own task. A panic inside the fight is caught here,
    /// the battle is force-finished and the channel is told.
    fn launch(&self, battle: SharedBattle) -> JoinHandle<Option<BattleOutcome>> {
        let catalog = self.catalog.clone();
        let chat = self.chat.clone();

        tokio::spawn(async move {
            let inner = {
                let battle = battle.clone();
                let catalog = catalog.clone();
                let chat = chat.clone();
                tokio::spawn(async move {
                    let mut guard = battle.write().await;
                    guard.run(&catalog, chat.as_ref()).await
                })
            };

            match inner.await {
                Ok(outcome) => Some(outcome),
                Err(e) => {
                    let reason = if e.is_panic() {
                        "something went wrong while fighting"
                    } else {
                        "the battle was cancelled"
                    };
                    let mut guard = battle.write().await;
                    error!("Battle {} task failed: {}", guard.id, e);
                    guard.abort(chat.as_ref(), reason);
                    None
                }
            }
        })
    }

    /// Drop finished battles and expire pending ones past the timeout.
    pub async fn check_battles(&self) {
        let mut battles = self.battles.lock().await;
        let before = battles.len();
        let timeout = self.timeout;
        let chat = self.chat.clone();

        battles.retain(|t| match t.battle.try_write() {
            Ok(mut b) => {
                if b.is_finished() {
                    return false;
                }
                if b.is_pending() && b.is_expired(timeout) {
                    b.expire(chat.as_ref());
                    return false;
                }
                true
            }
            // locked by its battle task
            Err(_) => true,
        });

        if battles.len() != before {
            debug!("Sweep removed {} battles, {} left", before - battles.len(), battles.len());
        }
    }

    /// Number of registered battles, including finished ones not yet swept.
    pub async fn len(&self) -> usize {
        self.battles.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.battles.lock().await.is_empty()
    }

    /// Sweep every `interval` until the task is dropped.
    pub async fn run(self: Arc<Self>, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            self.check_battles().await;
        }
    }
}
