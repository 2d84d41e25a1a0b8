//! The set of known players and their locks.
//!
//! Each player sits behind its own `tokio::sync::Mutex`. Commands lock one
//! player at a time; anything touching two players (battles, transfers) goes
//! through [`lock_pair`], which always locks in id order.

use log::{debug, error, info};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard, OwnedMutexGuard, RwLock};
use tokio::time::Duration;

use super::errors::{GameError, GameResult};
use super::player::Player;
use crate::storage::PlayerStore;

/// Shared, lockable player. The id and name are fixed for the handle's life
/// so they can be read without taking the lock.
#[derive(Clone)]
pub struct PlayerHandle {
    id: Arc<str>,
    name: Arc<str>,
    inner: Arc<Mutex<Player>>,
}

impl PlayerHandle {
    pub fn new(player: Player) -> Self {
        Self {
            id: Arc::from(player.id.as_str()),
            name: Arc::from(player.name.as_str()),
            inner: Arc::new(Mutex::new(player)),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn lock(&self) -> MutexGuard<'_, Player> {
        self.inner.lock().await
    }

    pub async fn lock_owned(&self) -> OwnedMutexGuard<Player> {
        self.inner.clone().lock_owned().await
    }

    /// Copy of the player's current state.
    pub async fn snapshot(&self) -> Player {
        self.inner.lock().await.clone()
    }
}

impl fmt::Debug for PlayerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlayerHandle")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Lock two distinct players, smallest id first. Guards come back in argument
/// order.
///
/// Two handles for the same id would lock one mutex twice, so that is refused
/// with [`GameError::SelfBattle`] instead.
pub async fn lock_pair(
    a: &PlayerHandle,
    b: &PlayerHandle,
) -> GameResult<(OwnedMutexGuard<Player>, OwnedMutexGuard<Player>)> {
    if a.id() == b.id() {
        return Err(GameError::SelfBattle);
    }
    if a.id() < b.id() {
        let ga = a.lock_owned().await;
        let gb = b.lock_owned().await;
        Ok((ga, gb))
    } else {
        let gb = b.lock_owned().await;
        let ga = a.lock_owned().await;
        Ok((ga, gb))
    }
}

/// Move `amount` from one player to another.
pub async fn transfer_money(from: &PlayerHandle, to: &PlayerHandle, amount: i64) -> GameResult<()> {
    if amount <= 0 {
        return Err(GameError::InvalidAmount(amount));
    }
    if from.id() == to.id() {
        return Ok(());
    }
    let (mut payer, mut payee) = lock_pair(from, to).await?;
    payer.ensure_money(amount)?;
    payer.money -= amount;
    payee.money += amount;
    debug!("{} gave {}$ to {}", payer.id, amount, payee.id);
    Ok(())
}

/// Every player the game knows about.
pub struct PlayerRoster {
    players: RwLock<HashMap<String, PlayerHandle>>,
    starting_money: i64,
}

impl PlayerRoster {
    pub fn new(starting_money: i64) -> Self {
        Self {
            players: RwLock::new(HashMap::new()),
            starting_money,
        }
    }

    pub fn from_players(players: Vec<Player>, starting_money: i64) -> Self {
        let map = players
            .into_iter()
            .map(|p| (p.id.clone(), PlayerHandle::new(p)))
            .collect();
        Self {
            players: RwLock::new(map),
            starting_money,
        }
    }

    /// Look up `id`, creating the player with `name` if it is new.
    pub async fn get_create_player(&self, id: &str, name: &str) -> PlayerHandle {
        if let Some(handle) = self.players.read().await.get(id) {
            return handle.clone();
        }
        let mut players = self.players.write().await;
        players
            .entry(id.to_string())
            .or_insert_with(|| {
                info!("New player {} ({})", name, id);
                let mut player = Player::new(id, name);
                player.money = self.starting_money;
                PlayerHandle::new(player)
            })
            .clone()
    }

    pub async fn get(&self, id: &str) -> Option<PlayerHandle> {
        self.players.read().await.get(id).cloned()
    }

    /// Case-insensitive lookup by display name.
    pub async fn find_by_name(&self, name: &str) -> Option<PlayerHandle> {
        self.players
            .read()
            .await
            .values()
            .find(|h| h.name().eq_ignore_ascii_case(name))
            .cloned()
    }

    /// Look a player up by id, then by name.
    pub async fn resolve(&self, key: &str) -> GameResult<PlayerHandle> {
        if let Some(p) = self.get(key).await {
            return Ok(p);
        }
        self.find_by_name(key)
            .await
            .ok_or_else(|| GameError::UnknownPlayer(key.to_string()))
    }

    pub async fn len(&self) -> usize {
        self.players.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.players.read().await.is_empty()
    }

    /// Copies of all players ordered by id. Waits for players that are in a
    /// running battle.
    pub async fn snapshot(&self) -> Vec<Player> {
        let mut handles: Vec<PlayerHandle> = self.players.read().await.values().cloned().collect();
        handles.sort_by(|a, b| a.id().cmp(b.id()));
        let mut out = Vec::with_capacity(handles.len());
        for handle in handles {
            out.push(handle.snapshot().await);
        }
        out
    }

    /// Add every stored player not already present. Returns how many were added.
    pub async fn load(&self, store: &dyn PlayerStore) -> anyhow::Result<usize> {
        let loaded = store.load_all()?;
        let mut players = self.players.write().await;
        let mut added = 0;
        for player in loaded {
            if players.contains_key(&player.id) {
                continue;
            }
            players.insert(player.id.clone(), PlayerHandle::new(player));
            added += 1;
        }
        info!("Loaded {} players", added);
        Ok(added)
    }

    pub async fn save(&self, store: &dyn PlayerStore) -> anyhow::Result<()> {
        let players = self.snapshot().await;
        store.save_all(&players)
    }

    /// Save every `interval` until the task is dropped. Failures are logged.
    pub async fn run_autosave(self: Arc<Self>, store: Arc<dyn PlayerStore>, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        // the first tick fires immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match self.save(store.as_ref()).await {
                Ok(()) => debug!("Autosaved roster"),
                Err(e) => error!("Autosave failed: {:#}", e),
            }
        }
    }
}
