//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use battlebot::battle::{
    ItemCatalog, Player, PlayerRoster, Roller, RollerFactory, ScriptedRoller,
};
use battlebot::config::GameConfig;
use battlebot::game::Game;
use battlebot::messaging::{ChatSink, OutgoingMessage};

/// Chat sink that keeps every message for inspection.
#[derive(Default)]
pub struct RecordingSink {
    messages: Mutex<Vec<OutgoingMessage>>,
}

impl RecordingSink {
    pub fn messages(&self) -> Vec<OutgoingMessage> {
        self.messages.lock().unwrap().clone()
    }

    pub fn count_containing(&self, needle: &str) -> usize {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.text.contains(needle))
            .count()
    }
}

impl ChatSink for RecordingSink {
    fn send_message(&self, channel: &str, text: &str) {
        self.messages.lock().unwrap().push(OutgoingMessage {
            channel: channel.to_string(),
            text: text.to_string(),
        });
    }
}

/// Every roll returns `value`. 0.5 never misses or dodges at low agility and
/// gives a variance of exactly 1.0.
pub fn fixed_rollers(value: f32) -> RollerFactory {
    Arc::new(move || Box::new(ScriptedRoller::constant(value)) as Box<dyn Roller>)
}

pub fn player(id: &str, name: &str, money: i64) -> Player {
    let mut p = Player::new(id, name);
    p.money = money;
    p
}

pub struct Fixture {
    pub game: Game,
    pub sink: Arc<RecordingSink>,
}

pub fn game_with(catalog: ItemCatalog, rollers: RollerFactory, players: Vec<Player>) -> Fixture {
    let config = GameConfig::default();
    let sink = Arc::new(RecordingSink::default());
    let roster = Arc::new(PlayerRoster::from_players(players, config.starting_money));
    let game = Game::new(config, Arc::new(catalog), roster, sink.clone()).with_rollers(rollers);
    Fixture { game, sink }
}

pub fn fixed_game(players: Vec<Player>) -> Fixture {
    game_with(ItemCatalog::default(), fixed_rollers(0.5), players)
}
