//! # Battlebot - Turn-Based Battles for Chat Characters
//!
//! Players build up a persistent character (XP, attribute points, money and
//! equipment) and fight each other or generated monsters. Every fight is
//! resolved in one go and narrated back to the chat channel.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use battlebot::battle::{ItemCatalog, PlayerRoster};
//! use battlebot::config::Config;
//! use battlebot::game::Game;
//! use battlebot::messaging::LogSink;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     let roster = Arc::new(PlayerRoster::new(config.game.starting_money));
//!     let game = Game::new(config.game, Arc::new(ItemCatalog::default()), roster, Arc::new(LogSink));
//!     let _sweeper = game.spawn_sweeper();
//!
//!     game.request_battle("general", ("1", "alice"), ("2", "bob"), Some(0)).await?;
//!     let fight = game.accept_battle("2").await?;
//!     fight.await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`battle`] - players, items, combatants, the battle state machine and registry
//! - [`game`] - the player-facing operations, wired from explicit collaborators
//! - [`messaging`] - outgoing chat messages
//! - [`storage`] - roster persistence
//! - [`config`] - TOML configuration
//! - [`logutil`] - log formatting helpers
//!
//! ## Concurrency
//!
//! Each player sits behind its own async mutex, held for the whole of any
//! battle it takes part in. Battles run in their own tokio task; a panic inside
//! one is caught at the task boundary, the battle is marked finished and the
//! channel is told, while the registry and other battles carry on.

pub mod battle;
pub mod config;
pub mod game;
pub mod logutil;
pub mod messaging;
pub mod storage;
