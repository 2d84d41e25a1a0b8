//! # Configuration
//!
//! Battlebot reads a single TOML file. Every section and field has a default,
//! so an empty file (or a partial one) is a valid configuration.
//!
//! ```toml
//! [game]
//! battle_timeout_secs = 60
//! sweep_interval_ms = 1000
//! default_stake = 1
//! starting_money = 20
//! admin_ids = ["1234"]
//!
//! [storage]
//! data_dir = "./data"
//! save_interval_secs = 60
//!
//! [logging]
//! level = "info"
//! file = "battlebot.log"
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use battlebot::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     Config::create_default("config.toml").await?;
//!     let config = Config::load("config.toml").await?;
//!     println!("Battles expire after {}s", config.game.battle_timeout_secs);
//!     Ok(())
//! }
//! ```

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::fs;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub game: GameConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Seconds a challenge waits for the defender before expiring.
    pub battle_timeout_secs: u64,
    /// How often pending battles are swept.
    pub sweep_interval_ms: u64,
    /// Stake used when a challenge names none.
    pub default_stake: i64,
    /// Money given to newly created players.
    pub starting_money: i64,
    /// Player ids allowed to grant items.
    pub admin_ids: Vec<String>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            battle_timeout_secs: 60,
            sweep_interval_ms: 1000,
            default_stake: 1,
            starting_money: 20,
            admin_ids: Vec::new(),
        }
    }
}

impl GameConfig {
    pub fn battle_timeout(&self) -> Duration {
        Duration::from_secs(self.battle_timeout_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms.max(1))
    }

    pub fn is_admin(&self, id: &str) -> bool {
        self.admin_ids.iter().any(|a| a == id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: String,
    pub save_interval_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "./data".to_string(),
            save_interval_secs: 60,
        }
    }
}

impl StorageConfig {
    pub fn save_interval(&self) -> Duration {
        Duration::from_secs(self.save_interval_secs.max(1))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl LoggingConfig {
    pub fn level_filter(&self) -> log::LevelFilter {
        self.level.parse().unwrap_or(log::LevelFilter::Info)
    }
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        Ok(config)
    }

    /// Write the default configuration to `path`
    pub async fn create_default(path: &str) -> Result<()> {
        let content = toml::to_string_pretty(&Config::default())
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }
}
