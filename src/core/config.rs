//! Game configuration
//!
//! Loaded from TOML. Every field has a default so a partial file is valid;
//! the defaults reproduce a 32×32 board with one random and three built-in
//! players.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::core::error::{ArenaError, Result};
use crate::spatial::{Bounds, Direction};

/// Food parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FoodConfig {
    /// Number of food items kept on the board
    pub count: u32,
    /// Turns a food item lasts; 0 disables rotting
    pub lifetime: u32,
    /// Length gained from fresh food; rotten food at the end of its life
    /// is worth `-value`
    pub value: i32,
}

impl Default for FoodConfig {
    fn default() -> Self {
        Self {
            count: 1,
            lifetime: 0,
            value: 5,
        }
    }
}

/// The rules of the board, shared read-only with every agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardConfig {
    pub width: i32,
    pub height: i32,
    pub max_turns: u32,
    /// Turns a dead snake waits before it may respawn
    pub respawn_time: u32,
    /// Target length of a freshly spawned snake
    pub initial_length: u32,
    pub food: FoodConfig,
}

impl BoardConfig {
    pub fn bounds(&self) -> Bounds {
        Bounds::new(self.width, self.height)
    }
}

impl Default for BoardConfig {
    fn default() -> Self {
        GameConfig::default().board()
    }
}

/// Built-in heuristic strength
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

/// Which decision provider drives a player
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AgentKind {
    Random,
    Builtin {
        difficulty: Difficulty,
    },
    /// External process speaking the line protocol on stdin/stdout
    Custom {
        executable: String,
        #[serde(default)]
        args: Vec<String>,
    },
    /// Keyboard input; `keys` maps a direction name to a key name
    Human {
        keys: BTreeMap<String, String>,
    },
}

/// One entry of the player list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSpec {
    pub name: String,
    pub agent: AgentKind,
    /// Suppress the agent's chat output
    #[serde(default)]
    pub silent: bool,
    /// Per-move deadline in milliseconds; falls back to the turn duration
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    /// Always wait for this player's reply, however long it takes
    #[serde(default)]
    pub wait: bool,
}

impl PlayerSpec {
    pub fn new(name: impl Into<String>, agent: AgentKind) -> Self {
        Self {
            name: name.into(),
            agent,
            silent: false,
            timeout_ms: None,
            wait: false,
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }
}

/// Top-level configuration aggregate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub width: i32,
    pub height: i32,
    /// Master seed; a random one is drawn when absent
    pub seed: Option<u64>,
    pub max_turns: u32,
    /// Pacing; 0 runs turns as fast as agents reply
    pub turns_per_second: f64,
    pub respawn_time: u32,
    pub initial_length: u32,
    pub food: FoodConfig,
    pub players: Vec<PlayerSpec>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            width: 32,
            height: 32,
            seed: None,
            max_turns: 1500,
            turns_per_second: 0.0,
            respawn_time: 10,
            initial_length: 5,
            food: FoodConfig::default(),
            players: vec![
                PlayerSpec::new("Randy", AgentKind::Random),
                PlayerSpec::new(
                    "Easy",
                    AgentKind::Builtin {
                        difficulty: Difficulty::Easy,
                    },
                ),
                PlayerSpec::new(
                    "Medium",
                    AgentKind::Builtin {
                        difficulty: Difficulty::Medium,
                    },
                ),
                PlayerSpec::new(
                    "Hard",
                    AgentKind::Builtin {
                        difficulty: Difficulty::Hard,
                    },
                ),
            ],
        }
    }
}

impl GameConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: GameConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn board(&self) -> BoardConfig {
        BoardConfig {
            width: self.width,
            height: self.height,
            max_turns: self.max_turns,
            respawn_time: self.respawn_time,
            initial_length: self.initial_length,
            food: self.food,
        }
    }

    /// Nominal wall-clock duration of a turn; zero when unpaced
    pub fn turn_duration(&self) -> Duration {
        if self.turns_per_second > 0.0 && self.turns_per_second.is_finite() {
            Duration::try_from_secs_f64(1.0 / self.turns_per_second).unwrap_or(Duration::MAX)
        } else {
            Duration::ZERO
        }
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.width <= 0 || self.height <= 0 {
            return Err(ArenaError::Config(format!(
                "board must have positive dimensions, got {}x{}",
                self.width, self.height
            )));
        }

        if self.players.is_empty() {
            return Err(ArenaError::Config("at least one player is required".into()));
        }

        let tps = self.turns_per_second;
        if tps.is_nan() || tps < 0.0 {
            return Err(ArenaError::Config(format!(
                "turns_per_second must be zero or positive, got {tps}"
            )));
        }
        if tps > 0.0 && Duration::try_from_secs_f64(1.0 / tps).is_err() {
            return Err(ArenaError::Config(format!("turns_per_second {tps} is too slow")));
        }

        if self.initial_length == 0 {
            return Err(ArenaError::Config("initial_length must be at least 1".into()));
        }

        for player in &self.players {
            match &player.agent {
                AgentKind::Custom { executable, .. } if executable.trim().is_empty() => {
                    return Err(ArenaError::Config(format!(
                        "player {} has no executable",
                        player.name
                    )));
                }
                AgentKind::Human { keys } => {
                    let bound: Vec<Direction> = keys
                        .keys()
                        .map(|d| Direction::parse(d))
                        .filter(|d| !d.is_none())
                        .collect();
                    let complete = Direction::CARDINALS.iter().all(|d| bound.contains(d));
                    if !complete {
                        return Err(ArenaError::Config(format!(
                            "player {} must bind all four directions",
                            player.name
                        )));
                    }
                }
                _ => {}
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = GameConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.players.len(), 4);
        assert_eq!(config.turn_duration(), Duration::ZERO);
    }

    #[test]
    fn test_turn_duration_from_rate() {
        let config = GameConfig {
            turns_per_second: 4.0,
            ..GameConfig::default()
        };
        assert_eq!(config.turn_duration(), Duration::from_millis(250));
    }

    #[test]
    fn test_parse_partial_toml() {
        let toml = r#"
            width = 20
            height = 10
            seed = 7
            max_turns = 100

            [food]
            count = 3
            lifetime = 50

            [[players]]
            name = "Hard"
            agent = { type = "builtin", difficulty = "hard" }

            [[players]]
            name = "Bot"
            timeout_ms = 150
            agent = { type = "custom", executable = "./bot", args = ["--fast"] }
        "#;

        let config = GameConfig::from_toml_str(toml).expect("valid config");
        assert_eq!(config.width, 20);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.food.count, 3);
        assert_eq!(config.food.value, 5);
        assert_eq!(config.respawn_time, 10);
        assert_eq!(config.players.len(), 2);
        assert_eq!(
            config.players[0].agent,
            AgentKind::Builtin {
                difficulty: Difficulty::Hard
            }
        );
        assert_eq!(config.players[1].timeout(), Some(Duration::from_millis(150)));
    }

    #[test]
    fn test_rejects_unrepresentable_pace() {
        for tps in [1e-20, -1.0, f64::NAN] {
            let config = GameConfig {
                turns_per_second: tps,
                ..GameConfig::default()
            };
            assert!(matches!(config.validate(), Err(ArenaError::Config(_))), "{tps}");
        }
        let tiny = GameConfig {
            turns_per_second: 1e-20,
            ..GameConfig::default()
        };
        assert_eq!(tiny.turn_duration(), Duration::MAX);
    }

    #[test]
    fn test_rejects_incomplete_key_bindings() {
        let mut keys = BTreeMap::new();
        keys.insert("north".to_string(), "w".to_string());
        keys.insert("south".to_string(), "s".to_string());
        let config = GameConfig {
            players: vec![PlayerSpec::new("Me", AgentKind::Human { keys })],
            ..GameConfig::default()
        };
        assert!(matches!(config.validate(), Err(ArenaError::Config(_))));
    }

    #[test]
    fn test_rejects_empty_board() {
        let config = GameConfig {
            width: 0,
            ..GameConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_timeout_means_unset() {
        let mut spec = PlayerSpec::new("x", AgentKind::Random);
        spec.timeout_ms = Some(0);
        assert_eq!(spec.timeout(), None);
    }
}
