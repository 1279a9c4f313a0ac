use thiserror::Error;

use crate::core::types::PlayerId;

#[derive(Error, Debug)]
pub enum ArenaError {
    #[error("Agent for player {player} failed to start: {reason}")]
    Startup { player: PlayerId, reason: String },

    #[error("Decision error: {0}")]
    Decision(String),

    #[error("Agent did not reply before the deadline")]
    Timeout,

    #[error("Simulation error: {0}")]
    Simulation(String),

    #[error("No free cell on the board")]
    NoSpace,

    #[error("Player {0} should not receive state this turn")]
    NotReceivingState(PlayerId),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl ArenaError {
    /// Errors that only cost a player its move for one turn
    pub fn is_transient(&self) -> bool {
        matches!(self, ArenaError::Decision(_) | ArenaError::Timeout)
    }
}

pub type Result<T> = std::result::Result<T, ArenaError>;
