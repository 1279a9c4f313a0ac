pub mod config;
pub mod error;
pub mod rng;
pub mod types;

pub use config::{AgentKind, BoardConfig, Difficulty, FoodConfig, GameConfig, PlayerSpec};
pub use error::{ArenaError, Result};
pub use rng::RngProvider;
pub use types::{PlayerId, Turn};
