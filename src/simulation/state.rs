//! Per-player view of the world handed to agents

use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::core::config::{BoardConfig, PlayerSpec};
use crate::core::types::{PlayerId, Turn};
use crate::simulation::food::FoodMap;
use crate::simulation::snake::Snake;

/// Simulation-facing facts about a player
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerInfo {
    pub id: PlayerId,
    pub name: String,
    pub silent: bool,
    pub wait_for: bool,
    /// How long the engine waits for a reply; `None` waits indefinitely
    pub deadline: Option<Duration>,
}

impl PlayerInfo {
    /// Resolve the effective reply deadline
    ///
    /// Waiting players get none. Otherwise the explicit timeout applies,
    /// falling back to the turn duration; an unpaced game waits.
    pub fn from_spec(id: PlayerId, spec: &PlayerSpec, turn_duration: Duration) -> Self {
        let deadline = if spec.wait {
            None
        } else {
            spec.timeout()
                .or_else(|| (!turn_duration.is_zero()).then_some(turn_duration))
        };
        Self {
            id,
            name: spec.name.clone(),
            silent: spec.silent,
            wait_for: spec.wait,
            deadline,
        }
    }
}

/// Immutable copy of the world from one player's point of view
#[derive(Debug, Clone, Serialize)]
pub struct PlayerState {
    pub id: PlayerId,
    pub turn: Turn,
    pub board: BoardConfig,
    pub players: Vec<PlayerInfo>,
    pub snakes: BTreeMap<PlayerId, Snake>,
    pub food: FoodMap,
}

impl PlayerState {
    /// The requesting player's own snake
    pub fn me(&self) -> Option<&Snake> {
        self.snakes.get(&self.id)
    }

    pub fn info(&self) -> Option<&PlayerInfo> {
        self.players.iter().find(|p| p.id == self.id)
    }

    /// Other snakes that are currently alive
    pub fn rivals(&self) -> impl Iterator<Item = (PlayerId, &Snake)> + '_ {
        self.snakes
            .iter()
            .filter(move |(id, s)| **id != self.id && s.is_alive())
            .map(|(id, s)| (*id, s))
    }
}
