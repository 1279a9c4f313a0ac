//! The simulation state machine
//!
//! `SnakeGame` owns the world and is its only writer. One call to
//! `apply_turn` moves every live snake, resolves collisions and feeding
//! against the post-move board, rots food, and runs the spawn passes.

use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;
use std::time::Instant;

use crate::core::config::BoardConfig;
use crate::core::error::{ArenaError, Result};
use crate::core::rng::RngProvider;
use crate::core::types::{PlayerId, Turn};
use crate::simulation::collision::{resolve_collisions, Death, Meal};
use crate::simulation::food::{fresh_lifetime, rot};
use crate::simulation::snake::Snake;
use crate::simulation::state::{PlayerInfo, PlayerState};
use crate::simulation::world::World;
use crate::spatial::Direction;

/// What happened during one applied turn
#[derive(Debug, Clone, Default)]
pub struct TurnOutcome {
    pub turn: Turn,
    pub deaths: Vec<Death>,
    pub meals: Vec<Meal>,
    pub spawned: Vec<PlayerId>,
}

pub struct SnakeGame {
    board: BoardConfig,
    players: Vec<PlayerInfo>,
    world: World,
    rng_provider: RngProvider,
    rng: ChaCha8Rng,
}

impl SnakeGame {
    /// A game with no snakes or food until `reset` is called
    pub fn new(board: BoardConfig, players: Vec<PlayerInfo>) -> Self {
        let rng_provider = RngProvider::new(0);
        Self {
            board,
            players,
            world: World::new(),
            rng: rng_provider.world_stream(),
            rng_provider,
        }
    }

    pub fn board(&self) -> &BoardConfig {
        &self.board
    }

    pub fn players(&self) -> &[PlayerInfo] {
        &self.players
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    /// Direct access for scenario setup
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn turn(&self) -> Turn {
        self.world.turn
    }

    /// Fresh deterministic stream for a player's agent
    pub fn player_rng(&self, id: PlayerId) -> ChaCha8Rng {
        self.rng_provider.player_stream(id)
    }

    /// Start over with a new master seed
    ///
    /// A board too small for every snake and food item places what fits.
    pub fn reset(&mut self, seed: u64) {
        self.rng_provider = RngProvider::new(seed);
        self.rng = self.rng_provider.world_stream();

        self.world = World::new();
        self.world.start_time = Instant::now();
        for player in &self.players {
            self.world.snakes.insert(player.id, Snake::new());
        }

        let spawned = self.spawn_snakes();
        self.spawn_food();

        tracing::info!(
            seed,
            snakes = spawned.len(),
            food = self.world.food.len(),
            "game reset"
        );
    }

    /// True iff the player's snake exists and is alive
    pub fn should_receive_turn_state(&self, id: PlayerId) -> bool {
        self.world.snake(id).is_some_and(Snake::is_alive)
    }

    /// Deep copy of the world for one player
    pub fn snapshot(&self, id: PlayerId) -> Result<PlayerState> {
        if !self.should_receive_turn_state(id) {
            return Err(ArenaError::NotReceivingState(id));
        }
        Ok(PlayerState {
            id,
            turn: self.world.turn,
            board: self.board,
            players: self.players.clone(),
            snakes: self.world.snakes.clone(),
            food: self.world.food.clone(),
        })
    }

    /// Apply one turn of decisions
    ///
    /// Every live snake moves; a player missing from `actions` keeps its
    /// heading. Actions for unknown or dead players are ignored.
    pub fn apply_turn(&mut self, actions: &BTreeMap<PlayerId, Direction>) -> Result<TurnOutcome> {
        self.world.turn += 1;
        let turn = self.world.turn;

        for id in actions.keys() {
            if !self.world.snakes.contains_key(id) {
                tracing::debug!(player = %id, turn, "ignoring action for unknown player");
            }
        }

        for (id, snake) in self.world.snakes.iter_mut() {
            if snake.is_dead() {
                continue;
            }
            let requested = actions.get(id).copied().unwrap_or_default();
            snake.advance(requested);
        }

        let report = resolve_collisions(&mut self.world, &self.board);
        for death in &report.deaths {
            tracing::debug!(player = %death.player, turn, cause = ?death.cause, "snake died");
        }

        rot(&mut self.world.food, &self.board.food);

        let spawned = self.spawn_snakes();
        self.spawn_food();

        self.check_invariants()?;

        Ok(TurnOutcome {
            turn,
            deaths: report.deaths,
            meals: report.meals,
            spawned,
        })
    }

    pub fn is_game_over(&self) -> bool {
        self.world.turn >= self.board.max_turns
    }

    /// Respawn every dead snake whose countdown has elapsed, in id order
    fn spawn_snakes(&mut self) -> Vec<PlayerId> {
        let bounds = self.board.bounds();
        let ids: Vec<PlayerId> = self.world.snakes.keys().copied().collect();
        let mut spawned = Vec::new();

        for id in ids {
            let ready = match self.world.snakes.get_mut(&id) {
                Some(snake) if snake.is_dead() => snake.tick_respawn(),
                _ => false,
            };
            if !ready {
                continue;
            }

            // No space: stay dead and try again next turn
            let Ok(point) = self.world.find_free_cell(bounds, &mut self.rng) else {
                continue;
            };
            if let Some(snake) = self.world.snakes.get_mut(&id) {
                snake.spawn_at(point, self.board.initial_length, self.board.respawn_time);
                spawned.push(id);
            }
        }

        spawned
    }

    /// Top food back up to the configured count
    fn spawn_food(&mut self) {
        let bounds = self.board.bounds();
        let wanted = self.board.food.count as usize;
        let lifetime = fresh_lifetime(&self.board.food);

        while self.world.food.len() < wanted {
            match self.world.find_free_cell(bounds, &mut self.rng) {
                Ok(point) => self.world.insert_food(point, lifetime),
                Err(_) => break,
            }
        }
    }

    /// Live bodies stay on the board, never overlap, and never cover food
    fn check_invariants(&self) -> Result<()> {
        let bounds = self.board.bounds();
        let mut seen = ahash::AHashSet::new();

        for (id, snake) in self.world.living() {
            for cell in snake.body() {
                if !bounds.contains(*cell) {
                    return Err(ArenaError::Simulation(format!(
                        "snake {id} has a cell outside the board at {cell:?}"
                    )));
                }
                if self.world.food.contains_key(cell) {
                    return Err(ArenaError::Simulation(format!(
                        "snake {id} overlaps food at {cell:?}"
                    )));
                }
                if !seen.insert(*cell) {
                    return Err(ArenaError::Simulation(format!(
                        "cell {cell:?} occupied twice after turn {}",
                        self.world.turn
                    )));
                }
            }
        }

        Ok(())
    }
}
