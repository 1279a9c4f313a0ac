//! Uniform random moves

use async_trait::async_trait;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use tokio_util::sync::CancellationToken;

use crate::agent::{Agent, ReplyHandle};
use crate::core::error::Result;
use crate::simulation::state::PlayerState;
use crate::spatial::Direction;

/// Picks a cardinal direction uniformly from its seeded stream
///
/// Without a stream it always answers North.
#[derive(Debug, Default)]
pub struct RandomAgent {
    rng: Option<ChaCha8Rng>,
}

impl RandomAgent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_move(&mut self) -> Direction {
        match self.rng.as_mut() {
            Some(rng) => random_cardinal(rng),
            None => Direction::CARDINALS[0],
        }
    }
}

/// One of the four cardinals, uniformly
pub fn random_cardinal(rng: &mut ChaCha8Rng) -> Direction {
    Direction::CARDINALS
        .choose(rng)
        .copied()
        .unwrap_or(Direction::CARDINALS[0])
}

#[async_trait]
impl Agent for RandomAgent {
    fn kind(&self) -> &'static str {
        "random"
    }

    async fn decide(&mut self, _state: PlayerState, _scope: CancellationToken) -> Result<ReplyHandle> {
        Ok(ReplyHandle::ready(self.next_move()))
    }

    fn seed_rng(&mut self, rng: ChaCha8Rng) {
        self.rng = Some(rng);
    }
}
