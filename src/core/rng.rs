//! Deterministic random streams derived from a single master seed
//!
//! Every logical entity (the world itself, each player's agent) draws from
//! its own ChaCha stream so that one entity consuming randomness never shifts
//! the sequence another entity sees.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::core::types::PlayerId;

const WORLD_STREAM: u64 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RngProvider {
    master_seed: u64,
}

impl RngProvider {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    /// Stream used by the simulation for spawn placement
    pub fn world_stream(&self) -> ChaCha8Rng {
        self.stream(WORLD_STREAM)
    }

    /// Stream handed to a player's agent
    pub fn player_stream(&self, id: PlayerId) -> ChaCha8Rng {
        self.stream(u64::from(id.0) + 1)
    }

    fn stream(&self, stream: u64) -> ChaCha8Rng {
        let mut rng = ChaCha8Rng::seed_from_u64(self.master_seed);
        rng.set_stream(stream);
        rng
    }
}
