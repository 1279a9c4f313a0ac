//! Authoritative world state

use ahash::AHashSet;
use rand::Rng;
use std::collections::BTreeMap;
use std::time::Instant;

use crate::core::error::{ArenaError, Result};
use crate::core::types::{PlayerId, Turn};
use crate::simulation::food::FoodMap;
use crate::simulation::snake::Snake;
use crate::spatial::{Bounds, GridPoint};

/// Turn counter, snakes and food
#[derive(Debug, Clone)]
pub struct World {
    pub turn: Turn,
    pub start_time: Instant,
    pub snakes: BTreeMap<PlayerId, Snake>,
    pub food: FoodMap,
}

impl World {
    pub fn new() -> Self {
        Self {
            turn: 0,
            start_time: Instant::now(),
            snakes: BTreeMap::new(),
            food: FoodMap::new(),
        }
    }

    pub fn snake(&self, id: PlayerId) -> Option<&Snake> {
        self.snakes.get(&id)
    }

    pub fn snake_mut(&mut self, id: PlayerId) -> Option<&mut Snake> {
        self.snakes.get_mut(&id)
    }

    pub fn living(&self) -> impl Iterator<Item = (PlayerId, &Snake)> + '_ {
        self.snakes
            .iter()
            .filter(|(_, s)| s.is_alive())
            .map(|(id, s)| (*id, s))
    }

    pub fn insert_food(&mut self, point: GridPoint, lifetime: u32) {
        self.food.insert(point, lifetime);
    }

    /// Cells covered by food or any snake body
    pub fn occupied(&self) -> AHashSet<GridPoint> {
        let mut occupied: AHashSet<GridPoint> = self.food.keys().copied().collect();
        for snake in self.snakes.values() {
            occupied.extend(snake.body().copied());
        }
        occupied
    }

    /// Free cells in row-major order
    pub fn free_cells(&self, bounds: Bounds) -> Vec<GridPoint> {
        let occupied = self.occupied();
        bounds.cells().filter(|p| !occupied.contains(p)).collect()
    }

    /// A uniformly random free cell
    pub fn find_free_cell<R: Rng>(&self, bounds: Bounds, rng: &mut R) -> Result<GridPoint> {
        let free = self.free_cells(bounds);
        if free.is_empty() {
            return Err(ArenaError::NoSpace);
        }
        Ok(free[rng.gen_range(0..free.len())])
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}
