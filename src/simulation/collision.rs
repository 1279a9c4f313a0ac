//! Single-pass collision and feeding resolution
//!
//! Runs after every snake has moved. All deaths are decided against the
//! same post-move board and applied together at the end, so a snake that
//! dies this turn is still an obstacle for every other snake.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::core::config::BoardConfig;
use crate::core::types::PlayerId;
use crate::simulation::food::food_value;
use crate::simulation::world::World;
use crate::spatial::GridPoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DeathCause {
    /// Head left the board
    Wall,
    /// Head hit its own body
    Suicide,
    /// Head hit another snake; `with` is credited with the kill
    Collision { with: PlayerId },
    /// Rotten food shrank the target length to zero
    Starved,
}

impl DeathCause {
    pub fn is_suicide(&self) -> bool {
        matches!(self, DeathCause::Suicide)
    }

    pub fn killer(&self) -> Option<PlayerId> {
        match self {
            DeathCause::Collision { with } => Some(*with),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Death {
    pub player: PlayerId,
    pub cause: DeathCause,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Meal {
    pub player: PlayerId,
    pub point: GridPoint,
    pub value: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CollisionReport {
    pub deaths: Vec<Death>,
    pub meals: Vec<Meal>,
}

/// Resolve walls, bodies and food for every live snake, then apply kills
pub fn resolve_collisions(world: &mut World, board: &BoardConfig) -> CollisionReport {
    let bounds = board.bounds();
    let mut deaths: BTreeMap<PlayerId, DeathCause> = BTreeMap::new();
    let mut feeding: Vec<(PlayerId, GridPoint)> = Vec::new();

    for (id, snake) in world.living() {
        let Some(head) = snake.head() else {
            continue;
        };

        if !bounds.contains(head) {
            deaths.insert(id, DeathCause::Wall);
            continue;
        }

        if let Some(cause) = body_collision(world, id, head) {
            deaths.insert(id, cause);
        }

        if world.food.contains_key(&head) {
            feeding.push((id, head));
        }
    }

    let mut meals = Vec::new();
    for (id, point) in feeding {
        // Two heads on one item: the lower id eats it
        let Some(lifetime) = world.food.remove(&point) else {
            continue;
        };
        let value = food_value(&board.food, lifetime);
        let Some(snake) = world.snakes.get_mut(&id) else {
            continue;
        };
        if snake.grow(value) == 0 {
            deaths.entry(id).or_insert(DeathCause::Starved);
        }
        meals.push(Meal {
            player: id,
            point,
            value,
        });
    }

    let mut report_deaths = Vec::with_capacity(deaths.len());
    for (id, cause) in deaths {
        if let Some(snake) = world.snakes.get_mut(&id) {
            snake.kill(cause.is_suicide());
        }
        if let Some(killer) = cause.killer().and_then(|k| world.snakes.get_mut(&k)) {
            killer.credit_kill();
        }
        report_deaths.push(Death { player: id, cause });
    }

    CollisionReport {
        deaths: report_deaths,
        meals,
    }
}

/// What `head` of snake `id` ran into, if anything
///
/// Another snake's body takes precedence over the snake's own; among other
/// snakes the lowest id is blamed.
fn body_collision(world: &World, id: PlayerId, head: GridPoint) -> Option<DeathCause> {
    let mut hit_self = false;
    for (other_id, other) in world.living() {
        let hit = other
            .body()
            .enumerate()
            .any(|(i, p)| *p == head && !(other_id == id && i == 0));
        if !hit {
            continue;
        }
        if other_id == id {
            hit_self = true;
        } else {
            return Some(DeathCause::Collision { with: other_id });
        }
    }
    hit_self.then_some(DeathCause::Suicide)
}
