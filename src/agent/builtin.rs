//! Heuristic built-in opponents
//!
//! Three tiers, cheapest first:
//! - Easy: head for the nearest food, never reverse
//! - Medium: best food by value on arrival, avoid walls and bodies
//! - Hard: A* to uncontested food, avoid cells next to rival heads, drift
//!   towards the centre

use ahash::AHashSet;
use async_trait::async_trait;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tokio_util::sync::CancellationToken;

use crate::agent::pathfinding::{find_path, path_steps};
use crate::agent::random::random_cardinal;
use crate::agent::{Agent, ReplyHandle};
use crate::core::config::Difficulty;
use crate::core::error::Result;
use crate::simulation::food::food_value;
use crate::simulation::snake::Snake;
use crate::simulation::state::PlayerState;
use crate::spatial::{Bounds, Direction, GridPoint};

/// Food projected to be worth less than this on arrival is ignored
const MIN_VALUE_ON_ARRIVAL: i32 = 0;

#[derive(Debug)]
pub struct BuiltinAgent {
    difficulty: Difficulty,
    rng: ChaCha8Rng,
}

impl BuiltinAgent {
    pub fn new(difficulty: Difficulty) -> Self {
        Self {
            difficulty,
            rng: ChaCha8Rng::seed_from_u64(0),
        }
    }

    /// Pick a move for the state's player; `None` if its snake is dead
    pub fn choose_move(&mut self, state: &PlayerState) -> Direction {
        let Some(me) = state.me().filter(|s| s.is_alive()) else {
            return Direction::None;
        };
        match self.difficulty {
            Difficulty::Easy => easy_move(state, me),
            Difficulty::Medium => medium_move(state, me),
            Difficulty::Hard => hard_move(state, me, &mut self.rng),
        }
    }
}

#[async_trait]
impl Agent for BuiltinAgent {
    fn kind(&self) -> &'static str {
        "builtin"
    }

    async fn decide(&mut self, state: PlayerState, _scope: CancellationToken) -> Result<ReplyHandle> {
        Ok(ReplyHandle::ready(self.choose_move(&state)))
    }

    fn seed_rng(&mut self, rng: ChaCha8Rng) {
        self.rng = rng;
    }
}

/// What a strategy knows about the board around its own head
struct View {
    bounds: Bounds,
    head: GridPoint,
    heading: Direction,
    obstacles: AHashSet<GridPoint>,
}

impl View {
    fn new(state: &PlayerState, me: &Snake) -> Option<Self> {
        let obstacles = state
            .snakes
            .values()
            .flat_map(|s| s.body().copied())
            .collect();
        Some(Self {
            bounds: state.board.bounds(),
            head: me.head()?,
            heading: me.direction(),
            obstacles,
        })
    }

    fn is_open(&self, p: GridPoint) -> bool {
        self.bounds.contains(p) && !self.obstacles.contains(&p)
    }

    fn is_reversal(&self, d: Direction) -> bool {
        !self.heading.is_none() && d == self.heading.opposite()
    }

    /// Heading towards `target`, or the current one if already there
    fn heading_towards(&self, target: GridPoint) -> Direction {
        match self.head.direction_to(&target) {
            Direction::None if self.heading.is_none() => Direction::CARDINALS[0],
            Direction::None => self.heading,
            d => d,
        }
    }

    /// First open, non-reversing move in preference order around `target`
    fn first_safe(&self, target: Direction) -> Option<Direction> {
        [target, target.next(), target.previous(), target.opposite()]
            .into_iter()
            .find(|d| !self.is_reversal(*d) && self.is_open(self.head.step(*d)))
    }
}

/// Value of an item with `lifetime` left once `steps` more turns have passed
fn value_on_arrival(state: &PlayerState, lifetime: u32, steps: usize) -> i32 {
    let food = &state.board.food;
    if food.lifetime == 0 {
        return food.value;
    }
    let steps = u32::try_from(steps).unwrap_or(u32::MAX);
    food_value(food, lifetime.saturating_sub(steps))
}

fn easy_move(state: &PlayerState, me: &Snake) -> Direction {
    let Some(head) = me.head() else {
        return Direction::None;
    };
    let Some(closest) = state.food.keys().min_by_key(|p| p.manhattan_distance(&head)) else {
        return Direction::None;
    };

    let target = head.direction_to(closest);
    if !target.is_none() && me.direction() == target.opposite() {
        target.next()
    } else {
        target
    }
}

fn medium_move(state: &PlayerState, me: &Snake) -> Direction {
    let Some(view) = View::new(state, me) else {
        return Direction::None;
    };
    let target = view.heading_towards(medium_target(state, me, &view));
    view.first_safe(target).unwrap_or(target)
}

/// Most valuable food by straight-line arrival estimate, else our own tail
fn medium_target(state: &PlayerState, me: &Snake, view: &View) -> GridPoint {
    let mut best: Option<(i32, u32, GridPoint)> = None;
    for (point, lifetime) in &state.food {
        let dist = point.manhattan_distance(&view.head);
        let value = value_on_arrival(state, *lifetime, dist as usize);
        if value < MIN_VALUE_ON_ARRIVAL {
            continue;
        }
        let better = match best {
            None => true,
            Some((best_value, best_dist, _)) => {
                value > best_value || (value == best_value && dist < best_dist)
            }
        };
        if better {
            best = Some((value, dist, *point));
        }
    }

    best.map(|(_, _, p)| p)
        .or_else(|| me.tail())
        .unwrap_or(view.head)
}

fn hard_move(state: &PlayerState, me: &Snake, rng: &mut ChaCha8Rng) -> Direction {
    let Some(view) = View::new(state, me) else {
        return Direction::None;
    };

    let path = hard_food_path(state, &view).or_else(|| {
        me.tail()
            .and_then(|tail| find_path(view.bounds, &view.obstacles, view.head, tail))
    });

    let Some(first_step) = path.as_ref().and_then(|p| p.get(1)).copied() else {
        // No path at all
        let fallback = view.heading_towards(medium_target(state, me, &view));
        return view
            .first_safe(fallback)
            .unwrap_or_else(|| random_cardinal(rng));
    };
    let target = view.head.direction_to(&first_step);

    let danger: AHashSet<GridPoint> = state
        .rivals()
        .filter_map(|(_, s)| s.head())
        .flat_map(|h| h.neighbors())
        .filter(|p| !view.obstacles.contains(p))
        .collect();

    let center = view.bounds.center();
    let mut safe: Vec<(Direction, u32)> = Vec::new();
    let mut risky: Vec<(Direction, u32)> = Vec::new();
    for d in Direction::CARDINALS {
        if view.is_reversal(d) {
            continue;
        }
        let next = view.head.step(d);
        if !view.is_open(next) {
            continue;
        }
        let entry = (d, next.manhattan_distance(&center));
        if danger.contains(&next) {
            risky.push(entry);
        } else {
            safe.push(entry);
        }
    }

    if safe.iter().any(|(d, _)| *d == target) {
        return target;
    }
    safe.sort_by_key(|(_, dist)| *dist);
    risky.sort_by_key(|(_, dist)| *dist);
    safe.first()
        .or_else(|| risky.first())
        .map(|(d, _)| *d)
        .unwrap_or_else(|| random_cardinal(rng))
}

/// Shortest path to the most valuable food no rival can reach as fast
fn hard_food_path(state: &PlayerState, view: &View) -> Option<Vec<GridPoint>> {
    let mut best: Option<(i32, Vec<GridPoint>)> = None;

    for (point, lifetime) in &state.food {
        let Some(path) = find_path(view.bounds, &view.obstacles, view.head, *point) else {
            continue;
        };
        let steps = path_steps(&path);
        let value = value_on_arrival(state, *lifetime, steps);
        if value < MIN_VALUE_ON_ARRIVAL {
            continue;
        }

        let better = match &best {
            None => true,
            Some((best_value, best_path)) => {
                value > *best_value || (value == *best_value && steps < path_steps(best_path))
            }
        };
        if !better {
            continue;
        }

        // Contention: a rival that is at least as close takes it
        let contested = state.rivals().filter_map(|(_, s)| s.head()).any(|rival| {
            find_path(view.bounds, &view.obstacles, rival, *point)
                .is_some_and(|p| path_steps(&p) <= steps)
        });
        if contested {
            continue;
        }

        best = Some((value, path));
    }

    best.map(|(_, path)| path)
}
