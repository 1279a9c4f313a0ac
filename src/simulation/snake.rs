//! Per-player snake body, heading and score

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::spatial::{Direction, GridPoint};

/// Cumulative score of one player
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub kills: u32,
    pub deaths: u32,
    pub suicides: u32,
    pub current_length: u32,
    pub max_length: u32,
}

/// A snake; dead exactly when its body is empty
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snake {
    /// Head first
    body: VecDeque<GridPoint>,
    target_length: u32,
    direction: Direction,
    score: Score,
    respawn_counter: i64,
}

impl Snake {
    /// A dead snake that is eligible to spawn on the next spawn pass
    pub fn new() -> Self {
        Self::default()
    }

    /// A live snake with an explicit body (head first)
    pub fn with_body(body: Vec<GridPoint>, target_length: u32, direction: Direction) -> Self {
        let mut snake = Self {
            body: body.into(),
            target_length,
            direction,
            ..Self::default()
        };
        snake.record_length();
        snake
    }

    pub fn is_dead(&self) -> bool {
        self.body.is_empty()
    }

    pub fn is_alive(&self) -> bool {
        !self.is_dead()
    }

    pub fn head(&self) -> Option<GridPoint> {
        self.body.front().copied()
    }

    pub fn tail(&self) -> Option<GridPoint> {
        self.body.back().copied()
    }

    pub fn body(&self) -> impl ExactSizeIterator<Item = &GridPoint> + '_ {
        self.body.iter()
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    pub fn contains(&self, p: GridPoint) -> bool {
        self.body.contains(&p)
    }

    pub fn target_length(&self) -> u32 {
        self.target_length
    }

    /// Last committed heading; `None` until the first move after a spawn
    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn score(&self) -> Score {
        self.score
    }

    pub fn respawn_counter(&self) -> i64 {
        self.respawn_counter
    }

    /// Place a fresh snake on a single cell
    pub fn spawn_at(&mut self, point: GridPoint, length: u32, respawn_time: u32) {
        self.body.clear();
        self.body.push_back(point);
        self.target_length = length;
        self.direction = Direction::None;
        self.respawn_counter = i64::from(respawn_time);
        self.record_length();
    }

    /// The heading a move request actually results in
    ///
    /// Reversal is illegal and continues straight; no request keeps the
    /// current heading, or North when there is none yet.
    pub fn resolve_direction(&self, requested: Direction) -> Direction {
        let current = self.direction;
        if !current.is_none() && requested == current.opposite() {
            return current;
        }
        match (requested, current) {
            (Direction::None, Direction::None) => Direction::CARDINALS[0],
            (Direction::None, current) => current,
            (requested, _) => requested,
        }
    }

    /// Move the head one cell and trim the tail to the target length
    ///
    /// Returns the new head, or `None` for a dead snake.
    pub fn advance(&mut self, requested: Direction) -> Option<GridPoint> {
        let head = self.head()?;
        let direction = self.resolve_direction(requested);
        let new_head = head.step(direction);

        self.body.push_front(new_head);
        self.body.truncate(self.target_length.max(1) as usize);
        self.direction = direction;
        self.record_length();

        Some(new_head)
    }

    /// Adjust the target length by a food value, clamped at zero
    pub fn grow(&mut self, delta: i32) -> u32 {
        let length = i64::from(self.target_length) + i64::from(delta);
        self.target_length = length.clamp(0, i64::from(u32::MAX)) as u32;
        self.target_length
    }

    pub fn kill(&mut self, suicide: bool) {
        self.body.clear();
        self.direction = Direction::None;
        self.score.current_length = 0;
        self.score.deaths += 1;
        if suicide {
            self.score.suicides += 1;
        }
    }

    pub fn credit_kill(&mut self) {
        self.score.kills += 1;
    }

    /// Count down one turn of the respawn timer; true once it has elapsed
    pub fn tick_respawn(&mut self) -> bool {
        self.respawn_counter -= 1;
        self.respawn_counter < 0
    }

    fn record_length(&mut self) {
        let len = self.body.len() as u32;
        self.score.current_length = len;
        self.score.max_length = self.score.max_length.max(len);
    }
}
