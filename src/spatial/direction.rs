//! Cardinal headings on the grid
//!
//! Screen orientation: North decreases y, South increases y.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Heading of a snake, or `None` for "no decision / keep heading"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    None,
    North,
    East,
    South,
    West,
}

impl Direction {
    /// The four real headings in canonical order
    pub const CARDINALS: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// 90° clockwise turn
    pub fn next(&self) -> Self {
        match self {
            Direction::North => Direction::East,
            Direction::East => Direction::South,
            Direction::South => Direction::West,
            Direction::West => Direction::North,
            Direction::None => Direction::None,
        }
    }

    /// 90° counter-clockwise turn
    pub fn previous(&self) -> Self {
        match self {
            Direction::North => Direction::West,
            Direction::East => Direction::North,
            Direction::South => Direction::East,
            Direction::West => Direction::South,
            Direction::None => Direction::None,
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::East => Direction::West,
            Direction::West => Direction::East,
            Direction::None => Direction::None,
        }
    }

    /// Cell offset `(dx, dy)` for one step in this direction
    pub fn delta(&self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::South => (0, 1),
            Direction::East => (1, 0),
            Direction::West => (-1, 0),
            Direction::None => (0, 0),
        }
    }

    pub fn is_none(&self) -> bool {
        *self == Direction::None
    }

    /// Parse by first letter, case-insensitive (`n`, `North`, `SOUTH`, ...)
    ///
    /// Anything unrecognised is `None`.
    pub fn parse(s: &str) -> Self {
        match s.trim().chars().next().map(|c| c.to_ascii_lowercase()) {
            Some('n') => Direction::North,
            Some('s') => Direction::South,
            Some('e') => Direction::East,
            Some('w') => Direction::West,
            _ => Direction::None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Direction::North => "north",
            Direction::East => "east",
            Direction::South => "south",
            Direction::West => "west",
            Direction::None => "none",
        };
        f.write_str(name)
    }
}
