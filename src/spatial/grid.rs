//! Integer grid points and board bounds

use serde::{Deserialize, Serialize};

use crate::spatial::direction::Direction;

/// A cell on the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct GridPoint {
    pub x: i32,
    pub y: i32,
}

impl GridPoint {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The neighbouring cell one step in `direction`
    #[inline]
    pub fn step(&self, direction: Direction) -> Self {
        let (dx, dy) = direction.delta();
        Self::new(self.x + dx, self.y + dy)
    }

    /// The four orthogonal neighbours, in `Direction::CARDINALS` order
    pub fn neighbors(&self) -> [GridPoint; 4] {
        Direction::CARDINALS.map(|d| self.step(d))
    }

    /// Manhattan (L1) distance
    pub fn manhattan_distance(&self, other: &Self) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// Euclidean (L2) distance
    pub fn euclidean_distance(&self, other: &Self) -> f64 {
        let dx = f64::from(self.x - other.x);
        let dy = f64::from(self.y - other.y);
        (dx * dx + dy * dy).sqrt()
    }

    /// Heading that moves towards `other`
    ///
    /// When `other` is offset on both axes the larger offset wins; ties go
    /// to the vertical axis. Equal points give `Direction::None`.
    pub fn direction_to(&self, other: &Self) -> Direction {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        if dx == 0 && dy == 0 {
            return Direction::None;
        }
        if dx.abs() > dy.abs() {
            if dx > 0 {
                Direction::East
            } else {
                Direction::West
            }
        } else if dy > 0 {
            Direction::South
        } else {
            Direction::North
        }
    }

    /// Same cell with y measured from the bottom edge of a board of `height`
    pub fn flip_y(&self, height: i32) -> Self {
        Self::new(self.x, height - self.y - 1)
    }
}

/// Rectangular board extent, cells `[0, width) × [0, height)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub width: i32,
    pub height: i32,
}

impl Bounds {
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn contains(&self, p: GridPoint) -> bool {
        p.x >= 0 && p.x < self.width && p.y >= 0 && p.y < self.height
    }

    pub fn center(&self) -> GridPoint {
        GridPoint::new(self.width / 2, self.height / 2)
    }

    /// All cells in row-major order (y outer, x inner)
    pub fn cells(&self) -> impl Iterator<Item = GridPoint> + '_ {
        (0..self.height).flat_map(move |y| (0..self.width).map(move |x| GridPoint::new(x, y)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_and_neighbors() {
        let p = GridPoint::new(5, 5);
        assert_eq!(p.step(Direction::North), GridPoint::new(5, 4));
        assert_eq!(p.step(Direction::East), GridPoint::new(6, 5));
        assert_eq!(p.step(Direction::None), p);
        assert_eq!(
            p.neighbors(),
            [
                GridPoint::new(5, 4),
                GridPoint::new(6, 5),
                GridPoint::new(5, 6),
                GridPoint::new(4, 5)
            ]
        );
    }

    #[test]
    fn test_distances() {
        let a = GridPoint::new(0, 0);
        let b = GridPoint::new(3, 4);
        assert_eq!(a.manhattan_distance(&b), 7);
        assert_eq!(a.euclidean_distance(&b), 5.0);
    }

    #[test]
    fn test_direction_to_prefers_larger_axis() {
        let origin = GridPoint::new(5, 5);
        assert_eq!(origin.direction_to(&GridPoint::new(9, 6)), Direction::East);
        assert_eq!(origin.direction_to(&GridPoint::new(4, 1)), Direction::North);
        assert_eq!(origin.direction_to(&GridPoint::new(3, 7)), Direction::South);
        assert_eq!(origin.direction_to(&origin), Direction::None);
    }

    #[test]
    fn test_bounds() {
        let bounds = Bounds::new(4, 3);
        assert!(bounds.contains(GridPoint::new(0, 0)));
        assert!(bounds.contains(GridPoint::new(3, 2)));
        assert!(!bounds.contains(GridPoint::new(4, 0)));
        assert!(!bounds.contains(GridPoint::new(0, -1)));
        assert_eq!(bounds.cells().count(), 12);
        assert_eq!(bounds.cells().nth(4), Some(GridPoint::new(0, 1)));
    }

    #[test]
    fn test_flip_y() {
        assert_eq!(GridPoint::new(2, 0).flip_y(10), GridPoint::new(2, 9));
        assert_eq!(GridPoint::new(2, 9).flip_y(10), GridPoint::new(2, 0));
    }
}
