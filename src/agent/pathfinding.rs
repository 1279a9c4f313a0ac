//! A* pathfinding on the board
//!
//! Four-connected grid, unit step cost, Euclidean heuristic.

use ahash::{AHashMap, AHashSet};
use ordered_float::OrderedFloat;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::spatial::{Bounds, GridPoint};

/// Node in the A* open set
#[derive(Debug, Clone)]
struct PathNode {
    point: GridPoint,
    f_cost: OrderedFloat<f64>, // g_cost + heuristic
}

impl PartialEq for PathNode {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PathNode {}

impl Ord for PathNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap; ties pop the smaller point first
        other
            .f_cost
            .cmp(&self.f_cost)
            .then_with(|| other.point.cmp(&self.point))
    }
}

impl PartialOrd for PathNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Find a path from `start` to `goal` using A*
///
/// The returned path includes both endpoints. Cells in `obstacles` are
/// impassable except for `goal` itself, so a snake can path to its own tail.
/// Returns None if no path exists.
pub fn find_path(
    bounds: Bounds,
    obstacles: &AHashSet<GridPoint>,
    start: GridPoint,
    goal: GridPoint,
) -> Option<Vec<GridPoint>> {
    if start == goal {
        return Some(vec![start]);
    }
    if !bounds.contains(goal) {
        return None;
    }

    let mut open_set = BinaryHeap::new();
    let mut came_from: AHashMap<GridPoint, GridPoint> = AHashMap::new();
    let mut g_scores: AHashMap<GridPoint, u32> = AHashMap::new();

    g_scores.insert(start, 0);
    open_set.push(PathNode {
        point: start,
        f_cost: OrderedFloat(start.euclidean_distance(&goal)),
    });

    while let Some(current) = open_set.pop() {
        if current.point == goal {
            return Some(reconstruct_path(&came_from, current.point));
        }

        let current_g = g_scores.get(&current.point).copied().unwrap_or(u32::MAX);

        for neighbor in current.point.neighbors() {
            if !bounds.contains(neighbor) {
                continue;
            }
            if neighbor != goal && obstacles.contains(&neighbor) {
                continue;
            }

            let tentative_g = current_g.saturating_add(1);
            let neighbor_g = g_scores.get(&neighbor).copied().unwrap_or(u32::MAX);

            if tentative_g < neighbor_g {
                came_from.insert(neighbor, current.point);
                g_scores.insert(neighbor, tentative_g);

                let f_cost = f64::from(tentative_g) + neighbor.euclidean_distance(&goal);
                open_set.push(PathNode {
                    point: neighbor,
                    f_cost: OrderedFloat(f_cost),
                });
            }
        }
    }

    None // No path found
}

/// Number of moves along a path from `find_path`
pub fn path_steps(path: &[GridPoint]) -> usize {
    path.len().saturating_sub(1)
}

fn reconstruct_path(
    came_from: &AHashMap<GridPoint, GridPoint>,
    mut current: GridPoint,
) -> Vec<GridPoint> {
    let mut path = vec![current];
    while let Some(&prev) = came_from.get(&current) {
        path.push(prev);
        current = prev;
    }
    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: i32, y: i32) -> GridPoint {
        GridPoint::new(x, y)
    }

    #[test]
    fn test_pathfind_straight_line() {
        let bounds = Bounds::new(10, 10);
        let path = find_path(bounds, &AHashSet::new(), p(0, 0), p(5, 0)).unwrap();

        assert_eq!(path.first(), Some(&p(0, 0)));
        assert_eq!(path.last(), Some(&p(5, 0)));
        assert_eq!(path_steps(&path), 5);
    }

    #[test]
    fn test_pathfind_around_obstacle() {
        let bounds = Bounds::new(10, 10);
        let obstacles: AHashSet<GridPoint> = [p(2, 0), p(2, 1)].into_iter().collect();

        let path = find_path(bounds, &obstacles, p(0, 0), p(5, 0)).unwrap();

        assert!(!path.contains(&p(2, 0)));
        assert!(!path.contains(&p(2, 1)));
        assert_eq!(path_steps(&path), 9);
    }

    #[test]
    fn test_pathfind_no_path() {
        let bounds = Bounds::new(10, 10);
        let goal = p(5, 5);
        let obstacles: AHashSet<GridPoint> = goal.neighbors().into_iter().collect();

        assert!(find_path(bounds, &obstacles, p(0, 0), goal).is_none());
    }

    #[test]
    fn test_goal_may_be_an_obstacle() {
        let bounds = Bounds::new(5, 5);
        let obstacles: AHashSet<GridPoint> = [p(3, 0)].into_iter().collect();

        let path = find_path(bounds, &obstacles, p(0, 0), p(3, 0)).unwrap();
        assert_eq!(path.last(), Some(&p(3, 0)));
    }

    #[test]
    fn test_pathfind_same_start_goal() {
        let bounds = Bounds::new(10, 10);
        let path = find_path(bounds, &AHashSet::new(), p(5, 5), p(5, 5)).unwrap();
        assert_eq!(path, vec![p(5, 5)]);
        assert_eq!(path_steps(&path), 0);
    }

    #[test]
    fn test_goal_off_board() {
        let bounds = Bounds::new(4, 4);
        assert!(find_path(bounds, &AHashSet::new(), p(0, 0), p(4, 0)).is_none());
    }

    #[test]
    fn test_path_is_contiguous() {
        let bounds = Bounds::new(8, 8);
        let obstacles: AHashSet<GridPoint> = (0..7).map(|y| p(4, y)).collect();
        let path = find_path(bounds, &obstacles, p(0, 0), p(7, 0)).unwrap();

        for pair in path.windows(2) {
            assert_eq!(pair[0].manhattan_distance(&pair[1]), 1);
        }
    }
}
