pub mod direction;
pub mod grid;

pub use direction::Direction;
pub use grid::{Bounds, GridPoint};
