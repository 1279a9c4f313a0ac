pub mod collision;
pub mod food;
pub mod game;
pub mod snake;
pub mod state;
pub mod world;

pub use collision::{resolve_collisions, CollisionReport, Death, DeathCause, Meal};
pub use food::{food_value, FoodMap};
pub use game::{SnakeGame, TurnOutcome};
pub use snake::{Score, Snake};
pub use state::{PlayerInfo, PlayerState};
pub use world::World;
