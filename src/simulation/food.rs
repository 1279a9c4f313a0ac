//! Food value curve and rotting

use std::collections::BTreeMap;

use crate::core::config::FoodConfig;
use crate::spatial::GridPoint;

/// Food on the board: cell to remaining lifetime in turns
pub type FoodMap = BTreeMap<GridPoint, u32>;

/// Length change awarded for eating food with `lifetime` turns left
///
/// Scales linearly from `value` when fresh to `-value` at the end of its
/// life, rounded half away from zero. Constant when rotting is disabled.
pub fn food_value(config: &FoodConfig, lifetime: u32) -> i32 {
    if config.lifetime == 0 {
        return config.value;
    }
    let fraction = f64::from(lifetime) / f64::from(config.lifetime) * 2.0 - 1.0;
    (f64::from(config.value) * fraction).round() as i32
}

/// Remaining lifetime a fresh item is placed with
pub fn fresh_lifetime(config: &FoodConfig) -> u32 {
    config.lifetime
}

/// Age every item by one turn, dropping those that reach zero
pub fn rot(food: &mut FoodMap, config: &FoodConfig) {
    if config.lifetime == 0 {
        return;
    }
    food.retain(|_, lifetime| {
        if *lifetime <= 1 {
            return false;
        }
        *lifetime -= 1;
        true
    });
}
