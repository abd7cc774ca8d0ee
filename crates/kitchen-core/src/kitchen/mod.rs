//! Reference lettuce-salad kitchen.

mod observe;
pub mod planner;
mod world;

pub use planner::{Route, route};
pub use world::{KitchenConfig, KitchenEnv, KitchenError};
