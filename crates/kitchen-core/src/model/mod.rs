pub mod action;
pub mod item;
pub mod layout;
pub mod reward;

pub use action::{MacroAction, PrimitiveAction};
pub use item::{CHOP_STEPS, Item, Place};
pub use layout::{Layout, LayoutError, Tile};
pub use reward::{RewardEvent, RewardSchedule};
