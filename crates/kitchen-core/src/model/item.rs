use core::fmt;
use serde::{Deserialize, Serialize};

/// Knife bumps needed before a lettuce counts as chopped.
pub const CHOP_STEPS: u8 = 3;

/// Movable ingredient or container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Item {
    Lettuce { progress: u8 },
    Plate { salad: bool },
}

impl Item {
    pub const fn fresh_lettuce() -> Self {
        Item::Lettuce { progress: 0 }
    }

    pub const fn empty_plate() -> Self {
        Item::Plate { salad: false }
    }

    pub const fn is_chopped_lettuce(self) -> bool {
        matches!(self, Item::Lettuce { progress } if progress >= CHOP_STEPS)
    }

    pub const fn is_raw_lettuce(self) -> bool {
        matches!(self, Item::Lettuce { progress } if progress < CHOP_STEPS)
    }

    pub const fn is_dish(self) -> bool {
        matches!(self, Item::Plate { salad: true })
    }

    pub const fn is_empty_plate(self) -> bool {
        matches!(self, Item::Plate { salad: false })
    }

    pub const fn name(self) -> &'static str {
        match self {
            Item::Lettuce { .. } => "Lettuce",
            Item::Plate { .. } => "Plate",
        }
    }

    /// Name of the contents, for containers only.
    pub const fn contained_name(self) -> Option<&'static str> {
        match self {
            Item::Plate { salad: true } => Some("ChoppedLettuce"),
            _ => None,
        }
    }

    /// Scalar encoding used by observation vectors; `0.0` is reserved for empty hands.
    pub fn holding_code(self) -> f32 {
        match self {
            Item::Lettuce { .. } if self.is_chopped_lettuce() => 0.5,
            Item::Lettuce { .. } => 0.25,
            Item::Plate { salad: false } => 0.75,
            Item::Plate { salad: true } => 1.0,
        }
    }

    /// Progress-style encoding of the item's own state.
    pub fn state_code(self) -> f32 {
        match self {
            Item::Lettuce { progress } => progress.min(CHOP_STEPS) as f32 / CHOP_STEPS as f32,
            Item::Plate { salad } => {
                if salad {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.contained_name() {
            Some(contents) => write!(f, "{}({})", self.name(), contents),
            None => f.write_str(self.name()),
        }
    }
}

/// Where an entity currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "at", rename_all = "snake_case")]
pub enum Place {
    Tile { x: usize, y: usize },
    Held { agent: usize },
    /// Merged into a dish or delivered; waits for the next respawn.
    Consumed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lettuce_becomes_chopped_after_enough_progress() {
        let mut item = Item::fresh_lettuce();
        assert!(item.is_raw_lettuce());
        for _ in 0..CHOP_STEPS {
            if let Item::Lettuce { progress } = &mut item {
                *progress += 1;
            }
        }
        assert!(item.is_chopped_lettuce());
        assert_eq!(item.state_code(), 1.0);
    }

    #[test]
    fn holding_codes_are_distinct_and_nonzero() {
        let codes = [
            Item::fresh_lettuce().holding_code(),
            Item::Lettuce { progress: CHOP_STEPS }.holding_code(),
            Item::empty_plate().holding_code(),
            Item::Plate { salad: true }.holding_code(),
        ];
        for (i, a) in codes.iter().enumerate() {
            assert!(*a > 0.0);
            for b in &codes[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
