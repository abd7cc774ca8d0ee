//! Static kitchen layouts.
//!
//! Grids use the legend `0` floor, `1` counter, `2` agent start, `4` lettuce
//! on a counter, `5` plate on a counter, `6` knife, `7` delivery. Rows are `y`
//! (growing downwards) and columns are `x`. Agent starts are assigned in
//! reading order, so the first `2` is agent 0.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tile {
    Floor,
    Counter,
    Knife,
    Delivery,
}

impl Tile {
    pub const fn is_walkable(self) -> bool {
        matches!(self, Tile::Floor)
    }

    /// Map code as reported in state snapshots.
    pub const fn code(self) -> u8 {
        match self {
            Tile::Floor => 0,
            Tile::Counter => 1,
            Tile::Knife => 6,
            Tile::Delivery => 7,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LayoutError {
    #[error("layout '{0}' has no rows")]
    Empty(String),
    #[error("layout '{name}' row {row} has width {found}, expected {expected}")]
    Ragged {
        name: String,
        row: usize,
        found: usize,
        expected: usize,
    },
    #[error("layout '{name}' uses unknown cell code {code} at ({x}, {y})")]
    UnknownCode {
        name: String,
        code: u8,
        x: usize,
        y: usize,
    },
    #[error("layout '{name}' is missing {what}")]
    Missing { name: String, what: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    name: String,
    width: usize,
    height: usize,
    tiles: Vec<Tile>,
    lettuce_spawns: Vec<(usize, usize)>,
    plate_spawns: Vec<(usize, usize)>,
    agent_starts: Vec<(usize, usize)>,
    knives: Vec<(usize, usize)>,
    deliveries: Vec<(usize, usize)>,
}

pub const PRACTICE: &[&[u8]] = &[
    &[1, 1, 5, 1, 1],
    &[4, 0, 0, 2, 1],
    &[6, 0, 0, 0, 1],
    &[1, 2, 0, 0, 1],
    &[1, 1, 1, 7, 1],
];

pub const CRAMPED: &[&[u8]] = &[
    &[1, 1, 6, 1, 1],
    &[4, 0, 0, 2, 4],
    &[1, 2, 0, 0, 1],
    &[1, 5, 1, 7, 1],
];

pub const ASYMMETRIC: &[&[u8]] = &[
    &[1, 1, 1, 1, 1, 1, 1, 1, 1],
    &[4, 0, 1, 7, 1, 4, 1, 0, 7],
    &[1, 0, 0, 0, 6, 0, 0, 0, 1],
    &[1, 2, 0, 0, 6, 0, 0, 2, 1],
    &[1, 1, 1, 5, 1, 5, 1, 1, 1],
];

pub const RING: &[&[u8]] = &[
    &[1, 1, 1, 6, 1],
    &[1, 0, 0, 2, 1],
    &[5, 0, 1, 0, 1],
    &[4, 2, 0, 0, 1],
    &[1, 4, 7, 1, 1],
];

pub const FORCED: &[&[u8]] = &[
    &[1, 1, 1, 6, 1],
    &[4, 0, 1, 2, 6],
    &[4, 2, 1, 0, 1],
    &[5, 0, 1, 0, 1],
    &[1, 1, 1, 7, 1],
];

pub const CIRCUIT: &[&[u8]] = &[
    &[1, 1, 1, 6, 6, 1, 1, 1],
    &[1, 0, 2, 0, 0, 0, 0, 1],
    &[5, 0, 1, 1, 1, 1, 1, 7],
    &[1, 0, 0, 0, 0, 0, 2, 1],
    &[1, 1, 1, 4, 4, 1, 1, 1],
];

pub const BUILTIN: &[(&str, &[&[u8]])] = &[
    ("practice", PRACTICE),
    ("cramped", CRAMPED),
    ("asymmetric", ASYMMETRIC),
    ("ring", RING),
    ("forced", FORCED),
    ("circuit", CIRCUIT),
];

impl Layout {
    /// Looks up one of the compiled-in layouts.
    pub fn builtin(name: &str) -> Option<Self> {
        BUILTIN
            .iter()
            .find(|(candidate, _)| *candidate == name)
            .and_then(|(name, rows)| Self::parse(name, rows).ok())
    }

    pub fn builtin_names() -> impl Iterator<Item = &'static str> {
        BUILTIN.iter().map(|(name, _)| *name)
    }

    pub fn parse(name: &str, rows: &[&[u8]]) -> Result<Self, LayoutError> {
        let height = rows.len();
        let width = rows.first().map(|row| row.len()).unwrap_or(0);
        if height == 0 || width == 0 {
            return Err(LayoutError::Empty(name.to_string()));
        }

        let mut layout = Self {
            name: name.to_string(),
            width,
            height,
            tiles: Vec::with_capacity(width * height),
            lettuce_spawns: Vec::new(),
            plate_spawns: Vec::new(),
            agent_starts: Vec::new(),
            knives: Vec::new(),
            deliveries: Vec::new(),
        };

        for (y, row) in rows.iter().enumerate() {
            if row.len() != width {
                return Err(LayoutError::Ragged {
                    name: name.to_string(),
                    row: y,
                    found: row.len(),
                    expected: width,
                });
            }
            for (x, &code) in row.iter().enumerate() {
                let tile = match code {
                    0 => Tile::Floor,
                    1 => Tile::Counter,
                    2 => {
                        layout.agent_starts.push((x, y));
                        Tile::Floor
                    }
                    4 => {
                        layout.lettuce_spawns.push((x, y));
                        Tile::Counter
                    }
                    5 => {
                        layout.plate_spawns.push((x, y));
                        Tile::Counter
                    }
                    6 => {
                        layout.knives.push((x, y));
                        Tile::Knife
                    }
                    7 => {
                        layout.deliveries.push((x, y));
                        Tile::Delivery
                    }
                    other => {
                        return Err(LayoutError::UnknownCode {
                            name: name.to_string(),
                            code: other,
                            x,
                            y,
                        });
                    }
                };
                layout.tiles.push(tile);
            }
        }

        for (what, empty) in [
            ("an agent start", layout.agent_starts.is_empty()),
            ("a lettuce", layout.lettuce_spawns.is_empty()),
            ("a plate", layout.plate_spawns.is_empty()),
            ("a knife", layout.knives.is_empty()),
            ("a delivery station", layout.deliveries.is_empty()),
        ] {
            if empty {
                return Err(LayoutError::Missing {
                    name: name.to_string(),
                    what,
                });
            }
        }

        Ok(layout)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn tile(&self, x: usize, y: usize) -> Option<Tile> {
        if x < self.width && y < self.height {
            Some(self.tiles[y * self.width + x])
        } else {
            None
        }
    }

    /// Tile at a signed coordinate, `None` when off the grid.
    pub fn tile_at(&self, x: i32, y: i32) -> Option<Tile> {
        if x < 0 || y < 0 {
            return None;
        }
        self.tile(x as usize, y as usize)
    }

    pub fn rows(&self) -> Vec<Vec<u8>> {
        self.tiles
            .chunks(self.width)
            .map(|row| row.iter().map(|tile| tile.code()).collect())
            .collect()
    }

    pub fn lettuce_spawns(&self) -> &[(usize, usize)] {
        &self.lettuce_spawns
    }

    pub fn plate_spawns(&self) -> &[(usize, usize)] {
        &self.plate_spawns
    }

    pub fn agent_starts(&self) -> &[(usize, usize)] {
        &self.agent_starts
    }

    pub fn knives(&self) -> &[(usize, usize)] {
        &self.knives
    }

    pub fn deliveries(&self) -> &[(usize, usize)] {
        &self.deliveries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_builtin_layout_parses() {
        for name in Layout::builtin_names() {
            let layout = Layout::builtin(name).expect("builtin parses");
            assert!(layout.agent_starts().len() >= 2, "{name} needs two agents");
        }
    }

    #[test]
    fn practice_layout_positions() {
        let layout = Layout::builtin("practice").unwrap();
        assert_eq!((layout.width(), layout.height()), (5, 5));
        assert_eq!(layout.agent_starts(), &[(3, 1), (1, 3)]);
        assert_eq!(layout.knives(), &[(0, 2)]);
        assert_eq!(layout.deliveries(), &[(3, 4)]);
        assert_eq!(layout.tile(0, 1), Some(Tile::Counter));
    }

    #[test]
    fn rejects_ragged_rows() {
        let rows: &[&[u8]] = &[&[1, 1], &[1]];
        assert!(matches!(
            Layout::parse("bad", rows),
            Err(LayoutError::Ragged { row: 1, .. })
        ));
    }

    #[test]
    fn rejects_unknown_codes() {
        let rows: &[&[u8]] = &[&[1, 9]];
        assert!(matches!(
            Layout::parse("bad", rows),
            Err(LayoutError::UnknownCode { code: 9, .. })
        ));
    }
}
