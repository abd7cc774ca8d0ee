//! Breadth-first navigation used by the macro translator.

use crate::model::{Layout, PrimitiveAction};
use std::collections::VecDeque;

/// Next primitive step toward a set of interaction targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Already adjacent: bump into the target.
    Interact(PrimitiveAction),
    /// First step of a shortest walk to a tile adjacent to a target.
    Walk(PrimitiveAction),
    Unreachable,
}

fn step_from((x, y): (usize, usize), action: PrimitiveAction) -> (i32, i32) {
    let (dx, dy) = action.delta();
    (x as i32 + dx, y as i32 + dy)
}

fn adjacent_target(
    from: (usize, usize),
    targets: &[(usize, usize)],
) -> Option<PrimitiveAction> {
    for action in PrimitiveAction::MOVES {
        let (nx, ny) = step_from(from, action);
        if nx < 0 || ny < 0 {
            continue;
        }
        let candidate = (nx as usize, ny as usize);
        if targets.contains(&candidate) {
            return Some(action);
        }
    }
    None
}

/// Plans toward the closest target; neighbour expansion order is fixed so
/// equal-length routes always resolve the same way.
pub fn route(layout: &Layout, from: (usize, usize), targets: &[(usize, usize)]) -> Route {
    if targets.is_empty() {
        return Route::Unreachable;
    }
    if let Some(action) = adjacent_target(from, targets) {
        return Route::Interact(action);
    }

    let width = layout.width();
    let mut first_step: Vec<Option<PrimitiveAction>> = vec![None; width * layout.height()];
    let mut visited = vec![false; width * layout.height()];
    let mut queue = VecDeque::new();
    visited[from.1 * width + from.0] = true;
    queue.push_back(from);

    while let Some(cell) = queue.pop_front() {
        for action in PrimitiveAction::MOVES {
            let (nx, ny) = step_from(cell, action);
            let Some(tile) = layout.tile_at(nx, ny) else {
                continue;
            };
            if !tile.is_walkable() {
                continue;
            }
            let next = (nx as usize, ny as usize);
            let idx = next.1 * width + next.0;
            if visited[idx] {
                continue;
            }
            visited[idx] = true;
            let origin = if cell == from {
                Some(action)
            } else {
                first_step[cell.1 * width + cell.0]
            };
            first_step[idx] = origin;
            if adjacent_target(next, targets).is_some() {
                return origin.map(Route::Walk).unwrap_or(Route::Unreachable);
            }
            queue.push_back(next);
        }
    }

    Route::Unreachable
}

#[cfg(test)]
mod tests {
    use super::*;

    fn practice() -> Layout {
        Layout::builtin("practice").unwrap()
    }

    #[test]
    fn adjacent_target_is_an_interaction() {
        let layout = practice();
        // (1, 2) sits right of the knife at (0, 2).
        assert_eq!(
            route(&layout, (1, 2), &[(0, 2)]),
            Route::Interact(PrimitiveAction::Left)
        );
    }

    #[test]
    fn walks_along_shortest_path() {
        let layout = practice();
        // From (3, 3) the delivery at (3, 4) is directly below.
        assert_eq!(
            route(&layout, (3, 3), &[(3, 4)]),
            Route::Interact(PrimitiveAction::Down)
        );
        // From (1, 1) the nearest tile next to the delivery is (3, 3).
        match route(&layout, (1, 1), &[(3, 4)]) {
            Route::Walk(action) => {
                assert!(matches!(action, PrimitiveAction::Right | PrimitiveAction::Down))
            }
            other => panic!("expected walk, got {other:?}"),
        }
    }

    #[test]
    fn missing_targets_are_unreachable() {
        assert_eq!(route(&practice(), (1, 1), &[]), Route::Unreachable);
    }
}
