use super::history::History;
use crate::env::manhattan;
use crate::model::Item;

/// Decides whether a step is worth querying the estimator for.
///
/// A key event is the partner letting go of an item once the history window
/// is full. With the station guard on, drops made while standing next to a
/// chopping station are ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyEventPredicate {
    pub station_guard: bool,
}

impl KeyEventPredicate {
    pub const fn new(station_guard: bool) -> Self {
        Self { station_guard }
    }

    pub fn fires(
        &self,
        history: &History,
        held_before: Option<Item>,
        held_after: Option<Item>,
        partner_position: (usize, usize),
        stations: &[(usize, usize)],
    ) -> bool {
        if !history.is_full() {
            return false;
        }
        if held_before.is_none() || held_after.is_some() {
            return false;
        }
        if self.station_guard {
            return stations
                .iter()
                .all(|&station| manhattan(partner_position, station) != 1);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_history() -> History {
        let mut history = History::new(2);
        history.push([0.0; 6]);
        history.push([0.0; 6]);
        history
    }

    #[test]
    fn requires_full_history_and_a_drop() {
        let predicate = KeyEventPredicate::default();
        let lettuce = Some(Item::fresh_lettuce());
        let mut partial = History::new(2);
        partial.push([0.0; 6]);

        assert!(!predicate.fires(&partial, lettuce, None, (1, 1), &[]));
        assert!(!predicate.fires(&full_history(), lettuce, lettuce, (1, 1), &[]));
        assert!(!predicate.fires(&full_history(), None, None, (1, 1), &[]));
        assert!(predicate.fires(&full_history(), lettuce, None, (1, 1), &[]));
    }

    #[test]
    fn station_guard_ignores_drops_beside_a_knife() {
        let guarded = KeyEventPredicate::new(true);
        let lettuce = Some(Item::fresh_lettuce());
        let knife = [(0, 2)];
        assert!(!guarded.fires(&full_history(), lettuce, None, (1, 2), &knife));
        assert!(guarded.fires(&full_history(), lettuce, None, (2, 2), &knife));
        assert!(KeyEventPredicate::new(false).fires(&full_history(), lettuce, None, (1, 2), &knife));
    }
}
