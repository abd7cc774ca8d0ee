use crate::env::StateVector;
use std::collections::VecDeque;

/// Bounded, order-preserving window of partner-centric states. Pushing into a
/// full window evicts the oldest entry.
#[derive(Debug, Clone, PartialEq)]
pub struct History {
    capacity: usize,
    states: VecDeque<StateVector>,
}

impl History {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            states: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, state: StateVector) {
        if self.states.len() == self.capacity {
            self.states.pop_front();
        }
        self.states.push_back(state);
    }

    pub fn clear(&mut self) {
        self.states.clear();
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.states.len() == self.capacity
    }

    /// Oldest first.
    pub fn to_vec(&self) -> Vec<StateVector> {
        self.states.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(tag: f32) -> StateVector {
        [tag, 0.0, 0.0, 0.0, 0.0, 0.0]
    }

    #[test]
    fn evicts_oldest_when_full() {
        let mut history = History::new(3);
        for tag in 0..5 {
            history.push(state(tag as f32));
        }
        assert!(history.is_full());
        let tags: Vec<f32> = history.to_vec().iter().map(|s| s[0]).collect();
        assert_eq!(tags, vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn clear_empties_but_keeps_capacity() {
        let mut history = History::new(2);
        history.push(state(1.0));
        history.clear();
        assert!(history.is_empty());
        assert_eq!(history.capacity(), 2);
    }
}
