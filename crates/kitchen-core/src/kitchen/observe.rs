//! Vector encodings of the kitchen state.
//!
//! Macro observation for agent `i` (all entries in `[0, 1]`):
//!
//! | block | width |
//! |---|---|
//! | ego `[x, y, holding]` then every other agent in index order | `3 * n_agents` |
//! | `[dish_ready, chopped_ready]` | 2 |
//! | per entity `[x, y, state, present]` | `4 * entities` |
//! | per knife then per delivery `[x, y]` | `2 * stations` |

use super::world::KitchenEnv;
use crate::env::{PARTNER_STATE_DIM, StateVector, manhattan};
use crate::model::Place;

pub(crate) fn normalize(value: usize, extent: usize) -> f32 {
    let span = extent.saturating_sub(1).max(1);
    value as f32 / span as f32
}

pub(crate) fn macro_dim(n_agents: usize, entities: usize, stations: usize) -> usize {
    3 * n_agents + 2 + 4 * entities + 2 * stations
}

impl KitchenEnv {
    pub(crate) fn encode_agent(&self, agent: usize, out: &mut Vec<f32>) {
        let layout = self.layout();
        let (x, y) = self.agent_position(agent);
        out.push(normalize(x, layout.width()));
        out.push(normalize(y, layout.height()));
        out.push(self.held_item(agent).map(|item| item.holding_code()).unwrap_or(0.0));
    }

    pub(crate) fn encode_macro(&self, ego: usize) -> Vec<f32> {
        let layout = self.layout();
        let mut out = Vec::with_capacity(self.macro_dim());

        self.encode_agent(ego, &mut out);
        for other in (0..self.n_agents_internal()).filter(|other| *other != ego) {
            self.encode_agent(other, &mut out);
        }

        let mut dish_ready = 0.0;
        let mut chopped_ready = 0.0;
        for entity in self.entities() {
            if let Place::Tile { .. } = entity.place {
                if entity.item.is_dish() {
                    dish_ready = 1.0;
                }
                if entity.item.is_chopped_lettuce() {
                    chopped_ready = 1.0;
                }
            }
        }
        out.push(dish_ready);
        out.push(chopped_ready);

        for entity in self.entities() {
            match self.entity_position(entity.place) {
                Some((x, y)) => {
                    out.push(normalize(x, layout.width()));
                    out.push(normalize(y, layout.height()));
                    out.push(entity.item.state_code());
                    out.push(1.0);
                }
                None => out.extend_from_slice(&[0.0, 0.0, 0.0, 0.0]),
            }
        }

        for &(x, y) in layout.knives().iter().chain(layout.deliveries()) {
            out.push(normalize(x, layout.width()));
            out.push(normalize(y, layout.height()));
        }

        debug_assert_eq!(out.len(), self.macro_dim());
        out
    }

    /// `[x, y, holding, knife distance, delivery distance, partner distance]`,
    /// distances scaled by the grid perimeter half-length.
    pub(crate) fn encode_partner_centric(&self, agent: usize) -> StateVector {
        let layout = self.layout();
        let scale = (layout.width() + layout.height()) as f32;
        let position = self.agent_position(agent);
        let nearest = |points: &[(usize, usize)]| {
            points
                .iter()
                .map(|&p| manhattan(position, p))
                .min()
                .unwrap_or(0) as f32
                / scale
        };
        let partner_distance = (0..self.n_agents_internal())
            .filter(|other| *other != agent)
            .map(|other| manhattan(position, self.agent_position(other)))
            .min()
            .unwrap_or(0) as f32
            / scale;

        let vector = [
            normalize(position.0, layout.width()),
            normalize(position.1, layout.height()),
            self.held_item(agent).map(|item| item.holding_code()).unwrap_or(0.0),
            nearest(layout.knives()),
            nearest(layout.deliveries()),
            partner_distance,
        ];
        debug_assert_eq!(vector.len(), PARTNER_STATE_DIM);
        vector
    }
}
