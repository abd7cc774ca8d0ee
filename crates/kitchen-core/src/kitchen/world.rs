use super::observe::macro_dim;
use super::planner::{self, Route};
use crate::env::{
    AgentSnapshot, AgentView, BoxSpace, CollaboratorEnv, CreditedEvent, ItemSnapshot,
    LowLevelPlan, MacroStatus, ObservationSpace, StateVector, StepInfo, StepOutcome,
    WorldSnapshot,
};
use crate::model::{
    Item, Layout, LayoutError, MacroAction, Place, PrimitiveAction, RewardEvent, RewardSchedule,
    Tile,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use thiserror::Error;

const AGENT_COLORS: [&str; 4] = ["blue", "red", "green", "yellow"];

#[derive(Debug, Error)]
pub enum KitchenError {
    #[error("unknown layout '{0}'")]
    UnknownLayout(String),
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error("layout '{layout}' has {available} agent starts but {requested} agents were requested")]
    AgentCount {
        layout: String,
        available: usize,
        requested: usize,
    },
    #[error("expected one reward schedule per agent ({expected}), got {found}")]
    RewardCount { expected: usize, found: usize },
}

#[derive(Debug, Clone)]
pub struct KitchenConfig {
    pub layout: Layout,
    pub n_agent: usize,
    pub rewards: Vec<RewardSchedule>,
}

impl KitchenConfig {
    pub fn new(layout: Layout, n_agent: usize) -> Self {
        Self {
            layout,
            n_agent,
            rewards: vec![RewardSchedule::default(); n_agent],
        }
    }

    pub fn builtin(name: &str, n_agent: usize) -> Result<Self, KitchenError> {
        let layout =
            Layout::builtin(name).ok_or_else(|| KitchenError::UnknownLayout(name.to_string()))?;
        Ok(Self::new(layout, n_agent))
    }

    pub fn with_rewards(mut self, rewards: Vec<RewardSchedule>) -> Self {
        self.rewards = rewards;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Entity {
    pub(crate) item: Item,
    pub(crate) place: Place,
    spawn: (usize, usize),
    /// Lettuce entity merged into this plate.
    contents: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AgentState {
    x: usize,
    y: usize,
    holding: Option<usize>,
}

/// Lettuce-salad kitchen with a breadth-first macro translator.
///
/// Entities keep stable indices for the lifetime of the env: lettuces first,
/// then plates, each in layout reading order. Delivered or merged entities go
/// to [`Place::Consumed`] until they respawn.
#[derive(Debug, Clone)]
pub struct KitchenEnv {
    layout: Layout,
    rewards: Vec<RewardSchedule>,
    agents: Vec<AgentState>,
    entities: Vec<Entity>,
    macros: Vec<MacroStatus>,
    macro_obs: Vec<Vec<f32>>,
    rng: StdRng,
    soft_resets: u64,
    closed: bool,
}

impl KitchenEnv {
    pub fn new(config: KitchenConfig) -> Result<Self, KitchenError> {
        let KitchenConfig {
            layout,
            n_agent,
            rewards,
        } = config;
        let available = layout.agent_starts().len();
        if n_agent == 0 || n_agent > available {
            return Err(KitchenError::AgentCount {
                layout: layout.name().to_string(),
                available,
                requested: n_agent,
            });
        }
        if rewards.len() != n_agent {
            return Err(KitchenError::RewardCount {
                expected: n_agent,
                found: rewards.len(),
            });
        }

        let mut env = Self {
            layout,
            rewards,
            agents: Vec::new(),
            entities: Vec::new(),
            macros: Vec::new(),
            macro_obs: Vec::new(),
            rng: StdRng::seed_from_u64(0),
            soft_resets: 0,
            closed: false,
        };
        env.restore(0, n_agent);
        Ok(env)
    }

    fn restore(&mut self, seed: u64, n_agent: usize) {
        self.rng = StdRng::seed_from_u64(seed);
        self.agents = self.layout.agent_starts()[..n_agent]
            .iter()
            .map(|&(x, y)| AgentState { x, y, holding: None })
            .collect();
        let lettuces = self
            .layout
            .lettuce_spawns()
            .iter()
            .map(|&spawn| (Item::fresh_lettuce(), spawn));
        let plates = self
            .layout
            .plate_spawns()
            .iter()
            .map(|&spawn| (Item::empty_plate(), spawn));
        self.entities = lettuces
            .chain(plates)
            .map(|(item, spawn)| Entity {
                item,
                place: Place::Tile {
                    x: spawn.0,
                    y: spawn.1,
                },
                spawn,
                contents: None,
            })
            .collect();
        self.macros = vec![
            MacroStatus {
                action: MacroAction::Stay,
                done: true,
            };
            n_agent
        ];
        self.refresh_all_observations();
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Number of observation-only soft resets since construction.
    pub fn soft_reset_count(&self) -> u64 {
        self.soft_resets
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn macro_dim(&self) -> usize {
        macro_dim(
            self.agents.len(),
            self.entities.len(),
            self.layout.knives().len() + self.layout.deliveries().len(),
        )
    }

    pub(crate) fn n_agents_internal(&self) -> usize {
        self.agents.len()
    }

    pub(crate) fn agent_position(&self, agent: usize) -> (usize, usize) {
        let state = self.agents[agent];
        (state.x, state.y)
    }

    pub(crate) fn held_item(&self, agent: usize) -> Option<Item> {
        self.agents[agent]
            .holding
            .map(|entity| self.entities[entity].item)
    }

    pub(crate) fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub(crate) fn entity_position(&self, place: Place) -> Option<(usize, usize)> {
        match place {
            Place::Tile { x, y } => Some((x, y)),
            Place::Held { agent } => Some(self.agent_position(agent)),
            Place::Consumed => None,
        }
    }

    fn entity_on_tile(&self, x: usize, y: usize) -> Option<usize> {
        self.entities
            .iter()
            .position(|entity| entity.place == Place::Tile { x, y })
    }

    fn refresh_all_observations(&mut self) {
        self.macro_obs = (0..self.agents.len())
            .map(|agent| self.encode_macro(agent))
            .collect();
    }

    fn refresh_finished_observations(&mut self) {
        for agent in 0..self.agents.len() {
            if self.macros[agent].done {
                self.macro_obs[agent] = self.encode_macro(agent);
            }
        }
    }

    fn resolve_moves(&self, joint: &[PrimitiveAction]) -> Vec<(usize, usize)> {
        let current: Vec<(usize, usize)> =
            (0..self.agents.len()).map(|a| self.agent_position(a)).collect();
        let mut next = current.clone();
        for (agent, position) in current.iter().enumerate() {
            let action = joint.get(agent).copied().unwrap_or(PrimitiveAction::Stay);
            let (dx, dy) = action.delta();
            let (nx, ny) = (position.0 as i32 + dx, position.1 as i32 + dy);
            if self.layout.tile_at(nx, ny).is_some_and(Tile::is_walkable) {
                next[agent] = (nx as usize, ny as usize);
            }
        }

        // Contested cells and swaps cancel every move involved; repeat until
        // the cancellations stop cascading.
        loop {
            let mut changed = false;
            for a in 0..next.len() {
                for b in (a + 1)..next.len() {
                    let same_cell = next[a] == next[b];
                    let swap = next[a] == current[b] && next[b] == current[a];
                    if same_cell || swap {
                        if next[a] != current[a] || next[b] != current[b] {
                            changed = true;
                        }
                        next[a] = current[a];
                        next[b] = current[b];
                    }
                }
            }
            if !changed {
                break;
            }
        }
        next
    }

    fn interact(&mut self, agent: usize, x: usize, y: usize, events: &mut Vec<CreditedEvent>) {
        let Some(tile) = self.layout.tile(x, y) else {
            return;
        };
        let held = self.agents[agent].holding;
        let on_tile = self.entity_on_tile(x, y);
        let mut emit = |event| events.push(CreditedEvent { agent, event });

        match tile {
            Tile::Floor => {}
            Tile::Delivery => {
                let Some(entity) = held else {
                    return;
                };
                if self.entities[entity].item.is_dish() {
                    self.agents[agent].holding = None;
                    self.serve(entity);
                    emit(RewardEvent::CorrectDelivery);
                } else {
                    emit(RewardEvent::WrongDelivery);
                }
            }
            Tile::Counter | Tile::Knife => match (held, on_tile) {
                (None, Some(entity)) => {
                    let item = &mut self.entities[entity].item;
                    if tile == Tile::Knife && item.is_raw_lettuce() {
                        if let Item::Lettuce { progress } = item {
                            *progress += 1;
                        }
                        if item.is_chopped_lettuce() {
                            emit(RewardEvent::Chopped);
                        }
                    } else {
                        self.entities[entity].place = Place::Held { agent };
                        self.agents[agent].holding = Some(entity);
                    }
                }
                (Some(entity), None) => {
                    self.entities[entity].place = Place::Tile { x, y };
                    self.agents[agent].holding = None;
                }
                (Some(carried), Some(resting)) => {
                    let carried_item = self.entities[carried].item;
                    let resting_item = self.entities[resting].item;
                    if carried_item.is_chopped_lettuce() && resting_item.is_empty_plate() {
                        self.plate(resting, carried);
                        self.agents[agent].holding = None;
                        emit(RewardEvent::Plated);
                    } else if carried_item.is_empty_plate() && resting_item.is_chopped_lettuce() {
                        self.plate(carried, resting);
                        emit(RewardEvent::Plated);
                    }
                }
                (None, None) => {}
            },
        }
    }

    fn plate(&mut self, plate: usize, lettuce: usize) {
        self.entities[plate].item = Item::Plate { salad: true };
        self.entities[plate].contents = Some(lettuce);
        self.entities[lettuce].place = Place::Consumed;
    }

    fn serve(&mut self, plate: usize) {
        let lettuce = self.entities[plate].contents.take();
        self.entities[plate].item = Item::empty_plate();
        self.entities[plate].place = Place::Consumed;
        self.respawn(plate);
        if let Some(lettuce) = lettuce {
            self.entities[lettuce].item = Item::fresh_lettuce();
            self.respawn(lettuce);
        }
    }

    /// Puts a consumed entity back on its spawn tile, or on a random free
    /// counter when the spawn is occupied.
    fn respawn(&mut self, entity: usize) {
        let (sx, sy) = self.entities[entity].spawn;
        let target = if self.entity_on_tile(sx, sy).is_none() {
            Some((sx, sy))
        } else {
            let free: Vec<(usize, usize)> = (0..self.layout.height())
                .flat_map(|y| (0..self.layout.width()).map(move |x| (x, y)))
                .filter(|&(x, y)| self.layout.tile(x, y) == Some(Tile::Counter))
                .filter(|&(x, y)| self.entity_on_tile(x, y).is_none())
                .collect();
            free.choose(&mut self.rng).copied()
        };
        if let Some((x, y)) = target {
            self.entities[entity].place = Place::Tile { x, y };
        }
    }

    fn macro_targets(&self, action: MacroAction) -> Vec<(usize, usize)> {
        let on_tile = |wanted: fn(Item) -> bool| -> Vec<(usize, usize)> {
            self.entities
                .iter()
                .filter(|entity| wanted(entity.item))
                .filter_map(|entity| match entity.place {
                    Place::Tile { x, y } => Some((x, y)),
                    _ => None,
                })
                .collect()
        };
        match action {
            MacroAction::GetLettuce => on_tile(|item| matches!(item, Item::Lettuce { .. })),
            MacroAction::GetPlate => on_tile(|item| matches!(item, Item::Plate { .. })),
            MacroAction::GoToKnife1 => self.layout.knives().iter().take(1).copied().collect(),
            MacroAction::GoToKnife2 => self.layout.knives().iter().skip(1).take(1).copied().collect(),
            MacroAction::Deliver => self.layout.deliveries().to_vec(),
            _ => Vec::new(),
        }
    }

    fn lower(&self, agent: usize, action: MacroAction) -> (PrimitiveAction, bool) {
        if let Some(primitive) = action.as_primitive() {
            return (primitive, true);
        }
        let targets = self.macro_targets(action);
        match planner::route(&self.layout, self.agent_position(agent), &targets) {
            Route::Interact(primitive) => (primitive, true),
            Route::Walk(primitive) => (primitive, false),
            Route::Unreachable => (PrimitiveAction::Stay, true),
        }
    }
}

impl CollaboratorEnv for KitchenEnv {
    fn n_agents(&self) -> usize {
        self.agents.len()
    }

    fn macro_action_count(&self) -> usize {
        MacroAction::COUNT
    }

    fn reset(&mut self, seed: u64) -> Vec<Vec<f32>> {
        let n_agent = self.agents.len();
        self.restore(seed, n_agent);
        self.macro_obs.clone()
    }

    fn step(&mut self, joint: &[PrimitiveAction]) -> StepOutcome {
        let next = self.resolve_moves(joint);
        let mut bumps = Vec::new();
        for (agent, &(nx, ny)) in next.iter().enumerate() {
            let action = joint.get(agent).copied().unwrap_or(PrimitiveAction::Stay);
            let state = &mut self.agents[agent];
            if (state.x, state.y) != (nx, ny) {
                state.x = nx;
                state.y = ny;
            } else if action != PrimitiveAction::Stay {
                let (dx, dy) = action.delta();
                let (tx, ty) = (state.x as i32 + dx, state.y as i32 + dy);
                if self.layout.tile_at(tx, ty).is_some_and(|tile| !tile.is_walkable()) {
                    bumps.push((agent, tx as usize, ty as usize));
                }
            }
        }

        let mut events = Vec::new();
        for (agent, x, y) in bumps {
            self.interact(agent, x, y, &mut events);
        }

        let mut rewards: Vec<f32> = self
            .rewards
            .iter()
            .map(|schedule| schedule.step_penalty)
            .collect();
        for credited in &events {
            rewards[credited.agent] += self.rewards[credited.agent].value(credited.event);
        }

        self.refresh_finished_observations();
        StepOutcome {
            observations: self.macro_obs.clone(),
            rewards,
            done: false,
            info: StepInfo { events },
        }
    }

    fn soft_reset_obs_only(&mut self) {
        self.soft_resets += 1;
        self.refresh_all_observations();
    }

    fn agents(&self) -> Vec<AgentView> {
        (0..self.agents.len())
            .map(|agent| {
                let (x, y) = self.agent_position(agent);
                AgentView {
                    x,
                    y,
                    holding: self.held_item(agent),
                }
            })
            .collect()
    }

    fn stations(&self) -> Vec<(usize, usize)> {
        self.layout.knives().to_vec()
    }

    fn compute_low_level_actions(&mut self, macros: &[usize]) -> LowLevelPlan {
        let mut primitives = Vec::with_capacity(self.agents.len());
        for agent in 0..self.agents.len() {
            if self.macros[agent].done {
                let requested = macros
                    .get(agent)
                    .and_then(|&index| MacroAction::from_index(index))
                    .unwrap_or(MacroAction::Stay);
                self.macros[agent] = MacroStatus {
                    action: requested,
                    done: false,
                };
            }
            let (primitive, done) = self.lower(agent, self.macros[agent].action);
            self.macros[agent].done = done;
            primitives.push(primitive);
        }
        LowLevelPlan {
            primitives,
            meta: self.macros.clone(),
        }
    }

    fn macro_observation(&self) -> Vec<Vec<f32>> {
        self.macro_obs.clone()
    }

    fn partner_centric_observation(&self) -> Vec<StateVector> {
        (0..self.agents.len())
            .map(|agent| self.encode_partner_centric(agent))
            .collect()
    }

    fn macro_action_done(&self, agent: usize) -> bool {
        self.macros.get(agent).map(|status| status.done).unwrap_or(true)
    }

    fn set_macro_action_done(&mut self, agent: usize, done: bool) {
        if let Some(status) = self.macros.get_mut(agent) {
            status.done = done;
        }
    }

    fn observation_space(&self) -> ObservationSpace {
        ObservationSpace::Box(BoxSpace::uniform(self.macro_dim(), 0.0, 1.0))
    }

    fn snapshot(&self) -> WorldSnapshot {
        let items = self
            .entities
            .iter()
            .filter_map(|entity| match entity.place {
                Place::Tile { x, y } => Some(ItemSnapshot {
                    x,
                    y,
                    kind: entity.item.name().to_string(),
                    containing: entity.item.contained_name().map(str::to_string),
                }),
                _ => None,
            })
            .collect();
        let agents = self
            .agents
            .iter()
            .enumerate()
            .map(|(index, state)| {
                let held = state.holding.map(|entity| self.entities[entity].item);
                AgentSnapshot {
                    x: state.x,
                    y: state.y,
                    color: AGENT_COLORS[index % AGENT_COLORS.len()].to_string(),
                    holding: held.map(|item| item.name().to_string()),
                    holding_containing: held
                        .and_then(|item| item.contained_name())
                        .map(str::to_string),
                }
            })
            .collect();
        WorldSnapshot {
            xlen: self.layout.width(),
            ylen: self.layout.height(),
            map: self.layout.rows(),
            items,
            agents,
        }
    }

    fn close(&mut self) {
        self.closed = true;
    }
}
