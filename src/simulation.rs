use bevy::log::{debug, info, warn};
use bevy::math::Vec2;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use crate::agent::{ForagingAgent, Outcome};
use crate::arena::{Arena, ArenaItem};
use crate::config::{validate_run, ArenaConfig, ForagingParams, SimConfig};
use crate::environment::SpatialEnvironment;
use crate::error::{Rejection, SimError, SimResult};
use crate::geometry::{CellKind, GridPos, Rect};
use crate::pheromones::{FieldSlice, PheromoneField, ScentField};
use crate::substrate::Substrate;

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Termination {
    FoodExhausted,
    StepBudgetReached,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LoopState {
    Running,
    Terminated(Termination),
}

impl LoopState {
    pub fn is_running(&self) -> bool {
        matches!(self, LoopState::Running)
    }
}

/// Read-only copy of one agent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentView<P> {
    pub position: P,
    pub carrying_food: bool,
    pub path: Vec<P>,
    pub speed_history: Vec<f32>,
    pub deliveries: u32,
}

/// Read-only copy of a grid run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub tick: u64,
    pub state: LoopState,
    pub agents: Vec<AgentView<GridPos>>,
    pub extent: [i32; 3],
    /// Every cell, x fastest, then y, then z.
    pub pheromone: Vec<f32>,
    pub food: Vec<GridPos>,
    pub obstacles: Vec<GridPos>,
    pub nest: GridPos,
}

/// Interactive edits to the grid between ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EnvEdit {
    AddFood(GridPos),
    AddObstacle(GridPos),
    RemoveNearest(GridPos),
}

/// Interactive edits to the arena between ticks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ArenaEdit {
    AddFood(Vec2),
    AddObstacle(Rect),
    RemoveNearest(Vec2),
}

/// Drives agents over a shared substrate and trail field, one tick at a time.
///
/// Agents act in index order, so an agent senses deposits made earlier in the
/// same tick by lower-indexed agents. The field evaporates once per tick after
/// every agent has moved.
pub struct Simulation<S: Substrate> {
    world: S,
    field: S::Field,
    agents: Vec<ForagingAgent<S::Point, S::Heading>>,
    params: ForagingParams,
    decay_rate: f32,
    max_steps: u64,
    tick: u64,
    state: LoopState,
    rng: ChaCha8Rng,
}

pub type GridSimulation = Simulation<SpatialEnvironment>;
pub type ArenaSimulation = Simulation<Arena>;

impl<S: Substrate> Simulation<S> {
    fn assemble(
        world: S,
        field: S::Field,
        agent_count: usize,
        params: ForagingParams,
        decay_rate: f32,
        max_steps: u64,
        rng: ChaCha8Rng,
    ) -> Self {
        let agents = (0..agent_count)
            .map(|_| ForagingAgent::new(world.nest(), params.memory))
            .collect();
        Self {
            world,
            field,
            agents,
            params,
            decay_rate,
            max_steps,
            tick: 0,
            state: LoopState::Running,
            rng,
        }
    }

    /// Advance exactly one tick. Once terminated, further calls change nothing.
    pub fn step(&mut self) -> LoopState {
        if !self.state.is_running() {
            return self.state;
        }

        let tick = self.tick;
        for (id, agent) in self.agents.iter_mut().enumerate() {
            let outcome = agent.act(&mut self.world, &mut self.field, &self.params, &mut self.rng);
            match outcome {
                Outcome::Stalled => {
                    debug!("agent {} boxed in at {:?} on tick {}", id, agent.position(), tick);
                }
                Outcome::Moved { picked_up: true, .. } => {
                    debug!("agent {} took food at {:?} on tick {}", id, agent.position(), tick);
                }
                Outcome::Moved { dropped_off: true, .. } => {
                    debug!("agent {} delivered food on tick {}", id, tick);
                }
                Outcome::Moved { .. } => {}
            }
        }
        self.field.evaporate(self.decay_rate);
        self.tick += 1;

        if self.world.food_remaining() == 0 {
            self.state = LoopState::Terminated(Termination::FoodExhausted);
        } else if self.tick >= self.max_steps {
            self.state = LoopState::Terminated(Termination::StepBudgetReached);
        }
        if let LoopState::Terminated(reason) = self.state {
            info!(
                "run finished after {} ticks: {:?}, {} deliveries",
                self.tick,
                reason,
                self.deliveries()
            );
        }
        self.state
    }

    /// Step until the run terminates.
    pub fn run(&mut self) -> Termination {
        loop {
            if let LoopState::Terminated(reason) = self.step() {
                return reason;
            }
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn max_steps(&self) -> u64 {
        self.max_steps
    }

    pub fn world(&self) -> &S {
        &self.world
    }

    pub fn field(&self) -> &S::Field {
        &self.field
    }

    pub fn agents(&self) -> &[ForagingAgent<S::Point, S::Heading>] {
        &self.agents
    }

    pub fn carriers(&self) -> usize {
        self.agents.iter().filter(|a| a.carrying_food()).count()
    }

    pub fn deliveries(&self) -> u32 {
        self.agents.iter().map(|a| a.deliveries()).sum()
    }

    pub fn field_mass(&self) -> f32 {
        self.field.total()
    }

    pub fn agent_views(&self) -> Vec<AgentView<S::Point>> {
        self.agents
            .iter()
            .map(|a| AgentView {
                position: a.position(),
                carrying_food: a.carrying_food(),
                path: a.path().to_vec(),
                speed_history: a.speed_history().to_vec(),
                deliveries: a.deliveries(),
            })
            .collect()
    }
}

impl Simulation<SpatialEnvironment> {
    /// Build a grid run: validate, place food and obstacles from the seeded
    /// random source, start every agent on the nest.
    pub fn create(config: SimConfig) -> SimResult<Self> {
        config.validate()?;
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        let env = SpatialEnvironment::from_config(&config, &mut rng)?;
        info!(
            "grid simulation ready: extent {:?}, {} food, {} obstacles, {} agents, seed {}",
            env.extent(),
            env.food().len(),
            env.obstacles().len(),
            config.agents,
            config.seed
        );
        Ok(Self::seeded(&config, env, rng))
    }

    /// Build a grid run over a prepared environment. The extent, nest and
    /// placement counts of `config` are ignored.
    pub fn with_environment(config: &SimConfig, env: SpatialEnvironment) -> SimResult<Self> {
        validate_run(
            config.decay_rate,
            config.agents,
            config.max_steps,
            &config.foraging,
            env.cell_count() as u64,
        )?;
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        Ok(Self::seeded(config, env, rng))
    }

    fn seeded(config: &SimConfig, env: SpatialEnvironment, rng: ChaCha8Rng) -> Self {
        let field = PheromoneField::new(env.extent());
        Self::assemble(
            env,
            field,
            config.agents,
            config.foraging,
            config.decay_rate,
            config.max_steps,
            rng,
        )
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            tick: self.tick,
            state: self.state,
            agents: self.agent_views(),
            extent: self.world.extent(),
            pheromone: self.field.values().to_vec(),
            food: self.world.food().iter().copied().collect(),
            obstacles: self.world.obstacles().iter().copied().collect(),
            nest: self.world.nest(),
        }
    }

    /// The plane with `axis` fixed at `index`, e.g. `(2, z)` for a z-slice.
    pub fn pheromone_slice(&self, axis: usize, index: i32) -> SimResult<FieldSlice> {
        self.field.slice(axis, index).ok_or_else(|| {
            let mut coords = [0; 3];
            coords[axis.min(2)] = index;
            SimError::OutOfBounds(GridPos::new(coords[0], coords[1], coords[2]))
        })
    }

    pub fn pheromone_at(&self, at: GridPos) -> SimResult<f32> {
        if !self.world.contains(at) {
            return Err(SimError::OutOfBounds(at));
        }
        Ok(self.field.get(at))
    }

    pub fn kind_at(&self, at: GridPos) -> SimResult<CellKind> {
        self.world.kind_of(at)
    }

    /// Apply an edit between ticks. Returns the cell that changed; a rejected
    /// edit leaves the environment untouched.
    pub fn mutate_environment(&mut self, edit: EnvEdit) -> SimResult<GridPos> {
        let result = match edit {
            EnvEdit::AddFood(at) => self.world.add_food(at).map(|_| at),
            EnvEdit::AddObstacle(at) => {
                if self.agents.iter().any(|a| a.position() == at) {
                    Err(Rejection::AgentPresent)
                } else {
                    self.world.add_obstacle(at).map(|_| at)
                }
            }
            EnvEdit::RemoveNearest(at) => self.world.remove_nearest(at).map(|(cell, kind)| {
                debug!("removed {:?} at {}", kind, cell);
                cell
            }),
        };
        result.map_err(|rejection| {
            warn!("rejected {:?}: {}", edit, rejection);
            SimError::from(rejection)
        })
    }
}

impl Simulation<Arena> {
    /// Build a continuous run with the same policy as the grid.
    pub fn create(config: ArenaConfig) -> SimResult<Self> {
        config.validate()?;
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        let arena = Arena::initialize(&config, &mut rng)?;
        let field = arena.new_field();
        info!(
            "arena simulation ready: {}x{}, {} food, {} obstacles, {} agents, seed {}",
            arena.width(),
            arena.height(),
            arena.food().len(),
            arena.obstacles().len(),
            config.agents,
            config.seed
        );
        Ok(Self::assemble(
            arena,
            field,
            config.agents,
            config.foraging,
            config.decay_rate,
            config.max_steps,
            rng,
        ))
    }

    pub fn pheromone_plane(&self) -> FieldSlice {
        self.field.as_slice()
    }

    pub fn edit_arena(&mut self, edit: ArenaEdit) -> SimResult<ArenaItem> {
        let result = match edit {
            ArenaEdit::AddFood(at) => self.world.add_food(at).map(|_| ArenaItem::Food(at)),
            ArenaEdit::AddObstacle(rect) => {
                if self.agents.iter().any(|a| rect.contains(a.position())) {
                    Err(Rejection::AgentPresent)
                } else {
                    self.world.add_obstacle(rect).map(|_| ArenaItem::Obstacle(rect))
                }
            }
            ArenaEdit::RemoveNearest(at) => self.world.remove_nearest(at),
        };
        result.map_err(|rejection| {
            warn!("rejected {:?}: {}", edit, rejection);
            SimError::from(rejection)
        })
    }
}
