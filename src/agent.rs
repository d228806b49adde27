use bevy::log::warn;
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

use crate::config::ForagingParams;
use crate::memory::MemoryWindow;
use crate::pheromones::ScentField;
use crate::substrate::{Candidate, Substrate};

/// Speed recorded for continuing in the same direction, and for the first move.
pub const STRAIGHT_SPEED: f32 = 1.0;
/// Speed recorded for a sideways turn.
pub const TURN_SPEED: f32 = 0.7;
/// Speed recorded for doubling back.
pub const REVERSE_SPEED: f32 = 0.4;

/// What happened to an agent during one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Every option was blocked; nothing changed.
    Stalled,
    Moved { picked_up: bool, dropped_off: bool },
}

/// A single forager. Searches by following the trail with some randomness
/// and returns greedily to the nest once it has picked up food.
#[derive(Debug, Clone)]
pub struct ForagingAgent<P, H> {
    position: P,
    carrying_food: bool,
    path: Vec<P>,
    speed_history: Vec<f32>,
    memory: MemoryWindow<P>,
    last_heading: Option<H>,
    steps: u64,
    stalls: u64,
    deliveries: u32,
}

impl<P: Copy + PartialEq, H: Copy + PartialEq> ForagingAgent<P, H> {
    pub fn new(start: P, memory: usize) -> Self {
        Self {
            position: start,
            carrying_food: false,
            path: Vec::new(),
            speed_history: Vec::new(),
            memory: MemoryWindow::new(memory),
            last_heading: None,
            steps: 0,
            stalls: 0,
            deliveries: 0,
        }
    }

    pub fn position(&self) -> P {
        self.position
    }

    pub fn carrying_food(&self) -> bool {
        self.carrying_food
    }

    /// Every position moved to, oldest first.
    pub fn path(&self) -> &[P] {
        &self.path
    }

    /// One entry per move, aligned with `path`.
    pub fn speed_history(&self) -> &[f32] {
        &self.speed_history
    }

    pub fn memory(&self) -> &MemoryWindow<P> {
        &self.memory
    }

    pub fn last_heading(&self) -> Option<H> {
        self.last_heading
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn stalls(&self) -> u64 {
        self.stalls
    }

    pub fn deliveries(&self) -> u32 {
        self.deliveries
    }

    /// Run one sense, choose, move, deposit cycle.
    pub fn act<S, R>(
        &mut self,
        world: &mut S,
        field: &mut S::Field,
        params: &ForagingParams,
        rng: &mut R,
    ) -> Outcome
    where
        S: Substrate<Point = P, Heading = H>,
        R: Rng + ?Sized,
    {
        self.steps += 1;

        let Some(choice) = self.choose(world, field, params, rng) else {
            self.stalls += 1;
            return Outcome::Stalled;
        };

        let speed = self.turn_speed(world, choice.heading);
        self.memory.push(self.position);
        self.position = world.advance(self.position, &choice, speed);
        self.path.push(self.position);
        self.speed_history.push(speed);
        self.last_heading = Some(choice.heading);

        let mut picked_up = false;
        let mut dropped_off = false;
        if !self.carrying_food && world.is_food(self.position) {
            self.carrying_food = true;
            world.remove_food(self.position);
            picked_up = true;
        } else if self.carrying_food && world.is_nest(self.position) {
            self.carrying_food = false;
            self.deliveries += 1;
            dropped_off = true;
        }

        let amount = if self.carrying_food {
            params.carry_deposit
        } else {
            params.search_deposit
        };
        field.deposit(self.position, amount);

        Outcome::Moved { picked_up, dropped_off }
    }

    /// Candidate filtering and selection. `None` means the agent is boxed in.
    fn choose<S, R>(
        &self,
        world: &S,
        field: &S::Field,
        params: &ForagingParams,
        rng: &mut R,
    ) -> Option<Candidate<P, H>>
    where
        S: Substrate<Point = P, Heading = H>,
        R: Rng + ?Sized,
    {
        let mut open = Vec::new();
        world.candidates(self.position, &mut open);
        open.retain(|c| !world.is_blocked(c.target));

        let fresh: Vec<_> = open
            .iter()
            .filter(|c| !self.memory.any(|&seen| world.revisits(seen, c.target)))
            .copied()
            .collect();
        // Recent history alone never traps an agent.
        let pool = if fresh.is_empty() { open } else { fresh };
        if pool.is_empty() {
            return None;
        }

        if self.carrying_food {
            Some(homeward(world, &pool))
        } else {
            Some(weighted_pick(field, &pool, params.exploration_floor, rng))
        }
    }

    fn turn_speed<S>(&self, world: &S, next: H) -> f32
    where
        S: Substrate<Point = P, Heading = H>,
    {
        match self.last_heading {
            None => STRAIGHT_SPEED,
            Some(previous) if previous == next => STRAIGHT_SPEED,
            Some(previous) if world.is_reversal(previous, next) => REVERSE_SPEED,
            Some(_) => TURN_SPEED,
        }
    }
}

/// Closest option to the nest; the earliest listed wins ties.
fn homeward<S: Substrate>(
    world: &S,
    pool: &[Candidate<S::Point, S::Heading>],
) -> Candidate<S::Point, S::Heading> {
    let mut best = pool[0];
    let mut best_distance = world.nest_distance(best.target);
    for candidate in &pool[1..] {
        let distance = world.nest_distance(candidate.target);
        if distance < best_distance {
            best = *candidate;
            best_distance = distance;
        }
    }
    best
}

/// Draw an option with probability proportional to its sensed trail plus the
/// exploration floor.
fn weighted_pick<P: Copy, H: Copy, F: ScentField<P>, R: Rng + ?Sized>(
    field: &F,
    pool: &[Candidate<P, H>],
    exploration_floor: f32,
    rng: &mut R,
) -> Candidate<P, H> {
    let weights: Vec<f32> = pool
        .iter()
        .map(|c| field.get(c.probe) + exploration_floor)
        .collect();
    match WeightedIndex::new(&weights) {
        Ok(dist) => pool[dist.sample(rng)],
        Err(err) => {
            warn!("unusable candidate weights {:?}: {}", weights, err);
            pool[0]
        }
    }
}
