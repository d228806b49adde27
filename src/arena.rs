use std::f32::consts::TAU;

use bevy::math::Vec2;
use rand::Rng;

use crate::config::ArenaConfig;
use crate::error::{Rejection, SimError, SimResult};
use crate::geometry::{CellKind, Rect};
use crate::pheromones::QuantizedField;
use crate::substrate::{Candidate, Substrate};

const PLACEMENT_ATTEMPTS: usize = 10_000;

/// Something the arena can hold besides the nest.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ArenaItem {
    Food(Vec2),
    Obstacle(Rect),
}

/// Continuous rectangle with real-valued positions, rectangular obstacles and
/// point food sources. Agents pick from a fixed fan of headings and sense the
/// trail a little way ahead along each one.
#[derive(Debug, Clone)]
pub struct Arena {
    width: f32,
    height: f32,
    nest: Vec2,
    food: Vec<Vec2>,
    obstacles: Vec<Rect>,
    headings: Vec<Vec2>,
    resolution: f32,
    step_length: f32,
    sense_distance: f32,
    reach: f32,
}

impl Arena {
    /// Empty arena with the configured obstacles and no food.
    pub fn new(config: &ArenaConfig) -> SimResult<Self> {
        config.validate()?;
        let headings = (0..config.headings)
            .map(|i| {
                let angle = i as f32 * TAU / config.headings as f32;
                Vec2::new(snap(angle.cos()), snap(angle.sin()))
            })
            .collect();
        Ok(Self {
            width: config.width,
            height: config.height,
            nest: Vec2::from(config.nest_point()),
            food: Vec::new(),
            obstacles: config.obstacles.clone(),
            headings,
            resolution: config.resolution,
            step_length: config.step_length,
            sense_distance: config.sense_distance,
            reach: config.reach,
        })
    }

    /// Scatters `config.food_count` food points away from the walls, the nest
    /// and the obstacles.
    pub fn initialize(config: &ArenaConfig, rng: &mut impl Rng) -> SimResult<Self> {
        let mut arena = Self::new(config)?;
        let margin = 5.0_f32.min(config.width.min(config.height) * 0.1);
        for placed in 0..config.food_count {
            let spot = (0..PLACEMENT_ATTEMPTS)
                .map(|_| {
                    Vec2::new(
                        rng.gen_range(margin..=config.width - margin),
                        rng.gen_range(margin..=config.height - margin),
                    )
                })
                .find(|&p| arena.add_food(p).is_ok());
            if spot.is_none() {
                return Err(SimError::config(format!(
                    "no free spot for food source {} of {}",
                    placed + 1,
                    config.food_count
                )));
            }
        }
        Ok(arena)
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn food(&self) -> &[Vec2] {
        &self.food
    }

    pub fn obstacles(&self) -> &[Rect] {
        &self.obstacles
    }

    pub fn heading_vector(&self, heading: usize) -> Vec2 {
        self.headings[heading % self.headings.len()]
    }

    pub fn new_field(&self) -> QuantizedField {
        QuantizedField::new(self.width, self.height, self.resolution)
    }

    fn cell_of(&self, at: Vec2) -> (i64, i64) {
        (
            (at.x / self.resolution).floor() as i64,
            (at.y / self.resolution).floor() as i64,
        )
    }

    pub fn add_food(&mut self, at: Vec2) -> Result<(), Rejection> {
        if !self.contains(at) {
            return Err(Rejection::OutsideExtent);
        }
        if self.is_nest(at) {
            return Err(Rejection::NestCell);
        }
        if self.is_blocked(at) {
            return Err(Rejection::Occupied(CellKind::Obstacle));
        }
        self.food.push(at);
        Ok(())
    }

    pub fn add_obstacle(&mut self, rect: Rect) -> Result<(), Rejection> {
        if !(rect.width > 0.0 && rect.height > 0.0) || !self.contains(rect.center()) {
            return Err(Rejection::OutsideExtent);
        }
        let nest_clearance = Rect::new(
            rect.x - self.reach,
            rect.y - self.reach,
            rect.width + 2.0 * self.reach,
            rect.height + 2.0 * self.reach,
        );
        if nest_clearance.contains(self.nest) {
            return Err(Rejection::NestCell);
        }
        if self.food.iter().any(|&f| rect.contains(f)) {
            return Err(Rejection::Occupied(CellKind::Food));
        }
        self.obstacles.push(rect);
        Ok(())
    }

    /// Removes the food point or obstacle (measured to its centre) closest to
    /// `at`. Food wins only when strictly closer.
    pub fn remove_nearest(&mut self, at: Vec2) -> Result<ArenaItem, Rejection> {
        let food = nearest_index(self.food.iter().map(|f| f.distance(at)));
        let rock = nearest_index(self.obstacles.iter().map(|r| r.center().distance(at)));
        match (food, rock) {
            (Some((fi, fd)), Some((_, rd))) if fd < rd => Ok(ArenaItem::Food(self.food.remove(fi))),
            (_, Some((ri, _))) => Ok(ArenaItem::Obstacle(self.obstacles.remove(ri))),
            (Some((fi, _)), None) => Ok(ArenaItem::Food(self.food.remove(fi))),
            (None, None) => Err(Rejection::NothingToRemove),
        }
    }
}

// Axis-aligned headings must not drift off the axis.
fn snap(component: f32) -> f32 {
    if component.abs() < 1e-6 {
        0.0
    } else {
        component
    }
}

fn nearest_index(distances: impl Iterator<Item = f32>) -> Option<(usize, f32)> {
    distances
        .enumerate()
        .fold(None, |best, (i, d)| match best {
            Some((_, bd)) if bd <= d => best,
            _ => Some((i, d)),
        })
}

impl Substrate for Arena {
    type Point = Vec2;
    type Heading = usize;
    type Field = QuantizedField;

    fn candidates(&self, from: Vec2, out: &mut Vec<Candidate<Vec2, usize>>) {
        for (heading, &dir) in self.headings.iter().enumerate() {
            let target = from + dir * self.step_length;
            let obstructed = self
                .obstacles
                .iter()
                .any(|r| r.intersects_segment(from, target));
            if self.contains(target) && !obstructed {
                out.push(Candidate {
                    target,
                    heading,
                    probe: from + dir * self.sense_distance,
                });
            }
        }
    }

    fn is_blocked(&self, at: Vec2) -> bool {
        self.obstacles.iter().any(|r| r.contains(at))
    }

    fn contains(&self, at: Vec2) -> bool {
        (0.0..=self.width).contains(&at.x) && (0.0..=self.height).contains(&at.y)
    }

    fn is_food(&self, at: Vec2) -> bool {
        self.food.iter().any(|f| f.distance(at) < self.reach)
    }

    fn is_nest(&self, at: Vec2) -> bool {
        self.nest.distance(at) < self.reach
    }

    fn nest(&self) -> Vec2 {
        self.nest
    }

    fn nest_distance(&self, at: Vec2) -> f32 {
        self.nest.distance(at)
    }

    fn remove_food(&mut self, at: Vec2) {
        let closest = nearest_index(self.food.iter().map(|f| f.distance(at)));
        if let Some((idx, distance)) = closest {
            if distance < self.reach {
                self.food.remove(idx);
            }
        }
    }

    fn food_remaining(&self) -> usize {
        self.food.len()
    }

    fn revisits(&self, remembered: Vec2, candidate: Vec2) -> bool {
        self.cell_of(remembered) == self.cell_of(candidate)
    }

    fn is_reversal(&self, previous: usize, next: usize) -> bool {
        let n = self.headings.len();
        next == (previous + n / 2) % n
    }

    // The whole segment to the target is clear, so any shorter step is too.
    fn advance(&self, from: Vec2, candidate: &Candidate<Vec2, usize>, speed: f32) -> Vec2 {
        from + self.heading_vector(candidate.heading) * self.step_length * speed
    }
}
