//! Pheromone-guided foraging on a grid (2D or 3D) or a continuous arena.
//!
//! Agents leave the nest, wander under a trail-weighted random choice until
//! they step onto food, then walk greedily home while laying a stronger trail.
//! A short memory of recent positions keeps them from pacing back and forth.
//! The trail evaporates a fixed fraction per tick.
//!
//! [`GridSimulation`] and [`ArenaSimulation`] own the world, the field, the
//! agents and a seeded random source, so a run is reproducible for a seed.

pub mod agent;
pub mod arena;
pub mod config;
pub mod environment;
pub mod error;
pub mod geometry;
pub mod memory;
pub mod pheromones;
pub mod simulation;
pub mod substrate;

pub use agent::{ForagingAgent, Outcome};
pub use arena::{Arena, ArenaItem};
pub use config::{ArenaConfig, ForagingParams, SimConfig};
pub use environment::SpatialEnvironment;
pub use error::{Rejection, SimError, SimResult};
pub use geometry::{CellKind, GridPos, Offset, Rect};
pub use pheromones::{FieldSlice, PheromoneField, QuantizedField, ScentField};
pub use simulation::{
    AgentView, ArenaEdit, ArenaSimulation, EnvEdit, GridSimulation, LoopState, Simulation,
    Snapshot, Termination,
};
pub use substrate::{Candidate, Substrate};
