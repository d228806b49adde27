use std::fs;
use std::path::Path;

use antslam::{GridSimulation, Termination};
use bevy::prelude::Resource;
use serde::Serialize;

/// Per-tick series collected while the run is going.
#[derive(Resource, Debug, Clone, Default)]
pub struct RunMetrics {
    pub carriers: Vec<usize>,
    pub pheromone_mass: Vec<f32>,
    pub finished: bool,
}

impl RunMetrics {
    /// Records one sample per completed tick; repeated calls for the same
    /// tick are ignored.
    pub fn record(&mut self, sim: &GridSimulation) {
        if sim.tick() as usize > self.carriers.len() {
            self.carriers.push(sim.carriers());
            self.pheromone_mass.push(sim.field_mass());
        }
    }

    pub fn peak_carriers(&self) -> usize {
        self.carriers.iter().copied().max().unwrap_or(0)
    }
}

#[derive(Debug, Serialize)]
pub struct RunReport<'a> {
    pub termination: Termination,
    pub ticks: u64,
    pub finished_at: String,
    pub seed: u64,
    pub agents: usize,
    pub deliveries: u32,
    pub food_remaining: usize,
    pub peak_carriers: usize,
    pub carriers_per_tick: &'a [usize],
    pub pheromone_per_tick: &'a [f32],
}

impl<'a> RunReport<'a> {
    pub fn new(
        sim: &GridSimulation,
        termination: Termination,
        seed: u64,
        metrics: &'a RunMetrics,
    ) -> Self {
        Self {
            termination,
            ticks: sim.tick(),
            finished_at: chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            seed,
            agents: sim.agents().len(),
            deliveries: sim.deliveries(),
            food_remaining: sim.world().food().len(),
            peak_carriers: metrics.peak_carriers(),
            carriers_per_tick: &metrics.carriers,
            pheromone_per_tick: &metrics.pheromone_mass,
        }
    }

    pub fn write(&self, path: &Path) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
    }
}
