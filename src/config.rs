use bevy::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};
use crate::geometry::{GridPos, Rect};

/// Per-agent behaviour shared by the grid and arena variants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForagingParams {
    /// Size of the recently-visited window used to avoid back-and-forth cycling.
    pub memory: usize,
    pub search_deposit: f32,
    pub carry_deposit: f32,
    /// Added to every candidate weight while searching.
    pub exploration_floor: f32,
}

impl Default for ForagingParams {
    fn default() -> Self {
        Self {
            memory: 10,
            search_deposit: 0.2,
            carry_deposit: 1.0,
            exploration_floor: 0.1,
        }
    }
}

impl ForagingParams {
    pub fn validate(&self) -> SimResult<()> {
        let amounts = [self.search_deposit, self.carry_deposit, self.exploration_floor];
        if amounts.iter().any(|v| !v.is_finite()) {
            return Err(SimError::config("deposit amounts and exploration floor must be finite"));
        }
        if self.search_deposit < 0.0 {
            return Err(SimError::config("search_deposit must be non-negative"));
        }
        if self.carry_deposit <= self.search_deposit {
            return Err(SimError::config("carry_deposit must exceed search_deposit"));
        }
        if self.exploration_floor <= 0.0 {
            return Err(SimError::config("exploration_floor must be positive"));
        }
        Ok(())
    }
}

/// Checks shared by every run: evaporation, population, step budget and
/// foraging parameters. `cells` is the number of pheromone cells; neither the
/// population nor the memory window may exceed it.
pub fn validate_run(
    decay_rate: f32,
    agents: usize,
    max_steps: u64,
    foraging: &ForagingParams,
    cells: u64,
) -> SimResult<()> {
    if !(0.0..1.0).contains(&decay_rate) {
        return Err(SimError::config("decay_rate must lie in [0, 1)"));
    }
    if agents == 0 {
        return Err(SimError::config("at least one agent is required"));
    }
    if agents as u64 > cells {
        return Err(SimError::config(format!(
            "{agents} agents exceed the {cells} cells of the field"
        )));
    }
    if foraging.memory as u64 > cells {
        return Err(SimError::config(format!(
            "memory window of {} exceeds the {cells} cells of the field",
            foraging.memory
        )));
    }
    if max_steps == 0 {
        return Err(SimError::config("max_steps must be at least 1"));
    }
    foraging.validate()
}

/// Discrete grid run configuration.
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Cells per axis. The third entry is ignored on 2D grids.
    pub extent: [i32; 3],
    pub dimensions: usize,
    /// Defaults to the centre cell.
    pub nest: Option<GridPos>,
    pub food_count: usize,
    pub obstacle_count: usize,
    pub agents: usize,

    pub decay_rate: f32,
    pub max_steps: u64,
    pub seed: u64,

    pub foraging: ForagingParams,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            extent: [30, 30, 1],
            dimensions: 2,
            nest: None,
            food_count: 5,
            obstacle_count: 40,
            agents: 1,

            decay_rate: 0.01,
            max_steps: 1000,
            seed: 42,

            foraging: ForagingParams::default(),
        }
    }
}

impl SimConfig {
    /// Extent with unused axes collapsed to a single cell.
    pub fn active_extent(&self) -> [i32; 3] {
        let mut extent = self.extent;
        for axis in extent.iter_mut().skip(self.dimensions.min(3)) {
            *axis = 1;
        }
        extent
    }

    pub fn nest_position(&self) -> GridPos {
        self.nest.unwrap_or_else(|| {
            let [x, y, z] = self.active_extent();
            GridPos::new(x / 2, y / 2, z / 2)
        })
    }

    pub fn validate(&self) -> SimResult<()> {
        if !(2..=3).contains(&self.dimensions) {
            return Err(SimError::config(format!(
                "dimensions must be 2 or 3, got {}",
                self.dimensions
            )));
        }
        let extent = self.active_extent();
        if extent.iter().any(|&len| len <= 0) {
            return Err(SimError::config(format!(
                "extent must be positive on every axis, got {:?}",
                &self.extent[..self.dimensions]
            )));
        }
        let cells: u64 = extent.iter().map(|&len| len as u64).product();
        let requested = self.food_count as u64 + self.obstacle_count as u64 + 1;
        if requested > cells {
            return Err(SimError::config(format!(
                "{} food + {} obstacles + nest do not fit in {} cells",
                self.food_count, self.obstacle_count, cells
            )));
        }
        let nest = self.nest_position();
        let nest_inside = (0..3).all(|axis| (0..extent[axis]).contains(&nest.axis(axis)));
        if !nest_inside {
            return Err(SimError::config(format!("nest {nest} lies outside the extent")));
        }
        validate_run(
            self.decay_rate,
            self.agents,
            self.max_steps,
            &self.foraging,
            cells,
        )
    }
}

/// Continuous arena run configuration.
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    pub width: f32,
    pub height: f32,
    /// Defaults to the arena centre.
    pub nest: Option<[f32; 2]>,
    pub food_count: usize,
    pub obstacles: Vec<Rect>,
    pub agents: usize,

    // Sensing and motion
    /// Pheromone cell edge length.
    pub resolution: f32,
    /// Number of evenly spaced candidate headings; must be even.
    pub headings: usize,
    pub step_length: f32,
    pub sense_distance: f32,
    /// Pickup and drop-off radius.
    pub reach: f32,

    pub decay_rate: f32,
    pub max_steps: u64,
    pub seed: u64,

    pub foraging: ForagingParams,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            width: 50.0,
            height: 50.0,
            nest: None,
            food_count: 5,
            obstacles: vec![Rect::new(15.0, 10.0, 5.0, 20.0), Rect::new(30.0, 32.0, 10.0, 5.0)],
            agents: 10,

            resolution: 1.0,
            headings: 8,
            step_length: 1.0,
            sense_distance: 3.0,
            reach: 1.5,

            decay_rate: 0.05,
            max_steps: 1000,
            seed: 42,

            foraging: ForagingParams::default(),
        }
    }
}

impl ArenaConfig {
    pub fn nest_point(&self) -> [f32; 2] {
        self.nest.unwrap_or([self.width * 0.5, self.height * 0.5])
    }

    pub fn validate(&self) -> SimResult<()> {
        let lengths = [
            self.width,
            self.height,
            self.resolution,
            self.step_length,
            self.sense_distance,
            self.reach,
        ];
        if lengths.iter().any(|v| !v.is_finite() || *v <= 0.0) {
            return Err(SimError::config(
                "arena size, resolution, step, sensing distance and reach must be positive",
            ));
        }
        if self.headings < 4 || self.headings % 2 != 0 {
            return Err(SimError::config(format!(
                "headings must be an even number of at least 4, got {}",
                self.headings
            )));
        }
        let cells = (self.width / self.resolution).ceil() as u64
            * (self.height / self.resolution).ceil() as u64;
        let [nx, ny] = self.nest_point();
        if !(0.0..=self.width).contains(&nx) || !(0.0..=self.height).contains(&ny) {
            return Err(SimError::config("nest lies outside the arena"));
        }
        if self.obstacles.iter().any(|r| r.contains([nx, ny].into())) {
            return Err(SimError::config("nest lies inside an obstacle"));
        }
        validate_run(
            self.decay_rate,
            self.agents,
            self.max_steps,
            &self.foraging,
            cells,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(SimConfig::default().validate().is_ok());
        assert!(ArenaConfig::default().validate().is_ok());
    }

    #[test]
    fn nest_defaults_to_centre() {
        let config = SimConfig {
            extent: [10, 10, 7],
            ..SimConfig::default()
        };
        assert_eq!(config.nest_position(), GridPos::new(5, 5, 0));

        let config = SimConfig {
            extent: [10, 10, 7],
            dimensions: 3,
            ..SimConfig::default()
        };
        assert_eq!(config.nest_position(), GridPos::new(5, 5, 3));
    }

    #[test]
    fn rejects_overfull_grid() {
        let config = SimConfig {
            extent: [3, 3, 1],
            food_count: 4,
            obstacle_count: 5,
            ..SimConfig::default()
        };
        assert!(matches!(config.validate(), Err(SimError::Configuration(_))));

        let fits = SimConfig {
            obstacle_count: 4,
            ..config
        };
        assert!(fits.validate().is_ok());
    }

    #[test]
    fn rejects_bad_extent_and_rates() {
        let zero_axis = SimConfig {
            extent: [10, 0, 1],
            food_count: 0,
            obstacle_count: 0,
            ..SimConfig::default()
        };
        assert!(zero_axis.validate().is_err());

        let bad_decay = SimConfig {
            decay_rate: 1.0,
            ..SimConfig::default()
        };
        assert!(bad_decay.validate().is_err());

        let mut flat_deposits = SimConfig::default();
        flat_deposits.foraging.carry_deposit = flat_deposits.foraging.search_deposit;
        assert!(flat_deposits.validate().is_err());

        let four_d = SimConfig {
            dimensions: 4,
            ..SimConfig::default()
        };
        assert!(four_d.validate().is_err());
    }

    #[test]
    fn population_and_memory_are_bounded_by_the_grid() {
        let mut huge_memory = SimConfig::default();
        huge_memory.foraging.memory = usize::MAX / 4;
        assert!(matches!(huge_memory.validate(), Err(SimError::Configuration(_))));

        let crowded = SimConfig {
            extent: [4, 4, 1],
            food_count: 0,
            obstacle_count: 0,
            agents: 17,
            ..SimConfig::default()
        };
        assert!(crowded.validate().is_err());
        assert!(SimConfig { agents: 16, ..crowded }.validate().is_ok());

        let mut arena = ArenaConfig::default();
        arena.foraging.memory = 2501;
        assert!(arena.validate().is_err());
        arena.foraging.memory = 2500;
        assert!(arena.validate().is_ok());
    }

    #[test]
    fn config_reads_partial_json() {
        let json = r#"{ "extent": [12, 8, 1], "seed": 7, "foraging": { "memory": 3 } }"#;
        let config: SimConfig = serde_json::from_str(json).expect("parse");
        assert_eq!(config.extent, [12, 8, 1]);
        assert_eq!(config.seed, 7);
        assert_eq!(config.foraging.memory, 3);
        assert_eq!(config.foraging.carry_deposit, 1.0);
        assert_eq!(config.food_count, SimConfig::default().food_count);
    }
}
