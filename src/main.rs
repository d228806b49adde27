use std::fs;
use std::path::Path;
use std::time::Duration;

use antslam::{GridSimulation, LoopState, SimConfig};
use bevy::app::ScheduleRunnerPlugin;
use bevy::log::LogPlugin;
use bevy::prelude::*;

mod heatmap;
mod report;

use heatmap::Heatmap;
use report::{RunMetrics, RunReport};

const DEFAULT_CONFIG: &str = "antslam.json";
const REPORT_FILE: &str = "antslam_report.json";
const HEATMAP_FILE: &str = "antslam_heatmap.png";

#[derive(Resource)]
struct Colony(GridSimulation);

fn main() -> AppExit {
    let mut app = App::new();
    app.add_plugins((
        MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(Duration::ZERO)),
        LogPlugin::default(),
    ));

    let path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG.to_string());
    let config = load_config(Path::new(&path));
    let sim = match GridSimulation::create(config.clone()) {
        Ok(sim) => sim,
        Err(err) => {
            error!("cannot start simulation: {}", err);
            return AppExit::error();
        }
    };

    app.insert_resource(config)
        .insert_resource(Colony(sim))
        .insert_resource(RunMetrics::default())
        .add_systems(Update, (tick_system, metrics_system, finish_system).chain());
    app.run()
}

/// Reads the run configuration, falling back to defaults when the file is
/// missing or unreadable.
fn load_config(path: &Path) -> SimConfig {
    let json = match fs::read_to_string(path) {
        Ok(json) => json,
        Err(_) => {
            info!("no config at {}, using defaults", path.display());
            return SimConfig::default();
        }
    };
    match serde_json::from_str(&json) {
        Ok(config) => {
            info!("loaded config from {}", path.display());
            config
        }
        Err(err) => {
            warn!("ignoring malformed config {}: {}", path.display(), err);
            SimConfig::default()
        }
    }
}

fn tick_system(mut colony: ResMut<Colony>) {
    colony.0.step();
}

fn metrics_system(colony: Res<Colony>, mut metrics: ResMut<RunMetrics>) {
    metrics.record(&colony.0);
}

fn finish_system(
    colony: Res<Colony>,
    config: Res<SimConfig>,
    mut metrics: ResMut<RunMetrics>,
    mut exit: EventWriter<AppExit>,
) {
    let LoopState::Terminated(reason) = colony.0.state() else {
        return;
    };
    if metrics.finished {
        return;
    }
    metrics.finished = true;

    let report = RunReport::new(&colony.0, reason, config.seed, &metrics);
    match report.write(Path::new(REPORT_FILE)) {
        Ok(()) => info!("wrote run report to {}", REPORT_FILE),
        Err(err) => error!("failed to write {}: {}", REPORT_FILE, err),
    }

    match Heatmap::from_simulation(&colony.0) {
        Ok(map) => match map.save_png(Path::new(HEATMAP_FILE)) {
            Ok(()) => info!(
                "wrote {}x{} pheromone heatmap to {}",
                map.width(),
                map.height(),
                HEATMAP_FILE
            ),
            Err(err) => error!("failed to write {}: {}", HEATMAP_FILE, err),
        },
        Err(err) => error!("cannot render heatmap: {}", err),
    }

    exit.send(AppExit::Success);
}
