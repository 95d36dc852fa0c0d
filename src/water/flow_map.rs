//! Drainage view: net flow averaged over a short simulation run.

use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::simulation::{WaterParameters, WaterSimulation};
use crate::lighting::remap_to_unit;
use crate::terrain::HeightField;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowMapSettings {
    pub initial_water_level: f32,
    pub rain_rate: f32,
    pub time_step: f32,
    pub iterations: u32,
}

impl Default for FlowMapSettings {
    fn default() -> Self {
        Self {
            initial_water_level: 0.01,
            rain_rate: 0.001,
            time_step: 0.2,
            iterations: 128,
        }
    }
}

/// Runs a fresh simulation on `terrain` and returns the mean net flow of every
/// cell remapped to `[0, 1]`. Constant results are left unmapped.
pub fn compute_flow_map(terrain: Arc<HeightField>, settings: &FlowMapSettings) -> Vec<f32> {
    let mut average = mean_net_flow(terrain, settings);
    if !remap_to_unit(&mut average) {
        log::debug!("flow map is constant, left unmapped");
    }
    average
}

/// Net flow of every cell averaged over `settings.iterations` steps.
fn mean_net_flow(terrain: Arc<HeightField>, settings: &FlowMapSettings) -> Vec<f32> {
    let mut simulation = WaterSimulation::new(WaterParameters {
        time_step: settings.time_step,
        iterations_per_frame: 1,
        bounce_on_borders: false,
        initial_water_level: settings.initial_water_level,
        rain_rate: settings.rain_rate,
        evaporation_rate: 0.0,
    });
    let cells = terrain.len();
    simulation.init(terrain, settings.initial_water_level);

    let mut average = vec![0.0f32; cells];
    if settings.iterations == 0 {
        return average;
    }

    let weight = 1.0 / settings.iterations as f32;
    for _ in 0..settings.iterations {
        simulation.step();
        average
            .par_iter_mut()
            .zip(simulation.net_flow().par_iter())
            .for_each(|(mean, &net)| *mean += net * weight);
    }
    average
}
