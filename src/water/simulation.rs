//! Shallow-water flow over a height field, explicit pipe model.
//!
//! Every step runs these passes in order, each one data-parallel over rows:
//! 1. rain
//! 2. evaporation
//! 3. outflow update, scaled down so no cell drains more than it holds
//! 4. water height update from inflow minus outflow
//! 5. water and outflow removed on the terrain borders

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::terrain::HeightField;

/// Simulation knobs, snapshot of the viewer parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaterParameters {
    pub time_step: f32,
    /// Steps performed by each [`WaterSimulation::compute_iteration`] call
    pub iterations_per_frame: u32,
    /// Reflect water on the borders instead of draining it. Not supported yet:
    /// borders always drain.
    pub bounce_on_borders: bool,
    pub initial_water_level: f32,
    pub rain_rate: f32,
    pub evaporation_rate: f32,
}

impl Default for WaterParameters {
    fn default() -> Self {
        Self {
            time_step: 0.001,
            iterations_per_frame: 1,
            bounce_on_borders: false,
            initial_water_level: 0.0,
            rain_rate: 0.0,
            evaporation_rate: 1e-4,
        }
    }
}

/// Water flux leaving a cell toward each of its four neighbours.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct OutFlow {
    /// Toward column - 1
    pub left: f32,
    /// Toward column + 1
    pub right: f32,
    /// Toward row - 1
    pub top: f32,
    /// Toward row + 1
    pub bottom: f32,
}

impl OutFlow {
    pub const ZERO: Self = Self {
        left: 0.0,
        right: 0.0,
        top: 0.0,
        bottom: 0.0,
    };

    pub fn total(&self) -> f32 {
        self.left + self.right + self.top + self.bottom
    }

    pub fn as_array(&self) -> [f32; 4] {
        [self.left, self.right, self.top, self.bottom]
    }

    fn scaled(self, k: f32) -> Self {
        Self {
            left: self.left * k,
            right: self.right * k,
            top: self.top * k,
            bottom: self.bottom * k,
        }
    }
}

/// Clamped neighbour indices of a cell.
#[derive(Debug, Clone, Copy)]
struct Neighbours {
    here: usize,
    left: usize,
    right: usize,
    top: usize,
    bottom: usize,
}

impl Neighbours {
    #[inline]
    fn of(terrain: &HeightField, i: usize, j: usize) -> Self {
        let (i, j) = (i as isize, j as isize);
        Self {
            here: terrain.clamped_cell_index(i, j),
            left: terrain.clamped_cell_index(i, j - 1),
            right: terrain.clamped_cell_index(i, j + 1),
            top: terrain.clamped_cell_index(i - 1, j),
            bottom: terrain.clamped_cell_index(i + 1, j),
        }
    }

    /// Flux entering `here` from its four neighbours.
    #[inline]
    fn inflow(&self, out_flow: &[OutFlow]) -> f32 {
        out_flow[self.right].left
            + out_flow[self.left].right
            + out_flow[self.bottom].top
            + out_flow[self.top].bottom
    }
}

/// Water height and outflow state evolving over a terrain.
#[derive(Debug, Clone, Default)]
pub struct WaterSimulation {
    running: bool,
    parameters: WaterParameters,
    terrain: Option<Arc<HeightField>>,
    water: Vec<f32>,
    out_flow: Vec<OutFlow>,
    net_flow: Vec<f32>,
}

impl WaterSimulation {
    pub fn new(parameters: WaterParameters) -> Self {
        let mut simulation = Self::default();
        simulation.set_parameters(parameters);
        simulation
    }

    /// Resets the simulation on `terrain`: every cell holds `initial_water_level`
    /// and no water flows.
    ///
    /// # Panics
    /// When the terrain is empty or the water level is negative.
    pub fn init(&mut self, terrain: Arc<HeightField>, initial_water_level: f32) {
        assert!(!terrain.is_empty(), "water simulation needs a non-empty terrain");
        assert!(
            initial_water_level >= 0.0,
            "initial water level {initial_water_level} is negative"
        );

        let cells = terrain.len();
        self.water.clear();
        self.water.resize(cells, initial_water_level);
        self.out_flow.clear();
        self.out_flow.resize(cells, OutFlow::ZERO);
        self.net_flow.clear();
        self.net_flow.resize(cells, 0.0);
        self.parameters.initial_water_level = initial_water_level;

        log::info!(
            "water simulation initialised on {}x{} terrain, water level {}",
            terrain.resolution_width(),
            terrain.resolution_height(),
            initial_water_level
        );
        self.terrain = Some(terrain);
    }

    /// Replaces the simulation knobs without touching the current state.
    ///
    /// # Panics
    /// When the time step is not a positive finite number or a rate is negative.
    pub fn set_parameters(&mut self, parameters: WaterParameters) {
        assert!(
            parameters.time_step.is_finite() && parameters.time_step > 0.0,
            "time step {} must be positive",
            parameters.time_step
        );
        assert!(
            parameters.rain_rate >= 0.0 && parameters.evaporation_rate >= 0.0,
            "rain and evaporation rates must not be negative"
        );
        if parameters.bounce_on_borders && !self.parameters.bounce_on_borders {
            log::warn!("bounce on borders is not supported, water drains through the borders");
        }
        self.parameters = parameters;
    }

    pub fn parameters(&self) -> &WaterParameters {
        &self.parameters
    }

    pub fn start(&mut self) {
        log::debug!("water simulation started");
        self.running = true;
    }

    pub fn stop(&mut self) {
        log::debug!("water simulation stopped");
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn terrain(&self) -> Option<&Arc<HeightField>> {
        self.terrain.as_ref()
    }

    /// Water height of every cell, row-major.
    pub fn water_map(&self) -> &[f32] {
        &self.water
    }

    /// Outflow of every cell, row-major.
    pub fn out_flow(&self) -> &[OutFlow] {
        &self.out_flow
    }

    /// Outflow as RGBA32F texels (left, right, top, bottom).
    pub fn out_flow_texels(&self) -> &[u8] {
        bytemuck::cast_slice(&self.out_flow)
    }

    /// Total water volume over the terrain.
    pub fn water_volume(&self) -> f32 {
        match &self.terrain {
            Some(terrain) => {
                let cell_area = terrain.cell_width() * terrain.cell_height();
                self.water.par_iter().sum::<f32>() * cell_area
            }
            None => 0.0,
        }
    }

    /// Runs `iterations_per_frame` steps while the simulation is running.
    pub fn compute_iteration(&mut self) {
        if !self.running {
            return;
        }
        for _ in 0..self.parameters.iterations_per_frame {
            self.step();
        }
    }

    /// Runs a single step, whether the simulation is running or not.
    /// Does nothing before [`init`](Self::init).
    pub fn step(&mut self) {
        let Some(terrain) = self.terrain.clone() else {
            log::debug!("water simulation step skipped, no terrain");
            return;
        };
        let dt = self.parameters.time_step;

        rain(&mut self.water, self.parameters.rain_rate, dt);
        evaporate(&mut self.water, self.parameters.evaporation_rate, dt);
        update_out_flow(&terrain, dt, &self.water, &mut self.out_flow);
        update_water(
            &terrain,
            dt,
            &self.out_flow,
            &mut self.water,
            &mut self.net_flow,
        );
        drain_borders(&terrain, &mut self.water, &mut self.out_flow);
    }

    /// Net flux `inflow - outflow` of every cell applied by the last step,
    /// taken before the borders drain. Zero right after [`init`](Self::init).
    pub fn net_flow(&self) -> &[f32] {
        &self.net_flow
    }
}

fn rain(water: &mut [f32], rain_rate: f32, dt: f32) {
    water.par_iter_mut().for_each(|w| *w += rain_rate * dt);
}

fn evaporate(water: &mut [f32], evaporation_rate: f32, dt: f32) {
    water
        .par_iter_mut()
        .for_each(|w| *w = (*w - evaporation_rate * dt).max(0.0));
}

/// Scales `flow` so that `total * dt` never exceeds the water held by the cell.
pub(crate) fn limit_out_flow(flow: OutFlow, water: f32, cell_area: f32, dt: f32) -> OutFlow {
    let total = flow.total();
    if total <= 0.0 {
        return OutFlow::ZERO;
    }

    let available = water * cell_area;
    let demand = total * dt;
    if demand > available {
        flow.scaled((available / demand).clamp(0.0, 1.0))
    } else {
        flow
    }
}

fn update_out_flow(terrain: &HeightField, dt: f32, water: &[f32], out_flow: &mut [OutFlow]) {
    let width = terrain.resolution_width();
    let cell_width = terrain.cell_width();
    let cell_height = terrain.cell_height();
    let cell_area = cell_width * cell_height;
    let altitude = terrain.data();
    let surface = |index: usize| altitude[index] + water[index];

    out_flow
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(i, row)| {
            for (j, flow) in row.iter_mut().enumerate() {
                let cell = Neighbours::of(terrain, i, j);
                let here = surface(cell.here);

                let candidate = OutFlow {
                    left: (flow.left + dt * (here - surface(cell.left)) / cell_width).max(0.0),
                    right: (flow.right + dt * (here - surface(cell.right)) / cell_width).max(0.0),
                    top: (flow.top + dt * (here - surface(cell.top)) / cell_height).max(0.0),
                    bottom: (flow.bottom + dt * (here - surface(cell.bottom)) / cell_height)
                        .max(0.0),
                };
                *flow = limit_out_flow(candidate, water[cell.here], cell_area, dt);
            }
        });
}

fn update_water(
    terrain: &HeightField,
    dt: f32,
    out_flow: &[OutFlow],
    water: &mut [f32],
    net_flow: &mut [f32],
) {
    let width = terrain.resolution_width();
    let cell_area = terrain.cell_width() * terrain.cell_height();

    water
        .par_chunks_mut(width)
        .zip(net_flow.par_chunks_mut(width))
        .enumerate()
        .for_each(|(i, (water_row, net_row))| {
            for (j, (w, net)) in water_row.iter_mut().zip(net_row.iter_mut()).enumerate() {
                let cell = Neighbours::of(terrain, i, j);
                *net = cell.inflow(out_flow) - out_flow[cell.here].total();
                *w = (*w + *net * dt / cell_area).max(0.0);
            }
        });
}

fn drain_borders(terrain: &HeightField, water: &mut [f32], out_flow: &mut [OutFlow]) {
    let width = terrain.resolution_width();
    let height = terrain.resolution_height();

    let mut clear = |index: usize| {
        water[index] = 0.0;
        out_flow[index] = OutFlow::ZERO;
    };
    for i in 0..height {
        clear(terrain.cell_index(i, 0));
        clear(terrain.cell_index(i, width - 1));
    }
    for j in 0..width {
        clear(terrain.cell_index(0, j));
        clear(terrain.cell_index(height - 1, j));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terrain(columns: usize, rows: usize, data: Vec<f32>) -> Arc<HeightField> {
        Arc::new(
            HeightField::from_samples(columns as f32, rows as f32, 100.0, columns, rows, data)
                .unwrap(),
        )
    }

    fn hills(columns: usize, rows: usize) -> Arc<HeightField> {
        let data = (0..rows * columns)
            .map(|index| {
                let (i, j) = ((index / columns) as f32, (index % columns) as f32);
                2.0 + (i * 0.9).sin() + (j * 0.6).cos()
            })
            .collect();
        terrain(columns, rows, data)
    }

    fn still_water() -> WaterParameters {
        WaterParameters {
            time_step: 0.1,
            rain_rate: 0.0,
            evaporation_rate: 0.0,
            ..Default::default()
        }
    }

    fn is_border(terrain: &HeightField, index: usize) -> bool {
        let (i, j) = (index / terrain.resolution_width(), index % terrain.resolution_width());
        i == 0 || j == 0 || i + 1 == terrain.resolution_height() || j + 1 == terrain.resolution_width()
    }

    #[test]
    fn corner_neighbours_clamp_to_the_cell() {
        let field = hills(4, 3);
        let corner = Neighbours::of(&field, 0, 0);
        assert_eq!((corner.here, corner.left, corner.top), (0, 0, 0));
        assert_eq!((corner.right, corner.bottom), (1, 4));

        let opposite = Neighbours::of(&field, 2, 3);
        assert_eq!(opposite.here, 11);
        assert_eq!((opposite.right, opposite.bottom), (11, 11));
        assert_eq!((opposite.left, opposite.top), (10, 7));
    }

    #[test]
    fn flat_terrain_does_not_flow() {
        let field = terrain(4, 4, vec![0.0; 16]);
        let mut simulation = WaterSimulation::new(still_water());
        simulation.init(field.clone(), 1.0);
        simulation.step();

        assert!(simulation.out_flow().iter().all(|f| *f == OutFlow::ZERO));
        for (index, &w) in simulation.water_map().iter().enumerate() {
            if is_border(&field, index) {
                assert_eq!(w, 0.0);
            } else {
                assert_eq!(w, 1.0);
            }
        }
    }

    #[test]
    fn water_runs_off_a_peak() {
        let mut data = vec![0.0; 9];
        data[4] = 1.0;
        let field = terrain(3, 3, data);
        let mut simulation = WaterSimulation::new(still_water());
        simulation.init(field, 1.0);
        simulation.step();

        let center = simulation.out_flow()[4];
        for flow in center.as_array() {
            assert!(flow > 0.0);
        }
        let toward_center: f32 = simulation.out_flow()[1].bottom
            + simulation.out_flow()[3].right
            + simulation.out_flow()[5].left
            + simulation.out_flow()[7].top;
        assert!(toward_center >= 0.0);
        assert!(center.total() > toward_center);
        assert!(simulation.water_map()[4] < 1.0);
    }

    #[test]
    fn stopped_simulation_does_not_step() {
        let mut simulation = WaterSimulation::new(WaterParameters {
            rain_rate: 1.0,
            ..still_water()
        });
        simulation.init(hills(6, 6), 0.5);
        let before = simulation.water_map().to_vec();

        simulation.compute_iteration();
        assert_eq!(simulation.water_map(), before.as_slice());

        simulation.start();
        simulation.compute_iteration();
        assert_ne!(simulation.water_map(), before.as_slice());

        simulation.stop();
        let paused = simulation.water_map().to_vec();
        simulation.compute_iteration();
        assert_eq!(simulation.water_map(), paused.as_slice());
    }

    #[test]
    fn compute_iteration_runs_every_pass_of_the_frame() {
        let parameters = WaterParameters {
            iterations_per_frame: 5,
            rain_rate: 0.3,
            ..still_water()
        };
        let mut framed = WaterSimulation::new(parameters);
        framed.init(hills(7, 5), 0.2);
        let mut stepped = framed.clone();

        framed.start();
        framed.compute_iteration();
        for _ in 0..5 {
            stepped.step();
        }
        assert_eq!(framed.water_map(), stepped.water_map());
        assert_eq!(framed.out_flow(), stepped.out_flow());
    }

    #[test]
    fn state_stays_non_negative_and_borders_drained() {
        let field = hills(12, 9);
        let mut simulation = WaterSimulation::new(WaterParameters {
            time_step: 0.05,
            rain_rate: 0.2,
            evaporation_rate: 0.05,
            ..Default::default()
        });
        simulation.init(field.clone(), 0.3);

        for _ in 0..200 {
            simulation.step();
            assert!(simulation.water_map().iter().all(|&w| w >= 0.0));
            for (index, flow) in simulation.out_flow().iter().enumerate() {
                assert!(flow.as_array().iter().all(|&f| f >= 0.0));
                if is_border(&field, index) {
                    assert_eq!(*flow, OutFlow::ZERO);
                    assert_eq!(simulation.water_map()[index], 0.0);
                }
            }
        }
    }

    #[test]
    fn evaporation_never_goes_negative() {
        let mut simulation = WaterSimulation::new(WaterParameters {
            evaporation_rate: 10.0,
            ..still_water()
        });
        simulation.init(terrain(5, 5, vec![0.0; 25]), 0.1);
        simulation.step();
        assert!(simulation.water_map().iter().all(|&w| w == 0.0));
    }

    #[test]
    fn outflow_is_limited_by_available_water() {
        let flow = OutFlow {
            left: 3.0,
            right: 1.0,
            top: 0.5,
            bottom: 0.5,
        };
        let (water, cell_area, dt) = (0.2, 0.5, 0.1);
        let limited = limit_out_flow(flow, water, cell_area, dt);

        assert!(limited.total() * dt <= water * cell_area * (1.0 + 1e-6));
        // proportions are kept
        assert!((limited.left / limited.right - 3.0).abs() < 1e-5);

        let small = OutFlow {
            left: 0.1,
            ..OutFlow::ZERO
        };
        assert_eq!(limit_out_flow(small, 1.0, 1.0, 0.1), small);
        assert_eq!(limit_out_flow(OutFlow::ZERO, 0.0, 1.0, 0.1), OutFlow::ZERO);
        assert_eq!(limit_out_flow(flow, 0.0, 1.0, 0.1), OutFlow::ZERO);
    }

    #[test]
    fn reinit_restores_the_initial_state() {
        let field = hills(8, 8);
        let mut simulation = WaterSimulation::new(WaterParameters {
            rain_rate: 0.5,
            ..still_water()
        });

        for _ in 0..2 {
            simulation.init(field.clone(), 0.75);
            for (index, &w) in simulation.water_map().iter().enumerate() {
                if !is_border(&field, index) {
                    assert_eq!(w, 0.75);
                }
            }
            assert!(simulation.out_flow().iter().all(|f| *f == OutFlow::ZERO));
            for _ in 0..10 {
                simulation.step();
            }
        }
    }

    #[test]
    fn step_before_init_is_a_no_op() {
        let mut simulation = WaterSimulation::default();
        simulation.step();
        assert!(simulation.water_map().is_empty());
        assert!(simulation.net_flow().is_empty());
        assert_eq!(simulation.water_volume(), 0.0);
    }

    #[test]
    #[should_panic]
    fn empty_terrain_is_rejected() {
        let mut simulation = WaterSimulation::default();
        simulation.init(Arc::new(HeightField::new(0.0, 0.0, 0.0)), 0.0);
    }

    #[test]
    #[should_panic]
    fn zero_time_step_is_rejected() {
        WaterSimulation::new(WaterParameters {
            time_step: 0.0,
            ..Default::default()
        });
    }

    #[test]
    fn bounce_flag_is_kept_but_borders_still_drain() {
        let field = hills(5, 5);
        let mut simulation = WaterSimulation::new(WaterParameters {
            bounce_on_borders: true,
            ..still_water()
        });
        assert!(simulation.parameters().bounce_on_borders);
        simulation.init(field.clone(), 1.0);
        simulation.step();
        for index in (0..field.len()).filter(|&index| is_border(&field, index)) {
            assert_eq!(simulation.water_map()[index], 0.0);
        }
    }

    #[test]
    fn out_flow_texels_are_rgba32f() {
        let mut simulation = WaterSimulation::new(still_water());
        simulation.init(hills(4, 3), 1.0);
        assert_eq!(simulation.out_flow_texels().len(), 12 * 16);
    }

    #[test]
    fn net_flow_counts_inflow_from_the_borders() {
        // bowl: borders are the highest cells and feed the interior
        let data = (0..36)
            .map(|index| {
                let (i, j) = ((index / 6) as f32, (index % 6) as f32);
                ((i - 2.5).powi(2) + (j - 2.5).powi(2)).sqrt()
            })
            .collect();
        let field = terrain(6, 6, data);
        let parameters = WaterParameters {
            rain_rate: 1.0,
            ..still_water()
        };
        let mut simulation = WaterSimulation::new(parameters);
        simulation.init(field.clone(), 1.0);
        assert!(simulation.net_flow().iter().all(|&v| v == 0.0));

        let before = simulation.water_map().to_vec();
        simulation.step();

        let dt = parameters.time_step;
        let rained = parameters.rain_rate * dt;
        let cell_area = field.cell_width() * field.cell_height();
        for index in (0..field.len()).filter(|&index| !is_border(&field, index)) {
            let applied = (simulation.water_map()[index] - before[index] - rained) * cell_area / dt;
            let reported = simulation.net_flow()[index];
            assert!(
                (applied - reported).abs() < 1e-3,
                "cell {index}: applied {applied} reported {reported}"
            );
        }
        // next to the border the inflow comes from drained cells
        assert!(simulation.net_flow()[field.cell_index(1, 2)] > 0.0);
    }
}
