#![warn(clippy::all, rust_2018_idioms)]

pub mod images;
pub mod lighting;
pub mod parameters;
pub mod terrain;
pub mod water;

pub use lighting::{
    compute_horizon_angles, compute_horizon_angles_brute_force, compute_light_map,
    compute_light_map_with_sun, HorizonAngleGrid, HorizonAngles, Shading,
};
pub use parameters::{ConfigError, Palette, Parameters};
pub use terrain::{HeightField, LoadError, Raster};
pub use water::{compute_flow_map, FlowMapSettings, WaterParameters, WaterSimulation};
