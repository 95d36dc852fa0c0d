//! Hydraulic water flow over height fields.

pub mod flow_map;
pub mod simulation;

pub use flow_map::{compute_flow_map, FlowMapSettings};
pub use simulation::{OutFlow, WaterParameters, WaterSimulation};
