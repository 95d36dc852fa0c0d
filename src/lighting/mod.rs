//! Ambient occlusion and lighting derived from terrain horizons.
//!
//! ```text
//! HeightField ──► compute_horizon_angles() ──► HorizonAngleGrid
//!                                                   │
//!                          Shading ──► compute_light_map() ──► Vec<f32>
//! ```

pub mod horizon;
pub mod light_map;

pub use horizon::{
    compute_horizon_angles, compute_horizon_angles_brute_force, HorizonAngleGrid, HorizonAngles,
    DIRECTIONS, DIRECTION_COUNT,
};
pub use light_map::{
    compute_light_map, compute_light_map_with_sun, remap_to_unit, Shading, DEFAULT_SUN_DIRECTION,
};
