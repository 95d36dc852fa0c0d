//! Light maps composited from horizon angles.

use std::f32::consts::{FRAC_PI_2, PI};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::horizon::{HorizonAngleGrid, DIRECTIONS, DIRECTION_COUNT};
use crate::terrain::HeightField;

/// Terrain shading models.
///
/// `Normal` and `Slope` are evaluated by the renderer; their light map is a
/// constant 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Shading {
    Normal,
    /// Fraction of the sky hemisphere left visible, remapped to `[0, 1]`.
    #[default]
    UniformLightBasic,
    /// Lambertian surface lit by a uniform sky.
    UniformLight,
    /// Lambertian surface lit from a single azimuth.
    DirectionalLight,
    Slope,
}

/// Direction index used by [`Shading::DirectionalLight`] unless overridden.
pub const DEFAULT_SUN_DIRECTION: usize = 0;

const DIRECTIONAL_INTENSITY: f32 = 8.0;

/// Light value of every cell, row-major.
pub fn compute_light_map(
    field: &HeightField,
    horizons: &HorizonAngleGrid,
    shading: Shading,
) -> Vec<f32> {
    compute_light_map_with_sun(field, horizons, shading, DEFAULT_SUN_DIRECTION)
}

/// Same as [`compute_light_map`] with an explicit sun direction index into
/// [`DIRECTIONS`] for directional lighting.
///
/// # Panics
/// When the horizon grid does not match the terrain or `sun_direction` is not
/// a valid direction index.
pub fn compute_light_map_with_sun(
    field: &HeightField,
    horizons: &HorizonAngleGrid,
    shading: Shading,
    sun_direction: usize,
) -> Vec<f32> {
    assert_eq!(
        horizons.len(),
        field.len(),
        "horizon angles computed for another terrain"
    );

    match shading {
        Shading::Normal | Shading::Slope => vec![1.0; field.len()],
        Shading::UniformLightBasic => {
            let mut light = sky_visibility(horizons);
            remap_to_unit(&mut light);
            light
        }
        Shading::UniformLight => lambertian(field, horizons, &[true; DIRECTION_COUNT], 1.0),
        Shading::DirectionalLight => {
            assert!(
                sun_direction < DIRECTION_COUNT,
                "sun direction {sun_direction} out of range"
            );
            let mut enabled = [false; DIRECTION_COUNT];
            enabled[sun_direction] = true;
            lambertian(field, horizons, &enabled, DIRECTIONAL_INTENSITY)
        }
    }
}

/// Mean horizon angle over `π/2`: the visible part of the hemisphere,
/// ignoring the surface orientation.
fn sky_visibility(horizons: &HorizonAngleGrid) -> Vec<f32> {
    horizons
        .cells()
        .par_iter()
        .map(|cell| cell.angles.iter().sum::<f32>() / (DIRECTION_COUNT as f32 * FRAC_PI_2))
        .collect()
}

/// Hemispherical integral of a Lambertian BRDF against the visible sky,
/// discretized over the enabled azimuths.
fn lambertian(
    field: &HeightField,
    horizons: &HorizonAngleGrid,
    enabled: &[bool; DIRECTION_COUNT],
    intensity: f32,
) -> Vec<f32> {
    let directions = DIRECTION_COUNT as f32;
    let sector = (PI / directions).sin() / PI;

    // (cos, sin) of every azimuth, x along columns and y along rows
    let azimuths: Vec<(f32, f32)> = DIRECTIONS
        .iter()
        .map(|&(di, dj)| {
            let length = ((di * di + dj * dj) as f32).sqrt();
            (dj as f32 / length, di as f32 / length)
        })
        .collect();

    let width = field.resolution_width();
    horizons
        .cells()
        .par_iter()
        .enumerate()
        .map(|(index, cell)| {
            let normal = field.normal(index / width, index % width);
            let mut light = 0.0;
            for d in (0..DIRECTION_COUNT).filter(|&d| enabled[d]) {
                let (cosine, sine) = azimuths[d];
                let projected = normal[0] * cosine + normal[1] * sine;
                // keep dot(normal, sky direction) >= 0
                let theta = cell.angles[d].min(FRAC_PI_2 + projected.atan2(normal[2]));

                light += intensity * (normal[2] / directions) * theta.sin() * theta.sin();
                light += intensity * sector * (theta - 0.5 * (2.0 * theta).sin()) * projected;
            }
            light
        })
        .collect()
}

/// Linearly remaps `values` so their minimum becomes 0 and maximum 1.
///
/// Constant inputs are left untouched and `false` is returned.
pub fn remap_to_unit(values: &mut [f32]) -> bool {
    let min = values.iter().copied().fold(f32::INFINITY, f32::min);
    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let range = max - min;
    if range.is_nan() || range <= f32::EPSILON {
        return false;
    }
    values.par_iter_mut().for_each(|v| *v = (*v - min) / range);
    true
}
