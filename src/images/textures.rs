//! Pixel buffers handed to the renderer. Row-major, one texel per cell.

use bytemuck::{Pod, Zeroable};
use rayon::prelude::*;

use super::color_map::HeightColorMap;
use crate::parameters::Palette;
use crate::terrain::HeightField;

/// RGBA32F normal texel, `w` unused.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct NormalTexel {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

pub fn normal_texels(field: &HeightField) -> Vec<NormalTexel> {
    field
        .normals()
        .into_par_iter()
        .map(|[x, y, z]| NormalTexel { x, y, z, w: 0.0 })
        .collect()
}

/// Normals packed as `(n + 1) / 2` in RGBA8.
pub fn normal_map_rgba8(field: &HeightField) -> Vec<u8> {
    normal_texels(field)
        .par_iter()
        .flat_map_iter(|n| {
            [
                unit_to_u8((n.x + 1.0) * 0.5),
                unit_to_u8((n.y + 1.0) * 0.5),
                unit_to_u8((n.z + 1.0) * 0.5),
                255,
            ]
        })
        .collect()
}

/// Light values in `[0, 1]` as 8-bit gray.
pub fn light_map_gray8(light: &[f32]) -> Vec<u8> {
    light.par_iter().map(|&v| unit_to_u8(v)).collect()
}

/// Terrain colored by altitude with `palette` and darkened by `light`.
///
/// # Panics
/// When `light` does not have one value per cell.
pub fn dem_rgba8(field: &HeightField, light: &[f32], palette: Palette) -> Vec<u8> {
    assert_eq!(light.len(), field.len(), "light map computed for another terrain");

    let color_map = HeightColorMap::for_palette(palette);
    let max_altitude = field.max_altitude();
    field
        .data()
        .par_iter()
        .zip(light.par_iter())
        .flat_map_iter(|(&altitude, &light)| {
            let normalized = if max_altitude > 0.0 {
                altitude / max_altitude
            } else {
                0.0
            };
            let [r, g, b, a] = color_map.interpolate(normalized);
            [
                unit_to_u8(r * light),
                unit_to_u8(g * light),
                unit_to_u8(b * light),
                unit_to_u8(a),
            ]
        })
        .collect()
}

#[inline]
fn unit_to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}
