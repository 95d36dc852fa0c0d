//! CPU-side images: palettes and texture buffers for the renderer.

pub mod color_map;
pub mod textures;

pub use color_map::{ColorStop, HeightColorMap};
pub use textures::{dem_rgba8, light_map_gray8, normal_map_rgba8, normal_texels, NormalTexel};
