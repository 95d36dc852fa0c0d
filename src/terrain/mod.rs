//! Height-field terrain: storage, raster loading and synthetic generation.

pub mod height_field;
pub mod noise;
pub mod raster;

pub use self::height_field::*;
pub use self::noise::*;
pub use self::raster::*;
