use serde::{Deserialize, Serialize};

use crate::parameters::Palette;

/// Gradient stop: normalized altitude and its color
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorStop {
    /// Altitude over the maximum altitude, in [0.0, 1.0]
    pub altitude: f32,

    /// RGBA color, components in [0.0, 1.0]
    pub color: [f32; 4],
}

impl ColorStop {
    pub fn new(altitude: f32, color: [f32; 4]) -> Self {
        Self { altitude, color }
    }

    fn rgb8(altitude: f32, r: u8, g: u8, b: u8) -> Self {
        Self::new(
            altitude,
            [r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0, 1.0],
        )
    }
}

/// Maps normalized altitudes to colors by linear interpolation between stops
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeightColorMap {
    stops: Vec<ColorStop>,
}

impl HeightColorMap {
    /// Stops are sorted by altitude
    pub fn new(mut stops: Vec<ColorStop>) -> Self {
        stops.sort_by(|a, b| a.altitude.total_cmp(&b.altitude));
        Self { stops }
    }

    /// Digital elevation model colors, lowland green to snow white
    pub fn dem_screen() -> Self {
        Self::new(vec![
            ColorStop::rgb8(0.0, 0, 132, 53),
            ColorStop::rgb8(0.125, 51, 204, 0),
            ColorStop::rgb8(0.25, 244, 240, 113),
            ColorStop::rgb8(0.5, 244, 189, 69),
            ColorStop::rgb8(0.75, 153, 100, 43),
            ColorStop::rgb8(1.0, 255, 255, 255),
        ])
    }

    pub fn white() -> Self {
        Self::new(vec![ColorStop::new(0.0, [1.0; 4])])
    }

    pub fn grayscale() -> Self {
        Self::new(vec![
            ColorStop::new(0.0, [0.0, 0.0, 0.0, 1.0]),
            ColorStop::new(1.0, [1.0, 1.0, 1.0, 1.0]),
        ])
    }

    /// CPU color map of a palette. Texture and environment palettes are
    /// sampled by the renderer, so terrain stays white here.
    pub fn for_palette(palette: Palette) -> Self {
        match palette {
            Palette::DemScreen => Self::dem_screen(),
            Palette::White | Palette::Texture | Palette::Environment => Self::white(),
        }
    }

    /// Color at a normalized altitude, clamped to [0.0, 1.0]
    pub fn interpolate(&self, altitude: f32) -> [f32; 4] {
        let (first, last) = match (self.stops.first(), self.stops.last()) {
            (Some(first), Some(last)) => (first, last),
            // magenta marks a missing gradient
            _ => return [1.0, 0.0, 1.0, 1.0],
        };

        let altitude = altitude.clamp(0.0, 1.0);
        if altitude <= first.altitude {
            return first.color;
        }
        if altitude >= last.altitude {
            return last.color;
        }

        let upper = self.stops.partition_point(|stop| stop.altitude < altitude);
        let (low, high) = (&self.stops[upper - 1], &self.stops[upper]);
        let span = high.altitude - low.altitude;
        if span <= 0.0 {
            return high.color;
        }

        let t = (altitude - low.altitude) / span;
        std::array::from_fn(|c| low.color[c] + (high.color[c] - low.color[c]) * t)
    }

    pub fn stops(&self) -> &[ColorStop] {
        &self.stops
    }
}
