//! Viewer parameters, shared by the renderer, the light map and the water
//! simulation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::lighting::{Shading, DIRECTION_COUNT};
use crate::water::WaterParameters;

/// Terrain coloring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Palette {
    Texture,
    White,
    #[default]
    DemScreen,
    Environment,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Parameters {
    pub palette: Palette,
    pub shading: Shading,
    pub wireframe: bool,
    /// Tessellation level of detail, screen pixels per triangle edge
    pub pixels_per_triangle_edge: u32,

    pub time_step: f32,
    pub iterations_per_frame: u32,
    pub bounce_on_borders: bool,
    pub initial_water_level: f32,
    pub rain_rate: f32,
    pub evaporation_rate: f32,

    /// Direction index lighting the terrain with [`Shading::DirectionalLight`]
    pub sun_direction: usize,
}

impl Default for Parameters {
    fn default() -> Self {
        let water = WaterParameters::default();
        Self {
            palette: Palette::default(),
            shading: Shading::default(),
            wireframe: false,
            pixels_per_triangle_edge: 16,
            time_step: water.time_step,
            iterations_per_frame: water.iterations_per_frame,
            bounce_on_borders: water.bounce_on_borders,
            initial_water_level: water.initial_water_level,
            rain_rate: water.rain_rate,
            evaporation_rate: water.evaporation_rate,
            sun_direction: 0,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse parameters: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("time step must be positive, got {0}")]
    TimeStep(f32),
    #[error("iterations per frame must be at least 1")]
    NoIterations,
    #[error("{name} must not be negative, got {value}")]
    Negative { name: &'static str, value: f32 },
    #[error("pixels per triangle edge must be at least 1")]
    LevelOfDetail,
    #[error("sun direction {0} is out of range 0..{}", DIRECTION_COUNT)]
    SunDirection(usize),
}

impl Parameters {
    /// Parses and validates parameters. Missing fields take their default.
    pub fn from_json(data: &str) -> Result<Self, ConfigError> {
        let parameters: Parameters = serde_json::from_str(data)?;
        parameters.validate()?;
        Ok(parameters)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.time_step.is_finite() && self.time_step > 0.0) {
            return Err(ConfigError::TimeStep(self.time_step));
        }
        if self.iterations_per_frame == 0 {
            return Err(ConfigError::NoIterations);
        }
        if self.pixels_per_triangle_edge == 0 {
            return Err(ConfigError::LevelOfDetail);
        }
        for (name, value) in [
            ("initial water level", self.initial_water_level),
            ("rain rate", self.rain_rate),
            ("evaporation rate", self.evaporation_rate),
        ] {
            if value.is_nan() || value < 0.0 {
                return Err(ConfigError::Negative { name, value });
            }
        }
        if self.sun_direction >= DIRECTION_COUNT {
            return Err(ConfigError::SunDirection(self.sun_direction));
        }
        Ok(())
    }

    /// Snapshot of the knobs read by the water simulation.
    pub fn water(&self) -> WaterParameters {
        WaterParameters {
            time_step: self.time_step,
            iterations_per_frame: self.iterations_per_frame,
            bounce_on_borders: self.bounce_on_borders,
            initial_water_level: self.initial_water_level,
            rain_rate: self.rain_rate,
            evaporation_rate: self.evaporation_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let parameters = Parameters::default();
        assert_eq!(parameters.palette, Palette::DemScreen);
        assert_eq!(parameters.shading, Shading::UniformLightBasic);
        assert!(!parameters.wireframe);
        assert_eq!(parameters.pixels_per_triangle_edge, 16);
        assert_eq!(parameters.time_step, 0.001);
        assert_eq!(parameters.iterations_per_frame, 1);
        assert_eq!(parameters.initial_water_level, 0.0);
        assert_eq!(parameters.rain_rate, 0.0);
        assert_eq!(parameters.evaporation_rate, 1e-4);
        assert!(parameters.validate().is_ok());
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let parameters =
            Parameters::from_json(r#"{ "shading": "DirectionalLight", "rain_rate": 0.5 }"#)
                .unwrap();
        assert_eq!(parameters.shading, Shading::DirectionalLight);
        assert_eq!(parameters.rain_rate, 0.5);
        assert_eq!(parameters.palette, Palette::DemScreen);
        assert_eq!(parameters.time_step, 0.001);
    }

    #[test]
    fn json_round_trip() {
        let parameters = Parameters {
            palette: Palette::White,
            wireframe: true,
            sun_direction: 5,
            ..Default::default()
        };
        let json = parameters.to_json().unwrap();
        assert_eq!(Parameters::from_json(&json).unwrap(), parameters);
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(
            Parameters::from_json("{ shading: "),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            Parameters::from_json(r#"{ "palette": "Rainbow" }"#),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        assert!(matches!(
            Parameters::from_json(r#"{ "time_step": 0.0 }"#),
            Err(ConfigError::TimeStep(_))
        ));
        assert!(matches!(
            Parameters::from_json(r#"{ "iterations_per_frame": 0 }"#),
            Err(ConfigError::NoIterations)
        ));
        assert!(matches!(
            Parameters::from_json(r#"{ "rain_rate": -1.0 }"#),
            Err(ConfigError::Negative { name: "rain rate", .. })
        ));
        assert!(matches!(
            Parameters::from_json(r#"{ "sun_direction": 16 }"#),
            Err(ConfigError::SunDirection(16))
        ));
        assert!(matches!(
            Parameters::from_json(r#"{ "pixels_per_triangle_edge": 0 }"#),
            Err(ConfigError::LevelOfDetail)
        ));
    }

    #[test]
    fn water_snapshot() {
        let parameters = Parameters {
            time_step: 0.02,
            iterations_per_frame: 4,
            bounce_on_borders: true,
            initial_water_level: 0.3,
            rain_rate: 0.1,
            evaporation_rate: 0.01,
            ..Default::default()
        };
        let water = parameters.water();
        assert_eq!(water.time_step, 0.02);
        assert_eq!(water.iterations_per_frame, 4);
        assert!(water.bounce_on_borders);
        assert_eq!(water.initial_water_level, 0.3);
        assert_eq!(water.rain_rate, 0.1);
        assert_eq!(water.evaporation_rate, 0.01);
    }
}
