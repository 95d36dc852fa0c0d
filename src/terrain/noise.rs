use noise::{Fbm, MultiFractal, NoiseFn, Perlin};
use serde::{Deserialize, Serialize};

/// Configuration for synthetic height fields
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoiseConfig {
    /// Random seed for reproducible terrains
    pub seed: u32,

    /// Frequency in cycles per grid cell (higher = rougher terrain)
    /// Typical range: 0.005 - 0.05
    pub frequency: f64,

    /// Number of noise layers to combine
    pub octaves: usize,

    /// Amplitude decay between octaves
    pub persistence: f64,

    /// Frequency multiplier between octaves
    pub lacunarity: f64,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            frequency: 0.02,
            octaves: 5,
            persistence: 0.5,
            lacunarity: 2.0,
        }
    }
}

impl NoiseConfig {
    pub fn new(seed: u32, frequency: f64, octaves: usize, persistence: f64, lacunarity: f64) -> Self {
        Self {
            seed,
            frequency,
            octaves,
            persistence,
            lacunarity,
        }
    }

    /// Rolling hills with a random seed
    pub fn hills() -> Self {
        Self {
            seed: rand::random(),
            frequency: 0.01,
            octaves: 4,
            persistence: 0.45,
            lacunarity: 2.0,
        }
    }

    /// Rugged mountains with a random seed
    pub fn mountains() -> Self {
        Self {
            seed: rand::random(),
            frequency: 0.03,
            octaves: 7,
            persistence: 0.55,
            lacunarity: 2.2,
        }
    }
}

/// Fractional Brownian motion over Perlin noise
pub struct NoiseGenerator {
    fbm: Fbm<Perlin>,
    frequency: f64,
}

impl NoiseGenerator {
    pub fn new(config: NoiseConfig) -> Self {
        let fbm = Fbm::<Perlin>::new(config.seed)
            .set_octaves(config.octaves)
            .set_persistence(config.persistence)
            .set_lacunarity(config.lacunarity);

        Self {
            fbm,
            frequency: config.frequency,
        }
    }

    /// Noise value at grid coordinates, in range [0.0, 1.0]
    pub fn generate(&self, x: f32, y: f32) -> f64 {
        let nx = (x as f64) * self.frequency;
        let ny = (y as f64) * self.frequency;

        // fBm output is roughly [-1, 1]
        let raw_value = self.fbm.get([nx, ny]);

        ((raw_value + 1.0) * 0.5).clamp(0.0, 1.0)
    }
}
