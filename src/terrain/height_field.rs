//! Regular grid of altitude samples with physical extents.

use rayon::prelude::*;

use super::noise::NoiseGenerator;
use super::raster::{LoadError, Raster};

/// Height field terrain.
///
/// Samples are stored row-major: row `i` runs along the height axis,
/// column `j` along the width axis.
#[derive(Debug, Clone, PartialEq)]
pub struct HeightField {
    width: f32,
    height: f32,
    max_altitude: f32,
    resolution_width: usize,
    resolution_height: usize,
    data: Vec<f32>,
}

impl HeightField {
    /// Empty terrain with physical dimensions but no samples.
    pub fn new(width: f32, height: f32, max_altitude: f32) -> Self {
        Self {
            width,
            height,
            max_altitude,
            resolution_width: 0,
            resolution_height: 0,
            data: Vec::new(),
        }
    }

    /// Builds a terrain from altitudes already expressed in `[0, max_altitude]`.
    pub fn from_samples(
        width: f32,
        height: f32,
        max_altitude: f32,
        resolution_width: usize,
        resolution_height: usize,
        data: Vec<f32>,
    ) -> Result<Self, LoadError> {
        check_extent(width, height, max_altitude)?;
        if data.is_empty() {
            return Err(LoadError::Empty);
        }
        if resolution_width < 2 || resolution_height < 2 {
            return Err(LoadError::Degenerate {
                columns: resolution_width,
                rows: resolution_height,
            });
        }
        let expected = resolution_width * resolution_height;
        if data.len() != expected {
            return Err(LoadError::SampleCount {
                expected,
                actual: data.len(),
            });
        }

        Ok(Self {
            width,
            height,
            max_altitude,
            resolution_width,
            resolution_height,
            data: data
                .into_iter()
                .map(|h| h.clamp(0.0, max_altitude))
                .collect(),
        })
    }

    /// Loads an 8 or 16-bit single-channel raster and scales it to `[0, max_altitude]`.
    pub fn load(
        raster: &Raster<'_>,
        width: f32,
        height: f32,
        max_altitude: f32,
    ) -> Result<Self, LoadError> {
        let loaded = check_extent(width, height, max_altitude)
            .and_then(|_| raster.normalized_samples())
            .map(|samples| Self {
                width,
                height,
                max_altitude,
                resolution_width: raster.columns,
                resolution_height: raster.rows,
                data: samples.into_iter().map(|v| v * max_altitude).collect(),
            });

        match &loaded {
            Ok(terrain) => log::info!(
                "loaded {}x{} terrain ({}-bit), extent {}x{}, max altitude {}",
                terrain.resolution_width,
                terrain.resolution_height,
                raster.bits_per_sample,
                width,
                height,
                max_altitude
            ),
            Err(err) => log::warn!("rejected terrain raster: {err}"),
        }
        loaded
    }

    /// Samples a noise generator on a `resolution_width x resolution_height` lattice.
    pub fn from_noise(
        width: f32,
        height: f32,
        max_altitude: f32,
        resolution_width: usize,
        resolution_height: usize,
        generator: &NoiseGenerator,
    ) -> Result<Self, LoadError> {
        let data: Vec<f32> = (0..resolution_width * resolution_height)
            .into_par_iter()
            .map(|index| {
                let i = index / resolution_width;
                let j = index % resolution_width;
                generator.generate(j as f32, i as f32) as f32 * max_altitude
            })
            .collect();

        Self::from_samples(
            width,
            height,
            max_altitude,
            resolution_width,
            resolution_height,
            data,
        )
    }

    /// True when the terrain holds no samples.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty() || self.width == 0.0 || self.height == 0.0
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn max_altitude(&self) -> f32 {
        self.max_altitude
    }

    pub fn resolution_width(&self) -> usize {
        self.resolution_width
    }

    pub fn resolution_height(&self) -> usize {
        self.resolution_height
    }

    /// Number of cells, `resolution_width * resolution_height`.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn cell_width(&self) -> f32 {
        self.width / self.resolution_width as f32
    }

    pub fn cell_height(&self) -> f32 {
        self.height / self.resolution_height as f32
    }

    /// Row-major index of cell `(i, j)`.
    #[inline]
    pub fn cell_index(&self, i: usize, j: usize) -> usize {
        i * self.resolution_width + j
    }

    /// Altitude at row `i`, column `j`.
    ///
    /// # Panics
    /// When `(i, j)` lies outside the grid.
    #[inline]
    pub fn sample(&self, i: usize, j: usize) -> f32 {
        assert!(
            i < self.resolution_height && j < self.resolution_width,
            "cell ({i}, {j}) outside {}x{} terrain",
            self.resolution_width,
            self.resolution_height
        );
        self.data[self.cell_index(i, j)]
    }

    /// Row-major index of the cell nearest to signed coordinates `(i, j)`.
    /// Neighbour lookups past a border land on the border cell itself.
    #[inline]
    pub fn clamped_cell_index(&self, i: isize, j: isize) -> usize {
        let i = i.clamp(0, self.resolution_height as isize - 1) as usize;
        let j = j.clamp(0, self.resolution_width as isize - 1) as usize;
        self.cell_index(i, j)
    }

    /// Altitude with signed coordinates clamped to the grid edges.
    #[inline]
    pub fn sample_clamped(&self, i: isize, j: isize) -> f32 {
        self.data[self.clamped_cell_index(i, j)]
    }

    /// 3D position of the vertex at `(i, j)`.
    pub fn vertex(&self, i: usize, j: usize) -> [f32; 3] {
        let x = self.width * j as f32 / (self.resolution_width - 1) as f32;
        let y = self.height * i as f32 / (self.resolution_height - 1) as f32;
        [x, y, self.sample(i, j)]
    }

    /// Unit surface normal at `(i, j)`.
    ///
    /// Border cells have no central difference and report a flat `(0, 0, 1)`.
    pub fn normal(&self, i: usize, j: usize) -> [f32; 3] {
        let rows = self.resolution_height;
        let columns = self.resolution_width;
        if i == 0 || j == 0 || i + 1 >= rows || j + 1 >= columns {
            return [0.0, 0.0, 1.0];
        }

        let step_width = self.width / (columns - 1) as f32;
        let step_height = self.height / (rows - 1) as f32;
        let dx = (self.sample(i, j + 1) - self.sample(i, j - 1)) / (2.0 * step_width);
        let dy = (self.sample(i + 1, j) - self.sample(i - 1, j)) / (2.0 * step_height);

        normalize([-dx, -dy, 1.0])
    }

    /// Normals of every cell, row-major.
    pub fn normals(&self) -> Vec<[f32; 3]> {
        (0..self.len())
            .into_par_iter()
            .map(|index| {
                self.normal(
                    index / self.resolution_width,
                    index % self.resolution_width,
                )
            })
            .collect()
    }

    /// Lowest and highest altitude in the terrain.
    pub fn altitude_range(&self) -> (f32, f32) {
        let min = self.data.iter().copied().fold(f32::INFINITY, f32::min);
        let max = self.data.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        (min, max)
    }
}

fn check_extent(width: f32, height: f32, max_altitude: f32) -> Result<(), LoadError> {
    let positive = |v: f32| v.is_finite() && v > 0.0;
    if positive(width) && positive(height) && positive(max_altitude) {
        Ok(())
    } else {
        Err(LoadError::InvalidExtent {
            width,
            height,
            max_altitude,
        })
    }
}

fn normalize(v: [f32; 3]) -> [f32; 3] {
    let length = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
    [v[0] / length, v[1] / length, v[2] / length]
}
