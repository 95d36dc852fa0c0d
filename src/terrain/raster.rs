//! Single-channel raster samples handed over by an external image decoder.

use thiserror::Error;

/// Reasons a raster cannot become a [`HeightField`](super::HeightField).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LoadError {
    #[error("raster contains no samples")]
    Empty,
    #[error("unsupported channel count {0}, expected a single channel")]
    UnsupportedChannels(u8),
    #[error("unsupported sample depth of {0} bits, expected 8 or 16")]
    UnsupportedDepth(u8),
    #[error("raster of {columns}x{rows} is too small, at least 2x2 is required")]
    Degenerate { columns: usize, rows: usize },
    #[error("raster holds {actual} samples but {expected} were expected")]
    SampleCount { expected: usize, actual: usize },
    #[error("terrain extent {width}x{height} (max altitude {max_altitude}) is not positive")]
    InvalidExtent {
        width: f32,
        height: f32,
        max_altitude: f32,
    },
}

/// Borrowed view over decoded raster pixels.
///
/// `bytes` holds `columns * rows * channels` samples in row-major order.
/// 16-bit samples are stored in native byte order, which is what image
/// decoders hand out for `u16` buffers.
#[derive(Debug, Clone, Copy)]
pub struct Raster<'a> {
    pub columns: usize,
    pub rows: usize,
    pub channels: u8,
    pub bits_per_sample: u8,
    pub bytes: &'a [u8],
}

impl<'a> Raster<'a> {
    /// 8-bit grayscale raster.
    pub fn gray8(columns: usize, rows: usize, samples: &'a [u8]) -> Self {
        Self {
            columns,
            rows,
            channels: 1,
            bits_per_sample: 8,
            bytes: samples,
        }
    }

    /// 16-bit grayscale raster.
    pub fn gray16(columns: usize, rows: usize, samples: &'a [u16]) -> Self {
        Self {
            columns,
            rows,
            channels: 1,
            bits_per_sample: 16,
            bytes: bytemuck::cast_slice(samples),
        }
    }

    /// Checks the raster layout and returns every sample normalized to `[0, 1]`.
    pub fn normalized_samples(&self) -> Result<Vec<f32>, LoadError> {
        if self.bytes.is_empty() || self.columns == 0 || self.rows == 0 {
            return Err(LoadError::Empty);
        }
        if self.channels != 1 {
            return Err(LoadError::UnsupportedChannels(self.channels));
        }
        if self.bits_per_sample != 8 && self.bits_per_sample != 16 {
            return Err(LoadError::UnsupportedDepth(self.bits_per_sample));
        }
        if self.columns < 2 || self.rows < 2 {
            return Err(LoadError::Degenerate {
                columns: self.columns,
                rows: self.rows,
            });
        }

        let expected = self.columns * self.rows;
        let bytes_per_sample = usize::from(self.bits_per_sample / 8);
        let actual = self.bytes.len() / bytes_per_sample;
        if actual != expected || self.bytes.len() % bytes_per_sample != 0 {
            return Err(LoadError::SampleCount { expected, actual });
        }

        let samples = match self.bits_per_sample {
            8 => self
                .bytes
                .iter()
                .map(|&v| f32::from(v) / f32::from(u8::MAX))
                .collect(),
            _ => self
                .bytes
                .chunks_exact(2)
                .map(|pair| f32::from(u16::from_ne_bytes([pair[0], pair[1]])) / f32::from(u16::MAX))
                .collect(),
        };
        Ok(samples)
    }
}
