//! Horizon angles of a height field along 16 azimuthal directions.
//!
//! Two implementations share one contract:
//! - [`compute_horizon_angles_brute_force`] walks every cell to the grid edge,
//!   `O(N·L)` per direction. It only serves as a reference.
//! - [`compute_horizon_angles`] sweeps parallel lines across the grid and keeps
//!   an upper convex hull of the cells already crossed, `O(N)` per direction.
//!
//! References: Timonen & Westerholm, *Scalable Height Field Self-Shadowing*
//! (2010); Sean Barrett, *Fast horizon computation* (2011).

use std::f32::consts::FRAC_PI_2;
use std::time::Instant;

use rayon::prelude::*;

use crate::terrain::HeightField;

/// Number of azimuthal directions sampled per cell.
pub const DIRECTION_COUNT: usize = 16;

/// Azimuthal directions as `(row step, column step)`.
pub const DIRECTIONS: [(isize, isize); DIRECTION_COUNT] = [
    // 4-connected neighbourhood
    (1, 0),
    (0, 1),
    (-1, 0),
    (0, -1),
    // diagonals
    (1, 1),
    (-1, 1),
    (-1, -1),
    (1, -1),
    // knight moves
    (2, 1),
    (2, -1),
    (-2, 1),
    (-2, -1),
    (1, 2),
    (1, -2),
    (-1, 2),
    (-1, -2),
];

/// Horizon angles of one cell, measured from the zenith: `π/2` means an
/// unobstructed horizon, `0` a vertical wall.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HorizonAngles {
    pub angles: [f32; DIRECTION_COUNT],
}

impl Default for HorizonAngles {
    fn default() -> Self {
        Self {
            angles: [FRAC_PI_2; DIRECTION_COUNT],
        }
    }
}

/// Horizon angles of every cell of a terrain, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct HorizonAngleGrid {
    resolution_width: usize,
    resolution_height: usize,
    cells: Vec<HorizonAngles>,
}

impl HorizonAngleGrid {
    fn unobstructed(field: &HeightField) -> Self {
        Self {
            resolution_width: field.resolution_width(),
            resolution_height: field.resolution_height(),
            cells: vec![HorizonAngles::default(); field.len()],
        }
    }

    pub fn resolution_width(&self) -> usize {
        self.resolution_width
    }

    pub fn resolution_height(&self) -> usize {
        self.resolution_height
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cells(&self) -> &[HorizonAngles] {
        &self.cells
    }

    /// Angles of cell `(i, j)`.
    ///
    /// # Panics
    /// When `(i, j)` lies outside the grid.
    pub fn get(&self, i: usize, j: usize) -> &HorizonAngles {
        assert!(
            i < self.resolution_height && j < self.resolution_width,
            "cell ({i}, {j}) outside {}x{} horizon grid",
            self.resolution_width,
            self.resolution_height
        );
        &self.cells[i * self.resolution_width + j]
    }
}

/// Tangent of the elevation from `(i1, j1)` at altitude `h1` to `(i2, j2)` at `h2`.
#[inline]
pub fn horizon_slope(
    (i1, j1, h1): (isize, isize, f32),
    (i2, j2, h2): (isize, isize, f32),
    cell_width: f32,
    cell_height: f32,
) -> f32 {
    let di = (i2 - i1) as f32 * cell_height;
    let dj = (j2 - j1) as f32 * cell_width;
    (h2 - h1) / (di * di + dj * dj).sqrt()
}

/// Converts a horizon tangent to an angle from the zenith.
///
/// Points below the horizontal never shade, so negative tangents count as 0.
#[inline]
fn tangent_to_angle(tangent: f32) -> f32 {
    FRAC_PI_2 - tangent.max(0.0).atan()
}

fn horizon_angle_brute_force(field: &HeightField, i: usize, j: usize, (di, dj): (isize, isize)) -> f32 {
    let rows = field.resolution_height() as isize;
    let columns = field.resolution_width() as isize;
    let (cw, ch) = (field.cell_width(), field.cell_height());
    let here = (i as isize, j as isize, field.sample(i, j));

    let mut horizon = 0.0f32;
    let (mut k, mut l) = (here.0 + di, here.1 + dj);
    while (0..rows).contains(&k) && (0..columns).contains(&l) {
        let there = (k, l, field.sample(k as usize, l as usize));
        horizon = horizon.max(horizon_slope(here, there, cw, ch));
        k += di;
        l += dj;
    }

    tangent_to_angle(horizon)
}

/// Reference implementation, walking every direction from every cell.
pub fn compute_horizon_angles_brute_force(field: &HeightField) -> HorizonAngleGrid {
    let mut grid = HorizonAngleGrid::unobstructed(field);
    if field.is_empty() {
        return grid;
    }

    let started = Instant::now();
    let width = field.resolution_width();
    grid.cells
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(i, row)| {
            for (j, cell) in row.iter_mut().enumerate() {
                for (d, &direction) in DIRECTIONS.iter().enumerate() {
                    cell.angles[d] = horizon_angle_brute_force(field, i, j, direction);
                }
            }
        });

    log::debug!(
        "brute-force horizon scan of {}x{} terrain took {:?}",
        width,
        field.resolution_height(),
        started.elapsed()
    );
    grid
}

/// Start points of every sweep line advancing by `(step_i, step_j)`.
///
/// Starts lie just outside the grid, on the side the sweep comes from. There
/// are exactly `|step_i|·columns + |step_j|·rows − (|step_i| + |step_j| − 1)`
/// of them and every cell is crossed by exactly one line.
fn sweep_starts(rows: isize, columns: isize, (step_i, step_j): (isize, isize)) -> Vec<(isize, isize)> {
    let (ai, aj) = (step_i.abs(), step_j.abs());
    let expected = (ai * columns + aj * rows - (ai + aj - 1)) as usize;

    let mut starts = Vec::with_capacity(expected);
    for j in -aj..columns - aj {
        for i in -ai..rows - ai {
            if (0..rows).contains(&i) && (0..columns).contains(&j) {
                continue;
            }
            let pi = if step_i < 0 { rows - i - 1 } else { i };
            let pj = if step_j < 0 { columns - j - 1 } else { j };
            starts.push((pi, pj));
        }
    }

    assert_eq!(
        starts.len(),
        expected,
        "sweep line count mismatch for step ({step_i}, {step_j})"
    );
    starts
}

/// Horizon angles of every cell for one direction, row-major.
fn scan_direction(field: &HeightField, direction: usize) -> Vec<f32> {
    let (di, dj) = DIRECTIONS[direction];
    let rows = field.resolution_height() as isize;
    let columns = field.resolution_width() as isize;
    let (cw, ch) = (field.cell_width(), field.cell_height());
    let inside = |i: isize, j: isize| (0..rows).contains(&i) && (0..columns).contains(&j);

    // Sweep against the direction so the hull holds the cells lying ahead.
    let step = (-di, -dj);

    let mut angles = vec![FRAC_PI_2; field.len()];
    let mut hull: Vec<(isize, isize)> = Vec::new();

    for (start_i, start_j) in sweep_starts(rows, columns, step) {
        // The start point sits outside the grid and acts as a point at infinity.
        hull.clear();
        hull.push((start_i, start_j));

        let (mut i, mut j) = (start_i + step.0, start_j + step.1);
        while inside(i, j) {
            let here = (i, j, field.sample(i as usize, j as usize));
            let slope_to = |(k, l): (isize, isize)| {
                if inside(k, l) {
                    let there = (k, l, field.sample(k as usize, l as usize));
                    horizon_slope(here, there, cw, ch)
                } else {
                    f32::NEG_INFINITY
                }
            };

            while hull.len() > 1 {
                let last = slope_to(hull[hull.len() - 1]);
                let penultimate = slope_to(hull[hull.len() - 2]);
                if last >= penultimate {
                    break;
                }
                hull.pop();
            }

            let horizon = slope_to(hull[hull.len() - 1]);
            angles[field.cell_index(i as usize, j as usize)] = tangent_to_angle(horizon);
            hull.push((i, j));

            i += step.0;
            j += step.1;
        }
    }

    angles
}

/// Horizon angles of every cell with the sweep/convex-hull algorithm.
///
/// Directions are scanned in parallel; each one fills its own slot of every cell.
pub fn compute_horizon_angles(field: &HeightField) -> HorizonAngleGrid {
    let mut grid = HorizonAngleGrid::unobstructed(field);
    if field.is_empty() {
        return grid;
    }

    let started = Instant::now();
    let per_direction: Vec<Vec<f32>> = (0..DIRECTION_COUNT)
        .into_par_iter()
        .map(|direction| scan_direction(field, direction))
        .collect();

    grid.cells
        .par_iter_mut()
        .enumerate()
        .for_each(|(index, cell)| {
            for (d, angles) in per_direction.iter().enumerate() {
                cell.angles[d] = angles[index];
            }
        });

    log::debug!(
        "horizon scan of {}x{} terrain took {:?}",
        field.resolution_width(),
        field.resolution_height(),
        started.elapsed()
    );
    grid
}
