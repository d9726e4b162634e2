//! Grid resolution search.
//!
//! Chooses a bounded integer grid approximating the truck's real extent and
//! scales every box onto it. The grid trades discretization error against
//! model size: every voxel becomes occupancy and support constraints, so the
//! voxel budget caps the solver's work.
//!
//! # Algorithm
//!
//! 1. Enumerate grids (gw, gh, gl) with gw·gh·gl ≤ budget, gw bounded by
//!    three times the cube root of the budget and gl at least `min_length`
//!    so that depth ordering has enough resolution.
//! 2. Scale every box by the per-axis factors g/truck, rounding up.
//! 3. Error = (Σ reconstructed box volume − Σ true box volume) / truck volume.
//! 4. Keep the better grid under a hysteresis rule: a grid with more voxels
//!    wins only if the error it saves exceeds its share of the budget.
//! 5. Stop at the first exact (zero-error) grid.
//!
//! # Complexity
//! O(B · log²B · n) for budget B and n boxes.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{PackError, Result};
use crate::models::{BoxSpec, CargoBox, Dimensions, Extent, Position, Voxel};

/// Default maximum number of grid voxels.
pub const DEFAULT_VOXEL_LIMIT: u64 = 1000;

/// Default minimum grid resolution along the length axis.
pub const DEFAULT_MIN_LENGTH: u64 = 6;

/// Slack absorbed when rounding scaled extents up, so that products such as
/// 10 · 0.3 do not spill into an extra voxel.
const ROUNDING_SLACK: f64 = 1e-9;

/// Errors below this are treated as exact.
const EXACT_ERROR: f64 = 1e-12;

/// Per-axis ratios between grid units and real units (grid / real).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScalingFactors {
    pub width: f64,
    pub height: f64,
    pub length: f64,
}

impl ScalingFactors {
    /// Factors mapping a real extent onto a grid.
    pub fn between(grid: &Dimensions, truck: &Extent) -> Self {
        Self {
            width: f64::from(grid.width) / truck.width,
            height: f64::from(grid.height) / truck.height,
            length: f64::from(grid.length) / truck.length,
        }
    }

    /// Factors for a problem that is already on the grid.
    pub const fn identity() -> Self {
        Self {
            width: 1.0,
            height: 1.0,
            length: 1.0,
        }
    }

    /// Scales a real extent up to whole voxels.
    pub fn scale(&self, size: &Extent) -> Dimensions {
        Dimensions::new(
            scale_up(size.width, self.width),
            scale_up(size.height, self.height),
            scale_up(size.length, self.length),
        )
    }

    /// Real volume covered by a grid extent.
    pub fn real_volume(&self, size: &Dimensions) -> f64 {
        (f64::from(size.width) / self.width)
            * (f64::from(size.height) / self.height)
            * (f64::from(size.length) / self.length)
    }

    /// Rescales a grid offset to the caller's units.
    pub fn to_real(&self, offset: &Voxel) -> Position {
        Position::new(
            offset.x as f64 / self.width,
            offset.y as f64 / self.height,
            offset.z as f64 / self.length,
        )
    }

    /// Maps a real position back onto the nearest grid voxel.
    pub fn to_grid(&self, position: &Position) -> Voxel {
        Voxel::new(
            (position.x * self.width).round() as i64,
            (position.y * self.height).round() as i64,
            (position.z * self.length).round() as i64,
        )
    }
}

fn scale_up(real: f64, factor: f64) -> u32 {
    (real * factor - ROUNDING_SLACK).ceil().max(0.0) as u32
}

/// A problem mapped onto a voxel grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rasterization {
    /// Grid extent of the truck.
    pub grid: Dimensions,
    /// Factors used for scaling.
    pub factors: ScalingFactors,
    /// Boxes scaled onto the grid, in input order.
    pub boxes: Vec<CargoBox>,
    /// Relative truck volume lost to rounding.
    pub error: f64,
}

impl Rasterization {
    /// Whether the grid represents every box exactly.
    pub fn is_exact(&self) -> bool {
        self.error <= EXACT_ERROR
    }

    /// Number of grid voxels.
    pub fn voxel_count(&self) -> u64 {
        self.grid.volume()
    }
}

/// Grid resolution search configuration.
///
/// # Example
/// ```
/// use u_truckpack::models::{BoxSpec, Extent};
/// use u_truckpack::raster::GridSearch;
///
/// let truck = Extent::new(4.0, 5.0, 5.0);
/// let boxes = vec![BoxSpec::new("1", Extent::new(2.0, 1.0, 3.0))];
/// let raster = GridSearch::new(1000).search(&truck, &boxes).unwrap();
/// assert!(raster.voxel_count() <= 1000);
/// assert!(raster.grid.length >= 6);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSearch {
    /// Maximum number of grid voxels.
    pub voxel_limit: u64,
    /// Minimum grid resolution along the length axis.
    pub min_length: u64,
}

impl Default for GridSearch {
    fn default() -> Self {
        Self {
            voxel_limit: DEFAULT_VOXEL_LIMIT,
            min_length: DEFAULT_MIN_LENGTH,
        }
    }
}

impl GridSearch {
    /// Creates a search with the given voxel budget.
    pub fn new(voxel_limit: u64) -> Self {
        Self {
            voxel_limit,
            ..Self::default()
        }
    }

    /// Sets the minimum length resolution.
    pub fn with_min_length(mut self, min_length: u64) -> Self {
        self.min_length = min_length.max(1);
        self
    }

    /// Finds the grid with the lowest discretization error.
    ///
    /// # Errors
    /// `GridSearch` when no grid under the budget keeps every scaled box
    /// inside the truck (including a budget too small for any grid).
    pub fn search(&self, truck: &Extent, boxes: &[BoxSpec]) -> Result<Rasterization> {
        if !truck.is_positive() {
            return Err(PackError::GridSearch(format!(
                "truck extent {:?} is not strictly positive",
                truck
            )));
        }

        let limit = self.voxel_limit;
        let truck_volume = truck.volume();
        let max_width = integer_cbrt(limit) * 3;

        let mut best: Option<Rasterization> = None;
        let mut best_count = u64::MAX;
        let mut best_error = f64::INFINITY;

        'search: for width in 1..=max_width {
            for height in 1..=limit / width {
                for length in self.min_length..=limit / (width * height) {
                    let grid = Dimensions::new(width as u32, height as u32, length as u32);
                    let factors = ScalingFactors::between(&grid, truck);

                    let Some(scaled) = scale_boxes(boxes, &factors, &grid) else {
                        continue;
                    };

                    let error = discretization_error(boxes, &scaled, &factors, truck_volume);
                    let count = grid.volume();
                    let exact = error <= EXACT_ERROR;

                    let accept = exact
                        || (error <= best_error
                            && (count <= best_count
                                || (count - best_count) as f64 / (limit as f64)
                                    < best_error - error));

                    if accept {
                        best_error = if exact { 0.0 } else { error };
                        best_count = count;
                        best = Some(Rasterization {
                            grid,
                            factors,
                            boxes: scaled,
                            error: best_error,
                        });
                    }

                    if exact {
                        break 'search;
                    }
                }
            }
        }

        match best {
            Some(raster) => {
                debug!(
                    "Chose grid {} ({} voxels, error {:.4}) for truck {:?}",
                    raster.grid,
                    raster.voxel_count(),
                    raster.error,
                    truck
                );
                Ok(raster)
            }
            None => Err(PackError::GridSearch(format!(
                "no grid with at most {} voxels keeps every box inside the truck",
                limit
            ))),
        }
    }
}

/// Rasterizes a problem with the default minimum length.
pub fn rasterize(truck: &Extent, boxes: &[BoxSpec], voxel_limit: u64) -> Result<Rasterization> {
    GridSearch::new(voxel_limit).search(truck, boxes)
}

fn scale_boxes(
    boxes: &[BoxSpec],
    factors: &ScalingFactors,
    grid: &Dimensions,
) -> Option<Vec<CargoBox>> {
    boxes
        .iter()
        .map(|b| {
            let size = factors.scale(&b.size);
            grid.fits(&size).then(|| CargoBox {
                id: b.id.clone(),
                size,
                route_order: b.route_order,
            })
        })
        .collect()
}

fn discretization_error(
    boxes: &[BoxSpec],
    scaled: &[CargoBox],
    factors: &ScalingFactors,
    truck_volume: f64,
) -> f64 {
    let wasted: f64 = boxes
        .iter()
        .zip(scaled)
        .map(|(real, grid)| factors.real_volume(&grid.size) - real.size.volume())
        .sum();
    wasted / truck_volume
}

/// Largest n with n³ ≤ value.
fn integer_cbrt(value: u64) -> u64 {
    let mut n = (value as f64).cbrt().round() as u64;
    while n > 0 && n.saturating_mul(n).saturating_mul(n) > value {
        n -= 1;
    }
    while (n + 1).saturating_mul(n + 1).saturating_mul(n + 1) <= value {
        n += 1;
    }
    n
}
