//! Request-level truck packer.
//!
//! # Algorithm
//!
//! 1. Validate the truck and boxes (IDs, extents, containment).
//! 2. Search for a voxel grid under the budget and scale every box onto it.
//! 3. Build the CP model over all feasible placements.
//! 4. Solve within the time budget.
//! 5. Decode the assignment and rescale offsets to real units.

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::cp::PackingCpBuilder;
use crate::error::{PackError, Result};
use crate::models::{BoxSpec, Extent, Packing};
use crate::raster::{GridSearch, Rasterization, DEFAULT_MIN_LENGTH, DEFAULT_VOXEL_LIMIT};
use crate::solver::{CpSolver, SimpleCpSolver, SolverConfig, DEFAULT_TIME_LIMIT_MS};
use crate::validation::{describe, validate_input};

/// Input container for packing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackRequest {
    /// Real truck extent (width, height, length).
    pub truck: Extent,
    /// Boxes to load.
    pub boxes: Vec<BoxSpec>,
    /// Maximum number of grid voxels.
    pub voxel_limit: u64,
    /// Minimum grid resolution along the length axis.
    pub min_length: u64,
    /// Solver time budget (ms, 0 = unlimited).
    pub time_limit_ms: u64,
}

impl PackRequest {
    /// Creates a request with default budgets.
    pub fn new(truck: Extent, boxes: Vec<BoxSpec>) -> Self {
        Self {
            truck,
            boxes,
            voxel_limit: DEFAULT_VOXEL_LIMIT,
            min_length: DEFAULT_MIN_LENGTH,
            time_limit_ms: DEFAULT_TIME_LIMIT_MS,
        }
    }

    /// Adds a box.
    pub fn with_box(mut self, spec: BoxSpec) -> Self {
        self.boxes.push(spec);
        self
    }

    /// Sets the voxel budget.
    pub fn with_voxel_limit(mut self, voxel_limit: u64) -> Self {
        self.voxel_limit = voxel_limit;
        self
    }

    /// Sets the minimum length resolution.
    pub fn with_min_length(mut self, min_length: u64) -> Self {
        self.min_length = min_length;
        self
    }

    /// Sets the solver time budget.
    pub fn with_time_limit(mut self, time_limit_ms: u64) -> Self {
        self.time_limit_ms = time_limit_ms;
        self
    }

    /// Grid search configured from this request.
    pub fn grid_search(&self) -> GridSearch {
        GridSearch::new(self.voxel_limit).with_min_length(self.min_length)
    }

    /// Solver configuration from this request.
    pub fn solver_config(&self) -> SolverConfig {
        SolverConfig::new().with_time_limit(self.time_limit_ms)
    }
}

/// Packs trucks with a CP solver.
///
/// Holds no per-request state, so one packer can serve independent
/// requests from several threads at once.
///
/// # Example
///
/// ```
/// use u_truckpack::models::{BoxSpec, Extent};
/// use u_truckpack::packer::{PackRequest, TruckPacker};
///
/// let request = PackRequest::new(
///     Extent::new(2.0, 1.0, 6.0),
///     vec![
///         BoxSpec::new("first", Extent::new(2.0, 1.0, 2.0)),
///         BoxSpec::new("last", Extent::new(2.0, 1.0, 2.0)).with_route_order(1),
///     ],
/// );
/// let packing = TruckPacker::new().pack(&request).unwrap();
/// assert_eq!(packing.box_count(), 2);
/// assert_eq!(packing.placement("first").unwrap().depth_from_door, 0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct TruckPacker<S = SimpleCpSolver> {
    solver: S,
}

impl TruckPacker {
    /// Creates a packer backed by the bundled solver.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<S: CpSolver> TruckPacker<S> {
    /// Creates a packer backed by another solver.
    pub fn with_solver(solver: S) -> Self {
        Self { solver }
    }

    /// The solver backend.
    pub fn solver(&self) -> &S {
        &self.solver
    }

    /// Validates and rasterizes a request without solving it.
    ///
    /// # Errors
    /// - `InvalidModel` for malformed input, with every problem listed
    /// - `GridSearch` if no grid under the budget fits every box
    pub fn rasterize(&self, request: &PackRequest) -> Result<Rasterization> {
        validate_input(&request.truck, &request.boxes).map_err(|errors| {
            warn!("Rejected packing request: {} validation errors", errors.len());
            PackError::InvalidModel(describe(&errors))
        })?;

        let raster = request.grid_search().search(&request.truck, &request.boxes)?;
        info!(
            "Rasterized {} boxes onto grid {} (error {:.4})",
            raster.boxes.len(),
            raster.grid,
            raster.error
        );
        Ok(raster)
    }

    /// Packs every box of the request into the truck.
    ///
    /// # Errors
    /// Any [`PackError`]; no partial packing is ever returned.
    pub fn pack(&self, request: &PackRequest) -> Result<Packing> {
        let raster = self.rasterize(request)?;
        PackingCpBuilder::new(raster.grid, &raster.boxes)
            .with_factors(raster.factors)
            .solve(&self.solver, &request.solver_config())
    }
}
