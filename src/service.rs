//! Request-level facade.
//!
//! Plain serde DTOs for a packing problem and its answer, and the mapping
//! of core failures to request statuses. Transport is left to the caller;
//! the status codes follow HTTP conventions so an HTTP layer can forward
//! them unchanged.
//!
//! | Failure | Kind | Status |
//! |---------|------|--------|
//! | Missing box size, invalid input, grid search failure | `BadRequest` | 400 |
//! | Infeasible problem, time budget exhausted | `NoSolution` | 422 |
//! | Inconsistent solver output | `Internal` | 500 |

use log::warn;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::PackError;
use crate::models::{BoxSpec, Extent, Packing, Stop};
use crate::packer::{PackRequest, TruckPacker};
use crate::raster::DEFAULT_VOXEL_LIMIT;
use crate::solver::{CpSolver, SimpleCpSolver, DEFAULT_TIME_LIMIT_MS};

/// Extent or offset as (width/x, height/y, length/z).
pub type Coords = [f64; 3];

/// A box as submitted by a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxDto {
    pub box_id: String,
    /// Unknown until measured.
    #[serde(default)]
    pub size: Option<Coords>,
    #[serde(default)]
    pub route_order: Stop,
}

/// A packing problem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemDto {
    pub truck: Coords,
    pub boxes: Vec<BoxDto>,
}

/// A box with its loading offset, in the problem's units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionedBoxDto {
    pub box_id: String,
    pub size: Coords,
    pub offset: Coords,
    pub route_order: Stop,
}

/// A packing answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackingDto {
    pub truck: Coords,
    pub boxes: Vec<PositionedBoxDto>,
}

impl ProblemDto {
    /// Converts to a core request with the given budgets.
    ///
    /// # Errors
    /// `BadRequest` if any box has no size.
    pub fn to_request(&self, voxel_limit: u64, time_limit_ms: u64) -> Result<PackRequest, ServiceError> {
        let missing: Vec<&str> = self
            .boxes
            .iter()
            .filter(|b| b.size.is_none())
            .map(|b| b.box_id.as_str())
            .collect();
        if !missing.is_empty() {
            return Err(ServiceError::new(
                ServiceErrorKind::BadRequest,
                format!("Not all boxes have sizes (missing: {})", missing.join(", ")),
            ));
        }

        let boxes = self
            .boxes
            .iter()
            .filter_map(|b| {
                b.size
                    .map(|size| BoxSpec::new(b.box_id.clone(), Extent::from(size)).with_route_order(b.route_order))
            })
            .collect();

        Ok(PackRequest::new(Extent::from(self.truck), boxes)
            .with_voxel_limit(voxel_limit)
            .with_time_limit(time_limit_ms))
    }
}

/// Category of a failed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceErrorKind {
    /// The problem itself is malformed.
    BadRequest,
    /// The problem is well formed but no packing was found.
    NoSolution,
    /// The packer failed internally.
    Internal,
}

impl ServiceErrorKind {
    /// HTTP-style status code.
    pub fn status_code(self) -> u16 {
        match self {
            ServiceErrorKind::BadRequest => 400,
            ServiceErrorKind::NoSolution => 422,
            ServiceErrorKind::Internal => 500,
        }
    }
}

/// A failed request.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct ServiceError {
    pub kind: ServiceErrorKind,
    pub message: String,
}

impl ServiceError {
    /// Creates an error.
    pub fn new(kind: ServiceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// HTTP-style status code.
    pub fn status_code(&self) -> u16 {
        self.kind.status_code()
    }
}

impl From<PackError> for ServiceError {
    fn from(err: PackError) -> Self {
        let kind = match err {
            PackError::GridSearch(_) | PackError::InvalidModel(_) => ServiceErrorKind::BadRequest,
            PackError::Infeasible | PackError::Timeout(_) => ServiceErrorKind::NoSolution,
            PackError::InternalConsistency(_) => ServiceErrorKind::Internal,
        };
        ServiceError::new(kind, err.to_string())
    }
}

/// Packs DTO problems with fixed budgets.
#[derive(Debug, Clone)]
pub struct PackingService<S = SimpleCpSolver> {
    packer: TruckPacker<S>,
    voxel_limit: u64,
    time_limit_ms: u64,
}

impl Default for PackingService {
    fn default() -> Self {
        Self::new()
    }
}

impl PackingService {
    /// Creates a service with default budgets and the bundled solver.
    pub fn new() -> Self {
        Self::with_packer(TruckPacker::new())
    }
}

impl<S: CpSolver> PackingService<S> {
    /// Creates a service around a packer.
    pub fn with_packer(packer: TruckPacker<S>) -> Self {
        Self {
            packer,
            voxel_limit: DEFAULT_VOXEL_LIMIT,
            time_limit_ms: DEFAULT_TIME_LIMIT_MS,
        }
    }

    /// Sets the voxel budget.
    pub fn with_voxel_limit(mut self, voxel_limit: u64) -> Self {
        self.voxel_limit = voxel_limit;
        self
    }

    /// Sets the solver time budget (ms).
    pub fn with_time_limit(mut self, time_limit_ms: u64) -> Self {
        self.time_limit_ms = time_limit_ms;
        self
    }

    /// Packs a problem.
    ///
    /// # Errors
    /// A [`ServiceError`] classified per the table in the module docs.
    pub fn pack(&self, problem: &ProblemDto) -> Result<PackingDto, ServiceError> {
        let request = problem.to_request(self.voxel_limit, self.time_limit_ms)?;
        let packing = self.packer.pack(&request).map_err(|err| {
            warn!("Packing request failed: {}", err);
            ServiceError::from(err)
        })?;
        to_dto(&request, &packing)
    }
}

/// Packs a problem with default budgets.
pub fn pack_problem(problem: &ProblemDto) -> Result<PackingDto, ServiceError> {
    PackingService::new().pack(problem)
}

fn to_dto(request: &PackRequest, packing: &Packing) -> Result<PackingDto, ServiceError> {
    let boxes = request
        .boxes
        .iter()
        .map(|spec| {
            let placed = packing.placement(&spec.id).ok_or_else(|| {
                ServiceError::new(
                    ServiceErrorKind::Internal,
                    format!("Box '{}' missing from packing", spec.id),
                )
            })?;
            Ok(PositionedBoxDto {
                box_id: spec.id.clone(),
                size: spec.size.to_array(),
                offset: placed.position.to_array(),
                route_order: spec.route_order,
            })
        })
        .collect::<Result<Vec<_>, ServiceError>>()?;

    Ok(PackingDto {
        truck: request.truck.to_array(),
        boxes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn problem() -> ProblemDto {
        ProblemDto {
            truck: [1.0, 1.0, 3.0],
            boxes: vec![
                BoxDto {
                    box_id: "a".into(),
                    size: Some([1.0, 1.0, 1.0]),
                    route_order: 0,
                },
                BoxDto {
                    box_id: "b".into(),
                    size: Some([1.0, 1.0, 1.0]),
                    route_order: 1,
                },
            ],
        }
    }

    #[test]
    fn test_pack_problem() {
        let packing = pack_problem(&problem()).unwrap();
        assert_eq!(packing.truck, [1.0, 1.0, 3.0]);
        assert_eq!(packing.boxes.len(), 2);
        assert_eq!(packing.boxes[0].box_id, "a");
        assert_eq!(packing.boxes[0].offset, [0.0, 0.0, 2.0]);
        assert_eq!(packing.boxes[1].offset, [0.0, 0.0, 0.0]);
        assert_eq!(packing.boxes[1].size, [1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_missing_size() {
        let mut p = problem();
        p.boxes[1].size = None;
        let err = pack_problem(&p).unwrap_err();
        assert_eq!(err.kind, ServiceErrorKind::BadRequest);
        assert_eq!(err.status_code(), 400);
        assert!(err.message.contains("b"));
    }

    #[test]
    fn test_error_mapping() {
        let cases = [
            (PackError::GridSearch("x".into()), 400),
            (PackError::InvalidModel("x".into()), 400),
            (PackError::Infeasible, 422),
            (PackError::Timeout(10), 422),
            (PackError::InternalConsistency("x".into()), 500),
        ];
        for (err, status) in cases {
            assert_eq!(ServiceError::from(err).status_code(), status);
        }
    }

    #[test]
    fn test_infeasible_problem() {
        let p = ProblemDto {
            truck: [1.0, 1.0, 6.0],
            boxes: vec![
                BoxDto {
                    box_id: "a".into(),
                    size: Some([1.0, 1.0, 4.0]),
                    route_order: 0,
                },
                BoxDto {
                    box_id: "b".into(),
                    size: Some([1.0, 1.0, 4.0]),
                    route_order: 0,
                },
            ],
        };
        let err = pack_problem(&p).unwrap_err();
        assert_eq!(err.kind, ServiceErrorKind::NoSolution);
    }

    #[test]
    fn test_oversized_box_is_bad_request() {
        let mut p = problem();
        p.boxes[0].size = Some([2.0, 1.0, 1.0]);
        let err = pack_problem(&p).unwrap_err();
        assert_eq!(err.kind, ServiceErrorKind::BadRequest);
    }
}
