//! Packing pipeline and KPI evaluation.
//!
//! Runs a packing request end to end and measures the resulting load.
//!
//! # Pipeline
//!
//! `TruckPacker` validates the request, rasterizes it onto a voxel grid,
//! builds the CP model, solves it within the time budget, and decodes the
//! assignment with offsets rescaled to the caller's units.
//!
//! # KPI
//!
//! `PackingKpi` computes load metrics: grid utilization, occupied voxels,
//! route-order inversions, and mean depth per stop.
//!
//! # References
//!
//! - Bortfeldt & Wäscher (2013), "Constraints in container loading – A state-of-the-art review"

mod kpi;
mod truck;

pub use kpi::PackingKpi;
pub use truck::{PackRequest, TruckPacker};
