//! Route-aware truck loading for the U-Engine ecosystem.
//!
//! Packs axis-aligned boxes into a truck so that every box is supported
//! from below and boxes for early delivery stops sit near the door.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `Voxel`, `Dimensions`, `Extent`, `BoxSpec`,
//!   `CargoBox`, `PlacedBox`, `Packing`
//! - **`raster`**: Grid resolution search and scaling between real and grid units
//! - **`placement`**: Enumeration of every in-truck offset of a box
//! - **`solver`**: Constraint model, solver boundary, bundled branch-and-bound backend
//! - **`cp`**: Packing model builder and solution decoder
//! - **`validation`**: Input integrity checks (duplicate IDs, extents, containment)
//! - **`packer`**: End-to-end pipeline and packing KPIs
//! - **`render`**: Layer-by-layer text rendering
//! - **`service`**: Serde DTOs and request status mapping
//!
//! # Pipeline
//!
//! ```text
//! truck + boxes ─▶ validation ─▶ raster ─▶ cp (placement + model) ─▶ solver ─▶ decode ─▶ Packing
//! ```
//!
//! # References
//!
//! - Bortfeldt & Wäscher (2013), "Constraints in container loading – A state-of-the-art review"
//! - Junqueira, Morabito & Yamashita (2012), "Three-dimensional container loading models
//!   with cargo stability and load bearing constraints"
//! - Rossi, van Beek & Walsh (2006), "Handbook of Constraint Programming"

pub mod cp;
pub mod error;
pub mod models;
pub mod packer;
pub mod placement;
pub mod raster;
pub mod render;
pub mod service;
pub mod solver;
pub mod validation;

pub use error::{PackError, Result};
pub use packer::{PackRequest, TruckPacker};
