//! Truck packing domain models.
//!
//! Provides the value types shared by every stage of the pipeline:
//! grid geometry, input boxes, and the resulting packing.
//!
//! # Domain Mappings
//!
//! | u-truckpack | Logistics | Grid |
//! |-------------|-----------|------|
//! | BoxSpec | Parcel with measured size | - |
//! | CargoBox | - | Rasterized parcel |
//! | Stop | Delivery stop index | - |
//! | Packing | Load plan | Offset per box, owner per voxel |

mod cargo;
mod geometry;
mod packing;

pub use cargo::{BoxSpec, CargoBox, Stop};
pub use geometry::{Dimensions, Extent, Position, Voxel};
pub use packing::{Packing, PlacedBox};
