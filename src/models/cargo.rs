//! Cargo box models.
//!
//! A box enters the system as a [`BoxSpec`] in the caller's real units and
//! is rasterized into a [`CargoBox`] on the voxel grid. Both are immutable
//! for the duration of one packing run.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Dimensions, Extent};

/// Delivery stop index. Lower stops are unloaded first.
pub type Stop = u32;

/// A box to be loaded, in real units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxSpec {
    /// Unique box identifier.
    pub id: String,
    /// Real extent (width, height, length).
    pub size: Extent,
    /// Delivery stop (0 = first stop).
    pub route_order: Stop,
}

impl BoxSpec {
    /// Creates a box for the first stop.
    pub fn new(id: impl Into<String>, size: Extent) -> Self {
        Self {
            id: id.into(),
            size,
            route_order: 0,
        }
    }

    /// Sets the delivery stop.
    pub fn with_route_order(mut self, route_order: Stop) -> Self {
        self.route_order = route_order;
        self
    }
}

/// A box on the voxel grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CargoBox {
    /// Unique box identifier.
    pub id: String,
    /// Grid extent.
    pub size: Dimensions,
    /// Delivery stop (0 = first stop).
    pub route_order: Stop,
}

impl CargoBox {
    /// Creates a box for the first stop.
    pub fn new(id: impl Into<String>, size: Dimensions) -> Self {
        Self {
            id: id.into(),
            size,
            route_order: 0,
        }
    }

    /// Sets the delivery stop.
    pub fn with_route_order(mut self, route_order: Stop) -> Self {
        self.route_order = route_order;
        self
    }

    /// Number of voxels the box occupies.
    pub fn volume(&self) -> u64 {
        self.size.volume()
    }
}

impl fmt::Display for CargoBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Box {} ({}, stop {})", self.id, self.size, self.route_order)
    }
}
