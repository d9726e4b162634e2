//! Packing (solution) model.
//!
//! A packing is a complete placement of every box of a request. It is
//! never partially populated: a failed solve produces an error instead.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::{Dimensions, Position, Stop, Voxel};
use crate::raster::ScalingFactors;

/// A box at its chosen offset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedBox {
    /// Box identifier.
    pub box_id: String,
    /// Grid extent.
    pub size: Dimensions,
    /// Delivery stop.
    pub route_order: Stop,
    /// Grid offset of the box's origin corner.
    pub offset: Voxel,
    /// Grid distance between the box's door-side face and the door.
    pub depth_from_door: i64,
    /// Offset rescaled to the caller's units.
    pub position: Position,
}

impl PlacedBox {
    /// Every grid voxel the box occupies.
    pub fn voxels(&self) -> impl Iterator<Item = Voxel> + '_ {
        self.size.voxels().into_iter().map(move |v| v + self.offset)
    }
}

/// A complete packing.
#[derive(Debug, Clone)]
pub struct Packing {
    /// Grid extent of the truck.
    pub grid: Dimensions,
    /// Factors relating the grid to the caller's units.
    pub factors: ScalingFactors,
    /// Placed boxes in request order.
    pub boxes: Vec<PlacedBox>,
    /// Owner of every occupied grid voxel.
    pub box_at_voxel: HashMap<Voxel, String>,
    /// Whether the solver proved the route objective optimal.
    pub optimal: bool,
}

impl Packing {
    /// Finds the placement of a box.
    pub fn placement(&self, box_id: &str) -> Option<&PlacedBox> {
        self.boxes.iter().find(|b| b.box_id == box_id)
    }

    /// Grid offset of a box.
    pub fn offset_of(&self, box_id: &str) -> Option<Voxel> {
        self.placement(box_id).map(|b| b.offset)
    }

    /// Box occupying a grid voxel, if any.
    pub fn box_at(&self, voxel: &Voxel) -> Option<&str> {
        self.box_at_voxel.get(voxel).map(String::as_str)
    }

    /// Placements grouped by delivery stop.
    pub fn boxes_for_stop(&self, stop: Stop) -> Vec<&PlacedBox> {
        self.boxes.iter().filter(|b| b.route_order == stop).collect()
    }

    /// Number of occupied grid voxels.
    pub fn occupied_voxels(&self) -> usize {
        self.box_at_voxel.len()
    }

    /// Number of placed boxes.
    pub fn box_count(&self) -> usize {
        self.boxes.len()
    }
}
