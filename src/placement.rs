//! Placement enumeration.
//!
//! For a box on the grid, lists every offset at which the box lies entirely
//! inside the truck, together with the voxels it would occupy there. Boxes
//! are never rotated.

use crate::models::{Dimensions, Voxel};

/// A feasible-in-isolation placement of one box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementCandidate {
    /// Offset of the box's origin corner.
    pub offset: Voxel,
    /// Voxels occupied at this offset.
    pub voxels: Vec<Voxel>,
}

impl PlacementCandidate {
    /// Whether the placement rests on the truck floor.
    pub fn on_floor(&self) -> bool {
        self.offset.y == 0
    }
}

/// Enumerates every placement of `size` inside `truck`.
///
/// Offsets range over `0..=truck_dim - box_dim` per axis, floor layers
/// first. A box larger than the truck along any axis has no placement.
pub fn enumerate_placements(size: &Dimensions, truck: &Dimensions) -> Vec<PlacementCandidate> {
    let Some(ranges) = offset_ranges(size, truck) else {
        return Vec::new();
    };
    let shape = size.voxels();
    let mut candidates = Vec::with_capacity(ranges.iter().map(|r| *r as usize).product());

    for y in 0..ranges[1] {
        for z in 0..ranges[2] {
            for x in 0..ranges[0] {
                let offset = Voxel::new(x, y, z);
                let voxels: Vec<Voxel> = shape.iter().map(|v| *v + offset).collect();
                if voxels.iter().all(|v| truck.contains(v)) {
                    candidates.push(PlacementCandidate { offset, voxels });
                }
            }
        }
    }

    candidates
}

/// Number of offsets per axis (width, height, length), or `None` if the
/// box does not fit.
fn offset_ranges(size: &Dimensions, truck: &Dimensions) -> Option<[i64; 3]> {
    let span = |t: u32, b: u32| t.checked_sub(b).map(|d| i64::from(d) + 1);
    Some([
        span(truck.width, size.width)?,
        span(truck.height, size.height)?,
        span(truck.length, size.length)?,
    ])
}
