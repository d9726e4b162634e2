//! Solution decoding.
//!
//! Turns a solver assignment back into a [`Packing`]: the chosen offset of
//! every box, the voxel ownership map, and offsets rescaled to real units.

use log::error;
use std::collections::HashMap;

use super::{PackingModel, PlacementVar};
use crate::error::{PackError, Result};
use crate::models::{CargoBox, Packing, PlacedBox};
use crate::raster::ScalingFactors;
use crate::solver::{CpSolution, SolveStatus};

/// Decodes a solver assignment into a packing.
///
/// Every box must have exactly one true placement variable and no voxel may
/// be claimed twice. A violation means the solver and the model disagree;
/// it is logged and reported as `InternalConsistency`.
pub fn decode_solution(
    packing_model: &PackingModel,
    boxes: &[CargoBox],
    solution: &CpSolution,
    factors: &ScalingFactors,
) -> Result<Packing> {
    if !solution.is_solution_found() {
        return Err(inconsistency(format!(
            "cannot decode a solution with status {:?}",
            solution.status
        )));
    }

    let mut chosen: Vec<Option<&PlacementVar>> = vec![None; boxes.len()];
    for placement in &packing_model.placements {
        if !solution.bool_value(placement.var) {
            continue;
        }
        let Some(slot) = chosen.get_mut(placement.box_index) else {
            return Err(inconsistency(format!(
                "placement references unknown box index {}",
                placement.box_index
            )));
        };
        if slot.is_some() {
            return Err(inconsistency(format!(
                "box '{}' has more than one chosen placement",
                boxes[placement.box_index].id
            )));
        }
        *slot = Some(placement);
    }

    let mut placed = Vec::with_capacity(boxes.len());
    let mut box_at_voxel = HashMap::new();

    for (cargo, choice) in boxes.iter().zip(&chosen) {
        let Some(placement) = choice else {
            return Err(inconsistency(format!(
                "no placement chosen for box '{}'",
                cargo.id
            )));
        };

        for voxel in &placement.voxels {
            if let Some(owner) = box_at_voxel.insert(*voxel, cargo.id.clone()) {
                return Err(inconsistency(format!(
                    "voxel {} claimed by both '{}' and '{}'",
                    voxel, owner, cargo.id
                )));
            }
        }

        placed.push(PlacedBox {
            box_id: cargo.id.clone(),
            size: cargo.size,
            route_order: cargo.route_order,
            offset: placement.offset,
            depth_from_door: placement.depth_from_door,
            position: factors.to_real(&placement.offset),
        });
    }

    Ok(Packing {
        grid: packing_model.truck,
        factors: *factors,
        boxes: placed,
        box_at_voxel,
        optimal: solution.status == SolveStatus::Optimal,
    })
}

fn inconsistency(message: String) -> PackError {
    error!("Decoding failed: {}", message);
    PackError::InternalConsistency(message)
}
