//! Packing quality metrics (KPIs).
//!
//! Computes load indicators from a completed packing.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Grid Utilization | Occupied voxels / grid voxels |
//! | Route Inversions | Pairs where a later stop sits strictly nearer the door than an earlier stop |
//! | Mean Depth per Stop | Average `depth_from_door` of each stop's boxes |
//! | Max Height | Highest occupied layer + 1 |

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::{Packing, Stop};

/// Packing performance indicators.
///
/// Depths are in grid units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackingKpi {
    /// Number of placed boxes.
    pub box_count: usize,
    /// Number of occupied grid voxels.
    pub occupied_voxels: usize,
    /// Fraction of grid voxels occupied (0.0..1.0).
    pub grid_utilization: f64,
    /// Number of box pairs loaded against the route order.
    pub route_inversions: usize,
    /// Mean distance to the door per stop.
    pub mean_depth_by_stop: BTreeMap<Stop, f64>,
    /// Number of height layers in use.
    pub max_height: u32,
}

impl PackingKpi {
    /// Computes KPIs from a packing.
    pub fn calculate(packing: &Packing) -> Self {
        let occupied_voxels = packing.occupied_voxels();
        let grid_volume = packing.grid.volume();
        let grid_utilization = if grid_volume == 0 {
            0.0
        } else {
            occupied_voxels as f64 / grid_volume as f64
        };

        let mut route_inversions = 0;
        for (i, a) in packing.boxes.iter().enumerate() {
            for b in &packing.boxes[i + 1..] {
                let (early, late) = match a.route_order.cmp(&b.route_order) {
                    std::cmp::Ordering::Less => (a, b),
                    std::cmp::Ordering::Greater => (b, a),
                    std::cmp::Ordering::Equal => continue,
                };
                if late.depth_from_door < early.depth_from_door {
                    route_inversions += 1;
                }
            }
        }

        let mut depth_sums: BTreeMap<Stop, (i64, usize)> = BTreeMap::new();
        for placed in &packing.boxes {
            let entry = depth_sums.entry(placed.route_order).or_insert((0, 0));
            entry.0 += placed.depth_from_door;
            entry.1 += 1;
        }
        let mean_depth_by_stop = depth_sums
            .into_iter()
            .map(|(stop, (sum, count))| (stop, sum as f64 / count as f64))
            .collect();

        let max_height = packing
            .boxes
            .iter()
            .map(|b| b.offset.y as u32 + b.size.height)
            .max()
            .unwrap_or(0);

        Self {
            box_count: packing.box_count(),
            occupied_voxels,
            grid_utilization,
            route_inversions,
            mean_depth_by_stop,
            max_height,
        }
    }

    /// Whether no later stop blocks an earlier one.
    pub fn is_route_ordered(&self) -> bool {
        self.route_inversions == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Dimensions, PlacedBox, Position, Voxel};
    use crate::raster::ScalingFactors;
    use std::collections::HashMap;

    fn placed(id: &str, stop: Stop, offset: Voxel, depth: i64) -> PlacedBox {
        PlacedBox {
            box_id: id.into(),
            size: Dimensions::new(1, 1, 2),
            route_order: stop,
            offset,
            depth_from_door: depth,
            position: Position::new(offset.x as f64, offset.y as f64, offset.z as f64),
        }
    }

    fn make_packing(boxes: Vec<PlacedBox>) -> Packing {
        let mut box_at_voxel = HashMap::new();
        for b in &boxes {
            for v in b.voxels() {
                box_at_voxel.insert(v, b.box_id.clone());
            }
        }
        Packing {
            grid: Dimensions::new(2, 2, 6),
            factors: ScalingFactors::identity(),
            boxes,
            box_at_voxel,
            optimal: true,
        }
    }

    #[test]
    fn test_kpi_basic() {
        let packing = make_packing(vec![
            placed("a", 0, Voxel::new(0, 0, 4), 0),
            placed("b", 1, Voxel::new(1, 0, 0), 4),
            placed("c", 1, Voxel::new(1, 1, 0), 4),
        ]);
        let kpi = PackingKpi::calculate(&packing);

        assert_eq!(kpi.box_count, 3);
        assert_eq!(kpi.occupied_voxels, 6);
        assert!((kpi.grid_utilization - 0.25).abs() < 1e-10);
        assert_eq!(kpi.route_inversions, 0);
        assert!(kpi.is_route_ordered());
        assert_eq!(kpi.mean_depth_by_stop[&0], 0.0);
        assert_eq!(kpi.mean_depth_by_stop[&1], 4.0);
        assert_eq!(kpi.max_height, 2);
    }

    #[test]
    fn test_kpi_inversions() {
        // Stop 2 at the door in front of stops 0 and 1
        let packing = make_packing(vec![
            placed("a", 0, Voxel::new(0, 0, 0), 4),
            placed("b", 1, Voxel::new(1, 0, 2), 2),
            placed("c", 2, Voxel::new(0, 0, 4), 0),
        ]);
        let kpi = PackingKpi::calculate(&packing);
        assert_eq!(kpi.route_inversions, 3);
        assert!(!kpi.is_route_ordered());
    }

    #[test]
    fn test_kpi_empty() {
        let kpi = PackingKpi::calculate(&make_packing(Vec::new()));
        assert_eq!(kpi.box_count, 0);
        assert_eq!(kpi.grid_utilization, 0.0);
        assert!(kpi.mean_depth_by_stop.is_empty());
        assert_eq!(kpi.max_height, 0);
    }
}
