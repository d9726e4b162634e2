//! CP-based packing formulation.
//!
//! Bridges the packing domain to the [`solver`](crate::solver) boundary.
//! Builds a `CpModel` from a rasterized truck and its boxes, solves it with
//! any `CpSolver`, and decodes the assignment into a `Packing`.
//!
//! # Formulation
//!
//! | Element | Definition |
//! |---------|------------|
//! | `x[b,o]` | Bool: box b sits at offset o (one per feasible placement) |
//! | `depth[b]` | Int in [0, L − l_b]: distance from box b to the door |
//! | Placement | Σₒ x[b,o] = 1 for every box |
//! | Overlap | occ(v) ≤ 1 for every voxel, occ(v) = Σ x[b,o] covering v |
//! | Support | occ(v) ≤ occ(v − ŷ) for every voxel above the floor |
//! | Capacity | Σ_b Σₒ vol(b) · x[b,o] ≤ W·H·L (redundant, fails at the root when overfull) |
//! | Depth | depth[b] = Σₒ (L − l_b − o.z) · x[b,o] |
//! | Objective | min Σ_b ((r_max − r_min) − 2·(r_b − r_min)) · depth[b], only when S > 1 stops |
//!
//! The door is at z = L. A depth of 0 means the box touches the door; the
//! earliest stop gets weight +(r_max − r_min) and is pulled towards the door,
//! the latest gets −(r_max − r_min) and is pushed to the far wall. Stops in
//! between are interpolated by their route order value, not their rank.
//!
//! # Reference
//! - Fasano (2013), "Solving Non-standard Packing Problems by Global Optimization and Heuristics"
//! - Junqueira, Morabito & Yamashita (2012), "Three-dimensional container loading models
//!   with cargo stability and load bearing constraints"

mod decode;

pub use decode::decode_solution;

use log::{debug, info};

use crate::error::{PackError, Result};
use crate::models::{CargoBox, Dimensions, Packing, Stop, Voxel};
use crate::placement::{enumerate_placements, PlacementCandidate};
use crate::raster::ScalingFactors;
use crate::solver::{CpModel, CpSolution, CpSolver, LinearExpr, SolveStatus, SolverConfig, VarId};

/// One boolean placement variable.
#[derive(Debug, Clone)]
pub struct PlacementVar {
    /// Index of the box in the builder's input.
    pub box_index: usize,
    /// Offset of the box's origin corner.
    pub offset: Voxel,
    /// Voxels occupied at this offset.
    pub voxels: Vec<Voxel>,
    /// Distance to the door at this offset.
    pub depth_from_door: i64,
    /// Model variable.
    pub var: VarId,
}

/// A built packing model and the index needed to decode its solutions.
#[derive(Debug, Clone)]
pub struct PackingModel {
    /// The constraint model.
    pub model: CpModel,
    /// Grid extent of the truck.
    pub truck: Dimensions,
    /// Placement variables, grouped by box in input order.
    pub placements: Vec<PlacementVar>,
    /// Depth variable per box, in input order.
    pub depth_vars: Vec<VarId>,
    /// Number of distinct delivery stops.
    pub stop_count: usize,
}

impl PackingModel {
    /// Placement variables of one box.
    pub fn placements_for(&self, box_index: usize) -> impl Iterator<Item = &PlacementVar> {
        self.placements
            .iter()
            .filter(move |p| p.box_index == box_index)
    }

    /// Number of placement variables.
    pub fn placement_count(&self) -> usize {
        self.placements.len()
    }
}

/// Builds a CP model from a rasterized packing problem.
///
/// # Example
/// ```
/// use u_truckpack::cp::PackingCpBuilder;
/// use u_truckpack::models::{CargoBox, Dimensions};
/// use u_truckpack::solver::{SimpleCpSolver, SolverConfig};
///
/// let truck = Dimensions::new(2, 1, 6);
/// let boxes = vec![
///     CargoBox::new("near", Dimensions::new(2, 1, 2)),
///     CargoBox::new("far", Dimensions::new(2, 1, 2)).with_route_order(1),
/// ];
/// let packing = PackingCpBuilder::new(truck, &boxes)
///     .solve(&SimpleCpSolver::new(), &SolverConfig::default())
///     .unwrap();
/// assert_eq!(packing.placement("far").unwrap().depth_from_door, 4);
/// assert_eq!(packing.placement("near").unwrap().depth_from_door, 0);
/// ```
pub struct PackingCpBuilder<'a> {
    truck: Dimensions,
    boxes: &'a [CargoBox],
    factors: ScalingFactors,
}

impl<'a> PackingCpBuilder<'a> {
    /// Creates a builder for boxes already on the truck's grid.
    pub fn new(truck: Dimensions, boxes: &'a [CargoBox]) -> Self {
        Self {
            truck,
            boxes,
            factors: ScalingFactors::identity(),
        }
    }

    /// Sets the factors used to rescale decoded offsets.
    pub fn with_factors(mut self, factors: ScalingFactors) -> Self {
        self.factors = factors;
        self
    }

    /// Builds the model.
    ///
    /// # Errors
    /// `InvalidModel` if a box has no feasible placement in the truck.
    pub fn build(&self) -> Result<PackingModel> {
        let mut model = CpModel::new("truck_packing");
        let truck = self.truck;
        let weights = route_weights(self.boxes);
        let stop_count = distinct_stops(self.boxes).len();

        let mut placements: Vec<PlacementVar> = Vec::new();
        let mut occupancy: Vec<Vec<VarId>> = vec![Vec::new(); truck.volume() as usize];

        // Placement variables, exactly one per box
        for (b, cargo) in self.boxes.iter().enumerate() {
            let mut candidates = enumerate_placements(&cargo.size, &truck);
            if candidates.is_empty() {
                return Err(PackError::InvalidModel(format!(
                    "box '{}' ({}) has no feasible placement in truck {}",
                    cargo.id, cargo.size, truck
                )));
            }
            let weight = weights.as_ref().map_or(0, |w| w[b]);
            order_candidates(&mut candidates, weight);

            let mut box_vars = Vec::with_capacity(candidates.len());
            for candidate in candidates {
                let var = model.new_bool_var(format!("box_{}_offset_{}", cargo.id, candidate.offset));
                for voxel in &candidate.voxels {
                    if let Some(i) = truck.index_of(voxel) {
                        occupancy[i].push(var);
                    }
                }
                placements.push(PlacementVar {
                    box_index: b,
                    offset: candidate.offset,
                    depth_from_door: depth_from_door(&truck, &cargo.size, &candidate.offset),
                    voxels: candidate.voxels,
                    var,
                });
                box_vars.push(var);
            }
            model.add_exactly_one(box_vars);
        }

        // Overlap and support per voxel
        for voxel in truck.voxels() {
            let Some(i) = truck.index_of(&voxel) else {
                continue;
            };
            let occupied = LinearExpr::sum(occupancy[i].iter().copied());
            if occupancy[i].len() > 1 {
                model.add_linear(occupied.clone(), i64::MIN, 1);
            }
            if let Some(below) = truck.index_of(&voxel.below()) {
                let unsupported = occupied - LinearExpr::sum(occupancy[below].iter().copied());
                if unsupported.has_positive_term() {
                    model.add_linear(unsupported, i64::MIN, 0);
                }
            }
        }

        // Total cargo volume against truck volume
        let capacity: LinearExpr = placements
            .iter()
            .map(|p| (p.var, self.boxes[p.box_index].volume() as i64))
            .collect();
        model.add_linear(capacity, i64::MIN, truck.volume() as i64);

        // Depth from the door
        let mut depth_vars = Vec::with_capacity(self.boxes.len());
        for (b, cargo) in self.boxes.iter().enumerate() {
            let max_depth = i64::from(truck.length) - i64::from(cargo.size.length);
            let depth = model.new_int_var(0, max_depth, format!("box_depth_{}", cargo.id));
            let mut linkage = LinearExpr::new().with_term(depth, 1);
            for p in placements.iter().filter(|p| p.box_index == b) {
                linkage.add_term(p.var, -p.depth_from_door);
            }
            model.add_eq(linkage, 0);
            depth_vars.push(depth);
        }

        // Route order objective
        if let Some(weights) = &weights {
            model.minimize(
                depth_vars
                    .iter()
                    .zip(weights)
                    .map(|(var, weight)| (*var, *weight))
                    .collect(),
            );
        }

        debug!(
            "Built packing model: {} boxes, {} placement variables, {} constraints, {} stops",
            self.boxes.len(),
            placements.len(),
            model.constraint_count(),
            stop_count
        );

        Ok(PackingModel {
            model,
            truck,
            placements,
            depth_vars,
            stop_count,
        })
    }

    /// Builds, solves, and decodes.
    ///
    /// # Errors
    /// - `InvalidModel` if a box cannot be placed or the solver rejects the model
    /// - `Infeasible` if no arrangement satisfies every constraint
    /// - `Timeout` if the budget ran out before any arrangement was found
    /// - `InternalConsistency` if a reported solution cannot be decoded
    pub fn solve<S: CpSolver>(&self, solver: &S, config: &SolverConfig) -> Result<Packing> {
        let packing_model = self.build()?;
        let solution = solver.solve(&packing_model.model, config);
        self.interpret(&packing_model, &solution, config)
    }

    fn interpret(
        &self,
        packing_model: &PackingModel,
        solution: &CpSolution,
        config: &SolverConfig,
    ) -> Result<Packing> {
        match solution.status {
            SolveStatus::Optimal | SolveStatus::Feasible => {
                info!(
                    "Packed {} boxes ({:?}, objective {:?}) in {}ms",
                    self.boxes.len(),
                    solution.status,
                    solution.objective_value,
                    solution.elapsed_ms
                );
                decode_solution(packing_model, self.boxes, solution, &self.factors)
            }
            SolveStatus::Infeasible => Err(PackError::Infeasible),
            SolveStatus::ModelInvalid => Err(PackError::InvalidModel(format!(
                "solver rejected model '{}'",
                packing_model.model.name()
            ))),
            SolveStatus::Unknown => Err(PackError::Timeout(config.time_limit_ms)),
        }
    }
}

/// Grid distance from a box at `offset` to the door at z = L.
pub fn depth_from_door(truck: &Dimensions, size: &Dimensions, offset: &Voxel) -> i64 {
    i64::from(truck.length) - i64::from(size.length) - offset.z
}

/// Sorted distinct delivery stops.
fn distinct_stops(boxes: &[CargoBox]) -> Vec<Stop> {
    let mut stops: Vec<Stop> = boxes.iter().map(|b| b.route_order).collect();
    stops.sort_unstable();
    stops.dedup();
    stops
}

/// Integer objective weight per box, or `None` with fewer than two stops.
///
/// Weight = (r_max − r_min) − 2·(r − r_min), the route weight
/// 1 − 2·(r − r_min)/(r_max − r_min) scaled by the stop span so that
/// coefficients stay integral.
pub fn route_weights(boxes: &[CargoBox]) -> Option<Vec<i64>> {
    let stops = distinct_stops(boxes);
    if stops.len() < 2 {
        return None;
    }
    let first = i64::from(stops[0]);
    let span = i64::from(stops[stops.len() - 1]) - first;
    Some(
        boxes
            .iter()
            .map(|b| span - 2 * (i64::from(b.route_order) - first))
            .collect(),
    )
}

/// Floor first, then towards the side the objective favours.
fn order_candidates(candidates: &mut [PlacementCandidate], weight: i64) {
    candidates.sort_by_key(|c| {
        let z = if weight > 0 { -c.offset.z } else { c.offset.z };
        (c.offset.y, z, c.offset.x)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::{Constraint, SimpleCpSolver};

    struct FixedStatusSolver(SolveStatus);

    impl CpSolver for FixedStatusSolver {
        fn solve(&self, _model: &CpModel, _config: &SolverConfig) -> CpSolution {
            CpSolution::without_solution(self.0, 0, 0)
        }
    }

    fn scenario_grid() -> (Dimensions, Vec<CargoBox>) {
        (
            Dimensions::new(4, 5, 10),
            vec![
                CargoBox::new("1", Dimensions::new(2, 1, 6)),
                CargoBox::new("2", Dimensions::new(4, 2, 2)),
                CargoBox::new("3", Dimensions::new(1, 4, 8)).with_route_order(1),
                CargoBox::new("4", Dimensions::new(3, 2, 4)).with_route_order(2),
            ],
        )
    }

    #[test]
    fn test_build_model() {
        let (truck, boxes) = scenario_grid();
        let built = PackingCpBuilder::new(truck, &boxes).build().unwrap();

        // 75 + 36 + 24 + 56 placements
        assert_eq!(built.placement_count(), 191);
        assert_eq!(built.placements_for(2).count(), 24);
        assert_eq!(built.depth_vars.len(), 4);
        assert_eq!(built.stop_count, 3);
        assert_eq!(built.model.var_count(), 191 + 4);
        assert!(built.model.has_objective());

        let exactly_one = built
            .model
            .constraints()
            .iter()
            .filter(|c| matches!(c, Constraint::ExactlyOne(_)))
            .count();
        assert_eq!(exactly_one, 4);
    }

    #[test]
    fn test_no_objective_for_single_stop() {
        let truck = Dimensions::new(2, 2, 6);
        let boxes = vec![
            CargoBox::new("a", Dimensions::new(1, 1, 2)).with_route_order(3),
            CargoBox::new("b", Dimensions::new(1, 1, 2)).with_route_order(3),
        ];
        let built = PackingCpBuilder::new(truck, &boxes).build().unwrap();
        assert!(!built.model.has_objective());
        assert_eq!(built.stop_count, 1);
    }

    #[test]
    fn test_box_without_placement() {
        let truck = Dimensions::new(2, 2, 6);
        let boxes = vec![CargoBox::new("wide", Dimensions::new(3, 1, 1))];
        let err = PackingCpBuilder::new(truck, &boxes).build().unwrap_err();
        assert!(matches!(err, PackError::InvalidModel(ref m) if m.contains("wide")));
    }

    #[test]
    fn test_route_weights() {
        let boxes = vec![
            CargoBox::new("a", Dimensions::new(1, 1, 1)),
            CargoBox::new("b", Dimensions::new(1, 1, 1)).with_route_order(1),
            CargoBox::new("c", Dimensions::new(1, 1, 1)).with_route_order(2),
        ];
        assert_eq!(route_weights(&boxes), Some(vec![2, 0, -2]));

        // Weights follow the stop number, gaps included
        let sparse = vec![
            CargoBox::new("a", Dimensions::new(1, 1, 1)).with_route_order(2),
            CargoBox::new("b", Dimensions::new(1, 1, 1)).with_route_order(9),
        ];
        assert_eq!(route_weights(&sparse), Some(vec![7, -7]));

        let gapped = vec![
            CargoBox::new("a", Dimensions::new(1, 1, 1)),
            CargoBox::new("b", Dimensions::new(1, 1, 1)).with_route_order(1),
            CargoBox::new("c", Dimensions::new(1, 1, 1)).with_route_order(5),
        ];
        assert_eq!(route_weights(&gapped), Some(vec![5, 3, -5]));

        assert_eq!(route_weights(&boxes[..1]), None);
    }

    #[test]
    fn test_sparse_stops_pull_early_box_to_door() {
        // Stop 1 is much closer to stop 0 than to stop 5, so b packs
        // right behind a instead of right in front of c.
        let truck = Dimensions::new(1, 1, 6);
        let boxes = vec![
            CargoBox::new("a", Dimensions::new(1, 1, 2)),
            CargoBox::new("b", Dimensions::new(1, 1, 2)).with_route_order(1),
            CargoBox::new("c", Dimensions::new(1, 1, 1)).with_route_order(5),
        ];
        let packing = PackingCpBuilder::new(truck, &boxes)
            .solve(&SimpleCpSolver::new(), &SolverConfig::default())
            .unwrap();

        assert!(packing.optimal);
        let depth = |id: &str| packing.placement(id).unwrap().depth_from_door;
        assert_eq!(depth("a"), 0);
        assert_eq!(depth("b"), 2);
        assert_eq!(depth("c"), 5);
    }

    #[test]
    fn test_depth_from_door() {
        let truck = Dimensions::new(4, 5, 10);
        let size = Dimensions::new(3, 2, 4);
        assert_eq!(depth_from_door(&truck, &size, &Voxel::new(0, 0, 0)), 6);
        assert_eq!(depth_from_door(&truck, &size, &Voxel::new(0, 0, 6)), 0);
    }

    #[test]
    fn test_candidate_order_follows_weight() {
        let truck = Dimensions::new(1, 2, 6);
        let mut towards_door = enumerate_placements(&Dimensions::new(1, 1, 2), &truck);
        order_candidates(&mut towards_door, 1);
        assert_eq!(towards_door[0].offset, Voxel::new(0, 0, 4));

        let mut towards_wall = enumerate_placements(&Dimensions::new(1, 1, 2), &truck);
        order_candidates(&mut towards_wall, -1);
        assert_eq!(towards_wall[0].offset, Voxel::new(0, 0, 0));
        assert!(towards_wall.last().unwrap().offset.y == 1);
    }

    #[test]
    fn test_solve_scenario_grid() {
        let (truck, boxes) = scenario_grid();
        let packing = PackingCpBuilder::new(truck, &boxes)
            .solve(&SimpleCpSolver::new(), &SolverConfig::default())
            .unwrap();

        assert!(packing.optimal);
        assert_eq!(packing.occupied_voxels(), 12 + 16 + 32 + 24);
        let depth = |id: &str| packing.placement(id).unwrap().depth_from_door;
        assert!(depth("4") >= depth("1"));
        assert!(depth("4") >= depth("2"));
    }

    #[test]
    fn test_stacking_needs_support() {
        // Two 1×1×1 boxes in a 1-wide, 2-high, 6-long truck: either side by
        // side on the floor or stacked, never floating.
        let truck = Dimensions::new(1, 2, 6);
        let boxes = vec![
            CargoBox::new("a", Dimensions::new(1, 1, 1)),
            CargoBox::new("b", Dimensions::new(1, 1, 1)).with_route_order(1),
        ];
        let packing = PackingCpBuilder::new(truck, &boxes)
            .solve(&SimpleCpSolver::new(), &SolverConfig::default())
            .unwrap();
        for placed in &packing.boxes {
            if placed.offset.y > 0 {
                assert!(packing.box_at(&placed.offset.below()).is_some());
            }
        }
        assert_eq!(packing.placement("a").unwrap().depth_from_door, 0);
        assert_eq!(packing.placement("b").unwrap().depth_from_door, 5);
    }

    #[test]
    fn test_status_mapping() {
        let truck = Dimensions::new(1, 1, 6);
        let boxes = vec![CargoBox::new("a", Dimensions::new(1, 1, 1))];
        let builder = PackingCpBuilder::new(truck, &boxes);
        let config = SolverConfig::new().with_time_limit(5);

        assert_eq!(
            builder
                .solve(&FixedStatusSolver(SolveStatus::Infeasible), &config)
                .unwrap_err(),
            PackError::Infeasible
        );
        assert_eq!(
            builder
                .solve(&FixedStatusSolver(SolveStatus::Unknown), &config)
                .unwrap_err(),
            PackError::Timeout(5)
        );
        assert!(matches!(
            builder.solve(&FixedStatusSolver(SolveStatus::ModelInvalid), &config),
            Err(PackError::InvalidModel(_))
        ));
        assert!(matches!(
            builder.solve(&FixedStatusSolver(SolveStatus::Optimal), &config),
            Err(PackError::InternalConsistency(_))
        ));
    }

    #[test]
    fn test_infeasible_overfull_truck() {
        let truck = Dimensions::new(1, 1, 6);
        let boxes = vec![
            CargoBox::new("a", Dimensions::new(1, 1, 4)),
            CargoBox::new("b", Dimensions::new(1, 1, 4)),
        ];
        let result = PackingCpBuilder::new(truck, &boxes)
            .solve(&SimpleCpSolver::new(), &SolverConfig::default());
        assert_eq!(result.unwrap_err(), PackError::Infeasible);
    }

    #[test]
    fn test_capacity_row_rejects_overfull_truck_at_root() {
        // 14 boxes of 4 voxels against 54 voxels of truck
        let truck = Dimensions::new(3, 3, 6);
        let boxes: Vec<CargoBox> = (0..14)
            .map(|i| {
                CargoBox::new(format!("b{i}"), Dimensions::new(2, 1, 2)).with_route_order(i % 3)
            })
            .collect();
        let builder = PackingCpBuilder::new(truck, &boxes);

        let built = builder.build().unwrap();
        let capacity = built.model.constraints().iter().any(|c| {
            matches!(c, Constraint::Linear { expr, hi, .. }
                if *hi == 54 && expr.terms().count() == built.placement_count())
        });
        assert!(capacity);

        let config = SolverConfig::new().with_time_limit(20_000);
        let solution = SimpleCpSolver::new().solve(&built.model, &config);
        assert_eq!(solution.status, SolveStatus::Infeasible);
        assert!(solution.nodes <= 1);

        assert_eq!(
            builder.solve(&SimpleCpSolver::new(), &config).unwrap_err(),
            PackError::Infeasible
        );
    }
}
