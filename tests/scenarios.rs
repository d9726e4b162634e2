use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use u_truckpack::models::{BoxSpec, Extent, Packing, Voxel};
use u_truckpack::packer::{PackRequest, PackingKpi, TruckPacker};
use u_truckpack::raster::rasterize;
use u_truckpack::service::{pack_problem, PackingDto, ProblemDto, ServiceErrorKind};
use u_truckpack::solver::{CpModel, CpSolution, CpSolver, SimpleCpSolver, SolveStatus, SolverConfig};
use u_truckpack::PackError;

fn scenario_a(stops: [u32; 4]) -> PackRequest {
    PackRequest::new(
        Extent::new(4.0, 5.0, 5.0),
        vec![
            BoxSpec::new("1", Extent::new(2.0, 1.0, 3.0)).with_route_order(stops[0]),
            BoxSpec::new("2", Extent::new(4.0, 2.0, 1.0)).with_route_order(stops[1]),
            BoxSpec::new("3", Extent::new(1.0, 4.0, 4.0)).with_route_order(stops[2]),
            BoxSpec::new("4", Extent::new(3.0, 2.0, 2.0)).with_route_order(stops[3]),
        ],
    )
}

/// Checks containment, exclusivity, and support of a packing.
fn assert_valid_packing(packing: &Packing) {
    let mut seen: HashSet<Voxel> = HashSet::new();
    for placed in &packing.boxes {
        for voxel in placed.voxels() {
            assert!(packing.grid.contains(&voxel), "{} leaves the truck at {}", placed.box_id, voxel);
            assert!(seen.insert(voxel), "voxel {} occupied twice", voxel);
            assert_eq!(packing.box_at(&voxel), Some(placed.box_id.as_str()));
        }
    }
    assert_eq!(seen.len(), packing.occupied_voxels());

    for voxel in packing.box_at_voxel.keys() {
        if voxel.y > 0 {
            assert!(
                packing.box_at(&voxel.below()).is_some(),
                "voxel {} floats",
                voxel
            );
        }
    }
}

#[test]
fn test_scenario_a_route_order() {
    let packing = TruckPacker::new().pack(&scenario_a([0, 0, 1, 2])).unwrap();

    assert_eq!(packing.box_count(), 4);
    assert!(packing.optimal);
    assert_valid_packing(&packing);

    let depth = |id: &str| packing.placement(id).unwrap().depth_from_door;
    assert!(depth("4") >= depth("1"));
    assert!(depth("4") >= depth("2"));

    // Re-solving keeps the ordering
    let again = TruckPacker::new().pack(&scenario_a([0, 0, 1, 2])).unwrap();
    let depth_again = |id: &str| again.placement(id).unwrap().depth_from_door;
    assert!(depth_again("4") >= depth_again("1"));
    assert!(depth_again("4") >= depth_again("2"));
}

#[test]
fn test_scenario_a_positions_in_real_units() {
    let request = scenario_a([0, 0, 1, 2]);
    let packing = TruckPacker::new().pack(&request).unwrap();

    for (spec, placed) in request.boxes.iter().zip(&packing.boxes) {
        assert_eq!(spec.id, placed.box_id);
        let p = placed.position;
        assert!(p.x >= 0.0 && p.x + spec.size.width <= 4.0 + 1e-9);
        assert!(p.y >= 0.0 && p.y + spec.size.height <= 5.0 + 1e-9);
        assert!(p.z >= 0.0 && p.z + spec.size.length <= 5.0 + 1e-9);
        assert_eq!(packing.factors.to_grid(&p), placed.offset);
    }
}

#[test]
fn test_scenario_b_oversized_box() {
    let request = PackRequest::new(
        Extent::new(4.0, 5.0, 5.0),
        vec![
            BoxSpec::new("ok", Extent::new(1.0, 1.0, 1.0)),
            BoxSpec::new("tall", Extent::new(1.0, 6.0, 1.0)),
        ],
    );
    let err = TruckPacker::new().pack(&request).unwrap_err();
    assert!(matches!(err, PackError::InvalidModel(ref m) if m.contains("tall")));
    assert!(err.is_input_error());
}

#[test]
fn test_scenario_c_overfull_truck() {
    let request = PackRequest::new(
        Extent::new(1.0, 1.0, 6.0),
        vec![
            BoxSpec::new("a", Extent::new(1.0, 1.0, 4.0)),
            BoxSpec::new("b", Extent::new(1.0, 1.0, 4.0)).with_route_order(1),
        ],
    );
    assert_eq!(TruckPacker::new().pack(&request).unwrap_err(), PackError::Infeasible);
}

#[test]
fn test_scenario_c_many_boxes_fail_fast() {
    // 14 × 4 = 56 cubic units of cargo in a 54 unit truck
    let boxes: Vec<BoxSpec> = (0..14)
        .map(|i| {
            BoxSpec::new(format!("crate{i}"), Extent::new(2.0, 1.0, 2.0)).with_route_order(i % 4)
        })
        .collect();
    let request = PackRequest::new(Extent::new(3.0, 3.0, 6.0), boxes).with_time_limit(20_000);

    let started = std::time::Instant::now();
    assert_eq!(TruckPacker::new().pack(&request).unwrap_err(), PackError::Infeasible);
    assert!(started.elapsed().as_millis() < 5_000);
}

#[test]
fn test_scenario_d_single_stop() {
    let packing = TruckPacker::new().pack(&scenario_a([0, 0, 0, 0])).unwrap();
    assert_eq!(packing.box_count(), 4);
    assert_valid_packing(&packing);

    let kpi = PackingKpi::calculate(&packing);
    assert_eq!(kpi.route_inversions, 0);
    assert_eq!(kpi.mean_depth_by_stop.len(), 1);
}

#[test]
fn test_rasterizer_is_idempotent() {
    let request = scenario_a([0, 0, 1, 2]);
    let first = rasterize(&request.truck, &request.boxes, 1000).unwrap();
    let second = rasterize(&request.truck, &request.boxes, 1000).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_random_problems_yield_valid_packings() {
    let mut rng = StdRng::seed_from_u64(42);
    let packer = TruckPacker::new();
    let mut packed = 0;

    for case in 0..25 {
        let truck = Extent::new(
            rng.random_range(1..=2) as f64,
            rng.random_range(1..=2) as f64,
            rng.random_range(2..=4) as f64,
        );
        let box_count = rng.random_range(1..=3);
        let boxes: Vec<BoxSpec> = (0..box_count)
            .map(|i| {
                let size = Extent::new(
                    rng.random_range(1..=truck.width as u32) as f64,
                    rng.random_range(1..=truck.height as u32) as f64,
                    rng.random_range(1..=truck.length as u32) as f64,
                );
                BoxSpec::new(format!("c{case}b{i}"), size).with_route_order(rng.random_range(0..3))
            })
            .collect();
        let request = PackRequest::new(truck, boxes).with_time_limit(0);

        match packer.pack(&request) {
            Ok(packing) => {
                assert_eq!(packing.box_count(), box_count);
                assert_valid_packing(&packing);
                for placed in &packing.boxes {
                    let back = packing.factors.to_grid(&packing.factors.to_real(&placed.offset));
                    assert_eq!(back, placed.offset);
                }
                packed += 1;
            }
            // Too much cargo, or nothing to stand on
            Err(PackError::Infeasible) => {}
            Err(other) => panic!("case {case}: unexpected error {other:?}"),
        }
    }

    assert!(packed > 0);
}

#[test]
fn test_concurrent_requests() {
    let packer = TruckPacker::new();
    let requests: Vec<PackRequest> = (0..4)
        .map(|i| {
            PackRequest::new(
                Extent::new(2.0, 2.0, 6.0),
                vec![
                    BoxSpec::new("front", Extent::new(1.0, 1.0, 2.0)),
                    BoxSpec::new("back", Extent::new(2.0, 1.0, 2.0)).with_route_order(1 + i),
                ],
            )
        })
        .collect();

    let packer = &packer;
    let results: Vec<Packing> = std::thread::scope(|scope| {
        let handles: Vec<_> = requests
            .iter()
            .map(|request| scope.spawn(move || packer.pack(request)))
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap().unwrap())
            .collect()
    });

    for packing in &results {
        assert_valid_packing(packing);
        assert_eq!(packing.placement("front").unwrap().depth_from_door, 0);
        assert_eq!(packing.placement("back").unwrap().depth_from_door, 4);
    }
}

struct CountingSolver {
    calls: AtomicUsize,
}

impl CpSolver for CountingSolver {
    fn solve(&self, model: &CpModel, config: &SolverConfig) -> CpSolution {
        self.calls.fetch_add(1, Ordering::SeqCst);
        SimpleCpSolver::new().solve(model, config)
    }
}

struct StalledSolver;

impl CpSolver for StalledSolver {
    fn solve(&self, _model: &CpModel, _config: &SolverConfig) -> CpSolution {
        CpSolution::without_solution(SolveStatus::Unknown, 0, 0)
    }
}

#[test]
fn test_custom_solver_backend() {
    let counting = CountingSolver {
        calls: AtomicUsize::new(0),
    };
    let packer = TruckPacker::with_solver(&counting);
    packer.pack(&scenario_a([0, 0, 1, 2])).unwrap();
    assert_eq!(counting.calls.load(Ordering::SeqCst), 1);

    let request = scenario_a([0, 0, 1, 2]).with_time_limit(1500);
    let err = TruckPacker::with_solver(StalledSolver).pack(&request).unwrap_err();
    assert_eq!(err, PackError::Timeout(1500));
}

#[test]
fn test_service_json_round_trip() {
    let problem: ProblemDto = serde_json::from_str(
        r#"{
            "truck": [4, 5, 5],
            "boxes": [
                {"box_id": "1", "size": [2, 1, 3], "route_order": 0},
                {"box_id": "2", "size": [4, 2, 1]},
                {"box_id": "3", "size": [1, 4, 4], "route_order": 1},
                {"box_id": "4", "size": [3, 2, 2], "route_order": 2}
            ]
        }"#,
    )
    .unwrap();
    assert_eq!(problem.boxes[1].route_order, 0);

    let packing = pack_problem(&problem).unwrap();
    let ids: Vec<&str> = packing.boxes.iter().map(|b| b.box_id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2", "3", "4"]);
    assert_eq!(packing.boxes[2].size, [1.0, 4.0, 4.0]);

    let text = serde_json::to_string(&packing).unwrap();
    let parsed: PackingDto = serde_json::from_str(&text).unwrap();
    assert_eq!(parsed, packing);
}

#[test]
fn test_service_rejects_unsized_box() {
    let problem: ProblemDto = serde_json::from_str(
        r#"{"truck": [4, 5, 5], "boxes": [{"box_id": "x", "route_order": 0}]}"#,
    )
    .unwrap();
    let err = pack_problem(&problem).unwrap_err();
    assert_eq!(err.kind, ServiceErrorKind::BadRequest);
    assert_eq!(err.status_code(), 400);
}
