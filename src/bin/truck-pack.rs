//! Truck packing CLI

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use u_truckpack::packer::{PackingKpi, TruckPacker};
use u_truckpack::render::{render_layers, render_placements};
use u_truckpack::service::{BoxDto, PackingService, ProblemDto};

#[derive(Parser)]
#[command(name = "truck-pack")]
#[command(about = "Route-aware truck loading")]
#[command(version)]
struct Cli {
    /// Problem file (JSON); packs the built-in demo when omitted
    #[arg(short, long)]
    problem: Option<PathBuf>,

    /// Maximum number of grid voxels
    #[arg(short, long, default_value = "1000")]
    voxel_limit: u64,

    /// Solver time limit in seconds (0 = unlimited)
    #[arg(short, long, default_value = "60")]
    time_limit: u64,

    /// Print the packing as JSON instead of text
    #[arg(long)]
    json: bool,
}

fn demo_problem() -> ProblemDto {
    let boxes = [
        ("1", [2.0, 1.0, 3.0], 0),
        ("2", [4.0, 2.0, 1.0], 0),
        ("3", [1.0, 4.0, 4.0], 1),
        ("4", [3.0, 2.0, 2.0], 2),
    ];
    ProblemDto {
        truck: [4.0, 5.0, 5.0],
        boxes: boxes
            .into_iter()
            .map(|(id, size, route_order)| BoxDto {
                box_id: id.into(),
                size: Some(size),
                route_order,
            })
            .collect(),
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let problem = match &cli.problem {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?
        }
        None => demo_problem(),
    };

    let time_limit_ms = cli.time_limit.saturating_mul(1000);

    if cli.json {
        let packing = PackingService::new()
            .with_voxel_limit(cli.voxel_limit)
            .with_time_limit(time_limit_ms)
            .pack(&problem)?;
        println!("{}", serde_json::to_string_pretty(&packing)?);
        return Ok(());
    }

    println!("Boxes:");
    for b in &problem.boxes {
        match b.size {
            Some([w, h, l]) => println!("Box {} ({}×{}×{}, stop {})", b.box_id, w, h, l, b.route_order),
            None => println!("Box {} (unsized, stop {})", b.box_id, b.route_order),
        }
    }

    // Text output needs the grid, so go through the core packer directly
    let request = problem.to_request(cli.voxel_limit, time_limit_ms)?;
    let packing = TruckPacker::new()
        .pack(&request)
        .context("unable to find a solution")?;

    let kpi = PackingKpi::calculate(&packing);

    println!();
    println!("Solution{}", if packing.optimal { "" } else { " (not proven optimal)" });
    print!("{}", render_placements(&packing));
    println!();
    println!(
        "Grid {}: {} of {} voxels used ({:.1}%), {} route inversions",
        packing.grid,
        kpi.occupied_voxels,
        packing.grid.volume(),
        kpi.grid_utilization * 100.0,
        kpi.route_inversions
    );
    println!();
    print!("{}", render_layers(&packing));

    Ok(())
}
