//! Text rendering of a packing.
//!
//! One block per height layer (bottom first), one row per length slice
//! (far wall first), one cell per width column. Empty cells show `×`.

use crate::models::{Packing, Voxel};

/// Label of an unoccupied voxel.
pub const EMPTY_CELL: &str = "×";

/// Renders one height layer.
pub fn render_layer(packing: &Packing, y: u32) -> String {
    let width = cell_width(packing);
    let mut out = String::new();
    for z in 0..packing.grid.length {
        let row: Vec<String> = (0..packing.grid.width)
            .map(|x| {
                let voxel = Voxel::new(i64::from(x), i64::from(y), i64::from(z));
                let label = packing.box_at(&voxel).unwrap_or(EMPTY_CELL);
                format!("{:<width$}", label, width = width)
            })
            .collect();
        out.push_str(row.join(" ").trim_end());
        out.push('\n');
    }
    out
}

/// Renders every height layer, separated by blank lines.
pub fn render_layers(packing: &Packing) -> String {
    (0..packing.grid.height)
        .map(|y| render_layer(packing, y))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Lists each box with its grid offset and real position.
pub fn render_placements(packing: &Packing) -> String {
    packing
        .boxes
        .iter()
        .map(|placed| {
            let p = placed.position;
            format!(
                "Box {} is at {} (position {:.3}, {:.3}, {:.3}; stop {}, depth {})\n",
                placed.box_id, placed.offset, p.x, p.y, p.z, placed.route_order, placed.depth_from_door
            )
        })
        .collect()
}

fn cell_width(packing: &Packing) -> usize {
    packing
        .boxes
        .iter()
        .map(|b| b.box_id.chars().count())
        .chain(std::iter::once(EMPTY_CELL.chars().count()))
        .max()
        .unwrap_or(1)
}
