//! Structured Lagrange mesh generators with named boundary groups.
//!
//! Every generated mesh carries the bulk group [`ALL_DOMAIN`] and, per side
//! of the box, an elemental group of facet cells plus a nodal group of the
//! same name holding the side's nodes.

use crate::mesh_error::MeshError;
use crate::topology::cell_type::CellType;
use crate::topology::mesh::{MeshCellSet, MeshCellSetBuilder};

/// Bulk group name of generated meshes.
pub const ALL_DOMAIN: &str = "alldomain";
/// Boundary at minimum x.
pub const LEFT: &str = "left";
/// Boundary at maximum x.
pub const RIGHT: &str = "right";
/// Boundary at minimum y.
pub const BOTTOM: &str = "bottom";
/// Boundary at maximum y.
pub const TOP: &str = "top";
/// Boundary at minimum z.
pub const BACK: &str = "back";
/// Boundary at maximum z.
pub const FRONT: &str = "front";

fn invalid_geometry(message: impl Into<String>) -> MeshError {
    MeshError::InvalidMesh(message.into())
}

/// Register `sides` as elemental + nodal groups with ids `1..` and the bulk
/// group with the next id. Returns the bulk group id.
fn declare_groups(
    builder: &mut MeshCellSetBuilder,
    sides: &[(&str, u8, Vec<u64>)],
    bulk_dim: u8,
) -> Result<usize, MeshError> {
    for (i, (name, dim, nodes)) in sides.iter().enumerate() {
        builder.add_elemental_group(i + 1, *name, *dim)?;
        builder.add_nodal_group(i + 1, *name, nodes.clone())?;
    }
    let bulk_id = sides.len() + 1;
    builder.add_elemental_group(bulk_id, ALL_DOMAIN, bulk_dim)?;
    Ok(bulk_id)
}

/// Generate a 1D interval mesh with `n` elements over `[min, max]`.
///
/// `cell_type` must be one of the edge types; interior nodes of higher-order
/// edges are numbered along x together with the vertices.
pub fn interval_mesh(
    n: usize,
    min: f64,
    max: f64,
    cell_type: CellType,
) -> Result<MeshCellSet, MeshError> {
    if n == 0 {
        return Err(invalid_geometry("n must be positive"));
    }
    if max <= min {
        return Err(invalid_geometry("max must be greater than min"));
    }
    let order = match cell_type {
        CellType::Edge2 => 1,
        CellType::Edge3 => 2,
        CellType::Edge4 => 3,
        other => {
            return Err(invalid_geometry(format!(
                "{other:?} is not a 1D cell type"
            )));
        }
    };

    let nodes_num = n * order + 1;
    let dx = (max - min) / (nodes_num - 1) as f64;
    let mut b = MeshCellSetBuilder::new();
    b.add_nodes((0..nodes_num).map(|i| [min + dx * i as f64, 0.0, 0.0]));

    let bulk_id = declare_groups(
        &mut b,
        &[(LEFT, 0, vec![1]), (RIGHT, 0, vec![nodes_num as u64])],
        1,
    )?;
    for e in 0..n {
        let first = (e * order + 1) as u64;
        let last = first + order as u64;
        // VTK order: both end points first, then interior nodes
        let mut conn = vec![first, last];
        conn.extend(first + 1..last);
        b.add_bulk_cell(cell_type, &conn, bulk_id);
    }
    b.add_boundary_cell(CellType::Vertex, &[1], 1);
    b.add_boundary_cell(CellType::Vertex, &[nodes_num as u64], 2);
    b.build()
}

/// Generate a structured Quad4 mesh over `[min, max]` with `nx`×`ny` cells.
pub fn quad_mesh(nx: usize, ny: usize, min: [f64; 2], max: [f64; 2]) -> Result<MeshCellSet, MeshError> {
    if nx == 0 || ny == 0 {
        return Err(invalid_geometry("nx and ny must be positive"));
    }
    let dx = (max[0] - min[0]) / nx as f64;
    let dy = (max[1] - min[1]) / ny as f64;
    let stride = nx + 1;
    let id = |i: usize, j: usize| (j * stride + i + 1) as u64;

    let mut b = MeshCellSetBuilder::new();
    for j in 0..=ny {
        for i in 0..=nx {
            b.add_node([min[0] + dx * i as f64, min[1] + dy * j as f64, 0.0]);
        }
    }

    let left: Vec<u64> = (0..=ny).map(|j| id(0, j)).collect();
    let right: Vec<u64> = (0..=ny).map(|j| id(nx, j)).collect();
    let bottom: Vec<u64> = (0..=nx).map(|i| id(i, 0)).collect();
    let top: Vec<u64> = (0..=nx).map(|i| id(i, ny)).collect();
    let bulk_id = declare_groups(
        &mut b,
        &[
            (LEFT, 1, left.clone()),
            (RIGHT, 1, right.clone()),
            (BOTTOM, 1, bottom.clone()),
            (TOP, 1, top.clone()),
        ],
        2,
    )?;

    for j in 0..ny {
        for i in 0..nx {
            b.add_bulk_cell(
                CellType::Quad4,
                &[id(i, j), id(i + 1, j), id(i + 1, j + 1), id(i, j + 1)],
                bulk_id,
            );
        }
    }
    for (group, nodes) in [(1, &left), (2, &right), (3, &bottom), (4, &top)] {
        for pair in nodes.windows(2) {
            b.add_boundary_cell(CellType::Edge2, pair, group);
        }
    }
    b.build()
}

/// Generate a structured Hex8 mesh over `[min, max]` with `nx`×`ny`×`nz` cells.
pub fn hex_mesh(
    nx: usize,
    ny: usize,
    nz: usize,
    min: [f64; 3],
    max: [f64; 3],
) -> Result<MeshCellSet, MeshError> {
    if nx == 0 || ny == 0 || nz == 0 {
        return Err(invalid_geometry("nx, ny and nz must be positive"));
    }
    let h = [
        (max[0] - min[0]) / nx as f64,
        (max[1] - min[1]) / ny as f64,
        (max[2] - min[2]) / nz as f64,
    ];
    let id = |i: usize, j: usize, k: usize| (k * (ny + 1) * (nx + 1) + j * (nx + 1) + i + 1) as u64;

    let mut b = MeshCellSetBuilder::new();
    for k in 0..=nz {
        for j in 0..=ny {
            for i in 0..=nx {
                b.add_node([
                    min[0] + h[0] * i as f64,
                    min[1] + h[1] * j as f64,
                    min[2] + h[2] * k as f64,
                ]);
            }
        }
    }

    // Each side is a 2D lattice (a, b) → node id.
    type Side<'a> = (&'a str, usize, usize, Box<dyn Fn(usize, usize) -> u64 + 'a>);
    let sides: Vec<Side<'_>> = vec![
        (LEFT, ny, nz, Box::new(|a, c| id(0, a, c))),
        (RIGHT, ny, nz, Box::new(|a, c| id(nx, a, c))),
        (BOTTOM, nx, nz, Box::new(|a, c| id(a, 0, c))),
        (TOP, nx, nz, Box::new(|a, c| id(a, ny, c))),
        (BACK, nx, ny, Box::new(|a, c| id(a, c, 0))),
        (FRONT, nx, ny, Box::new(|a, c| id(a, c, nz))),
    ];

    let side_nodes: Vec<(&str, u8, Vec<u64>)> = sides
        .iter()
        .map(|(name, na, nb, f)| {
            let mut nodes: Vec<u64> = (0..=*nb)
                .flat_map(|c| (0..=*na).map(move |a| (a, c)))
                .map(|(a, c)| f(a, c))
                .collect();
            nodes.sort_unstable();
            (*name, 2, nodes)
        })
        .collect();
    let bulk_id = declare_groups(&mut b, &side_nodes, 3)?;

    for k in 0..nz {
        for j in 0..ny {
            for i in 0..nx {
                b.add_bulk_cell(
                    CellType::Hex8,
                    &[
                        id(i, j, k),
                        id(i + 1, j, k),
                        id(i + 1, j + 1, k),
                        id(i, j + 1, k),
                        id(i, j, k + 1),
                        id(i + 1, j, k + 1),
                        id(i + 1, j + 1, k + 1),
                        id(i, j + 1, k + 1),
                    ],
                    bulk_id,
                );
            }
        }
    }
    for (group, (_, na, nb, f)) in sides.iter().enumerate() {
        for c in 0..*nb {
            for a in 0..*na {
                b.add_boundary_cell(
                    CellType::Quad4,
                    &[f(a, c), f(a + 1, c), f(a + 1, c + 1), f(a, c + 1)],
                    group + 1,
                );
            }
        }
    }
    b.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_edge2_counts() {
        let mesh = interval_mesh(4, 0.0, 1.0, CellType::Edge2).unwrap();
        assert_eq!(mesh.nodes_num(), 5);
        assert_eq!(mesh.bulk_elmts_num(), 4);
        assert_eq!(mesh.elmts_num(), 6);
        let conn: Vec<u64> = mesh.bulk_cells()[0].nodes.iter().map(|n| n.get()).collect();
        assert_eq!(conn, vec![1, 2]);
        assert_eq!(mesh.groups().nodal_by_name(RIGHT).unwrap().nodes.len(), 1);
    }

    #[test]
    fn interval_edge3_puts_midpoint_last() {
        let mesh = interval_mesh(2, 0.0, 2.0, CellType::Edge3).unwrap();
        assert_eq!(mesh.nodes_num(), 5);
        let conn: Vec<u64> = mesh.bulk_cells()[1].nodes.iter().map(|n| n.get()).collect();
        assert_eq!(conn, vec![3, 5, 4]);
    }

    #[test]
    fn interval_rejects_2d_type() {
        assert!(interval_mesh(2, 0.0, 1.0, CellType::Quad4).is_err());
    }

    #[test]
    fn quad_mesh_boundaries() {
        let mesh = quad_mesh(3, 2, [0.0, 0.0], [3.0, 2.0]).unwrap();
        assert_eq!(mesh.nodes_num(), 12);
        assert_eq!(mesh.bulk_elmts_num(), 6);
        let bottom = mesh.elemental_group(BOTTOM, "test").unwrap();
        assert_eq!(bottom.cells.len(), 3);
        assert_eq!(mesh.face_node_count(), 2);
        assert_eq!(mesh.groups().nodal_by_name(LEFT).unwrap().nodes.len(), 3);
    }

    #[test]
    fn hex_mesh_counts() {
        let mesh = hex_mesh(2, 2, 2, [0.0; 3], [1.0; 3]).unwrap();
        assert_eq!(mesh.nodes_num(), 27);
        assert_eq!(mesh.bulk_elmts_num(), 8);
        assert_eq!(mesh.elmts_num(), 8 + 6 * 4);
        assert_eq!(mesh.face_node_count(), 4);
        assert_eq!(mesh.groups().nodal_by_name(FRONT).unwrap().nodes.len(), 9);
    }
}
