//! The coordinator-side mesh cell store.
//!
//! [`MeshCellSet`] is the authoritative, un-partitioned mesh: bulk cells,
//! lower-dimensional boundary cells, the node coordinate table and the
//! physical-group catalog. It only ever exists on the coordinator rank; the
//! workers receive [`MeshCell`] records through the distribution protocol.
//!
//! Bulk cells are numbered `1..=BulkElmtsNum` and boundary cells continue
//! after them, so the bulk element id doubles as the index into the
//! partition assignment and the elemental DOF table.

use crate::mesh_error::MeshError;
use crate::topology::cell_type::CellType;
use crate::topology::physical::{NodalGroup, PhysicalGroup, PhysicalGroups};
use crate::topology::point::{CellId, NodeId};
use itertools::Itertools;

/// A single mesh cell together with everything a worker needs to assemble it.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MeshCell {
    /// Global element id.
    pub id: CellId,
    pub cell_type: CellType,
    pub dim: u8,
    /// Connectivity in local node order.
    pub nodes: Vec<NodeId>,
    /// Id of the elemental physical group the cell belongs to.
    pub phys_id: usize,
    /// Nodal coordinates, one entry per connectivity node.
    pub coords: Vec<[f64; 3]>,
    /// Global dof ids of the cell, filled in place by the dof handler.
    pub dof_ids: Vec<usize>,
}

impl MeshCell {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn vtk_id(&self) -> u8 {
        self.cell_type.vtk_id()
    }
}

/// The full, un-partitioned mesh.
///
/// A deserialized mesh is rebuilt through [`MeshCellSetBuilder`], so it
/// carries the same guarantees as a generated one.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "RawMeshCellSet")]
pub struct MeshCellSet {
    bulk: Vec<MeshCell>,
    boundary: Vec<MeshCell>,
    coords: Vec<[f64; 3]>,
    groups: PhysicalGroups,
    max_dim: u8,
    min_dim: u8,
}

impl MeshCellSet {
    /// Total number of nodes.
    pub fn nodes_num(&self) -> usize {
        self.coords.len()
    }

    /// Number of bulk (highest-dimension) elements.
    pub fn bulk_elmts_num(&self) -> usize {
        self.bulk.len()
    }

    /// Number of elements, bulk and boundary.
    pub fn elmts_num(&self) -> usize {
        self.bulk.len() + self.boundary.len()
    }

    pub fn max_dim(&self) -> u8 {
        self.max_dim
    }

    pub fn min_dim(&self) -> u8 {
        self.min_dim
    }

    pub fn bulk_cells(&self) -> &[MeshCell] {
        &self.bulk
    }

    pub fn boundary_cells(&self) -> &[MeshCell] {
        &self.boundary
    }

    pub fn groups(&self) -> &PhysicalGroups {
        &self.groups
    }

    /// Coordinate table indexed by `NodeId::index`.
    pub fn coords(&self) -> &[[f64; 3]] {
        &self.coords
    }

    pub fn node_coords(&self, node: NodeId) -> Option<[f64; 3]> {
        self.coords.get(node.index()).copied()
    }

    /// Look up any cell by its global id.
    pub fn cell(&self, id: CellId) -> Option<&MeshCell> {
        let idx = id.index();
        if idx < self.bulk.len() {
            self.bulk.get(idx)
        } else {
            self.boundary.get(idx - self.bulk.len())
        }
    }

    /// Largest node count over the bulk cells.
    pub fn nodes_per_bulk_elmt(&self) -> usize {
        self.bulk.iter().map(MeshCell::node_count).max().unwrap_or(0)
    }

    /// The bulk cell type if every bulk cell has the same one.
    pub fn bulk_cell_type(&self) -> Option<CellType> {
        let first = self.bulk.first()?.cell_type;
        self.bulk
            .iter()
            .all(|c| c.cell_type == first)
            .then_some(first)
    }

    pub fn is_homogeneous(&self) -> bool {
        self.bulk_cell_type().is_some()
    }

    /// Minimum number of shared nodes that makes two bulk cells neighbours.
    pub fn face_node_count(&self) -> usize {
        match self.max_dim {
            0 | 1 => 1,
            _ => self
                .bulk
                .iter()
                .map(|c| c.cell_type.face_node_count())
                .min()
                .unwrap_or(1),
        }
    }

    /// Elemental group by name, or a configuration error naming `context`.
    pub fn elemental_group(&self, name: &str, context: &str) -> Result<&PhysicalGroup, MeshError> {
        self.groups
            .elemental_by_name(name)
            .ok_or_else(|| MeshError::UnknownPhysicalGroup {
                name: name.to_string(),
                context: context.to_string(),
            })
    }

    /// Nodal group by name, or a configuration error naming `context`.
    pub fn nodal_group(&self, name: &str, context: &str) -> Result<&NodalGroup, MeshError> {
        self.groups
            .nodal_by_name(name)
            .ok_or_else(|| MeshError::UnknownPhysicalGroup {
                name: name.to_string(),
                context: context.to_string(),
            })
    }

    /// Cells of an elemental group, in group order.
    pub fn group_cells<'a>(
        &'a self,
        group: &'a PhysicalGroup,
    ) -> impl Iterator<Item = &'a MeshCell> + 'a {
        group.cells.iter().filter_map(move |&id| self.cell(id))
    }

    /// Sorted, deduplicated node set touched by the cells of a group.
    pub fn group_node_set(&self, group: &PhysicalGroup) -> Vec<NodeId> {
        self.group_cells(group)
            .flat_map(|c| c.nodes.iter().copied())
            .sorted_unstable()
            .dedup()
            .collect()
    }
}

#[derive(serde::Deserialize)]
struct RawMeshCellSet {
    bulk: Vec<MeshCell>,
    boundary: Vec<MeshCell>,
    coords: Vec<[f64; 3]>,
    groups: PhysicalGroups,
}

impl TryFrom<RawMeshCellSet> for MeshCellSet {
    type Error = MeshError;

    fn try_from(raw: RawMeshCellSet) -> Result<Self, Self::Error> {
        let mut b = MeshCellSetBuilder::new();
        b.add_nodes(raw.coords);
        for g in raw.groups.elemental() {
            b.add_elemental_group(g.id, g.name.clone(), g.dim)?;
        }
        for g in raw.groups.nodal() {
            b.add_nodal_group(g.id, g.name.clone(), g.nodes.iter().map(|n| n.get()).collect())?;
        }
        for (idx, cell) in raw.bulk.iter().chain(raw.boundary.iter()).enumerate() {
            if cell.id.index() != idx {
                return Err(MeshError::InvalidMesh(format!(
                    "cell {} stored at position {}",
                    cell.id,
                    idx + 1
                )));
            }
        }
        let raw_nodes = |c: &MeshCell| c.nodes.iter().map(|n| n.get()).collect::<Vec<_>>();
        for c in &raw.bulk {
            b.add_bulk_cell(c.cell_type, &raw_nodes(c), c.phys_id);
        }
        for c in &raw.boundary {
            b.add_boundary_cell(c.cell_type, &raw_nodes(c), c.phys_id);
        }
        let mesh = b.build()?;
        for g in raw.groups.elemental() {
            let rebuilt = mesh.elemental_group(&g.name, "mesh import")?;
            if rebuilt.cells != g.cells {
                return Err(MeshError::InvalidMesh(format!(
                    "group `{}` lists cells that do not carry its id",
                    g.name
                )));
            }
        }
        Ok(mesh)
    }
}

/// Incremental builder for [`MeshCellSet`] that assigns ids and enforces the
/// mesh invariants on [`MeshCellSetBuilder::build`].
#[derive(Clone, Debug, Default)]
pub struct MeshCellSetBuilder {
    coords: Vec<[f64; 3]>,
    bulk: Vec<(CellType, Vec<u64>, usize)>,
    boundary: Vec<(CellType, Vec<u64>, usize)>,
    groups: PhysicalGroups,
    nodal: Vec<(usize, String, Vec<u64>)>,
}

impl MeshCellSetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node and return its id.
    pub fn add_node(&mut self, xyz: [f64; 3]) -> NodeId {
        self.coords.push(xyz);
        NodeId::from_index(self.coords.len() - 1)
    }

    pub fn add_nodes(&mut self, xyz: impl IntoIterator<Item = [f64; 3]>) {
        self.coords.extend(xyz);
    }

    pub fn add_elemental_group(
        &mut self,
        id: usize,
        name: impl Into<String>,
        dim: u8,
    ) -> Result<&mut Self, MeshError> {
        self.groups.add_elemental(id, name, dim)?;
        Ok(self)
    }

    pub fn add_nodal_group(
        &mut self,
        id: usize,
        name: impl Into<String>,
        nodes: Vec<u64>,
    ) -> Result<&mut Self, MeshError> {
        let name = name.into();
        if self.nodal.iter().any(|(i, n, _)| *i == id || *n == name) {
            return Err(MeshError::DuplicatePhysicalGroup { name, id });
        }
        self.nodal.push((id, name, nodes));
        Ok(self)
    }

    /// Append a bulk cell (raw 1-based node ids) belonging to group `phys_id`.
    pub fn add_bulk_cell(&mut self, cell_type: CellType, nodes: &[u64], phys_id: usize) {
        self.bulk.push((cell_type, nodes.to_vec(), phys_id));
    }

    /// Append a lower-dimensional boundary cell belonging to group `phys_id`.
    pub fn add_boundary_cell(&mut self, cell_type: CellType, nodes: &[u64], phys_id: usize) {
        self.boundary.push((cell_type, nodes.to_vec(), phys_id));
    }

    /// Validate and freeze the mesh.
    pub fn build(self) -> Result<MeshCellSet, MeshError> {
        let MeshCellSetBuilder {
            coords,
            bulk,
            boundary,
            mut groups,
            nodal,
        } = self;

        let nodes_num = coords.len();
        let max_dim = bulk
            .iter()
            .map(|(ty, ..)| ty.dimension())
            .max()
            .ok_or_else(|| MeshError::InvalidMesh("mesh has no bulk cell".into()))?;

        let make_cell = |idx: usize,
                         cell_type: CellType,
                         raw: Vec<u64>,
                         phys_id: usize|
         -> Result<MeshCell, MeshError> {
            let id = CellId::from_index(idx);
            if raw.len() != cell_type.node_count() {
                return Err(MeshError::InvalidMesh(format!(
                    "cell {id} ({cell_type:?}) has {} nodes, expected {}",
                    raw.len(),
                    cell_type.node_count()
                )));
            }
            let nodes = raw
                .iter()
                .map(|&n| match NodeId::new(n) {
                    Ok(node) if node.index() < nodes_num => Ok(node),
                    _ => Err(MeshError::InvalidMesh(format!(
                        "cell {id} references node {n}, valid range is [1, {nodes_num}]"
                    ))),
                })
                .collect::<Result<Vec<_>, _>>()?;
            let cell_coords = nodes.iter().map(|n| coords[n.index()]).collect();
            Ok(MeshCell {
                id,
                cell_type,
                dim: cell_type.dimension(),
                nodes,
                phys_id,
                coords: cell_coords,
                dof_ids: Vec::new(),
            })
        };

        let mut bulk_cells = Vec::with_capacity(bulk.len());
        for (idx, (ty, raw, phys)) in bulk.into_iter().enumerate() {
            if ty.dimension() != max_dim {
                return Err(MeshError::InvalidMesh(format!(
                    "bulk cell {} has dimension {}, mesh dimension is {max_dim}",
                    idx + 1,
                    ty.dimension()
                )));
            }
            bulk_cells.push(make_cell(idx, ty, raw, phys)?);
        }
        let offset = bulk_cells.len();
        let mut boundary_cells = Vec::with_capacity(boundary.len());
        for (idx, (ty, raw, phys)) in boundary.into_iter().enumerate() {
            if ty.dimension() >= max_dim {
                return Err(MeshError::InvalidMesh(format!(
                    "boundary cell {} has dimension {}, must be below {max_dim}",
                    offset + idx + 1,
                    ty.dimension()
                )));
            }
            boundary_cells.push(make_cell(offset + idx, ty, raw, phys)?);
        }

        for cell in bulk_cells.iter().chain(boundary_cells.iter()) {
            let group = groups.elemental_by_id(cell.phys_id).ok_or_else(|| {
                MeshError::UnknownPhysicalGroup {
                    name: format!("#{}", cell.phys_id),
                    context: format!("cell {}", cell.id),
                }
            })?;
            if group.dim != cell.dim {
                return Err(MeshError::InvalidMesh(format!(
                    "cell {} has dimension {} but its group `{}` has dimension {}",
                    cell.id, cell.dim, group.name, group.dim
                )));
            }
            groups.push_cell(cell.phys_id, cell.id)?;
        }

        for (id, name, raw) in nodal {
            let nodes = raw
                .iter()
                .map(|&n| match NodeId::new(n) {
                    Ok(node) if node.index() < nodes_num => Ok(node),
                    _ => Err(MeshError::InvalidMesh(format!(
                        "nodal group `{name}` references node {n}, valid range is [1, {nodes_num}]"
                    ))),
                })
                .collect::<Result<Vec<_>, _>>()?;
            groups.add_nodal(id, name, nodes)?;
        }

        let min_dim = boundary_cells
            .iter()
            .map(|c| c.dim)
            .min()
            .unwrap_or(max_dim);

        log::debug!(
            "mesh built: {nodes_num} nodes, {} bulk cells, {} boundary cells, dim {min_dim}..{max_dim}",
            bulk_cells.len(),
            boundary_cells.len()
        );

        Ok(MeshCellSet {
            bulk: bulk_cells,
            boundary: boundary_cells,
            coords,
            groups,
            max_dim,
            min_dim,
        })
    }
}
