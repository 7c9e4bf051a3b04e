//! Ship the coordinator's dof numbering to every rank.
//!
//! Runs after [`distribute`](crate::algs::distribute::distribute): every rank
//! already holds its [`LocalCellSet`]. The coordinator fills the `dof_ids`
//! of its own cells in place and sends each worker, over [`DOF_CHANNEL`]:
//!
//! 1. `DofScalars`: `[ActiveDofs, MaxDofsPerNode, MaxDofsPerElmt, MaxRowNNZ, MaxNNZ]`
//! 2. `NodalDofRows`: the nodal rows of the worker's `node_ids`, flattened
//! 3. `LocalCellDofs`: `[cell id, n, dof_1 .. dof_n]` per local bulk cell
//! 4. `SparsityRows`: `[dof, nnz]` pairs for the dofs of the owned nodes

use itertools::Itertools;

use crate::algs::channel::{DOF_CHANNEL, FrameChannel};
use crate::algs::communicator::Communicator;
use crate::algs::distribute::{CoordinatorSession, LocalCellSet};
use crate::algs::wire::Topic;
use crate::data::global_map::GlobalDofMap;
use crate::mesh_error::MeshError;
use crate::partitioning::slicing::slice_range;
use crate::topology::mesh::MeshCell;
use crate::topology::point::{CellId, NodeId};

/// The part of the global dof map one rank needs.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LocalDofMap {
    pub rank: usize,
    pub active_dofs: usize,
    pub max_dofs_per_node: usize,
    pub max_dofs_per_elmt: usize,
    pub max_row_nnz: usize,
    pub max_nnz: usize,
    /// Nodes with a row in this map, ascending.
    pub node_ids: Vec<NodeId>,
    rows: Vec<usize>,
    /// `(dof, nnz)` for every active dof of the owned nodes, ascending dof.
    pub owned_rows: Vec<(usize, usize)>,
}

impl LocalDofMap {
    /// Cut the rows of `node_ids` and the sparsity rows of `owned` out of `map`.
    pub fn slice(map: &GlobalDofMap, rank: usize, node_ids: &[NodeId], owned: &[NodeId]) -> Self {
        let rows = node_ids
            .iter()
            .flat_map(|&n| map.nodal.row(n).iter().copied())
            .collect();
        let owned_rows = owned
            .iter()
            .flat_map(|&n| map.nodal.row(n).iter().copied())
            .filter(|&d| d != 0)
            .map(|d| (d, map.sparsity.row(d)))
            .collect();
        Self {
            rank,
            active_dofs: map.active_dofs,
            max_dofs_per_node: map.max_dofs_per_node,
            max_dofs_per_elmt: map.max_dofs_per_elmt,
            max_row_nnz: map.sparsity.max_row_nnz,
            max_nnz: map.sparsity.max_nnz,
            node_ids: node_ids.to_vec(),
            rows,
            owned_rows,
        }
    }

    /// Global dof ids of `node`, one per catalog slot, `0` when inactive.
    pub fn node_dofs(&self, node: NodeId) -> Option<&[usize]> {
        let i = self.node_ids.binary_search(&node).ok()?;
        let m = self.max_dofs_per_node;
        self.rows.get(i * m..(i + 1) * m)
    }

    pub fn owned_row_nnz(&self, dof: usize) -> Option<usize> {
        self.owned_rows
            .binary_search_by_key(&dof, |&(d, _)| d)
            .ok()
            .map(|i| self.owned_rows[i].1)
    }

    /// Distinct active dofs touched by this rank.
    pub fn touched_dofs(&self) -> usize {
        self.rows.iter().filter(|&&d| d != 0).count()
    }

    pub fn summary(&self) -> String {
        format!(
            "rank {}: touches {} of {} dofs, owns {} rows",
            self.rank,
            self.touched_dofs(),
            self.active_dofs,
            self.owned_rows.len()
        )
    }
}

fn fill_cell_dofs(local: &mut LocalCellSet, map: &GlobalDofMap) {
    for cell in &mut local.bulk {
        if let Some(dofs) = map.elemental.get(cell.id) {
            cell.dof_ids = dofs.to_vec();
        }
    }
    copy_into_groups(local);
}

/// Group slices hold copies of bulk cells; give them the same dof ids.
fn copy_into_groups(local: &mut LocalCellSet) {
    let bulk = &local.bulk;
    for cells in local.elemental.values_mut() {
        for cell in cells.iter_mut() {
            if let Ok(i) = bulk.binary_search_by_key(&cell.id, |b| b.id) {
                cell.dof_ids.clone_from(&bulk[i].dof_ids);
            }
        }
    }
}

fn encode_cell_dofs<'a>(cells: impl Iterator<Item = (CellId, &'a [usize])>) -> Vec<u64> {
    let mut out = Vec::new();
    for (id, dofs) in cells {
        out.push(id.get());
        out.push(dofs.len() as u64);
        out.extend(dofs.iter().map(|&d| d as u64));
    }
    out
}

fn send_slice<C: Communicator + ?Sized>(
    comm: &C,
    session: &CoordinatorSession,
    map: &GlobalDofMap,
    rank: usize,
) -> Result<LocalDofMap, MeshError> {
    let mesh = session.mesh();
    let cells: Vec<&MeshCell> = session
        .rank_cells(rank)
        .iter()
        .filter_map(|&id| mesh.cell(id))
        .collect();
    let node_ids: Vec<NodeId> = cells
        .iter()
        .flat_map(|c| c.nodes.iter().copied())
        .sorted_unstable()
        .dedup()
        .collect();
    let owned: Vec<NodeId> = slice_range(mesh.nodes_num(), session.world_size(), rank)
        .map(NodeId::from_index)
        .collect();
    let slice = LocalDofMap::slice(map, rank, &node_ids, &owned);

    let mut ch = FrameChannel::new(comm, rank, DOF_CHANNEL);
    ch.send_ints(
        Topic::DofScalars,
        [
            slice.active_dofs,
            slice.max_dofs_per_node,
            slice.max_dofs_per_elmt,
            slice.max_row_nnz,
            slice.max_nnz,
        ]
        .iter()
        .map(|&v| v as u64)
        .collect(),
    )?;
    ch.send_ints(
        Topic::NodalDofRows,
        slice.rows.iter().map(|&d| d as u64).collect(),
    )?;
    ch.send_ints(
        Topic::LocalCellDofs,
        encode_cell_dofs(
            cells
                .iter()
                .map(|c| (c.id, map.elemental.get(c.id).unwrap_or(&[]))),
        ),
    )?;
    ch.send_ints(
        Topic::SparsityRows,
        slice
            .owned_rows
            .iter()
            .flat_map(|&(d, nnz)| [d as u64, nnz as u64])
            .collect(),
    )?;
    Ok(slice)
}

fn to_usize(v: u64) -> Result<usize, MeshError> {
    usize::try_from(v).map_err(|_| MeshError::protocol(0, format!("{v} overflows usize")))
}

fn apply_cell_dofs(local: &mut LocalCellSet, raw: &[u64]) -> Result<(), MeshError> {
    let mut rest = raw;
    for cell in &mut local.bulk {
        let [id, n, tail @ ..] = rest else {
            return Err(MeshError::protocol(
                0,
                format!("cell dof list ends before cell {}", cell.id),
            ));
        };
        if *id != cell.id.get() {
            return Err(MeshError::protocol(
                0,
                format!("dofs of cell {id} arrived where cell {} was expected", cell.id),
            ));
        }
        let n = to_usize(*n)?;
        if tail.len() < n {
            return Err(MeshError::protocol(0, format!("cell {id} dof list is truncated")));
        }
        let (dofs, tail) = tail.split_at(n);
        cell.dof_ids = dofs.iter().map(|&d| to_usize(d)).collect::<Result<_, _>>()?;
        rest = tail;
    }
    if !rest.is_empty() {
        return Err(MeshError::protocol(
            0,
            format!("{} trailing values after the last local cell", rest.len()),
        ));
    }
    copy_into_groups(local);
    Ok(())
}

fn receive_slice<C: Communicator + ?Sized>(
    comm: &C,
    local: &mut LocalCellSet,
) -> Result<LocalDofMap, MeshError> {
    let mut ch = FrameChannel::new(comm, 0, DOF_CHANNEL);
    let scalars = ch.recv_ints(Topic::DofScalars)?;
    let [active_dofs, max_dofs_per_node, max_dofs_per_elmt, max_row_nnz, max_nnz] = scalars[..]
    else {
        return Err(MeshError::protocol(0, "dof scalars frame has the wrong length"));
    };
    let max_dofs_per_node = to_usize(max_dofs_per_node)?;

    let rows = ch
        .recv_ints(Topic::NodalDofRows)?
        .into_iter()
        .map(to_usize)
        .collect::<Result<Vec<_>, _>>()?;
    if rows.len() != local.node_ids.len() * max_dofs_per_node {
        return Err(MeshError::protocol(
            0,
            format!(
                "{} nodal dof entries for {} local nodes of {max_dofs_per_node} slots",
                rows.len(),
                local.node_ids.len()
            ),
        ));
    }
    apply_cell_dofs(local, &ch.recv_ints(Topic::LocalCellDofs)?)?;

    let pairs = ch.recv_ints(Topic::SparsityRows)?;
    if pairs.len() % 2 != 0 {
        return Err(MeshError::protocol(0, "sparsity rows are not (dof, nnz) pairs"));
    }
    let owned_rows = pairs
        .chunks_exact(2)
        .map(|p| Ok((to_usize(p[0])?, to_usize(p[1])?)))
        .collect::<Result<Vec<_>, MeshError>>()?;

    Ok(LocalDofMap {
        rank: comm.rank(),
        active_dofs: to_usize(active_dofs)?,
        max_dofs_per_node,
        max_dofs_per_elmt: to_usize(max_dofs_per_elmt)?,
        max_row_nnz: to_usize(max_row_nnz)?,
        max_nnz: to_usize(max_nnz)?,
        node_ids: local.node_ids.clone(),
        rows,
        owned_rows,
    })
}

/// Hand every rank its slice of the dof numbering and fill the `dof_ids` of
/// its local cells in place.
///
/// `session` and `map` are required on the coordinator and ignored elsewhere.
pub fn distribute_dofs<C: Communicator + ?Sized>(
    comm: &C,
    session: Option<&CoordinatorSession>,
    map: Option<&GlobalDofMap>,
    local: &mut LocalCellSet,
) -> Result<LocalDofMap, MeshError> {
    if !comm.is_coordinator() {
        let slice = receive_slice(comm, local)?;
        log::debug!("{}", slice.summary());
        return Ok(slice);
    }
    let (Some(session), Some(map)) = (session, map) else {
        return Err(MeshError::Comm(
            "coordinator needs the mesh session and the global dof map".into(),
        ));
    };
    for rank in 1..comm.size() {
        let slice = send_slice(comm, session, map, rank)?;
        log::debug!("sent {}", slice.summary());
    }
    fill_cell_dofs(local, map);
    let slice = LocalDofMap::slice(map, 0, &local.node_ids, &local.owned_node_ids);
    log::info!("{}", slice.summary());
    Ok(slice)
}
