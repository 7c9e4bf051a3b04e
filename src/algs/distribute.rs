//! Ship the partitioned mesh from the coordinator to every rank.
//!
//! The coordinator (rank 0) owns a [`CoordinatorSession`]: the full mesh and
//! its partition assignment. For every worker it builds that rank's
//! [`LocalCellSet`] and streams it over one [`FrameChannel`]; its own local
//! set is built in place. Workers never hold anything sized by the global
//! mesh beyond a handful of scalars, the per-rank element counts and, when
//! asked for, the partition vector.

use std::collections::BTreeMap;

use itertools::Itertools;

use crate::algs::channel::{FrameChannel, MESH_CHANNEL};
use crate::algs::communicator::Communicator;
use crate::algs::wire::{Payload, Topic};
use crate::mesh_error::MeshError;
use crate::partitioning::slicing::{slice_of, slice_range};
use crate::partitioning::{PartitionAssignment, PartitionError, PartitionId};
use crate::topology::mesh::{MeshCell, MeshCellSet};
use crate::topology::physical::GroupHeader;
use crate::topology::point::{CellId, NodeId};

/// Knobs of the distribution step.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct DistributionConfig {
    /// Also ship the full rank-per-element vector to every worker.
    pub share_partition_vector: bool,
}

/// Mesh-wide counts every rank knows about.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct GlobalCounts {
    pub nodes_num: usize,
    pub bulk_elmts_num: usize,
    pub elmts_num: usize,
    pub max_dim: u8,
    pub nodes_per_bulk_elmt: usize,
}

impl GlobalCounts {
    fn of(mesh: &MeshCellSet) -> Self {
        Self {
            nodes_num: mesh.nodes_num(),
            bulk_elmts_num: mesh.bulk_elmts_num(),
            elmts_num: mesh.elmts_num(),
            max_dim: mesh.max_dim(),
            nodes_per_bulk_elmt: mesh.nodes_per_bulk_elmt(),
        }
    }
}

/// The slice of the mesh owned by one rank.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LocalCellSet {
    pub rank: usize,
    pub world: usize,
    pub globals: GlobalCounts,
    pub elemental_headers: Vec<GroupHeader>,
    pub nodal_headers: Vec<GroupHeader>,
    /// Local members of each elemental group, by group name.
    pub elemental: BTreeMap<String, Vec<MeshCell>>,
    /// Local members of each nodal group, by group name.
    pub nodal: BTreeMap<String, Vec<NodeId>>,
    /// Bulk cells owned by this rank, ascending id.
    pub bulk: Vec<MeshCell>,
    /// Nodes touched by `bulk`: sorted, deduplicated.
    pub node_ids: Vec<NodeId>,
    /// Contiguous slice of `1..=NodesNum` this rank owns.
    pub owned_node_ids: Vec<NodeId>,
    pub owned_node_coords: Vec<[f64; 3]>,
    pub rank_element_counts: Vec<usize>,
    pub partition: Option<Vec<PartitionId>>,
}

impl LocalCellSet {
    pub fn bulk_cells(&self) -> &[MeshCell] {
        &self.bulk
    }

    pub fn bulk_cells_mut(&mut self) -> &mut [MeshCell] {
        &mut self.bulk
    }

    pub fn group_cells(&self, name: &str) -> Option<&[MeshCell]> {
        self.elemental.get(name).map(Vec::as_slice)
    }

    pub fn nodal_nodes(&self, name: &str) -> Option<&[NodeId]> {
        self.nodal.get(name).map(Vec::as_slice)
    }

    pub fn group_id(&self, name: &str) -> Option<usize> {
        self.elemental_headers
            .iter()
            .find(|h| h.name == name)
            .map(|h| h.id)
    }

    pub fn group_name(&self, id: usize) -> Option<&str> {
        self.elemental_headers
            .iter()
            .find(|h| h.id == id)
            .map(|h| h.name.as_str())
    }

    /// One-line description for the logs.
    pub fn summary(&self) -> String {
        format!(
            "rank {}/{}: {} of {} bulk cells, {} nodes touched, {} owned, {} elemental / {} nodal groups",
            self.rank,
            self.world,
            self.bulk.len(),
            self.globals.bulk_elmts_num,
            self.node_ids.len(),
            self.owned_node_ids.len(),
            self.elemental_headers.len(),
            self.nodal_headers.len()
        )
    }
}

/// Sorted, deduplicated node closure of a set of cells.
fn node_closure(cells: &[MeshCell]) -> Vec<NodeId> {
    cells
        .iter()
        .flat_map(|c| c.nodes.iter().copied())
        .sorted_unstable()
        .dedup()
        .collect()
}

/// Coordinator-only arena: the full mesh and how it is split.
///
/// It outlives distribution; the output layer reads whole-mesh geometry and
/// the rank-per-element export from here. The bulk cells of every rank are
/// bucketed once at construction, so serving all ranks stays linear in the
/// mesh size.
#[derive(Clone, Debug)]
pub struct CoordinatorSession {
    mesh: MeshCellSet,
    assignment: PartitionAssignment,
    buckets: Vec<Vec<CellId>>,
}

impl CoordinatorSession {
    pub fn new(mesh: MeshCellSet, assignment: PartitionAssignment) -> Result<Self, MeshError> {
        if assignment.len() != mesh.bulk_elmts_num() {
            return Err(PartitionError::LengthMismatch {
                expected: mesh.bulk_elmts_num(),
                got: assignment.len(),
            }
            .into());
        }
        let world = assignment.world_size();
        if let Some((i, &rank)) = assignment
            .as_slice()
            .iter()
            .enumerate()
            .find(|&(_, &r)| r >= world)
        {
            return Err(PartitionError::RankOutOfRange {
                element: i + 1,
                rank,
                world,
            }
            .into());
        }
        let buckets = assignment.buckets();
        Ok(Self {
            mesh,
            assignment,
            buckets,
        })
    }

    pub fn mesh(&self) -> &MeshCellSet {
        &self.mesh
    }

    pub fn assignment(&self) -> &PartitionAssignment {
        &self.assignment
    }

    pub fn world_size(&self) -> usize {
        self.assignment.world_size()
    }

    /// Rank-per-element vector, indexed by bulk cell index.
    pub fn rank_of_elements(&self) -> &[PartitionId] {
        self.assignment.as_slice()
    }

    /// Bulk cells owned by `rank`, ascending id.
    pub fn rank_cells(&self, rank: usize) -> &[CellId] {
        self.buckets.get(rank).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of bulk cells per rank.
    pub fn rank_counts(&self) -> Vec<usize> {
        self.buckets.iter().map(Vec::len).collect()
    }

    /// Build the local cell set of `rank`.
    ///
    /// Groups of the mesh dimension follow the partition assignment; lower
    /// dimensional groups and nodal groups are sliced contiguously.
    pub fn local_view(&self, rank: usize, cfg: &DistributionConfig) -> LocalCellSet {
        let mesh = &self.mesh;
        let world = self.world_size();
        let groups = mesh.groups();

        let bulk: Vec<MeshCell> = self
            .rank_cells(rank)
            .iter()
            .filter_map(|&id| mesh.cell(id).cloned())
            .collect();
        // a bulk cell belongs to exactly one group, the one named by its phys_id
        let mut by_group: BTreeMap<usize, Vec<MeshCell>> = BTreeMap::new();
        for cell in &bulk {
            by_group.entry(cell.phys_id).or_default().push(cell.clone());
        }

        let elemental = groups
            .elemental()
            .iter()
            .map(|g| {
                let cells: Vec<MeshCell> = if g.dim == mesh.max_dim() {
                    by_group.remove(&g.id).unwrap_or_default()
                } else {
                    slice_of(&g.cells, world, rank)
                        .iter()
                        .filter_map(|&id| mesh.cell(id).cloned())
                        .collect()
                };
                (g.name.clone(), cells)
            })
            .collect();
        let nodal = groups
            .nodal()
            .iter()
            .map(|g| (g.name.clone(), slice_of(&g.nodes, world, rank).to_vec()))
            .collect();

        let owned_node_ids: Vec<NodeId> = slice_range(mesh.nodes_num(), world, rank)
            .map(NodeId::from_index)
            .collect();
        let owned_node_coords = owned_node_ids
            .iter()
            .filter_map(|&n| mesh.node_coords(n))
            .collect();

        LocalCellSet {
            rank,
            world,
            globals: GlobalCounts::of(mesh),
            elemental_headers: groups.elemental_headers(),
            nodal_headers: groups.nodal_headers(),
            elemental,
            nodal,
            node_ids: node_closure(&bulk),
            bulk,
            owned_node_ids,
            owned_node_coords,
            rank_element_counts: self.rank_counts(),
            partition: cfg
                .share_partition_vector
                .then(|| self.assignment.as_slice().to_vec()),
        }
    }
}

fn ids(nodes: &[NodeId]) -> Vec<u64> {
    nodes.iter().map(|n| n.get()).collect()
}

fn header_payload(h: &GroupHeader) -> Payload {
    Payload::NameVectorMap {
        name: h.name.clone(),
        ids: vec![h.id as u64, u64::from(h.dim), h.global_len as u64],
    }
}

fn send_local<C: Communicator + ?Sized>(
    comm: &C,
    local: &LocalCellSet,
) -> Result<(), MeshError> {
    let mut ch = FrameChannel::new(comm, local.rank, MESH_CHANNEL);
    ch.send(Topic::Handshake, &Payload::Text(env!("CARGO_PKG_VERSION").into()))?;
    let g = &local.globals;
    ch.send_ints(
        Topic::GlobalScalars,
        vec![
            g.nodes_num as u64,
            g.bulk_elmts_num as u64,
            g.elmts_num as u64,
            u64::from(g.max_dim),
            g.nodes_per_bulk_elmt as u64,
            local.world as u64,
        ],
    )?;
    ch.send_ints(
        Topic::GroupCounts,
        vec![
            local.elemental_headers.len() as u64,
            local.nodal_headers.len() as u64,
        ],
    )?;
    for h in &local.elemental_headers {
        ch.send(Topic::ElementalHeader, &header_payload(h))?;
    }
    for h in &local.nodal_headers {
        ch.send(Topic::NodalHeader, &header_payload(h))?;
    }
    for h in &local.elemental_headers {
        let cells = local.elemental.get(&h.name).cloned().unwrap_or_default();
        ch.send(
            Topic::ElementalSlice,
            &Payload::NamedCellList {
                name: h.name.clone(),
                cells,
            },
        )?;
    }
    ch.send(Topic::BulkCells, &Payload::CellList(local.bulk.clone()))?;
    for h in &local.nodal_headers {
        let nodes = local.nodal.get(&h.name).map(|n| ids(n)).unwrap_or_default();
        ch.send(
            Topic::NodalSlice,
            &Payload::NameVectorMap {
                name: h.name.clone(),
                ids: nodes,
            },
        )?;
    }
    ch.send_ints(
        Topic::RankElementCounts,
        local.rank_element_counts.iter().map(|&c| c as u64).collect(),
    )?;
    if let Some(parts) = &local.partition {
        ch.send_ints(
            Topic::PartitionVector,
            parts.iter().map(|&p| p as u64).collect(),
        )?;
    }
    ch.send_ints(Topic::OwnedNodes, ids(&local.owned_node_ids))?;
    ch.send(
        Topic::OwnedNodeCoords,
        &Payload::RealVector(local.owned_node_coords.iter().flatten().copied().collect()),
    )?;
    Ok(())
}

fn to_usize(peer: usize, v: u64) -> Result<usize, MeshError> {
    usize::try_from(v).map_err(|_| MeshError::protocol(peer, format!("{v} overflows usize")))
}

fn to_nodes(peer: usize, raw: Vec<u64>) -> Result<Vec<NodeId>, MeshError> {
    raw.into_iter()
        .map(|n| NodeId::new(n).map_err(|_| MeshError::protocol(peer, "node id 0 on the wire")))
        .collect()
}

fn recv_header<C: Communicator + ?Sized>(
    ch: &mut FrameChannel<'_, C>,
    topic: Topic,
) -> Result<GroupHeader, MeshError> {
    let peer = ch.peer();
    let (name, fields) = ch.recv_name_map(topic)?;
    let [id, dim, len] = fields[..] else {
        return Err(MeshError::protocol(
            peer,
            format!("group header `{name}` has {} fields", fields.len()),
        ));
    };
    Ok(GroupHeader {
        id: to_usize(peer, id)?,
        name,
        dim: u8::try_from(dim).map_err(|_| MeshError::protocol(peer, "group dimension overflows"))?,
        global_len: to_usize(peer, len)?,
    })
}

fn receive_local<C: Communicator + ?Sized>(
    comm: &C,
    cfg: &DistributionConfig,
) -> Result<LocalCellSet, MeshError> {
    let mut ch = FrameChannel::new(comm, 0, MESH_CHANNEL);
    let version = ch.recv_text(Topic::Handshake)?;
    if version != env!("CARGO_PKG_VERSION") {
        return Err(MeshError::protocol(
            0,
            format!("coordinator runs version {version}, this rank {}", env!("CARGO_PKG_VERSION")),
        ));
    }
    let scalars = ch.recv_ints(Topic::GlobalScalars)?;
    let [nodes_num, bulk_elmts_num, elmts_num, max_dim, nodes_per_bulk_elmt, world] = scalars[..]
    else {
        return Err(MeshError::protocol(0, "global scalars frame has the wrong length"));
    };
    let world = to_usize(0, world)?;
    if world != comm.size() {
        return Err(MeshError::protocol(
            0,
            format!("mesh was partitioned for {world} ranks, world has {}", comm.size()),
        ));
    }
    let globals = GlobalCounts {
        nodes_num: to_usize(0, nodes_num)?,
        bulk_elmts_num: to_usize(0, bulk_elmts_num)?,
        elmts_num: to_usize(0, elmts_num)?,
        max_dim: u8::try_from(max_dim).map_err(|_| MeshError::protocol(0, "mesh dimension overflows"))?,
        nodes_per_bulk_elmt: to_usize(0, nodes_per_bulk_elmt)?,
    };

    let counts = ch.recv_ints(Topic::GroupCounts)?;
    let [n_elemental, n_nodal] = counts[..] else {
        return Err(MeshError::protocol(0, "group counts frame has the wrong length"));
    };
    let elemental_headers = (0..n_elemental)
        .map(|_| recv_header(&mut ch, Topic::ElementalHeader))
        .collect::<Result<Vec<_>, _>>()?;
    let nodal_headers = (0..n_nodal)
        .map(|_| recv_header(&mut ch, Topic::NodalHeader))
        .collect::<Result<Vec<_>, _>>()?;

    let mut elemental = BTreeMap::new();
    for h in &elemental_headers {
        let (name, cells) = ch.recv_named_cells(Topic::ElementalSlice)?;
        if name != h.name {
            return Err(MeshError::protocol(
                0,
                format!("slice of `{name}` arrived where `{}` was expected", h.name),
            ));
        }
        elemental.insert(name, cells);
    }
    let bulk = ch.recv_cells(Topic::BulkCells)?;
    let mut nodal = BTreeMap::new();
    for h in &nodal_headers {
        let (name, raw) = ch.recv_name_map(Topic::NodalSlice)?;
        if name != h.name {
            return Err(MeshError::protocol(
                0,
                format!("nodes of `{name}` arrived where `{}` was expected", h.name),
            ));
        }
        nodal.insert(name, to_nodes(0, raw)?);
    }
    let rank_element_counts = ch
        .recv_ints(Topic::RankElementCounts)?
        .into_iter()
        .map(|c| to_usize(0, c))
        .collect::<Result<Vec<_>, _>>()?;
    let partition = if cfg.share_partition_vector {
        let raw = ch.recv_ints(Topic::PartitionVector)?;
        Some(
            raw.into_iter()
                .map(|p| to_usize(0, p))
                .collect::<Result<Vec<_>, _>>()?,
        )
    } else {
        None
    };
    let owned_node_ids = to_nodes(0, ch.recv_ints(Topic::OwnedNodes)?)?;
    let flat = ch.recv_reals(Topic::OwnedNodeCoords)?;
    if flat.len() != 3 * owned_node_ids.len() {
        return Err(MeshError::protocol(
            0,
            format!("{} coordinates for {} owned nodes", flat.len(), owned_node_ids.len()),
        ));
    }
    let owned_node_coords = flat.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect();

    Ok(LocalCellSet {
        rank: comm.rank(),
        world,
        globals,
        elemental_headers,
        nodal_headers,
        elemental,
        nodal,
        node_ids: node_closure(&bulk),
        bulk,
        owned_node_ids,
        owned_node_coords,
        rank_element_counts,
        partition,
    })
}

/// Materialise this rank's [`LocalCellSet`].
///
/// # Arguments
/// - `comm`: the world; its size must match the partition
/// - `session`: the coordinator session, required on rank 0 and ignored elsewhere
/// - `cfg`: distribution options, identical on every rank
///
/// # Returns
/// The local cell set of `comm.rank()`. On rank 0 it is built in place after
/// every worker has been served.
pub fn distribute<C: Communicator + ?Sized>(
    comm: &C,
    session: Option<&CoordinatorSession>,
    cfg: &DistributionConfig,
) -> Result<LocalCellSet, MeshError> {
    if !comm.is_coordinator() {
        let local = receive_local(comm, cfg)?;
        log::debug!("{}", local.summary());
        return Ok(local);
    }
    let session = session.ok_or_else(|| MeshError::Comm("coordinator has no mesh session".into()))?;
    if session.world_size() != comm.size() {
        return Err(MeshError::Comm(format!(
            "mesh was partitioned for {} ranks, world has {}",
            session.world_size(),
            comm.size()
        )));
    }
    for rank in 1..comm.size() {
        let local = session.local_view(rank, cfg);
        send_local(comm, &local)?;
        log::debug!("sent {}", local.summary());
    }
    let local = session.local_view(0, cfg);
    log::info!("{}", local.summary());
    Ok(local)
}
