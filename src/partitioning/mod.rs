//! Entry-point for partitioning the bulk cells of a mesh across ranks.
//!
//! Two strategies sit behind [`partition`]:
//!
//! - [`PartitionerKind::Slice`]: contiguous slicing of the bulk cell ids
//!   ([`slicing`]). Permissive: with more ranks than cells some ranks end up
//!   empty.
//! - [`PartitionerKind::Graph`]: dual-graph partitioning through the built-in
//!   [`graph_growing`] backend or METIS. Strict: more ranks than cells is
//!   rejected up front and an empty rank afterwards is an error.
//!
//! Coverage checks run once here around both strategies.

pub mod error;
pub mod graph_growing;
pub mod graph_traits;
#[cfg(feature = "metis-support")]
pub mod metis;
pub mod metrics;
pub mod slicing;

#[cfg(test)]
mod tests;

pub use self::error::PartitionError;
pub use self::metrics::PartitionMetrics;

use crate::algs::dual_graph::DualGraph;
use crate::topology::mesh::MeshCellSet;
use crate::topology::point::CellId;

pub type PartitionId = usize;

/// Which partitioning strategy to run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartitionerKind {
    #[default]
    Slice,
    Graph,
}

/// Backend used by [`PartitionerKind::Graph`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphBackend {
    #[default]
    Builtin,
    Metis,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PartitionerConfig {
    pub kind: PartitionerKind,
    pub backend: GraphBackend,
    /// Minimum shared nodes for a dual-graph edge; derived from the bulk
    /// cell type when `None`.
    pub common_nodes: Option<usize>,
    pub rng_seed: u64,
    /// Boundary refinement sweeps of the built-in backend.
    pub refine_passes: usize,
}

impl Default for PartitionerConfig {
    fn default() -> Self {
        Self {
            kind: PartitionerKind::Slice,
            backend: GraphBackend::Builtin,
            common_nodes: None,
            rng_seed: 42,
            refine_passes: 4,
        }
    }
}

impl PartitionerConfig {
    pub fn graph() -> Self {
        Self {
            kind: PartitionerKind::Graph,
            ..Default::default()
        }
    }
}

/// Owning rank of every bulk cell, indexed by `CellId::index`.
///
/// Deserialization goes through [`PartitionAssignment::new`], so an imported
/// assignment is range checked like a computed one.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "RawAssignment")]
pub struct PartitionAssignment {
    world: usize,
    kind: PartitionerKind,
    ranks: Vec<PartitionId>,
}

#[derive(serde::Deserialize)]
struct RawAssignment {
    world: usize,
    kind: PartitionerKind,
    ranks: Vec<PartitionId>,
}

impl TryFrom<RawAssignment> for PartitionAssignment {
    type Error = PartitionError;

    fn try_from(raw: RawAssignment) -> Result<Self, Self::Error> {
        Self::new(raw.world, raw.kind, raw.ranks)
    }
}

impl PartitionAssignment {
    /// Wrap a rank vector, checking every entry is below `world`.
    pub fn new(
        world: usize,
        kind: PartitionerKind,
        ranks: Vec<PartitionId>,
    ) -> Result<Self, PartitionError> {
        if world == 0 {
            return Err(PartitionError::ZeroRanks);
        }
        if let Some((element, &rank)) = ranks.iter().enumerate().find(|&(_, &r)| r >= world) {
            return Err(PartitionError::RankOutOfRange {
                element: element + 1,
                rank,
                world,
            });
        }
        Ok(Self { world, kind, ranks })
    }

    pub fn world_size(&self) -> usize {
        self.world
    }

    pub fn kind(&self) -> PartitionerKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }

    /// Owning rank of a bulk cell.
    pub fn rank_of(&self, cell: CellId) -> Option<PartitionId> {
        self.ranks.get(cell.index()).copied()
    }

    pub fn as_slice(&self) -> &[PartitionId] {
        &self.ranks
    }

    /// Number of bulk cells per rank.
    pub fn rank_counts(&self) -> Vec<usize> {
        metrics::rank_loads(&self.ranks, self.world)
    }

    /// Bulk cells owned by `rank`, ascending. Scans the whole assignment;
    /// use [`Self::buckets`] to visit every rank.
    pub fn cells_of(&self, rank: PartitionId) -> impl Iterator<Item = CellId> + '_ {
        self.ranks
            .iter()
            .enumerate()
            .filter(move |&(_, &r)| r == rank)
            .map(|(i, _)| CellId::from_index(i))
    }

    /// Bulk cells of every rank in one pass, each bucket ascending.
    pub fn buckets(&self) -> Vec<Vec<CellId>> {
        let mut out = vec![Vec::new(); self.world];
        for (i, &r) in self.ranks.iter().enumerate() {
            if let Some(bucket) = out.get_mut(r) {
                bucket.push(CellId::from_index(i));
            }
        }
        out
    }

    pub fn into_vec(self) -> Vec<PartitionId> {
        self.ranks
    }
}

/// Assign every bulk cell of `mesh` to one of `world` ranks.
pub fn partition(
    mesh: &MeshCellSet,
    world: usize,
    cfg: &PartitionerConfig,
) -> Result<PartitionAssignment, PartitionError> {
    let n = mesh.bulk_elmts_num();
    if world == 0 {
        return Err(PartitionError::ZeroRanks);
    }
    if n == 0 {
        return Err(PartitionError::EmptyMesh);
    }
    if cfg.kind == PartitionerKind::Graph && world > n {
        return Err(PartitionError::TooManyRanks {
            ranks: world,
            elements: n,
        });
    }

    let mut cut = None;
    let parts = if world == 1 {
        vec![0; n]
    } else {
        match cfg.kind {
            PartitionerKind::Slice => {
                if world > n {
                    log::warn!("{world} ranks for {n} bulk cells: some ranks own no element");
                }
                slicing::slice_assignment(n, world)
            }
            PartitionerKind::Graph => {
                let graph = DualGraph::from_mesh(mesh, cfg.common_nodes);
                let parts = run_backend(&graph, world, cfg)?;
                if parts.len() == n {
                    cut = Some(metrics::edge_cut(&graph, &parts));
                }
                parts
            }
        }
    };

    if parts.len() != n {
        return Err(PartitionError::LengthMismatch {
            expected: n,
            got: parts.len(),
        });
    }
    let assignment = PartitionAssignment::new(world, cfg.kind, parts)?;
    if cfg.kind == PartitionerKind::Graph {
        if let Some(rank) = assignment.rank_counts().iter().position(|&c| c == 0) {
            return Err(PartitionError::EmptyRank(rank));
        }
    }

    let m = PartitionMetrics::new(assignment.as_slice(), world, cut);
    log::info!(
        "partitioned {n} bulk cells over {world} ranks ({:?}): load {}..{}, imbalance {:.3}",
        cfg.kind,
        m.min_load,
        m.max_load,
        m.imbalance
    );
    if let Some(cut) = m.edge_cut {
        log::debug!("dual graph edge cut: {cut}");
    }
    Ok(assignment)
}

fn run_backend(
    graph: &DualGraph,
    world: usize,
    cfg: &PartitionerConfig,
) -> Result<Vec<PartitionId>, PartitionError> {
    match cfg.backend {
        GraphBackend::Builtin => Ok(graph_growing::partition_graph(graph, world, cfg)),
        #[cfg(feature = "metis-support")]
        GraphBackend::Metis => metis::partition_graph(graph, world),
        #[cfg(not(feature = "metis-support"))]
        GraphBackend::Metis => Err(PartitionError::BackendUnavailable("metis")),
    }
}
