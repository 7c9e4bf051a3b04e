//! Build a CSR (compressed-sparse-row) *dual graph* of a mesh.
//
// Each bulk cell is a vertex; an undirected edge joins two cells sharing at
// least `k` nodes, where `k` is the node count of one facet of the bulk cell
// type (1 in 1-D, an edge in 2-D, a face in 3-D).
//
// Returned in METIS-ready CSR triples:
//
// * `xadj[i] .. xadj[i+1]`   = neighbour list of cell *i*
// * `adjncy`                 = concatenated neighbour vertices
// * `vwgt[i]`                = vertex weight, default = 1
//
// The dual graph is **symmetrised** (i↔j appear in both lists) and
// **self-free** (no loops). Vertex `i` is bulk cell `CellId(i + 1)`.

use hashbrown::HashMap;
use rayon::prelude::*;

use crate::partitioning::graph_traits::PartitionableGraph;
use crate::topology::mesh::MeshCellSet;

/// CSR triple
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DualGraph {
    pub xadj: Vec<usize>,
    pub adjncy: Vec<usize>,
    pub vwgt: Vec<i32>,
}

impl DualGraph {
    /// Dual graph of the bulk cells of `mesh`.
    ///
    /// `common_nodes` overrides the sharing threshold derived from the bulk
    /// cell type.
    pub fn from_mesh(mesh: &MeshCellSet, common_nodes: Option<usize>) -> Self {
        let k = common_nodes.unwrap_or_else(|| mesh.face_node_count()).max(1);
        let cells = mesh.bulk_cells();

        // node → bulk cells touching it
        let mut incident: Vec<Vec<usize>> = vec![Vec::new(); mesh.nodes_num()];
        for (e, cell) in cells.iter().enumerate() {
            for node in &cell.nodes {
                incident[node.index()].push(e);
            }
        }

        let adj: Vec<Vec<usize>> = (0..cells.len())
            .into_par_iter()
            .map(|e| {
                let mut shared: HashMap<usize, usize> = HashMap::new();
                for node in &cells[e].nodes {
                    for &other in &incident[node.index()] {
                        if other != e {
                            *shared.entry(other).or_insert(0) += 1;
                        }
                    }
                }
                let mut nbrs: Vec<usize> = shared
                    .into_iter()
                    .filter_map(|(other, n)| (n >= k).then_some(other))
                    .collect();
                nbrs.sort_unstable();
                nbrs
            })
            .collect();

        let mut xadj = Vec::with_capacity(adj.len() + 1);
        let mut adjncy = Vec::new();
        xadj.push(0);
        for nbrs in &adj {
            adjncy.extend_from_slice(nbrs);
            xadj.push(adjncy.len());
        }
        let vwgt = vec![1; adj.len()];

        log::debug!(
            "dual graph: {} vertices, {} edges, sharing threshold {k}",
            adj.len(),
            adjncy.len() / 2
        );
        DualGraph { xadj, adjncy, vwgt }
    }

    /// Number of undirected edges.
    pub fn edge_count(&self) -> usize {
        self.adjncy.len() / 2
    }
}

impl PartitionableGraph for DualGraph {
    fn vertex_count(&self) -> usize {
        self.xadj.len().saturating_sub(1)
    }

    fn neighbors(&self, v: usize) -> &[usize] {
        &self.adjncy[self.xadj[v]..self.xadj[v + 1]]
    }
}
