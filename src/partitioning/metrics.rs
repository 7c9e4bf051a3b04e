//! Partitioning metrics utilities.
//!
//! Edge cut and load figures used for the partition summary in the logs and
//! by tests. None of them feed back into the assignment.

use super::PartitionId;
use super::graph_traits::PartitionableGraph;
use rayon::iter::ParallelIterator;

/// Computes the edge cut of a partitioning (O(E)).
///
/// The edge cut is the number of edges that cross between different parts.
pub fn edge_cut<G: PartitionableGraph>(g: &G, parts: &[PartitionId]) -> usize {
    g.edges().filter(|&(u, v)| parts[u] != parts[v]).count()
}

/// Number of elements per rank.
pub fn rank_loads(parts: &[PartitionId], world: usize) -> Vec<usize> {
    let mut loads = vec![0; world];
    for &p in parts {
        if let Some(l) = loads.get_mut(p) {
            *l += 1;
        }
    }
    loads
}

/// Ratio of the heaviest rank load to the mean load; 1.0 is perfect balance.
pub fn load_imbalance(loads: &[usize]) -> f64 {
    let total: usize = loads.iter().sum();
    if loads.is_empty() || total == 0 {
        return 1.0;
    }
    let mean = total as f64 / loads.len() as f64;
    let max = loads.iter().copied().max().unwrap_or(0) as f64;
    max / mean
}

/// Summary of one partition.
#[derive(Clone, Debug, PartialEq)]
pub struct PartitionMetrics {
    /// Cut edges of the dual graph, when one was built.
    pub edge_cut: Option<usize>,
    pub min_load: usize,
    pub max_load: usize,
    pub imbalance: f64,
}

impl PartitionMetrics {
    pub fn new(parts: &[PartitionId], world: usize, edge_cut: Option<usize>) -> Self {
        let loads = rank_loads(parts, world);
        Self {
            edge_cut,
            min_load: loads.iter().copied().min().unwrap_or(0),
            max_load: loads.iter().copied().max().unwrap_or(0),
            imbalance: load_imbalance(&loads),
        }
    }
}
