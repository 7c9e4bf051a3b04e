// Graph trait abstraction for partitioning
use rayon::iter::{IntoParallelIterator, ParallelIterator};

/// Undirected graph over dense vertex ids `0..vertex_count()`.
///
/// All methods are read-only so backends and metrics may walk the graph
/// from several threads at once.
pub trait PartitionableGraph: Sync {
    fn vertex_count(&self) -> usize;

    /// Neighbours of `v`, without `v` itself.
    fn neighbors(&self, v: usize) -> &[usize];

    /// Degree of a vertex (number of neighbors).
    fn degree(&self, v: usize) -> usize {
        self.neighbors(v).len()
    }

    /// Returns a parallel iterator over all undirected edges (u, v) with u < v.
    fn edges(&self) -> impl ParallelIterator<Item = (usize, usize)> + '_ {
        (0..self.vertex_count())
            .into_par_iter()
            .flat_map_iter(move |u| {
                self.neighbors(u)
                    .iter()
                    .copied()
                    .filter(move |&v| u < v)
                    .map(move |v| (u, v))
            })
    }
}
