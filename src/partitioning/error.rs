//! Partitioning errors for mesh-dofmap

use thiserror::Error;

/// Errors from the partitioning step. All of them are fatal for the run.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PartitionError {
    /// Zero ranks were requested.
    #[error("cannot partition onto zero ranks")]
    ZeroRanks,
    /// The mesh has no bulk element to place.
    #[error("mesh has no bulk element to partition")]
    EmptyMesh,
    /// A graph partition cannot fill more ranks than there are elements.
    #[error(
        "the mesh number (={elements}) is less than the total ranks (={ranks}), \
         graph partitioning will not work for this"
    )]
    TooManyRanks { ranks: usize, elements: usize },
    /// A backend left a rank without any element.
    #[error("rank {0} owns no element after graph partitioning")]
    EmptyRank(usize),
    /// The assignment does not cover every bulk element exactly once.
    #[error("assignment covers {got} elements, mesh has {expected}")]
    LengthMismatch { expected: usize, got: usize },
    /// An element was assigned to a rank outside `[0, worldSize)`.
    #[error("element {element} assigned to rank {rank}, world size is {world}")]
    RankOutOfRange {
        element: usize,
        rank: usize,
        world: usize,
    },
    /// The requested backend was not compiled in.
    #[error("partitioner backend `{0}` is not available in this build")]
    BackendUnavailable(&'static str),
    /// Other errors (e.g. METIS wrapper failures)
    #[error("partitioner error: {0}")]
    Backend(String),
}
