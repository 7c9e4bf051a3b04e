#![cfg_attr(docsrs, feature(doc_cfg))]
//! # mesh-dofmap
//!
//! mesh-dofmap splits an unstructured finite-element mesh over the ranks of a
//! distributed run and assigns every rank a consistent global numbering of
//! its degrees of freedom.
//!
//! ## Pipeline
//! 1. [`partitioning::partition`] assigns every bulk cell to a rank, either by
//!    contiguous slicing or over the dual graph (built-in greedy growing or
//!    METIS).
//! 2. [`algs::distribute`] streams each worker its cells, group slices and
//!    owned nodes as sequenced, checksummed frames.
//! 3. [`data::DofHandler`] numbers the active unknowns densely from
//!    active-domain rules and Dirichlet exclusions, and derives the per-cell
//!    dof lists and a sparsity estimate.
//! 4. [`algs::distribute_dofs`] slices those tables back out to every rank.
//!
//! [`algs::DofPipeline`] runs all four steps and aborts the whole world on
//! the first fatal error.
//!
//! ## Communication
//! Ranks talk through the blocking [`Communicator`](algs::communicator::Communicator)
//! trait: [`NoComm`](algs::communicator::NoComm) for serial runs,
//! [`LocalComm`](algs::communicator::LocalComm) for worlds of threads, and
//! `MpiComm` with the `mpi-support` feature.
//!
//! ## Determinism
//!
//! The built-in graph partitioner draws its seeds from a `SmallRng` seeded by
//! [`PartitionerConfig::rng_seed`](partitioning::PartitionerConfig), so a run
//! is reproducible for a fixed configuration.
//!
//! ## Usage
//!
//! ```toml
//! [dependencies]
//! mesh-dofmap = "0.3"
//! # Optional features:
//! # features = ["mpi-support","metis-support"]
//! ```

pub mod algs;
pub mod data;
pub mod mesh_error;
pub mod mesh_generation;
pub mod partitioning;
pub mod topology;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::algs::communicator::{Communicator, LocalComm, NoComm};
    #[cfg(feature = "mpi-support")]
    pub use crate::algs::communicator::MpiComm;
    pub use crate::algs::distribute::{CoordinatorSession, DistributionConfig, LocalCellSet};
    pub use crate::algs::dof_distribute::LocalDofMap;
    pub use crate::algs::pipeline::{DofPipeline, PipelineConfig, RankSetup};
    pub use crate::data::{
        ActiveDomainRule, DirichletKind, DirichletRule, DofCatalog, DofHandler, DofHandlerConfig,
        ElementalDofTable, GlobalDofMap, NodalDofTable, SparsityMode, SparsityProfile,
    };
    pub use crate::mesh_error::{ErrorCategory, MeshError};
    pub use crate::partitioning::{
        GraphBackend, PartitionAssignment, PartitionError, PartitionerConfig, PartitionerKind,
        partition,
    };
    pub use crate::topology::cell_type::CellType;
    pub use crate::topology::mesh::{MeshCell, MeshCellSet, MeshCellSetBuilder};
    pub use crate::topology::point::{CellId, NodeId};
}
