//! Re-export public algorithms.

pub mod channel;
pub mod communicator;
pub mod distribute;
pub mod dof_distribute;
pub mod dual_graph;
pub mod pipeline;
pub mod wire;

pub use distribute::{CoordinatorSession, DistributionConfig, LocalCellSet, distribute};
pub use dof_distribute::{LocalDofMap, distribute_dofs};
pub use pipeline::{DofPipeline, PipelineConfig, RankSetup};
