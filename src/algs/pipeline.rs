//! partition → distribute → number → slice, on every rank.
//!
//! The coordinator partitions the mesh, streams every worker its cells,
//! numbers the dofs over the full mesh and ships each worker its slice of
//! the tables. A final barrier keeps any rank from leaving before all ranks
//! hold a consistent numbering.
//!
//! There is no partial success: the rank that detects a failure logs the
//! diagnostic and aborts the world through [`Communicator::abort`].

use crate::algs::communicator::Communicator;
use crate::algs::distribute::{CoordinatorSession, DistributionConfig, LocalCellSet, distribute};
use crate::algs::dof_distribute::{LocalDofMap, distribute_dofs};
use crate::data::dof_handler::{DofHandler, DofHandlerConfig};
use crate::data::global_map::GlobalDofMap;
use crate::mesh_error::MeshError;
use crate::partitioning::{PartitionerConfig, partition};
use crate::topology::mesh::MeshCellSet;

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub partitioner: PartitionerConfig,
    pub distribution: DistributionConfig,
    pub dofs: DofHandlerConfig,
}

/// What one rank walks away with.
#[derive(Clone, Debug)]
pub struct RankSetup {
    pub cells: LocalCellSet,
    pub dofs: LocalDofMap,
    /// Coordinator only.
    pub session: Option<CoordinatorSession>,
    /// Coordinator only.
    pub global: Option<GlobalDofMap>,
}

pub struct DofPipeline {
    config: PipelineConfig,
    handler: DofHandler,
}

impl DofPipeline {
    pub fn new(config: PipelineConfig, mut handler: DofHandler) -> Self {
        handler.set_config(config.dofs.clone());
        Self { config, handler }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn handler(&self) -> &DofHandler {
        &self.handler
    }

    /// Run every stage for `comm.rank()`.
    ///
    /// `mesh` is required on the coordinator and ignored elsewhere. On error
    /// the world has already been aborted when this returns. The handler
    /// numbers once, so a second run on the coordinator fails.
    pub fn run<C: Communicator + ?Sized>(
        &mut self,
        comm: &C,
        mesh: Option<MeshCellSet>,
    ) -> Result<RankSetup, MeshError> {
        match self.stages(comm, mesh).and_then(|setup| {
            comm.barrier()?;
            Ok(setup)
        }) {
            Ok(setup) => Ok(setup),
            Err(err) => {
                fail(comm, &err);
                Err(err)
            }
        }
    }

    fn stages<C: Communicator + ?Sized>(
        &mut self,
        comm: &C,
        mesh: Option<MeshCellSet>,
    ) -> Result<RankSetup, MeshError> {
        let session = if comm.is_coordinator() {
            let mesh = mesh.ok_or_else(|| MeshError::Comm("coordinator has no mesh".into()))?;
            let assignment = partition(&mesh, comm.size(), &self.config.partitioner)?;
            Some(CoordinatorSession::new(mesh, assignment)?)
        } else {
            None
        };

        let mut cells = distribute(comm, session.as_ref(), &self.config.distribution)?;
        let global = match &session {
            Some(s) => Some(self.handler.assign_dofs(s.mesh())?),
            None => None,
        };
        let dofs = distribute_dofs(comm, session.as_ref(), global.as_ref(), &mut cells)?;
        Ok(RankSetup {
            cells,
            dofs,
            session,
            global,
        })
    }
}

fn fail<C: Communicator + ?Sized>(comm: &C, err: &MeshError) {
    if let MeshError::Aborted(code) = err {
        log::debug!("rank {} stopped: world aborted with code {code}", comm.rank());
        return;
    }
    log::error!(
        "rank {}: {:?} error: {err}",
        comm.rank(),
        err.category()
    );
    comm.abort(err.exit_code());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::communicator::{LocalComm, NoComm};
    use crate::data::{ActiveDomainRule, DofCatalog};
    use crate::mesh_generation::{ALL_DOMAIN, interval_mesh};
    use crate::partitioning::PartitionError;
    use crate::topology::cell_type::CellType;
    use std::thread;

    fn handler(dofs: &[&str]) -> DofHandler {
        let mut h = DofHandler::new(DofCatalog::from_names(dofs.iter().copied()).unwrap());
        h.add_active_domain(ActiveDomainRule::new(ALL_DOMAIN, dofs.iter().copied()));
        h
    }

    #[test]
    fn serial_run_on_nocomm() {
        let mesh = interval_mesh(4, 0.0, 1.0, CellType::Edge2).unwrap();
        let mut p = DofPipeline::new(PipelineConfig::default(), handler(&["u"]));
        let setup = p.run(&NoComm, Some(mesh)).unwrap();
        assert_eq!(setup.dofs.active_dofs, 5);
        assert_eq!(setup.cells.bulk.len(), 4);
        assert_eq!(setup.cells.bulk[0].dof_ids, vec![1, 2]);
        assert!(setup.session.is_some() && setup.global.is_some());
    }

    #[test]
    fn coordinator_failure_aborts_workers() {
        let world_size = 3;
        let mut world = LocalComm::world(world_size).into_iter();
        let coordinator = world.next().unwrap();
        let workers: Vec<_> = world
            .map(|comm| {
                thread::spawn(move || {
                    let mut p = DofPipeline::new(PipelineConfig::default(), handler(&["u"]));
                    p.run(&comm, None).map(|_| ())
                })
            })
            .collect();

        let mesh = interval_mesh(2, 0.0, 1.0, CellType::Edge2).unwrap();
        let cfg = PipelineConfig {
            partitioner: PartitionerConfig::graph(),
            ..Default::default()
        };
        let mut p = DofPipeline::new(cfg, handler(&["u"]));
        let err = p.run(&coordinator, Some(mesh)).unwrap_err();
        assert_eq!(
            err,
            MeshError::Partition(PartitionError::TooManyRanks {
                ranks: 3,
                elements: 2
            })
        );
        for h in workers {
            assert_eq!(h.join().unwrap(), Err(MeshError::Aborted(3)));
        }
    }

    #[test]
    fn config_from_json() {
        let cfg: PipelineConfig = serde_json::from_str(
            r#"{ "partitioner": { "kind": "graph" }, "dofs": { "sparsity": "exact" } }"#,
        )
        .unwrap();
        assert_eq!(cfg.partitioner.kind, crate::partitioning::PartitionerKind::Graph);
        assert_eq!(cfg.dofs.sparsity, crate::data::SparsityMode::Exact);
        assert!(!cfg.distribution.share_partition_vector);
    }
}
