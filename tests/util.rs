#![allow(dead_code)]
use std::thread;

use mesh_dofmap::algs::communicator::LocalComm;
use mesh_dofmap::algs::pipeline::{DofPipeline, PipelineConfig, RankSetup};
use mesh_dofmap::data::{ActiveDomainRule, DofCatalog, DofHandler};
use mesh_dofmap::mesh_error::MeshError;
use mesh_dofmap::mesh_generation::{ALL_DOMAIN, interval_mesh};
use mesh_dofmap::topology::cell_type::CellType;
use mesh_dofmap::topology::mesh::MeshCellSet;
use mesh_dofmap::topology::point::{CellId, NodeId};

pub fn node(i: u64) -> NodeId {
    NodeId::new(i).unwrap()
}

pub fn cell(i: u64) -> CellId {
    CellId::new(i).unwrap()
}

pub fn raw(nodes: &[NodeId]) -> Vec<u64> {
    nodes.iter().map(|n| n.get()).collect()
}

/// 4 Edge2 cells on [0, 1]: nodes 1..=5, groups `left`, `right`, `alldomain`.
pub fn bar4() -> MeshCellSet {
    interval_mesh(4, 0.0, 1.0, CellType::Edge2).unwrap()
}

/// Handler with `dofs` declared in order, all active on `alldomain`.
pub fn handler(dofs: &[&str]) -> DofHandler {
    let mut h = DofHandler::new(DofCatalog::from_names(dofs.iter().copied()).unwrap());
    h.add_active_domain(ActiveDomainRule::new(ALL_DOMAIN, dofs.iter().copied()));
    h
}

/// Run the whole pipeline on a `LocalComm` world, rank 0 on this thread.
/// Results come back in rank order.
pub fn run_world(
    world: usize,
    mesh: MeshCellSet,
    cfg: &PipelineConfig,
    handler: &DofHandler,
) -> Vec<Result<RankSetup, MeshError>> {
    let mut comms = LocalComm::world(world).into_iter();
    let coordinator = comms.next().expect("world has at least one rank");
    let workers: Vec<_> = comms
        .map(|comm| {
            let mut p = DofPipeline::new(cfg.clone(), handler.clone());
            thread::spawn(move || p.run(&comm, None))
        })
        .collect();
    let mut p = DofPipeline::new(cfg.clone(), handler.clone());
    let mut out = vec![p.run(&coordinator, Some(mesh))];
    out.extend(workers.into_iter().map(|h| h.join().expect("worker panicked")));
    out
}
