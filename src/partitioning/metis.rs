//! METIS k-way backend (feature `metis-support`).

use super::error::PartitionError;
use super::PartitionId;
use crate::algs::dual_graph::DualGraph;
use metis::Idx;

fn to_idx(v: usize) -> Result<Idx, PartitionError> {
    Idx::try_from(v)
        .map_err(|_| PartitionError::Backend(format!("{v} does not fit the METIS index type")))
}

/// Partition the dual graph into `nparts` parts with `METIS_PartGraphKway`.
pub fn partition_graph(graph: &DualGraph, nparts: usize) -> Result<Vec<PartitionId>, PartitionError> {
    let xadj = graph
        .xadj
        .iter()
        .map(|&x| to_idx(x))
        .collect::<Result<Vec<_>, _>>()?;
    let adjncy = graph
        .adjncy
        .iter()
        .map(|&x| to_idx(x))
        .collect::<Result<Vec<_>, _>>()?;
    let vwgt: Vec<Idx> = graph.vwgt.iter().map(|&w| w as Idx).collect();
    let mut part: Vec<Idx> = vec![0; vwgt.len()];

    let objval = metis::Graph::new(1, to_idx(nparts)?, &xadj, &adjncy)
        .map_err(|e| PartitionError::Backend(e.to_string()))?
        .set_vwgt(&vwgt)
        .part_kway(&mut part)
        .map_err(|e| PartitionError::Backend(e.to_string()))?;
    log::debug!("METIS k-way: {nparts} parts, edge cut {objval}");

    part.into_iter()
        .map(|p| {
            usize::try_from(p)
                .map_err(|_| PartitionError::Backend(format!("METIS returned part {p}")))
        })
        .collect()
}
