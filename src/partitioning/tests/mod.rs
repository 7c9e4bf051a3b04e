use super::*;
use crate::mesh_generation::{interval_mesh, quad_mesh};
use crate::topology::cell_type::CellType;


#[test]
fn slice_round_trip_assignment() {
    let mesh = interval_mesh(4, 0.0, 1.0, CellType::Edge2).unwrap();
    let a = partition(&mesh, 2, &PartitionerConfig::default()).unwrap();
    assert_eq!(a.as_slice(), &[0, 0, 1, 1]);
    assert_eq!(a.rank_counts(), vec![2, 2]);
    let owned: Vec<u64> = a.cells_of(1).map(|c| c.get()).collect();
    assert_eq!(owned, vec![3, 4]);
}

#[test]
fn slice_is_permissive_with_more_ranks_than_cells() {
    let mesh = interval_mesh(4, 0.0, 1.0, CellType::Edge2).unwrap();
    let a = partition(&mesh, 10, &PartitionerConfig::default()).unwrap();
    assert_eq!(a.len(), 4);
    assert_eq!(a.rank_of(CellId::new(4).unwrap()), Some(9));
    assert_eq!(a.rank_counts().iter().filter(|&&c| c == 0).count(), 6);
}

#[test]
fn graph_rejects_more_ranks_than_cells() {
    let mesh = interval_mesh(4, 0.0, 1.0, CellType::Edge2).unwrap();
    let err = partition(&mesh, 10, &PartitionerConfig::graph()).unwrap_err();
    assert_eq!(
        err,
        PartitionError::TooManyRanks {
            ranks: 10,
            elements: 4
        }
    );
}

#[test]
fn zero_ranks_is_rejected_for_both_kinds() {
    let mesh = interval_mesh(2, 0.0, 1.0, CellType::Edge2).unwrap();
    assert_eq!(
        partition(&mesh, 0, &PartitionerConfig::default()),
        Err(PartitionError::ZeroRanks)
    );
    assert_eq!(
        partition(&mesh, 0, &PartitionerConfig::graph()),
        Err(PartitionError::ZeroRanks)
    );
}

#[test]
fn single_rank_short_circuits() {
    let mesh = quad_mesh(3, 3, [0.0, 0.0], [1.0, 1.0]).unwrap();
    let a = partition(&mesh, 1, &PartitionerConfig::graph()).unwrap();
    assert!(a.as_slice().iter().all(|&r| r == 0));
    assert_eq!(a.kind(), PartitionerKind::Graph);
}

#[test]
fn graph_partition_fills_every_rank() {
    let mesh = quad_mesh(6, 4, [0.0, 0.0], [6.0, 4.0]).unwrap();
    let a = partition(&mesh, 4, &PartitionerConfig::graph()).unwrap();
    assert_eq!(a.len(), 24);
    assert!(a.rank_counts().iter().all(|&c| c >= 1));
}

#[test]
fn graph_partition_with_one_cell_per_rank() {
    let mesh = interval_mesh(4, 0.0, 1.0, CellType::Edge2).unwrap();
    let mut ranks = partition(&mesh, 4, &PartitionerConfig::graph())
        .unwrap()
        .into_vec();
    ranks.sort_unstable();
    assert_eq!(ranks, vec![0, 1, 2, 3]);
}

#[cfg(not(feature = "metis-support"))]
#[test]
fn metis_without_feature_is_unavailable() {
    let mesh = interval_mesh(4, 0.0, 1.0, CellType::Edge2).unwrap();
    let cfg = PartitionerConfig {
        backend: GraphBackend::Metis,
        ..PartitionerConfig::graph()
    };
    assert_eq!(
        partition(&mesh, 2, &cfg),
        Err(PartitionError::BackendUnavailable("metis"))
    );
}

#[test]
fn assignment_rejects_out_of_range_rank() {
    let err = PartitionAssignment::new(2, PartitionerKind::Slice, vec![0, 2]).unwrap_err();
    assert_eq!(
        err,
        PartitionError::RankOutOfRange {
            element: 2,
            rank: 2,
            world: 2
        }
    );
}

#[test]
fn config_deserializes_with_defaults() {
    let cfg: PartitionerConfig = serde_json::from_str(r#"{"kind":"graph"}"#).unwrap();
    assert_eq!(cfg.kind, PartitionerKind::Graph);
    assert_eq!(cfg.backend, GraphBackend::Builtin);
    assert_eq!(cfg.rng_seed, 42);
}

#[test]
fn imported_assignment_is_range_checked() {
    let ok: PartitionAssignment =
        serde_json::from_str(r#"{"world":2,"kind":"slice","ranks":[0,0,1,1]}"#).unwrap();
    assert_eq!(ok.rank_counts(), vec![2, 2]);

    let err = serde_json::from_str::<PartitionAssignment>(
        r#"{"world":2,"kind":"slice","ranks":[0,0,1,5]}"#,
    )
    .unwrap_err();
    assert!(err.to_string().contains("element 4 assigned to rank 5"), "{err}");
    assert!(
        serde_json::from_str::<PartitionAssignment>(r#"{"world":0,"kind":"graph","ranks":[]}"#)
            .is_err()
    );
}

#[test]
fn buckets_cover_every_cell_once() {
    let mesh = quad_mesh(4, 3, [0.0, 0.0], [4.0, 3.0]).unwrap();
    let a = partition(&mesh, 3, &PartitionerConfig::graph()).unwrap();
    let buckets = a.buckets();
    assert_eq!(buckets.len(), 3);
    for (rank, bucket) in buckets.iter().enumerate() {
        assert_eq!(bucket, &a.cells_of(rank).collect::<Vec<_>>());
    }
    assert_eq!(buckets.iter().map(Vec::len).sum::<usize>(), mesh.bulk_elmts_num());
}
