mod util;

use mesh_dofmap::algs::distribute::DistributionConfig;
use mesh_dofmap::algs::pipeline::PipelineConfig;
use mesh_dofmap::mesh_generation::{ALL_DOMAIN, BOTTOM, TOP, quad_mesh};
use mesh_dofmap::partitioning::{PartitionAssignment, PartitionerConfig, PartitionerKind};
use util::*;

fn graph_config() -> PipelineConfig {
    PipelineConfig {
        partitioner: PartitionerConfig::graph(),
        distribution: DistributionConfig {
            share_partition_vector: true,
        },
        ..Default::default()
    }
}

#[test]
fn graph_partition_covers_every_cell_once() {
    let mesh = quad_mesh(6, 4, [0.0, 0.0], [6.0, 4.0]).unwrap();
    let out = run_world(4, mesh, &graph_config(), &handler(&["T"]));
    let setups: Vec<_> = out.into_iter().map(Result::unwrap).collect();

    let mut seen: Vec<u64> = setups
        .iter()
        .flat_map(|s| s.cells.bulk.iter().map(|c| c.id.get()))
        .collect();
    seen.sort_unstable();
    assert_eq!(seen, (1..=24).collect::<Vec<_>>());

    let session = setups[0].session.as_ref().unwrap();
    for (rank, s) in setups.iter().enumerate() {
        assert!(!s.cells.bulk.is_empty(), "rank {rank} is empty");
        assert!(s.cells.bulk.iter().all(|c| session.assignment().rank_of(c.id) == Some(rank)));
        assert_eq!(s.cells.partition.as_deref(), Some(session.rank_of_elements()));
        assert_eq!(s.cells.rank_element_counts, session.assignment().rank_counts());
        assert_eq!(
            s.cells.group_cells(ALL_DOMAIN).unwrap().len(),
            s.cells.bulk.len()
        );
    }
}

#[test]
fn boundary_groups_and_owned_nodes_are_sliced() {
    let mesh = quad_mesh(4, 3, [0.0, 0.0], [4.0, 3.0]).unwrap();
    let nodes_num = mesh.nodes_num();
    let out = run_world(3, mesh, &PipelineConfig::default(), &handler(&["T"]));
    let setups: Vec<_> = out.into_iter().map(Result::unwrap).collect();

    for group in [BOTTOM, TOP] {
        let total: usize = setups
            .iter()
            .map(|s| s.cells.group_cells(group).unwrap().len())
            .sum();
        assert_eq!(total, 4);
        let header = setups[2]
            .cells
            .elemental_headers
            .iter()
            .find(|h| h.name == group)
            .unwrap();
        assert_eq!(header.global_len, 4);
    }

    let mut owned: Vec<u64> = setups.iter().flat_map(|s| raw(&s.cells.owned_node_ids)).collect();
    owned.sort_unstable();
    assert_eq!(owned, (1..=nodes_num as u64).collect::<Vec<_>>());
    for s in &setups {
        assert_eq!(s.cells.owned_node_coords.len(), s.cells.owned_node_ids.len());
        let rows: usize = s.dofs.owned_rows.len();
        assert_eq!(rows, s.cells.owned_node_ids.len());
    }
}

#[test]
fn assignment_exports_as_json() {
    let mesh = bar4();
    let a = mesh_dofmap::partitioning::partition(&mesh, 2, &PartitionerConfig::default()).unwrap();
    let json = serde_json::to_value(&a).unwrap();
    assert_eq!(json["world"], 2);
    assert_eq!(json["kind"], "slice");
    assert_eq!(json["ranks"], serde_json::json!([0, 0, 1, 1]));

    let back: PartitionAssignment = serde_json::from_value(json).unwrap();
    assert_eq!(back.kind(), PartitionerKind::Slice);
    assert_eq!(back, a);
}
