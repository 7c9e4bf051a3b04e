mod util;

use mesh_dofmap::algs::pipeline::PipelineConfig;
use mesh_dofmap::data::{DirichletKind, DirichletRule};
use mesh_dofmap::mesh_generation::{LEFT, hex_mesh};
use util::*;

#[test]
fn bar_on_two_ranks() {
    let out = run_world(2, bar4(), &PipelineConfig::default(), &handler(&["u"]));
    let setups: Vec<_> = out.into_iter().map(Result::unwrap).collect();

    let coordinator = &setups[0];
    let session = coordinator.session.as_ref().unwrap();
    assert_eq!(session.rank_of_elements(), &[0, 0, 1, 1]);
    let global = coordinator.global.as_ref().unwrap();
    assert_eq!(global.active_dofs, 5);
    assert_eq!(global.elemental.get(cell(1)), Some(&[1, 2][..]));

    assert_eq!(raw(&setups[0].cells.node_ids), vec![1, 2, 3]);
    assert_eq!(raw(&setups[1].cells.node_ids), vec![3, 4, 5]);
    assert_eq!(setups[1].dofs.active_dofs, 5);
    assert_eq!(setups[1].cells.bulk[1].dof_ids, vec![4, 5]);
    assert!(setups[1].session.is_none() && setups[1].global.is_none());
}

#[test]
fn bar_with_left_end_fixed() {
    let mut h = handler(&["u"]);
    let fixed =
        DirichletRule::from_names(DirichletKind::Elemental, LEFT, &["u"], h.catalog()).unwrap();
    h.add_dirichlet(fixed);
    let out = run_world(2, bar4(), &PipelineConfig::default(), &h);
    let setups: Vec<_> = out.into_iter().map(Result::unwrap).collect();

    let global = setups[0].global.as_ref().unwrap();
    assert_eq!(global.active_dofs, 4);
    assert_eq!(global.nodal.get(node(1), 1), 0);
    assert_eq!(global.elemental.get(cell(1)), Some(&[1][..]));
    assert_eq!(setups[0].cells.bulk[0].dof_ids, vec![1]);
    assert_eq!(setups[0].dofs.node_dofs(node(1)), Some(&[0][..]));
    assert_eq!(setups[1].dofs.node_dofs(node(5)), Some(&[4][..]));
}

#[test]
fn hex_block_tables_are_dense_and_complete() {
    let mesh = hex_mesh(3, 2, 2, [0.0; 3], [3.0, 2.0, 2.0]).unwrap();
    let out = run_world(4, mesh, &PipelineConfig::default(), &handler(&["ux", "uy", "uz"]));
    let setups: Vec<_> = out.into_iter().map(Result::unwrap).collect();
    let global = setups[0].global.as_ref().unwrap();

    assert_eq!(global.active_dofs, 36 * 3);
    assert_eq!(global.max_dofs_per_elmt, 24);
    for (_, dofs) in global.elemental.iter() {
        assert_eq!(dofs.len(), global.max_dofs_per_elmt);
    }
    let s = &global.sparsity;
    assert!(s.max_row_nnz <= s.max_nnz);
    assert!(s.max_nnz >= global.active_dofs);

    let cells: usize = setups.iter().map(|s| s.cells.bulk.len()).sum();
    assert_eq!(cells, 12);
    for setup in &setups {
        for c in &setup.cells.bulk {
            assert_eq!(Some(c.dof_ids.as_slice()), global.elemental.get(c.id));
        }
    }
}
