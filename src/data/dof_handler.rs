//! Global dof numbering on the coordinator.
//!
//! [`DofHandler::assign_dofs`] runs once over the full mesh:
//!
//! 1. every `(node, slot)` starts inactive (`0`);
//! 2. each active-domain rule gives the still-inactive slots of its domain's
//!    nodes the placeholder `(node - 1) * MaxDofsPerNode + slot`;
//! 3. every node must now hold at least one placeholder;
//! 4. Dirichlet rules force their slots back to `0`;
//! 5. the survivors are renumbered densely `1..=ActiveDofs`, ascending by
//!    node id then catalog slot;
//! 6. per bulk cell, the node rows are gathered in local node order and the
//!    zeros stripped; the list must be as long as the active slots the rule
//!    passes left on its nodes. Then the sparsity profile is estimated.
//!
//! All rule references are resolved before step 1, so configuration errors
//! surface before any table is touched.

use crate::data::bc::DirichletRule;
use crate::data::dof_catalog::DofCatalog;
use crate::data::global_map::{ElementalDofTable, GlobalDofMap, NodalDofTable};
use crate::data::rules::ActiveDomainRule;
use crate::data::sparsity::{SparsityMode, SparsityProfile};
use crate::mesh_error::MeshError;
use crate::topology::mesh::{MeshCell, MeshCellSet};
use crate::topology::physical::PhysicalGroup;
use crate::topology::point::NodeId;

#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct DofHandlerConfig {
    pub sparsity: SparsityMode,
}

/// The dof catalog plus the rules that decide which slots are unknowns.
#[derive(Clone, Debug, Default)]
pub struct DofHandler {
    catalog: DofCatalog,
    active: Vec<ActiveDomainRule>,
    dirichlet: Vec<DirichletRule>,
    config: DofHandlerConfig,
    numbered: bool,
}

impl DofHandler {
    pub fn new(catalog: DofCatalog) -> Self {
        Self {
            catalog,
            ..Default::default()
        }
    }

    pub fn with_config(mut self, config: DofHandlerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn set_config(&mut self, config: DofHandlerConfig) {
        self.config = config;
    }

    pub fn config(&self) -> &DofHandlerConfig {
        &self.config
    }

    pub fn catalog(&self) -> &DofCatalog {
        &self.catalog
    }

    /// Declare more dofs; fails once numbering has run.
    pub fn catalog_mut(&mut self) -> &mut DofCatalog {
        &mut self.catalog
    }

    pub fn add_active_domain(&mut self, rule: ActiveDomainRule) -> &mut Self {
        self.active.push(rule);
        self
    }

    pub fn add_dirichlet(&mut self, rule: DirichletRule) -> &mut Self {
        self.dirichlet.push(rule);
        self
    }

    pub fn active_rules(&self) -> &[ActiveDomainRule] {
        &self.active
    }

    pub fn dirichlet_rules(&self) -> &[DirichletRule] {
        &self.dirichlet
    }

    /// Every elemental group of the mesh dimension must be named by a rule.
    fn check_coverage(&self, mesh: &MeshCellSet) -> Result<(), MeshError> {
        for group in mesh.groups().elemental() {
            if group.dim == mesh.max_dim() && !self.active.iter().any(|r| r.domain == group.name) {
                return Err(MeshError::DomainWithoutRule(group.name.clone()));
            }
        }
        Ok(())
    }

    /// Whether [`Self::assign_dofs`] has already succeeded.
    pub fn is_numbered(&self) -> bool {
        self.numbered
    }

    /// Number the unknowns of `mesh` and build the elemental table and the
    /// sparsity profile. Freezes the catalog; a handler numbers one mesh once.
    pub fn assign_dofs(&mut self, mesh: &MeshCellSet) -> Result<GlobalDofMap, MeshError> {
        if self.numbered {
            return Err(MeshError::DofsAlreadyNumbered);
        }
        if self.catalog.is_empty() {
            return Err(MeshError::EmptyDofCatalog);
        }
        self.catalog.freeze();
        let m = self.catalog.len();

        let active: Vec<(&PhysicalGroup, Vec<usize>)> = self
            .active
            .iter()
            .map(|r| Ok((mesh.elemental_group(&r.domain, &r.context())?, r.slots(&self.catalog)?)))
            .collect::<Result<_, MeshError>>()?;
        self.check_coverage(mesh)?;
        let excluded: Vec<(Vec<NodeId>, Vec<usize>)> = self
            .dirichlet
            .iter()
            .map(|r| Ok((r.constrained_nodes(mesh)?, r.checked_slots(&self.catalog)?)))
            .collect::<Result<_, MeshError>>()?;

        // active slots per node, kept alongside the table by both passes
        let mut claimed = vec![0usize; mesh.nodes_num()];
        let mut nodal = NodalDofTable::new(mesh.nodes_num(), m);
        for (group, slots) in &active {
            for cell in mesh.group_cells(group) {
                for &node in &cell.nodes {
                    for &slot in slots {
                        if nodal.get(node, slot) == 0 {
                            nodal.set(node, slot, node.index() * m + slot);
                            claimed[node.index()] += 1;
                        }
                    }
                }
            }
        }
        if let Some(i) = claimed.iter().position(|&c| c == 0) {
            return Err(MeshError::NodeWithoutDofs(NodeId::from_index(i)));
        }

        for (nodes, slots) in &excluded {
            for &node in nodes {
                for &slot in slots {
                    if nodal.get(node, slot) != 0 {
                        nodal.set(node, slot, 0);
                        claimed[node.index()] -= 1;
                    }
                }
            }
        }

        let mut active_dofs = 0;
        for row in nodal.rows_mut() {
            for d in row.iter_mut().filter(|d| **d != 0) {
                active_dofs += 1;
                *d = active_dofs;
            }
        }

        let max_dofs_per_elmt = mesh.nodes_per_bulk_elmt() * m;
        let rows = mesh
            .bulk_cells()
            .iter()
            .map(|cell| gather(&nodal, &claimed, cell))
            .collect::<Result<Vec<_>, _>>()?;
        let elemental = ElementalDofTable::from_rows(rows);
        let sparsity =
            SparsityProfile::build(&elemental, active_dofs, max_dofs_per_elmt, self.config.sparsity);

        let map = GlobalDofMap {
            active_dofs,
            max_dofs_per_node: m,
            max_dofs_per_elmt,
            nodal,
            elemental,
            sparsity,
        };
        log::info!("{}", map.summary());
        self.numbered = true;
        Ok(map)
    }
}

/// Compact dof list of one bulk cell.
///
/// Its length must match what the rule passes left active on the cell's
/// nodes, as recorded in `claimed`.
fn gather(
    nodal: &NodalDofTable,
    claimed: &[usize],
    cell: &MeshCell,
) -> Result<Vec<usize>, MeshError> {
    let dofs: Vec<usize> = cell
        .nodes
        .iter()
        .flat_map(|&n| nodal.row(n).iter().copied())
        .filter(|&d| d != 0)
        .collect();
    let expected = cell
        .nodes
        .iter()
        .map(|n| claimed.get(n.index()).copied().unwrap_or(0))
        .sum();
    if dofs.len() != expected {
        return Err(MeshError::ElementDofCountMismatch {
            element: cell.id,
            expected,
            got: dofs.len(),
        });
    }
    if dofs.is_empty() {
        return Err(MeshError::ElementDofsAllZero(cell.id));
    }
    Ok(dofs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh_generation::{ALL_DOMAIN, LEFT, RIGHT, interval_mesh, quad_mesh};
    use crate::topology::cell_type::CellType;
    use crate::topology::mesh::MeshCellSetBuilder;
    use crate::topology::point::CellId;

    fn node(i: u64) -> NodeId {
        NodeId::new(i).unwrap()
    }

    fn cell(i: u64) -> CellId {
        CellId::new(i).unwrap()
    }

    fn scalar_handler() -> DofHandler {
        let mut h = DofHandler::new(DofCatalog::from_names(["u"]).unwrap());
        h.add_active_domain(ActiveDomainRule::new(ALL_DOMAIN, ["u"]));
        h
    }

    #[test]
    fn interval_without_exclusions() {
        let mesh = interval_mesh(4, 0.0, 1.0, CellType::Edge2).unwrap();
        let map = scalar_handler().assign_dofs(&mesh).unwrap();
        assert_eq!(map.active_dofs, 5);
        assert_eq!(map.max_dofs_per_elmt, 2);
        assert_eq!(map.elemental.get(cell(1)), Some(&[1, 2][..]));
        assert_eq!(map.elemental.get(cell(4)), Some(&[4, 5][..]));
        assert_eq!(map.sparsity.row_nnz, vec![2, 4, 4, 4, 2]);
    }

    #[test]
    fn dirichlet_node_drops_out() {
        let mesh = interval_mesh(4, 0.0, 1.0, CellType::Edge2).unwrap();
        let mut h = scalar_handler();
        h.add_dirichlet(DirichletRule::elemental(LEFT, vec![1]));
        let map = h.assign_dofs(&mesh).unwrap();
        assert_eq!(map.active_dofs, 4);
        assert_eq!(map.nodal.get(node(1), 1), 0);
        assert_eq!(map.nodal.get(node(2), 1), 1);
        assert_eq!(map.elemental.get(cell(1)), Some(&[1][..]));
    }

    #[test]
    fn numbering_follows_node_then_slot() {
        let mesh = quad_mesh(2, 1, [0.0, 0.0], [2.0, 1.0]).unwrap();
        let mut h = DofHandler::new(DofCatalog::from_names(["ux", "uy"]).unwrap());
        h.add_active_domain(ActiveDomainRule::new(ALL_DOMAIN, ["uy", "ux"]));
        h.add_dirichlet(DirichletRule::nodal(LEFT, vec![1]));
        let map = h.assign_dofs(&mesh).unwrap();

        // node 1 sits on the left: ux excluded, uy kept
        assert_eq!(map.nodal.row(node(1)), &[0, 1]);
        assert_eq!(map.nodal.row(node(2)), &[2, 3]);
        assert_eq!(map.active_dofs, 6 * 2 - 2);
        let mut seen: Vec<usize> = map.nodal.as_slice().iter().copied().filter(|&d| d != 0).collect();
        seen.sort_unstable();
        assert_eq!(seen, (1..=map.active_dofs).collect::<Vec<_>>());
    }

    #[test]
    fn exclusion_wins_over_overlapping_rules() {
        let mesh = interval_mesh(2, 0.0, 1.0, CellType::Edge2).unwrap();
        let mut h = scalar_handler();
        h.add_active_domain(ActiveDomainRule::new(RIGHT, ["u"]))
            .add_dirichlet(DirichletRule::nodal(RIGHT, vec![1]));
        let map = h.assign_dofs(&mesh).unwrap();
        assert_eq!(map.nodal.get(node(3), 1), 0);
        assert_eq!(map.active_dofs, 2);
    }

    #[test]
    fn unknown_names_are_configuration_errors() {
        let mesh = interval_mesh(2, 0.0, 1.0, CellType::Edge2).unwrap();
        let mut h = DofHandler::new(DofCatalog::from_names(["u"]).unwrap());
        h.add_active_domain(ActiveDomainRule::new(ALL_DOMAIN, ["T"]));
        assert!(matches!(h.assign_dofs(&mesh), Err(MeshError::UnknownDofName { .. })));

        let mut h = DofHandler::new(DofCatalog::from_names(["u"]).unwrap());
        h.add_active_domain(ActiveDomainRule::new("solid", ["u"]));
        assert!(matches!(
            h.assign_dofs(&mesh),
            Err(MeshError::UnknownPhysicalGroup { .. })
        ));
    }

    #[test]
    fn uncovered_domain_and_empty_catalog() {
        let mesh = interval_mesh(2, 0.0, 1.0, CellType::Edge2).unwrap();
        let mut h = DofHandler::new(DofCatalog::from_names(["u"]).unwrap());
        h.add_active_domain(ActiveDomainRule::new(LEFT, ["u"]));
        assert_eq!(
            h.assign_dofs(&mesh),
            Err(MeshError::DomainWithoutRule(ALL_DOMAIN.into()))
        );
        assert_eq!(
            DofHandler::default().assign_dofs(&mesh),
            Err(MeshError::EmptyDofCatalog)
        );
    }

    #[test]
    fn orphan_node_has_no_dofs() {
        let mut b = MeshCellSetBuilder::new();
        b.add_nodes([[0.0; 3], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0]]);
        b.add_elemental_group(1, "bar", 1).unwrap();
        b.add_bulk_cell(CellType::Edge2, &[1, 2], 1);
        let mesh = b.build().unwrap();
        let mut h = DofHandler::new(DofCatalog::from_names(["u"]).unwrap());
        h.add_active_domain(ActiveDomainRule::new("bar", ["u"]));
        assert_eq!(h.assign_dofs(&mesh), Err(MeshError::NodeWithoutDofs(node(3))));
    }

    #[test]
    fn fully_constrained_element() {
        let mesh = interval_mesh(1, 0.0, 1.0, CellType::Edge2).unwrap();
        let mut h = scalar_handler();
        h.add_dirichlet(DirichletRule::nodal(LEFT, vec![1]))
            .add_dirichlet(DirichletRule::nodal(RIGHT, vec![1]));
        assert_eq!(h.assign_dofs(&mesh), Err(MeshError::ElementDofsAllZero(cell(1))));
    }

    #[test]
    fn catalog_is_frozen_after_numbering() {
        let mesh = interval_mesh(2, 0.0, 1.0, CellType::Edge2).unwrap();
        let mut h = scalar_handler();
        h.assign_dofs(&mesh).unwrap();
        assert!(h.catalog_mut().declare("v").is_err());
    }

    #[test]
    fn numbering_runs_once() {
        let mesh = interval_mesh(2, 0.0, 1.0, CellType::Edge2).unwrap();
        let mut h = scalar_handler();
        assert!(!h.is_numbered());
        h.assign_dofs(&mesh).unwrap();
        assert!(h.is_numbered());
        assert_eq!(h.assign_dofs(&mesh), Err(MeshError::DofsAlreadyNumbered));
    }

    #[test]
    fn failed_numbering_can_be_retried() {
        let mesh = interval_mesh(2, 0.0, 1.0, CellType::Edge2).unwrap();
        let mut h = DofHandler::new(DofCatalog::from_names(["u"]).unwrap());
        assert!(h.assign_dofs(&mesh).is_err());
        h.add_active_domain(ActiveDomainRule::new(ALL_DOMAIN, ["u"]));
        assert_eq!(h.assign_dofs(&mesh).unwrap().active_dofs, 3);
    }

    #[test]
    fn element_count_must_match_claimed_slots() {
        let mesh = interval_mesh(2, 0.0, 1.0, CellType::Edge2).unwrap();
        let mut nodal = NodalDofTable::new(3, 2);
        for (n, dofs) in [(1, [1, 2]), (2, [3, 4]), (3, [5, 0])] {
            for (slot, d) in dofs.into_iter().enumerate() {
                nodal.set(node(n), slot + 1, d);
            }
        }
        let cells = mesh.bulk_cells();
        assert_eq!(gather(&nodal, &[2, 2, 1], &cells[1]).unwrap(), vec![3, 4, 5]);
        // node 3 was left with both slots active but the table lost one
        assert_eq!(
            gather(&nodal, &[2, 2, 2], &cells[1]),
            Err(MeshError::ElementDofCountMismatch {
                element: cell(2),
                expected: 4,
                got: 3
            })
        );
        assert_eq!(
            gather(&NodalDofTable::new(3, 2), &[0, 0, 0], &cells[0]),
            Err(MeshError::ElementDofsAllZero(cell(1)))
        );
    }

    #[test]
    fn exact_sparsity_is_tighter() {
        let mesh = quad_mesh(2, 2, [0.0, 0.0], [1.0, 1.0]).unwrap();
        let conservative = scalar_handler().assign_dofs(&mesh).unwrap();
        let exact = scalar_handler()
            .with_config(DofHandlerConfig {
                sparsity: SparsityMode::Exact,
            })
            .assign_dofs(&mesh)
            .unwrap();
        // centre node couples to all nine
        assert_eq!(exact.sparsity.row(5), 9);
        assert_eq!(conservative.sparsity.row(5), 16);
        assert!(exact.sparsity.max_nnz < conservative.sparsity.max_nnz);
    }
}
