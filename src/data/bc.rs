//! Dirichlet-type exclusions: slots removed from the active unknown set.
//!
//! A constrained `(node, slot)` pair never receives a global dof id, no
//! matter how many active-domain rules claimed it first.

use crate::data::dof_catalog::DofCatalog;
use crate::mesh_error::MeshError;
use crate::topology::mesh::MeshCellSet;
use crate::topology::point::NodeId;
use itertools::Itertools;

/// How a rule selects its nodes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirichletKind {
    /// Every node of every cell of an elemental group.
    #[default]
    Elemental,
    /// The listed nodes of a nodal group.
    Nodal,
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DirichletRule {
    pub boundary: String,
    /// Constrained 1-based catalog slots.
    pub slots: Vec<usize>,
    #[serde(default)]
    pub kind: DirichletKind,
}

impl DirichletRule {
    pub fn elemental(boundary: impl Into<String>, slots: impl Into<Vec<usize>>) -> Self {
        Self {
            boundary: boundary.into(),
            slots: slots.into(),
            kind: DirichletKind::Elemental,
        }
    }

    pub fn nodal(boundary: impl Into<String>, slots: impl Into<Vec<usize>>) -> Self {
        Self {
            boundary: boundary.into(),
            slots: slots.into(),
            kind: DirichletKind::Nodal,
        }
    }

    /// Build a rule from dof names instead of slots.
    pub fn from_names(
        kind: DirichletKind,
        boundary: impl Into<String>,
        names: &[&str],
        catalog: &DofCatalog,
    ) -> Result<Self, MeshError> {
        let boundary = boundary.into();
        let context = format!("boundary condition on `{boundary}`");
        let slots = names
            .iter()
            .map(|n| catalog.resolve(n, &context))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            boundary,
            slots,
            kind,
        })
    }

    pub(crate) fn context(&self) -> String {
        format!("boundary condition on `{}`", self.boundary)
    }

    pub(crate) fn checked_slots(&self, catalog: &DofCatalog) -> Result<Vec<usize>, MeshError> {
        let context = self.context();
        self.slots
            .iter()
            .map(|&s| catalog.check_slot(s, &context))
            .collect()
    }

    /// Sorted, deduplicated nodes this rule constrains.
    pub(crate) fn constrained_nodes(&self, mesh: &MeshCellSet) -> Result<Vec<NodeId>, MeshError> {
        let context = self.context();
        Ok(match self.kind {
            DirichletKind::Elemental => {
                let group = mesh.elemental_group(&self.boundary, &context)?;
                mesh.group_node_set(group)
            }
            DirichletKind::Nodal => {
                let group = mesh.nodal_group(&self.boundary, &context)?;
                group.nodes.iter().copied().sorted_unstable().dedup().collect()
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh_generation::{LEFT, RIGHT, quad_mesh};

    #[test]
    fn from_names_resolves_slots() {
        let catalog = DofCatalog::from_names(["ux", "uy"]).unwrap();
        let rule = DirichletRule::from_names(DirichletKind::Nodal, LEFT, &["uy"], &catalog).unwrap();
        assert_eq!(rule, DirichletRule::nodal(LEFT, vec![2]));
        assert!(DirichletRule::from_names(DirichletKind::Nodal, LEFT, &["T"], &catalog).is_err());
    }

    #[test]
    fn elemental_and_nodal_flavours_agree_on_a_side() {
        let mesh = quad_mesh(2, 2, [0.0, 0.0], [1.0, 1.0]).unwrap();
        let e = DirichletRule::elemental(RIGHT, vec![1]).constrained_nodes(&mesh).unwrap();
        let n = DirichletRule::nodal(RIGHT, vec![1]).constrained_nodes(&mesh).unwrap();
        assert_eq!(e.len(), 3);
        assert_eq!(e, n);
    }

    #[test]
    fn unknown_boundary_and_bad_slot() {
        let mesh = quad_mesh(1, 1, [0.0, 0.0], [1.0, 1.0]).unwrap();
        let catalog = DofCatalog::from_names(["u"]).unwrap();
        assert!(matches!(
            DirichletRule::elemental("inlet", vec![1]).constrained_nodes(&mesh),
            Err(MeshError::UnknownPhysicalGroup { .. })
        ));
        assert!(matches!(
            DirichletRule::elemental(LEFT, vec![3]).checked_slots(&catalog),
            Err(MeshError::DofSlotOutOfRange { slot: 3, .. })
        ));
    }
}
