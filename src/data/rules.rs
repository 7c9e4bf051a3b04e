//! Declarative "these dofs are active on this domain" rules.

use crate::data::dof_catalog::DofCatalog;
use crate::mesh_error::MeshError;

/// Activate `dofs` on every node of every cell of the elemental group `domain`.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ActiveDomainRule {
    pub domain: String,
    pub dofs: Vec<String>,
}

impl ActiveDomainRule {
    pub fn new<I, S>(domain: impl Into<String>, dofs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            domain: domain.into(),
            dofs: dofs.into_iter().map(Into::into).collect(),
        }
    }

    pub(crate) fn context(&self) -> String {
        format!("active-dof rule on `{}`", self.domain)
    }

    /// Catalog slots of the rule's dofs, in rule order.
    pub(crate) fn slots(&self, catalog: &DofCatalog) -> Result<Vec<usize>, MeshError> {
        let context = self.context();
        self.dofs
            .iter()
            .map(|name| catalog.resolve(name, &context))
            .collect()
    }
}
