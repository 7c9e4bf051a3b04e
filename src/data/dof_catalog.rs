//! `DofCatalog`: the ordered set of declared unknown names.
//!
//! The position of a name in the catalog is its 1-based *slot* in every
//! node's local unknown block, so declaration order fixes the local layout
//! for the whole run. The catalog grows while the input is read and is
//! frozen by the DOF handler before numbering starts.

use crate::mesh_error::MeshError;

#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DofCatalog {
    names: Vec<String>,
    frozen: bool,
}

impl DofCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare every name of `names` in order.
    pub fn from_names<I, S>(names: I) -> Result<Self, MeshError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut catalog = Self::new();
        for name in names {
            catalog.declare(name)?;
        }
        Ok(catalog)
    }

    /// Append `name` and return its slot.
    pub fn declare(&mut self, name: impl Into<String>) -> Result<usize, MeshError> {
        let name = name.into();
        if self.frozen {
            return Err(MeshError::CatalogFrozen(name));
        }
        if self.slot_of(&name).is_some() {
            return Err(MeshError::DuplicateDofName(name));
        }
        self.names.push(name);
        Ok(self.names.len())
    }

    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// `MaxDofsPerNode`: number of declared names.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// 1-based slot of `name`.
    pub fn slot_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name).map(|i| i + 1)
    }

    pub fn name_of(&self, slot: usize) -> Option<&str> {
        slot.checked_sub(1)
            .and_then(|i| self.names.get(i))
            .map(String::as_str)
    }

    /// Slot of `name`, or [`MeshError::UnknownDofName`] naming `context`.
    pub fn resolve(&self, name: &str, context: &str) -> Result<usize, MeshError> {
        self.slot_of(name).ok_or_else(|| MeshError::UnknownDofName {
            name: name.to_string(),
            context: context.to_string(),
        })
    }

    /// Check that `slot` lies in `1..=len()`.
    pub fn check_slot(&self, slot: usize, context: &str) -> Result<usize, MeshError> {
        if slot == 0 || slot > self.len() {
            return Err(MeshError::DofSlotOutOfRange {
                slot,
                max: self.len(),
                context: context.to_string(),
            });
        }
        Ok(slot)
    }
}
