//! Physical-group catalog: named element and node subsets of the mesh.
//!
//! Elemental and nodal groups live in two separate name spaces, exactly as
//! mesh files declare them. Within one catalog the name ↔ id mapping is a
//! bijection.

use crate::mesh_error::MeshError;
use crate::topology::point::{CellId, NodeId};
use std::collections::BTreeMap;

/// A named set of elements sharing a domain tag.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PhysicalGroup {
    pub id: usize,
    pub name: String,
    pub dim: u8,
    pub cells: Vec<CellId>,
}

/// A named set of nodes.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct NodalGroup {
    pub id: usize,
    pub name: String,
    pub nodes: Vec<NodeId>,
}

/// Header of a physical group as shipped to the workers.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct GroupHeader {
    pub id: usize,
    pub name: String,
    pub dim: u8,
    /// Number of members in the whole mesh.
    pub global_len: usize,
}

/// Catalog of elemental and nodal physical groups.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct PhysicalGroups {
    elemental: Vec<PhysicalGroup>,
    nodal: Vec<NodalGroup>,
    elemental_by_name: BTreeMap<String, usize>,
    elemental_by_id: BTreeMap<usize, usize>,
    nodal_by_name: BTreeMap<String, usize>,
    nodal_by_id: BTreeMap<usize, usize>,
}

fn register(
    by_name: &mut BTreeMap<String, usize>,
    by_id: &mut BTreeMap<usize, usize>,
    name: &str,
    id: usize,
    slot: usize,
) -> Result<(), MeshError> {
    if by_name.contains_key(name) || by_id.contains_key(&id) {
        return Err(MeshError::DuplicatePhysicalGroup {
            name: name.to_string(),
            id,
        });
    }
    by_name.insert(name.to_string(), slot);
    by_id.insert(id, slot);
    Ok(())
}

impl PhysicalGroups {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an elemental group. Members are added with [`Self::push_cell`].
    pub fn add_elemental(
        &mut self,
        id: usize,
        name: impl Into<String>,
        dim: u8,
    ) -> Result<(), MeshError> {
        let name = name.into();
        let slot = self.elemental.len();
        register(
            &mut self.elemental_by_name,
            &mut self.elemental_by_id,
            &name,
            id,
            slot,
        )?;
        self.elemental.push(PhysicalGroup {
            id,
            name,
            dim,
            cells: Vec::new(),
        });
        Ok(())
    }

    /// Declare a nodal group with its members.
    pub fn add_nodal(
        &mut self,
        id: usize,
        name: impl Into<String>,
        nodes: Vec<NodeId>,
    ) -> Result<(), MeshError> {
        let name = name.into();
        let slot = self.nodal.len();
        register(
            &mut self.nodal_by_name,
            &mut self.nodal_by_id,
            &name,
            id,
            slot,
        )?;
        self.nodal.push(NodalGroup { id, name, nodes });
        Ok(())
    }

    /// Append a cell to the elemental group with id `group_id`.
    pub fn push_cell(&mut self, group_id: usize, cell: CellId) -> Result<(), MeshError> {
        let slot = *self
            .elemental_by_id
            .get(&group_id)
            .ok_or_else(|| MeshError::UnknownPhysicalGroup {
                name: format!("#{group_id}"),
                context: format!("cell {cell}"),
            })?;
        self.elemental[slot].cells.push(cell);
        Ok(())
    }

    pub fn elemental(&self) -> &[PhysicalGroup] {
        &self.elemental
    }

    pub fn nodal(&self) -> &[NodalGroup] {
        &self.nodal
    }

    pub fn elemental_by_name(&self, name: &str) -> Option<&PhysicalGroup> {
        self.elemental_by_name.get(name).map(|&i| &self.elemental[i])
    }

    pub fn elemental_by_id(&self, id: usize) -> Option<&PhysicalGroup> {
        self.elemental_by_id.get(&id).map(|&i| &self.elemental[i])
    }

    pub fn nodal_by_name(&self, name: &str) -> Option<&NodalGroup> {
        self.nodal_by_name.get(name).map(|&i| &self.nodal[i])
    }

    pub fn nodal_by_id(&self, id: usize) -> Option<&NodalGroup> {
        self.nodal_by_id.get(&id).map(|&i| &self.nodal[i])
    }

    /// Id of an elemental group from its name.
    pub fn elemental_id(&self, name: &str) -> Option<usize> {
        self.elemental_by_name(name).map(|g| g.id)
    }

    /// Name of an elemental group from its id.
    pub fn elemental_name(&self, id: usize) -> Option<&str> {
        self.elemental_by_id(id).map(|g| g.name.as_str())
    }

    /// Headers of all elemental groups, in declaration order.
    pub fn elemental_headers(&self) -> Vec<GroupHeader> {
        self.elemental
            .iter()
            .map(|g| GroupHeader {
                id: g.id,
                name: g.name.clone(),
                dim: g.dim,
                global_len: g.cells.len(),
            })
            .collect()
    }

    /// Headers of all nodal groups, in declaration order. Nodal groups carry
    /// dimension 0.
    pub fn nodal_headers(&self) -> Vec<GroupHeader> {
        self.nodal
            .iter()
            .map(|g| GroupHeader {
                id: g.id,
                name: g.name.clone(),
                dim: 0,
                global_len: g.nodes.len(),
            })
            .collect()
    }
}
