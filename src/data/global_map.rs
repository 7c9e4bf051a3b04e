//! Global dof tables produced by the [`DofHandler`](crate::data::dof_handler::DofHandler).
//!
//! Dof ids are 1-based; `0` marks an inactive `(node, slot)` pair, either
//! never claimed or excluded by a boundary condition.

use crate::data::sparsity::SparsityProfile;
use crate::topology::point::{CellId, NodeId};

/// `(node, slot) → global dof id`, dense over `NodesNum × MaxDofsPerNode`.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct NodalDofTable {
    max_dofs_per_node: usize,
    ids: Vec<usize>,
}

impl NodalDofTable {
    /// All-inactive table.
    pub fn new(nodes_num: usize, max_dofs_per_node: usize) -> Self {
        Self {
            max_dofs_per_node,
            ids: vec![0; nodes_num * max_dofs_per_node],
        }
    }

    pub fn nodes_num(&self) -> usize {
        self.ids.len().checked_div(self.max_dofs_per_node).unwrap_or(0)
    }

    pub fn max_dofs_per_node(&self) -> usize {
        self.max_dofs_per_node
    }

    #[inline]
    fn pos(&self, node: NodeId, slot: usize) -> Option<usize> {
        if slot == 0 || slot > self.max_dofs_per_node {
            return None;
        }
        let pos = node.index() * self.max_dofs_per_node + slot - 1;
        (pos < self.ids.len()).then_some(pos)
    }

    /// Dof id of `(node, slot)`; `0` when inactive or out of range.
    pub fn get(&self, node: NodeId, slot: usize) -> usize {
        self.pos(node, slot).map_or(0, |p| self.ids[p])
    }

    pub(crate) fn set(&mut self, node: NodeId, slot: usize, id: usize) {
        if let Some(p) = self.pos(node, slot) {
            self.ids[p] = id;
        }
    }

    /// All slots of `node`, in catalog order.
    pub fn row(&self, node: NodeId) -> &[usize] {
        let m = self.max_dofs_per_node;
        let start = node.index() * m;
        self.ids.get(start..start + m).unwrap_or(&[])
    }

    pub(crate) fn rows_mut(&mut self) -> impl Iterator<Item = &mut [usize]> {
        self.ids.chunks_exact_mut(self.max_dofs_per_node.max(1))
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.ids
    }

    /// Number of non-zero entries.
    pub fn active_count(&self) -> usize {
        self.ids.iter().filter(|&&d| d != 0).count()
    }
}

/// Bulk cell → compact dof list, zeros stripped, in local node order.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ElementalDofTable {
    rows: Vec<Vec<usize>>,
}

impl ElementalDofTable {
    pub(crate) fn from_rows(rows: Vec<Vec<usize>>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, cell: CellId) -> Option<&[usize]> {
        self.rows.get(cell.index()).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (CellId, &[usize])> {
        self.rows
            .iter()
            .enumerate()
            .map(|(i, r)| (CellId::from_index(i), r.as_slice()))
    }

    pub(crate) fn rows(&self) -> &[Vec<usize>] {
        &self.rows
    }
}

/// Everything the coordinator knows after numbering.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct GlobalDofMap {
    pub active_dofs: usize,
    pub max_dofs_per_node: usize,
    pub max_dofs_per_elmt: usize,
    pub nodal: NodalDofTable,
    pub elemental: ElementalDofTable,
    pub sparsity: SparsityProfile,
}

impl GlobalDofMap {
    pub fn summary(&self) -> String {
        format!(
            "{} active dofs ({} per node, {} per element), max row nnz {}, total nnz {}",
            self.active_dofs,
            self.max_dofs_per_node,
            self.max_dofs_per_elmt,
            self.sparsity.max_row_nnz,
            self.sparsity.max_nnz
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(i: u64) -> NodeId {
        NodeId::new(i).unwrap()
    }

    #[test]
    fn nodal_table_addressing() {
        let mut t = NodalDofTable::new(3, 2);
        assert_eq!(t.nodes_num(), 3);
        t.set(node(2), 2, 7);
        assert_eq!(t.get(node(2), 2), 7);
        assert_eq!(t.row(node(2)), &[0, 7]);
        assert_eq!(t.get(node(2), 3), 0);
        assert_eq!(t.get(node(9), 1), 0);
        assert!(t.row(node(9)).is_empty());
        assert_eq!(t.active_count(), 1);
    }

    #[test]
    fn elemental_table_is_one_based() {
        let t = ElementalDofTable::from_rows(vec![vec![1, 2], vec![2, 3]]);
        assert_eq!(t.get(CellId::new(2).unwrap()), Some(&[2, 3][..]));
        assert_eq!(t.get(CellId::new(3).unwrap()), None);
        assert_eq!(t.iter().count(), 2);
    }
}
