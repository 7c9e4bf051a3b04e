//! Non-zero count estimate of the global system matrix.
//!
//! The profile only sizes preallocation; it is an upper bound and never
//! used for indexing.
//!
//! - [`SparsityMode::Conservative`]: every row touched by an element gets
//!   `MaxDofsPerElmt` more entries. One pass, no column sets.
//! - [`SparsityMode::Exact`]: per row, the union of the column ids of every
//!   element touching it.

use crate::data::global_map::ElementalDofTable;
use rayon::prelude::*;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SparsityMode {
    #[default]
    Conservative,
    Exact,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SparsityProfile {
    pub max_row_nnz: usize,
    pub max_nnz: usize,
    /// Non-zeros of row `dof`, stored at `dof - 1`.
    pub row_nnz: Vec<usize>,
}

impl SparsityProfile {
    pub fn build(
        elemental: &ElementalDofTable,
        active_dofs: usize,
        max_dofs_per_elmt: usize,
        mode: SparsityMode,
    ) -> Self {
        let row_nnz = match mode {
            SparsityMode::Conservative => conservative_rows(elemental, active_dofs, max_dofs_per_elmt),
            SparsityMode::Exact => exact_rows(elemental, active_dofs),
        };
        Self::from_rows(row_nnz)
    }

    pub fn from_rows(row_nnz: Vec<usize>) -> Self {
        Self {
            max_row_nnz: row_nnz.iter().copied().max().unwrap_or(0),
            max_nnz: row_nnz.iter().sum(),
            row_nnz,
        }
    }

    /// Non-zeros of the 1-based row `dof`; `0` for unknown rows.
    pub fn row(&self, dof: usize) -> usize {
        dof.checked_sub(1)
            .and_then(|i| self.row_nnz.get(i))
            .copied()
            .unwrap_or(0)
    }
}

fn conservative_rows(elemental: &ElementalDofTable, active_dofs: usize, per_elmt: usize) -> Vec<usize> {
    let mut rows = vec![0usize; active_dofs];
    for dofs in elemental.rows() {
        for &d in dofs {
            if let Some(r) = rows.get_mut(d.wrapping_sub(1)) {
                *r += per_elmt;
            }
        }
    }
    rows
}

fn exact_rows(elemental: &ElementalDofTable, active_dofs: usize) -> Vec<usize> {
    let mut cols: Vec<Vec<usize>> = vec![Vec::new(); active_dofs];
    for dofs in elemental.rows() {
        for &d in dofs {
            if let Some(c) = cols.get_mut(d.wrapping_sub(1)) {
                c.extend_from_slice(dofs);
            }
        }
    }
    cols.par_iter_mut()
        .map(|c| {
            c.sort_unstable();
            c.dedup();
            c.len()
        })
        .collect()
}
