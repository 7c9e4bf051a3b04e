//! Data module: dof catalog, rules and the global dof tables

pub mod bc;
pub mod dof_catalog;
pub mod dof_handler;
pub mod global_map;
pub mod rules;
pub mod sparsity;

pub use bc::{DirichletKind, DirichletRule};
pub use dof_catalog::DofCatalog;
pub use dof_handler::{DofHandler, DofHandlerConfig};
pub use global_map::{ElementalDofTable, GlobalDofMap, NodalDofTable};
pub use rules::ActiveDomainRule;
pub use sparsity::{SparsityMode, SparsityProfile};
