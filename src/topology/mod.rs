//! Top-level module for the mesh cell store.
//!
//! This module provides the core types for representing the un-partitioned mesh:
//! - 1-based node and element ids
//! - Cell type metadata (VTK tags, facet sizes)
//! - The physical-group catalog
//! - `MeshCellSet`, the coordinator-only authoritative mesh, and its builder

pub mod cell_type;
pub mod mesh;
pub mod physical;
pub mod point;

pub use cell_type::CellType;
pub use mesh::{MeshCell, MeshCellSet, MeshCellSetBuilder};
pub use physical::{GroupHeader, NodalGroup, PhysicalGroup, PhysicalGroups};
pub use point::{CellId, NodeId};
