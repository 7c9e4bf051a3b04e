//! MeshError: Unified error type for mesh-dofmap public APIs
//!
//! Every fatal condition of the partition / distribute / number pipeline is
//! reported through this type. Variants are grouped by the category of the
//! failure so the detecting rank can print a precise diagnostic before the
//! whole run is aborted.

use crate::partitioning::error::PartitionError;
use crate::topology::point::{CellId, NodeId};
use thiserror::Error;

/// Coarse classification of a [`MeshError`], used for diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Bad input: unknown names, duplicate declarations, broken mesh data.
    Configuration,
    /// The partitioner could not produce a usable assignment.
    Partitioning,
    /// The DOF tables disagree with the mesh or the rule set.
    Consistency,
    /// Point-to-point messaging failed or delivered the wrong thing.
    Protocol,
}

/// Unified error type for mesh-dofmap operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MeshError {
    // ----- configuration -------------------------------------------------
    /// A raw id of zero was used where a 1-based id is required.
    #[error("id must be non-zero (0 is reserved as invalid/sentinel)")]
    InvalidId,
    /// The mesh violates one of its structural invariants.
    #[error("invalid mesh: {0}")]
    InvalidMesh(String),
    /// A DOF name was declared twice.
    #[error("dof `{0}` is declared more than once")]
    DuplicateDofName(String),
    /// A rule referenced a DOF name absent from the catalog.
    #[error("dof `{name}` used by {context} is not declared")]
    UnknownDofName { name: String, context: String },
    /// A rule referenced a DOF slot outside `1..=MaxDofsPerNode`.
    #[error("dof slot {slot} used by {context} is out of range 1..={max}")]
    DofSlotOutOfRange {
        slot: usize,
        max: usize,
        context: String,
    },
    /// The catalog is frozen and cannot grow anymore.
    #[error("dof catalog is frozen, cannot declare `{0}`")]
    CatalogFrozen(String),
    /// Numbering was requested with no DOF declared at all.
    #[error("no dof has been declared")]
    EmptyDofCatalog,
    /// A rule referenced a physical group that does not exist.
    #[error("physical group `{name}` used by {context} does not exist")]
    UnknownPhysicalGroup { name: String, context: String },
    /// Two physical groups share a name or an id.
    #[error("physical group `{name}` (id {id}) is declared more than once")]
    DuplicatePhysicalGroup { name: String, id: usize },
    /// The handler has already numbered a mesh in this run.
    #[error("dofs have already been numbered")]
    DofsAlreadyNumbered,
    /// A bulk domain is not covered by any active-domain rule.
    #[error("domain `{0}` has no active-dof rule assigned")]
    DomainWithoutRule(String),

    // ----- partitioning --------------------------------------------------
    /// Partitioning failed before any distribution took place.
    #[error(transparent)]
    Partition(#[from] PartitionError),

    // ----- consistency ---------------------------------------------------
    /// A node is not claimed by any active-domain rule.
    #[error("node {0} has not been assigned any dof")]
    NodeWithoutDofs(NodeId),
    /// Every node of an element maps to an inactive dof.
    #[error("dofs of element {0} are all zero")]
    ElementDofsAllZero(CellId),
    /// The gathered dof list of an element has an unexpected length.
    #[error("element {element} gathered {got} dof slots, expected {expected}")]
    ElementDofCountMismatch {
        element: CellId,
        expected: usize,
        got: usize,
    },

    // ----- protocol ------------------------------------------------------
    /// A frame arrived that does not match what the receiver expected.
    #[error("protocol error from rank {peer}: {detail}")]
    Protocol { peer: usize, detail: String },
    /// The communicator itself failed.
    #[error("communication error: {0}")]
    Comm(String),
    /// The run was aborted by another rank.
    #[error("run aborted (code {0})")]
    Aborted(i32),
}

impl MeshError {
    /// The failure category of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            MeshError::InvalidId
            | MeshError::InvalidMesh(_)
            | MeshError::DuplicateDofName(_)
            | MeshError::UnknownDofName { .. }
            | MeshError::DofSlotOutOfRange { .. }
            | MeshError::CatalogFrozen(_)
            | MeshError::EmptyDofCatalog
            | MeshError::DofsAlreadyNumbered
            | MeshError::UnknownPhysicalGroup { .. }
            | MeshError::DuplicatePhysicalGroup { .. }
            | MeshError::DomainWithoutRule(_) => ErrorCategory::Configuration,
            MeshError::Partition(_) => ErrorCategory::Partitioning,
            MeshError::NodeWithoutDofs(_)
            | MeshError::ElementDofsAllZero(_)
            | MeshError::ElementDofCountMismatch { .. } => ErrorCategory::Consistency,
            MeshError::Protocol { .. } | MeshError::Comm(_) | MeshError::Aborted(_) => {
                ErrorCategory::Protocol
            }
        }
    }

    /// Process exit code used when this error aborts the run.
    pub fn exit_code(&self) -> i32 {
        match self.category() {
            ErrorCategory::Configuration => 2,
            ErrorCategory::Partitioning => 3,
            ErrorCategory::Consistency => 4,
            ErrorCategory::Protocol => 5,
        }
    }

    pub(crate) fn protocol(peer: usize, detail: impl Into<String>) -> Self {
        MeshError::Protocol {
            peer,
            detail: detail.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_and_codes() {
        let e = MeshError::DuplicateDofName("ux".into());
        assert_eq!(e.category(), ErrorCategory::Configuration);
        assert_eq!(e.exit_code(), 2);

        let e: MeshError = PartitionError::TooManyRanks {
            ranks: 10,
            elements: 4,
        }
        .into();
        assert_eq!(e.category(), ErrorCategory::Partitioning);

        let e = MeshError::protocol(1, "bad sequence");
        assert_eq!(e.category(), ErrorCategory::Protocol);
        assert_eq!(e.to_string(), "protocol error from rank 1: bad sequence");
    }
}
