//! `NodeId` / `CellId`: strong, zero-cost 1-based handles for mesh entities
//!
//! Nodes and elements of the mesh are numbered from 1, as in the mesh files
//! they come from. Both ids wrap a `NonZeroU64` so that 0 stays reserved as
//! the "invalid / inactive" sentinel used by the DOF tables and on the wire.
//!
//! This module provides:
//! - Transparent newtypes around `NonZeroU64` with the same layout as `u64`.
//! - Fallible constructors and cheap accessors, including the 0-based index
//!   used to address dense per-node / per-element tables.
//! - `Debug`/`Display`, ordering, hashing and serde so ids can be used in
//!   maps, sets and diagnostic exports.

use crate::mesh_error::MeshError;
use std::{fmt, num::NonZeroU64};

macro_rules! one_based_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
        )]
        #[repr(transparent)]
        pub struct $name(NonZeroU64);

        impl $name {
            /// Creates a new id from a raw 1-based value.
            ///
            /// Returns [`MeshError::InvalidId`] if `raw == 0`.
            #[inline]
            pub fn new(raw: u64) -> Result<Self, MeshError> {
                NonZeroU64::new(raw).map($name).ok_or(MeshError::InvalidId)
            }

            /// Creates an id from a 0-based table index.
            #[inline]
            pub fn from_index(index: usize) -> Self {
                // index + 1 is never zero
                $name(NonZeroU64::MIN.saturating_add(index as u64))
            }

            /// Returns the raw 1-based value.
            #[inline]
            pub const fn get(self) -> u64 {
                self.0.get()
            }

            /// Returns the 0-based index into dense tables.
            #[inline]
            pub const fn index(self) -> usize {
                (self.0.get() - 1) as usize
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_tuple(stringify!($name)).field(&self.get()).finish()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.get())
            }
        }

        impl TryFrom<u64> for $name {
            type Error = MeshError;
            fn try_from(raw: u64) -> Result<Self, MeshError> {
                $name::new(raw)
            }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> u64 {
                id.get()
            }
        }

        /// Ids travel over MPI exactly like a `u64`.
        #[cfg(feature = "mpi-support")]
        unsafe impl mpi::datatype::Equivalence for $name {
            type Out = <u64 as mpi::datatype::Equivalence>::Out;

            fn equivalent_datatype() -> Self::Out {
                u64::equivalent_datatype()
            }
        }
    };
}

one_based_id!(
    /// Global 1-based node index (`1..=NodesNum`).
    NodeId
);

one_based_id!(
    /// Global 1-based element index. Bulk elements come first
    /// (`1..=BulkElmtsNum`), boundary elements follow.
    CellId
);


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_rejected() {
        assert_eq!(NodeId::new(0), Err(MeshError::InvalidId));
        assert!(CellId::try_from(0u64).is_err());
    }

    #[test]
    fn index_roundtrip() {
        let n = NodeId::new(5).unwrap();
        assert_eq!(n.index(), 4);
        assert_eq!(NodeId::from_index(4), n);
        assert_eq!(u64::from(n), 5);
    }

    #[test]
    fn debug_and_display() {
        let c = CellId::new(7).unwrap();
        assert_eq!(format!("{:?}", c), "CellId(7)");
        assert_eq!(format!("{}", c), "7");
    }

    #[test]
    fn json_roundtrip() {
        let n = NodeId::new(123).unwrap();
        let s = serde_json::to_string(&n).unwrap();
        assert_eq!(s, "123");
        let back: NodeId = serde_json::from_str(&s).unwrap();
        assert_eq!(back, n);
    }
}
