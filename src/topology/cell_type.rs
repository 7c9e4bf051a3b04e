//! Cell type metadata for mesh elements.
//!
//! Only the Lagrange shapes the mesh importers and generators produce are
//! modelled. Each variant knows its VTK tag, its topological dimension, its
//! node count, and how many nodes one of its facets carries (the sharing
//! threshold used to build the dual graph).

use crate::mesh_error::MeshError;

/// Common cell types for mesh elements.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum CellType {
    /// 0D vertex.
    Vertex,
    /// Linear 1D edge.
    Edge2,
    /// Quadratic 1D edge.
    Edge3,
    /// Cubic 1D edge.
    Edge4,
    /// Linear triangle.
    Tri3,
    /// Quadratic triangle.
    Tri6,
    /// Bilinear quadrilateral.
    Quad4,
    /// Serendipity quadrilateral.
    Quad8,
    /// Biquadratic quadrilateral.
    Quad9,
    /// Linear tetrahedron.
    Tet4,
    /// Quadratic tetrahedron.
    Tet10,
    /// Trilinear hexahedron.
    Hex8,
    /// Serendipity hexahedron.
    Hex20,
    /// Triquadratic hexahedron.
    Hex27,
}

impl Default for CellType {
    fn default() -> Self {
        CellType::Vertex
    }
}

impl CellType {
    /// Returns the topological dimension of the cell.
    pub fn dimension(self) -> u8 {
        match self {
            CellType::Vertex => 0,
            CellType::Edge2 | CellType::Edge3 | CellType::Edge4 => 1,
            CellType::Tri3
            | CellType::Tri6
            | CellType::Quad4
            | CellType::Quad8
            | CellType::Quad9 => 2,
            CellType::Tet4
            | CellType::Tet10
            | CellType::Hex8
            | CellType::Hex20
            | CellType::Hex27 => 3,
        }
    }

    /// Number of nodes of one cell.
    pub fn node_count(self) -> usize {
        match self {
            CellType::Vertex => 1,
            CellType::Edge2 => 2,
            CellType::Edge3 => 3,
            CellType::Edge4 => 4,
            CellType::Tri3 => 3,
            CellType::Tri6 => 6,
            CellType::Quad4 => 4,
            CellType::Quad8 => 8,
            CellType::Quad9 => 9,
            CellType::Tet4 => 4,
            CellType::Tet10 => 10,
            CellType::Hex8 => 8,
            CellType::Hex20 => 20,
            CellType::Hex27 => 27,
        }
    }

    /// Number of nodes on one facet: 1 for 1-D cells, the edge node count for
    /// 2-D cells and the face node count for 3-D cells.
    ///
    /// Two cells of this type are neighbours in the dual graph when they share
    /// at least this many nodes.
    pub fn face_node_count(self) -> usize {
        match self {
            CellType::Vertex | CellType::Edge2 | CellType::Edge3 | CellType::Edge4 => 1,
            CellType::Tri3 | CellType::Quad4 => 2,
            CellType::Tri6 | CellType::Quad8 | CellType::Quad9 => 3,
            CellType::Tet4 => 3,
            CellType::Tet10 => 6,
            CellType::Hex8 => 4,
            CellType::Hex20 => 8,
            CellType::Hex27 => 9,
        }
    }

    /// The VTK cell type tag.
    pub fn vtk_id(self) -> u8 {
        match self {
            CellType::Vertex => 1,
            CellType::Edge2 => 3,
            CellType::Tri3 => 5,
            CellType::Quad4 => 9,
            CellType::Tet4 => 10,
            CellType::Hex8 => 12,
            CellType::Edge3 => 21,
            CellType::Tri6 => 22,
            CellType::Quad8 => 23,
            CellType::Tet10 => 24,
            CellType::Hex20 => 25,
            CellType::Quad9 => 28,
            CellType::Hex27 => 29,
            CellType::Edge4 => 35,
        }
    }

    /// Look up a cell type from its VTK tag.
    pub fn from_vtk(tag: u8) -> Result<Self, MeshError> {
        let ty = match tag {
            1 => CellType::Vertex,
            3 => CellType::Edge2,
            5 => CellType::Tri3,
            9 => CellType::Quad4,
            10 => CellType::Tet4,
            12 => CellType::Hex8,
            21 => CellType::Edge3,
            22 => CellType::Tri6,
            23 => CellType::Quad8,
            24 => CellType::Tet10,
            25 => CellType::Hex20,
            28 => CellType::Quad9,
            29 => CellType::Hex27,
            35 => CellType::Edge4,
            other => {
                return Err(MeshError::InvalidMesh(format!(
                    "unsupported vtk cell type {other}"
                )));
            }
        };
        Ok(ty)
    }

    /// Facet type of a cell (the boundary element type of a bulk mesh).
    pub fn facet(self) -> Option<CellType> {
        match self {
            CellType::Vertex => None,
            CellType::Edge2 | CellType::Edge3 | CellType::Edge4 => Some(CellType::Vertex),
            CellType::Tri3 | CellType::Quad4 => Some(CellType::Edge2),
            CellType::Tri6 | CellType::Quad8 | CellType::Quad9 => Some(CellType::Edge3),
            CellType::Tet4 => Some(CellType::Tri3),
            CellType::Tet10 => Some(CellType::Tri6),
            CellType::Hex8 => Some(CellType::Quad4),
            CellType::Hex20 => Some(CellType::Quad8),
            CellType::Hex27 => Some(CellType::Quad9),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [CellType; 14] = [
        CellType::Vertex,
        CellType::Edge2,
        CellType::Edge3,
        CellType::Edge4,
        CellType::Tri3,
        CellType::Tri6,
        CellType::Quad4,
        CellType::Quad8,
        CellType::Quad9,
        CellType::Tet4,
        CellType::Tet10,
        CellType::Hex8,
        CellType::Hex20,
        CellType::Hex27,
    ];

    #[test]
    fn vtk_tags_are_bijective() {
        for ty in ALL {
            assert_eq!(CellType::from_vtk(ty.vtk_id()).unwrap(), ty);
        }
        assert!(CellType::from_vtk(0).is_err());
    }

    #[test]
    fn facet_node_count_matches_facet_type() {
        for ty in ALL {
            if let Some(f) = ty.facet() {
                assert_eq!(f.node_count(), ty.face_node_count(), "{ty:?}");
                assert_eq!(f.dimension() + 1, ty.dimension());
            }
        }
    }
}
