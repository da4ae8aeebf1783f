//! Read-only mesh views and owned mesh storage.
//!
//! The rendezvous consumes meshes through the [`MeshView`] capability trait.
//! Coordinates use a dimension-major blocked layout: axis `k` of node `n`
//! lives at index `k * num_nodes + n`. Connectivity uses a node-slot-major
//! blocked layout: slot `i` of element `e` lives at index
//! `i * num_elements + e`. In particular the nodes of a single element are
//! never contiguous in memory.

use crate::error::{RendezvousError, Result};
use crate::types::GlobalOrdinal;

/// The linear element topologies understood by the rendezvous.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElementTopology {
    /// Two-node line segment.
    Line,
    /// Three-node triangle.
    Triangle,
    /// Four-node quadrilateral.
    Quadrilateral,
    /// Four-node tetrahedron.
    Tetrahedron,
    /// Eight-node hexahedron.
    Hexahedron,
    /// Five-node pyramid with a quadrilateral base.
    Pyramid,
    /// Six-node triangular prism.
    Wedge,
}

impl ElementTopology {
    /// Number of nodes of the linear element.
    pub fn num_nodes(&self) -> usize {
        match self {
            ElementTopology::Line => 2,
            ElementTopology::Triangle => 3,
            ElementTopology::Quadrilateral => 4,
            ElementTopology::Tetrahedron => 4,
            ElementTopology::Hexahedron => 8,
            ElementTopology::Pyramid => 5,
            ElementTopology::Wedge => 6,
        }
    }

    /// Reference dimension of the element.
    pub fn dimension(&self) -> usize {
        match self {
            ElementTopology::Line => 1,
            ElementTopology::Triangle | ElementTopology::Quadrilateral => 2,
            _ => 3,
        }
    }
}

/// Read-only capability set over a caller's mesh.
///
/// The rendezvous borrows a view only while building; it never mutates the
/// mesh and never assumes more than what is listed here. Implementations
/// must return node and element ids that are unique across the communicator
/// and arrays in the blocked layouts described in the module docs.
pub trait MeshView {
    /// Spatial dimension of the node coordinates, between 1 and 3.
    fn node_dim(&self) -> usize;

    /// Global ordinals of the locally held nodes.
    fn node_ids(&self) -> &[GlobalOrdinal];

    /// Node coordinates, dimension-major blocked, length
    /// `node_dim * num_nodes`.
    fn coords(&self) -> &[f64];

    /// Topology shared by all local elements.
    fn element_topology(&self) -> ElementTopology;

    /// Global ordinals of the locally held elements.
    fn element_ids(&self) -> &[GlobalOrdinal];

    /// Element connectivity, node-slot-major blocked, length
    /// `nodes_per_element * num_elements`. Entries are node global ordinals
    /// and must appear in [`node_ids`](MeshView::node_ids).
    fn connectivity(&self) -> &[GlobalOrdinal];

    /// Number of locally held nodes.
    fn num_nodes(&self) -> usize {
        self.node_ids().len()
    }

    /// Number of locally held elements.
    fn num_elements(&self) -> usize {
        self.element_ids().len()
    }

    /// Number of nodes per element.
    fn nodes_per_element(&self) -> usize {
        self.element_topology().num_nodes()
    }

    /// Coordinates of local node `n`, zero-padded to three dimensions.
    fn node_coords(&self, n: usize) -> [f64; 3] {
        let num_nodes = self.num_nodes();
        let coords = self.coords();
        let mut point = [0.0; 3];
        for (axis, out) in point.iter_mut().enumerate().take(self.node_dim()) {
            *out = coords[axis * num_nodes + n];
        }
        point
    }

    /// Global ordinal in slot `i` of local element `e`.
    fn element_node(&self, i: usize, e: usize) -> GlobalOrdinal {
        self.connectivity()[i * self.num_elements() + e]
    }
}

/// Owned mesh storage.
///
/// Used both by callers assembling an input mesh and internally as the
/// storage behind the rendezvous mesh.
pub struct MeshData {
    node_dim: usize,
    node_ids: Vec<GlobalOrdinal>,
    coords: Vec<f64>,
    topology: ElementTopology,
    element_ids: Vec<GlobalOrdinal>,
    connectivity: Vec<GlobalOrdinal>,
}

impl MeshData {
    /// Create owned mesh storage, checking the array lengths against the
    /// blocked layout contract.
    pub fn new(
        node_dim: usize,
        node_ids: Vec<GlobalOrdinal>,
        coords: Vec<f64>,
        topology: ElementTopology,
        element_ids: Vec<GlobalOrdinal>,
        connectivity: Vec<GlobalOrdinal>,
    ) -> Result<Self> {
        if !(1..=3).contains(&node_dim) {
            return Err(RendezvousError::InvalidInput(format!(
                "node dimension {node_dim} outside the supported range 1..=3"
            )));
        }
        if coords.len() != node_dim * node_ids.len() {
            return Err(RendezvousError::InvalidInput(format!(
                "coordinate array length {} does not match {} nodes in {} dimensions",
                coords.len(),
                node_ids.len(),
                node_dim
            )));
        }
        if connectivity.len() != topology.num_nodes() * element_ids.len() {
            return Err(RendezvousError::InvalidInput(format!(
                "connectivity length {} does not match {} elements with {} nodes each",
                connectivity.len(),
                element_ids.len(),
                topology.num_nodes()
            )));
        }

        Ok(Self {
            node_dim,
            node_ids,
            coords,
            topology,
            element_ids,
            connectivity,
        })
    }
}

impl MeshView for MeshData {
    fn node_dim(&self) -> usize {
        self.node_dim
    }

    fn node_ids(&self) -> &[GlobalOrdinal] {
        &self.node_ids
    }

    fn coords(&self) -> &[f64] {
        &self.coords
    }

    fn element_topology(&self) -> ElementTopology {
        self.topology
    }

    fn element_ids(&self) -> &[GlobalOrdinal] {
        &self.element_ids
    }

    fn connectivity(&self) -> &[GlobalOrdinal] {
        &self.connectivity
    }
}

#[cfg(test)]
mod test {
    use super::*;

    // Two unit quads side by side in 2D, six nodes numbered
    //
    //   3 -- 4 -- 5
    //   |    |    |
    //   0 -- 1 -- 2
    fn two_quads() -> MeshData {
        MeshData::new(
            2,
            vec![0, 1, 2, 3, 4, 5],
            vec![
                0.0, 1.0, 2.0, 0.0, 1.0, 2.0, // x
                0.0, 0.0, 0.0, 1.0, 1.0, 1.0, // y
            ],
            ElementTopology::Quadrilateral,
            vec![10, 11],
            vec![
                0, 1, // slot 0
                1, 2, // slot 1
                4, 5, // slot 2
                3, 4, // slot 3
            ],
        )
        .unwrap()
    }

    #[test]
    fn blocked_coordinate_access() {
        let mesh = two_quads();

        assert_eq!(mesh.num_nodes(), 6);
        assert_eq!(mesh.node_coords(0), [0.0, 0.0, 0.0]);
        assert_eq!(mesh.node_coords(2), [2.0, 0.0, 0.0]);
        assert_eq!(mesh.node_coords(4), [1.0, 1.0, 0.0]);
    }

    #[test]
    fn blocked_connectivity_access() {
        let mesh = two_quads();

        assert_eq!(mesh.num_elements(), 2);
        assert_eq!(mesh.nodes_per_element(), 4);

        let quad0: Vec<_> = (0..4).map(|i| mesh.element_node(i, 0)).collect();
        let quad1: Vec<_> = (0..4).map(|i| mesh.element_node(i, 1)).collect();

        assert_eq!(quad0, vec![0, 1, 4, 3]);
        assert_eq!(quad1, vec![1, 2, 5, 4]);
    }

    #[test]
    fn rejects_bad_dimension() {
        let result = MeshData::new(
            4,
            vec![0],
            vec![0.0; 4],
            ElementTopology::Line,
            vec![],
            vec![],
        );
        assert!(matches!(result, Err(RendezvousError::InvalidInput(_))));
    }

    #[test]
    fn rejects_mismatched_arrays() {
        let coords_short = MeshData::new(
            2,
            vec![0, 1],
            vec![0.0, 1.0, 0.0],
            ElementTopology::Line,
            vec![7],
            vec![0, 1],
        );
        assert!(matches!(
            coords_short,
            Err(RendezvousError::InvalidInput(_))
        ));

        let conn_short = MeshData::new(
            2,
            vec![0, 1],
            vec![0.0, 1.0, 0.0, 0.0],
            ElementTopology::Line,
            vec![7],
            vec![0],
        );
        assert!(matches!(conn_short, Err(RendezvousError::InvalidInput(_))));
    }
}
