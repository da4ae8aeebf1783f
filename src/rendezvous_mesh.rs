//! The local rendezvous mesh container.

use std::collections::HashMap;

use crate::mesh::{ElementTopology, MeshData, MeshView};
use crate::types::GlobalOrdinal;

/// The redistributed mesh a rank holds after the rendezvous build.
///
/// A passive container: blocked storage plus global-to-local lookups. The
/// node and element id lists are in ascending global-ordinal order, which
/// makes the local indexing a deterministic function of the imported id
/// sets. Downstream components consume the container through [`MeshView`],
/// the same contract the source mesh satisfies.
pub struct RendezvousMesh {
    data: MeshData,
    node_index: HashMap<GlobalOrdinal, usize>,
    element_index: HashMap<GlobalOrdinal, usize>,
}

impl RendezvousMesh {
    pub(crate) fn new(data: MeshData) -> Self {
        let node_index = data
            .node_ids()
            .iter()
            .enumerate()
            .map(|(index, &id)| (id, index))
            .collect();
        let element_index = data
            .element_ids()
            .iter()
            .enumerate()
            .map(|(index, &id)| (id, index))
            .collect();

        Self {
            data,
            node_index,
            element_index,
        }
    }

    /// Local slot of a node global ordinal, if the node lives on this rank.
    pub fn node_index(&self, id: GlobalOrdinal) -> Option<usize> {
        self.node_index.get(&id).copied()
    }

    /// Local slot of an element global ordinal, if the element lives on this
    /// rank.
    pub fn element_index(&self, id: GlobalOrdinal) -> Option<usize> {
        self.element_index.get(&id).copied()
    }

    /// Export the local rendezvous mesh to an ASCII VTK unstructured grid.
    ///
    /// Intended for visual inspection of the decomposition; write one file
    /// per rank.
    pub fn export_to_vtk(&self, file_path: &str) -> std::result::Result<(), vtkio::Error> {
        use vtkio::model::*;

        let num_nodes = self.num_nodes();
        let num_elements = self.num_elements();
        let nodes_per_element = self.nodes_per_element();

        // Interleave the padded coordinates; VTK wants xyz triplets.
        let mut points = Vec::<f64>::with_capacity(3 * num_nodes);
        for n in 0..num_nodes {
            points.extend_from_slice(&self.node_coords(n));
        }

        // Connectivity in local indices, with one offset per element.
        let mut connectivity = Vec::<u64>::with_capacity(nodes_per_element * num_elements);
        let mut offsets = Vec::<u64>::with_capacity(num_elements);

        for e in 0..num_elements {
            for i in 0..nodes_per_element {
                let id = self.element_node(i, e);
                connectivity.push(self.node_index[&id] as u64);
            }
            offsets.push((nodes_per_element * (1 + e)) as u64);
        }

        let vtk_file = Vtk {
            version: Version::new((1, 0)),
            title: String::new(),
            byte_order: ByteOrder::LittleEndian,
            file_path: None,
            data: DataSet::inline(UnstructuredGridPiece {
                points: IOBuffer::F64(points),
                cells: Cells {
                    cell_verts: VertexNumbers::XML {
                        connectivity,
                        offsets,
                    },
                    types: vec![vtk_cell_type(self.element_topology()); num_elements],
                },
                data: Attributes {
                    point: vec![],
                    cell: vec![],
                },
            }),
        };

        vtk_file.export_ascii(file_path)
    }
}

impl MeshView for RendezvousMesh {
    fn node_dim(&self) -> usize {
        self.data.node_dim()
    }

    fn node_ids(&self) -> &[GlobalOrdinal] {
        self.data.node_ids()
    }

    fn coords(&self) -> &[f64] {
        self.data.coords()
    }

    fn element_topology(&self) -> ElementTopology {
        self.data.element_topology()
    }

    fn element_ids(&self) -> &[GlobalOrdinal] {
        self.data.element_ids()
    }

    fn connectivity(&self) -> &[GlobalOrdinal] {
        self.data.connectivity()
    }
}

fn vtk_cell_type(topology: ElementTopology) -> vtkio::model::CellType {
    use vtkio::model::CellType;

    match topology {
        ElementTopology::Line => CellType::Line,
        ElementTopology::Triangle => CellType::Triangle,
        ElementTopology::Quadrilateral => CellType::Quad,
        ElementTopology::Tetrahedron => CellType::Tetra,
        ElementTopology::Hexahedron => CellType::Hexahedron,
        ElementTopology::Pyramid => CellType::Pyramid,
        ElementTopology::Wedge => CellType::Wedge,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mesh::{ElementTopology, MeshData};

    fn single_line() -> RendezvousMesh {
        RendezvousMesh::new(
            MeshData::new(
                1,
                vec![20, 40],
                vec![0.0, 1.0],
                ElementTopology::Line,
                vec![7],
                vec![20, 40],
            )
            .unwrap(),
        )
    }

    #[test]
    fn global_to_local_lookups() {
        let mesh = single_line();

        assert_eq!(mesh.node_index(20), Some(0));
        assert_eq!(mesh.node_index(40), Some(1));
        assert_eq!(mesh.node_index(30), None);

        assert_eq!(mesh.element_index(7), Some(0));
        assert_eq!(mesh.element_index(8), None);
    }

    #[test]
    fn view_delegates_to_storage() {
        let mesh = single_line();

        assert_eq!(mesh.node_dim(), 1);
        assert_eq!(mesh.num_nodes(), 2);
        assert_eq!(mesh.node_coords(1), [1.0, 0.0, 0.0]);
        assert_eq!(mesh.element_node(1, 0), 40);
    }
}
