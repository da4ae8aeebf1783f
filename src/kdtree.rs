//! Local spatial index over rendezvous element bounding volumes.

use std::cmp::Ordering;
use std::collections::HashMap;

use itertools::Itertools;

use crate::{
    cells::PointInCell,
    constants::{MAX_LEAF_SIZE, NO_ELEMENT},
    error::{RendezvousError, Result},
    geometry::BoundingBox,
    mesh::{ElementTopology, MeshView},
    types::GlobalOrdinal,
};

enum KdNode {
    Split {
        bounds: BoundingBox,
        left: usize,
        right: usize,
    },
    Leaf {
        bounds: BoundingBox,
        first: usize,
        count: usize,
    },
}

/// kD-tree over the element bounding volumes of a local mesh.
///
/// Axis-aligned bounds only prune the search; containment at leaf resolution
/// is decided by the point-in-cell predicate. The tree is immutable after
/// construction and queries are read-only, so concurrent lookups from
/// multiple threads are safe.
pub struct KdTree<P: PointInCell> {
    nodes: Vec<KdNode>,
    /// Element local indices, contiguous per leaf.
    order: Vec<usize>,
    element_ids: Vec<GlobalOrdinal>,
    element_boxes: Vec<BoundingBox>,
    /// Corner coordinates, `nodes_per_element` entries per element.
    corners: Vec<[f64; 3]>,
    nodes_per_element: usize,
    topology: ElementTopology,
    predicate: P,
}

impl<P: PointInCell> KdTree<P> {
    /// Build the tree over the elements of `mesh`.
    ///
    /// Splits top-down on the axis of largest centroid extent at the median
    /// centroid; leaves hold at most
    /// [`MAX_LEAF_SIZE`](crate::constants::MAX_LEAF_SIZE) elements.
    pub fn build<M: MeshView>(mesh: &M, predicate: P) -> Result<Self> {
        let nodes_per_element = mesh.nodes_per_element();
        let num_elements = mesh.num_elements();

        let node_index: HashMap<GlobalOrdinal, usize> = mesh
            .node_ids()
            .iter()
            .enumerate()
            .map(|(index, &id)| (id, index))
            .collect();

        // Gather the corner coordinates of every element once; queries and
        // bounding volumes both work off this array.
        let mut corners = Vec::with_capacity(num_elements * nodes_per_element);
        for e in 0..num_elements {
            for i in 0..nodes_per_element {
                let id = mesh.element_node(i, e);
                let &n = node_index.get(&id).ok_or_else(|| {
                    RendezvousError::InvalidInput(format!(
                        "connectivity references unknown node {id}"
                    ))
                })?;
                corners.push(mesh.node_coords(n));
            }
        }

        let element_boxes = (0..num_elements)
            .map(|e| {
                BoundingBox::from_points(
                    &corners[e * nodes_per_element..(e + 1) * nodes_per_element],
                )
            })
            .collect_vec();

        let centroids = (0..num_elements)
            .map(|e| {
                let mut centroid = [0.0; 3];
                for corner in &corners[e * nodes_per_element..(e + 1) * nodes_per_element] {
                    for axis in 0..3 {
                        centroid[axis] += corner[axis];
                    }
                }
                for axis in 0..3 {
                    centroid[axis] /= nodes_per_element as f64;
                }
                centroid
            })
            .collect_vec();

        let mut order = (0..num_elements).collect_vec();
        let mut nodes = Vec::new();
        if num_elements > 0 {
            build_node(&mut nodes, &mut order, 0, &element_boxes, &centroids);
        }

        Ok(Self {
            nodes,
            order,
            element_ids: mesh.element_ids().to_vec(),
            element_boxes,
            corners,
            nodes_per_element,
            topology: mesh.element_topology(),
            predicate,
        })
    }

    /// Global ordinal of an element containing `point`, or
    /// [`NO_ELEMENT`](crate::constants::NO_ELEMENT) when the point misses
    /// the mesh. A miss is ordinary control flow, not an error.
    ///
    /// When the point lies on a face shared by several elements, the element
    /// with the smallest global ordinal wins.
    pub fn find_point(&self, point: [f64; 3]) -> GlobalOrdinal {
        let mut best = NO_ELEMENT;

        if self.nodes.is_empty() {
            return best;
        }

        let mut stack = vec![0_usize];
        while let Some(index) = stack.pop() {
            match &self.nodes[index] {
                KdNode::Split {
                    bounds,
                    left,
                    right,
                } => {
                    // Both halves can contain the point; bounding volumes of
                    // siblings overlap.
                    if bounds.contains(point) {
                        stack.push(*right);
                        stack.push(*left);
                    }
                }
                KdNode::Leaf {
                    bounds,
                    first,
                    count,
                } => {
                    if !bounds.contains(point) {
                        continue;
                    }
                    for &e in &self.order[*first..*first + *count] {
                        let id = self.element_ids[e];
                        if id >= best || !self.element_boxes[e].contains(point) {
                            continue;
                        }
                        let corners = &self.corners
                            [e * self.nodes_per_element..(e + 1) * self.nodes_per_element];
                        if self.predicate.contains(self.topology, corners, point) {
                            best = id;
                        }
                    }
                }
            }
        }

        best
    }
}

/// Recursively build the node covering `order[..]`, whose first element has
/// absolute position `offset` in the leaf-contiguous order array.
fn build_node(
    nodes: &mut Vec<KdNode>,
    order: &mut [usize],
    offset: usize,
    element_boxes: &[BoundingBox],
    centroids: &[[f64; 3]],
) -> usize {
    let bounds = order
        .iter()
        .map(|&e| element_boxes[e])
        .reduce(|a, b| a.union(&b))
        .unwrap_or(BoundingBox::from_points(&[]));

    if order.len() <= MAX_LEAF_SIZE {
        let index = nodes.len();
        nodes.push(KdNode::Leaf {
            bounds,
            first: offset,
            count: order.len(),
        });
        return index;
    }

    // Split on the axis where the centroids spread the most; tie-break the
    // sort by element index so the layout is deterministic.
    let centroid_bounds =
        BoundingBox::from_points(&order.iter().map(|&e| centroids[e]).collect_vec());
    let axis = centroid_bounds.longest_axis();

    order.sort_unstable_by(|&a, &b| {
        centroids[a][axis]
            .partial_cmp(&centroids[b][axis])
            .unwrap_or(Ordering::Equal)
            .then(a.cmp(&b))
    });

    let mid = order.len() / 2;
    let index = nodes.len();
    nodes.push(KdNode::Leaf {
        bounds,
        first: offset,
        count: 0,
    });

    let (lower, upper) = order.split_at_mut(mid);
    let left = build_node(nodes, lower, offset, element_boxes, centroids);
    let right = build_node(nodes, upper, offset + mid, element_boxes, centroids);

    nodes[index] = KdNode::Split {
        bounds,
        left,
        right,
    };
    index
}
