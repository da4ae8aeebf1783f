//! Rendezvous decomposition facade.

use std::collections::HashMap;

use itertools::Itertools;
use log::debug;
use mpi::traits::CommunicatorCollectives;

use crate::{
    cells::{LinearCells, PointInCell},
    error::{RendezvousError, Result},
    geometry::{BoundingBox, Point},
    import::import_mesh,
    kdtree::KdTree,
    mesh::MeshView,
    rcb::{self, RcbTree},
    rendezvous_mesh::RendezvousMesh,
    tools::collective_and,
    types::GlobalOrdinal,
};

/// The rendezvous decomposition of a distributed source mesh.
///
/// [`build`](Rendezvous::build) filters the source mesh against the global
/// box, partitions the surviving nodes with RCB, replicates every in-box
/// element onto each rank owning any of its nodes and indexes the resulting
/// local mesh with a kD-tree. The facade owns all of that state exclusively
/// and is immutable afterwards; the source mesh is only borrowed during the
/// build.
///
/// `build` is collective and must be invoked in the same order on every
/// rank. The queries are purely local and communication-free; since all
/// internal structures are read-only after the build, concurrent queries
/// from multiple threads are safe.
pub struct Rendezvous<P: PointInCell = LinearCells> {
    global_box: BoundingBox,
    node_dim: usize,
    rcb: RcbTree,
    mesh: RendezvousMesh,
    kdtree: KdTree<P>,
}

impl Rendezvous<LinearCells> {
    /// Build the decomposition with the built-in straight-sided cell
    /// predicate. Collective.
    pub fn build<M: MeshView, C: CommunicatorCollectives>(
        comm: &C,
        global_box: BoundingBox,
        mesh: &M,
    ) -> Result<Self> {
        Self::build_with_predicate(comm, global_box, mesh, LinearCells::default())
    }
}

impl<P: PointInCell> Rendezvous<P> {
    /// Build the decomposition with a caller-supplied point-in-cell
    /// predicate. Collective.
    ///
    /// Fails with [`RendezvousError::InvalidInput`] when the mesh or box
    /// violates the input contract, [`RendezvousError::Partition`] when no
    /// active points survive the box filter, and
    /// [`RendezvousError::Communication`] when redistribution delivers an
    /// inconsistent payload. Failures are collective: when any rank fails,
    /// every rank observes an error.
    pub fn build_with_predicate<M: MeshView, C: CommunicatorCollectives>(
        comm: &C,
        global_box: BoundingBox,
        mesh: &M,
        predicate: P,
    ) -> Result<Self> {
        let node_dim = mesh.node_dim();

        let validation = validate(&global_box, mesh);
        let all_valid = collective_and(validation.is_ok(), comm);
        let node_indices = validation?;
        if !all_valid {
            return Err(RendezvousError::InvalidInput(
                "invalid mesh input on another rank".to_string(),
            ));
        }

        // Filter the mesh against the box, then partition the active nodes.
        let (active_nodes, elements_in_box) = mesh_in_box(mesh, &global_box, &node_indices);

        debug!(
            "mesh filter kept {} of {} nodes and {} of {} elements",
            active_nodes.iter().filter(|&&active| active).count(),
            mesh.num_nodes(),
            elements_in_box.iter().filter(|&&in_box| in_box).count(),
            mesh.num_elements()
        );

        let points = active_nodes
            .iter()
            .enumerate()
            .filter(|(_, &active)| active)
            .map(|(n, _)| Point::new(mesh.node_coords(n), mesh.node_ids()[n]))
            .collect_vec();

        let rcb = rcb::partition(&points, &global_box, comm)?;

        // Ship the in-box mesh into the decomposition.
        let rendezvous_mesh = import_mesh(mesh, &node_indices, &elements_in_box, &rcb, comm)?;

        // Index the local elements.
        let kdtree = KdTree::build(&rendezvous_mesh, predicate);
        let all_indexed = collective_and(kdtree.is_ok(), comm);
        let kdtree = kdtree?;
        if !all_indexed {
            return Err(RendezvousError::Communication(
                "spatial index construction failed on another rank".to_string(),
            ));
        }

        Ok(Self {
            global_box,
            node_dim,
            rcb,
            mesh: rendezvous_mesh,
            kdtree,
        })
    }

    /// The rendezvous rank responsible for each point of a blocked
    /// coordinate array.
    ///
    /// Purely local. `coords` is dimension-major blocked with length
    /// `node_dim * num_points`; the output has one rank per point. Points
    /// outside the global box yield an unspecified but deterministic rank;
    /// callers are expected to pre-filter.
    pub fn rendezvous_procs(&self, coords: &[f64]) -> Vec<i32> {
        let num_points = checked_num_points(coords.len(), self.node_dim);

        (0..num_points)
            .map(|n| {
                self.rcb
                    .destination_rank(blocked_point(coords, self.node_dim, num_points, n))
            })
            .collect_vec()
    }

    /// The global ordinal of the local element containing each point of a
    /// blocked coordinate array, or
    /// [`NO_ELEMENT`](crate::constants::NO_ELEMENT) for points missing the
    /// local mesh.
    ///
    /// Purely local; callers route points to their rendezvous ranks first
    /// via [`rendezvous_procs`](Rendezvous::rendezvous_procs). Misses are
    /// ordinary control flow, not errors.
    pub fn elements(&self, coords: &[f64]) -> Vec<GlobalOrdinal> {
        let num_points = checked_num_points(coords.len(), self.node_dim);

        (0..num_points)
            .map(|n| {
                self.kdtree
                    .find_point(blocked_point(coords, self.node_dim, num_points, n))
            })
            .collect_vec()
    }

    /// The local rendezvous mesh.
    pub fn rendezvous_mesh(&self) -> &RendezvousMesh {
        &self.mesh
    }

    /// The cut tree of the decomposition.
    pub fn rcb(&self) -> &RcbTree {
        &self.rcb
    }

    /// The global bounding box the decomposition was built for.
    pub fn global_box(&self) -> &BoundingBox {
        &self.global_box
    }
}

fn checked_num_points(len: usize, node_dim: usize) -> usize {
    assert_eq!(
        len % node_dim,
        0,
        "blocked coordinate array length must be a multiple of the node dimension"
    );
    len / node_dim
}

fn blocked_point(coords: &[f64], node_dim: usize, num_points: usize, n: usize) -> [f64; 3] {
    let mut point = [0.0; 3];
    for (axis, out) in point.iter_mut().enumerate().take(node_dim) {
        *out = coords[axis * num_points + n];
    }
    point
}

/// Check the input contract and build the node index map shared by the
/// filter and the import planner.
fn validate<M: MeshView>(
    global_box: &BoundingBox,
    mesh: &M,
) -> Result<HashMap<GlobalOrdinal, usize>> {
    let node_dim = mesh.node_dim();
    if !(1..=3).contains(&node_dim) {
        return Err(RendezvousError::InvalidInput(format!(
            "node dimension {node_dim} outside the supported range 1..=3"
        )));
    }

    if !global_box.is_valid() {
        return Err(RendezvousError::InvalidInput(format!(
            "degenerate global box {global_box}"
        )));
    }

    if mesh.coords().len() != node_dim * mesh.num_nodes() {
        return Err(RendezvousError::InvalidInput(format!(
            "coordinate array length {} does not match {} nodes in {} dimensions",
            mesh.coords().len(),
            mesh.num_nodes(),
            node_dim
        )));
    }

    if mesh.connectivity().len() != mesh.nodes_per_element() * mesh.num_elements() {
        return Err(RendezvousError::InvalidInput(format!(
            "connectivity length {} does not match {} elements with {} nodes each",
            mesh.connectivity().len(),
            mesh.num_elements(),
            mesh.nodes_per_element()
        )));
    }

    if let Some(&id) = mesh
        .element_ids()
        .iter()
        .find(|&&id| id == crate::constants::NO_ELEMENT)
    {
        return Err(RendezvousError::InvalidInput(format!(
            "element ordinal {id} collides with the miss sentinel"
        )));
    }

    let node_indices: HashMap<GlobalOrdinal, usize> = mesh
        .node_ids()
        .iter()
        .enumerate()
        .map(|(index, &id)| (id, index))
        .collect();

    if node_indices.len() != mesh.num_nodes() {
        return Err(RendezvousError::InvalidInput(
            "duplicate node global ordinals".to_string(),
        ));
    }

    if let Some(&id) = mesh
        .connectivity()
        .iter()
        .find(|&id| !node_indices.contains_key(id))
    {
        return Err(RendezvousError::InvalidInput(format!(
            "connectivity references unknown node {id}"
        )));
    }

    Ok(node_indices)
}

/// Mark the active nodes and the in-box elements of the local mesh.
///
/// A node is in the box when its padded coordinates are; an element is in
/// the box when any of its nodes is. Every node of an in-box element is then
/// marked active even when it falls outside the box itself, so RCB sees the
/// full support of the elements it will receive.
fn mesh_in_box<M: MeshView>(
    mesh: &M,
    global_box: &BoundingBox,
    node_indices: &HashMap<GlobalOrdinal, usize>,
) -> (Vec<bool>, Vec<bool>) {
    let mut active_nodes = (0..mesh.num_nodes())
        .map(|n| global_box.contains(mesh.node_coords(n)))
        .collect_vec();

    let elements_in_box = (0..mesh.num_elements())
        .map(|e| {
            (0..mesh.nodes_per_element())
                .any(|i| active_nodes[node_indices[&mesh.element_node(i, e)]])
        })
        .collect_vec();

    for e in 0..mesh.num_elements() {
        if !elements_in_box[e] {
            continue;
        }
        for i in 0..mesh.nodes_per_element() {
            active_nodes[node_indices[&mesh.element_node(i, e)]] = true;
        }
    }

    (active_nodes, elements_in_box)
}
