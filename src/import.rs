//! Import planning and redistribution of the in-box mesh.
//!
//! After RCB has assigned a spatial region to every rank, each in-box
//! element has to reach every rank that owns any of its nodes, and the nodes
//! have to follow their elements. The planner computes those destination
//! sets, runs the distributor exchanges and assembles the received payload
//! into a [`RendezvousMesh`].

use std::collections::{BTreeSet, HashMap};

use itertools::{izip, Itertools};
use log::debug;
use mpi::traits::{CommunicatorCollectives, Equivalence};

use crate::{
    error::{RendezvousError, Result},
    mesh::{ElementTopology, MeshData, MeshView},
    rcb::RcbTree,
    rendezvous_mesh::RendezvousMesh,
    tools::{collective_and, distribute_by_rank},
    types::GlobalOrdinal,
};

/// Node payload crossing ranks: a global id with padded coordinates.
#[derive(Clone, Copy, Default, Equivalence)]
struct NodePacket {
    id: GlobalOrdinal,
    coords: [f64; 3],
}

/// Connectivity payload crossing ranks: one slot of one element.
///
/// Self-describing, so duplicate deliveries from multi-destination shipping
/// overwrite each other with identical data and no positional alignment
/// between exchanges is needed.
#[derive(Clone, Copy, Default, Equivalence)]
struct ConnPacket {
    element: GlobalOrdinal,
    slot: usize,
    node: GlobalOrdinal,
}

/// Destination ranks for every local element.
///
/// An in-box element must reach every rank that owns any of its nodes, so
/// its destination set is the union of the routed destinations of its nodes.
/// Elements outside the box get an empty set and do not participate.
pub(crate) fn element_destinations<M: MeshView>(
    mesh: &M,
    node_indices: &HashMap<GlobalOrdinal, usize>,
    elements_in_box: &[bool],
    route: impl Fn([f64; 3]) -> i32,
) -> Vec<BTreeSet<i32>> {
    let mut destinations = vec![BTreeSet::new(); mesh.num_elements()];

    for (e, dests) in destinations.iter_mut().enumerate() {
        if !elements_in_box[e] {
            continue;
        }
        for i in 0..mesh.nodes_per_element() {
            let n = node_indices[&mesh.element_node(i, e)];
            dests.insert(route(mesh.node_coords(n)));
        }
    }

    destinations
}

/// Destination ranks for every local node: the union of the destinations of
/// every in-box element the node belongs to.
///
/// Deliberately derived from the element destinations rather than from RCB:
/// a node pulled along with a cross-boundary element has to reach ranks its
/// own coordinates would never route to.
pub(crate) fn node_destinations<M: MeshView>(
    mesh: &M,
    node_indices: &HashMap<GlobalOrdinal, usize>,
    element_destinations: &[BTreeSet<i32>],
) -> Vec<BTreeSet<i32>> {
    let mut destinations = vec![BTreeSet::new(); mesh.num_nodes()];

    for (e, elem_dests) in element_destinations.iter().enumerate() {
        if elem_dests.is_empty() {
            continue;
        }
        for i in 0..mesh.nodes_per_element() {
            let n = node_indices[&mesh.element_node(i, e)];
            destinations[n].extend(elem_dests.iter().copied());
        }
    }

    destinations
}

/// Unroll per-item destination sets into parallel (ordinal, rank) arrays.
fn unroll(ids: &[GlobalOrdinal], destinations: &[BTreeSet<i32>]) -> (Vec<GlobalOrdinal>, Vec<i32>) {
    let mut out_ids = Vec::new();
    let mut out_ranks = Vec::new();

    for (&id, dests) in izip!(ids, destinations) {
        for &rank in dests {
            out_ids.push(id);
            out_ranks.push(rank);
        }
    }

    (out_ids, out_ranks)
}

/// Ship the in-box mesh to the rendezvous decomposition and assemble the
/// local rendezvous mesh. Collective.
pub fn import_mesh<M: MeshView, C: CommunicatorCollectives>(
    mesh: &M,
    node_indices: &HashMap<GlobalOrdinal, usize>,
    elements_in_box: &[bool],
    rcb: &RcbTree,
    comm: &C,
) -> Result<RendezvousMesh> {
    // Element destinations from the RCB routing of their node coordinates.
    let element_dests =
        element_destinations(mesh, node_indices, elements_in_box, |point| {
            rcb.destination_rank(point)
        });

    // Ship the element ordinals and dedup into an ordered id set.
    let (export_elements, export_element_ranks) = unroll(mesh.element_ids(), &element_dests);
    let import_elements = distribute_by_rank(&export_elements, &export_element_ranks, comm)?;
    let rendezvous_elements: BTreeSet<GlobalOrdinal> = import_elements.into_iter().collect();

    // Nodes follow their parent elements.
    let node_dests = node_destinations(mesh, node_indices, &element_dests);

    let (export_nodes, export_node_ranks) = unroll(mesh.node_ids(), &node_dests);
    let import_nodes = distribute_by_rank(&export_nodes, &export_node_ranks, comm)?;
    let rendezvous_nodes: BTreeSet<GlobalOrdinal> = import_nodes.into_iter().collect();

    debug!(
        "import plan: {} element exports -> {} local elements, {} node exports -> {} local nodes",
        export_elements.len(),
        rendezvous_elements.len(),
        export_nodes.len(),
        rendezvous_nodes.len()
    );

    // Coordinates travel once per (node, destination) pair.
    let mut node_packets = Vec::with_capacity(export_nodes.len());
    let mut node_packet_ranks = Vec::with_capacity(export_nodes.len());
    for (n, dests) in node_dests.iter().enumerate() {
        for &rank in dests {
            node_packets.push(NodePacket {
                id: mesh.node_ids()[n],
                coords: mesh.node_coords(n),
            });
            node_packet_ranks.push(rank);
        }
    }
    let import_node_packets = distribute_by_rank(&node_packets, &node_packet_ranks, comm)?;

    // Connectivity travels once per (element, slot, destination) triple.
    let nodes_per_element = mesh.nodes_per_element();
    let mut conn_packets = Vec::with_capacity(nodes_per_element * export_elements.len());
    let mut conn_packet_ranks = Vec::with_capacity(nodes_per_element * export_elements.len());
    for (e, dests) in element_dests.iter().enumerate() {
        for &rank in dests {
            for i in 0..nodes_per_element {
                conn_packets.push(ConnPacket {
                    element: mesh.element_ids()[e],
                    slot: i,
                    node: mesh.element_node(i, e),
                });
                conn_packet_ranks.push(rank);
            }
        }
    }
    let import_conn_packets = distribute_by_rank(&conn_packets, &conn_packet_ranks, comm)?;

    // Assemble locally; any rank observing an inconsistent payload fails the
    // build on every rank.
    let assembled = assemble(
        mesh.node_dim(),
        mesh.element_topology(),
        &rendezvous_nodes,
        &import_node_packets,
        &rendezvous_elements,
        &import_conn_packets,
    );

    if let Err(error) = &assembled {
        log::error!("rendezvous assembly failed locally: {error}");
    }
    if !collective_and(assembled.is_ok(), comm) {
        return Err(RendezvousError::Communication(
            "inconsistent rendezvous payload after redistribution".to_string(),
        ));
    }

    assembled
}

/// Assemble the received payload into the local rendezvous mesh.
///
/// The id sets fix the local ordering (ascending global ordinal); packets
/// fill the blocked arrays and may arrive in any order and multiplicity.
fn assemble(
    node_dim: usize,
    topology: ElementTopology,
    rendezvous_nodes: &BTreeSet<GlobalOrdinal>,
    node_packets: &[NodePacket],
    rendezvous_elements: &BTreeSet<GlobalOrdinal>,
    conn_packets: &[ConnPacket],
) -> Result<RendezvousMesh> {
    let node_ids = rendezvous_nodes.iter().copied().collect_vec();
    let element_ids = rendezvous_elements.iter().copied().collect_vec();

    let node_index: HashMap<GlobalOrdinal, usize> = node_ids
        .iter()
        .enumerate()
        .map(|(index, &id)| (id, index))
        .collect();
    let element_index: HashMap<GlobalOrdinal, usize> = element_ids
        .iter()
        .enumerate()
        .map(|(index, &id)| (id, index))
        .collect();

    let num_nodes = node_ids.len();
    let mut coords = vec![0.0; node_dim * num_nodes];
    let mut node_seen = vec![false; num_nodes];

    for packet in node_packets {
        let &n = node_index.get(&packet.id).ok_or_else(|| {
            RendezvousError::Communication(format!(
                "received coordinates for unlisted node {}",
                packet.id
            ))
        })?;
        for d in 0..node_dim {
            coords[d * num_nodes + n] = packet.coords[d];
        }
        node_seen[n] = true;
    }

    if let Some(n) = node_seen.iter().position(|&seen| !seen) {
        return Err(RendezvousError::Communication(format!(
            "no coordinates delivered for node {}",
            node_ids[n]
        )));
    }

    let nodes_per_element = topology.num_nodes();
    let num_elements = element_ids.len();
    let mut connectivity = vec![0; nodes_per_element * num_elements];
    let mut slot_seen = vec![false; nodes_per_element * num_elements];

    for packet in conn_packets {
        let &e = element_index.get(&packet.element).ok_or_else(|| {
            RendezvousError::Communication(format!(
                "received connectivity for unlisted element {}",
                packet.element
            ))
        })?;
        if packet.slot >= nodes_per_element {
            return Err(RendezvousError::Communication(format!(
                "connectivity slot {} out of range for element {}",
                packet.slot, packet.element
            )));
        }
        if !node_index.contains_key(&packet.node) {
            return Err(RendezvousError::Communication(format!(
                "element {} references undelivered node {}",
                packet.element, packet.node
            )));
        }
        connectivity[packet.slot * num_elements + e] = packet.node;
        slot_seen[packet.slot * num_elements + e] = true;
    }

    if let Some(missing) = slot_seen.iter().position(|&seen| !seen) {
        return Err(RendezvousError::Communication(format!(
            "no connectivity delivered for element {}",
            element_ids[missing % num_elements.max(1)]
        )));
    }

    Ok(RendezvousMesh::new(MeshData::new(
        node_dim,
        node_ids,
        coords,
        topology,
        element_ids,
        connectivity,
    )?))
}
