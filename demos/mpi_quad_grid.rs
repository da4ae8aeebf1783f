//! Four ranks, a 2 x 2 grid of quadrilaterals in two dimensions.
//!
//! Each rank owns one quad initially; after the build, boundary quads are
//! replicated onto every rank owning one of their nodes. Run with
//! `mpirun -n 4 cargo run --example mpi_quad_grid`.

use itertools::Itertools;
use mesh_rendezvous::geometry::BoundingBox;
use mesh_rendezvous::mesh::{ElementTopology, MeshData, MeshView};
use mesh_rendezvous::tools::gather_to_root;
use mesh_rendezvous::Rendezvous;
use mpi::traits::Communicator;

pub fn main() {
    let universe = mpi::initialize().unwrap();
    let comm = universe.world();

    if comm.size() != 4 {
        eprintln!("this example requires exactly 4 ranks");
        return;
    }

    // Rank r owns the unit quad with lower-left grid corner (r % 2, r / 2).
    // Nodes are numbered row-major on the 3 x 3 grid and replicated into the
    // input of every rank whose quad touches them.
    let rank = comm.rank() as usize;
    let (i0, j0) = (rank % 2, rank / 2);

    let node_ids = vec![
        j0 * 3 + i0,
        j0 * 3 + i0 + 1,
        (j0 + 1) * 3 + i0 + 1,
        (j0 + 1) * 3 + i0,
    ];
    let coords = vec![
        i0 as f64,
        (i0 + 1) as f64,
        (i0 + 1) as f64,
        i0 as f64, // x
        j0 as f64,
        j0 as f64,
        (j0 + 1) as f64,
        (j0 + 1) as f64, // y
    ];

    // With a single element the slot-major connectivity is the corner list
    // itself.
    let connectivity = node_ids.clone();

    let mesh = MeshData::new(
        2,
        node_ids,
        coords,
        ElementTopology::Quadrilateral,
        vec![rank],
        connectivity,
    )
    .unwrap();

    let global_box = BoundingBox::new([0.0, 0.0, 0.0, 2.0, 2.0, 0.0]);
    let rendezvous = Rendezvous::build(&comm, global_box, &mesh).unwrap();

    let local = rendezvous.rendezvous_mesh();

    // Local id lists are strictly ascending, so there are no duplicates.

    assert!(local.node_ids().windows(2).all(|w| w[0] < w[1]));
    assert!(local.element_ids().windows(2).all(|w| w[0] < w[1]));

    // Every element present on this rank arrived with all of its nodes.

    for e in 0..local.num_elements() {
        for i in 0..local.nodes_per_element() {
            let id = local.element_node(i, e);
            assert!(local.node_index(id).is_some());
        }
    }

    // The center corner belongs to all four quads. Every rank routes it to
    // the same owner, and every rank holding a quad that touches it resolves
    // it to one of the four.

    let center = [1.0, 1.0];
    let owner = rendezvous.rendezvous_procs(&center)[0];

    if let Some(owners) = gather_to_root(&[owner], &comm) {
        assert!(owners.iter().all(|&o| o == owner));
    }

    let found = rendezvous.elements(&center)[0];
    if local.num_elements() > 0 {
        assert!((0..4).contains(&found));
    }

    // Together the ranks cover every source element at least once.

    if let Some(all_elements) = gather_to_root(local.element_ids(), &comm) {
        let distinct = all_elements.iter().copied().collect::<std::collections::BTreeSet<_>>();
        assert_eq!(distinct.into_iter().collect_vec(), vec![0, 1, 2, 3]);
        assert!(all_elements.len() >= 4);
    }

    if comm.rank() == 0 {
        println!("quad grid rendezvous checked on 4 ranks");
    }
}
