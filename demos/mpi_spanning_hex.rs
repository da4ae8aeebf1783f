//! Two ranks, one hexahedron spanning the cut.
//!
//! Rank 0 owns the whole mesh; after the build the hexahedron and all of its
//! nodes are replicated onto both ranks because its nodes straddle the RCB
//! cut. Run with `mpirun -n 2 cargo run --example mpi_spanning_hex`.

use mesh_rendezvous::constants::NO_ELEMENT;
use mesh_rendezvous::geometry::BoundingBox;
use mesh_rendezvous::mesh::{ElementTopology, MeshData, MeshView};
use mesh_rendezvous::Rendezvous;
use mpi::traits::Communicator;

pub fn main() {
    let universe = mpi::initialize().unwrap();
    let comm = universe.world();

    if comm.size() != 2 {
        eprintln!("this example requires exactly 2 ranks");
        return;
    }

    // The cube [0.25, 0.75]^3; rank 1 contributes nothing.
    let mesh = if comm.rank() == 0 {
        MeshData::new(
            3,
            (0..8).collect(),
            vec![
                0.25, 0.75, 0.75, 0.25, 0.25, 0.75, 0.75, 0.25, // x
                0.25, 0.25, 0.75, 0.75, 0.25, 0.25, 0.75, 0.75, // y
                0.25, 0.25, 0.25, 0.25, 0.75, 0.75, 0.75, 0.75, // z
            ],
            ElementTopology::Hexahedron,
            vec![7],
            vec![0, 1, 2, 3, 4, 5, 6, 7],
        )
        .unwrap()
    } else {
        MeshData::new(3, vec![], vec![], ElementTopology::Hexahedron, vec![], vec![]).unwrap()
    };

    let global_box = BoundingBox::new([0.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
    let rendezvous = Rendezvous::build(&comm, global_box, &mesh).unwrap();

    // The hexahedron straddles the cut, so every rank holds it whole.

    let local = rendezvous.rendezvous_mesh();
    assert_eq!(local.element_ids(), &[7]);
    assert_eq!(local.node_ids(), &[0, 1, 2, 3, 4, 5, 6, 7]);

    // Each rank resolves the interior point on its own side of the cut.

    let low = [0.25, 0.5, 0.5];
    let high = [0.75, 0.5, 0.5];

    assert_eq!(rendezvous.rendezvous_procs(&low), vec![0]);
    assert_eq!(rendezvous.rendezvous_procs(&high), vec![1]);

    if comm.rank() == 0 {
        assert_eq!(rendezvous.elements(&low), vec![7]);
    } else {
        assert_eq!(rendezvous.elements(&high), vec![7]);
    }

    // Points outside the hexahedron miss on both ranks.
    assert_eq!(rendezvous.elements(&[0.1, 0.1, 0.1]), vec![NO_ELEMENT]);

    if comm.rank() == 0 {
        println!("spanning hexahedron replicated onto both ranks");
    }
}
