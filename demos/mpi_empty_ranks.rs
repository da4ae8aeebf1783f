//! Ranks with no source mesh, and a rendezvous rank that receives nothing.
//!
//! Rank 0 owns the entire mesh; the other rank contributes nothing. The
//! build succeeds either way, and a rank whose region receives no elements
//! answers in-box queries with the miss sentinel. Run with
//! `mpirun -n 2 cargo run --example mpi_empty_ranks`.

use mesh_rendezvous::constants::NO_ELEMENT;
use mesh_rendezvous::geometry::BoundingBox;
use mesh_rendezvous::mesh::{ElementTopology, MeshData, MeshView};
use mesh_rendezvous::tools::gather_to_root;
use mesh_rendezvous::Rendezvous;
use mpi::traits::Communicator;

fn empty_mesh() -> MeshData {
    MeshData::new(3, vec![], vec![], ElementTopology::Tetrahedron, vec![], vec![]).unwrap()
}

pub fn main() {
    let universe = mpi::initialize().unwrap();
    let comm = universe.world();

    if comm.size() != 2 {
        eprintln!("this example requires exactly 2 ranks");
        return;
    }

    let global_box = BoundingBox::new([0.0, 0.0, 0.0, 1.0, 1.0, 1.0]);

    // One rank holds the whole mesh, the other holds nothing.

    let mesh = if comm.rank() == 0 {
        MeshData::new(
            3,
            vec![0, 1, 2, 3],
            vec![
                0.0, 1.0, 0.0, 0.0, // x
                0.0, 0.0, 1.0, 0.0, // y
                0.0, 0.0, 0.0, 1.0, // z
            ],
            ElementTopology::Tetrahedron,
            vec![42],
            vec![0, 1, 2, 3],
        )
        .unwrap()
    } else {
        empty_mesh()
    };

    let rendezvous = Rendezvous::build(&comm, global_box, &mesh).unwrap();
    let local = rendezvous.rendezvous_mesh();

    // Together the ranks still cover the element; a rank that received
    // nothing answers queries with the sentinel.

    if let Some(all_elements) = gather_to_root(local.element_ids(), &comm) {
        assert!(all_elements.contains(&42));
    }

    if local.num_elements() == 0 {
        assert_eq!(local.num_nodes(), 0);
        assert_eq!(rendezvous.elements(&[0.1, 0.1, 0.1]), vec![NO_ELEMENT]);
    } else {
        assert_eq!(rendezvous.elements(&[0.1, 0.1, 0.1]), vec![42]);
    }

    // A degenerate element with coincident nodes keeps the whole active set
    // on one side of every cut, so the other rank ends up owning an empty
    // rendezvous subset while still answering routed queries.

    let mesh = if comm.rank() == 0 {
        MeshData::new(
            3,
            vec![0, 1, 2, 3],
            vec![
                0.1, 0.1, 0.1, 0.1, // x
                0.1, 0.1, 0.1, 0.1, // y
                0.1, 0.1, 0.1, 0.1, // z
            ],
            ElementTopology::Tetrahedron,
            vec![42],
            vec![0, 1, 2, 3],
        )
        .unwrap()
    } else {
        empty_mesh()
    };

    let rendezvous = Rendezvous::build(&comm, global_box, &mesh).unwrap();
    let local = rendezvous.rendezvous_mesh();

    if comm.rank() == 0 {
        assert_eq!(local.element_ids(), &[42]);
    } else {
        assert_eq!(local.num_elements(), 0);
        assert_eq!(local.num_nodes(), 0);
    }

    // The empty rank still owns a region; in-box points routed there miss.

    let probe = [0.5, 0.5, 0.5];
    assert_eq!(rendezvous.rendezvous_procs(&probe), vec![1]);
    if comm.rank() == 1 {
        assert_eq!(rendezvous.elements(&probe), vec![NO_ELEMENT]);
    }

    if comm.rank() == 0 {
        println!("empty ranks handled");
    }
}
