//! Rebuilding with identical inputs is bitwise deterministic.
//!
//! Each rank owns one unit quad of a 1 x n strip. Works at any communicator
//! size: `mpirun -n <ranks> cargo run --example mpi_rebuild`.

use mesh_rendezvous::geometry::BoundingBox;
use mesh_rendezvous::mesh::{ElementTopology, MeshData, MeshView};
use mesh_rendezvous::Rendezvous;
use mpi::traits::Communicator;

pub fn main() {
    let universe = mpi::initialize().unwrap();
    let comm = universe.world();

    let size = comm.size() as usize;
    let rank = comm.rank() as usize;

    // Rank r owns the quad [r, r+1] x [0, 1]; nodes are numbered column-wise
    // on the (size + 1) x 2 grid and shared corners are replicated into both
    // neighbouring inputs.
    let stride = size + 1;
    let node_ids = vec![rank, rank + 1, stride + rank + 1, stride + rank];
    let coords = vec![
        rank as f64,
        (rank + 1) as f64,
        (rank + 1) as f64,
        rank as f64, // x
        0.0,
        0.0,
        1.0,
        1.0, // y
    ];
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

    let global_box = BoundingBox::new([0.0, 0.0, 0.0, size as f64, 1.0, 0.0]);

    let first = Rendezvous::build(&comm, global_box, &mesh).unwrap();
    let second = Rendezvous::build(&comm, global_box, &mesh).unwrap();

    // The redistributed arrays agree bit for bit.

    assert_eq!(
        first.rendezvous_mesh().node_ids(),
        second.rendezvous_mesh().node_ids()
    );
    assert_eq!(
        first.rendezvous_mesh().element_ids(),
        second.rendezvous_mesh().element_ids()
    );
    assert_eq!(
        first.rendezvous_mesh().coords(),
        second.rendezvous_mesh().coords()
    );
    assert_eq!(
        first.rendezvous_mesh().connectivity(),
        second.rendezvous_mesh().connectivity()
    );

    // So do repeated queries against either build.

    let probes = [
        0.5 + rank as f64,
        0.25 * size as f64,
        0.5,
        0.5, // blocked: two points
    ];
    assert_eq!(first.rendezvous_procs(&probes), second.rendezvous_procs(&probes));
    assert_eq!(first.elements(&probes), second.elements(&probes));
    assert_eq!(first.elements(&probes), first.elements(&probes));

    if comm.rank() == 0 {
        println!("rebuild deterministic on {} ranks", comm.size());
    }
}
