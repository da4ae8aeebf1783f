//! Single-rank end-to-end scenarios.
//!
//! MPI is initialized once for the whole test, so the scenarios run
//! sequentially inside it. Multi-rank scenarios live in the demo drivers
//! under `demos/` and run under `mpirun`.

use mpi::topology::SimpleCommunicator;
use mpi::traits::Communicator;

use mesh_rendezvous::constants::NO_ELEMENT;
use mesh_rendezvous::geometry::BoundingBox;
use mesh_rendezvous::mesh::{ElementTopology, MeshData, MeshView};
use mesh_rendezvous::{Rendezvous, RendezvousError};

#[test]
fn single_rank_scenarios() {
    let universe = mpi::initialize().expect("MPI must be available");
    let world = universe.world();
    assert_eq!(world.size(), 1, "this test runs on a single rank");

    single_tetrahedron(&world);
    one_dimensional_line_mesh(&world);
    quad_grid_in_two_dimensions(&world);
    empty_active_set_fails_partition(&world);
    invalid_inputs_are_rejected(&world);
    rebuild_is_bitwise_deterministic(&world);
}

// One tetrahedron on the corner of the unit cube.
fn unit_tetrahedron() -> MeshData {
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
}

// A 2 x 2 grid of unit quads with row-major node numbering and element ids
// 100..104.
fn quad_grid() -> MeshData {
    let mut coords = vec![0.0; 18];
    for j in 0..3 {
        for i in 0..3 {
            coords[j * 3 + i] = i as f64;
            coords[9 + j * 3 + i] = j as f64;
        }
    }

    let mut connectivity = vec![0; 16];
    for j in 0..2 {
        for i in 0..2 {
            let e = j * 2 + i;
            let lower_left = j * 3 + i;
            connectivity[e] = lower_left;
            connectivity[4 + e] = lower_left + 1;
            connectivity[8 + e] = lower_left + 4;
            connectivity[12 + e] = lower_left + 3;
        }
    }

    MeshData::new(
        2,
        (0..9).collect(),
        coords,
        ElementTopology::Quadrilateral,
        vec![100, 101, 102, 103],
        connectivity,
    )
    .unwrap()
}

fn single_tetrahedron(comm: &SimpleCommunicator) {
    let global_box = BoundingBox::new([0.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
    let rendezvous = Rendezvous::build(comm, global_box, &unit_tetrahedron()).unwrap();

    let mesh = rendezvous.rendezvous_mesh();
    assert_eq!(mesh.node_ids(), &[0, 1, 2, 3]);
    assert_eq!(mesh.element_ids(), &[42]);

    assert_eq!(rendezvous.rendezvous_procs(&[0.1, 0.1, 0.1]), vec![0]);
    assert_eq!(rendezvous.elements(&[0.1, 0.1, 0.1]), vec![42]);

    // A point outside the box misses without failing, and blocked batches
    // mix hits and misses freely.
    assert_eq!(rendezvous.elements(&[2.0, 2.0, 2.0]), vec![NO_ELEMENT]);
    assert_eq!(
        rendezvous.elements(&[0.1, 2.0, 0.1, 2.0, 0.1, 2.0]),
        vec![42, NO_ELEMENT]
    );
    assert_eq!(rendezvous.elements(&[10.0, 10.0, 10.0]), vec![NO_ELEMENT]);
}

fn one_dimensional_line_mesh(comm: &SimpleCommunicator) {
    // One segment pokes out of the box; its outside node is pulled in as
    // active and the element stays queryable.
    let mesh = MeshData::new(
        1,
        vec![0, 1, 2],
        vec![0.2, 0.8, 1.5],
        ElementTopology::Line,
        vec![5, 6],
        vec![0, 1, 1, 2],
    )
    .unwrap();
    let global_box = BoundingBox::new([0.0, 0.0, 0.0, 1.0, 0.0, 0.0]);

    let rendezvous = Rendezvous::build(comm, global_box, &mesh).unwrap();

    assert_eq!(rendezvous.rendezvous_mesh().node_ids(), &[0, 1, 2]);
    assert_eq!(rendezvous.rendezvous_mesh().element_ids(), &[5, 6]);

    assert_eq!(rendezvous.elements(&[0.5]), vec![5]);
    assert_eq!(rendezvous.elements(&[0.8]), vec![5]);
    assert_eq!(rendezvous.elements(&[1.2]), vec![6]);
    assert_eq!(rendezvous.elements(&[-0.5]), vec![NO_ELEMENT]);
}

fn quad_grid_in_two_dimensions(comm: &SimpleCommunicator) {
    let global_box = BoundingBox::new([0.0, 0.0, 0.0, 2.0, 2.0, 0.0]);
    let rendezvous = Rendezvous::build(comm, global_box, &quad_grid()).unwrap();

    let mesh = rendezvous.rendezvous_mesh();
    assert_eq!(mesh.num_nodes(), 9);
    assert_eq!(mesh.element_ids(), &[100, 101, 102, 103]);

    // Blocked batch with one interior point per quad.
    let coords = [
        0.5, 1.5, 0.5, 1.5, // x
        0.5, 0.5, 1.5, 1.5, // y
    ];
    assert_eq!(rendezvous.elements(&coords), vec![100, 101, 102, 103]);

    // The center corner is shared by all four quads; the smallest ordinal
    // wins.
    assert_eq!(rendezvous.elements(&[1.0, 1.0]), vec![100]);
}

fn empty_active_set_fails_partition(comm: &SimpleCommunicator) {
    // The whole mesh sits outside the global box, so nothing is active.
    let mesh = MeshData::new(
        1,
        vec![0, 1],
        vec![10.0, 11.0],
        ElementTopology::Line,
        vec![5],
        vec![0, 1],
    )
    .unwrap();
    let global_box = BoundingBox::new([0.0, 0.0, 0.0, 1.0, 0.0, 0.0]);

    let result = Rendezvous::build(comm, global_box, &mesh);
    assert!(matches!(result, Err(RendezvousError::Partition(_))));
}

fn invalid_inputs_are_rejected(comm: &SimpleCommunicator) {
    let inverted_box = BoundingBox::new([1.0, 0.0, 0.0, 0.0, 1.0, 1.0]);
    let result = Rendezvous::build(comm, inverted_box, &unit_tetrahedron());
    assert!(matches!(result, Err(RendezvousError::InvalidInput(_))));

    // Connectivity referencing a node the mesh never lists.
    let stray = MeshData::new(
        1,
        vec![0, 1],
        vec![0.0, 1.0],
        ElementTopology::Line,
        vec![5],
        vec![0, 9],
    )
    .unwrap();
    let global_box = BoundingBox::new([0.0, 0.0, 0.0, 1.0, 0.0, 0.0]);
    let result = Rendezvous::build(comm, global_box, &stray);
    assert!(matches!(result, Err(RendezvousError::InvalidInput(_))));
}

fn rebuild_is_bitwise_deterministic(comm: &SimpleCommunicator) {
    let global_box = BoundingBox::new([0.0, 0.0, 0.0, 2.0, 2.0, 0.0]);

    let first = Rendezvous::build(comm, global_box, &quad_grid()).unwrap();
    let second = Rendezvous::build(comm, global_box, &quad_grid()).unwrap();

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

    // Identical queries return identical answers, bit for bit.
    let coords = [0.5, 1.0, 1.7, 0.5, 1.0, 0.2];
    assert_eq!(first.elements(&coords), second.elements(&coords));
    assert_eq!(
        first.rendezvous_procs(&coords),
        first.rendezvous_procs(&coords)
    );
}
