//! Partition a random point cloud and check the routing invariants.
//!
//! Run with `mpirun -n <ranks> cargo run --example mpi_rcb`.

use mesh_rendezvous::geometry::BoundingBox;
use mesh_rendezvous::rcb;
use mesh_rendezvous::tools::generate_random_points;
use mpi::traits::Communicator;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

pub fn main() {
    // Initialise MPI
    let universe = mpi::initialize().unwrap();

    // Get the world communicator
    let comm = universe.world();

    // Initialise a seeded Rng.
    let mut rng = ChaCha8Rng::seed_from_u64(comm.rank() as u64);

    // Create `npoints` per rank in the unit cube.
    let npoints = 1000;
    let points = generate_random_points(npoints, &mut rng, &comm);

    let global_box = BoundingBox::new([0.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
    let tree = rcb::partition(&points, &global_box, &comm).unwrap();

    // The leaves assign exactly one region per rank and tile the box.

    let regions = tree.leaf_regions();
    assert_eq!(regions.len(), comm.size() as usize);

    let volume: f64 = regions
        .iter()
        .map(|(_, region)| region.extent(0) * region.extent(1) * region.extent(2))
        .sum();
    assert!((volume - 1.0).abs() < 1e-9);

    // Every local point routes to the rank whose region contains it.

    for point in &points {
        let rank = tree.destination_rank(point.coords());
        assert!((0..comm.size()).contains(&rank));

        let (leaf_rank, region) = regions[rank as usize];
        assert_eq!(leaf_rank, rank);
        assert!(region.contains(point.coords()));
    }

    // A second partition of the same cloud routes identically.

    let rebuilt = rcb::partition(&points, &global_box, &comm).unwrap();
    for point in &points {
        assert_eq!(
            tree.destination_rank(point.coords()),
            rebuilt.destination_rank(point.coords())
        );
    }

    if comm.rank() == 0 {
        println!("rcb routing checked on {} ranks", comm.size());
    }
}
