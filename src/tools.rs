//! MPI utility routines shared by the collective build phases.

use itertools::Itertools;
use mpi::{
    collective::SystemOperation,
    datatype::{Partition, PartitionMut},
    traits::{Communicator, CommunicatorCollectives, Equivalence, Root},
};
use rand::Rng;

use crate::error::{RendezvousError, Result};
use crate::geometry::Point;

/// Compute displacements from a vector of counts.
///
/// This is useful for global MPI varcount operations. Let
/// counts be [3, 4, 5]. Then the corresponding displacements are
/// [0, 3, 7]. Note that the last element `5` is ignored.
pub fn displacements(counts: &[i32]) -> Vec<i32> {
    counts
        .iter()
        .scan(0, |acc, &x| {
            let tmp = *acc;
            *acc += x;
            Some(tmp)
        })
        .collect()
}

/// Get the global size of a distributed array.
pub fn global_size<T, C: CommunicatorCollectives>(arr: &[T], comm: &C) -> usize {
    let local_size = arr.len();
    let mut global_size = 0;

    comm.all_reduce_into(&local_size, &mut global_size, SystemOperation::sum());

    global_size
}

/// Logical-and a local success flag across the communicator.
///
/// Collective phases call this at their end so that a failure on any rank is
/// observed by every rank.
pub fn collective_and<C: CommunicatorCollectives>(ok: bool, comm: &C) -> bool {
    let mut global_ok = false;

    comm.all_reduce_into(&ok, &mut global_ok, SystemOperation::logical_and());

    global_ok
}

/// Redistribute an array via an all-to-all varcount operation.
///
/// `arr` must already be ordered by destination rank and `counts[r]` is the
/// number of leading-order items bound for rank `r`. Received items are
/// grouped by source rank in rank order, preserving each source's send
/// order.
pub fn redistribute<T: Equivalence + Default + Copy, C: CommunicatorCollectives>(
    arr: &[T],
    counts: &[i32],
    comm: &C,
) -> Vec<T> {
    // First communicate how many items everybody gets from each process.

    let mut counts_from_processor = vec![0_i32; comm.size() as usize];

    comm.all_to_all_into(counts, &mut counts_from_processor);

    // Each process now knows how much it gets from all the others, so the
    // actual elements can move in a single varcount exchange.

    let send_displs = displacements(counts);
    let send_partition = Partition::new(arr, counts.to_vec(), &send_displs[..]);

    let mut recvbuffer =
        vec![T::default(); counts_from_processor.iter().sum::<i32>() as usize];

    let recv_displs = displacements(&counts_from_processor);
    let mut recv_partition =
        PartitionMut::new(&mut recvbuffer[..], counts_from_processor, &recv_displs[..]);

    comm.all_to_all_varcount_into(&send_partition, &mut recv_partition);

    recvbuffer
}

/// Send each item to its destination rank and return the items received.
///
/// The inverse-communication primitive of the import planner: the caller
/// names a destination per item and learns nothing about the senders. Items
/// are delivered grouped by source rank in rank order, preserving each
/// sender's emission order, so repeated exchanges with identically ordered
/// inputs align.
///
/// Fails with [`RendezvousError::Communication`] on every rank when any rank
/// supplies a destination outside the communicator.
pub fn distribute_by_rank<T: Equivalence + Default + Copy, C: CommunicatorCollectives>(
    items: &[T],
    dest_ranks: &[i32],
    comm: &C,
) -> Result<Vec<T>> {
    assert_eq!(items.len(), dest_ranks.len());

    let size = comm.size();

    // Destination validation has to be agreed on before anyone enters the
    // exchange collectives.
    let ok = dest_ranks.iter().all(|&rank| rank >= 0 && rank < size);
    if !collective_and(ok, comm) {
        return Err(RendezvousError::Communication(
            "destination rank outside the communicator".to_string(),
        ));
    }

    // Stable order by destination keeps items from the same sender in their
    // emission order.
    let mut order = (0..items.len()).collect_vec();
    order.sort_by_key(|&index| dest_ranks[index]);
    let sorted = order.iter().map(|&index| items[index]).collect_vec();

    let mut counts = vec![0_i32; size as usize];
    for &rank in dest_ranks {
        counts[rank as usize] += 1;
    }

    Ok(redistribute(&sorted, &counts, comm))
}

/// Gather a distributed array to the root rank.
///
/// The result is a `Vec<T>` on root and `None` on all other ranks.
pub fn gather_to_root<T: Equivalence + Default + Copy, C: CommunicatorCollectives>(
    arr: &[T],
    comm: &C,
) -> Option<Vec<T>> {
    let n = arr.len() as i32;
    let rank = comm.rank();
    let size = comm.size();
    let root_process = comm.process_at_rank(0);

    // We first communicate the length of each local array to root.

    if rank == 0 {
        let mut counts = vec![0_i32; size as usize];
        root_process.gather_into_root(&n, &mut counts);

        // Root now has all counts and can do a varcount gather for the
        // array elements.

        let nelements = counts.iter().sum::<i32>() as usize;
        let mut gathered = vec![T::default(); nelements];

        let displs = displacements(counts.as_slice());
        let mut partition = PartitionMut::new(&mut gathered[..], counts, &displs[..]);

        root_process.gather_varcount_into_root(arr, &mut partition);

        Some(gathered)
    } else {
        root_process.gather_into(&n);
        root_process.gather_varcount_into(arr);
        None
    }
}

/// Generate random points in the unit cube with globally unique ids.
///
/// Used by the MPI demo drivers; ids are unique across the communicator as
/// long as every rank requests the same `npoints`.
pub fn generate_random_points<R: Rng + ?Sized, C: Communicator>(
    npoints: usize,
    rng: &mut R,
    comm: &C,
) -> Vec<Point> {
    let rank = comm.rank() as usize;

    (0..npoints)
        .map(|index| {
            Point::new(
                [rng.gen(), rng.gen(), rng.gen()],
                npoints * rank + index,
            )
        })
        .collect_vec()
}

#[cfg(test)]
mod test {
    use super::displacements;

    #[test]
    fn displacements_are_exclusive_prefix_sums() {
        assert_eq!(displacements(&[3, 4, 5]), vec![0, 3, 7]);
        assert_eq!(displacements(&[0, 2, 0, 1]), vec![0, 0, 2, 2]);
        assert_eq!(displacements(&[]), Vec::<i32>::new());
    }
}
