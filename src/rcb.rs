//! Parallel recursive coordinate bisection.
//!
//! [`partition`] splits a distributed point set along alternating median
//! cuts until every rank of the communicator owns one spatial region. The
//! resulting [`RcbTree`] is identical on every rank, so routing a point to
//! its owning rank is a purely local tree walk.

use itertools::Itertools;
use log::{debug, trace};
use mpi::{collective::SystemOperation, traits::CommunicatorCollectives};

use crate::{
    constants::MEDIAN_ITERS,
    error::{RendezvousError, Result},
    geometry::{BoundingBox, Point},
    tools::global_size,
};

/// A node of the cut tree.
#[derive(Clone, Copy, Debug)]
enum RcbNode {
    /// Interior cut; points with `coords[axis] <= value` descend left.
    Cut {
        axis: usize,
        value: f64,
        left: usize,
        right: usize,
    },
    /// Terminal region owned by one rank.
    Leaf { rank: i32 },
}

/// The rendezvous decomposition of an active point set.
///
/// Built collectively by [`partition`]; immutable and identical across the
/// communicator afterwards.
pub struct RcbTree {
    nodes: Vec<RcbNode>,
    global_box: BoundingBox,
}

impl RcbTree {
    /// The rank responsible for the region containing `point`.
    ///
    /// Points exactly on a cut plane descend to the lower side, so they
    /// resolve to the lower-numbered rank. The walk is total: points outside
    /// the global box yield a deterministic but otherwise unspecified rank,
    /// and callers are expected to pre-filter.
    pub fn destination_rank(&self, point: [f64; 3]) -> i32 {
        let mut index = 0;
        loop {
            match self.nodes[index] {
                RcbNode::Cut {
                    axis,
                    value,
                    left,
                    right,
                } => {
                    index = if point[axis] <= value { left } else { right };
                }
                RcbNode::Leaf { rank } => return rank,
            }
        }
    }

    /// The global box the decomposition tiles.
    pub fn global_box(&self) -> &BoundingBox {
        &self.global_box
    }

    /// The leaf regions and their owning ranks, in ascending rank order.
    ///
    /// The regions tile the global box; neighbouring regions share their cut
    /// plane, with on-plane points routed to the lower rank.
    pub fn leaf_regions(&self) -> Vec<(i32, BoundingBox)> {
        let mut regions = Vec::new();
        self.collect_leaves(0, self.global_box, &mut regions);
        regions
    }

    fn collect_leaves(&self, index: usize, region: BoundingBox, out: &mut Vec<(i32, BoundingBox)>) {
        match self.nodes[index] {
            RcbNode::Cut {
                axis,
                value,
                left,
                right,
            } => {
                let (lower, upper) = region.split_at(axis, value);
                self.collect_leaves(left, lower, out);
                self.collect_leaves(right, upper, out);
            }
            RcbNode::Leaf { rank } => out.push((rank, region)),
        }
    }
}

/// Build the rendezvous decomposition of a distributed point set.
///
/// Collective across `comm`. Every rank passes its local share of the active
/// points and receives an identical tree. Fails with
/// [`RendezvousError::Partition`] when the global point set is empty or
/// smaller than the communicator; both conditions are derived from an
/// all-reduced count, so all ranks agree on the outcome.
pub fn partition<C: CommunicatorCollectives>(
    points: &[Point],
    global_box: &BoundingBox,
    comm: &C,
) -> Result<RcbTree> {
    let size = comm.size();
    let total = global_size(points, comm);

    if total == 0 {
        return Err(RendezvousError::Partition(
            "no active points in the global box".to_string(),
        ));
    }
    if total < size as usize {
        return Err(RendezvousError::Partition(format!(
            "{size} ranks but only {total} active points"
        )));
    }

    let mut builder = TreeBuilder {
        nodes: Vec::new(),
        comm,
    };

    let all_local = (0..points.len()).collect_vec();
    builder.bisect(points, all_local, *global_box, 0, size);

    debug!(
        "rcb partition of {} points into {} regions over {} tree nodes",
        total,
        size,
        builder.nodes.len()
    );

    Ok(RcbTree {
        nodes: builder.nodes,
        global_box: *global_box,
    })
}

struct TreeBuilder<'a, C> {
    nodes: Vec<RcbNode>,
    comm: &'a C,
}

impl<C: CommunicatorCollectives> TreeBuilder<'_, C> {
    /// Recursively cut `region` for the rank range
    /// `[first_rank, first_rank + num_ranks)` and return the node index.
    ///
    /// `in_region` holds the local points inside `region`. Every rank runs
    /// the identical recursion, so the collective calls inside the median
    /// search line up and all ranks assemble the same node array.
    fn bisect(
        &mut self,
        points: &[Point],
        in_region: Vec<usize>,
        region: BoundingBox,
        first_rank: i32,
        num_ranks: i32,
    ) -> usize {
        if num_ranks == 1 {
            let index = self.nodes.len();
            self.nodes.push(RcbNode::Leaf { rank: first_rank });
            return index;
        }

        let left_ranks = num_ranks / 2;
        let axis = region.longest_axis();
        let cut = self.median_cut(points, &in_region, &region, axis, left_ranks, num_ranks);

        trace!(
            "cut ranks {}..{} on axis {} at {}",
            first_rank,
            first_rank + num_ranks,
            axis,
            cut
        );

        // Reserve the slot before recursing so children end up behind their
        // parent.
        let index = self.nodes.len();
        self.nodes.push(RcbNode::Leaf { rank: first_rank });

        let (lower_region, upper_region) = region.split_at(axis, cut);
        let (lower_points, upper_points): (Vec<usize>, Vec<usize>) = in_region
            .into_iter()
            .partition(|&n| points[n].coords()[axis] <= cut);

        let left = self.bisect(points, lower_points, lower_region, first_rank, left_ranks);
        let right = self.bisect(
            points,
            upper_points,
            upper_region,
            first_rank + left_ranks,
            num_ranks - left_ranks,
        );

        self.nodes[index] = RcbNode::Cut {
            axis,
            value: cut,
            left,
            right,
        };
        index
    }

    /// The weighted median cut of the points inside `region` along `axis`.
    ///
    /// Bisects on the coordinate value with all-reduced counts until the
    /// bracket is resolved, then snaps onto the smallest data coordinate in
    /// the bracket so the cut lies exactly on a point coordinate. The search
    /// maintains `count(lo) < target <= count(hi)` where `count(x)` is the
    /// global number of in-region points with coordinate `<= x`.
    fn median_cut(
        &self,
        points: &[Point],
        in_region: &[usize],
        region: &BoundingBox,
        axis: usize,
        left_ranks: i32,
        num_ranks: i32,
    ) -> f64 {
        let (axis_lo, axis_hi) = region.bounds(axis);

        let local_count = in_region.len();
        let mut region_count = 0_usize;
        self.comm
            .all_reduce_into(&local_count, &mut region_count, SystemOperation::sum());

        // An empty subregion carries no median; cut at the midpoint.
        if region_count == 0 {
            return 0.5 * (axis_lo + axis_hi);
        }

        let target = ((region_count * left_ranks as usize) / num_ranks as usize).max(1);

        let mut lo = axis_lo - 0.5 * (axis_hi - axis_lo).max(1.0);
        let mut hi = axis_hi;

        for _ in 0..MEDIAN_ITERS {
            let mid = 0.5 * (lo + hi);
            if mid <= lo || mid >= hi {
                break;
            }

            let local = in_region
                .iter()
                .filter(|&&n| points[n].coords()[axis] <= mid)
                .count();
            let mut count = 0_usize;
            self.comm
                .all_reduce_into(&local, &mut count, SystemOperation::sum());

            if count < target {
                lo = mid;
            } else {
                hi = mid;
            }
        }

        // Snap onto the smallest coordinate in (lo, hi]. The bracket
        // invariant guarantees at least one point lives there.
        let local_min = in_region
            .iter()
            .map(|&n| points[n].coords()[axis])
            .filter(|&c| c > lo && c <= hi)
            .fold(f64::INFINITY, f64::min);
        let mut cut: f64 = 0.0;
        self.comm
            .all_reduce_into(&local_min, &mut cut, SystemOperation::min());

        if cut.is_finite() {
            cut
        } else {
            0.5 * (lo + hi)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    // A two-cut tree over [0, 4] x [0, 2] x [0, 0]:
    //
    //   x <= 2 ? (y <= 1 ? rank 0 : rank 1) : rank 2
    fn three_rank_tree() -> RcbTree {
        RcbTree {
            nodes: vec![
                RcbNode::Cut {
                    axis: 0,
                    value: 2.0,
                    left: 1,
                    right: 4,
                },
                RcbNode::Cut {
                    axis: 1,
                    value: 1.0,
                    left: 2,
                    right: 3,
                },
                RcbNode::Leaf { rank: 0 },
                RcbNode::Leaf { rank: 1 },
                RcbNode::Leaf { rank: 2 },
            ],
            global_box: BoundingBox::new([0.0, 0.0, 0.0, 4.0, 2.0, 0.0]),
        }
    }

    #[test]
    fn routing_walks_the_cuts() {
        let tree = three_rank_tree();

        assert_eq!(tree.destination_rank([1.0, 0.5, 0.0]), 0);
        assert_eq!(tree.destination_rank([1.0, 1.5, 0.0]), 1);
        assert_eq!(tree.destination_rank([3.0, 0.5, 0.0]), 2);
        assert_eq!(tree.destination_rank([3.0, 1.5, 0.0]), 2);
    }

    #[test]
    fn on_cut_points_route_to_the_lower_rank() {
        let tree = three_rank_tree();

        assert_eq!(tree.destination_rank([2.0, 0.5, 0.0]), 0);
        assert_eq!(tree.destination_rank([2.0, 1.0, 0.0]), 0);
        assert_eq!(tree.destination_rank([1.0, 1.0, 0.0]), 0);
    }

    #[test]
    fn leaf_regions_tile_the_global_box() {
        let tree = three_rank_tree();
        let regions = tree.leaf_regions();

        assert_eq!(
            regions.iter().map(|&(rank, _)| rank).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );

        let total_area: f64 = regions
            .iter()
            .map(|(_, region)| region.extent(0) * region.extent(1))
            .sum();
        assert!((total_area - 8.0).abs() < 1e-12);

        // Every interior sample lands in the region of the rank that claims
        // it.
        for &(x, y) in &[(0.5, 0.5), (1.5, 1.9), (3.9, 0.1), (2.0, 1.0)] {
            let rank = tree.destination_rank([x, y, 0.0]);
            let (_, region) = regions[rank as usize];
            assert!(region.contains([x, y, 0.0]));
        }
    }
}
