//! Geometry primitives shared by the partitioner and the spatial index.

use mpi::traits::Equivalence;

use crate::types::GlobalOrdinal;

/// A point fed into the recursive bisection.
///
/// Coordinates are always three-dimensional; meshes of lower dimension are
/// zero-padded before any geometry is evaluated.
#[derive(Clone, Copy, Default, Equivalence)]
pub struct Point {
    coords: [f64; 3],
    global_id: GlobalOrdinal,
}

impl Point {
    /// Create a new point from padded coordinates and a global id.
    pub fn new(coords: [f64; 3], global_id: GlobalOrdinal) -> Self {
        Self { coords, global_id }
    }

    /// Return the coordinates of the point.
    pub fn coords(&self) -> [f64; 3] {
        self.coords
    }

    /// Return the global id of the point.
    pub fn global_id(&self) -> GlobalOrdinal {
        self.global_id
    }
}

/// A closed axis-aligned bounding box.
///
/// Degenerate boxes with zero extent along one or more axes are legal; a box
/// whose minimum exceeds its maximum contains nothing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    coords: [f64; 6],
}

impl BoundingBox {
    /// Create a new bounding box.
    ///
    /// The coordinates are given by `[xmin, ymin, zmin, xmax, ymax, zmax]`.
    pub fn new(coords: [f64; 6]) -> Self {
        Self { coords }
    }

    /// The tight bounding box of a set of padded points.
    ///
    /// An empty slice yields the inverted box, which contains nothing and is
    /// the identity of [`union`](BoundingBox::union).
    pub fn from_points(points: &[[f64; 3]]) -> Self {
        let mut coords = [
            f64::MAX,
            f64::MAX,
            f64::MAX,
            f64::MIN,
            f64::MIN,
            f64::MIN,
        ];

        for point in points {
            for axis in 0..3 {
                coords[axis] = f64::min(coords[axis], point[axis]);
                coords[3 + axis] = f64::max(coords[3 + axis], point[axis]);
            }
        }

        Self { coords }
    }

    /// Return the coordinates as `[xmin, ymin, zmin, xmax, ymax, zmax]`.
    pub fn coordinates(&self) -> [f64; 6] {
        self.coords
    }

    /// True when the minimum does not exceed the maximum on any axis.
    pub fn is_valid(&self) -> bool {
        (0..3).all(|axis| self.coords[axis] <= self.coords[3 + axis])
    }

    /// Test whether a point lies in the box. The box is closed on all faces.
    pub fn contains(&self, point: [f64; 3]) -> bool {
        (0..3).all(|axis| {
            point[axis] >= self.coords[axis] && point[axis] <= self.coords[3 + axis]
        })
    }

    /// Lower and upper bound along `axis`.
    pub fn bounds(&self, axis: usize) -> (f64, f64) {
        (self.coords[axis], self.coords[3 + axis])
    }

    /// Extent of the box along `axis`.
    pub fn extent(&self, axis: usize) -> f64 {
        self.coords[3 + axis] - self.coords[axis]
    }

    /// The axis of largest extent. Earlier axes win ties.
    pub fn longest_axis(&self) -> usize {
        let mut axis = 0;
        for candidate in 1..3 {
            if self.extent(candidate) > self.extent(axis) {
                axis = candidate;
            }
        }
        axis
    }

    /// The smallest box containing both inputs.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        let mut coords = [0.0; 6];
        for axis in 0..3 {
            coords[axis] = f64::min(self.coords[axis], other.coords[axis]);
            coords[3 + axis] = f64::max(self.coords[3 + axis], other.coords[3 + axis]);
        }
        BoundingBox::new(coords)
    }

    /// Split the box along `axis` at `value`.
    ///
    /// Returns the lower and upper halves. The cut plane belongs to both
    /// halves; routing decides ownership of on-plane points separately.
    pub fn split_at(&self, axis: usize, value: f64) -> (BoundingBox, BoundingBox) {
        let mut lower = self.coords;
        let mut upper = self.coords;
        lower[3 + axis] = value;
        upper[axis] = value;
        (BoundingBox::new(lower), BoundingBox::new(upper))
    }
}

impl std::fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let [xmin, ymin, zmin, xmax, ymax, zmax] = self.coords;

        write!(
            f,
            "(xmin: {}, ymin: {}, zmin: {}, xmax: {}, ymax: {}, zmax: {})",
            xmin, ymin, zmin, xmax, ymax, zmax
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn box_is_closed_on_all_faces() {
        let bx = BoundingBox::new([0.0, 0.0, 0.0, 1.0, 2.0, 3.0]);

        assert!(bx.contains([0.5, 1.0, 1.5]));
        assert!(bx.contains([0.0, 0.0, 0.0]));
        assert!(bx.contains([1.0, 2.0, 3.0]));
        assert!(bx.contains([0.0, 2.0, 1.0]));

        assert!(!bx.contains([1.0 + 1e-12, 1.0, 1.0]));
        assert!(!bx.contains([-1e-12, 0.0, 0.0]));
    }

    #[test]
    fn degenerate_box_contains_its_plane() {
        let bx = BoundingBox::new([0.0, 0.0, 0.0, 1.0, 1.0, 0.0]);

        assert!(bx.is_valid());
        assert!(bx.contains([0.5, 0.5, 0.0]));
        assert!(!bx.contains([0.5, 0.5, 0.1]));
    }

    #[test]
    fn inverted_box_is_invalid_and_empty() {
        let bx = BoundingBox::new([1.0, 0.0, 0.0, 0.0, 1.0, 1.0]);

        assert!(!bx.is_valid());
        assert!(!bx.contains([0.5, 0.5, 0.5]));
    }

    #[test]
    fn from_points_is_tight() {
        let points = [[0.0, 1.0, 2.0], [3.0, -1.0, 0.5]];
        let bx = BoundingBox::from_points(&points);

        assert_eq!(bx.coordinates(), [0.0, -1.0, 0.5, 3.0, 1.0, 2.0]);
        assert!(points.iter().all(|&p| bx.contains(p)));
    }

    #[test]
    fn empty_from_points_is_union_identity() {
        let empty = BoundingBox::from_points(&[]);
        let bx = BoundingBox::new([0.0, 0.0, 0.0, 1.0, 1.0, 1.0]);

        assert!(!empty.contains([0.0, 0.0, 0.0]));
        assert_eq!(empty.union(&bx), bx);
    }

    #[test]
    fn longest_axis_prefers_earlier_on_ties() {
        assert_eq!(
            BoundingBox::new([0.0, 0.0, 0.0, 2.0, 2.0, 1.0]).longest_axis(),
            0
        );
        assert_eq!(
            BoundingBox::new([0.0, 0.0, 0.0, 1.0, 2.0, 2.0]).longest_axis(),
            1
        );
        assert_eq!(
            BoundingBox::new([0.0, 0.0, 0.0, 1.0, 1.0, 2.0]).longest_axis(),
            2
        );
    }

    #[test]
    fn split_shares_the_cut_plane() {
        let bx = BoundingBox::new([0.0, 0.0, 0.0, 2.0, 1.0, 1.0]);
        let (lower, upper) = bx.split_at(0, 0.5);

        assert_eq!(lower.coordinates(), [0.0, 0.0, 0.0, 0.5, 1.0, 1.0]);
        assert_eq!(upper.coordinates(), [0.5, 0.0, 0.0, 2.0, 1.0, 1.0]);
        assert!(lower.contains([0.5, 0.5, 0.5]));
        assert!(upper.contains([0.5, 0.5, 0.5]));
    }
}
