//! A rendezvous decomposition for coupling distributed meshes.
//!
//! This library couples two independently partitioned distributed meshes so
//! that arbitrary query points of a target mesh can be located inside
//! elements of a source mesh across process boundaries. Given a source mesh
//! scattered over the ranks of an MPI communicator, the
//! [Rendezvous](crate::rendezvous::Rendezvous) facade builds a third,
//! geometry-aware decomposition: the source nodes inside a user-supplied
//! global bounding box are partitioned with recursive coordinate bisection,
//! every in-box element is replicated onto each rank that owns any of its
//! nodes, and the redistributed mesh is indexed locally with a kD-tree over
//! element bounding volumes.
//!
//! Two queries are served afterwards, both purely local:
//! [`rendezvous_procs`](crate::rendezvous::Rendezvous::rendezvous_procs)
//! routes a batch of coordinates to the ranks responsible for their spatial
//! regions, and [`elements`](crate::rendezvous::Rendezvous::elements)
//! resolves coordinates to the global ordinals of the containing source
//! elements, with a reserved sentinel for points missing the mesh.
//!
//! ## Using the library
//!
//! A decomposition is built collectively from any type implementing the
//! [MeshView](crate::mesh::MeshView) capability trait:
//! ```no_run
//! use mesh_rendezvous::geometry::BoundingBox;
//! use mesh_rendezvous::mesh::{ElementTopology, MeshData};
//! use mesh_rendezvous::Rendezvous;
//!
//! let universe = mpi::initialize().unwrap();
//! let comm = universe.world();
//!
//! // One tetrahedron on the corner of the unit cube.
//! let mesh = MeshData::new(
//!     3,
//!     vec![0, 1, 2, 3],
//!     vec![
//!         0.0, 1.0, 0.0, 0.0, // x
//!         0.0, 0.0, 1.0, 0.0, // y
//!         0.0, 0.0, 0.0, 1.0, // z
//!     ],
//!     ElementTopology::Tetrahedron,
//!     vec![0],
//!     vec![0, 1, 2, 3],
//! )
//! .unwrap();
//!
//! let global_box = BoundingBox::new([0.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
//! let rendezvous = Rendezvous::build(&comm, global_box, &mesh).unwrap();
//!
//! let ranks = rendezvous.rendezvous_procs(&[0.1, 0.1, 0.1]);
//! let ids = rendezvous.elements(&[0.1, 0.1, 0.1]);
//! ```
//! Coordinate arrays use a dimension-major blocked layout throughout: axis
//! `k` of point `n` lives at index `k * num_points + n`.
//!
//! `build` is collective and must be called in the same order on every rank
//! of the communicator; the queries never communicate. The per-rank
//! rendezvous mesh is a deterministic function of the source mesh contents,
//! the communicator size and the global box.
#![cfg_attr(feature = "strict", deny(warnings), deny(unused_crate_dependencies))]
#![warn(missing_docs)]

pub mod cells;
pub mod constants;
pub mod error;
pub mod geometry;
pub mod import;
pub mod kdtree;
pub mod mesh;
pub mod rcb;
pub mod rendezvous;
pub mod rendezvous_mesh;
pub mod tools;
pub mod types;

pub use crate::error::{RendezvousError, Result};
pub use crate::rendezvous::Rendezvous;
