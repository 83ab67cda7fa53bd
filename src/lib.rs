//! Distributed unstructured-mesh core for an ocean model: process
//! groups, decomposition-aware file I/O, graph partitioning, halo
//! exchange, horizontal mesh geometry and operators, and the vertical
//! coordinate.
//!
//! Startup order mirrors the data flow every other component assumes:
//! [`mach_env`] → [`parallel_io`] → [`decomp`] (reads mesh adjacency
//! through `parallel_io` and [`broadcast`], builds the partition) →
//! [`horz_mesh`] (reads geometry, remaps through `decomp`) → [`halo`]
//! (built from `decomp`) → [`vert_coord`] (loads per-column data) →
//! [`horz_operators`] (constructed from `horz_mesh`).

pub mod array;
pub mod broadcast;
pub mod config;
pub mod decomp;
pub mod error;
pub mod halo;
pub mod horz_mesh;
pub mod horz_operators;
pub mod logging;
pub mod mach_env;
pub mod parallel_io;
pub mod registry;
pub mod vert_coord;

pub use decomp::Decomp;
pub use error::{CoreError, CoreResult};
pub use halo::Halo;
pub use horz_mesh::HorzMesh;
pub use mach_env::MachEnv;
pub use parallel_io::ParallelIo;
pub use vert_coord::VertCoord;
