//! Per-chunk collision synthesis: merged triangle meshes with material tags
//! and convex-hull/box simple collision, cooked through a pluggable backend.
#![forbid(unsafe_code)]

mod backend;
mod buffer;
mod cooker;
mod parry;
mod simple;
mod trimesh;

pub use backend::{ConvexCook, ConvexOutcome, CookFlags, CookedMesh, CookingBackend};
pub use buffer::{GeometryBuffer, IndexData};
pub use cooker::{ChunkCollisionCooker, ChunkCollisionData, CollisionTraceMode, CookerSettings};
pub use parry::{ConvexBlob, ParryBackend, TriMeshBlob};
pub use simple::{BoxElem, SimpleCollisionData, decompose_convex};
pub use trimesh::{FLIP_NORMALS, TriMeshData, assemble_tri_mesh};
