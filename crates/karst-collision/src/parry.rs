use karst_geom::{Aabb, Vec3};
use nalgebra::Point3;
use parry3d::shape::{ConvexPolyhedron, Shape, TriMesh, TriMeshFlags};
use serde::{Deserialize, Serialize};

use crate::backend::{ConvexCook, ConvexOutcome, CookFlags, CookedMesh, CookingBackend};

/// Payload framing of a cooked triangle-mesh blob.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TriMeshBlob {
    pub vertices: Vec<[f32; 3]>,
    pub indices: Vec<[u32; 3]>,
    pub material_indices: Vec<u16>,
}

impl TriMeshBlob {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(bytes)
    }

    /// Rebuilds the backend shape, e.g. when loading a cooked volume into a
    /// fresh collision root.
    pub fn into_shape(self) -> Option<TriMesh> {
        let vertices = self
            .vertices
            .into_iter()
            .map(|[x, y, z]| Point3::new(x, y, z))
            .collect();
        TriMesh::new(vertices, self.indices).ok()
    }
}

/// Payload framing of a cooked convex-hull blob.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConvexBlob {
    pub points: Vec<[f32; 3]>,
}

impl ConvexBlob {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(bytes)
    }

    pub fn into_shape(self) -> Option<ConvexPolyhedron> {
        let points: Vec<_> = self
            .points
            .into_iter()
            .map(|[x, y, z]| Point3::new(x, y, z))
            .collect();
        ConvexPolyhedron::from_convex_hull(&points)
    }
}

/// Production cooking backend: parry validates and preprocesses the
/// geometry, the blob is the processed data in bincode framing.
#[derive(Clone, Copy, Debug, Default)]
pub struct ParryBackend;

impl ParryBackend {
    fn tri_flags(flags: CookFlags) -> TriMeshFlags {
        let mut out = TriMeshFlags::empty();
        if !flags.deformable {
            // Welding is wasted work on a mesh whose vertices move every cook
            out |= TriMeshFlags::MERGE_DUPLICATE_VERTICES;
            if !flags.fast_cook {
                out |= TriMeshFlags::FIX_INTERNAL_EDGES;
            }
        }
        out
    }
}

impl CookingBackend for ParryBackend {
    fn cook_triangle_mesh(
        &self,
        vertices: &[Vec3],
        triangles: &[[u32; 3]],
        material_indices: &[u16],
        flip_normals: bool,
        flags: CookFlags,
    ) -> Option<CookedMesh> {
        let points: Vec<Point3<f32>> = vertices.iter().map(|v| Point3::new(v.x, v.y, v.z)).collect();
        let indices: Vec<[u32; 3]> = if flip_normals {
            triangles.iter().map(|&[a, b, c]| [a, c, b]).collect()
        } else {
            triangles.to_vec()
        };

        let mesh = TriMesh::with_flags(points, indices, Self::tri_flags(flags)).ok()?;

        // The preprocessing passes never add or drop triangles, so the
        // per-triangle material tags stay aligned with the processed mesh.
        debug_assert_eq!(mesh.indices().len(), material_indices.len());
        let payload = TriMeshBlob {
            vertices: mesh.vertices().iter().map(|p| [p.x, p.y, p.z]).collect(),
            indices: mesh.indices().to_vec(),
            material_indices: material_indices.to_vec(),
        };
        let blob = bincode::serialize(&payload).ok()?;
        let footprint_bytes = blob.len();
        Some(CookedMesh {
            blob,
            footprint_bytes,
        })
    }

    fn cook_convex_hull(&self, vertices: &[Vec3], _flags: CookFlags) -> ConvexCook {
        if vertices.len() < 4 {
            return ConvexCook::failed();
        }
        let points: Vec<Point3<f32>> = vertices.iter().map(|v| Point3::new(v.x, v.y, v.z)).collect();
        let bounds = Aabb::from_points(vertices);

        // A coplanar cloud still hulls, but the result encloses no volume
        // and collides with nothing; treat it like an exact-pass failure.
        if let Some(hull) = ConvexPolyhedron::from_convex_hull(&points) {
            if hull_volume(&hull) > volume_floor(bounds) {
                return match serialize_hull(&hull) {
                    Some(blob) => ConvexCook {
                        outcome: ConvexOutcome::Succeeded,
                        blob: Some(blob),
                    },
                    None => ConvexCook::failed(),
                };
            }
        }

        // Inflate: pad the cloud with the corners of its slightly grown
        // bounds so the hull gains thickness.
        let margin = (bounds.size().length() * 0.01).max(1e-3);
        let lo = bounds.min - Vec3::splat(margin);
        let hi = bounds.max + Vec3::splat(margin);
        let mut inflated = points;
        for corner in [
            Vec3::new(lo.x, lo.y, lo.z),
            Vec3::new(hi.x, lo.y, lo.z),
            Vec3::new(lo.x, hi.y, lo.z),
            Vec3::new(hi.x, hi.y, lo.z),
            Vec3::new(lo.x, lo.y, hi.z),
            Vec3::new(hi.x, lo.y, hi.z),
            Vec3::new(lo.x, hi.y, hi.z),
            Vec3::new(hi.x, hi.y, hi.z),
        ] {
            inflated.push(Point3::new(corner.x, corner.y, corner.z));
        }

        match ConvexPolyhedron::from_convex_hull(&inflated).and_then(|h| serialize_hull(&h)) {
            Some(blob) => ConvexCook {
                outcome: ConvexOutcome::SucceededWithInflation,
                blob: Some(blob),
            },
            None => ConvexCook::failed(),
        }
    }
}

/// Unit density makes the reported mass the enclosed volume.
fn hull_volume(hull: &ConvexPolyhedron) -> f32 {
    hull.mass_properties(1.0).mass()
}

/// Volume below which a hull counts as degenerate, scaled to the cloud's
/// bounds so the cutoff tracks the geometry's units.
fn volume_floor(bounds: Aabb) -> f32 {
    let diag = bounds.size().length();
    (diag * diag * diag * 1.0e-9).max(f32::MIN_POSITIVE)
}

fn serialize_hull(hull: &ConvexPolyhedron) -> Option<Vec<u8>> {
    let payload = ConvexBlob {
        points: hull.points().iter().map(|p| [p.x, p.y, p.z]).collect(),
    };
    bincode::serialize(&payload).ok()
}
