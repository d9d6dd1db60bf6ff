use karst_geom::{Aabb, RootTransform};

use crate::backend::{ConvexOutcome, CookFlags, CookingBackend};
use crate::buffer::GeometryBuffer;
use crate::simple::{SimpleCollisionData, collect_boxes, decompose_convex};
use crate::trimesh::{FLIP_NORMALS, assemble_tri_mesh};

/// Which collision representations a component wants cooked.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CollisionTraceMode {
    /// Cook both the simple primitives and the exact triangle mesh.
    #[default]
    SimpleAndComplex,
    /// The triangle mesh answers simple queries too; skip the simple phase.
    UseComplexAsSimple,
    /// Simple primitives answer complex queries too; skip the triangle mesh.
    UseSimpleAsComplex,
}

#[derive(Clone, Copy, Debug)]
pub struct CookerSettings {
    pub trace_mode: CollisionTraceMode,
    /// Cubic volumes get exact box primitives instead of convex decomposition.
    pub simple_cubic: bool,
    pub chunk_edge: u32,
    pub lod: u32,
    pub hulls_per_axis: u32,
    pub local_to_root: RootTransform,
    pub flags: CookFlags,
}

impl Default for CookerSettings {
    fn default() -> Self {
        Self {
            trace_mode: CollisionTraceMode::default(),
            simple_cubic: false,
            chunk_edge: 32,
            lod: 0,
            hulls_per_axis: 2,
            local_to_root: RootTransform::IDENTITY,
            flags: CookFlags::default(),
        }
    }
}

/// Finalized collision for one chunk. Ownership moves to whatever owns the
/// physics body; nothing here is partial.
#[derive(Clone, Debug, Default)]
pub struct ChunkCollisionData {
    pub tri_meshes: Vec<Vec<u8>>,
    pub tri_mesh_footprint: usize,
    pub simple: Option<SimpleCollisionData>,
}

/// Drives one chunk's collision cook: simple and/or complex phase per the
/// trace mode, then an all-or-nothing finalize.
pub struct ChunkCollisionCooker<'a> {
    backend: &'a dyn CookingBackend,
    settings: CookerSettings,
    errors: u32,
    result: ChunkCollisionData,
}

impl<'a> ChunkCollisionCooker<'a> {
    pub fn new(backend: &'a dyn CookingBackend, settings: CookerSettings) -> Self {
        Self {
            backend,
            settings,
            errors: 0,
            result: ChunkCollisionData::default(),
        }
    }

    pub fn cook(&mut self, buffers: &[GeometryBuffer]) {
        if self.settings.trace_mode != CollisionTraceMode::UseComplexAsSimple {
            self.cook_simple(buffers);
        }
        if self.settings.trace_mode != CollisionTraceMode::UseSimpleAsComplex {
            self.cook_tri_mesh(buffers);
        }
    }

    /// `None` when any cook step failed: the caller must not attach partial
    /// collision data to a body.
    pub fn finalize(self) -> Option<ChunkCollisionData> {
        if self.errors > 0 {
            return None;
        }
        Some(self.result)
    }

    fn cook_tri_mesh(&mut self, buffers: &[GeometryBuffer]) {
        let mesh = assemble_tri_mesh(buffers);
        match self.backend.cook_triangle_mesh(
            &mesh.vertices,
            &mesh.triangles,
            &mesh.material_indices,
            FLIP_NORMALS,
            self.settings.flags,
        ) {
            Some(cooked) => {
                self.result.tri_mesh_footprint += cooked.footprint_bytes;
                self.result.tri_meshes.push(cooked.blob);
            }
            None => {
                log::warn!(
                    "failed to cook tri mesh: {} vertices, {} triangles",
                    mesh.vertices.len(),
                    mesh.triangles.len()
                );
                self.errors += 1;
            }
        }
    }

    fn cook_simple(&mut self, buffers: &[GeometryBuffer]) {
        // Nothing worth covering
        if buffers.len() == 1 && buffers[0].vertex_count() < 4 {
            return;
        }

        let mut data = SimpleCollisionData::default();

        if self.settings.simple_cubic {
            collect_boxes(buffers, self.settings.local_to_root, &mut data);
        } else {
            let Some(buckets) = decompose_convex(
                buffers,
                self.settings.chunk_edge,
                self.settings.lod,
                self.settings.hulls_per_axis,
            ) else {
                return;
            };

            for bucket in buckets {
                debug_assert!(bucket.len() >= 4);
                // Rebase into root space; hulls carry no transform of their own
                let points: Vec<_> = bucket
                    .iter()
                    .map(|&p| self.settings.local_to_root.apply(p))
                    .collect();
                data.bounds.union(Aabb::from_points(&points));

                let cooked = self.backend.cook_convex_hull(&points, self.settings.flags);
                match cooked.outcome {
                    ConvexOutcome::Succeeded => {}
                    ConvexOutcome::SucceededWithInflation => {
                        log::warn!("convex cook needed inflation ({} points)", points.len());
                    }
                    ConvexOutcome::Failed => {
                        log::warn!("failed to cook convex hull ({} points)", points.len());
                        self.errors += 1;
                        continue;
                    }
                }
                if let Some(blob) = cooked.blob {
                    data.convex_blobs.push(blob);
                }
            }
        }

        self.result.simple = Some(data);
    }
}
