use karst_geom::Vec3;

/// Options forwarded to the cooking backend. `deformable` skips the
/// vertex-welding passes so a mesh whose vertices move every frame stays
/// cheap to re-cook; `fast_cook` trades cook quality for cook speed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CookFlags {
    pub deformable: bool,
    pub fast_cook: bool,
}

impl CookFlags {
    /// Derives flags from the cook configuration surface: a clean collision
    /// mesh disables the deformable path.
    pub fn from_settings(clean_collision_mesh: bool, fast_collision_cook: bool) -> Self {
        Self {
            deformable: !clean_collision_mesh,
            fast_cook: fast_collision_cook,
        }
    }
}

/// An opaque cooked triangle mesh and its memory footprint.
#[derive(Clone, Debug)]
pub struct CookedMesh {
    pub blob: Vec<u8>,
    pub footprint_bytes: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConvexOutcome {
    Succeeded,
    /// The backend could not build an exact hull and inflated the point
    /// cloud instead. Usable, but worth a warning.
    SucceededWithInflation,
    Failed,
}

#[derive(Clone, Debug)]
pub struct ConvexCook {
    pub outcome: ConvexOutcome,
    pub blob: Option<Vec<u8>>,
}

impl ConvexCook {
    pub fn failed() -> Self {
        Self {
            outcome: ConvexOutcome::Failed,
            blob: None,
        }
    }
}

/// The mesh cooking seam. One production implementation per physics target;
/// tests substitute their own.
pub trait CookingBackend: Send + Sync {
    /// Cooks a merged triangle mesh. `material_indices` holds one entry per
    /// triangle. `flip_normals` inverts the winding of every triangle before
    /// cooking. `None` means the cook failed; the caller decides severity.
    fn cook_triangle_mesh(
        &self,
        vertices: &[Vec3],
        triangles: &[[u32; 3]],
        material_indices: &[u16],
        flip_normals: bool,
        flags: CookFlags,
    ) -> Option<CookedMesh>;

    /// Cooks one convex hull from a point cloud of at least 4 vertices.
    fn cook_convex_hull(&self, vertices: &[Vec3], flags: CookFlags) -> ConvexCook;
}
