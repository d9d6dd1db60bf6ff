use hashbrown::HashMap;
use karst_geom::{ChunkCoord, Vec3};
use serde::{Deserialize, Serialize};

/// Raw triangle soup for one chunk, in chunk-local coordinates with the
/// upstream clockwise winding.
#[derive(Clone, Debug, Default)]
pub struct ChunkGeometry {
    pub vertices: Vec<Vec3>,
    pub indices: Vec<u32>,
}

impl ChunkGeometry {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Produces chunk geometry on demand. Called concurrently from arbitrary
/// worker threads; calls for different chunks must not observe each other.
pub trait GeometryProvider: Send + Sync {
    fn generate(&self, coord: ChunkCoord) -> ChunkGeometry;
}

/// Sparse voxel edits persisted from an earlier session, preloaded into the
/// transient volume before cooking starts. Values are signed densities;
/// negative is solid.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct VolumeSave {
    pub edits: HashMap<(i32, i32, i32), f32>,
}

impl VolumeSave {
    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn set(&mut self, x: i32, y: i32, z: i32, density: f32) {
        self.edits.insert((x, y, z), density);
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(bytes)
    }
}

/// Which mesher the transient volume runs when generating chunk geometry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RenderType {
    #[default]
    MarchingCubes,
    Cubic,
}

/// Validated reference to a geometry source; instantiating it yields the
/// provider owned by one transient cook runtime.
pub trait GeometrySource: Send + Sync {
    fn instantiate(
        &self,
        render_type: RenderType,
        save: Option<&VolumeSave>,
    ) -> Box<dyn GeometryProvider>;
}
