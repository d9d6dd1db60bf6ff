use karst_geom::{Aabb, Vec3};

/// Triangle index payload of one mesh section. Sections coming off the
/// renderer use 16-bit indices when they fit; merged output is always 32-bit.
#[derive(Clone, Debug)]
pub enum IndexData {
    U16(Vec<u16>),
    U32(Vec<u32>),
}

impl IndexData {
    #[inline]
    pub fn len(&self) -> usize {
        match self {
            IndexData::U16(v) => v.len(),
            IndexData::U32(v) => v.len(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn get(&self, i: usize) -> u32 {
        match self {
            IndexData::U16(v) => u32::from(v[i]),
            IndexData::U32(v) => v[i],
        }
    }
}

/// One rendered section's worth of collision input: vertex positions, a
/// triangle index list (length multiple of 3) and, for cubic volumes, the
/// exact collision cubes covering the section. Read-only once handed to the
/// synthesizer.
#[derive(Clone, Debug)]
pub struct GeometryBuffer {
    pub positions: Vec<Vec3>,
    pub indices: IndexData,
    pub collision_cubes: Vec<Aabb>,
}

impl GeometryBuffer {
    pub fn new(positions: Vec<Vec3>, indices: IndexData) -> Self {
        debug_assert!(indices.len() % 3 == 0);
        Self {
            positions,
            indices,
            collision_cubes: Vec::new(),
        }
    }

    pub fn with_cubes(mut self, cubes: Vec<Aabb>) -> Self {
        self.collision_cubes = cubes;
        self
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}
