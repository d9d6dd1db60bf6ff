//! Demo geometry source: a noise-defined density field meshed into blocky
//! triangle soup, one section per chunk.

use fastnoise_lite::{FastNoiseLite, NoiseType};
use hashbrown::HashMap;
use karst_geom::{ChunkCoord, Vec3};
use karst_runtime::{
    CHUNK_EDGE, ChunkGeometry, GeometryProvider, GeometrySource, RenderType, VolumeSave,
};

pub struct NoiseSource {
    pub seed: i32,
    pub frequency: f32,
}

impl NoiseSource {
    pub fn new(seed: i32, frequency: f32) -> Self {
        Self { seed, frequency }
    }
}

impl GeometrySource for NoiseSource {
    fn instantiate(
        &self,
        render_type: RenderType,
        save: Option<&VolumeSave>,
    ) -> Box<dyn GeometryProvider> {
        if render_type == RenderType::MarchingCubes {
            log::warn!("marching cubes mesher not available here, generating cubic geometry");
        }
        let mut noise = FastNoiseLite::with_seed(self.seed);
        noise.set_noise_type(Some(NoiseType::OpenSimplex2));
        noise.set_frequency(Some(self.frequency));
        Box::new(NoiseVolume {
            noise,
            edits: save.map(|s| s.edits.clone()).unwrap_or_default(),
        })
    }
}

/// Transient volume instance: base field plus preloaded sparse edits.
struct NoiseVolume {
    noise: FastNoiseLite,
    edits: HashMap<(i32, i32, i32), f32>,
}

impl NoiseVolume {
    fn density(&self, wx: i32, wy: i32, wz: i32) -> f32 {
        if let Some(&d) = self.edits.get(&(wx, wy, wz)) {
            return d;
        }
        // Bias by height so the field reads as terrain around y = 0
        self.noise.get_noise_3d(wx as f32, wy as f32, wz as f32) + wy as f32 * 0.03
    }

    #[inline]
    fn solid(&self, wx: i32, wy: i32, wz: i32) -> bool {
        self.density(wx, wy, wz) < 0.0
    }
}

// Corner offsets per face, wound clockwise seen from outside the voxel.
const FACES: [([i32; 3], [[f32; 3]; 4]); 6] = [
    ([1, 0, 0], [[1., 0., 0.], [1., 1., 0.], [1., 1., 1.], [1., 0., 1.]]),
    ([-1, 0, 0], [[0., 0., 1.], [0., 1., 1.], [0., 1., 0.], [0., 0., 0.]]),
    ([0, 1, 0], [[0., 1., 0.], [0., 1., 1.], [1., 1., 1.], [1., 1., 0.]]),
    ([0, -1, 0], [[0., 0., 1.], [0., 0., 0.], [1., 0., 0.], [1., 0., 1.]]),
    ([0, 0, 1], [[1., 0., 1.], [1., 1., 1.], [0., 1., 1.], [0., 0., 1.]]),
    ([0, 0, -1], [[0., 0., 0.], [0., 1., 0.], [1., 1., 0.], [1., 0., 0.]]),
];

impl GeometryProvider for NoiseVolume {
    fn generate(&self, coord: ChunkCoord) -> ChunkGeometry {
        let edge = CHUNK_EDGE;
        let base = (coord.cx * edge, coord.cy * edge, coord.cz * edge);

        let mut out = ChunkGeometry::default();
        for x in 0..edge {
            for y in 0..edge {
                for z in 0..edge {
                    let (wx, wy, wz) = (base.0 + x, base.1 + y, base.2 + z);
                    if !self.solid(wx, wy, wz) {
                        continue;
                    }
                    for (normal, corners) in FACES {
                        if self.solid(wx + normal[0], wy + normal[1], wz + normal[2]) {
                            continue;
                        }
                        let b = out.vertices.len() as u32;
                        for [cx, cy, cz] in corners {
                            out.vertices.push(Vec3::new(
                                x as f32 + cx,
                                y as f32 + cy,
                                z as f32 + cz,
                            ));
                        }
                        out.indices.extend_from_slice(&[b, b + 1, b + 2, b, b + 2, b + 3]);
                    }
                }
            }
        }
        out
    }
}
