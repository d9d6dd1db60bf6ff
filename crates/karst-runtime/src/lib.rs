//! Chunk cook orchestration: fans per-chunk collision cooking across a
//! worker pool and aggregates one ordered result set.
#![forbid(unsafe_code)]

mod provider;
mod state;

use std::error::Error;
use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use karst_collision::{CookFlags, CookingBackend, FLIP_NORMALS, GeometryBuffer, IndexData, assemble_tri_mesh};
use karst_geom::{ChunkCoord, Vec3};
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};

pub use provider::{ChunkGeometry, GeometryProvider, GeometrySource, RenderType, VolumeSave};
pub use state::CookState;

/// Fixed chunk edge length in voxels; the unit of parallel cooking.
pub const CHUNK_EDGE: i32 = 32;

/// The chunk grid covering a volume's bounds: inclusive minimum chunk
/// coordinate plus per-axis chunk counts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkGrid {
    pub min: ChunkCoord,
    pub counts: [i64; 3],
}

impl ChunkGrid {
    /// Grid covering voxel-space bounds at the fixed chunk edge, matching
    /// the truncating per-axis division of the original data layout.
    pub fn from_bounds(min: [i32; 3], max: [i32; 3]) -> Self {
        let count = |lo: i32, hi: i32| i64::from(hi - lo) / i64::from(CHUNK_EDGE);
        Self {
            min: ChunkCoord::new(
                min[0].div_euclid(CHUNK_EDGE),
                min[1].div_euclid(CHUNK_EDGE),
                min[2].div_euclid(CHUNK_EDGE),
            ),
            counts: [
                count(min[0], max[0]),
                count(min[1], max[1]),
                count(min[2], max[2]),
            ],
        }
    }

    /// Grid for a depth-derived cube of `1 << depth` chunks per axis,
    /// centered on the origin.
    pub fn from_depth(depth: u32) -> Self {
        let per_axis = 1i64 << depth.min(32);
        let min = (-(per_axis / 2)) as i32;
        Self {
            min: ChunkCoord::new(min, min, min),
            counts: [per_axis; 3],
        }
    }

    /// Total chunk count, `None` on multiplication overflow.
    pub fn total(&self) -> Option<i64> {
        self.counts[0]
            .checked_mul(self.counts[1])
            .and_then(|v| v.checked_mul(self.counts[2]))
    }

    /// Deterministic slot index of a chunk, independent of completion order.
    pub fn linear_index(&self, coord: ChunkCoord) -> usize {
        let x = i64::from(coord.cx - self.min.cx);
        let y = i64::from(coord.cy - self.min.cy);
        let z = i64::from(coord.cz - self.min.cz);
        ((x * self.counts[1] + y) * self.counts[2] + z) as usize
    }

    pub fn coord_at(&self, index: usize) -> ChunkCoord {
        let nz = self.counts[2];
        let ny = self.counts[1];
        let i = index as i64;
        ChunkCoord::new(
            self.min.cx + (i / (ny * nz)) as i32,
            self.min.cy + ((i / nz) % ny) as i32,
            self.min.cz + (i % nz) as i32,
        )
    }

    /// Axis-major iteration: outer X, middle Y, inner Z.
    pub fn coords(&self) -> impl Iterator<Item = ChunkCoord> + '_ {
        let [nx, ny, nz] = self.counts;
        (0..nx).flat_map(move |x| {
            (0..ny).flat_map(move |y| {
                (0..nz).map(move |z| {
                    ChunkCoord::new(
                        self.min.cx + x as i32,
                        self.min.cy + y as i32,
                        self.min.cz + z as i32,
                    )
                })
            })
        })
    }
}

/// Cook configuration surface.
#[derive(Clone)]
pub struct CookSettings {
    /// Render-octree depth; the volume spans `1 << depth` chunks per axis.
    pub render_depth: u32,
    /// Voxel edge length in world units.
    pub voxel_size: f32,
    pub render_type: RenderType,
    pub source: Option<Arc<dyn GeometrySource>>,
    /// Disables the deformable-mesh cook flag.
    pub clean_collision_mesh: bool,
    pub fast_collision_cook: bool,
    pub log_progress: bool,
}

impl CookSettings {
    pub fn for_source(source: Arc<dyn GeometrySource>, render_depth: u32, voxel_size: f32) -> Self {
        Self {
            render_depth,
            voxel_size,
            render_type: RenderType::default(),
            source: Some(source),
            clean_collision_mesh: false,
            fast_collision_cook: false,
            log_progress: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CookError {
    /// No usable geometry source was configured.
    InvalidSource,
    /// The chunk grid would exceed the maximum representable task count.
    DepthTooHigh,
    /// The worker pool could not be built, e.g. thread spawning failed.
    PoolBuild,
}

impl fmt::Display for CookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CookError::InvalidSource => write!(f, "invalid geometry source"),
            CookError::DepthTooHigh => write!(f, "depth too high"),
            CookError::PoolBuild => write!(f, "worker pool build failed"),
        }
    }
}

impl Error for CookError {}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CookedChunk {
    pub coord: ChunkCoord,
    pub blob: Vec<u8>,
}

/// The cook artifact: per-chunk cooked collision blobs keyed by chunk
/// coordinate, loadable into a new volume's collision root.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CookedVolume {
    pub chunks: Vec<CookedChunk>,
}

impl CookedVolume {
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn allocated_size(&self) -> usize {
        self.chunks.iter().map(|c| c.blob.len()).sum()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(bytes)
    }
}

/// Transient runtime scoped to one cook call: the instantiated provider and
/// the worker pool. Dropped on every exit path, including validation
/// failures after construction.
struct VolumeRuntime {
    provider: Arc<dyn GeometryProvider>,
    pool: ThreadPool,
    workers: usize,
}

impl VolumeRuntime {
    fn create(
        source: &dyn GeometrySource,
        render_type: RenderType,
        save: Option<&VolumeSave>,
    ) -> Result<Self, CookError> {
        let workers = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(8);
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("karst-cook-{i}"))
            .build()
            .map_err(|e| {
                log::error!("cook failed: worker pool: {e}");
                CookError::PoolBuild
            })?;
        Ok(Self {
            provider: Arc::from(source.instantiate(render_type, save)),
            pool,
            workers,
        })
    }
}

/// Cooks every chunk of the configured volume into triangle-mesh collision
/// blobs. Blocks the calling thread until all chunks report completion, then
/// returns the aggregated result with empty chunks stripped.
pub fn cook_volume(
    settings: &CookSettings,
    save: Option<&VolumeSave>,
    backend: Arc<dyn CookingBackend>,
) -> Result<CookedVolume, CookError> {
    let source = settings.source.as_ref().ok_or_else(|| {
        log::error!("cook failed: invalid geometry source");
        CookError::InvalidSource
    })?;

    // The runtime tears down on every path out of this function.
    let runtime = VolumeRuntime::create(source.as_ref(), settings.render_type, save)?;

    let grid = ChunkGrid::from_depth(settings.render_depth);
    let total = grid
        .total()
        .filter(|&t| t <= i64::from(i32::MAX))
        .ok_or_else(|| {
            log::error!("cook failed: depth too high");
            CookError::DepthTooHigh
        })?;
    if total == 0 {
        return Ok(CookedVolume::default());
    }

    let start = Instant::now();
    log::info!("cooking: starting with {total} tasks");

    let (state, done_rx) = CookState::new(total as u32, settings.log_progress);
    let state = Arc::new(state);
    let voxel_size = settings.voxel_size;
    let flags = CookFlags::from_settings(settings.clean_collision_mesh, settings.fast_collision_cook);

    for coord in grid.coords() {
        let slot = grid.linear_index(coord);
        let state = Arc::clone(&state);
        let provider = Arc::clone(&runtime.provider);
        let backend = Arc::clone(&backend);
        runtime.pool.spawn(move || {
            cook_chunk(coord, slot, voxel_size, flags, &*provider, &*backend, &state);
        });
    }

    log::info!("cooking: waiting for tasks");
    let _ = done_rx.recv();
    debug_assert_eq!(state.done(), state.total());

    let mut state = unwrap_state(state);
    let wall = start.elapsed();

    let mut chunks = Vec::with_capacity(total as usize);
    for slot in 0..total as usize {
        let blob = state.take_slot(slot);
        // Strip chunks that produced no collision
        if !blob.is_empty() {
            chunks.push(CookedChunk {
                coord: grid.coord_at(slot),
                blob,
            });
        }
    }
    chunks.shrink_to_fit();

    report_timings(wall, &state, runtime.workers);

    Ok(CookedVolume { chunks })
}

fn cook_chunk(
    coord: ChunkCoord,
    slot: usize,
    voxel_size: f32,
    flags: CookFlags,
    provider: &dyn GeometryProvider,
    backend: &dyn CookingBackend,
    state: &CookState,
) {
    let t0 = Instant::now();
    let geometry = provider.generate(coord);
    state.add_meshing(t0.elapsed());

    let mut blob = Vec::new();
    if !geometry.is_empty() {
        // Tri meshes carry no per-chunk transform; rebase into world space
        let offset = coord.as_vec3() * CHUNK_EDGE as f32;
        let vertices: Vec<Vec3> = geometry
            .vertices
            .iter()
            .map(|&v| (v + offset) * voxel_size)
            .collect();
        let index_count = geometry.indices.len();
        let buffer = GeometryBuffer::new(vertices, IndexData::U32(geometry.indices));
        let mesh = assemble_tri_mesh(std::slice::from_ref(&buffer));

        let t1 = Instant::now();
        let cooked = backend.cook_triangle_mesh(
            &mesh.vertices,
            &mesh.triangles,
            &mesh.material_indices,
            FLIP_NORMALS,
            flags,
        );
        state.add_collision(t1.elapsed());

        match cooked {
            Some(mesh) => blob = mesh.blob,
            None => {
                log::warn!(
                    "cooking: failed to cook chunk at ({}, {}, {}) with {} indices",
                    coord.cx,
                    coord.cy,
                    coord.cz,
                    index_count
                );
                state.add_error();
            }
        }
    }

    state.record_chunk(slot, blob);
}

/// The completion signal already fired, so every task has stored its result;
/// at most the signaling worker still holds its clone for an instant.
fn unwrap_state(mut state: Arc<CookState>) -> CookState {
    loop {
        match Arc::try_unwrap(state) {
            Ok(inner) => return inner,
            Err(shared) => {
                state = shared;
                thread::yield_now();
            }
        }
    }
}

fn report_timings(wall: Duration, state: &CookState, workers: usize) {
    let meshing = state.meshing_time();
    let collision = state.collision_time();
    // Worker time contributes wall time divided by the concurrency level
    let normalized = (meshing + collision) / workers.max(1) as u32;
    let overhead = wall.saturating_sub(normalized);

    log::info!("cooking: wall time {:.3}s", wall.as_secs_f64());
    log::info!("cooking: worker meshing time {:.3}s", meshing.as_secs_f64());
    log::info!(
        "cooking: worker collision time {:.3}s",
        collision.as_secs_f64()
    );
    log::info!(
        "cooking: overhead {:.3}s ({:.1}%)",
        overhead.as_secs_f64(),
        if wall.is_zero() {
            0.0
        } else {
            100.0 * overhead.as_secs_f64() / wall.as_secs_f64()
        }
    );
    if state.errors() > 0 {
        log::warn!("cooking: finished with {} chunk errors", state.errors());
    }
}
