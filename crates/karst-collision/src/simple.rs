use karst_geom::{Aabb, RootTransform, Vec3};

use crate::buffer::GeometryBuffer;

/// Buckets holding fewer vertices than this are too thin to cook as a
/// standalone hull and get merged into a neighbor.
const MERGE_THRESHOLD: usize = 8;

/// Sanity bound on the decomposition grid; pathological inputs abort the
/// simple-collision phase instead of allocating an absurd bucket array.
const MAX_CELLS_PER_AXIS: i32 = 64;

/// One axis-aligned box primitive, in root space. `size` is the full edge
/// length per axis, not the half extent.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoxElem {
    pub center: Vec3,
    pub size: Vec3,
}

/// Simple-collision output of one chunk: either box primitives (cubic mode)
/// or cooked convex hull blobs, plus the bounds covering all of them.
#[derive(Clone, Debug, Default)]
pub struct SimpleCollisionData {
    pub bounds: Aabb,
    pub boxes: Vec<BoxElem>,
    pub convex_blobs: Vec<Vec<u8>>,
}

impl SimpleCollisionData {
    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty() && self.convex_blobs.is_empty()
    }
}

/// Emits one box per collision cube, transformed into root space.
pub(crate) fn collect_boxes(
    buffers: &[GeometryBuffer],
    local_to_root: RootTransform,
    out: &mut SimpleCollisionData,
) {
    for buffer in buffers {
        for cube in &buffer.collision_cubes {
            let cube = local_to_root.apply_aabb(*cube);
            out.bounds.union(cube);
            out.boxes.push(BoxElem {
                center: cube.center(),
                size: cube.size(),
            });
        }
    }
}

/// Splits the sections' vertices into a grid of buckets, one future convex
/// hull per bucket, and merges undersized buckets until every survivor can
/// cook. Returns `None` when the phase must be abandoned (grid over the
/// sanity bound, nothing survives merging, or the lone survivor holds fewer
/// than 4 vertices); chunk-local positions otherwise, left untransformed for
/// the caller. Every returned bucket holds at least 4 vertices.
///
/// Each vertex is also replicated into up to 6 axis-neighbor buckets offset
/// by one LOD-scaled unit; without the overlap, adjacent hulls cook with
/// visible seams between them.
pub fn decompose_convex(
    buffers: &[GeometryBuffer],
    chunk_edge: u32,
    lod: u32,
    hulls_per_axis: u32,
) -> Option<Vec<Vec<Vec3>>> {
    let mut bounds = Aabb::EMPTY;
    for buffer in buffers {
        for &p in &buffer.positions {
            bounds.grow(p);
        }
    }
    if bounds.is_empty() {
        return None;
    }

    let cell_span = (chunk_edge << lod) as f32 / hulls_per_axis.max(1) as f32;
    let size = bounds.size();
    let nx = ((size.x / cell_span).ceil() as i32).max(1);
    let ny = ((size.y / cell_span).ceil() as i32).max(1);
    let nz = ((size.z / cell_span).ceil() as i32).max(1);
    if nx.max(ny).max(nz) > MAX_CELLS_PER_AXIS {
        log::warn!(
            "convex decomposition grid {}x{}x{} over the {} cell bound, skipping simple collision",
            nx,
            ny,
            nz,
            MAX_CELLS_PER_AXIS
        );
        return None;
    }

    let mut buckets: Vec<Vec<Vec3>> = vec![Vec::new(); (nx * ny * nz) as usize];

    let cell_of = |p: Vec3| -> (i32, i32, i32) {
        let gx = ((p.x - bounds.min.x) / cell_span).floor() as i32;
        let gy = ((p.y - bounds.min.y) / cell_span).floor() as i32;
        let gz = ((p.z - bounds.min.z) / cell_span).floor() as i32;
        (
            gx.clamp(0, nx - 1),
            gy.clamp(0, ny - 1),
            gz.clamp(0, nz - 1),
        )
    };
    let linear = |(x, y, z): (i32, i32, i32)| (x + nx * y + nx * ny * z) as usize;

    // Max distance between two connected vertices at this LOD.
    let reach = (1u32 << lod) as f32;
    const NEIGHBORS: [(f32, f32, f32); 6] = [
        (1.0, 0.0, 0.0),
        (-1.0, 0.0, 0.0),
        (0.0, 1.0, 0.0),
        (0.0, -1.0, 0.0),
        (0.0, 0.0, 1.0),
        (0.0, 0.0, -1.0),
    ];

    for buffer in buffers {
        for &p in &buffer.positions {
            let primary = cell_of(p);
            buckets[linear(primary)].push(p);
            for (ox, oy, oz) in NEIGHBORS {
                let cell = cell_of(p + Vec3::new(ox, oy, oz) * reach);
                // Skip duplicates that land back in the primary bucket
                if cell != primary {
                    buckets[linear(cell)].push(p);
                }
            }
        }
    }

    // Forward pass: undersized buckets donate their vertices to the next one
    for i in 0..buckets.len().saturating_sub(1) {
        if !buckets[i].is_empty() && buckets[i].len() < MERGE_THRESHOLD {
            let moved = std::mem::take(&mut buckets[i]);
            buckets[i + 1].extend(moved);
        }
    }
    buckets.retain(|b| !b.is_empty());
    if buckets.is_empty() {
        log::warn!("convex decomposition left no buckets, skipping simple collision");
        return None;
    }

    // Backward pass: fold an undersized tail into its predecessor
    while buckets.last().is_some_and(|b| b.len() < MERGE_THRESHOLD) && buckets.len() > 1 {
        let tail = buckets.pop().unwrap_or_default();
        if let Some(prev) = buckets.last_mut() {
            prev.extend(tail);
        }
    }

    // Merging can leave one bucket holding everything there is, which may
    // still be too thin to hull
    if buckets.len() == 1 && buckets[0].len() < 4 {
        log::warn!(
            "convex decomposition left only {} vertices, skipping simple collision",
            buckets[0].len()
        );
        return None;
    }

    Some(buckets)
}
