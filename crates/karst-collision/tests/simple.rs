use karst_collision::{
    ChunkCollisionCooker, CollisionTraceMode, ConvexCook, ConvexOutcome, CookFlags, CookedMesh,
    CookerSettings, CookingBackend, GeometryBuffer, IndexData, decompose_convex,
};
use karst_geom::{Aabb, RootTransform, Vec3};
use proptest::prelude::*;

/// Backend double that accepts everything and remembers what it cooked.
#[derive(Default)]
struct RecordingBackend {
    hulls: std::sync::Mutex<Vec<usize>>,
}

impl CookingBackend for RecordingBackend {
    fn cook_triangle_mesh(
        &self,
        _vertices: &[Vec3],
        triangles: &[[u32; 3]],
        _material_indices: &[u16],
        _flip_normals: bool,
        _flags: CookFlags,
    ) -> Option<CookedMesh> {
        Some(CookedMesh {
            blob: vec![0u8; triangles.len().max(1)],
            footprint_bytes: triangles.len().max(1),
        })
    }

    fn cook_convex_hull(&self, vertices: &[Vec3], _flags: CookFlags) -> ConvexCook {
        self.hulls.lock().unwrap().push(vertices.len());
        ConvexCook {
            outcome: ConvexOutcome::Succeeded,
            blob: Some(vec![1u8; vertices.len()]),
        }
    }
}

fn grid_buffer(n: usize, spacing: f32) -> GeometryBuffer {
    let mut positions = Vec::new();
    for z in 0..n {
        for y in 0..n {
            for x in 0..n {
                positions.push(Vec3::new(
                    x as f32 * spacing,
                    y as f32 * spacing,
                    z as f32 * spacing,
                ));
            }
        }
    }
    GeometryBuffer::new(positions, IndexData::U32(Vec::new()))
}

#[test]
fn surviving_buckets_cover_input_and_meet_threshold() {
    let buffer = grid_buffer(8, 4.0);
    let input = buffer.positions.clone();
    let buckets = decompose_convex(&[buffer], 32, 0, 2).expect("decomposition");

    assert!(!buckets.is_empty());
    for bucket in &buckets {
        assert!(bucket.len() >= 4);
    }
    // Every input vertex survives in some bucket (replication only adds)
    for p in &input {
        assert!(
            buckets.iter().any(|b| b.contains(p)),
            "vertex {p:?} lost during decomposition"
        );
    }
}

#[test]
fn decomposition_is_deterministic() {
    let counts = |buckets: &[Vec<Vec3>]| buckets.iter().map(Vec::len).collect::<Vec<_>>();
    let a = decompose_convex(&[grid_buffer(6, 5.0)], 32, 0, 2).expect("decomposition");
    let b = decompose_convex(&[grid_buffer(6, 5.0)], 32, 0, 2).expect("decomposition");
    assert_eq!(a.len(), b.len());
    assert_eq!(counts(&a), counts(&b));
}

#[test]
fn undersized_bucket_merges_forward() {
    // Two clusters far apart: 3 points in the low corner, plenty in the
    // high corner. The 3-point bucket must never survive on its own.
    let mut positions = vec![
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(0.2, 0.0, 0.0),
        Vec3::new(0.0, 0.2, 0.0),
    ];
    for i in 0..20 {
        positions.push(Vec3::new(30.0 + (i % 3) as f32 * 0.4, 30.0, 30.0 + (i / 3) as f32 * 0.4));
    }
    let buffer = GeometryBuffer::new(positions, IndexData::U32(Vec::new()));
    let buckets = decompose_convex(&[buffer], 32, 0, 4).expect("decomposition");
    for bucket in &buckets {
        assert!(bucket.len() >= 8, "undersized bucket survived: {}", bucket.len());
    }
}

#[test]
fn oversized_grid_aborts_phase() {
    // Span large enough that chunk_edge/hulls_per_axis cells exceed 64 per axis
    let positions = vec![Vec3::ZERO, Vec3::splat(100_000.0), Vec3::new(1.0, 2.0, 3.0), Vec3::splat(50.0)];
    let buffer = GeometryBuffer::new(positions, IndexData::U32(Vec::new()));
    assert!(decompose_convex(&[buffer], 32, 0, 4).is_none());
}

#[test]
fn no_vertices_aborts_phase() {
    let buffer = GeometryBuffer::new(Vec::new(), IndexData::U32(Vec::new()));
    assert!(decompose_convex(&[buffer], 32, 0, 2).is_none());
}

#[test]
fn lone_undersized_bucket_aborts_phase() {
    // Two one-vertex sections merge into a single 2-vertex bucket, which is
    // too thin to ever hull
    let a = GeometryBuffer::new(vec![Vec3::new(0.5, 0.5, 0.5)], IndexData::U32(Vec::new()));
    let b = GeometryBuffer::new(vec![Vec3::new(0.6, 0.5, 0.5)], IndexData::U32(Vec::new()));
    assert!(decompose_convex(&[a, b], 32, 0, 2).is_none());
}

#[test]
fn tiny_multi_section_cook_skips_simple_collision() {
    // The single-section shortcut does not apply, but decomposition still
    // refuses to emit an unhullable bucket and the chunk finalizes cleanly
    let backend = RecordingBackend::default();
    let a = GeometryBuffer::new(vec![Vec3::new(0.5, 0.5, 0.5)], IndexData::U32(Vec::new()));
    let b = GeometryBuffer::new(vec![Vec3::new(0.6, 0.5, 0.5)], IndexData::U32(Vec::new()));

    let mut cooker = ChunkCollisionCooker::new(&backend, CookerSettings::default());
    cooker.cook(&[a, b]);
    let data = cooker.finalize().expect("cook");

    assert!(data.simple.is_none());
    assert!(backend.hulls.lock().unwrap().is_empty());
}

#[test]
fn cubic_mode_emits_one_box_per_cube() {
    let backend = RecordingBackend::default();
    let cubes = vec![
        Aabb::new(Vec3::ZERO, Vec3::splat(1.0)),
        Aabb::new(Vec3::new(2.0, 0.0, 0.0), Vec3::new(3.0, 1.0, 1.0)),
    ];
    let buffer = GeometryBuffer::new(cube_corner_positions(), IndexData::U32(Vec::new()))
        .with_cubes(cubes);

    let settings = CookerSettings {
        trace_mode: CollisionTraceMode::UseSimpleAsComplex,
        simple_cubic: true,
        local_to_root: RootTransform::new(Vec3::new(1.0, 0.0, 0.0), 2.0),
        ..CookerSettings::default()
    };
    let mut cooker = ChunkCollisionCooker::new(&backend, settings);
    cooker.cook(std::slice::from_ref(&buffer));
    let data = cooker.finalize().expect("cubic cook");
    let simple = data.simple.expect("simple data");

    assert_eq!(simple.boxes.len(), 2);
    assert!(simple.convex_blobs.is_empty());
    // (min + translation) * scale for the first cube
    assert_eq!(simple.boxes[0].center, Vec3::new(3.0, 1.0, 1.0));
    assert_eq!(simple.boxes[0].size, Vec3::new(2.0, 2.0, 2.0));
    assert!(!simple.bounds.is_empty());
    // Trace mode skipped the complex phase entirely
    assert!(data.tri_meshes.is_empty());
}

#[test]
fn tiny_single_section_skips_simple_collision() {
    let backend = RecordingBackend::default();
    let buffer = GeometryBuffer::new(
        vec![Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 1.0, 0.0)],
        IndexData::U16(vec![0, 2, 1]),
    );
    let mut cooker = ChunkCollisionCooker::new(&backend, CookerSettings::default());
    cooker.cook(std::slice::from_ref(&buffer));
    let data = cooker.finalize().expect("cook");

    assert!(data.simple.is_none());
    // Complex phase still ran
    assert_eq!(data.tri_meshes.len(), 1);
    assert!(backend.hulls.lock().unwrap().is_empty());
}

#[test]
fn failed_hull_cook_fails_finalize() {
    struct FailingBackend;
    impl CookingBackend for FailingBackend {
        fn cook_triangle_mesh(
            &self,
            _v: &[Vec3],
            _t: &[[u32; 3]],
            _m: &[u16],
            _f: bool,
            _fl: CookFlags,
        ) -> Option<CookedMesh> {
            None
        }
        fn cook_convex_hull(&self, _v: &[Vec3], _f: CookFlags) -> ConvexCook {
            ConvexCook::failed()
        }
    }

    let backend = FailingBackend;
    let mut cooker = ChunkCollisionCooker::new(&backend, CookerSettings::default());
    cooker.cook(&[grid_buffer(4, 8.0)]);
    assert!(cooker.finalize().is_none());
}

fn cube_corner_positions() -> Vec<Vec3> {
    (0..8)
        .map(|i| Vec3::new((i & 1) as f32, ((i >> 1) & 1) as f32, ((i >> 2) & 1) as f32))
        .collect()
}

fn arb_points() -> impl Strategy<Value = Vec<Vec3>> {
    proptest::collection::vec(
        (0.0f32..=32.0, 0.0f32..=32.0, 0.0f32..=32.0).prop_map(|(x, y, z)| Vec3::new(x, y, z)),
        4..128,
    )
}

proptest! {
    // Decomposition invariants hold for arbitrary chunk-local point clouds
    #[test]
    fn buckets_meet_minimum_and_cover_input(points in arb_points(), lod in 0u32..=3, hulls in 1u32..=4) {
        let buffer = GeometryBuffer::new(points.clone(), IndexData::U32(Vec::new()));
        if let Some(buckets) = decompose_convex(&[buffer], 32, lod, hulls) {
            prop_assert!(!buckets.is_empty());
            for bucket in &buckets {
                prop_assert!(bucket.len() >= 4);
            }
            for p in &points {
                prop_assert!(buckets.iter().any(|b| b.contains(p)));
            }
        }
    }
}
