use karst_geom::{Aabb, ChunkCoord, RootTransform, Vec3};
use proptest::prelude::*;

fn approx(a: f32, b: f32, eps: f32) -> bool {
    (a - b).abs() <= eps
}
fn vapprox(a: Vec3, b: Vec3, eps: f32) -> bool {
    approx(a.x, b.x, eps) && approx(a.y, b.y, eps) && approx(a.z, b.z, eps)
}

fn bounded_f32() -> impl Strategy<Value = f32> {
    -1_000.0f32..=1_000.0
}

fn arb_vec3() -> impl Strategy<Value = Vec3> {
    (bounded_f32(), bounded_f32(), bounded_f32()).prop_map(|(x, y, z)| Vec3::new(x, y, z))
}

proptest! {
    // Growing a box by a point always contains that point afterwards
    #[test]
    fn grow_contains_point(points in proptest::collection::vec(arb_vec3(), 1..32)) {
        let b = Aabb::from_points(&points);
        prop_assert!(!b.is_empty());
        for p in &points {
            prop_assert!(b.min.x <= p.x && p.x <= b.max.x);
            prop_assert!(b.min.y <= p.y && p.y <= b.max.y);
            prop_assert!(b.min.z <= p.z && p.z <= b.max.z);
        }
    }

    // union(EMPTY) is the identity
    #[test]
    fn union_with_empty_is_identity(points in proptest::collection::vec(arb_vec3(), 1..8)) {
        let mut b = Aabb::from_points(&points);
        let before = b;
        b.union(Aabb::EMPTY);
        prop_assert_eq!(b, before);
    }

    // union covers both inputs
    #[test]
    fn union_covers_both(ps in proptest::collection::vec(arb_vec3(), 1..8),
                         qs in proptest::collection::vec(arb_vec3(), 1..8)) {
        let a = Aabb::from_points(&ps);
        let b = Aabb::from_points(&qs);
        let mut u = a;
        u.union(b);
        prop_assert!(u.min.x <= a.min.x.min(b.min.x));
        prop_assert!(u.max.y >= a.max.y.max(b.max.y));
        prop_assert!(vapprox(u.min, a.min.min(b.min), 0.0));
        prop_assert!(vapprox(u.max, a.max.max(b.max), 0.0));
    }

    // Root transform matches the cooking convention: translate then scale
    #[test]
    fn root_transform_translates_then_scales(p in arb_vec3(), t in arb_vec3(), s in 0.01f32..=100.0) {
        let xf = RootTransform::new(t, s);
        let out = xf.apply(p);
        prop_assert!(vapprox(out, (p + t) * s, 1e-2));
    }

    #[test]
    fn chunk_coord_roundtrips_tuple(cx in -1_000i32..=1_000, cy in -1_000i32..=1_000, cz in -1_000i32..=1_000) {
        let c = ChunkCoord::from((cx, cy, cz));
        prop_assert_eq!(c, ChunkCoord::new(cx, cy, cz));
        prop_assert_eq!(c.as_vec3(), Vec3::new(cx as f32, cy as f32, cz as f32));
    }
}

#[test]
fn empty_aabb_reports_empty() {
    assert!(Aabb::EMPTY.is_empty());
    assert!(Aabb::default().is_empty());
    let mut b = Aabb::EMPTY;
    b.grow(Vec3::new(1.0, 2.0, 3.0));
    assert!(!b.is_empty());
    assert_eq!(b.min, b.max);
    assert_eq!(b.center(), Vec3::new(1.0, 2.0, 3.0));
}

#[test]
fn identity_transform_is_noop_on_aabb() {
    let b = Aabb::new(Vec3::new(-1.0, 0.0, 2.0), Vec3::new(3.0, 4.0, 5.0));
    assert_eq!(RootTransform::IDENTITY.apply_aabb(b), b);
}
