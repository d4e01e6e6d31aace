//! Geometry Tests
//!
//! Tests for:
//! - Sphere vertex and index counts, pole and seam handling
//! - Normals, tangents and texture coordinates
//! - In-place rebuilds versus reallocation (data and layout versions)
//! - Custom interleaved layouts and their validation
//! - 16-bit index overflow

use glam::{Vec2, Vec3};

use aerie::errors::AerieError;
use aerie::resources::CompactSubGeometry;
use aerie::resources::primitives::{Primitive, SphereGeometry, SphereOptions, create_sphere};

const EPSILON: f32 = 1e-4;

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

fn vec3_approx(a: Vec3, b: Vec3) -> bool {
    approx(a.x, b.x) && approx(a.y, b.y) && approx(a.z, b.z)
}

fn sphere(radius: f32, segments_w: u16, segments_h: u16) -> SphereOptions {
    SphereOptions {
        radius,
        segments_w,
        segments_h,
        y_up: true,
    }
}

fn built(options: SphereOptions) -> (SphereGeometry, CompactSubGeometry) {
    let mut sphere = SphereGeometry::new(options);
    let mut target = CompactSubGeometry::new();
    sphere.update(&mut target).unwrap();
    (sphere, target)
}

// ============================================================================
// Counts
// ============================================================================

#[test]
fn sphere_counts() {
    let geometry = create_sphere(sphere(1.0, 8, 6)).unwrap();
    assert_eq!(geometry.vertex_count(), 63);
    assert_eq!(geometry.index_count(), 240);
    assert_eq!(geometry.num_triangles(), 80);
}

#[test]
fn sphere_counts_match_builder() {
    let (sphere, geometry) = built(sphere(2.0, 16, 12));
    assert_eq!(geometry.vertex_count(), sphere.vertex_count());
    assert_eq!(geometry.index_count(), sphere.index_count());
}

#[test]
fn segment_counts_are_clamped() {
    let sphere = SphereGeometry::new(sphere(1.0, 1, 0));
    assert_eq!(sphere.segments_w(), 3);
    assert_eq!(sphere.segments_h(), 2);

    let geometry = create_sphere(SphereOptions {
        segments_w: 0,
        segments_h: 1,
        ..SphereOptions::default()
    })
    .unwrap();
    assert_eq!(geometry.vertex_count(), 12);
    assert_eq!(geometry.index_count(), 18);
}

#[test]
fn indices_stay_in_range() {
    let geometry = create_sphere(sphere(1.0, 12, 9)).unwrap();
    let count = geometry.vertex_count();
    assert!(geometry.index_data().iter().all(|&i| usize::from(i) < count));
}

// ============================================================================
// Positions, Normals & Tangents
// ============================================================================

#[test]
fn positions_lie_on_radius() {
    let geometry = create_sphere(sphere(2.5, 10, 8)).unwrap();
    for vertex in 0..geometry.vertex_count() {
        let p = geometry.position(vertex).unwrap();
        assert!(approx(p.length(), 2.5), "vertex {vertex} at {p}");
    }
}

#[test]
fn seam_shares_position_not_normal() {
    let (w, h) = (8_usize, 6_usize);
    let geometry = create_sphere(sphere(1.0, w as u16, h as u16)).unwrap();
    for j in 1..h {
        let start = j * (w + 1);
        let seam = start + w;
        assert!(vec3_approx(
            geometry.position(seam).unwrap(),
            geometry.position(start).unwrap()
        ));
        assert!(!vec3_approx(
            geometry.normal(seam).unwrap(),
            geometry.normal(start).unwrap()
        ));
    }
}

#[test]
fn north_pole_collapses() {
    let (w, h) = (8_usize, 6_usize);
    let geometry = create_sphere(sphere(1.0, w as u16, h as u16)).unwrap();
    let pole = geometry.position(h * (w + 1)).unwrap();
    for i in 0..=w {
        assert!(vec3_approx(geometry.position(h * (w + 1) + i).unwrap(), pole));
    }
}

#[test]
fn interior_normals_are_unit_and_outward() {
    let (w, h) = (8_usize, 6_usize);
    let geometry = create_sphere(sphere(3.0, w as u16, h as u16)).unwrap();
    for j in 1..h {
        for i in 0..w {
            let vertex = j * (w + 1) + i;
            let n = geometry.normal(vertex).unwrap();
            let p = geometry.position(vertex).unwrap();
            assert!(approx(n.length(), 1.0));
            assert!(vec3_approx(n, p / 3.0));
        }
    }
}

#[test]
fn tangents_are_perpendicular_to_normals() {
    let (w, h) = (8_usize, 6_usize);
    let geometry = create_sphere(sphere(1.0, w as u16, h as u16)).unwrap();
    for j in 1..h {
        for i in 0..w {
            let vertex = j * (w + 1) + i;
            let t = geometry.tangent(vertex).unwrap();
            let n = geometry.normal(vertex).unwrap();
            assert!(approx(t.length(), 1.0));
            assert!(approx(t.dot(n), 0.0));
        }
    }
}

#[test]
fn z_up_swaps_axes() {
    let y_up = create_sphere(sphere(1.0, 8, 6)).unwrap();
    let z_up = create_sphere(SphereOptions {
        y_up: false,
        ..sphere(1.0, 8, 6)
    })
    .unwrap();
    // The first ring sits on the pole axis
    assert!(approx(y_up.position(0).unwrap().y.abs(), 1.0));
    assert!(approx(z_up.position(0).unwrap().z.abs(), 1.0));
}

// ============================================================================
// Texture Coordinates
// ============================================================================

#[test]
fn uvs_follow_grid() {
    let (w, h) = (8_usize, 6_usize);
    let geometry = create_sphere(sphere(1.0, w as u16, h as u16)).unwrap();
    for j in 0..=h {
        for i in 0..=w {
            let uv = geometry.uv(j * (w + 1) + i).unwrap();
            let expected = Vec2::new(i as f32 / w as f32, j as f32 / h as f32);
            assert!(approx(uv.x, expected.x) && approx(uv.y, expected.y));
        }
    }
}

// ============================================================================
// Rebuild & Versioning
// ============================================================================

#[test]
fn radius_change_rebuilds_in_place() {
    let (mut sphere, mut target) = built(sphere(1.0, 8, 6));
    let layout = target.layout_version();
    let data = target.data_version();
    let uv = target.uv(5).unwrap();

    sphere.set_radius(4.0);
    assert!(sphere.state().is_geometry_dirty());
    assert!(!sphere.state().is_uvs_dirty());
    sphere.update(&mut target).unwrap();

    assert_eq!(target.layout_version(), layout);
    assert!(target.data_version() > data);
    assert!(approx(target.position(10).unwrap().length(), 4.0));
    assert_eq!(target.uv(5).unwrap(), uv);
}

#[test]
fn unchanged_parameters_skip_rebuild() {
    let (mut sphere, mut target) = built(sphere(1.0, 8, 6));
    let data = target.data_version();
    sphere.set_radius(1.0);
    sphere.set_segments_w(8);
    sphere.update(&mut target).unwrap();
    assert_eq!(target.data_version(), data);
}

#[test]
fn segment_change_reallocates() {
    let (mut sphere, mut target) = built(sphere(1.0, 8, 6));
    let layout = target.layout_version();
    let index = target.index_version();

    sphere.set_segments_w(10);
    sphere.update(&mut target).unwrap();

    assert!(target.layout_version() > layout);
    assert!(target.index_version() > index);
    assert_eq!(target.vertex_count(), 77);
    assert_eq!(target.index_count(), 300);
    assert!(!sphere.state().is_geometry_dirty());
    assert!(!sphere.state().is_uvs_dirty());
}

#[test]
fn index_overflow_is_reported() {
    let mut sphere = SphereGeometry::new(sphere(1.0, 300, 300));
    let mut target = CompactSubGeometry::new();
    let err = sphere.update(&mut target).unwrap_err();
    assert!(matches!(err, AerieError::IndexOverflow(90601)));
    assert_eq!(target.vertex_count(), 0);
}

// ============================================================================
// Layouts
// ============================================================================

#[test]
fn custom_layout_interleaves() {
    let mut target = CompactSubGeometry::with_layout(11, 0, 11, 9).unwrap();
    let mut sphere = SphereGeometry::new(sphere(1.0, 8, 6));
    sphere.update(&mut target).unwrap();

    assert_eq!(target.vertex_data().len(), target.required_len(63));
    assert_eq!(target.vertex_data().len(), 63 * 11);
    assert!(approx(target.position(20).unwrap().length(), 1.0));
    let uv = target.uv(9).unwrap();
    assert!(approx(uv.x, 0.0));
    assert!(approx(uv.y, 1.0 / 6.0));
    assert_eq!(target.array_stride(), 44);
}

#[test]
fn offset_layout_leaves_prefix_untouched() {
    let mut target = CompactSubGeometry::with_layout(16, 3, 16, 12).unwrap();
    let mut sphere = SphereGeometry::new(sphere(1.0, 4, 3));
    sphere.update(&mut target).unwrap();
    assert_eq!(&target.vertex_data()[..3], &[0.0, 0.0, 0.0]);
    assert!(approx(target.position(7).unwrap().length(), 1.0));
}

#[test]
fn undersized_layout_is_rejected() {
    assert!(matches!(
        CompactSubGeometry::with_layout(6, 0, 13, 9),
        Err(AerieError::InvalidVertexLayout(_))
    ));
    assert!(matches!(
        CompactSubGeometry::with_layout(13, 0, 1, 9),
        Err(AerieError::InvalidVertexLayout(_))
    ));
}

#[test]
fn vertex_bytes_match_data() {
    let geometry = create_sphere(sphere(1.0, 8, 6)).unwrap();
    assert_eq!(geometry.vertex_bytes().len(), geometry.vertex_data().len() * 4);
    assert_eq!(geometry.index_bytes().len(), 480);
}
