//! Scene Integration Tests
//!
//! Tests for:
//! - Lens: projection, scissored off-center frustums, degenerate aspect ratios
//! - Camera: placement, frustum culling, rays
//! - Partition: entity bookkeeping and culled traversal
//! - Scene: partition replacement and listeners
//! - EntityCollector: clearing, sorting, triangle counts

use std::cell::RefCell;
use std::rc::Rc;

use glam::{Affine3A, Vec3};

use aerie::renderer::EntityCollector;
use aerie::resources::primitives::{SphereOptions, create_sphere};
use aerie::scene::{
    Camera, Lens, Light, Partition, PartitionId, Projection, Renderable, Scene, SharedCamera,
};

const EPSILON: f32 = 1e-4;

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

fn vec3_approx(a: Vec3, b: Vec3) -> bool {
    approx(a.x, b.x) && approx(a.y, b.y) && approx(a.z, b.z)
}

fn ball(z: f32) -> Renderable {
    let geometry = Rc::new(create_sphere(SphereOptions::default()).unwrap());
    Renderable::new("ball")
        .with_geometry(geometry)
        .with_transform(Affine3A::from_translation(Vec3::new(0.0, 0.0, z)))
}

fn shared_camera() -> SharedCamera {
    Rc::new(RefCell::new(Camera::default()))
}

// ============================================================================
// Lens
// ============================================================================

#[test]
fn lens_defaults() {
    let lens = Lens::default();
    assert!(matches!(lens.projection(), Projection::Perspective { .. }));
    assert!(approx(lens.aspect_ratio(), 1.0));
    assert!(approx(lens.near(), 0.1));
    assert!(approx(lens.far(), 3000.0));
}

#[test]
fn lens_ignores_degenerate_aspect() {
    let mut lens = Lens::default();
    lens.set_aspect_ratio(2.0);
    let version = lens.version();

    lens.set_aspect_ratio(f32::INFINITY);
    lens.set_aspect_ratio(f32::NAN);
    lens.set_aspect_ratio(0.0);
    lens.set_aspect_ratio(-1.0);
    assert!(approx(lens.aspect_ratio(), 2.0));
    assert_eq!(lens.version(), version);
}

#[test]
fn lens_version_tracks_changes() {
    let mut lens = Lens::default();
    let v0 = lens.version();
    lens.set_near(0.1);
    assert_eq!(lens.version(), v0);
    lens.set_near(1.0);
    lens.set_far(50.0);
    lens.set_projection(Projection::Orthographic { size: 5.0 });
    assert_eq!(lens.version(), v0 + 3);
}

#[test]
fn scissored_lens_recenters_projection() {
    let mut lens = Lens::perspective(60.0, 0.1, 100.0);
    lens.set_aspect_ratio(800.0 / 600.0);
    lens.update_viewport(0.0, 0.0, 800.0, 600.0);
    lens.update_scissor_rect(0.0, 0.0, 800.0, 600.0);

    // Center of the left half of the full view
    let half_width = 10.0 * 30f32.to_radians().tan() * (800.0 / 600.0);
    let point = Vec3::new(-0.5 * half_width, 0.0, -10.0);
    assert!(approx(lens.project(point).x, -0.5));

    lens.update_scissor_rect(0.0, 0.0, 400.0, 600.0);
    let projected = lens.project(point);
    assert!(approx(projected.x, 0.0), "got {projected}");
    assert!(approx(projected.y, 0.0));
}

#[test]
fn scissored_lens_round_trips() {
    let mut lens = Lens::perspective(45.0, 0.5, 200.0);
    lens.set_aspect_ratio(1.6);
    lens.update_viewport(0.0, 0.0, 1600.0, 1000.0);
    lens.update_scissor_rect(200.0, 100.0, 600.0, 500.0);

    let point = Vec3::new(1.5, -0.75, -20.0);
    let p = lens.project(point);
    assert!(approx(p.z, 20.0));
    assert!(vec3_approx(lens.unproject(p.x, p.y, p.z), point));
}

#[test]
fn orthographic_lens_maps_extents_to_ndc() {
    let mut lens = Lens::orthographic(5.0, 0.1, 100.0);
    lens.set_aspect_ratio(2.0);
    let p = lens.project(Vec3::new(10.0, 5.0, -7.0));
    assert!(vec3_approx(p, Vec3::new(1.0, -1.0, 7.0)));
}

// ============================================================================
// Camera
// ============================================================================

#[test]
fn camera_look_at() {
    let mut camera = Camera::default();
    camera.look_at(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO, Vec3::Y);
    assert!(vec3_approx(camera.position(), Vec3::new(0.0, 0.0, 10.0)));
    assert!(vec3_approx(camera.forward(), Vec3::NEG_Z));

    let p = camera.project(Vec3::ZERO);
    assert!(approx(p.x, 0.0) && approx(p.y, 0.0) && approx(p.z, 10.0));
}

#[test]
fn camera_frustum_culls() {
    let camera = Camera::default();
    let frustum = camera.frustum();
    assert!(frustum.intersects_sphere(Vec3::new(0.0, 0.0, -10.0), 1.0));
    assert!(!frustum.intersects_sphere(Vec3::new(0.0, 0.0, 10.0), 1.0));
    assert!(!frustum.intersects_sphere(Vec3::new(0.0, 0.0, -5000.0), 1.0));
    // Straddling the near plane
    assert!(frustum.intersects_sphere(Vec3::new(0.0, 0.0, 0.5), 1.0));
}

#[test]
fn camera_unproject_inverts_project() {
    let mut camera = Camera::default();
    camera.lens_mut().set_aspect_ratio(1.5);
    camera.look_at(Vec3::new(3.0, 2.0, 8.0), Vec3::ZERO, Vec3::Y);

    let point = Vec3::new(0.5, -1.0, 1.0);
    let p = camera.project(point);
    assert!(vec3_approx(camera.unproject(p.x, p.y, p.z), point));
}

#[test]
fn orthographic_ray_starts_on_near_plane() {
    let mut camera = Camera::new(Lens::orthographic(4.0, 1.0, 100.0));
    camera.look_at(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO, Vec3::Y);

    let ray = camera.get_ray(0.5, 0.0, 50.0);
    assert!(vec3_approx(ray.direction, Vec3::NEG_Z));
    assert!(approx(ray.origin.z, 9.0));
    assert!(approx(ray.origin.x, 2.0));
}

#[test]
fn perspective_ray_passes_through_point() {
    let camera = Camera::default();
    let ray = camera.get_ray(0.25, -0.25, 10.0);
    assert!(vec3_approx(ray.origin, Vec3::ZERO));
    assert!(approx(ray.direction.length(), 1.0));

    let target = camera.unproject(0.25, -0.25, 10.0);
    let t = target.distance(ray.origin);
    assert!(vec3_approx(ray.at(t), target));
}

// ============================================================================
// Partition
// ============================================================================

#[test]
fn partition_ids_are_unique() {
    let a = Partition::new();
    let b = Partition::new();
    assert_ne!(a.id(), b.id());
}

#[test]
fn partition_bookkeeping() {
    let mut partition = Partition::new();
    let key = partition.add_renderable(ball(-5.0));
    let light = partition.add_light(Light::new_directional(Vec3::ONE, 1.0, Vec3::NEG_Z));
    assert_eq!(partition.num_renderables(), 1);
    assert_eq!(partition.num_lights(), 1);
    assert_eq!(partition.renderable(key).unwrap().name, "ball");

    assert!(partition.remove_renderable(key).is_some());
    assert!(partition.remove_renderable(key).is_none());
    assert!(partition.remove_light(light).is_some());
    assert_eq!(partition.num_renderables(), 0);
    assert_eq!(partition.num_lights(), 0);
}

#[test]
fn traverse_culls_and_skips_hidden() {
    let mut partition = Partition::new();
    partition.add_renderable(ball(-5.0));
    partition.add_renderable(ball(5.0));
    let hidden = partition.add_renderable(ball(-6.0));
    partition.renderable_mut(hidden).unwrap().visible = false;

    partition.add_light(Light::new_directional(Vec3::ONE, 1.0, Vec3::NEG_Z));
    partition.add_light(Light::new_point(Vec3::ONE, 1.0, Vec3::new(0.0, 0.0, -20.0), 1.0, 5.0));
    partition.add_light(Light::new_point(Vec3::ONE, 1.0, Vec3::new(0.0, 0.0, 50.0), 1.0, 5.0));

    let mut collector = EntityCollector::new();
    collector.set_camera(Some(shared_camera()));
    collector.clear();
    partition.traverse(&mut collector);

    assert_eq!(collector.opaque_renderables().len(), 1);
    assert_eq!(collector.directional_lights().len(), 1);
    assert_eq!(collector.point_lights().len(), 1);
}

// ============================================================================
// Scene
// ============================================================================

#[test]
fn set_partition_notifies_listeners() {
    let mut scene = Scene::new();
    let seen: Rc<RefCell<Vec<PartitionId>>> = Rc::default();
    let sink = seen.clone();
    let key = scene.add_partition_listener(Box::new(move |id| sink.borrow_mut().push(id)));

    let old_id = scene.partition_id();
    let replacement = Partition::new();
    let new_id = replacement.id();
    let old = scene.set_partition(replacement);

    assert_eq!(old.id(), old_id);
    assert_eq!(scene.partition_id(), new_id);
    assert_eq!(*seen.borrow(), vec![new_id]);

    assert!(scene.remove_partition_listener(key));
    assert!(!scene.remove_partition_listener(key));
    scene.set_partition(Partition::new());
    assert_eq!(seen.borrow().len(), 1);
}

#[test]
fn scene_traversal_reaches_partition() {
    let mut scene = Scene::new();
    scene.partition_mut().add_renderable(ball(-3.0));
    let mut collector = EntityCollector::new();
    collector.clear();
    scene.traverse_partitions(&mut collector);
    assert_eq!(collector.opaque_renderables().len(), 1);
}

// ============================================================================
// EntityCollector
// ============================================================================

#[test]
fn collector_without_camera_sees_everything() {
    let mut partition = Partition::new();
    partition.add_renderable(ball(100.0));
    let mut collector = EntityCollector::new();
    collector.clear();
    partition.traverse(&mut collector);
    assert_eq!(collector.opaque_renderables().len(), 1);
}

#[test]
fn collector_sorts_by_distance() {
    let mut partition = Partition::new();
    partition.add_renderable(ball(-30.0));
    partition.add_renderable(ball(-10.0));
    partition.add_renderable(ball(-20.0));
    for z in [-12.0, -25.0] {
        let mut blended = ball(z);
        blended.blended = true;
        partition.add_renderable(blended);
    }

    let mut collector = EntityCollector::new();
    collector.set_camera(Some(shared_camera()));
    collector.clear();
    partition.traverse(&mut collector);
    collector.sort();

    let opaque: Vec<f32> = collector
        .opaque_renderables()
        .iter()
        .map(|entry| entry.transform.translation.z)
        .collect();
    assert_eq!(opaque, vec![-10.0, -20.0, -30.0]);

    let blended: Vec<f32> = collector
        .blended_renderables()
        .iter()
        .map(|entry| entry.transform.translation.z)
        .collect();
    assert_eq!(blended, vec![-25.0, -12.0]);
}

#[test]
fn collector_clear_resets_frame() {
    let mut partition = Partition::new();
    let key = partition.add_renderable(ball(-5.0));
    partition.add_renderable(ball(-8.0));
    partition.add_light(Light::new_directional(Vec3::ONE, 1.0, Vec3::NEG_Z));

    let mut collector = EntityCollector::new();
    collector.set_camera(Some(shared_camera()));
    collector.clear();
    partition.traverse(&mut collector);

    let per_ball = partition.renderable(key).unwrap().num_triangles();
    assert_eq!(collector.num_triangles(), per_ball * 2);

    collector.clear();
    assert_eq!(collector.num_triangles(), 0);
    assert!(collector.opaque_renderables().is_empty());
    assert!(collector.directional_lights().is_empty());
}

#[test]
fn collector_snapshots_camera_on_clear() {
    let camera = shared_camera();
    let mut collector = EntityCollector::new();
    collector.set_camera(Some(camera.clone()));
    collector.clear();
    assert!(vec3_approx(collector.camera_position(), Vec3::ZERO));

    camera
        .borrow_mut()
        .set_world_transform(Affine3A::from_translation(Vec3::new(0.0, 0.0, 100.0)));
    assert!(vec3_approx(collector.camera_position(), Vec3::ZERO));

    collector.clear();
    assert!(vec3_approx(collector.camera_position(), Vec3::new(0.0, 0.0, 100.0)));
}
