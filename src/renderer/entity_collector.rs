//! Entity Collector
//!
//! Frame-scoped set of everything one camera can see. The view clears it
//! at the start of every frame (which also snapshots the camera's frustum
//! and position), the scene's partitions fill it through
//! [`apply_renderable`](EntityCollector::apply_renderable) and
//! [`apply_light`](EntityCollector::apply_light), and the renderer consumes
//! it.

use std::rc::Rc;

use glam::{Affine3A, Mat4, Vec3};

use crate::materials::compiler::SharedMaterialPass;
use crate::resources::geometry::CompactSubGeometry;
use crate::scene::camera::Frustum;
use crate::scene::light::{Light, LightKind};
use crate::scene::partition::Renderable;
use crate::scene::{EntityKey, SharedCamera};

/// A renderable captured for this frame.
#[derive(Debug, Clone)]
pub struct RenderableEntry {
    pub key: EntityKey,
    pub transform: Affine3A,
    pub geometry: Option<Rc<CompactSubGeometry>>,
    pub material: Option<SharedMaterialPass>,
    pub num_triangles: u32,
    /// Squared distance from the camera, used for sorting.
    pub distance_sq: f32,
}

#[derive(Debug, Default)]
pub struct EntityCollector {
    camera: Option<SharedCamera>,
    frustum: Option<Frustum>,
    camera_position: Vec3,
    view_projection: Mat4,

    opaque: Vec<RenderableEntry>,
    blended: Vec<RenderableEntry>,
    directional_lights: Vec<Light>,
    point_lights: Vec<Light>,
    light_probes: Vec<Light>,
    num_triangles: u32,
}

impl EntityCollector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn camera(&self) -> Option<&SharedCamera> {
        self.camera.as_ref()
    }

    pub fn set_camera(&mut self, camera: Option<SharedCamera>) {
        self.camera = camera;
    }

    /// Empties the set and snapshots the camera for the coming traversal.
    pub fn clear(&mut self) {
        self.opaque.clear();
        self.blended.clear();
        self.directional_lights.clear();
        self.point_lights.clear();
        self.light_probes.clear();
        self.num_triangles = 0;

        match &self.camera {
            Some(camera) => {
                let camera = camera.borrow();
                self.frustum = Some(camera.frustum());
                self.camera_position = camera.position();
                self.view_projection = camera.view_projection();
            }
            None => {
                self.frustum = None;
                self.camera_position = Vec3::ZERO;
                self.view_projection = Mat4::IDENTITY;
            }
        }
    }

    /// Bounding-sphere test against the frustum captured by the last
    /// [`clear`](Self::clear). Everything is visible without a camera.
    #[must_use]
    pub fn is_visible(&self, center: Vec3, radius: f32) -> bool {
        self.frustum
            .is_none_or(|frustum| frustum.intersects_sphere(center, radius))
    }

    pub fn apply_renderable(&mut self, key: EntityKey, renderable: &Renderable) {
        let position = Vec3::from(renderable.transform.translation);
        let entry = RenderableEntry {
            key,
            transform: renderable.transform,
            geometry: renderable.geometry.clone(),
            material: renderable.material.clone(),
            num_triangles: renderable.num_triangles(),
            distance_sq: position.distance_squared(self.camera_position),
        };
        self.num_triangles += entry.num_triangles;
        if renderable.blended {
            self.blended.push(entry);
        } else {
            self.opaque.push(entry);
        }
    }

    pub fn apply_light(&mut self, light: &Light) {
        let list = match light.kind {
            LightKind::Directional(_) => &mut self.directional_lights,
            LightKind::Point(_) => &mut self.point_lights,
            LightKind::Probe(_) => &mut self.light_probes,
        };
        list.push(light.clone());
    }

    /// Opaque front to back, blended back to front.
    pub fn sort(&mut self) {
        self.opaque
            .sort_by(|a, b| a.distance_sq.total_cmp(&b.distance_sq));
        self.blended
            .sort_by(|a, b| b.distance_sq.total_cmp(&a.distance_sq));
    }

    #[must_use]
    pub fn opaque_renderables(&self) -> &[RenderableEntry] {
        &self.opaque
    }

    #[must_use]
    pub fn blended_renderables(&self) -> &[RenderableEntry] {
        &self.blended
    }

    #[must_use]
    pub fn directional_lights(&self) -> &[Light] {
        &self.directional_lights
    }

    #[must_use]
    pub fn point_lights(&self) -> &[Light] {
        &self.point_lights
    }

    #[must_use]
    pub fn light_probes(&self) -> &[Light] {
        &self.light_probes
    }

    #[must_use]
    pub fn num_triangles(&self) -> u32 {
        self.num_triangles
    }

    #[must_use]
    pub fn camera_position(&self) -> Vec3 {
        self.camera_position
    }

    #[must_use]
    pub fn view_projection(&self) -> Mat4 {
        self.view_projection
    }
}
