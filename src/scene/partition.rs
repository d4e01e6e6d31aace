//! Spatial Partition
//!
//! A partition owns the renderables and lights of (part of) a scene and
//! feeds the visible ones to an [`EntityCollector`]. This is the flat
//! reference implementation: a linear scan with bounding-sphere culling.
//! Tree-based partitions plug in behind the same `traverse` contract.

use std::borrow::Cow;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use glam::{Affine3A, Vec3};
use slotmap::SlotMap;

use crate::materials::compiler::SharedMaterialPass;
use crate::renderer::entity_collector::EntityCollector;
use crate::resources::geometry::CompactSubGeometry;
use crate::scene::light::Light;
use crate::scene::{EntityKey, LightKey};

static NEXT_PARTITION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique partition identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PartitionId(u64);

impl PartitionId {
    fn next() -> Self {
        Self(NEXT_PARTITION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// A drawable entity: geometry, placement and material.
#[derive(Debug, Clone)]
pub struct Renderable {
    pub name: Cow<'static, str>,
    pub transform: Affine3A,
    /// Bounding sphere radius in local space, centered on the origin.
    pub bounds_radius: f32,
    pub geometry: Option<Rc<CompactSubGeometry>>,
    pub material: Option<SharedMaterialPass>,
    /// Drawn after opaque geometry, back to front.
    pub blended: bool,
    pub visible: bool,
}

impl Renderable {
    #[must_use]
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            transform: Affine3A::IDENTITY,
            bounds_radius: 1.0,
            geometry: None,
            material: None,
            blended: false,
            visible: true,
        }
    }

    #[must_use]
    pub fn with_geometry(mut self, geometry: Rc<CompactSubGeometry>) -> Self {
        self.geometry = Some(geometry);
        self
    }

    #[must_use]
    pub fn with_material(mut self, material: SharedMaterialPass) -> Self {
        self.material = Some(material);
        self
    }

    #[must_use]
    pub fn with_transform(mut self, transform: Affine3A) -> Self {
        self.transform = transform;
        self
    }

    #[must_use]
    pub fn num_triangles(&self) -> u32 {
        self.geometry
            .as_ref()
            .map_or(0, |geometry| geometry.num_triangles() as u32)
    }

    /// World-space bounding sphere.
    #[must_use]
    pub fn world_bounds(&self) -> (Vec3, f32) {
        let scale = self
            .transform
            .matrix3
            .x_axis
            .length()
            .max(self.transform.matrix3.y_axis.length())
            .max(self.transform.matrix3.z_axis.length());
        (Vec3::from(self.transform.translation), self.bounds_radius * scale)
    }
}

#[derive(Debug)]
pub struct Partition {
    id: PartitionId,
    renderables: SlotMap<EntityKey, Renderable>,
    lights: SlotMap<LightKey, Light>,
}

impl Default for Partition {
    fn default() -> Self {
        Self::new()
    }
}

impl Partition {
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: PartitionId::next(),
            renderables: SlotMap::with_key(),
            lights: SlotMap::with_key(),
        }
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> PartitionId {
        self.id
    }

    pub fn add_renderable(&mut self, renderable: Renderable) -> EntityKey {
        self.renderables.insert(renderable)
    }

    pub fn remove_renderable(&mut self, key: EntityKey) -> Option<Renderable> {
        self.renderables.remove(key)
    }

    #[must_use]
    pub fn renderable(&self, key: EntityKey) -> Option<&Renderable> {
        self.renderables.get(key)
    }

    pub fn renderable_mut(&mut self, key: EntityKey) -> Option<&mut Renderable> {
        self.renderables.get_mut(key)
    }

    pub fn add_light(&mut self, light: Light) -> LightKey {
        self.lights.insert(light)
    }

    pub fn remove_light(&mut self, key: LightKey) -> Option<Light> {
        self.lights.remove(key)
    }

    #[must_use]
    pub fn light(&self, key: LightKey) -> Option<&Light> {
        self.lights.get(key)
    }

    pub fn light_mut(&mut self, key: LightKey) -> Option<&mut Light> {
        self.lights.get_mut(key)
    }

    #[must_use]
    pub fn num_renderables(&self) -> usize {
        self.renderables.len()
    }

    #[must_use]
    pub fn num_lights(&self) -> usize {
        self.lights.len()
    }

    /// Hands every visible renderable and light to the collector.
    pub fn traverse(&self, collector: &mut EntityCollector) {
        for (key, renderable) in &self.renderables {
            if !renderable.visible {
                continue;
            }
            let (center, radius) = renderable.world_bounds();
            if collector.is_visible(center, radius) {
                collector.apply_renderable(key, renderable);
            }
        }

        for (_, light) in &self.lights {
            let visible = light
                .bounds()
                .is_none_or(|(center, radius)| collector.is_visible(center, radius));
            if visible {
                collector.apply_light(light);
            }
        }
    }
}
