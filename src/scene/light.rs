use glam::Vec3;
use uuid::Uuid;

use crate::resources::texture::TextureRef;

#[derive(Debug, Clone)]
pub struct DirectionalLight {
    /// World-space direction the light travels in.
    pub direction: Vec3,
}

#[derive(Debug, Clone)]
pub struct PointLight {
    pub position: Vec3,
    /// Distance at which falloff starts.
    pub radius: f32,
    /// Distance at which the light reaches zero.
    pub fall_off: f32,
}

/// Pre-baked environment lighting sampled from a cube map.
#[derive(Debug, Clone)]
pub struct LightProbe {
    pub cube_map: TextureRef,
    pub weight: f32,
}

#[derive(Debug, Clone)]
pub enum LightKind {
    Directional(DirectionalLight),
    Point(PointLight),
    Probe(LightProbe),
}

#[derive(Debug, Clone)]
pub struct Light {
    pub uuid: Uuid,
    pub color: Vec3,
    pub intensity: f32,
    pub kind: LightKind,
}

impl Light {
    #[must_use]
    pub fn new_directional(color: Vec3, intensity: f32, direction: Vec3) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            color,
            intensity,
            kind: LightKind::Directional(DirectionalLight {
                direction: direction.normalize_or(Vec3::NEG_Z),
            }),
        }
    }

    #[must_use]
    pub fn new_point(
        color: Vec3,
        intensity: f32,
        position: Vec3,
        radius: f32,
        fall_off: f32,
    ) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            color,
            intensity,
            kind: LightKind::Point(PointLight {
                position,
                radius,
                fall_off: fall_off.max(radius),
            }),
        }
    }

    #[must_use]
    pub fn new_probe(cube_map: TextureRef, weight: f32) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            color: Vec3::ONE,
            intensity: 1.0,
            kind: LightKind::Probe(LightProbe { cube_map, weight }),
        }
    }

    /// Color premultiplied by intensity, as uploaded to shaders.
    #[must_use]
    pub fn radiance(&self) -> Vec3 {
        self.color * self.intensity
    }

    /// Bounding radius for culling; directional lights and probes are
    /// unbounded.
    #[must_use]
    pub fn bounds(&self) -> Option<(Vec3, f32)> {
        match &self.kind {
            LightKind::Point(point) => Some((point.position, point.fall_off)),
            LightKind::Directional(_) | LightKind::Probe(_) => None,
        }
    }
}
