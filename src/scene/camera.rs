use std::borrow::Cow;

use glam::{Affine3A, Mat4, Vec3, Vec4};
use uuid::Uuid;

use crate::scene::lens::{Lens, Projection};
use crate::scene::partition::PartitionId;

#[derive(Debug, Clone)]
pub struct Camera {
    pub uuid: Uuid,
    pub name: Cow<'static, str>,

    lens: Lens,
    world_transform: Affine3A,
    partition: Option<PartitionId>,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Lens::default())
    }
}

impl Camera {
    #[must_use]
    pub fn new(lens: Lens) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: Cow::Borrowed("Camera"),
            lens,
            world_transform: Affine3A::IDENTITY,
            partition: None,
        }
    }

    #[must_use]
    pub fn lens(&self) -> &Lens {
        &self.lens
    }

    pub fn lens_mut(&mut self) -> &mut Lens {
        &mut self.lens
    }

    pub fn set_lens(&mut self, lens: Lens) {
        self.lens = lens;
    }

    #[must_use]
    pub fn world_transform(&self) -> Affine3A {
        self.world_transform
    }

    pub fn set_world_transform(&mut self, transform: Affine3A) {
        self.world_transform = transform;
    }

    /// Places the camera at `eye`, looking at `target`.
    pub fn look_at(&mut self, eye: Vec3, target: Vec3, up: Vec3) {
        let view = Mat4::look_at_rh(eye, target, up);
        self.world_transform = Affine3A::from_mat4(view.inverse());
    }

    #[must_use]
    pub fn position(&self) -> Vec3 {
        Vec3::from(self.world_transform.translation)
    }

    /// The camera looks down its local -Z axis.
    #[must_use]
    pub fn forward(&self) -> Vec3 {
        self.world_transform
            .transform_vector3(Vec3::NEG_Z)
            .normalize_or(Vec3::NEG_Z)
    }

    #[must_use]
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from(self.world_transform.inverse())
    }

    #[must_use]
    pub fn view_projection(&self) -> Mat4 {
        self.lens.projection_matrix() * self.view_matrix()
    }

    #[must_use]
    pub fn frustum(&self) -> Frustum {
        Frustum::from_matrix(self.view_projection())
    }

    #[must_use]
    pub fn partition(&self) -> Option<PartitionId> {
        self.partition
    }

    pub fn set_partition(&mut self, partition: Option<PartitionId>) {
        if partition != self.partition {
            log::debug!("Camera {}: bound to partition {partition:?}", self.name);
            self.partition = partition;
        }
    }

    /// World-space point to `(ndc_x, -ndc_y, depth)`.
    #[must_use]
    pub fn project(&self, point: Vec3) -> Vec3 {
        let view_point = self.world_transform.inverse().transform_point3(point);
        self.lens.project(view_point)
    }

    /// Normalized screen coordinates and view depth back to world space.
    #[must_use]
    pub fn unproject(&self, ndc_x: f32, ndc_y: f32, depth: f32) -> Vec3 {
        let view_point = self.lens.unproject(ndc_x, ndc_y, depth);
        self.world_transform.transform_point3(view_point)
    }

    /// World-space ray through the given screen point.
    #[must_use]
    pub fn get_ray(&self, ndc_x: f32, ndc_y: f32, depth: f32) -> Ray {
        match self.lens.projection() {
            Projection::Perspective { .. } => {
                let origin = self.position();
                let target = self.unproject(ndc_x, ndc_y, depth);
                Ray::new(origin, (target - origin).normalize_or(self.forward()))
            }
            Projection::Orthographic { .. } => {
                let origin = self.unproject(ndc_x, ndc_y, self.lens.near());
                Ray::new(origin, self.forward())
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    #[must_use]
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    #[must_use]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Frustum {
    planes: [Vec4; 6], // Left, Right, Bottom, Top, Near, Far
}

impl Frustum {
    /// Gribb-Hartmann plane extraction for a `[0, 1]` depth range.
    #[must_use]
    pub fn from_matrix(m: Mat4) -> Self {
        let rows = [m.row(0), m.row(1), m.row(2), m.row(3)];

        let mut planes = [
            rows[3] + rows[0],
            rows[3] - rows[0],
            rows[3] + rows[1],
            rows[3] - rows[1],
            rows[2],
            rows[3] - rows[2],
        ];

        for plane in &mut planes {
            let length = plane.truncate().length();
            if length > f32::EPSILON {
                *plane /= length;
            }
        }

        Self { planes }
    }

    #[must_use]
    pub fn intersects_sphere(&self, center: Vec3, radius: f32) -> bool {
        self.planes
            .iter()
            .all(|plane| plane.truncate().dot(center) + plane.w >= -radius)
    }
}
