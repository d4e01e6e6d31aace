//! Camera Lens
//!
//! The projection half of a camera. Besides the usual field of view and
//! clip planes, a lens knows the viewport (the full back buffer area) and
//! the scissor rect (the part of it the view actually draws to). When the
//! two differ, the projection is narrowed to an off-center frustum that
//! covers only the scissored region, so geometry outside it is clipped
//! rather than squashed.

use glam::{Mat4, Vec3, Vec4};

use crate::renderer::context::Rect;
use crate::resources::version_tracker::ChangeTracker;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    /// Vertical field of view in radians.
    Perspective { fov_y: f32 },
    /// Half of the visible height in world units.
    Orthographic { size: f32 },
}

#[derive(Debug, Clone)]
pub struct Lens {
    projection: Projection,
    aspect_ratio: f32,
    near: f32,
    far: f32,
    viewport: Rect,
    scissor: Rect,
    version: ChangeTracker,
}

impl Default for Lens {
    fn default() -> Self {
        Self::perspective(60.0, 0.1, 3000.0)
    }
}

impl Lens {
    /// `fov_degrees` is the vertical field of view.
    #[must_use]
    pub fn perspective(fov_degrees: f32, near: f32, far: f32) -> Self {
        Self::new(Projection::Perspective { fov_y: fov_degrees.to_radians() }, near, far)
    }

    #[must_use]
    pub fn orthographic(size: f32, near: f32, far: f32) -> Self {
        Self::new(Projection::Orthographic { size }, near, far)
    }

    fn new(projection: Projection, near: f32, far: f32) -> Self {
        Self {
            projection,
            aspect_ratio: 1.0,
            near,
            far,
            viewport: Rect::default(),
            scissor: Rect::default(),
            version: ChangeTracker::new(),
        }
    }

    #[must_use]
    pub fn projection(&self) -> Projection {
        self.projection
    }

    pub fn set_projection(&mut self, projection: Projection) {
        if projection != self.projection {
            self.projection = projection;
            self.version.changed();
        }
    }

    #[must_use]
    pub fn aspect_ratio(&self) -> f32 {
        self.aspect_ratio
    }

    /// Non-finite or non-positive ratios (e.g. from a zero-height view) are
    /// ignored.
    pub fn set_aspect_ratio(&mut self, value: f32) {
        if !value.is_finite() || value <= 0.0 {
            log::warn!("Lens: ignoring degenerate aspect ratio {value}");
            return;
        }
        if value != self.aspect_ratio {
            self.aspect_ratio = value;
            self.version.changed();
        }
    }

    #[must_use]
    pub fn near(&self) -> f32 {
        self.near
    }

    pub fn set_near(&mut self, value: f32) {
        if value != self.near {
            self.near = value;
            self.version.changed();
        }
    }

    #[must_use]
    pub fn far(&self) -> f32 {
        self.far
    }

    pub fn set_far(&mut self, value: f32) {
        if value != self.far {
            self.far = value;
            self.version.changed();
        }
    }

    #[must_use]
    pub fn viewport(&self) -> Rect {
        self.viewport
    }

    #[must_use]
    pub fn scissor_rect(&self) -> Rect {
        self.scissor
    }

    pub fn update_scissor_rect(&mut self, x: f32, y: f32, width: f32, height: f32) {
        self.scissor = Rect::new(x, y, width, height);
        self.version.changed();
    }

    pub fn update_viewport(&mut self, x: f32, y: f32, width: f32, height: f32) {
        self.viewport = Rect::new(x, y, width, height);
        self.version.changed();
    }

    /// Bumped on every change that affects the projection.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version.version()
    }

    fn is_scissored(&self) -> bool {
        let (s, v) = (self.scissor, self.viewport);
        s.width > 0.0
            && s.height > 0.0
            && v.width > 0.0
            && v.height > 0.0
            && (s.x != 0.0 || s.y != 0.0 || s.width != v.width || s.height != v.height)
    }

    /// Near-plane extents `(left, right, bottom, top)` of the region to
    /// project, given the full symmetric half extents.
    fn extents(&self, x_max: f32, y_max: f32) -> (f32, f32, f32, f32) {
        if !self.is_scissored() {
            return (-x_max, x_max, -y_max, y_max);
        }
        let (s, v) = (self.scissor, self.viewport);
        // Scissor coordinates are y-down pixels relative to the viewport.
        let left = x_max * (2.0 * s.x / v.width - 1.0);
        let right = x_max * (2.0 * (s.x + s.width) / v.width - 1.0);
        let bottom = y_max * (1.0 - 2.0 * (s.y + s.height) / v.height);
        let top = y_max * (1.0 - 2.0 * s.y / v.height);
        (left, right, bottom, top)
    }

    /// Right-handed projection with a `[0, 1]` depth range.
    #[must_use]
    pub fn projection_matrix(&self) -> Mat4 {
        match self.projection {
            Projection::Perspective { fov_y } => {
                let y_max = self.near * (fov_y * 0.5).tan();
                let x_max = y_max * self.aspect_ratio;
                let (l, r, b, t) = self.extents(x_max, y_max);
                frustum_rh(l, r, b, t, self.near, self.far)
            }
            Projection::Orthographic { size } => {
                let (l, r, b, t) = self.extents(size * self.aspect_ratio, size);
                Mat4::orthographic_rh(l, r, b, t, self.near, self.far)
            }
        }
    }

    /// View-space point to `(ndc_x, -ndc_y, depth)`, where depth is the
    /// distance in front of the camera.
    #[must_use]
    pub fn project(&self, view_point: Vec3) -> Vec3 {
        let clip = self.projection_matrix() * view_point.extend(1.0);
        let w = if clip.w.abs() > f32::EPSILON { clip.w } else { 1.0 };
        Vec3::new(clip.x / w, -clip.y / w, -view_point.z)
    }

    /// Inverse of [`project`](Self::project).
    #[must_use]
    pub fn unproject(&self, ndc_x: f32, ndc_y: f32, depth: f32) -> Vec3 {
        let projection = self.projection_matrix();
        let clip_z = projection * Vec4::new(0.0, 0.0, -depth, 1.0);
        let ndc_z = if clip_z.w.abs() > f32::EPSILON { clip_z.z / clip_z.w } else { clip_z.z };

        let view = projection.inverse() * Vec4::new(ndc_x, -ndc_y, ndc_z, 1.0);
        let view = view.truncate() / view.w;
        Vec3::new(view.x, view.y, -depth)
    }
}

fn frustum_rh(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4 {
    let inv_w = 1.0 / (right - left);
    let inv_h = 1.0 / (top - bottom);
    let r = far / (near - far);
    Mat4::from_cols(
        Vec4::new(2.0 * near * inv_w, 0.0, 0.0, 0.0),
        Vec4::new(0.0, 2.0 * near * inv_h, 0.0, 0.0),
        Vec4::new((right + left) * inv_w, (top + bottom) * inv_h, r, -1.0),
        Vec4::new(0.0, 0.0, r * near, 0.0),
    )
}
