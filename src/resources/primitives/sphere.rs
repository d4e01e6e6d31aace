use std::f32::consts::{PI, TAU};

use crate::errors::{AerieError, Result};
use crate::resources::geometry::{
    CompactSubGeometry, GEOMETRY_ATTRIBUTE_WIDTH, StridedSliceMut, UV_WIDTH,
};
use crate::resources::primitives::primitive::{Primitive, PrimitiveState};

/// Ring radius below which the tangent falls back to a fixed basis.
const TANGENT_EPSILON: f32 = 0.007;

pub struct SphereOptions {
    pub radius: f32,
    pub segments_w: u16,
    pub segments_h: u16,
    pub y_up: bool,
}

impl Default for SphereOptions {
    fn default() -> Self {
        Self {
            radius: 1.0,
            segments_w: 32,
            segments_h: 16,
            y_up: true,
        }
    }
}

/// UV sphere built ring by ring from the south pole (`j = 0`) to the
/// north pole (`j = segments_h`).
///
/// Each ring holds `segments_w + 1` vertices; the last one closes the seam
/// at the ring start's position. Segment counts are clamped to at least
/// 3 around and 2 from pole to pole.
#[derive(Debug, Clone)]
pub struct SphereGeometry {
    radius: f32,
    segments_w: u16,
    segments_h: u16,
    y_up: bool,
    state: PrimitiveState,
}

impl Default for SphereGeometry {
    fn default() -> Self {
        Self::new(SphereOptions::default())
    }
}

impl SphereGeometry {
    #[must_use]
    pub fn new(options: SphereOptions) -> Self {
        Self {
            radius: options.radius,
            segments_w: options.segments_w.max(3),
            segments_h: options.segments_h.max(2),
            y_up: options.y_up,
            state: PrimitiveState::default(),
        }
    }

    #[must_use]
    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn set_radius(&mut self, value: f32) {
        if value != self.radius {
            self.radius = value;
            self.state.invalidate_geometry();
        }
    }

    #[must_use]
    pub fn segments_w(&self) -> u16 {
        self.segments_w
    }

    pub fn set_segments_w(&mut self, value: u16) {
        let value = value.max(3);
        if value != self.segments_w {
            self.segments_w = value;
            self.state.invalidate_geometry();
            self.state.invalidate_uvs();
        }
    }

    #[must_use]
    pub fn segments_h(&self) -> u16 {
        self.segments_h
    }

    pub fn set_segments_h(&mut self, value: u16) {
        let value = value.max(2);
        if value != self.segments_h {
            self.segments_h = value;
            self.state.invalidate_geometry();
            self.state.invalidate_uvs();
        }
    }

    #[must_use]
    pub fn y_up(&self) -> bool {
        self.y_up
    }

    pub fn set_y_up(&mut self, value: bool) {
        if value != self.y_up {
            self.y_up = value;
            self.state.invalidate_geometry();
        }
    }

    #[must_use]
    pub fn vertex_count(&self) -> usize {
        (usize::from(self.segments_h) + 1) * (usize::from(self.segments_w) + 1)
    }

    #[must_use]
    pub fn index_count(&self) -> usize {
        (usize::from(self.segments_h) - 1) * usize::from(self.segments_w) * 6
    }

    fn write_vertices(&self, view: &mut StridedSliceMut<'_>, indices: &mut Vec<u16>) {
        let seg_w = usize::from(self.segments_w);
        let seg_h = usize::from(self.segments_h);

        for j in 0..=seg_h {
            let ring_start = j * (seg_w + 1);

            let hor_angle = PI * j as f32 / seg_h as f32;
            let z = -self.radius * hor_angle.cos();
            let ring_radius = self.radius * hor_angle.sin();

            for i in 0..=seg_w {
                let ver_angle = TAU * i as f32 / seg_w as f32;
                let x = ring_radius * ver_angle.cos();
                let y = ring_radius * ver_angle.sin();
                let norm_len = 1.0 / (x * x + y * y + z * z).sqrt();
                let tan_len = (y * y + x * x).sqrt();
                let has_tangent = tan_len > TANGENT_EPSILON;

                let (t1, t2, comp1, comp2) = if self.y_up {
                    (0.0, if has_tangent { x / tan_len } else { 0.0 }, -z, y)
                } else {
                    (if has_tangent { x / tan_len } else { 0.0 }, 0.0, y, z)
                };
                let t0 = if has_tangent { -y / tan_len } else { 1.0 };

                let vertex = ring_start + i;
                if i == seg_w {
                    // Seam: reuse the ring start's position, blend its normal.
                    let mut start = [0.0_f32; 6];
                    start.copy_from_slice(&view.element(ring_start)[..6]);
                    view.element_mut(vertex).copy_from_slice(&[
                        start[0],
                        start[1],
                        start[2],
                        start[3] + (x * norm_len) * 0.5,
                        start[4] + (comp1 * norm_len) * 0.5,
                        start[5] + (comp2 * norm_len) * 0.5,
                        t0,
                        t1,
                        t2,
                    ]);
                } else {
                    view.element_mut(vertex).copy_from_slice(&[
                        x,
                        comp1,
                        comp2,
                        x * norm_len,
                        comp1 * norm_len,
                        comp2 * norm_len,
                        t0,
                        t1,
                        t2,
                    ]);
                }

                if i > 0 && j > 0 {
                    let a = ((seg_w + 1) * j + i) as u16;
                    let b = ((seg_w + 1) * j + i - 1) as u16;
                    let c = ((seg_w + 1) * (j - 1) + i - 1) as u16;
                    let d = ((seg_w + 1) * (j - 1) + i) as u16;

                    if j == seg_h {
                        // North pole ring collapses onto its first vertex.
                        let mut pole = [0.0_f32; 3];
                        pole.copy_from_slice(&view.element(ring_start)[..3]);
                        view.element_mut(vertex)[..3].copy_from_slice(&pole);

                        indices.extend_from_slice(&[a, c, d]);
                    } else if j == 1 {
                        indices.extend_from_slice(&[a, b, c]);
                    } else {
                        indices.extend_from_slice(&[a, b, c, a, c, d]);
                    }
                }
            }
        }
    }
}

impl Primitive for SphereGeometry {
    fn state(&self) -> &PrimitiveState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut PrimitiveState {
        &mut self.state
    }

    fn build_geometry(&mut self, target: &mut CompactSubGeometry) -> Result<()> {
        let num_vertices = self.vertex_count();
        if num_vertices > usize::from(u16::MAX) + 1 {
            return Err(AerieError::IndexOverflow(num_vertices));
        }
        let required = target.required_len(num_vertices);

        let (mut vertices, mut indices) =
            if num_vertices == target.vertex_count() && target.vertex_data().len() == required {
                (target.take_vertex_data(), target.take_index_data())
            } else {
                log::debug!(
                    "SphereGeometry: reallocating target ({} -> {} vertices)",
                    target.vertex_count(),
                    num_vertices
                );
                target.invalidate_buffers();
                // Fresh storage carries no texture coordinates.
                self.state.invalidate_uvs();
                (vec![0.0; required], Vec::with_capacity(self.index_count()))
            };
        indices.clear();

        let result = StridedSliceMut::new(
            &mut vertices,
            target.vertex_offset(),
            target.vertex_stride(),
            GEOMETRY_ATTRIBUTE_WIDTH,
        )
        .map(|mut view| self.write_vertices(&mut view, &mut indices));

        debug_assert!(result.is_err() || indices.len() == self.index_count());
        target.update_data(vertices, num_vertices);
        target.update_index_data(indices);
        result
    }

    fn build_uvs(&mut self, target: &mut CompactSubGeometry) -> Result<()> {
        let num_vertices = self.vertex_count();
        let required = target.required_len(num_vertices);

        let mut data = if target.vertex_data().len() == required {
            target.take_vertex_data()
        } else {
            // Positions are lost with the old storage; rebuild them too.
            target.invalidate_buffers();
            self.state.invalidate_geometry();
            vec![0.0; required]
        };

        let seg_w = usize::from(self.segments_w);
        let seg_h = usize::from(self.segments_h);
        let uv_offset = target.uv_offset();
        let uv_stride = target.uv_stride();
        let result = StridedSliceMut::new(&mut data, uv_offset, uv_stride, UV_WIDTH)
            .map(|mut view| {
                let mut index = 0;
                for j in 0..=seg_h {
                    for i in 0..=seg_w {
                        let uv = [i as f32 / seg_w as f32, j as f32 / seg_h as f32];
                        view.element_mut(index).copy_from_slice(&uv);
                        index += 1;
                    }
                }
            });

        target.update_data(data, num_vertices);
        result
    }
}

/// Builds a sphere into a fresh default-layout sub-geometry.
pub fn create_sphere(options: SphereOptions) -> Result<CompactSubGeometry> {
    let mut sphere = SphereGeometry::new(options);
    let mut target = CompactSubGeometry::new();
    sphere.update(&mut target)?;
    Ok(target)
}
