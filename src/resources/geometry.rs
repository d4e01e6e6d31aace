use glam::{Vec2, Vec3};
use wgpu::{BufferAddress, VertexAttribute, VertexFormat};

use crate::errors::{AerieError, Result};
use crate::resources::version_tracker::ChangeTracker;

/// Floats per vertex in the default compact layout:
/// position(3) normal(3) tangent(3) uv(2) secondary uv(2).
pub const DEFAULT_VERTEX_STRIDE: usize = 13;
/// Floats written by geometry builders: position, normal, tangent.
pub const GEOMETRY_ATTRIBUTE_WIDTH: usize = 9;
pub const UV_WIDTH: usize = 2;

const NORMAL_OFFSET: usize = 3;
const TANGENT_OFFSET: usize = 6;
const UV_OFFSET: usize = 9;
const SECONDARY_UV_OFFSET: usize = 11;

/// Mutable view over fixed-width elements laid out at `offset + i * stride`.
///
/// Builders write through this instead of raw index arithmetic, so the
/// target's interleaving (extra attributes skipped by the stride) is
/// honoured in one place.
pub struct StridedSliceMut<'a> {
    data: &'a mut [f32],
    offset: usize,
    stride: usize,
    width: usize,
}

impl<'a> StridedSliceMut<'a> {
    pub fn new(data: &'a mut [f32], offset: usize, stride: usize, width: usize) -> Result<Self> {
        if stride < width {
            return Err(AerieError::InvalidVertexLayout(format!(
                "stride {stride} cannot hold {width} floats per element"
            )));
        }
        Ok(Self { data, offset, stride, width })
    }

    /// Number of whole elements addressable in the underlying slice.
    #[must_use]
    pub fn len(&self) -> usize {
        if self.data.len() < self.offset + self.width {
            return 0;
        }
        (self.data.len() - self.offset - self.width) / self.stride + 1
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    #[must_use]
    pub fn element(&self, i: usize) -> &[f32] {
        let start = self.offset + i * self.stride;
        &self.data[start..start + self.width]
    }

    #[inline]
    pub fn element_mut(&mut self, i: usize) -> &mut [f32] {
        let start = self.offset + i * self.stride;
        &mut self.data[start..start + self.width]
    }
}

/// Interleaved sub-geometry: one float buffer holding every vertex
/// attribute plus a 16-bit index buffer.
///
/// The geometry does not generate anything itself; primitive builders
/// write into it and it records what changed so the GPU side knows
/// whether to re-upload (`data_version`) or recreate buffers
/// (`layout_version`).
#[derive(Debug, Clone)]
pub struct CompactSubGeometry {
    vertex_data: Vec<f32>,
    index_data: Vec<u16>,
    vertex_stride: usize,
    vertex_offset: usize,
    uv_stride: usize,
    uv_offset: usize,
    vertex_count: usize,

    data_version: ChangeTracker,
    index_version: ChangeTracker,
    layout_version: ChangeTracker,
}

impl Default for CompactSubGeometry {
    fn default() -> Self {
        Self::new()
    }
}

impl CompactSubGeometry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            vertex_data: Vec::new(),
            index_data: Vec::new(),
            vertex_stride: DEFAULT_VERTEX_STRIDE,
            vertex_offset: 0,
            uv_stride: DEFAULT_VERTEX_STRIDE,
            uv_offset: UV_OFFSET,
            vertex_count: 0,
            data_version: ChangeTracker::new(),
            index_version: ChangeTracker::new(),
            layout_version: ChangeTracker::new(),
        }
    }

    /// Custom interleaving, e.g. a buffer shared with other attributes.
    ///
    /// `vertex_stride` must leave room for position, normal and tangent
    /// after `vertex_offset`, and `uv_stride` for a UV pair.
    pub fn with_layout(
        vertex_stride: usize,
        vertex_offset: usize,
        uv_stride: usize,
        uv_offset: usize,
    ) -> Result<Self> {
        if vertex_stride < GEOMETRY_ATTRIBUTE_WIDTH {
            return Err(AerieError::InvalidVertexLayout(format!(
                "vertex stride {vertex_stride} is smaller than {GEOMETRY_ATTRIBUTE_WIDTH}"
            )));
        }
        if uv_stride < UV_WIDTH {
            return Err(AerieError::InvalidVertexLayout(format!(
                "uv stride {uv_stride} is smaller than {UV_WIDTH}"
            )));
        }
        Ok(Self {
            vertex_stride,
            vertex_offset,
            uv_stride,
            uv_offset,
            ..Self::new()
        })
    }

    #[must_use]
    pub fn vertex_stride(&self) -> usize {
        self.vertex_stride
    }

    #[must_use]
    pub fn vertex_offset(&self) -> usize {
        self.vertex_offset
    }

    #[must_use]
    pub fn uv_stride(&self) -> usize {
        self.uv_stride
    }

    #[must_use]
    pub fn uv_offset(&self) -> usize {
        self.uv_offset
    }

    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    #[must_use]
    pub fn index_count(&self) -> usize {
        self.index_data.len()
    }

    #[must_use]
    pub fn num_triangles(&self) -> usize {
        self.index_data.len() / 3
    }

    /// Float count needed to hold `vertex_count` vertices in this layout,
    /// covering both the geometry and the UV interleaving.
    #[must_use]
    pub fn required_len(&self, vertex_count: usize) -> usize {
        if vertex_count == 0 {
            return 0;
        }
        let geometry = self.vertex_offset + vertex_count * self.vertex_stride;
        let uvs = self.uv_offset + (vertex_count - 1) * self.uv_stride + UV_WIDTH;
        geometry.max(uvs)
    }

    #[must_use]
    pub fn vertex_data(&self) -> &[f32] {
        &self.vertex_data
    }

    #[must_use]
    pub fn index_data(&self) -> &[u16] {
        &self.index_data
    }

    /// Moves the vertex storage out so a builder can refill it in place.
    /// Hand it back with [`update_data`](Self::update_data).
    pub fn take_vertex_data(&mut self) -> Vec<f32> {
        std::mem::take(&mut self.vertex_data)
    }

    pub fn take_index_data(&mut self) -> Vec<u16> {
        std::mem::take(&mut self.index_data)
    }

    /// Installs new interleaved vertex data.
    ///
    /// Callers that reallocated storage must also call
    /// [`invalidate_buffers`](Self::invalidate_buffers).
    pub fn update_data(&mut self, data: Vec<f32>, vertex_count: usize) {
        self.vertex_data = data;
        self.vertex_count = vertex_count;
        self.data_version.changed();
    }

    pub fn update_index_data(&mut self, indices: Vec<u16>) {
        self.index_data = indices;
        self.index_version.changed();
    }

    /// Forces GPU buffers to be recreated on next upload.
    pub fn invalidate_buffers(&mut self) {
        self.layout_version.changed();
    }

    #[must_use]
    pub fn data_version(&self) -> u64 {
        self.data_version.version()
    }

    #[must_use]
    pub fn index_version(&self) -> u64 {
        self.index_version.version()
    }

    #[must_use]
    pub fn layout_version(&self) -> u64 {
        self.layout_version.version()
    }

    fn read_vec3(&self, vertex: usize, attribute_offset: usize) -> Option<Vec3> {
        let start = self.vertex_offset + vertex * self.vertex_stride + attribute_offset;
        self.vertex_data
            .get(start..start + 3)
            .map(Vec3::from_slice)
    }

    #[must_use]
    pub fn position(&self, vertex: usize) -> Option<Vec3> {
        self.read_vec3(vertex, 0)
    }

    #[must_use]
    pub fn normal(&self, vertex: usize) -> Option<Vec3> {
        self.read_vec3(vertex, NORMAL_OFFSET)
    }

    #[must_use]
    pub fn tangent(&self, vertex: usize) -> Option<Vec3> {
        self.read_vec3(vertex, TANGENT_OFFSET)
    }

    #[must_use]
    pub fn uv(&self, vertex: usize) -> Option<Vec2> {
        let start = self.uv_offset + vertex * self.uv_stride;
        self.vertex_data.get(start..start + 2).map(Vec2::from_slice)
    }

    /// Raw bytes of the interleaved vertex buffer, ready for upload.
    #[must_use]
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertex_data)
    }

    #[must_use]
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.index_data)
    }

    #[must_use]
    pub fn array_stride(&self) -> BufferAddress {
        (self.vertex_stride * std::mem::size_of::<f32>()) as BufferAddress
    }

    /// Vertex attributes for a pipeline reading this buffer, at shader
    /// locations 0..=4 (position, normal, tangent, uv, secondary uv).
    ///
    /// Only meaningful when UVs share the vertex buffer's stride, which
    /// is the default layout.
    #[must_use]
    pub fn vertex_attributes(&self) -> [VertexAttribute; 5] {
        let float = std::mem::size_of::<f32>() as BufferAddress;
        let base = self.vertex_offset as BufferAddress * float;
        let uv = self.uv_offset as BufferAddress * float;
        [
            VertexAttribute { format: VertexFormat::Float32x3, offset: base, shader_location: 0 },
            VertexAttribute {
                format: VertexFormat::Float32x3,
                offset: base + NORMAL_OFFSET as BufferAddress * float,
                shader_location: 1,
            },
            VertexAttribute {
                format: VertexFormat::Float32x3,
                offset: base + TANGENT_OFFSET as BufferAddress * float,
                shader_location: 2,
            },
            VertexAttribute { format: VertexFormat::Float32x2, offset: uv, shader_location: 3 },
            VertexAttribute {
                format: VertexFormat::Float32x2,
                offset: uv + (SECONDARY_UV_OFFSET - UV_OFFSET) as BufferAddress * float,
                shader_location: 4,
            },
        ]
    }
}
