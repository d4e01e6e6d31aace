//! Graphics Context Interface
//!
//! The boundary between the engine core and a GPU backend. The core only
//! issues state changes and draw submissions through [`Context`]; buffer
//! and texture creation stay on the backend side.

use std::cell::RefCell;
use std::rc::Rc;

use bitflags::bitflags;

use crate::materials::shader_chunk::ShaderChunk;
use crate::resources::geometry::CompactSubGeometry;
use crate::resources::texture::TextureRef;

pub type SharedContext = Rc<RefCell<dyn Context>>;

bitflags! {
    /// Buffers affected by [`Context::clear`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ClearMask: u8 {
        const COLOR   = 1 << 0;
        const DEPTH   = 1 << 1;
        const STENCIL = 1 << 2;
        const ALL     = Self::COLOR.bits() | Self::DEPTH.bits() | Self::STENCIL.bits();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgramType {
    Vertex,
    Fragment,
}

/// Axis-aligned rectangle in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    #[must_use]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }
}

pub trait Context {
    /// Sizes the back buffer and places it on screen.
    fn configure_viewport(&mut self, x: f32, y: f32, width: f32, height: f32, anti_alias: u32);

    fn clear(&mut self, r: f32, g: f32, b: f32, a: f32, depth: f32, stencil: u32, mask: ClearMask);

    fn set_scissor_rectangle(&mut self, rect: Option<Rect>);

    /// `None` renders to the back buffer.
    fn set_render_target(&mut self, target: Option<&TextureRef>);

    fn set_program(&mut self, program: &ShaderChunk);

    /// Uploads `data` (four floats per register) starting at `first_register`.
    fn set_program_constants(&mut self, program: ProgramType, first_register: u32, data: &[f32]);

    fn set_texture_at(&mut self, sampler: u32, texture: Option<&TextureRef>);

    fn draw_triangles(
        &mut self,
        geometry: &CompactSubGeometry,
        first_index: u32,
        num_triangles: u32,
    );

    fn present(&mut self);
}
