//! Shared test doubles: a context and a renderer that record every call.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use aerie::errors::Result;
use aerie::materials::ShaderChunk;
use aerie::renderer::{
    ClearMask, Context, EntityCollector, ProgramType, Rect, Renderer, SharedContext,
    SharedRenderer,
};
use aerie::resources::{CompactSubGeometry, TextureRef};

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// ============================================================================
// RecordingContext
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum ContextCall {
    ConfigureViewport { x: f32, y: f32, width: f32, height: f32, anti_alias: u32 },
    Clear { rgba: [f32; 4], mask: ClearMask },
    Scissor(Option<Rect>),
    RenderTarget(bool),
    Program(usize),
    Constants { program: ProgramType, first: u32, data: Vec<f32> },
    Texture { sampler: u32, bound: bool },
    Draw { num_triangles: u32 },
    Present,
}

#[derive(Debug, Default)]
pub struct RecordingContext {
    pub calls: Vec<ContextCall>,
    pub programs: Vec<ShaderChunk>,
}

impl RecordingContext {
    pub fn shared() -> (Rc<RefCell<RecordingContext>>, SharedContext) {
        let context = Rc::new(RefCell::new(RecordingContext::default()));
        let shared: SharedContext = context.clone();
        (context, shared)
    }

    pub fn count(&self, pred: impl Fn(&ContextCall) -> bool) -> usize {
        self.calls.iter().filter(|call| pred(call)).count()
    }

    pub fn viewport_configurations(&self) -> usize {
        self.count(|call| matches!(call, ContextCall::ConfigureViewport { .. }))
    }

    pub fn fragment_constants(&self, first: u32) -> Option<&[f32]> {
        self.calls.iter().rev().find_map(|call| match call {
            ContextCall::Constants {
                program: ProgramType::Fragment,
                first: f,
                data,
            } if *f == first => Some(data.as_slice()),
            _ => None,
        })
    }
}

impl Context for RecordingContext {
    fn configure_viewport(&mut self, x: f32, y: f32, width: f32, height: f32, anti_alias: u32) {
        self.calls.push(ContextCall::ConfigureViewport { x, y, width, height, anti_alias });
    }

    fn clear(
        &mut self,
        r: f32,
        g: f32,
        b: f32,
        a: f32,
        _depth: f32,
        _stencil: u32,
        mask: ClearMask,
    ) {
        self.calls.push(ContextCall::Clear { rgba: [r, g, b, a], mask });
    }

    fn set_scissor_rectangle(&mut self, rect: Option<Rect>) {
        self.calls.push(ContextCall::Scissor(rect));
    }

    fn set_render_target(&mut self, target: Option<&TextureRef>) {
        self.calls.push(ContextCall::RenderTarget(target.is_some()));
    }

    fn set_program(&mut self, program: &ShaderChunk) {
        self.calls.push(ContextCall::Program(program.len()));
        self.programs.push(program.clone());
    }

    fn set_program_constants(&mut self, program: ProgramType, first_register: u32, data: &[f32]) {
        self.calls.push(ContextCall::Constants {
            program,
            first: first_register,
            data: data.to_vec(),
        });
    }

    fn set_texture_at(&mut self, sampler: u32, texture: Option<&TextureRef>) {
        self.calls.push(ContextCall::Texture { sampler, bound: texture.is_some() });
    }

    fn draw_triangles(
        &mut self,
        _geometry: &CompactSubGeometry,
        _first_index: u32,
        num_triangles: u32,
    ) {
        self.calls.push(ContextCall::Draw { num_triangles });
    }

    fn present(&mut self) {
        self.calls.push(ContextCall::Present);
    }
}

// ============================================================================
// MockRenderer
// ============================================================================

#[derive(Debug, Default)]
pub struct MockRenderer {
    pub has_context: bool,
    pub background: Option<TextureRef>,
    pub background_rgb: Option<[f32; 3]>,
    pub background_alpha: Option<f32>,
    pub anti_alias: Option<u32>,
    pub renders: usize,
    pub last_scissor: Option<Rect>,
    pub last_triangles: u32,
    pub last_renderables: usize,
    pub depth_prepasses: usize,
    pub depth_textures: Vec<(u32, u32)>,
}

impl MockRenderer {
    pub fn shared() -> (Rc<RefCell<MockRenderer>>, SharedRenderer) {
        let renderer = Rc::new(RefCell::new(MockRenderer::default()));
        let shared: SharedRenderer = renderer.clone();
        (renderer, shared)
    }
}

impl Renderer for MockRenderer {
    fn create_entity_collector(&self) -> EntityCollector {
        COLLECTORS.with(|count| *count.borrow_mut() += 1);
        EntityCollector::new()
    }

    fn set_context(&mut self, context: Option<SharedContext>) {
        self.has_context = context.is_some();
    }

    fn set_background(&mut self, texture: Option<TextureRef>) {
        self.background = texture;
    }

    fn set_background_color(&mut self, r: f32, g: f32, b: f32) {
        self.background_rgb = Some([r, g, b]);
    }

    fn set_background_alpha(&mut self, alpha: f32) {
        self.background_alpha = Some(alpha);
    }

    fn set_anti_alias(&mut self, level: u32) {
        self.anti_alias = Some(level);
    }

    fn render(
        &mut self,
        collector: &mut EntityCollector,
        _target: Option<&TextureRef>,
        scissor: Option<&Rect>,
    ) -> Result<()> {
        self.renders += 1;
        self.last_scissor = scissor.copied();
        self.last_triangles = collector.num_triangles();
        self.last_renderables =
            collector.opaque_renderables().len() + collector.blended_renderables().len();
        Ok(())
    }

    fn render_depth_prepass(&mut self, _collector: &mut EntityCollector) -> Result<()> {
        self.depth_prepasses += 1;
        Ok(())
    }

    fn render_depth_to_texture(
        &mut self,
        _collector: &mut EntityCollector,
        target: &TextureRef,
    ) -> Result<()> {
        self.depth_textures.push((target.width, target.height));
        Ok(())
    }
}

thread_local! {
    pub static COLLECTORS: RefCell<usize> = const { RefCell::new(0) };
}

pub fn collectors_created() -> usize {
    COLLECTORS.with(|count| *count.borrow())
}
