use glam::Mat4;

use crate::errors::{AerieError, Result};
use crate::renderer::context::{ClearMask, Context, ProgramType, Rect, SharedContext};
use crate::renderer::entity_collector::{EntityCollector, RenderableEntry};
use crate::renderer::Renderer;
use crate::resources::texture::TextureRef;

/// First vertex constant register of the model-view-projection matrix.
pub const MVP_REGISTER: u32 = 0;
/// First vertex constant register of the model (world) matrix.
pub const MODEL_REGISTER: u32 = 4;

/// Forward renderer: clear, then draw opaque front to back and blended
/// back to front, activating each renderable's material pass.
pub struct DefaultRenderer {
    context: Option<SharedContext>,
    background: Option<TextureRef>,
    background_rgb: [f32; 3],
    background_alpha: f32,
    anti_alias: u32,
}

impl Default for DefaultRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl DefaultRenderer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            context: None,
            background: None,
            background_rgb: [0.0; 3],
            background_alpha: 1.0,
            anti_alias: 0,
        }
    }

    /// Image a backend draws behind the scene, if any.
    #[must_use]
    pub fn background(&self) -> Option<&TextureRef> {
        self.background.as_ref()
    }

    #[must_use]
    pub fn background_color(&self) -> [f32; 3] {
        self.background_rgb
    }

    #[must_use]
    pub fn background_alpha(&self) -> f32 {
        self.background_alpha
    }

    #[must_use]
    pub fn anti_alias(&self) -> u32 {
        self.anti_alias
    }

    fn context(&self) -> Result<SharedContext> {
        self.context.clone().ok_or(AerieError::MissingContext)
    }

    fn upload_transforms(
        context: &mut dyn Context,
        view_projection: Mat4,
        entry: &RenderableEntry,
    ) {
        let model = Mat4::from(entry.transform);
        let mvp = view_projection * model;
        context.set_program_constants(ProgramType::Vertex, MVP_REGISTER, &mvp.to_cols_array());
        context.set_program_constants(ProgramType::Vertex, MODEL_REGISTER, &model.to_cols_array());
    }

    fn draw_entries(
        context: &mut dyn Context,
        collector: &EntityCollector,
        entries: &[RenderableEntry],
        with_materials: bool,
    ) -> Result<()> {
        let view_projection = collector.view_projection();
        for entry in entries {
            let Some(geometry) = &entry.geometry else {
                continue;
            };
            if with_materials {
                let Some(material) = &entry.material else {
                    continue;
                };
                material.borrow_mut().activate(collector, context)?;
            }
            Self::upload_transforms(context, view_projection, entry);
            context.draw_triangles(geometry, 0, entry.num_triangles);
        }
        Ok(())
    }
}

impl Renderer for DefaultRenderer {
    fn set_context(&mut self, context: Option<SharedContext>) {
        self.context = context;
    }

    fn set_background(&mut self, texture: Option<TextureRef>) {
        self.background = texture;
    }

    fn set_background_color(&mut self, r: f32, g: f32, b: f32) {
        self.background_rgb = [r, g, b];
    }

    fn set_background_alpha(&mut self, alpha: f32) {
        self.background_alpha = alpha;
    }

    fn set_anti_alias(&mut self, level: u32) {
        self.anti_alias = level;
    }

    fn render(
        &mut self,
        collector: &mut EntityCollector,
        target: Option<&TextureRef>,
        scissor: Option<&Rect>,
    ) -> Result<()> {
        let context = self.context()?;
        let mut context = context.borrow_mut();

        context.set_render_target(target);
        context.set_scissor_rectangle(scissor.copied());
        let [r, g, b] = self.background_rgb;
        context.clear(r, g, b, self.background_alpha, 1.0, 0, ClearMask::ALL);

        collector.sort();
        let collector: &EntityCollector = collector;
        log::trace!(
            "DefaultRenderer: {} opaque, {} blended, {} triangles",
            collector.opaque_renderables().len(),
            collector.blended_renderables().len(),
            collector.num_triangles()
        );
        Self::draw_entries(&mut *context, collector, collector.opaque_renderables(), true)?;
        Self::draw_entries(&mut *context, collector, collector.blended_renderables(), true)?;

        if target.is_none() {
            context.present();
        }
        Ok(())
    }

    fn render_depth_prepass(&mut self, collector: &mut EntityCollector) -> Result<()> {
        let context = self.context()?;
        let mut context = context.borrow_mut();
        context.clear(0.0, 0.0, 0.0, 0.0, 1.0, 0, ClearMask::DEPTH);
        collector.sort();
        let collector: &EntityCollector = collector;
        Self::draw_entries(&mut *context, collector, collector.opaque_renderables(), false)
    }

    fn render_depth_to_texture(
        &mut self,
        collector: &mut EntityCollector,
        target: &TextureRef,
    ) -> Result<()> {
        let context = self.context()?;
        let mut context = context.borrow_mut();
        context.set_render_target(Some(target));
        context.clear(1.0, 1.0, 1.0, 1.0, 1.0, 0, ClearMask::ALL);
        collector.sort();
        let collector: &EntityCollector = collector;
        let result = Self::draw_entries(
            &mut *context,
            collector,
            collector.opaque_renderables(),
            false,
        );
        context.set_render_target(None);
        result
    }
}
