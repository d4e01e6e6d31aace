//! Rendering Module
//!
//! - [`context`]: the graphics-context boundary ([`Context`])
//! - [`entity_collector`]: per-frame visible set
//! - [`default_renderer`]: forward reference renderer
//!
//! A [`Renderer`] receives a filled [`EntityCollector`] once per frame and
//! turns it into draw calls on its bound context.

pub mod context;
pub mod default_renderer;
pub mod entity_collector;

pub use context::{ClearMask, Context, ProgramType, Rect, SharedContext};
pub use default_renderer::DefaultRenderer;
pub use entity_collector::{EntityCollector, RenderableEntry};

use std::cell::RefCell;
use std::rc::Rc;

use crate::errors::Result;
use crate::resources::texture::TextureRef;

pub type SharedRenderer = Rc<RefCell<dyn Renderer>>;

pub trait Renderer {
    fn create_entity_collector(&self) -> EntityCollector {
        EntityCollector::new()
    }

    fn set_context(&mut self, context: Option<SharedContext>);

    fn set_background(&mut self, texture: Option<TextureRef>);

    /// Channels in `[0, 1]`.
    fn set_background_color(&mut self, r: f32, g: f32, b: f32);

    fn set_background_alpha(&mut self, alpha: f32);

    fn set_anti_alias(&mut self, level: u32);

    /// Draws the collected frame. `target` overrides the back buffer;
    /// `scissor` limits drawing to a sub-rect.
    fn render(
        &mut self,
        collector: &mut EntityCollector,
        target: Option<&TextureRef>,
        scissor: Option<&Rect>,
    ) -> Result<()>;

    /// Depth-only pass over the collected frame.
    fn render_depth_prepass(&mut self, _collector: &mut EntityCollector) -> Result<()> {
        Ok(())
    }

    /// Renders scene depth into `target`. Encoding is up to the renderer.
    fn render_depth_to_texture(
        &mut self,
        _collector: &mut EntityCollector,
        _target: &TextureRef,
    ) -> Result<()> {
        Ok(())
    }
}
