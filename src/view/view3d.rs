//! View3D
//!
//! Ties a camera, a scene and a renderer to a rectangle of the screen and
//! runs the per-frame cycle. Property setters only record what changed in
//! four dirty flags; [`View3D::render`] consumes each flag in the step
//! that needs it:
//!
//! | Flag                  | Set by                              | Consumed by            |
//! |-----------------------|-------------------------------------|------------------------|
//! | `back_buffer_invalid` | `set_width`, `set_height`           | viewport configuration |
//! | `global_pos_dirty`    | `set_x`, `set_y`, `set_context`     | global position update |
//! | `scissor_rect_dirty`  | size, position, camera changes      | lens update            |
//! | `viewport_dirty`      | back buffer, position, camera       | lens update            |

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::sync::Arc;

use glam::Vec3;

use crate::errors::{AerieError, Result};
use crate::renderer::context::{ClearMask, Rect, SharedContext};
use crate::renderer::default_renderer::DefaultRenderer;
use crate::renderer::entity_collector::EntityCollector;
use crate::renderer::SharedRenderer;
use crate::resources::texture::{Texture2D, TextureRef};
use crate::scene::camera::{Camera, Ray};
use crate::scene::scene::{PartitionListener, Scene};
use crate::scene::{ListenerKey, SharedCamera, SharedScene};
use crate::utils::color::unpack_rgb;
use crate::view::settings::ViewSettings;

pub struct View3D {
    scene: SharedScene,
    camera: SharedCamera,
    renderer: SharedRenderer,
    collector: EntityCollector,
    context: Option<SharedContext>,
    scene_listener: Option<ListenerKey>,

    x: f32,
    y: f32,
    width: f32,
    height: f32,
    aspect_ratio: f32,
    scissor_rect: Rect,

    background: Option<TextureRef>,
    background_color: u32,
    background_alpha: f32,
    anti_alias: u32,
    visible: bool,
    layered: bool,
    depth_texture: Option<TextureRef>,

    back_buffer_invalid: bool,
    global_pos_dirty: bool,
    scissor_rect_dirty: bool,
    viewport_dirty: bool,
}

impl View3D {
    /// Missing collaborators are replaced by a fresh scene, a default
    /// camera and a [`DefaultRenderer`].
    #[must_use]
    pub fn new(
        scene: Option<SharedScene>,
        camera: Option<SharedCamera>,
        renderer: Option<SharedRenderer>,
    ) -> Self {
        let scene = scene.unwrap_or_else(|| Rc::new(RefCell::new(Scene::new())));
        let camera = camera.unwrap_or_else(|| Rc::new(RefCell::new(Camera::default())));
        let renderer = renderer
            .unwrap_or_else(|| Rc::new(RefCell::new(DefaultRenderer::new())) as SharedRenderer);

        let mut collector = renderer.borrow().create_entity_collector();
        collector.set_camera(Some(camera.clone()));

        let scene_listener = {
            let mut scene = scene.borrow_mut();
            camera.borrow_mut().set_partition(Some(scene.partition_id()));
            scene.add_partition_listener(Self::partition_listener(&camera))
        };

        let view = Self {
            scene,
            camera,
            renderer,
            collector,
            context: None,
            scene_listener: Some(scene_listener),
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
            aspect_ratio: 0.0,
            scissor_rect: Rect::default(),
            background: None,
            background_color: 0x000000,
            background_alpha: 1.0,
            anti_alias: 0,
            visible: true,
            layered: false,
            depth_texture: None,
            back_buffer_invalid: true,
            global_pos_dirty: false,
            scissor_rect_dirty: true,
            viewport_dirty: true,
        };
        view.push_renderer_state();
        view
    }

    #[must_use]
    pub fn with_settings(
        scene: Option<SharedScene>,
        camera: Option<SharedCamera>,
        renderer: Option<SharedRenderer>,
        settings: &ViewSettings,
    ) -> Self {
        let mut view = Self::new(scene, camera, renderer);
        view.set_x(settings.x);
        view.set_y(settings.y);
        view.set_width(settings.width);
        view.set_height(settings.height);
        view.set_background_color(settings.background_color);
        view.set_background_alpha(settings.background_alpha);
        view.set_anti_alias(settings.anti_alias);
        view.set_layered(settings.layered);
        view
    }

    /// Keeps the camera bound to whatever partition the scene switches to.
    fn partition_listener(camera: &SharedCamera) -> PartitionListener {
        let camera: Weak<RefCell<Camera>> = Rc::downgrade(camera);
        Box::new(move |partition| {
            if let Some(camera) = camera.upgrade() {
                camera.borrow_mut().set_partition(Some(partition));
            }
        })
    }

    fn push_renderer_state(&self) {
        let mut renderer = self.renderer.borrow_mut();
        renderer.set_context(self.context.clone());
        renderer.set_anti_alias(self.anti_alias);
        let [r, g, b] = unpack_rgb(self.background_color);
        renderer.set_background_color(r, g, b);
        renderer.set_background_alpha(self.background_alpha);
        renderer.set_background(self.background.clone());
    }

    fn unsubscribe(&mut self) {
        let Some(key) = self.scene_listener.take() else {
            return;
        };
        match self.scene.try_borrow_mut() {
            Ok(mut scene) => {
                scene.remove_partition_listener(key);
            }
            // The listener only holds a weak camera handle, so a leaked one is inert.
            Err(_) => log::warn!(
                "View3D: scene already borrowed, partition listener {key:?} left registered"
            ),
        }
    }

    fn subscribe(&mut self) {
        let mut scene = self.scene.borrow_mut();
        self.camera
            .borrow_mut()
            .set_partition(Some(scene.partition_id()));
        let listener = Self::partition_listener(&self.camera);
        self.scene_listener = Some(scene.add_partition_listener(listener));
    }

    // ========================================================================
    // Collaborators
    // ========================================================================

    #[must_use]
    pub fn context(&self) -> Option<&SharedContext> {
        self.context.as_ref()
    }

    pub fn set_context(&mut self, context: Option<SharedContext>) {
        self.renderer.borrow_mut().set_context(context.clone());
        self.context = context;
        self.global_pos_dirty = true;
    }

    #[must_use]
    pub fn renderer(&self) -> &SharedRenderer {
        &self.renderer
    }

    /// Swapping renderers re-pushes every forwarded property and rebuilds
    /// the entity collector.
    pub fn set_renderer(&mut self, renderer: SharedRenderer) {
        if Rc::ptr_eq(&self.renderer, &renderer) {
            return;
        }
        log::debug!("View3D: renderer replaced");
        self.renderer = renderer;
        self.push_renderer_state();

        self.collector = self.renderer.borrow().create_entity_collector();
        self.collector.set_camera(Some(self.camera.clone()));
    }

    #[must_use]
    pub fn camera(&self) -> &SharedCamera {
        &self.camera
    }

    pub fn set_camera(&mut self, camera: SharedCamera) {
        log::debug!("View3D: camera replaced");
        self.unsubscribe();
        self.camera = camera;
        self.subscribe();
        if self.aspect_ratio.is_finite() && self.aspect_ratio > 0.0 {
            self.camera
                .borrow_mut()
                .lens_mut()
                .set_aspect_ratio(self.aspect_ratio);
        }
        self.collector.set_camera(Some(self.camera.clone()));
        self.scissor_rect_dirty = true;
        self.viewport_dirty = true;
    }

    #[must_use]
    pub fn scene(&self) -> &SharedScene {
        &self.scene
    }

    pub fn set_scene(&mut self, scene: SharedScene) {
        if Rc::ptr_eq(&self.scene, &scene) {
            return;
        }
        log::debug!("View3D: scene replaced");
        self.unsubscribe();
        self.scene = scene;
        self.subscribe();
    }

    #[must_use]
    pub fn entity_collector(&self) -> &EntityCollector {
        &self.collector
    }

    // ========================================================================
    // Background & presentation
    // ========================================================================

    #[must_use]
    pub fn background(&self) -> Option<&TextureRef> {
        self.background.as_ref()
    }

    pub fn set_background(&mut self, texture: Option<TextureRef>) {
        self.renderer.borrow_mut().set_background(texture.clone());
        self.background = texture;
    }

    #[must_use]
    pub fn background_color(&self) -> u32 {
        self.background_color
    }

    /// Packed `0xRRGGBB`.
    pub fn set_background_color(&mut self, color: u32) {
        self.background_color = color;
        let [r, g, b] = unpack_rgb(color);
        self.renderer.borrow_mut().set_background_color(r, g, b);
    }

    #[must_use]
    pub fn background_alpha(&self) -> f32 {
        self.background_alpha
    }

    /// Clamped to `[0, 1]`.
    pub fn set_background_alpha(&mut self, alpha: f32) {
        let alpha = alpha.clamp(0.0, 1.0);
        self.background_alpha = alpha;
        self.renderer.borrow_mut().set_background_alpha(alpha);
    }

    #[must_use]
    pub fn anti_alias(&self) -> u32 {
        self.anti_alias
    }

    pub fn set_anti_alias(&mut self, level: u32) {
        if level == self.anti_alias {
            return;
        }
        self.anti_alias = level;
        self.renderer.borrow_mut().set_anti_alias(level);
    }

    #[must_use]
    pub fn visible(&self) -> bool {
        self.visible
    }

    /// An invisible view skips `render` and keeps its dirty flags.
    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    #[must_use]
    pub fn layered(&self) -> bool {
        self.layered
    }

    pub fn set_layered(&mut self, layered: bool) {
        self.layered = layered;
    }

    // ========================================================================
    // Geometry
    // ========================================================================

    #[must_use]
    pub fn x(&self) -> f32 {
        self.x
    }

    pub fn set_x(&mut self, value: f32) {
        if value == self.x {
            return;
        }
        self.x = value;
        self.global_pos_dirty = true;
    }

    #[must_use]
    pub fn y(&self) -> f32 {
        self.y
    }

    pub fn set_y(&mut self, value: f32) {
        if value == self.y {
            return;
        }
        self.y = value;
        self.global_pos_dirty = true;
    }

    #[must_use]
    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn set_width(&mut self, value: f32) {
        if value == self.width {
            return;
        }
        self.width = value;
        self.scissor_rect.width = value;
        self.update_aspect_ratio();
        self.back_buffer_invalid = true;
        self.scissor_rect_dirty = true;
    }

    #[must_use]
    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn set_height(&mut self, value: f32) {
        if value == self.height {
            return;
        }
        self.height = value;
        self.scissor_rect.height = value;
        self.update_aspect_ratio();
        self.back_buffer_invalid = true;
        self.scissor_rect_dirty = true;
    }

    fn update_aspect_ratio(&mut self) {
        self.aspect_ratio = self.width / self.height;
        self.camera
            .borrow_mut()
            .lens_mut()
            .set_aspect_ratio(self.aspect_ratio);
    }

    #[must_use]
    pub fn aspect_ratio(&self) -> f32 {
        self.aspect_ratio
    }

    #[must_use]
    pub fn scissor_rect(&self) -> Rect {
        self.scissor_rect
    }

    #[must_use]
    pub fn is_back_buffer_invalid(&self) -> bool {
        self.back_buffer_invalid
    }

    #[must_use]
    pub fn is_global_pos_dirty(&self) -> bool {
        self.global_pos_dirty
    }

    #[must_use]
    pub fn is_scissor_rect_dirty(&self) -> bool {
        self.scissor_rect_dirty
    }

    #[must_use]
    pub fn is_viewport_dirty(&self) -> bool {
        self.viewport_dirty
    }

    // ========================================================================
    // Frame
    // ========================================================================

    fn require_context(&self) -> Result<SharedContext> {
        self.context.clone().ok_or(AerieError::MissingContext)
    }

    /// The back buffer is placed at the view's position, so the scissor
    /// rect starts at its origin.
    fn update_global_pos(&mut self) {
        self.global_pos_dirty = false;
        self.scissor_rect.x = 0.0;
        self.scissor_rect.y = 0.0;
        self.scissor_rect_dirty = true;
        self.viewport_dirty = true;
    }

    fn update_lens(&mut self) {
        let mut camera = self.camera.borrow_mut();
        let lens = camera.lens_mut();
        lens.set_aspect_ratio(self.aspect_ratio);
        if self.scissor_rect_dirty {
            let s = self.scissor_rect;
            lens.update_scissor_rect(s.x, s.y, s.width, s.height);
            self.scissor_rect_dirty = false;
        }
        if self.viewport_dirty {
            lens.update_viewport(self.x, self.y, self.width, self.height);
            self.viewport_dirty = false;
        }
    }

    fn collect(&mut self) {
        self.collector.clear();
        self.scene.borrow().traverse_partitions(&mut self.collector);
    }

    /// Runs one frame: viewport and lens maintenance, scene traversal and
    /// the renderer's draw.
    pub fn render(&mut self) -> Result<()> {
        let context = self.require_context()?;
        if !self.visible {
            return Ok(());
        }

        if self.back_buffer_invalid {
            context.borrow_mut().configure_viewport(
                self.x,
                self.y,
                self.width,
                self.height,
                self.anti_alias,
            );
            self.back_buffer_invalid = false;
            self.viewport_dirty = true;
        }

        if self.layered {
            context
                .borrow_mut()
                .clear(0.0, 0.0, 0.0, 1.0, 1.0, 0, ClearMask::DEPTH);
        }

        if self.global_pos_dirty {
            self.update_global_pos();
        }
        self.update_lens();

        self.collect();
        log::trace!(
            "View3D: collected {} triangles",
            self.collector.num_triangles()
        );

        let scissor = self.scissor_rect;
        self.renderer
            .borrow_mut()
            .render(&mut self.collector, None, Some(&scissor))
    }

    /// Collects the scene and asks the renderer for a depth-only pass.
    pub fn render_depth_prepass(&mut self) -> Result<()> {
        self.require_context()?;
        self.update_lens();
        self.collect();
        self.renderer
            .borrow_mut()
            .render_depth_prepass(&mut self.collector)
    }

    /// Renders scene depth into [`depth_texture`](Self::depth_texture),
    /// (re)creating it at the power-of-two size covering the view.
    pub fn render_scene_depth_to_texture(&mut self) -> Result<()> {
        self.require_context()?;
        let width = (self.width.max(1.0).ceil() as u32).next_power_of_two();
        let height = (self.height.max(1.0).ceil() as u32).next_power_of_two();
        let stale = self
            .depth_texture
            .as_ref()
            .is_none_or(|texture| texture.width != width || texture.height != height);
        if stale {
            log::debug!("View3D: depth texture resized to {width}x{height}");
            self.depth_texture = Some(Arc::new(Texture2D::new_depth(width, height)));
        }

        self.update_lens();
        self.collect();
        let Some(target) = self.depth_texture.clone() else {
            return Ok(());
        };
        self.renderer
            .borrow_mut()
            .render_depth_to_texture(&mut self.collector, &target)
    }

    #[must_use]
    pub fn depth_texture(&self) -> Option<&TextureRef> {
        self.depth_texture.as_ref()
    }

    // ========================================================================
    // Picking
    // ========================================================================

    /// World point to `(screen_x, screen_y, view_depth)` in pixels.
    #[must_use]
    pub fn project(&self, point: Vec3) -> Vec3 {
        let v = self.camera.borrow().project(point);
        Vec3::new(
            (v.x + 1.0) * self.width * 0.5,
            (v.y + 1.0) * self.height * 0.5,
            v.z,
        )
    }

    fn screen_to_ndc(&self, screen_x: f32, screen_y: f32) -> (f32, f32) {
        (
            (2.0 * screen_x - self.width) / self.width,
            (2.0 * screen_y - self.height) / self.height,
        )
    }

    /// Screen pixel and view depth back to world space.
    #[must_use]
    pub fn unproject(&self, screen_x: f32, screen_y: f32, depth: f32) -> Vec3 {
        let (nx, ny) = self.screen_to_ndc(screen_x, screen_y);
        self.camera.borrow().unproject(nx, ny, depth)
    }

    #[must_use]
    pub fn get_ray(&self, screen_x: f32, screen_y: f32, depth: f32) -> Ray {
        let (nx, ny) = self.screen_to_ndc(screen_x, screen_y);
        self.camera.borrow().get_ray(nx, ny, depth)
    }
}

impl Drop for View3D {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
