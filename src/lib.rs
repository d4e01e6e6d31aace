#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

//! Aerie: the rendering core of a real-time 3D engine.
//!
//! - [`view`]: viewport management and the per-frame render cycle
//! - [`scene`]: scenes, partitions, cameras, lenses and lights
//! - [`renderer`]: the renderer and graphics-context interfaces, entity collection
//! - [`materials`]: shading-method composition and program compilation
//! - [`resources`]: geometry storage, parametric primitives, textures

pub mod errors;
pub mod materials;
pub mod renderer;
pub mod resources;
pub mod scene;
pub mod utils;
pub mod view;

pub use errors::{AerieError, Result};
pub use materials::{BasicDiffuseMethod, BasicSpecularMethod, LightingMethod, MaterialPass};
pub use renderer::{Context, DefaultRenderer, EntityCollector, Renderer};
pub use resources::primitives::*;
pub use resources::{CompactSubGeometry, Texture2D, TextureRef};
pub use scene::{Camera, Lens, Light, Scene};
pub use view::{View3D, ViewSettings};
