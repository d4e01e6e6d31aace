use std::borrow::Cow;
use std::sync::Arc;

use uuid::Uuid;
use wgpu::TextureFormat;

/// Shared handle to a texture description.
pub type TextureRef = Arc<Texture2D>;

/// CPU-side description of a 2D texture living on the graphics context.
///
/// The engine core never touches pixel data; it only needs enough
/// information to decide whether swapping one texture for another changes
/// the generated sampling code (format and mipmap presence do).
#[derive(Debug, Clone)]
pub struct Texture2D {
    pub uuid: Uuid,
    pub name: Cow<'static, str>,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub has_mipmaps: bool,
}

impl Texture2D {
    #[must_use]
    pub fn new(
        name: impl Into<Cow<'static, str>>,
        width: u32,
        height: u32,
        format: TextureFormat,
    ) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: name.into(),
            width,
            height,
            format,
            has_mipmaps: false,
        }
    }

    #[must_use]
    pub fn with_mipmaps(mut self, has_mipmaps: bool) -> Self {
        self.has_mipmaps = has_mipmaps;
        self
    }

    /// Depth target used by the depth-to-texture pass.
    #[must_use]
    pub fn new_depth(width: u32, height: u32) -> Self {
        Self::new("SceneDepthTexture", width, height, TextureFormat::Depth32Float)
    }

    /// Whether sampling `self` instead of `other` needs different shader code.
    #[must_use]
    pub fn sampling_differs(&self, other: &Texture2D) -> bool {
        self.has_mipmaps != other.has_mipmaps || self.format != other.format
    }

    /// Short sampler hint used by textual shader dumps.
    #[must_use]
    pub fn format_hint(&self) -> &'static str {
        match self.format {
            TextureFormat::Bc1RgbaUnorm | TextureFormat::Bc1RgbaUnormSrgb => "dxt1",
            TextureFormat::Bc3RgbaUnorm | TextureFormat::Bc3RgbaUnormSrgb => "dxt5",
            _ => "rgba",
        }
    }
}
