//! View Settings
//!
//! Initial configuration of a [`View3D`](crate::view::View3D), loadable
//! from JSON:
//!
//! ```rust,ignore
//! let settings = ViewSettings::from_json(r#"{ "width": 1280, "height": 720 }"#)?;
//! let view = View3D::with_settings(None, None, None, &settings);
//! ```

use serde::{Deserialize, Serialize};

use crate::errors::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewSettings {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Packed `0xRRGGBB`.
    pub background_color: u32,
    pub background_alpha: f32,
    pub anti_alias: u32,
    /// Clear only depth so the view composites over earlier layers.
    pub layered: bool,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
            background_color: 0x000000,
            background_alpha: 1.0,
            anti_alias: 0,
            layered: false,
        }
    }
}

impl ViewSettings {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
