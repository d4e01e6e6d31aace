use bitflags::bitflags;

bitflags! {
    /// Requirements a shading method declares in `init_vo`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MethodFlags: u32 {
        const NEEDS_UV                  = 1 << 0;
        const NEEDS_NORMALS             = 1 << 1;
        const NEEDS_VIEW                = 1 << 2;
        const NEEDS_GLOBAL_FRAGMENT_POS = 1 << 3;
        const USE_MIPMAPPING            = 1 << 4;
        const USE_SMOOTH_TEXTURES       = 1 << 5;
        const REPEAT_TEXTURES           = 1 << 6;
        const USE_LIGHT_FALLOFF         = 1 << 7;
        const ALPHA_TEST                = 1 << 8;
        const AMBIENT_TEXTURE           = 1 << 9;
        const SHADOWED                  = 1 << 10;
    }
}

/// Per-compilation record of one method's requirements and register
/// assignments.
///
/// Created by the pass compiler, filled by `init_vo` and the code
/// generation calls, then read back by `activate` to upload constants into
/// the slots chosen at compile time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodVO {
    pub flags: MethodFlags,
    pub num_lights: u32,
    pub num_probes: u32,
    pub textures_index: Option<u32>,
    pub fragment_constants_index: Option<u32>,
    pub secondary_fragment_constants_index: Option<u32>,
}

impl Default for MethodVO {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

impl MethodVO {
    #[must_use]
    pub fn new(num_lights: u32, num_probes: u32) -> Self {
        Self {
            flags: MethodFlags::USE_MIPMAPPING | MethodFlags::USE_SMOOTH_TEXTURES,
            num_lights,
            num_probes,
            textures_index: None,
            fragment_constants_index: None,
            secondary_fragment_constants_index: None,
        }
    }

    /// Drops every assignment but keeps the light configuration.
    pub fn reset(&mut self) {
        *self = Self::new(self.num_lights, self.num_probes);
    }

    #[inline]
    #[must_use]
    pub fn has_lighting(&self) -> bool {
        self.num_lights > 0 || self.num_probes > 0
    }

    #[inline]
    #[must_use]
    pub fn needs(&self, flag: MethodFlags) -> bool {
        self.flags.contains(flag)
    }
}
