//! Helpers shared by the lighting methods.

use crate::errors::{AerieError, Result};
use crate::materials::method_vo::{MethodFlags, MethodVO};
use crate::materials::register_cache::{ShaderRegisterCache, ShaderRegisterElement};
use crate::materials::shader_chunk::{Opcode, Operand, SamplerOptions, ShaderChunk};
use crate::resources::texture::Texture2D;

/// Running light total for one method during one compilation.
///
/// The first contribution (light or probe) is written straight into the
/// total register. Every later one goes to a scratch temp that is added to
/// the total and released again, so a pass with N lights holds at most
/// two temps for this method.
#[derive(Debug, Clone, Default)]
pub struct LightAccumulator {
    total: Option<ShaderRegisterElement>,
    is_first: bool,
}

impl LightAccumulator {
    /// Allocates the total register when the pass has any lighting.
    pub fn begin_pass(&mut self, vo: &MethodVO, reg_cache: &mut ShaderRegisterCache) -> Result<()> {
        self.is_first = true;
        self.total = None;
        if vo.has_lighting() {
            let total = reg_cache.free_fragment_vector_temp()?;
            reg_cache.add_fragment_temp_usages(total, 1);
            self.total = Some(total);
        }
        Ok(())
    }

    pub fn total(&self) -> Result<ShaderRegisterElement> {
        self.total
            .ok_or(AerieError::MissingSharedRegister("light_total"))
    }

    #[must_use]
    pub fn is_first(&self) -> bool {
        self.is_first
    }

    /// Register the next contribution should be written to.
    pub fn contribution_target(
        &mut self,
        reg_cache: &mut ShaderRegisterCache,
    ) -> Result<ShaderRegisterElement> {
        if self.is_first {
            return self.total();
        }
        let temp = reg_cache.free_fragment_vector_temp()?;
        reg_cache.add_fragment_temp_usages(temp, 1);
        Ok(temp)
    }

    /// Folds a contribution written to `target` into the total.
    pub fn accumulate(
        &mut self,
        code: &mut ShaderChunk,
        target: ShaderRegisterElement,
        reg_cache: &mut ShaderRegisterCache,
    ) -> Result<()> {
        if !self.is_first {
            let total = self.total()?;
            code.emit(
                Opcode::Add,
                Operand::swizzled(total, "xyz"),
                &[total.into(), target.into()],
            );
            reg_cache.remove_fragment_temp_usage(target);
        }
        self.is_first = false;
        Ok(())
    }

    /// Returns the total register to the cache.
    pub fn release(&mut self, reg_cache: &mut ShaderRegisterCache) {
        if let Some(total) = self.total.take() {
            reg_cache.remove_fragment_temp_usage(total);
        }
    }

    pub fn clear(&mut self) {
        self.total = None;
        self.is_first = true;
    }
}

/// Emits a 2D sample of `texture` at the primary UV into `target`, using
/// the sampling state the pass declared in `vo`.
pub fn sample_texture_2d(
    code: &mut ShaderChunk,
    vo: &MethodVO,
    target: ShaderRegisterElement,
    sampler: ShaderRegisterElement,
    texture: &Texture2D,
    reg_cache: &ShaderRegisterCache,
) -> Result<()> {
    let uv = reg_cache.shared().uv_varying()?;
    let options = SamplerOptions {
        smooth: vo.needs(MethodFlags::USE_SMOOTH_TEXTURES),
        mipmaps: vo.needs(MethodFlags::USE_MIPMAPPING) && texture.has_mipmaps,
        repeat: vo.needs(MethodFlags::REPEAT_TEXTURES),
        format: texture.format_hint(),
        ..SamplerOptions::default()
    };
    code.emit_tex(target, uv, sampler, options);
    Ok(())
}
