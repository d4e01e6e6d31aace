//! Shading Methods
//!
//! A material pass composes its fragment program from a chain of lighting
//! methods. The pass compiler calls every method in a fixed order:
//!
//! 1. [`init_vo`](ShadingMethod::init_vo): declare requirements.
//! 2. [`fragment_pre_lighting_code`](ShadingMethod::fragment_pre_lighting_code):
//!    allocate accumulators.
//! 3. [`fragment_code_per_light`](ShadingMethod::fragment_code_per_light) for
//!    each dynamic light, then
//!    [`fragment_code_per_probe`](ShadingMethod::fragment_code_per_probe) for
//!    each light probe.
//! 4. [`fragment_post_lighting_code`](ShadingMethod::fragment_post_lighting_code):
//!    composite into the pass's target register.
//! 5. [`clean_compilation_data`](ShadingMethod::clean_compilation_data).
//!
//! At draw time, [`activate`](ShadingMethod::activate) uploads textures and
//! constants into the slots recorded in the method's [`MethodVO`].
//!
//! Calling these out of order is a caller error; the debug build asserts
//! on the worst cases.

pub mod basic_diffuse;
pub mod basic_specular;
pub mod lighting;

pub use basic_diffuse::BasicDiffuseMethod;
pub use basic_specular::BasicSpecularMethod;
pub use lighting::LightAccumulator;

use crate::errors::{AerieError, Result};
use crate::materials::method_vo::MethodVO;
use crate::materials::register_cache::{ShaderRegisterCache, ShaderRegisterElement};
use crate::materials::shader_chunk::ShaderChunk;
use crate::renderer::context::Context;

/// Hook that scales a single light contribution stored in `target`.
///
/// Wrapper methods (cel shading, sub-surface scattering, ...) install one
/// to alter the light term before it is multiplied by the light color.
pub type ModulateFn = fn(
    code: &mut ShaderChunk,
    vo: &MethodVO,
    target: ShaderRegisterElement,
    reg_cache: &mut ShaderRegisterCache,
) -> Result<()>;

pub trait ShadingMethod {
    fn init_vo(&self, vo: &mut MethodVO);

    fn fragment_pre_lighting_code(
        &mut self,
        code: &mut ShaderChunk,
        vo: &mut MethodVO,
        reg_cache: &mut ShaderRegisterCache,
    ) -> Result<()>;

    fn fragment_code_per_light(
        &mut self,
        code: &mut ShaderChunk,
        vo: &MethodVO,
        light_dir: ShaderRegisterElement,
        light_color: ShaderRegisterElement,
        reg_cache: &mut ShaderRegisterCache,
    ) -> Result<()>;

    fn fragment_code_per_probe(
        &mut self,
        code: &mut ShaderChunk,
        vo: &MethodVO,
        cube_map: ShaderRegisterElement,
        weight: ShaderRegisterElement,
        reg_cache: &mut ShaderRegisterCache,
    ) -> Result<()>;

    fn fragment_post_lighting_code(
        &mut self,
        code: &mut ShaderChunk,
        vo: &mut MethodVO,
        reg_cache: &mut ShaderRegisterCache,
        target: ShaderRegisterElement,
    ) -> Result<()>;

    fn activate(&self, vo: &MethodVO, context: &mut dyn Context);

    /// Drops state that only lives for one compilation.
    fn clean_compilation_data(&mut self);

    /// Bumped whenever a setter changes the generated code.
    fn shader_version(&self) -> u64;
}

/// The lighting methods a material pass can chain.
#[derive(Debug, Clone)]
pub enum LightingMethod {
    BasicDiffuse(BasicDiffuseMethod),
    BasicSpecular(BasicSpecularMethod),
}

impl LightingMethod {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::BasicDiffuse(_) => "BasicDiffuse",
            Self::BasicSpecular(_) => "BasicSpecular",
        }
    }

    /// Copies configuration (not compile state) from another method of the
    /// same variant.
    pub fn copy_from(&mut self, other: &Self) -> Result<()> {
        match (self, other) {
            (Self::BasicDiffuse(dst), Self::BasicDiffuse(src)) => {
                dst.copy_from(src);
                Ok(())
            }
            (Self::BasicSpecular(dst), Self::BasicSpecular(src)) => {
                dst.copy_from(src);
                Ok(())
            }
            (dst, src) => Err(AerieError::IncompatibleMethod {
                from: src.name(),
                into: dst.name(),
            }),
        }
    }

    fn inner(&self) -> &dyn ShadingMethod {
        match self {
            Self::BasicDiffuse(method) => method,
            Self::BasicSpecular(method) => method,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn ShadingMethod {
        match self {
            Self::BasicDiffuse(method) => method,
            Self::BasicSpecular(method) => method,
        }
    }
}

impl From<BasicDiffuseMethod> for LightingMethod {
    fn from(method: BasicDiffuseMethod) -> Self {
        Self::BasicDiffuse(method)
    }
}

impl From<BasicSpecularMethod> for LightingMethod {
    fn from(method: BasicSpecularMethod) -> Self {
        Self::BasicSpecular(method)
    }
}

impl ShadingMethod for LightingMethod {
    fn init_vo(&self, vo: &mut MethodVO) {
        self.inner().init_vo(vo);
    }

    fn fragment_pre_lighting_code(
        &mut self,
        code: &mut ShaderChunk,
        vo: &mut MethodVO,
        reg_cache: &mut ShaderRegisterCache,
    ) -> Result<()> {
        self.inner_mut().fragment_pre_lighting_code(code, vo, reg_cache)
    }

    fn fragment_code_per_light(
        &mut self,
        code: &mut ShaderChunk,
        vo: &MethodVO,
        light_dir: ShaderRegisterElement,
        light_color: ShaderRegisterElement,
        reg_cache: &mut ShaderRegisterCache,
    ) -> Result<()> {
        self.inner_mut()
            .fragment_code_per_light(code, vo, light_dir, light_color, reg_cache)
    }

    fn fragment_code_per_probe(
        &mut self,
        code: &mut ShaderChunk,
        vo: &MethodVO,
        cube_map: ShaderRegisterElement,
        weight: ShaderRegisterElement,
        reg_cache: &mut ShaderRegisterCache,
    ) -> Result<()> {
        self.inner_mut()
            .fragment_code_per_probe(code, vo, cube_map, weight, reg_cache)
    }

    fn fragment_post_lighting_code(
        &mut self,
        code: &mut ShaderChunk,
        vo: &mut MethodVO,
        reg_cache: &mut ShaderRegisterCache,
        target: ShaderRegisterElement,
    ) -> Result<()> {
        self.inner_mut()
            .fragment_post_lighting_code(code, vo, reg_cache, target)
    }

    fn activate(&self, vo: &MethodVO, context: &mut dyn Context) {
        self.inner().activate(vo, context);
    }

    fn clean_compilation_data(&mut self) {
        self.inner_mut().clean_compilation_data();
    }

    fn shader_version(&self) -> u64 {
        self.inner().shader_version()
    }
}
