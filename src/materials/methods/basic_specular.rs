use crate::errors::{AerieError, Result};
use crate::materials::method_vo::{MethodFlags, MethodVO};
use crate::materials::methods::lighting::{LightAccumulator, sample_texture_2d};
use crate::materials::methods::{ModulateFn, ShadingMethod};
use crate::materials::register_cache::{ShaderRegisterCache, ShaderRegisterElement};
use crate::materials::shader_chunk::{
    Opcode, Operand, SamplerDimension, SamplerOptions, ShaderChunk,
};
use crate::renderer::context::{Context, ProgramType};
use crate::resources::texture::TextureRef;
use crate::resources::version_tracker::ChangeTracker;
use crate::utils::color::unpack_rgb;

/// Blinn-Phong specular highlights.
///
/// Per light: `pow(sat(dot(N, normalize(L + V))), gloss) * light_color`.
/// The optional specular map scales strength by its red channel and gloss
/// by its green channel. The total is added on top of whatever the
/// target register already holds.
#[derive(Debug, Clone)]
pub struct BasicSpecularMethod {
    specular_color: u32,
    specular_rgb: [f32; 3],
    specular: f32,
    gloss: f32,
    texture: Option<TextureRef>,
    shadow_register: Option<ShaderRegisterElement>,
    modulate: Option<ModulateFn>,
    version: ChangeTracker,

    // Compilation state
    accumulator: LightAccumulator,
    specular_data: Option<ShaderRegisterElement>,
    texture_sample: Option<ShaderRegisterElement>,
}

impl Default for BasicSpecularMethod {
    fn default() -> Self {
        Self::new()
    }
}

impl BasicSpecularMethod {
    #[must_use]
    pub fn new() -> Self {
        Self {
            specular_color: 0xffffff,
            specular_rgb: [1.0; 3],
            specular: 1.0,
            gloss: 50.0,
            texture: None,
            shadow_register: None,
            modulate: None,
            version: ChangeTracker::new(),
            accumulator: LightAccumulator::default(),
            specular_data: None,
            texture_sample: None,
        }
    }

    #[must_use]
    pub fn specular_color(&self) -> u32 {
        self.specular_color
    }

    pub fn set_specular_color(&mut self, color: u32) {
        if color == self.specular_color {
            return;
        }
        if color == 0 || self.specular_color == 0 {
            self.invalidate_shader_program();
        }
        self.specular_color = color;
        self.specular_rgb = unpack_rgb(color);
    }

    #[must_use]
    pub fn specular(&self) -> f32 {
        self.specular
    }

    /// Highlight strength multiplier.
    pub fn set_specular(&mut self, value: f32) {
        self.specular = value;
    }

    #[must_use]
    pub fn gloss(&self) -> f32 {
        self.gloss
    }

    /// Specular exponent; higher is sharper.
    pub fn set_gloss(&mut self, value: f32) {
        self.gloss = value;
    }

    #[must_use]
    pub fn texture(&self) -> Option<&TextureRef> {
        self.texture.as_ref()
    }

    pub fn set_texture(&mut self, texture: Option<TextureRef>) {
        let invalidates = match (&self.texture, &texture) {
            (None, None) => false,
            (Some(old), Some(new)) => old.sampling_differs(new),
            _ => true,
        };
        if invalidates {
            self.invalidate_shader_program();
        }
        self.texture = texture;
    }

    #[must_use]
    pub fn shadow_register(&self) -> Option<ShaderRegisterElement> {
        self.shadow_register
    }

    pub fn set_shadow_register(&mut self, register: Option<ShaderRegisterElement>) {
        self.shadow_register = register;
    }

    pub fn set_modulate(&mut self, modulate: Option<ModulateFn>) {
        self.modulate = modulate;
        self.invalidate_shader_program();
    }

    pub fn invalidate_shader_program(&mut self) {
        self.version.changed();
    }

    pub fn copy_from(&mut self, other: &Self) {
        self.specular_color = other.specular_color;
        self.specular_rgb = other.specular_rgb;
        self.specular = other.specular;
        self.gloss = other.gloss;
        self.texture = other.texture.clone();
        self.modulate = other.modulate;
        self.invalidate_shader_program();
    }

    fn specular_data(&self) -> Result<ShaderRegisterElement> {
        self.specular_data
            .ok_or(AerieError::MissingSharedRegister("specular_data"))
    }
}

impl ShadingMethod for BasicSpecularMethod {
    fn init_vo(&self, vo: &mut MethodVO) {
        let lit = vo.num_lights > 0;
        vo.flags.set(MethodFlags::NEEDS_UV, self.texture.is_some());
        vo.flags.set(MethodFlags::NEEDS_NORMALS, lit);
        vo.flags.set(MethodFlags::NEEDS_VIEW, vo.has_lighting());
        vo.flags.set(MethodFlags::SHADOWED, self.shadow_register.is_some());
    }

    fn fragment_pre_lighting_code(
        &mut self,
        code: &mut ShaderChunk,
        vo: &mut MethodVO,
        reg_cache: &mut ShaderRegisterCache,
    ) -> Result<()> {
        self.specular_data = None;
        self.texture_sample = None;

        if vo.has_lighting() {
            let data = reg_cache.free_fragment_constant()?;
            vo.secondary_fragment_constants_index = Some(data.index());
            self.specular_data = Some(data);

            if let Some(texture) = &self.texture {
                let sample = reg_cache.free_fragment_vector_temp()?;
                reg_cache.add_fragment_temp_usages(sample, 1);
                let sampler = reg_cache.free_texture_reg()?;
                vo.textures_index = Some(sampler.index());
                sample_texture_2d(code, vo, sample, sampler, texture, reg_cache)?;
                self.texture_sample = Some(sample);
            }
        }

        self.accumulator.begin_pass(vo, reg_cache)
    }

    fn fragment_code_per_light(
        &mut self,
        code: &mut ShaderChunk,
        vo: &MethodVO,
        light_dir: ShaderRegisterElement,
        light_color: ShaderRegisterElement,
        reg_cache: &mut ShaderRegisterCache,
    ) -> Result<()> {
        let normal = reg_cache.shared().normal_fragment()?;
        let view_dir = reg_cache.shared().view_dir_fragment()?;
        let data = self.specular_data()?;
        let t = self.accumulator.contribution_target(reg_cache)?;
        let t_w = Operand::swizzled(t, "w");

        // Half vector
        code.emit(Opcode::Add, t, &[light_dir.into(), view_dir.into()]);
        code.emit(Opcode::Nrm, Operand::swizzled(t, "xyz"), &[t.into()]);
        code.emit(Opcode::Dp3, t_w, &[normal.into(), t.into()]);
        code.emit(Opcode::Sat, t_w, &[t_w]);

        if let Some(sample) = self.texture_sample {
            let gloss = Operand::swizzled(sample, "w");
            code.emit(
                Opcode::Mul,
                gloss,
                &[Operand::swizzled(sample, "y"), Operand::swizzled(data, "w")],
            );
            code.emit(Opcode::Pow, t_w, &[t_w, gloss]);
        } else {
            code.emit(Opcode::Pow, t_w, &[t_w, Operand::swizzled(data, "w")]);
        }

        if vo.needs(MethodFlags::USE_LIGHT_FALLOFF) {
            code.emit(Opcode::Mul, t_w, &[t_w, Operand::swizzled(light_dir, "w")]);
        }
        if let Some(modulate) = self.modulate {
            modulate(code, vo, t, reg_cache)?;
        }
        code.emit(
            Opcode::Mul,
            Operand::swizzled(t, "xyz"),
            &[light_color.into(), t_w],
        );

        self.accumulator.accumulate(code, t, reg_cache)
    }

    fn fragment_code_per_probe(
        &mut self,
        code: &mut ShaderChunk,
        _vo: &MethodVO,
        cube_map: ShaderRegisterElement,
        weight: ShaderRegisterElement,
        reg_cache: &mut ShaderRegisterCache,
    ) -> Result<()> {
        let view_dir = reg_cache.shared().view_dir_fragment()?;
        let t = self.accumulator.contribution_target(reg_cache)?;
        let t_w = Operand::swizzled(t, "w");

        code.emit_tex(
            t,
            view_dir,
            cube_map,
            SamplerOptions {
                dimension: SamplerDimension::Cube,
                ..SamplerOptions::default()
            },
        );
        code.emit(Opcode::Mul, t_w, &[t_w, weight.into()]);
        code.emit(Opcode::Mul, Operand::swizzled(t, "xyz"), &[t.into(), t_w]);

        self.accumulator.accumulate(code, t, reg_cache)
    }

    fn fragment_post_lighting_code(
        &mut self,
        code: &mut ShaderChunk,
        vo: &mut MethodVO,
        reg_cache: &mut ShaderRegisterCache,
        target: ShaderRegisterElement,
    ) -> Result<()> {
        if !vo.has_lighting() {
            return Ok(());
        }
        let total = self.accumulator.total()?;
        let total_xyz = Operand::swizzled(total, "xyz");

        if let Some(shadow) = self.shadow_register {
            code.emit(
                Opcode::Mul,
                total_xyz,
                &[total.into(), Operand::swizzled(shadow, "w")],
            );
        }
        if let Some(sample) = self.texture_sample.take() {
            code.emit(
                Opcode::Mul,
                total_xyz,
                &[total.into(), Operand::swizzled(sample, "x")],
            );
            reg_cache.remove_fragment_temp_usage(sample);
        }

        let data = self.specular_data()?;
        code.emit(Opcode::Mul, total_xyz, &[total.into(), data.into()]);
        code.emit(
            Opcode::Add,
            Operand::swizzled(target, "xyz"),
            &[target.into(), total.into()],
        );

        self.accumulator.release(reg_cache);
        Ok(())
    }

    fn activate(&self, vo: &MethodVO, context: &mut dyn Context) {
        if let (Some(texture), Some(index)) = (&self.texture, vo.textures_index) {
            context.set_texture_at(index, Some(texture));
        }
        if let Some(index) = vo.secondary_fragment_constants_index {
            let [r, g, b] = self.specular_rgb.map(|c| c * self.specular);
            context.set_program_constants(ProgramType::Fragment, index, &[r, g, b, self.gloss]);
        }
    }

    fn clean_compilation_data(&mut self) {
        self.accumulator.clear();
        self.shadow_register = None;
        self.specular_data = None;
        self.texture_sample = None;
    }

    fn shader_version(&self) -> u64 {
        self.version.version()
    }
}
