use crate::errors::Result;
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

/// Lambert diffuse lighting.
///
/// Each light contributes `max(dot(L, N), 0) * light_color`; probes add a
/// weighted cube-map sample along the normal. The sum is clamped, added to
/// the ambient term held in the target register and multiplied by the
/// albedo, which is either the diffuse texture or a constant color.
#[derive(Debug, Clone)]
pub struct BasicDiffuseMethod {
    diffuse_color: u32,
    diffuse_rgb: [f32; 3],
    diffuse_alpha: f32,
    texture: Option<TextureRef>,
    alpha_threshold: f32,
    use_ambient_texture: bool,
    shadow_register: Option<ShaderRegisterElement>,
    modulate: Option<ModulateFn>,
    version: ChangeTracker,

    // Compilation state
    accumulator: LightAccumulator,
}

impl Default for BasicDiffuseMethod {
    fn default() -> Self {
        Self::new()
    }
}

impl BasicDiffuseMethod {
    #[must_use]
    pub fn new() -> Self {
        Self {
            diffuse_color: 0xffffff,
            diffuse_rgb: [1.0; 3],
            diffuse_alpha: 1.0,
            texture: None,
            alpha_threshold: 0.0,
            use_ambient_texture: false,
            shadow_register: None,
            modulate: None,
            version: ChangeTracker::new(),
            accumulator: LightAccumulator::default(),
        }
    }

    // ------------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------------

    #[must_use]
    pub fn diffuse_color(&self) -> u32 {
        self.diffuse_color
    }

    /// Packed `0xRRGGBB`.
    pub fn set_diffuse_color(&mut self, color: u32) {
        self.diffuse_color = color;
        self.diffuse_rgb = unpack_rgb(color);
    }

    #[must_use]
    pub fn diffuse_rgb(&self) -> [f32; 3] {
        self.diffuse_rgb
    }

    #[must_use]
    pub fn diffuse_alpha(&self) -> f32 {
        self.diffuse_alpha
    }

    pub fn set_diffuse_alpha(&mut self, alpha: f32) {
        self.diffuse_alpha = alpha;
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
    pub fn alpha_threshold(&self) -> f32 {
        self.alpha_threshold
    }

    /// Fragments whose albedo alpha falls below `value` are discarded.
    /// Clamped to `[0, 1]`; zero disables the test.
    pub fn set_alpha_threshold(&mut self, value: f32) {
        let value = value.clamp(0.0, 1.0);
        if value == self.alpha_threshold {
            return;
        }
        if value == 0.0 || self.alpha_threshold == 0.0 {
            self.invalidate_shader_program();
        }
        self.alpha_threshold = value;
    }

    #[must_use]
    pub fn use_ambient_texture(&self) -> bool {
        self.use_ambient_texture
    }

    /// Whether the texture also modulates the ambient term.
    pub fn set_use_ambient_texture(&mut self, value: bool) {
        if value != self.use_ambient_texture {
            self.use_ambient_texture = value;
            self.invalidate_shader_program();
        }
    }

    #[must_use]
    pub fn shadow_register(&self) -> Option<ShaderRegisterElement> {
        self.shadow_register
    }

    /// Register whose `w` holds the shadow factor. Set by a shadow method
    /// while it compiles, before this method's post-lighting code runs.
    /// Cleared again by `clean_compilation_data`.
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
        self.set_diffuse_color(other.diffuse_color);
        self.diffuse_alpha = other.diffuse_alpha;
        self.texture = other.texture.clone();
        self.alpha_threshold = other.alpha_threshold;
        self.use_ambient_texture = other.use_ambient_texture;
        self.modulate = other.modulate;
        self.invalidate_shader_program();
    }

    fn is_alpha_tested(&self) -> bool {
        self.alpha_threshold > 0.0
    }

    /// `sub`/`kil`/`add` around the cutoff so negative alpha discards.
    fn emit_alpha_test(
        code: &mut ShaderChunk,
        albedo: ShaderRegisterElement,
        cutoff: ShaderRegisterElement,
    ) {
        let alpha = Operand::swizzled(albedo, "w");
        let cutoff = Operand::swizzled(cutoff, "x");
        code.emit(Opcode::Sub, alpha, &[alpha, cutoff]);
        code.emit_kill(alpha);
        code.emit(Opcode::Add, alpha, &[alpha, cutoff]);
    }
}

impl ShadingMethod for BasicDiffuseMethod {
    fn init_vo(&self, vo: &mut MethodVO) {
        let has_texture = self.texture.is_some();
        vo.flags.set(MethodFlags::NEEDS_UV, has_texture);
        vo.flags.set(MethodFlags::NEEDS_NORMALS, vo.has_lighting());
        vo.flags.set(MethodFlags::ALPHA_TEST, self.is_alpha_tested());
        vo.flags
            .set(MethodFlags::AMBIENT_TEXTURE, has_texture && self.use_ambient_texture);
        vo.flags.set(MethodFlags::SHADOWED, self.shadow_register.is_some());
    }

    fn fragment_pre_lighting_code(
        &mut self,
        _code: &mut ShaderChunk,
        vo: &mut MethodVO,
        reg_cache: &mut ShaderRegisterCache,
    ) -> Result<()> {
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
        let commons = reg_cache.shared().commons()?;
        let t = self.accumulator.contribution_target(reg_cache)?;

        code.emit(
            Opcode::Dp3,
            Operand::swizzled(t, "x"),
            &[light_dir.into(), normal.into()],
        );
        code.emit(
            Opcode::Max,
            Operand::swizzled(t, "w"),
            &[Operand::swizzled(t, "x"), Operand::swizzled(commons, "y")],
        );
        if vo.needs(MethodFlags::USE_LIGHT_FALLOFF) {
            code.emit(
                Opcode::Mul,
                Operand::swizzled(t, "w"),
                &[Operand::swizzled(t, "w"), Operand::swizzled(light_dir, "w")],
            );
        }
        if let Some(modulate) = self.modulate {
            modulate(code, vo, t, reg_cache)?;
        }
        code.emit(
            Opcode::Mul,
            t,
            &[Operand::swizzled(t, "w"), light_color.into()],
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
        let normal = reg_cache.shared().normal_fragment()?;
        let t = self.accumulator.contribution_target(reg_cache)?;

        code.emit_tex(
            t,
            normal,
            cube_map,
            SamplerOptions {
                dimension: SamplerDimension::Cube,
                ..SamplerOptions::default()
            },
        );
        code.emit(
            Opcode::Mul,
            Operand::swizzled(t, "xyz"),
            &[Operand::swizzled(t, "xyz"), weight.into()],
        );

        self.accumulator.accumulate(code, t, reg_cache)
    }

    fn fragment_post_lighting_code(
        &mut self,
        code: &mut ShaderChunk,
        vo: &mut MethodVO,
        reg_cache: &mut ShaderRegisterCache,
        target: ShaderRegisterElement,
    ) -> Result<()> {
        let lit = vo.has_lighting();

        let albedo = if lit {
            let total = self.accumulator.total()?;
            if let Some(shadow) = self.shadow_register {
                code.emit(
                    Opcode::Mul,
                    Operand::swizzled(total, "xyz"),
                    &[total.into(), Operand::swizzled(shadow, "w")],
                );
            }
            let albedo = reg_cache.free_fragment_vector_temp()?;
            reg_cache.add_fragment_temp_usages(albedo, 1);
            albedo
        } else {
            target
        };

        if let Some(texture) = &self.texture {
            let sampler = reg_cache.free_texture_reg()?;
            vo.textures_index = Some(sampler.index());
            sample_texture_2d(code, vo, albedo, sampler, texture, reg_cache)?;
            if self.is_alpha_tested() {
                let cutoff = reg_cache.free_fragment_constant()?;
                vo.fragment_constants_index = Some(cutoff.index());
                Self::emit_alpha_test(code, albedo, cutoff);
            }
        } else {
            let color = reg_cache.free_fragment_constant()?;
            vo.fragment_constants_index = Some(color.index());
            code.emit(Opcode::Mov, albedo, &[color.into()]);
            if self.is_alpha_tested() {
                let cutoff = reg_cache.free_fragment_constant()?;
                vo.secondary_fragment_constants_index = Some(cutoff.index());
                Self::emit_alpha_test(code, albedo, cutoff);
            }
        }

        if !lit {
            return Ok(());
        }

        let total = self.accumulator.total()?;
        let xyz = |reg| Operand::swizzled(reg, "xyz");
        code.emit(Opcode::Sat, total, &[total.into()]);

        if self.texture.is_some() && self.use_ambient_texture {
            code.emit(Opcode::Mul, xyz(albedo), &[albedo.into(), total.into()]);
            code.emit(Opcode::Mul, xyz(total), &[target.into(), total.into()]);
            code.emit(Opcode::Sub, xyz(target), &[target.into(), total.into()]);
            code.emit(Opcode::Add, xyz(target), &[albedo.into(), target.into()]);
        } else {
            code.emit(Opcode::Add, xyz(target), &[total.into(), target.into()]);
            code.emit(Opcode::Mul, xyz(target), &[albedo.into(), target.into()]);
            code.emit(
                Opcode::Mov,
                Operand::swizzled(target, "w"),
                &[Operand::swizzled(albedo, "w")],
            );
        }

        self.accumulator.release(reg_cache);
        reg_cache.remove_fragment_temp_usage(albedo);
        Ok(())
    }

    fn activate(&self, vo: &MethodVO, context: &mut dyn Context) {
        let threshold = [self.alpha_threshold, 0.0, 0.0, 0.0];
        if let Some(texture) = &self.texture {
            if let Some(index) = vo.textures_index {
                context.set_texture_at(index, Some(texture));
            }
            if self.is_alpha_tested()
                && let Some(index) = vo.fragment_constants_index
            {
                context.set_program_constants(ProgramType::Fragment, index, &threshold);
            }
        } else {
            if let Some(index) = vo.fragment_constants_index {
                let [r, g, b] = self.diffuse_rgb;
                context.set_program_constants(
                    ProgramType::Fragment,
                    index,
                    &[r, g, b, self.diffuse_alpha],
                );
            }
            if self.is_alpha_tested()
                && let Some(index) = vo.secondary_fragment_constants_index
            {
                context.set_program_constants(ProgramType::Fragment, index, &threshold);
            }
        }
    }

    fn clean_compilation_data(&mut self) {
        self.accumulator.clear();
        self.shadow_register = None;
    }

    fn shader_version(&self) -> u64 {
        self.version.version()
    }
}
