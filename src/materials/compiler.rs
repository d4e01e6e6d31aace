//! Material Pass Compiler
//!
//! Drives the shading-method protocol for one material pass and caches the
//! result per light configuration:
//!
//! ```text
//! init_vo (all methods)
//!   → shared registers (commons, ambient, UV, normal, view, position)
//!   → target = ambient
//!   → pre-lighting (all methods)
//!   → per directional light, per point light, per probe (all methods)
//!   → post-lighting (all methods) → oc = target
//!   → clean_compilation_data (all methods)
//! ```
//!
//! A cached program is reused until any method's shader version moves.

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::errors::{AerieError, Result};
use crate::materials::method_vo::{MethodFlags, MethodVO};
use crate::materials::methods::{LightingMethod, ShadingMethod};
use crate::materials::register_cache::{
    Component, RegisterLimits, ShaderRegisterCache, ShaderRegisterElement,
};
use crate::materials::shader_chunk::{Opcode, Operand, ShaderChunk};
use crate::renderer::context::{Context, ProgramType};
use crate::renderer::entity_collector::EntityCollector;
use crate::scene::light::LightKind;
use crate::utils::color::unpack_rgb;

pub type SharedMaterialPass = Rc<RefCell<MaterialPass>>;

/// Light configuration a program is compiled for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PassKey {
    pub num_directional: u32,
    pub num_point: u32,
    pub num_probes: u32,
}

impl PassKey {
    #[must_use]
    pub fn from_collector(collector: &EntityCollector) -> Self {
        Self {
            num_directional: collector.directional_lights().len() as u32,
            num_point: collector.point_lights().len() as u32,
            num_probes: collector.light_probes().len() as u32,
        }
    }

    #[must_use]
    pub fn num_lights(&self) -> u32 {
        self.num_directional + self.num_point
    }
}

/// A compiled fragment program and the register layout `activate` needs.
#[derive(Debug, Clone)]
pub struct CompiledPass {
    pub key: PassKey,
    pub fragment_code: ShaderChunk,
    pub method_vos: Vec<MethodVO>,
    pub commons: ShaderRegisterElement,
    pub ambient: ShaderRegisterElement,
    /// `(direction or position, color)` per light, directional first.
    pub light_registers: Vec<(ShaderRegisterElement, ShaderRegisterElement)>,
    pub probe_samplers: Vec<ShaderRegisterElement>,
    /// Whole registers holding four packed probe weights each.
    pub probe_weight_registers: Vec<ShaderRegisterElement>,
    pub num_fragment_constants: u32,
    pub num_textures: u32,
    pub num_varyings: u32,
    method_versions: SmallVec<[u64; 4]>,
}

/// Pass-wide sampling and lighting switches applied to every MethodVO.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassSettings {
    pub light_falloff: bool,
    pub mipmap: bool,
    pub smooth: bool,
    pub repeat: bool,
}

impl Default for PassSettings {
    fn default() -> Self {
        Self {
            light_falloff: true,
            mipmap: true,
            smooth: true,
            repeat: false,
        }
    }
}

#[derive(Debug)]
pub struct MaterialPass {
    methods: Vec<LightingMethod>,
    ambient_color: u32,
    ambient: f32,
    settings: PassSettings,
    limits: RegisterLimits,
    programs: FxHashMap<PassKey, CompiledPass>,
}

impl Default for MaterialPass {
    fn default() -> Self {
        Self::new()
    }
}

impl MaterialPass {
    #[must_use]
    pub fn new() -> Self {
        Self {
            methods: Vec::new(),
            ambient_color: 0xffffff,
            ambient: 0.0,
            settings: PassSettings::default(),
            limits: RegisterLimits::default(),
            programs: FxHashMap::default(),
        }
    }

    #[must_use]
    pub fn with_method(mut self, method: impl Into<LightingMethod>) -> Self {
        self.add_method(method);
        self
    }

    #[must_use]
    pub fn into_shared(self) -> SharedMaterialPass {
        Rc::new(RefCell::new(self))
    }

    pub fn add_method(&mut self, method: impl Into<LightingMethod>) {
        self.methods.push(method.into());
        self.programs.clear();
    }

    #[must_use]
    pub fn methods(&self) -> &[LightingMethod] {
        &self.methods
    }

    /// Setters on the returned method bump its shader version, which the
    /// cache picks up on the next compile.
    pub fn method_mut(&mut self, index: usize) -> Option<&mut LightingMethod> {
        self.methods.get_mut(index)
    }

    pub fn set_ambient_color(&mut self, color: u32) {
        self.ambient_color = color;
    }

    pub fn set_ambient(&mut self, strength: f32) {
        self.ambient = strength;
    }

    #[must_use]
    pub fn settings(&self) -> PassSettings {
        self.settings
    }

    pub fn set_settings(&mut self, settings: PassSettings) {
        if settings != self.settings {
            self.settings = settings;
            self.programs.clear();
        }
    }

    pub fn set_register_limits(&mut self, limits: RegisterLimits) {
        if limits != self.limits {
            self.limits = limits;
            self.programs.clear();
        }
    }

    fn method_versions(&self) -> SmallVec<[u64; 4]> {
        self.methods.iter().map(ShadingMethod::shader_version).collect()
    }

    #[must_use]
    pub fn needs_recompile(&self, key: PassKey) -> bool {
        self.programs
            .get(&key)
            .is_none_or(|pass| pass.method_versions != self.method_versions())
    }

    #[must_use]
    pub fn program(&self, key: PassKey) -> Option<&CompiledPass> {
        self.programs.get(&key)
    }

    /// Returns the cached program for `key`, compiling it first if the
    /// method chain changed since.
    pub fn compile(&mut self, key: PassKey) -> Result<&CompiledPass> {
        if self.needs_recompile(key) {
            log::debug!(
                "MaterialPass: compiling program for {} lights, {} probes",
                key.num_lights(),
                key.num_probes
            );
            let pass = compile_pass(&mut self.methods, key, self.settings, self.limits)?;
            self.programs.insert(key, pass);
        }
        Ok(&self.programs[&key])
    }

    /// Binds the program for the collector's light setup and uploads
    /// every constant and texture it reads.
    pub fn activate(
        &mut self,
        collector: &EntityCollector,
        context: &mut dyn Context,
    ) -> Result<()> {
        let key = PassKey::from_collector(collector);
        self.compile(key)?;
        let Some(pass) = self.programs.get(&key) else {
            return Ok(());
        };

        context.set_program(&pass.fragment_code);
        upload(context, pass.commons, [0.5, 0.0, 0.0, 1.0]);

        let [r, g, b] = unpack_rgb(self.ambient_color).map(|c| c * self.ambient);
        upload(context, pass.ambient, [r, g, b, 1.0]);

        let lights = collector
            .directional_lights()
            .iter()
            .chain(collector.point_lights());
        for (light, &(dir_reg, color_reg)) in lights.zip(&pass.light_registers) {
            let radiance = light.radiance();
            match &light.kind {
                LightKind::Directional(directional) => {
                    // Shaders expect the direction towards the light.
                    let to_light = -directional.direction;
                    upload(context, dir_reg, to_light.extend(1.0).to_array());
                    upload(context, color_reg, radiance.extend(1.0).to_array());
                }
                LightKind::Point(point) => {
                    let radius_sq = point.radius * point.radius;
                    let range = point.fall_off * point.fall_off - radius_sq;
                    let fall_off_factor = if range > f32::EPSILON { 1.0 / range } else { 0.0 };
                    upload(context, dir_reg, point.position.extend(radius_sq).to_array());
                    upload(context, color_reg, radiance.extend(fall_off_factor).to_array());
                }
                LightKind::Probe(_) => {}
            }
        }

        let mut weights = Vec::with_capacity(pass.probe_weight_registers.len() * 4);
        for (light, sampler) in collector.light_probes().iter().zip(&pass.probe_samplers) {
            if let LightKind::Probe(probe) = &light.kind {
                context.set_texture_at(sampler.index(), Some(&probe.cube_map));
                weights.push(probe.weight);
            }
        }
        weights.resize(pass.probe_weight_registers.len() * 4, 0.0);
        for (register, chunk) in pass.probe_weight_registers.iter().zip(weights.chunks(4)) {
            context.set_program_constants(ProgramType::Fragment, register.index(), chunk);
        }

        for (method, vo) in self.methods.iter().zip(&pass.method_vos) {
            method.activate(vo, context);
        }
        Ok(())
    }
}

fn upload(context: &mut dyn Context, register: ShaderRegisterElement, data: [f32; 4]) {
    context.set_program_constants(ProgramType::Fragment, register.index(), &data);
}

fn normalized_varying(
    code: &mut ShaderChunk,
    reg_cache: &mut ShaderRegisterCache,
) -> Result<ShaderRegisterElement> {
    let varying = reg_cache.free_varying()?;
    let temp = reg_cache.free_fragment_vector_temp()?;
    reg_cache.add_fragment_temp_usages(temp, 1);
    code.emit(Opcode::Nrm, Operand::swizzled(temp, "xyz"), &[varying.into()]);
    Ok(temp)
}

fn compile_pass(
    methods: &mut [LightingMethod],
    key: PassKey,
    settings: PassSettings,
    limits: RegisterLimits,
) -> Result<CompiledPass> {
    let mut reg_cache = ShaderRegisterCache::new(limits);
    let mut code = ShaderChunk::new();

    let mut method_vos: Vec<MethodVO> = methods
        .iter()
        .map(|method| {
            let mut vo = MethodVO::new(key.num_lights(), key.num_probes);
            vo.flags.set(MethodFlags::USE_MIPMAPPING, settings.mipmap);
            vo.flags.set(MethodFlags::USE_SMOOTH_TEXTURES, settings.smooth);
            vo.flags.set(MethodFlags::REPEAT_TEXTURES, settings.repeat);
            vo.flags.set(
                MethodFlags::USE_LIGHT_FALLOFF,
                settings.light_falloff && key.num_point > 0,
            );
            method.init_vo(&mut vo);
            vo
        })
        .collect();
    let needs = method_vos
        .iter()
        .fold(MethodFlags::empty(), |acc, vo| acc | vo.flags);

    // Shared registers
    let commons = reg_cache.free_fragment_constant()?;
    let ambient = reg_cache.free_fragment_constant()?;
    reg_cache.shared_mut().commons = Some(commons);

    if needs.contains(MethodFlags::NEEDS_UV) {
        let uv = reg_cache.free_varying()?;
        reg_cache.shared_mut().uv_varying = Some(uv);
    }
    if needs.contains(MethodFlags::NEEDS_NORMALS) {
        let normal = normalized_varying(&mut code, &mut reg_cache)?;
        reg_cache.shared_mut().normal_fragment = Some(normal);
    }
    if needs.contains(MethodFlags::NEEDS_VIEW) {
        let view_dir = normalized_varying(&mut code, &mut reg_cache)?;
        reg_cache.shared_mut().view_dir_fragment = Some(view_dir);
    }
    if key.num_point > 0 || needs.contains(MethodFlags::NEEDS_GLOBAL_FRAGMENT_POS) {
        let position = reg_cache.free_varying()?;
        reg_cache.shared_mut().global_position_varying = Some(position);
    }

    let target = reg_cache.free_fragment_vector_temp()?;
    reg_cache.add_fragment_temp_usages(target, 1);
    code.emit(Opcode::Mov, target, &[ambient.into()]);

    for (method, vo) in methods.iter_mut().zip(method_vos.iter_mut()) {
        method.fragment_pre_lighting_code(&mut code, vo, &mut reg_cache)?;
    }

    // Lights
    let mut light_registers = Vec::with_capacity(key.num_lights() as usize);
    for _ in 0..key.num_directional {
        let direction = reg_cache.free_fragment_constant()?;
        let color = reg_cache.free_fragment_constant()?;
        for (method, vo) in methods.iter_mut().zip(&method_vos) {
            method.fragment_code_per_light(&mut code, vo, direction, color, &mut reg_cache)?;
        }
        light_registers.push((direction, color));
    }

    for _ in 0..key.num_point {
        let position = reg_cache.free_fragment_constant()?;
        let color = reg_cache.free_fragment_constant()?;
        let global_position = reg_cache
            .shared()
            .global_position_varying
            .ok_or(AerieError::MissingSharedRegister("global_position_varying"))?;

        let direction = reg_cache.free_fragment_vector_temp()?;
        reg_cache.add_fragment_temp_usages(direction, 1);
        let dir_w = Operand::swizzled(direction, "w");
        code.emit(Opcode::Sub, direction, &[position.into(), global_position.into()]);
        if settings.light_falloff {
            code.emit(Opcode::Dp3, dir_w, &[direction.into(), direction.into()]);
            code.emit(Opcode::Sub, dir_w, &[dir_w, Operand::swizzled(position, "w")]);
            code.emit(Opcode::Mul, dir_w, &[dir_w, Operand::swizzled(color, "w")]);
            code.emit(Opcode::Sat, dir_w, &[dir_w]);
            code.emit(Opcode::Sub, dir_w, &[Operand::swizzled(commons, "w"), dir_w]);
        }
        code.emit(Opcode::Nrm, Operand::swizzled(direction, "xyz"), &[direction.into()]);

        for (method, vo) in methods.iter_mut().zip(&method_vos) {
            method.fragment_code_per_light(&mut code, vo, direction, color, &mut reg_cache)?;
        }
        reg_cache.remove_fragment_temp_usage(direction);
        light_registers.push((position, color));
    }

    // Probes
    let mut probe_samplers = Vec::with_capacity(key.num_probes as usize);
    let mut probe_weight_registers: Vec<ShaderRegisterElement> = Vec::new();
    for i in 0..key.num_probes {
        if i % 4 == 0 {
            probe_weight_registers.push(reg_cache.free_fragment_constant()?);
        }
        let sampler = reg_cache.free_texture_reg()?;
        let Some(&weights) = probe_weight_registers.last() else {
            continue;
        };
        let weight = weights.with_component(Component::from_index(i));
        for (method, vo) in methods.iter_mut().zip(&method_vos) {
            method.fragment_code_per_probe(&mut code, vo, sampler, weight, &mut reg_cache)?;
        }
        probe_samplers.push(sampler);
    }

    for (method, vo) in methods.iter_mut().zip(method_vos.iter_mut()) {
        method.fragment_post_lighting_code(&mut code, vo, &mut reg_cache, target)?;
    }
    code.emit(Opcode::Mov, reg_cache.fragment_output(), &[target.into()]);

    reg_cache.remove_fragment_temp_usage(target);
    let shared = *reg_cache.shared();
    for temp in [shared.normal_fragment, shared.view_dir_fragment].into_iter().flatten() {
        reg_cache.remove_fragment_temp_usage(temp);
    }
    debug_assert_eq!(reg_cache.num_fragment_temps_in_use(), 0);

    for method in methods.iter_mut() {
        method.clean_compilation_data();
    }

    log::trace!("MaterialPass: compiled program\n{code}");

    Ok(CompiledPass {
        key,
        fragment_code: code,
        method_vos,
        commons,
        ambient,
        light_registers,
        probe_samplers,
        probe_weight_registers,
        num_fragment_constants: reg_cache.num_used_fragment_constants(),
        num_textures: reg_cache.num_used_textures(),
        num_varyings: reg_cache.num_used_varyings(),
        method_versions: methods.iter().map(ShadingMethod::shader_version).collect(),
    })
}
