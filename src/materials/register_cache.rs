//! Shader Register Allocation
//!
//! [`ShaderRegisterCache`] hands out register identifiers while one material
//! pass is being compiled. Each register bank is a [`RegisterPool`] with a
//! usage count per register:
//!
//! - **Persistent** banks (constants, varyings, samplers) mark a
//!   register used as soon as it is requested; it stays reserved for the
//!   rest of the pass.
//! - The **temporary** bank (fragment temps) only hands out a free
//!   register. The caller claims it with `add_fragment_temp_usages` and gives
//!   it back with `remove_fragment_temp_usage`, so the same temp can be recycled
//!   between lights.
//!
//! A cache lives for exactly one compilation pass and is never shared.

use std::fmt;

use smallvec::SmallVec;

use crate::errors::{AerieError, Result};

/// Register bank identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegisterType {
    Varying,
    FragmentConstant,
    FragmentTemp,
    Texture,
    FragmentOutput,
}

impl RegisterType {
    #[must_use]
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Varying => "v",
            Self::FragmentConstant => "fc",
            Self::FragmentTemp => "ft",
            Self::Texture => "fs",
            Self::FragmentOutput => "oc",
        }
    }
}

/// Single vector component of a register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Component {
    X,
    Y,
    Z,
    W,
}

impl Component {
    #[must_use]
    pub fn from_index(index: u32) -> Self {
        match index % 4 {
            0 => Self::X,
            1 => Self::Y,
            2 => Self::Z,
            _ => Self::W,
        }
    }

    #[must_use]
    pub fn index(self) -> u32 {
        match self {
            Self::X => 0,
            Self::Y => 1,
            Self::Z => 2,
            Self::W => 3,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::X => "x",
            Self::Y => "y",
            Self::Z => "z",
            Self::W => "w",
        }
    }
}

/// A register (optionally narrowed to one component), e.g. `ft2` or `fc3.y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderRegisterElement {
    ty: RegisterType,
    index: u32,
    component: Option<Component>,
}

impl ShaderRegisterElement {
    #[must_use]
    pub fn new(ty: RegisterType, index: u32) -> Self {
        Self { ty, index, component: None }
    }

    #[must_use]
    pub fn with_component(self, component: Component) -> Self {
        Self { component: Some(component), ..self }
    }

    #[inline]
    #[must_use]
    pub fn ty(&self) -> RegisterType {
        self.ty
    }

    #[inline]
    #[must_use]
    pub fn index(&self) -> u32 {
        self.index
    }

    #[inline]
    #[must_use]
    pub fn component(&self) -> Option<Component> {
        self.component
    }
}

impl fmt::Display for ShaderRegisterElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.ty.prefix(), self.index)?;
        if let Some(component) = self.component {
            write!(f, ".{}", component.as_str())?;
        }
        Ok(())
    }
}

/// Usage-counted bank of registers of one type.
#[derive(Debug, Clone)]
pub struct RegisterPool {
    ty: RegisterType,
    usages: SmallVec<[u32; 16]>,
    persistent: bool,
}

impl RegisterPool {
    #[must_use]
    pub fn new(ty: RegisterType, capacity: u32, persistent: bool) -> Self {
        Self {
            ty,
            usages: SmallVec::from_elem(0, capacity as usize),
            persistent,
        }
    }

    #[must_use]
    pub fn capacity(&self) -> u32 {
        self.usages.len() as u32
    }

    /// Lowest-indexed register with no outstanding usage.
    pub fn request_free(&mut self) -> Result<ShaderRegisterElement> {
        let index = self
            .usages
            .iter()
            .position(|&count| count == 0)
            .ok_or(AerieError::RegisterExhausted {
                ty: self.ty,
                capacity: self.capacity(),
            })?;
        if self.persistent {
            self.usages[index] += 1;
        }
        Ok(ShaderRegisterElement::new(self.ty, index as u32))
    }

    pub fn add_usage(&mut self, register: ShaderRegisterElement, count: u32) {
        debug_assert_eq!(register.ty, self.ty);
        if let Some(usage) = self.usages.get_mut(register.index as usize) {
            *usage += count;
        }
    }

    pub fn remove_usage(&mut self, register: ShaderRegisterElement) {
        debug_assert_eq!(register.ty, self.ty);
        if let Some(usage) = self.usages.get_mut(register.index as usize) {
            *usage = usage.saturating_sub(1);
        }
    }

    #[must_use]
    pub fn is_used(&self, index: u32) -> bool {
        self.usages.get(index as usize).is_some_and(|&count| count > 0)
    }

    /// Number of registers currently in use.
    #[must_use]
    pub fn num_used(&self) -> u32 {
        self.usages.iter().filter(|&&count| count > 0).count() as u32
    }

    /// One past the highest register in use; the size of a constant
    /// block that covers every allocation.
    #[must_use]
    pub fn high_water_mark(&self) -> u32 {
        self.usages
            .iter()
            .rposition(|&count| count > 0)
            .map_or(0, |index| index as u32 + 1)
    }
}

/// Register counts per bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterLimits {
    pub varyings: u32,
    pub fragment_constants: u32,
    pub fragment_temps: u32,
    pub textures: u32,
}

impl Default for RegisterLimits {
    fn default() -> Self {
        Self::BASELINE
    }
}

impl RegisterLimits {
    /// Conservative limits every target profile provides.
    pub const BASELINE: Self = Self {
        varyings: 8,
        fragment_constants: 28,
        fragment_temps: 8,
        textures: 8,
    };

    /// Extended profile with larger constant and temp banks.
    pub const STANDARD: Self = Self {
        varyings: 10,
        fragment_constants: 64,
        fragment_temps: 26,
        textures: 16,
    };
}

/// Registers every method in a pass may read, set up by the compiler
/// before the first method runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SharedRegisters {
    /// Normalized surface normal (fragment temp).
    pub normal_fragment: Option<ShaderRegisterElement>,
    /// Normalized direction towards the viewer (fragment temp).
    pub view_dir_fragment: Option<ShaderRegisterElement>,
    /// Constant `(0.5, 0, 0, 1)`.
    pub commons: Option<ShaderRegisterElement>,
    /// Interpolated primary texture coordinates.
    pub uv_varying: Option<ShaderRegisterElement>,
    /// Interpolated world-space fragment position.
    pub global_position_varying: Option<ShaderRegisterElement>,
}

impl SharedRegisters {
    pub fn normal_fragment(&self) -> Result<ShaderRegisterElement> {
        self.normal_fragment
            .ok_or(AerieError::MissingSharedRegister("normal_fragment"))
    }

    pub fn view_dir_fragment(&self) -> Result<ShaderRegisterElement> {
        self.view_dir_fragment
            .ok_or(AerieError::MissingSharedRegister("view_dir_fragment"))
    }

    pub fn commons(&self) -> Result<ShaderRegisterElement> {
        self.commons.ok_or(AerieError::MissingSharedRegister("commons"))
    }

    pub fn uv_varying(&self) -> Result<ShaderRegisterElement> {
        self.uv_varying
            .ok_or(AerieError::MissingSharedRegister("uv_varying"))
    }
}

/// Allocator for one shader compilation pass.
#[derive(Debug, Clone)]
pub struct ShaderRegisterCache {
    varyings: RegisterPool,
    fragment_constants: RegisterPool,
    fragment_temps: RegisterPool,
    textures: RegisterPool,
    shared: SharedRegisters,
}

impl Default for ShaderRegisterCache {
    fn default() -> Self {
        Self::new(RegisterLimits::default())
    }
}

impl ShaderRegisterCache {
    #[must_use]
    pub fn new(limits: RegisterLimits) -> Self {
        Self {
            varyings: RegisterPool::new(RegisterType::Varying, limits.varyings, true),
            fragment_constants: RegisterPool::new(
                RegisterType::FragmentConstant,
                limits.fragment_constants,
                true,
            ),
            fragment_temps: RegisterPool::new(
                RegisterType::FragmentTemp,
                limits.fragment_temps,
                false,
            ),
            textures: RegisterPool::new(RegisterType::Texture, limits.textures, true),
            shared: SharedRegisters::default(),
        }
    }

    #[must_use]
    pub fn shared(&self) -> &SharedRegisters {
        &self.shared
    }

    pub fn shared_mut(&mut self) -> &mut SharedRegisters {
        &mut self.shared
    }

    // ------------------------------------------------------------------------
    // Fragment program
    // ------------------------------------------------------------------------

    /// A currently unused fragment temp. Not reserved until
    /// [`add_fragment_temp_usages`](Self::add_fragment_temp_usages).
    pub fn free_fragment_vector_temp(&mut self) -> Result<ShaderRegisterElement> {
        self.fragment_temps.request_free()
    }

    pub fn add_fragment_temp_usages(&mut self, register: ShaderRegisterElement, usage_count: u32) {
        self.fragment_temps.add_usage(register, usage_count);
    }

    pub fn remove_fragment_temp_usage(&mut self, register: ShaderRegisterElement) {
        self.fragment_temps.remove_usage(register);
    }

    pub fn free_fragment_constant(&mut self) -> Result<ShaderRegisterElement> {
        self.fragment_constants.request_free()
    }

    pub fn free_texture_reg(&mut self) -> Result<ShaderRegisterElement> {
        self.textures.request_free()
    }

    #[must_use]
    pub fn fragment_output(&self) -> ShaderRegisterElement {
        ShaderRegisterElement::new(RegisterType::FragmentOutput, 0)
    }

    #[must_use]
    pub fn num_used_fragment_constants(&self) -> u32 {
        self.fragment_constants.high_water_mark()
    }

    #[must_use]
    pub fn num_fragment_temps_in_use(&self) -> u32 {
        self.fragment_temps.num_used()
    }

    #[must_use]
    pub fn num_used_textures(&self) -> u32 {
        self.textures.high_water_mark()
    }

    // ------------------------------------------------------------------------
    // Interpolants
    // ------------------------------------------------------------------------

    pub fn free_varying(&mut self) -> Result<ShaderRegisterElement> {
        self.varyings.request_free()
    }

    #[must_use]
    pub fn num_used_varyings(&self) -> u32 {
        self.varyings.high_water_mark()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_is_recycled_after_release() {
        let mut cache = ShaderRegisterCache::default();
        let a = cache.free_fragment_vector_temp().unwrap();
        // Not claimed yet: the same register comes back
        assert_eq!(cache.free_fragment_vector_temp().unwrap(), a);

        cache.add_fragment_temp_usages(a, 1);
        let b = cache.free_fragment_vector_temp().unwrap();
        assert_ne!(a, b);

        cache.remove_fragment_temp_usage(a);
        assert_eq!(cache.free_fragment_vector_temp().unwrap(), a);
    }

    #[test]
    fn test_constants_are_persistent() {
        let mut cache = ShaderRegisterCache::default();
        let a = cache.free_fragment_constant().unwrap();
        let b = cache.free_fragment_constant().unwrap();
        assert_eq!(a.index(), 0);
        assert_eq!(b.index(), 1);
        assert_eq!(cache.num_used_fragment_constants(), 2);
    }

    #[test]
    fn test_pool_exhaustion() {
        let mut pool = RegisterPool::new(RegisterType::Texture, 2, true);
        pool.request_free().unwrap();
        pool.request_free().unwrap();
        let err = pool.request_free().unwrap_err();
        assert!(matches!(
            err,
            AerieError::RegisterExhausted { ty: RegisterType::Texture, capacity: 2 }
        ));
    }

    #[test]
    fn test_display() {
        let reg = ShaderRegisterElement::new(RegisterType::FragmentConstant, 3);
        assert_eq!(reg.to_string(), "fc3");
        assert_eq!(reg.with_component(Component::Y).to_string(), "fc3.y");
    }
}
