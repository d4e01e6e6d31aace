//! Material System
//!
//! Per-pixel lighting is assembled from a chain of shading methods:
//! - [`register_cache`]: register allocation for one compilation
//! - [`shader_chunk`]: structured program code the methods emit
//! - [`method_vo`]: per-compilation requirements and register slots
//! - [`methods`]: the lighting methods (diffuse, specular)
//! - [`compiler`]: material passes that compile and cache programs

pub mod compiler;
pub mod method_vo;
pub mod methods;
pub mod register_cache;
pub mod shader_chunk;

pub use compiler::{CompiledPass, MaterialPass, PassKey, PassSettings, SharedMaterialPass};
pub use method_vo::{MethodFlags, MethodVO};
pub use methods::{
    BasicDiffuseMethod, BasicSpecularMethod, LightAccumulator, LightingMethod, ModulateFn,
    ShadingMethod,
};
pub use register_cache::{
    Component, RegisterLimits, RegisterType, ShaderRegisterCache, ShaderRegisterElement,
    SharedRegisters,
};
pub use shader_chunk::{Instruction, Opcode, Operand, SamplerOptions, ShaderChunk};
