//! Structured fragment-program code.
//!
//! Methods emit [`Instruction`]s into a [`ShaderChunk`] instead of raw text.
//! The textual form (`Display`) is an assembly-like listing used for
//! debugging and for hashing compiled programs; backends translate the
//! structured form.

use std::fmt;

use smallvec::SmallVec;

use crate::materials::register_cache::ShaderRegisterElement;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    Mov,
    Add,
    Sub,
    Mul,
    Div,
    Dp3,
    Max,
    Min,
    Sat,
    Pow,
    Nrm,
    Tex,
    Kil,
}

impl Opcode {
    #[must_use]
    pub fn mnemonic(self) -> &'static str {
        match self {
            Self::Mov => "mov",
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Mul => "mul",
            Self::Div => "div",
            Self::Dp3 => "dp3",
            Self::Max => "max",
            Self::Min => "min",
            Self::Sat => "sat",
            Self::Pow => "pow",
            Self::Nrm => "nrm",
            Self::Tex => "tex",
            Self::Kil => "kil",
        }
    }
}

/// A register reference with an optional swizzle mask (`ft0.xyz`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Operand {
    pub register: ShaderRegisterElement,
    pub swizzle: Option<&'static str>,
}

impl Operand {
    #[must_use]
    pub fn swizzled(register: ShaderRegisterElement, swizzle: &'static str) -> Self {
        Self { register, swizzle: Some(swizzle) }
    }
}

impl From<ShaderRegisterElement> for Operand {
    fn from(register: ShaderRegisterElement) -> Self {
        Self { register, swizzle: None }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.register)?;
        if let Some(swizzle) = self.swizzle {
            write!(f, ".{swizzle}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SamplerDimension {
    D2,
    Cube,
}

/// Sampling state attached to a `tex` instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SamplerOptions {
    pub dimension: SamplerDimension,
    pub smooth: bool,
    pub mipmaps: bool,
    pub repeat: bool,
    /// Compressed format hint (`"dxt1"`, `"dxt5"`) or `"rgba"`.
    pub format: &'static str,
}

impl Default for SamplerOptions {
    fn default() -> Self {
        Self {
            dimension: SamplerDimension::D2,
            smooth: true,
            mipmaps: true,
            repeat: false,
            format: "rgba",
        }
    }
}

impl fmt::Display for SamplerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dimension = match self.dimension {
            SamplerDimension::D2 => "2d",
            SamplerDimension::Cube => "cube",
        };
        let filter = if self.smooth { "linear" } else { "nearest" };
        let mip = match (self.mipmaps, self.smooth) {
            (false, _) => "mipnone",
            (true, true) => "miplinear",
            (true, false) => "mipnearest",
        };
        let wrap = if self.repeat { "wrap" } else { "clamp" };
        write!(f, "<{dimension},{filter},{mip},{wrap}")?;
        if self.format != "rgba" {
            write!(f, ",{}", self.format)?;
        }
        write!(f, ">")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub op: Opcode,
    pub dest: Option<Operand>,
    pub sources: SmallVec<[Operand; 3]>,
    pub sampler: Option<SamplerOptions>,
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.op.mnemonic())?;
        let mut first = true;
        for operand in self.dest.iter().chain(self.sources.iter()) {
            if first {
                write!(f, " {operand}")?;
                first = false;
            } else {
                write!(f, ", {operand}")?;
            }
        }
        if let Some(sampler) = &self.sampler {
            write!(f, " {sampler}")?;
        }
        Ok(())
    }
}

/// Ordered fragment of program code.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShaderChunk {
    instructions: Vec<Instruction>,
}

impl ShaderChunk {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, op: Opcode, dest: impl Into<Operand>, sources: &[Operand]) {
        self.instructions.push(Instruction {
            op,
            dest: Some(dest.into()),
            sources: SmallVec::from_slice(sources),
            sampler: None,
        });
    }

    /// Discards the fragment when `source` is negative.
    pub fn emit_kill(&mut self, source: impl Into<Operand>) {
        self.instructions.push(Instruction {
            op: Opcode::Kil,
            dest: None,
            sources: SmallVec::from_slice(&[source.into()]),
            sampler: None,
        });
    }

    pub fn emit_tex(
        &mut self,
        dest: impl Into<Operand>,
        coords: impl Into<Operand>,
        sampler: ShaderRegisterElement,
        options: SamplerOptions,
    ) {
        self.instructions.push(Instruction {
            op: Opcode::Tex,
            dest: Some(dest.into()),
            sources: SmallVec::from_slice(&[coords.into(), sampler.into()]),
            sampler: Some(options),
        });
    }

    pub fn append(&mut self, other: ShaderChunk) {
        self.instructions.extend(other.instructions);
    }

    #[must_use]
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Number of instructions with the given opcode.
    #[must_use]
    pub fn count(&self, op: Opcode) -> usize {
        self.instructions.iter().filter(|inst| inst.op == op).count()
    }

    /// Whether any instruction writes to or reads from `register`.
    #[must_use]
    pub fn references(&self, register: ShaderRegisterElement) -> bool {
        self.instructions.iter().any(|inst| {
            inst.dest
                .iter()
                .chain(inst.sources.iter())
                .any(|operand| operand.register == register)
        })
    }

    pub fn clear(&mut self) {
        self.instructions.clear();
    }
}

impl fmt::Display for ShaderChunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for inst in &self.instructions {
            writeln!(f, "{inst}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::materials::register_cache::RegisterType;

    #[test]
    fn test_listing() {
        let t = ShaderRegisterElement::new(RegisterType::FragmentTemp, 0);
        let n = ShaderRegisterElement::new(RegisterType::FragmentTemp, 1);
        let l = ShaderRegisterElement::new(RegisterType::FragmentConstant, 2);
        let mut chunk = ShaderChunk::new();
        chunk.emit(
            Opcode::Dp3,
            Operand::swizzled(t, "x"),
            &[l.into(), n.into()],
        );
        chunk.emit_kill(Operand::swizzled(t, "w"));
        assert_eq!(chunk.to_string(), "dp3 ft0.x, fc2, ft1\nkil ft0.w\n");
        assert_eq!(chunk.count(Opcode::Dp3), 1);
        assert!(chunk.references(l));
    }

    #[test]
    fn test_sampler_listing() {
        let options = SamplerOptions {
            format: "dxt5",
            ..SamplerOptions::default()
        };
        assert_eq!(options.to_string(), "<2d,linear,miplinear,clamp,dxt5>");
    }
}
