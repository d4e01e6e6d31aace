//! Error Types
//!
//! This module defines the error types used throughout the engine.
//!
//! # Overview
//!
//! The main error type [`AerieError`] covers the recoverable failure modes:
//! - Rendering without a bound graphics context
//! - Shader register exhaustion during method compilation
//! - Geometry targets whose layout cannot hold the generated data
//! - Configuration decoding errors
//!
//! Parameter setters never fail: out-of-range values are clamped and
//! unchanged values are ignored.
//!
//! # Usage
//!
//! ```rust,ignore
//! use aerie::errors::{AerieError, Result};
//!
//! fn draw(view: &mut aerie::View3D) -> Result<()> {
//!     view.render()?;
//!     Ok(())
//! }
//! ```

use thiserror::Error;

use crate::materials::register_cache::RegisterType;

/// The main error type for the Aerie engine.
#[derive(Error, Debug)]
pub enum AerieError {
    // ========================================================================
    // Rendering Errors
    // ========================================================================
    /// `render` was called before a graphics context was bound to the view.
    #[error("No graphics context bound to the view")]
    MissingContext,

    // ========================================================================
    // Shader Compilation Errors
    // ========================================================================
    /// Every register of the requested type is in use.
    #[error("Shader register pool exhausted: {ty:?} (capacity {capacity})")]
    RegisterExhausted {
        /// The register bank that ran out
        ty: RegisterType,
        /// Number of registers the bank provides
        capacity: u32,
    },

    /// A method needed a pass-wide register the compiler did not set up.
    #[error("Shared register not allocated: {0}")]
    MissingSharedRegister(&'static str),

    /// `copy_from` was called across two different method variants.
    #[error("Cannot copy shading method configuration from {from} into {into}")]
    IncompatibleMethod {
        /// Variant name of the source method
        from: &'static str,
        /// Variant name of the destination method
        into: &'static str,
    },

    // ========================================================================
    // Geometry Errors
    // ========================================================================
    /// The target's interleaved layout cannot hold the generated attributes.
    #[error("Invalid vertex layout: {0}")]
    InvalidVertexLayout(String),

    /// The generated mesh needs more vertices than 16-bit indices can address.
    #[error("Vertex count {0} exceeds the 16-bit index range")]
    IndexOverflow(usize),

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// View settings could not be decoded.
    #[error("Settings parse error: {0}")]
    Settings(#[from] serde_json::Error),
}

/// Alias for `Result<T, AerieError>`.
pub type Result<T> = std::result::Result<T, AerieError>;
