//! # Material Runtime
//!
//! Turns GLSL shader programs plus per-object override data into
//! ready-to-draw uniform binding state.
//!
//! ## Overview
//!
//! This crate provides:
//! - [`ShaderInterface`] - Ordered uniform declarations parsed from shader text
//! - [`Material`] - A linked GPU program with its ordered uniform slots
//! - [`MaterialInstance`] - Per-object values linked against a shared material
//! - [`ResourceRegistry`] - Named shaders, textures and cached materials
//! - [`ShaderBackend`] - Trait for GPU backends: Dummy (for testing) and
//!   OpenGL via glow (feature `gl-backend`)
//!
//! ## Example
//!
//! ```ignore
//! use material_runtime::{DummyBackend, Material, MaterialInstance, UniformOverrides};
//!
//! let mut backend = DummyBackend::new();
//! let material = Rc::new(Material::compile_sources(&mut backend, "unlit", vs, fs)?);
//! let instance = MaterialInstance::create("box", Some(material), UniformOverrides::new())?;
//! instance.use_program(&mut backend)?;
//! instance.bind(&mut backend)?;
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod material;
pub mod resources;
pub mod shader;

// Re-export main types for convenience
pub use backend::{
    BackendError, DummyBackend, ProgramHandle, ShaderBackend, ShaderHandle, TextureHandle,
    UniformLocation,
};
pub use config::RuntimeConfig;
pub use error::{MaterialError, MaterialResult};
pub use material::{
    Material, MaterialDescriptor, MaterialInstance, TextureUnit, UniformKind, UniformOverrides,
    UniformSlot, UniformValue,
};
pub use resources::{ResourceRegistry, ShaderProgramSource};
pub use shader::{ShaderComposer, ShaderDef, ShaderInterface, ShaderStage, UniformDeclaration};

#[cfg(feature = "gl-backend")]
pub use backend::GlowBackend;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the material runtime.
///
/// Only logs the version; call it once logging is set up.
pub fn init() {
    log::info!("Material Runtime v{} initialized", VERSION);
}
