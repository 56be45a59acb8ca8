//! Core backend abstraction trait
//!
//! Every GPU call the material runtime issues goes through [`ShaderBackend`].
//! All calls happen on the thread that owns the graphics context.

use glam::{Mat3, Mat4, Vec2, Vec3, Vec4};
use thiserror::Error;

use crate::backend::types::*;
use crate::shader::ShaderStage;

/// Backend error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("{stage} shader compilation failed: {log}")]
    ShaderCompilationFailed { stage: ShaderStage, log: String },
    #[error("program link failed: {0}")]
    ProgramLinkFailed(String),
    #[error("failed to create resource: {0}")]
    ResourceCreationFailed(String),
    #[error("invalid handle: {0}")]
    InvalidHandle(String),
}

pub type BackendResult<T> = Result<T, BackendError>;

/// The GPU operations needed to build programs and push uniform state.
///
/// Setter calls target the program made current with [`use_program`];
/// the runtime never activates a program implicitly while binding.
///
/// [`use_program`]: ShaderBackend::use_program
pub trait ShaderBackend {
    /// Backend name, for logging
    fn name(&self) -> &'static str;

    // Program construction

    /// Compile one shader stage. The error carries the driver diagnostic.
    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> BackendResult<ShaderHandle>;

    /// Create an empty program object
    fn create_program(&mut self) -> BackendResult<ProgramHandle>;

    /// Attach a compiled stage to a program
    fn attach_shader(&mut self, program: ProgramHandle, shader: ShaderHandle);

    /// Link a program. The error carries the driver diagnostic.
    fn link_program(&mut self, program: ProgramHandle) -> BackendResult<()>;

    /// Detach a stage from a program
    fn detach_shader(&mut self, program: ProgramHandle, shader: ShaderHandle);

    /// Resolve a uniform location; `None` when the uniform is inactive
    fn uniform_location(&mut self, program: ProgramHandle, name: &str) -> Option<UniformLocation>;

    /// Make a program current, or clear the current program
    fn use_program(&mut self, program: Option<ProgramHandle>);

    // Resource cleanup

    /// Destroy a shader stage object
    fn delete_shader(&mut self, shader: ShaderHandle);

    /// Destroy a program object
    fn delete_program(&mut self, program: ProgramHandle);

    // Uniform state

    fn set_uniform_float(&mut self, location: UniformLocation, value: f32);

    fn set_uniform_int(&mut self, location: UniformLocation, value: i32);

    fn set_uniform_vec2(&mut self, location: UniformLocation, value: Vec2);

    fn set_uniform_vec3(&mut self, location: UniformLocation, value: Vec3);

    fn set_uniform_vec4(&mut self, location: UniformLocation, value: Vec4);

    fn set_uniform_mat3(&mut self, location: UniformLocation, value: &Mat3);

    fn set_uniform_mat4(&mut self, location: UniformLocation, value: &Mat4);

    /// Select the active texture unit (0-based index, not the GL enum)
    fn active_texture(&mut self, unit: u32);

    /// Bind a 2D texture to the active texture unit
    fn bind_texture_2d(&mut self, texture: TextureHandle);
}
