//! Dummy backend for testing and headless use.
//!
//! This backend doesn't talk to a GPU. It records every call so tests can
//! assert the exact sequence of state changes, and it imitates the parts of
//! a GL driver the material runtime depends on:
//!
//! - compilation rejects sources with unbalanced `{}` / `()`
//! - linking requires one vertex and one fragment stage, each with `main`
//! - a uniform that is never referenced outside its declaration is treated
//!   as optimized out and has no location

use std::collections::HashMap;

use glam::{Mat3, Mat4, Vec2, Vec3, Vec4};

use crate::backend::traits::*;
use crate::backend::types::*;
use crate::shader::{self, ShaderStage};

/// A call recorded by [`DummyBackend`].
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    CompileShader { shader: ShaderHandle, stage: ShaderStage },
    CreateProgram(ProgramHandle),
    AttachShader { program: ProgramHandle, shader: ShaderHandle },
    LinkProgram(ProgramHandle),
    DetachShader { program: ProgramHandle, shader: ShaderHandle },
    DeleteShader(ShaderHandle),
    DeleteProgram(ProgramHandle),
    UseProgram(Option<ProgramHandle>),
    SetFloat { location: UniformLocation, value: f32 },
    SetInt { location: UniformLocation, value: i32 },
    SetVec2 { location: UniformLocation, value: Vec2 },
    SetVec3 { location: UniformLocation, value: Vec3 },
    SetVec4 { location: UniformLocation, value: Vec4 },
    SetMat3 { location: UniformLocation, value: Mat3 },
    SetMat4 { location: UniformLocation, value: Mat4 },
    ActiveTexture(u32),
    BindTexture2d(TextureHandle),
}

impl BackendCall {
    /// Whether this call changes uniform or texture binding state.
    pub fn is_binding(&self) -> bool {
        matches!(
            self,
            BackendCall::SetFloat { .. }
                | BackendCall::SetInt { .. }
                | BackendCall::SetVec2 { .. }
                | BackendCall::SetVec3 { .. }
                | BackendCall::SetVec4 { .. }
                | BackendCall::SetMat3 { .. }
                | BackendCall::SetMat4 { .. }
                | BackendCall::ActiveTexture(_)
                | BackendCall::BindTexture2d(_)
        )
    }
}

#[derive(Debug)]
struct DummyShader {
    stage: ShaderStage,
    source: String,
}

#[derive(Debug, Default)]
struct DummyProgram {
    attached: Vec<ShaderHandle>,
    linked_sources: Vec<String>,
    linked: bool,
    locations: HashMap<String, UniformLocation>,
}

/// Dummy shader backend.
#[derive(Debug)]
pub struct DummyBackend {
    next_id: u64,
    shaders: HashMap<ShaderHandle, DummyShader>,
    programs: HashMap<ProgramHandle, DummyProgram>,
    textures: HashMap<TextureHandle, String>,
    current_program: Option<ProgramHandle>,
    calls: Vec<BackendCall>,
}

impl Default for DummyBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DummyBackend {
    /// Create a new dummy backend.
    pub fn new() -> Self {
        Self {
            next_id: 1,
            shaders: HashMap::new(),
            programs: HashMap::new(),
            textures: HashMap::new(),
            current_program: None,
            calls: Vec::new(),
        }
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Create a texture handle. The label is kept for debugging only.
    pub fn create_texture(&mut self, label: &str) -> TextureHandle {
        let handle = TextureHandle(self.allocate_id());
        log::trace!("DummyBackend: creating texture {label:?} -> {handle:?}");
        self.textures.insert(handle, label.to_string());
        handle
    }

    /// Label a texture was created with.
    pub fn texture_label(&self, texture: TextureHandle) -> Option<&str> {
        self.textures.get(&texture).map(String::as_str)
    }

    /// All recorded calls, oldest first.
    pub fn calls(&self) -> &[BackendCall] {
        &self.calls
    }

    /// Only the uniform and texture binding calls.
    pub fn binding_calls(&self) -> Vec<BackendCall> {
        self.calls.iter().filter(|c| c.is_binding()).cloned().collect()
    }

    /// Forget all recorded calls.
    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Take the recorded calls, leaving the log empty.
    pub fn take_calls(&mut self) -> Vec<BackendCall> {
        std::mem::take(&mut self.calls)
    }

    /// Number of program objects not yet deleted.
    pub fn live_programs(&self) -> usize {
        self.programs.len()
    }

    /// Number of shader stage objects not yet deleted.
    pub fn live_shaders(&self) -> usize {
        self.shaders.len()
    }

    /// The program most recently made current.
    pub fn current_program(&self) -> Option<ProgramHandle> {
        self.current_program
    }
}

/// Check `{}` / `()` balance the way a driver reports a syntax error.
fn check_syntax(source: &str) -> Result<(), String> {
    let stripped = shader::strip_comments(source);
    let mut stack: Vec<(char, usize)> = Vec::new();
    let mut last_line = 1;

    for (index, line) in stripped.lines().enumerate() {
        let line_number = index + 1;
        last_line = line_number;
        if line.trim_start().starts_with('#') {
            continue;
        }
        for c in line.chars() {
            match c {
                '{' | '(' => stack.push((c, line_number)),
                '}' | ')' => {
                    let expected = if c == '}' { '{' } else { '(' };
                    match stack.pop() {
                        Some((open, _)) if open == expected => {}
                        _ => return Err(format!("0:{line_number}: error: syntax error, unexpected '{c}'")),
                    }
                }
                _ => {}
            }
        }
    }

    if let Some((open, line_number)) = stack.pop() {
        return Err(format!(
            "0:{last_line}: error: syntax error, unexpected end of file (unclosed '{open}' from line {line_number})"
        ));
    }
    Ok(())
}

/// True when a uniform is referenced anywhere besides a declaration line.
fn is_referenced(sources: &[String], name: &str) -> bool {
    sources.iter().any(|source| {
        shader::strip_comments(source).lines().any(|line| {
            let trimmed = line.trim_start();
            !trimmed.starts_with("uniform ")
                && !trimmed.starts_with('#')
                && shader::contains_word(line, name)
        })
    })
}

impl ShaderBackend for DummyBackend {
    fn name(&self) -> &'static str {
        "Dummy"
    }

    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> BackendResult<ShaderHandle> {
        check_syntax(source)
            .map_err(|log| BackendError::ShaderCompilationFailed { stage, log })?;

        let shader = ShaderHandle(self.allocate_id());
        log::trace!("DummyBackend: compiled {stage} shader {shader:?}");
        self.shaders.insert(
            shader,
            DummyShader {
                stage,
                source: source.to_string(),
            },
        );
        self.calls.push(BackendCall::CompileShader { shader, stage });
        Ok(shader)
    }

    fn create_program(&mut self) -> BackendResult<ProgramHandle> {
        let program = ProgramHandle(self.allocate_id());
        log::trace!("DummyBackend: creating program {program:?}");
        self.programs.insert(program, DummyProgram::default());
        self.calls.push(BackendCall::CreateProgram(program));
        Ok(program)
    }

    fn attach_shader(&mut self, program: ProgramHandle, shader: ShaderHandle) {
        if let Some(p) = self.programs.get_mut(&program) {
            p.attached.push(shader);
        }
        self.calls.push(BackendCall::AttachShader { program, shader });
    }

    fn link_program(&mut self, program: ProgramHandle) -> BackendResult<()> {
        self.calls.push(BackendCall::LinkProgram(program));
        let p = self
            .programs
            .get(&program)
            .ok_or_else(|| BackendError::InvalidHandle(format!("{program:?}")))?;

        let mut sources = Vec::new();
        for stage in [ShaderStage::Vertex, ShaderStage::Fragment] {
            let attached = p
                .attached
                .iter()
                .filter_map(|handle| self.shaders.get(handle))
                .find(|s| s.stage == stage)
                .ok_or_else(|| {
                    BackendError::ProgramLinkFailed(format!("error: no {stage} shader attached"))
                })?;
            let has_main = shader::strip_comments(&attached.source)
                .lines()
                .any(|line| line.contains("void main") || line.contains("void\tmain"));
            if !has_main {
                return Err(BackendError::ProgramLinkFailed(format!(
                    "error: {stage} shader has no entry point 'main'"
                )));
            }
            sources.push(attached.source.clone());
        }

        if let Some(p) = self.programs.get_mut(&program) {
            p.linked_sources = sources;
            p.linked = true;
            p.locations.clear();
        }
        Ok(())
    }

    fn detach_shader(&mut self, program: ProgramHandle, shader: ShaderHandle) {
        if let Some(p) = self.programs.get_mut(&program) {
            p.attached.retain(|s| *s != shader);
        }
        self.calls.push(BackendCall::DetachShader { program, shader });
    }

    fn uniform_location(&mut self, program: ProgramHandle, name: &str) -> Option<UniformLocation> {
        let p = self.programs.get_mut(&program)?;
        if !p.linked {
            return None;
        }
        if let Some(location) = p.locations.get(name) {
            return Some(*location);
        }
        if !is_referenced(&p.linked_sources, name) {
            log::trace!("DummyBackend: uniform '{name}' is inactive in {program:?}");
            return None;
        }
        let location = UniformLocation(p.locations.len() as u32);
        p.locations.insert(name.to_string(), location);
        Some(location)
    }

    fn use_program(&mut self, program: Option<ProgramHandle>) {
        self.current_program = program;
        self.calls.push(BackendCall::UseProgram(program));
    }

    fn delete_shader(&mut self, shader: ShaderHandle) {
        self.shaders.remove(&shader);
        self.calls.push(BackendCall::DeleteShader(shader));
    }

    fn delete_program(&mut self, program: ProgramHandle) {
        self.programs.remove(&program);
        if self.current_program == Some(program) {
            self.current_program = None;
        }
        self.calls.push(BackendCall::DeleteProgram(program));
    }

    fn set_uniform_float(&mut self, location: UniformLocation, value: f32) {
        self.calls.push(BackendCall::SetFloat { location, value });
    }

    fn set_uniform_int(&mut self, location: UniformLocation, value: i32) {
        self.calls.push(BackendCall::SetInt { location, value });
    }

    fn set_uniform_vec2(&mut self, location: UniformLocation, value: Vec2) {
        self.calls.push(BackendCall::SetVec2 { location, value });
    }

    fn set_uniform_vec3(&mut self, location: UniformLocation, value: Vec3) {
        self.calls.push(BackendCall::SetVec3 { location, value });
    }

    fn set_uniform_vec4(&mut self, location: UniformLocation, value: Vec4) {
        self.calls.push(BackendCall::SetVec4 { location, value });
    }

    fn set_uniform_mat3(&mut self, location: UniformLocation, value: &Mat3) {
        self.calls.push(BackendCall::SetMat3 {
            location,
            value: *value,
        });
    }

    fn set_uniform_mat4(&mut self, location: UniformLocation, value: &Mat4) {
        self.calls.push(BackendCall::SetMat4 {
            location,
            value: *value,
        });
    }

    fn active_texture(&mut self, unit: u32) {
        self.calls.push(BackendCall::ActiveTexture(unit));
    }

    fn bind_texture_2d(&mut self, texture: TextureHandle) {
        self.calls.push(BackendCall::BindTexture2d(texture));
    }
}
