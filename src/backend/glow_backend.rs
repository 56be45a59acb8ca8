//! OpenGL backend using glow.
//!
//! Maps the opaque handles of the runtime onto native glow objects. The
//! context must be current on the calling thread for every call.

use std::collections::HashMap;

use glam::{Mat3, Mat4, Vec2, Vec3, Vec4};
use glow::HasContext;

use crate::backend::traits::*;
use crate::backend::types::*;
use crate::material::GL_TEXTURE0;
use crate::shader::ShaderStage;

/// OpenGL shader backend.
pub struct GlowBackend {
    gl: glow::Context,
    next_id: u64,
    next_location: u32,
    shaders: HashMap<ShaderHandle, glow::NativeShader>,
    programs: HashMap<ProgramHandle, glow::NativeProgram>,
    textures: HashMap<TextureHandle, glow::NativeTexture>,
    locations: HashMap<UniformLocation, glow::NativeUniformLocation>,
    resolved: HashMap<(ProgramHandle, String), UniformLocation>,
}

impl GlowBackend {
    /// Wrap a glow context.
    pub fn new(gl: glow::Context) -> Self {
        let version = gl.version();
        log::info!(
            "GlowBackend: OpenGL {}.{} ({})",
            version.major,
            version.minor,
            version.vendor_info
        );
        Self {
            gl,
            next_id: 1,
            next_location: 0,
            shaders: HashMap::new(),
            programs: HashMap::new(),
            textures: HashMap::new(),
            locations: HashMap::new(),
            resolved: HashMap::new(),
        }
    }

    /// Access the underlying context.
    pub fn gl(&self) -> &glow::Context {
        &self.gl
    }

    /// Make a texture created elsewhere bindable through a handle.
    pub fn register_texture(&mut self, texture: glow::NativeTexture) -> TextureHandle {
        let handle = TextureHandle(self.allocate_id());
        self.textures.insert(handle, texture);
        handle
    }

    /// Forget a registered texture. The GL object itself is not deleted.
    pub fn unregister_texture(&mut self, texture: TextureHandle) -> Option<glow::NativeTexture> {
        self.textures.remove(&texture)
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn location(&self, location: UniformLocation) -> Option<&glow::NativeUniformLocation> {
        self.locations.get(&location)
    }
}

impl ShaderBackend for GlowBackend {
    fn name(&self) -> &'static str {
        "OpenGL"
    }

    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> BackendResult<ShaderHandle> {
        let kind = match stage {
            ShaderStage::Vertex => glow::VERTEX_SHADER,
            ShaderStage::Fragment => glow::FRAGMENT_SHADER,
        };

        let native = unsafe {
            let shader = self
                .gl
                .create_shader(kind)
                .map_err(|e| BackendError::ResourceCreationFailed(format!("{stage} shader: {e}")))?;
            self.gl.shader_source(shader, source);
            self.gl.compile_shader(shader);
            if !self.gl.get_shader_compile_status(shader) {
                let log = self.gl.get_shader_info_log(shader);
                self.gl.delete_shader(shader);
                return Err(BackendError::ShaderCompilationFailed { stage, log });
            }
            shader
        };

        let handle = ShaderHandle(self.allocate_id());
        self.shaders.insert(handle, native);
        Ok(handle)
    }

    fn create_program(&mut self) -> BackendResult<ProgramHandle> {
        let native = unsafe { self.gl.create_program() }
            .map_err(|e| BackendError::ResourceCreationFailed(format!("program: {e}")))?;
        let handle = ProgramHandle(self.allocate_id());
        self.programs.insert(handle, native);
        Ok(handle)
    }

    fn attach_shader(&mut self, program: ProgramHandle, shader: ShaderHandle) {
        if let (Some(&p), Some(&s)) = (self.programs.get(&program), self.shaders.get(&shader)) {
            unsafe { self.gl.attach_shader(p, s) };
        }
    }

    fn link_program(&mut self, program: ProgramHandle) -> BackendResult<()> {
        let native = *self
            .programs
            .get(&program)
            .ok_or_else(|| BackendError::InvalidHandle(format!("{program:?}")))?;
        unsafe {
            self.gl.link_program(native);
            if !self.gl.get_program_link_status(native) {
                return Err(BackendError::ProgramLinkFailed(
                    self.gl.get_program_info_log(native),
                ));
            }
        }
        Ok(())
    }

    fn detach_shader(&mut self, program: ProgramHandle, shader: ShaderHandle) {
        if let (Some(&p), Some(&s)) = (self.programs.get(&program), self.shaders.get(&shader)) {
            unsafe { self.gl.detach_shader(p, s) };
        }
    }

    fn uniform_location(&mut self, program: ProgramHandle, name: &str) -> Option<UniformLocation> {
        if let Some(location) = self.resolved.get(&(program, name.to_string())) {
            return Some(*location);
        }
        let native = *self.programs.get(&program)?;
        let native_location = unsafe { self.gl.get_uniform_location(native, name) }?;

        let location = UniformLocation(self.next_location);
        self.next_location += 1;
        self.locations.insert(location, native_location);
        self.resolved.insert((program, name.to_string()), location);
        Some(location)
    }

    fn use_program(&mut self, program: Option<ProgramHandle>) {
        let native = program.and_then(|p| self.programs.get(&p).copied());
        unsafe { self.gl.use_program(native) };
    }

    fn delete_shader(&mut self, shader: ShaderHandle) {
        if let Some(native) = self.shaders.remove(&shader) {
            unsafe { self.gl.delete_shader(native) };
        }
    }

    fn delete_program(&mut self, program: ProgramHandle) {
        if let Some(native) = self.programs.remove(&program) {
            unsafe { self.gl.delete_program(native) };
        }
        let stale: Vec<UniformLocation> = self
            .resolved
            .iter()
            .filter(|((p, _), _)| *p == program)
            .map(|(_, location)| *location)
            .collect();
        self.resolved.retain(|(p, _), _| *p != program);
        for location in stale {
            self.locations.remove(&location);
        }
    }

    fn set_uniform_float(&mut self, location: UniformLocation, value: f32) {
        unsafe { self.gl.uniform_1_f32(self.location(location), value) };
    }

    fn set_uniform_int(&mut self, location: UniformLocation, value: i32) {
        unsafe { self.gl.uniform_1_i32(self.location(location), value) };
    }

    fn set_uniform_vec2(&mut self, location: UniformLocation, value: Vec2) {
        unsafe { self.gl.uniform_2_f32(self.location(location), value.x, value.y) };
    }

    fn set_uniform_vec3(&mut self, location: UniformLocation, value: Vec3) {
        unsafe {
            self.gl
                .uniform_3_f32(self.location(location), value.x, value.y, value.z)
        };
    }

    fn set_uniform_vec4(&mut self, location: UniformLocation, value: Vec4) {
        unsafe {
            self.gl.uniform_4_f32(
                self.location(location),
                value.x,
                value.y,
                value.z,
                value.w,
            )
        };
    }

    fn set_uniform_mat3(&mut self, location: UniformLocation, value: &Mat3) {
        unsafe {
            self.gl.uniform_matrix_3_f32_slice(
                self.location(location),
                false,
                &value.to_cols_array(),
            )
        };
    }

    fn set_uniform_mat4(&mut self, location: UniformLocation, value: &Mat4) {
        unsafe {
            self.gl.uniform_matrix_4_f32_slice(
                self.location(location),
                false,
                &value.to_cols_array(),
            )
        };
    }

    fn active_texture(&mut self, unit: u32) {
        unsafe { self.gl.active_texture(GL_TEXTURE0 + unit) };
    }

    fn bind_texture_2d(&mut self, texture: TextureHandle) {
        let native = self.textures.get(&texture).copied();
        if native.is_none() && !texture.is_null() {
            log::warn!("GlowBackend: texture {texture:?} is not registered, binding none");
        }
        unsafe { self.gl.bind_texture(glow::TEXTURE_2D, native) };
    }
}
