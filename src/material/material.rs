//! Material definition.
//!
//! A [`Material`] owns one linked GPU program and the ordered uniform
//! registry built from its shader text. It is shared by reference across
//! any number of [`MaterialInstance`](super::MaterialInstance)s and never
//! changes after [`Material::compile`] returns, apart from [`Material::delete`].

use std::cell::Cell;

use crate::backend::{BackendError, ProgramHandle, ShaderBackend, ShaderHandle};
use crate::error::MaterialError;
use crate::shader::{ShaderInterface, ShaderStage};

use super::attributes::Attribute;
use super::slot::{UniformRegistry, UniformSlot};
use super::texture_units::TextureUnitAllocator;

/// Texture units available to one material unless configured otherwise.
pub const DEFAULT_MAX_TEXTURE_UNITS: u32 = 16;

/// Descriptor for compiling a material.
#[derive(Debug, Clone)]
pub struct MaterialDescriptor {
    /// Name used in logs and errors.
    pub name: String,

    /// Vertex stage source, after templating.
    pub vertex_source: String,

    /// Fragment stage source, after templating.
    pub fragment_source: String,

    /// Upper bound on sampler slots.
    pub max_texture_units: u32,
}

impl MaterialDescriptor {
    /// Create a new material descriptor.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            vertex_source: String::new(),
            fragment_source: String::new(),
            max_texture_units: DEFAULT_MAX_TEXTURE_UNITS,
        }
    }

    /// Set the vertex stage source.
    pub fn with_vertex(mut self, source: impl Into<String>) -> Self {
        self.vertex_source = source.into();
        self
    }

    /// Set the fragment stage source.
    pub fn with_fragment(mut self, source: impl Into<String>) -> Self {
        self.fragment_source = source.into();
        self
    }

    /// Set the texture unit limit.
    pub fn with_max_texture_units(mut self, limit: u32) -> Self {
        self.max_texture_units = limit;
        self
    }
}

/// A compiled and linked GPU program plus its uniform slots.
///
/// # Example
///
/// ```ignore
/// let material = Material::compile(&mut backend, &MaterialDescriptor::new("unlit")
///     .with_vertex(vs_source)
///     .with_fragment(fs_source))?;
/// ```
#[derive(Debug)]
pub struct Material {
    name: String,
    program: Cell<Option<ProgramHandle>>,
    stages: Cell<Option<(ShaderHandle, ShaderHandle)>>,
    registry: UniformRegistry,
    diagnostics: Vec<MaterialError>,
}

impl Material {
    /// Compile both stages, link them and build the uniform registry.
    ///
    /// Compile and link failures release every GPU object created so far
    /// and return an error; no partial material is produced. Declarations
    /// that cannot become slots leave the material usable but degraded.
    pub fn compile(
        backend: &mut dyn ShaderBackend,
        descriptor: &MaterialDescriptor,
    ) -> Result<Self, MaterialError> {
        let name = descriptor.name.as_str();
        let compile_error = |stage: ShaderStage, error: BackendError| {
            log::error!("material '{name}': {error}");
            MaterialError::ShaderCompile {
                material: name.to_string(),
                stage,
                log: driver_log(error),
            }
        };

        let vertex = backend
            .compile_shader(ShaderStage::Vertex, &descriptor.vertex_source)
            .map_err(|e| compile_error(ShaderStage::Vertex, e))?;
        let fragment = match backend.compile_shader(ShaderStage::Fragment, &descriptor.fragment_source) {
            Ok(fragment) => fragment,
            Err(e) => {
                backend.delete_shader(vertex);
                return Err(compile_error(ShaderStage::Fragment, e));
            }
        };

        let program = match backend.create_program() {
            Ok(program) => program,
            Err(e) => {
                backend.delete_shader(vertex);
                backend.delete_shader(fragment);
                return Err(e.into());
            }
        };
        backend.attach_shader(program, vertex);
        backend.attach_shader(program, fragment);

        if let Err(e) = backend.link_program(program) {
            log::error!("material '{name}': {e}");
            backend.delete_program(program);
            backend.delete_shader(vertex);
            backend.delete_shader(fragment);
            return Err(MaterialError::ShaderLink {
                material: name.to_string(),
                log: driver_log(e),
            });
        }

        backend.detach_shader(program, vertex);
        backend.detach_shader(program, fragment);

        // The registry is built only after a successful link.
        let mut interface = ShaderInterface::parse_stages(&[
            descriptor.vertex_source.as_str(),
            descriptor.fragment_source.as_str(),
        ]);
        let mut diagnostics = interface.take_errors();
        let mut allocator = TextureUnitAllocator::new(descriptor.max_texture_units);
        let (registry, slot_errors) =
            UniformRegistry::build(backend, program, interface.declarations(), &mut allocator);
        for error in &slot_errors {
            log::error!("material '{name}': {error}");
        }
        diagnostics.extend(slot_errors);

        if diagnostics.is_empty() {
            log::info!(
                "material '{name}' compiled: {} uniforms, {} texture units",
                registry.len(),
                allocator.allocated()
            );
        } else {
            log::warn!(
                "material '{name}' compiled degraded: {} uniforms, {} dropped declarations",
                registry.len(),
                diagnostics.len()
            );
        }

        Ok(Self {
            name: name.to_string(),
            program: Cell::new(Some(program)),
            stages: Cell::new(Some((vertex, fragment))),
            registry,
            diagnostics,
        })
    }

    /// Compile from a name and two stage sources with default settings.
    pub fn compile_sources(
        backend: &mut dyn ShaderBackend,
        name: &str,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<Self, MaterialError> {
        Self::compile(
            backend,
            &MaterialDescriptor::new(name)
                .with_vertex(vertex_source)
                .with_fragment(fragment_source),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the program exists. False only after [`Material::delete`].
    pub fn is_loaded(&self) -> bool {
        self.program.get().is_some()
    }

    /// Whether some declarations could not become slots.
    pub fn is_degraded(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    /// Build problems recorded during compile.
    pub fn diagnostics(&self) -> &[MaterialError] {
        &self.diagnostics
    }

    /// The program handle, `None` once deleted.
    pub fn program(&self) -> Option<ProgramHandle> {
        self.program.get()
    }

    pub fn registry(&self) -> &UniformRegistry {
        &self.registry
    }

    /// Slots in declaration order.
    pub fn slots(&self) -> &[UniformSlot] {
        self.registry.slots()
    }

    /// Look up a slot by uniform name.
    pub fn slot(&self, name: &str) -> Option<&UniformSlot> {
        self.registry.get(name)
    }

    /// Make this material's program current.
    pub fn use_program(&self, backend: &mut dyn ShaderBackend) -> Result<(), MaterialError> {
        let program = self.program.get().ok_or_else(|| MaterialError::MaterialDeleted {
            material: self.name.clone(),
        })?;
        backend.use_program(Some(program));
        Ok(())
    }

    /// Release the program and stage objects. Safe to call repeatedly.
    pub fn delete(&self, backend: &mut dyn ShaderBackend) {
        if let Some((vertex, fragment)) = self.stages.take() {
            backend.delete_shader(vertex);
            backend.delete_shader(fragment);
        }
        if let Some(program) = self.program.take() {
            backend.delete_program(program);
            log::info!("material '{}' deleted", self.name);
        }
    }

    /// Read-only schema: name, state and one entry per slot.
    pub fn attributes(&self) -> Vec<Attribute> {
        let state = match (self.is_loaded(), self.is_degraded()) {
            (false, _) => "deleted",
            (true, true) => "degraded",
            (true, false) => "loaded",
        };
        let mut attributes = vec![
            Attribute::text("name", self.name.as_str()),
            Attribute::text("state", state),
        ];
        attributes.extend(
            self.slots()
                .iter()
                .map(|slot| Attribute::text(slot.name(), slot.kind().glsl_name())),
        );
        attributes
    }
}

/// The driver diagnostic without the error prefix.
fn driver_log(error: BackendError) -> String {
    match error {
        BackendError::ShaderCompilationFailed { log, .. } => log,
        BackendError::ProgramLinkFailed(log) => log,
        other => other.to_string(),
    }
}
