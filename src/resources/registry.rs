//! Named shaders, textures, materials and material instance data.
//!
//! The registry is an explicit object passed to whoever builds materials;
//! nothing in the crate looks it up globally.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::rc::Rc;

use crate::backend::{ShaderBackend, TextureHandle};
use crate::config::RuntimeConfig;
use crate::error::MaterialError;
use crate::material::{Material, MaterialDescriptor, MaterialInstance, TextureLookup};
use crate::shader::{ShaderComposer, ShaderDef, ShaderStage};

use super::instance_file::MaterialInstanceData;

/// Source text of one shader program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderProgramSource {
    pub vertex: String,
    pub fragment: String,
}

impl ShaderProgramSource {
    pub fn new(vertex: impl Into<String>, fragment: impl Into<String>) -> Self {
        Self {
            vertex: vertex.into(),
            fragment: fragment.into(),
        }
    }

    /// One source holding both stages behind `#ifdef VERTEX` / `#ifdef FRAGMENT`.
    pub fn combined(source: impl Into<String>) -> Self {
        let source = source.into();
        Self {
            vertex: source.clone(),
            fragment: source,
        }
    }
}

/// Cache key: shader name plus defines sorted by name.
type MaterialKey = (String, Vec<(String, ShaderDef)>);

/// Owns the named resources materials and instances are built from.
#[derive(Debug)]
pub struct ResourceRegistry {
    config: RuntimeConfig,
    composer: ShaderComposer,
    shaders: HashMap<String, ShaderProgramSource>,
    textures: HashMap<String, TextureHandle>,
    instance_files: HashMap<String, String>,
    materials: HashMap<MaterialKey, Rc<Material>>,
}

impl ResourceRegistry {
    pub fn new(config: RuntimeConfig) -> Self {
        let composer = match &config.glsl_version {
            Some(version) => ShaderComposer::new().with_default_version(version.clone()),
            None => ShaderComposer::new(),
        };
        Self {
            config,
            composer,
            shaders: HashMap::new(),
            textures: HashMap::new(),
            instance_files: HashMap::new(),
            materials: HashMap::new(),
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Register a file that shaders can `#include`.
    pub fn register_include(&mut self, path: &str, source: &str) {
        self.composer.register_include(path, source);
    }

    pub fn register_shader(&mut self, name: impl Into<String>, source: ShaderProgramSource) {
        let name = name.into();
        log::debug!("registered shader '{name}'");
        self.shaders.insert(name, source);
    }

    pub fn shader(&self, name: &str) -> Option<&ShaderProgramSource> {
        self.shaders.get(name)
    }

    pub fn register_texture(&mut self, name: impl Into<String>, texture: TextureHandle) {
        self.textures.insert(name.into(), texture);
    }

    pub fn texture(&self, name: &str) -> Option<TextureHandle> {
        self.textures.get(name).copied()
    }

    /// Register material instance data text under a name.
    pub fn register_material_instance(&mut self, name: impl Into<String>, text: impl Into<String>) {
        self.instance_files.insert(name.into(), text.into());
    }

    /// Read a material instance data file, registered under its file stem.
    pub fn register_material_instance_file(&mut self, path: &Path) -> Result<String, MaterialError> {
        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(|| MaterialError::InstanceData(format!("{}: no file name", path.display())))?
            .to_string();
        let text = std::fs::read_to_string(path)
            .map_err(|e| MaterialError::InstanceData(format!("{}: {e}", path.display())))?;
        self.register_material_instance(name.clone(), text);
        Ok(name)
    }

    /// Get or build the material for a shader and a set of defines.
    ///
    /// Materials are cached per (shader, defines); define order does not
    /// matter. Failed builds are not cached.
    pub fn get_material(
        &mut self,
        backend: &mut dyn ShaderBackend,
        shader: &str,
        defines: &[(&str, ShaderDef)],
    ) -> Result<Rc<Material>, MaterialError> {
        let mut sorted: Vec<(String, ShaderDef)> = defines
            .iter()
            .map(|(name, def)| (name.to_string(), def.clone()))
            .collect();
        sorted.sort();
        sorted.dedup_by(|a, b| a.0 == b.0);
        let key = (shader.to_string(), sorted);

        if let Some(material) = self.materials.get(&key) {
            if material.is_loaded() {
                return Ok(Rc::clone(material));
            }
        }

        let source = self
            .shaders
            .get(shader)
            .ok_or_else(|| MaterialError::UnknownShader(shader.to_string()))?;

        // Material defines override global ones of the same name.
        let mut merged: BTreeMap<String, ShaderDef> = self.config.shader_defs().into_iter().collect();
        merged.extend(key.1.iter().cloned());
        let shader_defs: Vec<(&str, ShaderDef)> = merged
            .iter()
            .map(|(name, def)| (name.as_str(), def.clone()))
            .collect();
        let vertex = self
            .composer
            .compose(&source.vertex, ShaderStage::Vertex, &shader_defs)?;
        let fragment = self
            .composer
            .compose(&source.fragment, ShaderStage::Fragment, &shader_defs)?;

        let descriptor = MaterialDescriptor::new(material_name(shader, &key.1))
            .with_vertex(vertex)
            .with_fragment(fragment)
            .with_max_texture_units(self.config.max_texture_units);
        let material = Rc::new(Material::compile(backend, &descriptor)?);
        self.materials.insert(key, Rc::clone(&material));
        Ok(material)
    }

    /// Build a fresh instance from registered data.
    pub fn load_material_instance(
        &mut self,
        backend: &mut dyn ShaderBackend,
        name: &str,
    ) -> Result<MaterialInstance, MaterialError> {
        let text = self.instance_files.get(name).cloned().ok_or_else(|| {
            MaterialError::InstanceData(format!("material instance '{name}' is not registered"))
        })?;
        self.material_instance_from_str(backend, name, &text)
    }

    /// Build an instance from data file text.
    pub fn material_instance_from_str(
        &mut self,
        backend: &mut dyn ShaderBackend,
        name: &str,
        text: &str,
    ) -> Result<MaterialInstance, MaterialError> {
        log::info!("loading material instance '{name}'");
        let data = MaterialInstanceData::parse(text, &*self)?;

        let defines: Vec<(&str, ShaderDef)> = data
            .defines
            .iter()
            .map(|(define, def)| (define.as_str(), def.clone()))
            .collect();
        let material = match self.get_material(backend, &data.material, &defines) {
            Ok(material) => Some(material),
            Err(e) => {
                log::error!("material instance '{name}': {e}");
                None
            }
        };

        MaterialInstance::create(name, material, data.overrides)
    }

    /// Number of cached materials.
    pub fn material_count(&self) -> usize {
        self.materials.len()
    }

    /// Delete every cached material and empty the cache.
    pub fn delete_materials(&mut self, backend: &mut dyn ShaderBackend) {
        for (_, material) in self.materials.drain() {
            material.delete(backend);
        }
    }
}

impl TextureLookup for ResourceRegistry {
    fn texture(&self, name: &str) -> Option<TextureHandle> {
        self.textures.get(name).copied()
    }
}

fn material_name(shader: &str, defines: &[(String, ShaderDef)]) -> String {
    if defines.is_empty() {
        return shader.to_string();
    }
    let defines: Vec<&str> = defines.iter().map(|(name, _)| name.as_str()).collect();
    format!("{shader}[{}]", defines.join(","))
}
