//! Material instance with linked uniform values.
//!
//! A [`MaterialInstance`] holds per-object override values and the bindings
//! linked from them against one shared [`Material`]. Multiple instances can
//! share the same material; each owns its own values.

use std::rc::Rc;

use crate::backend::ShaderBackend;
use crate::error::MaterialError;

use super::attributes::Attribute;
use super::linker::{self, UniformBinding};
use super::material::Material;
use super::slot::UniformSlot;
use super::uniform::{UniformOverrides, UniformValue};

/// Per-object uniform values bound against a shared material.
///
/// The binding list always holds exactly one entry per slot of the current
/// material, in slot order.
#[derive(Debug)]
pub struct MaterialInstance {
    name: String,
    material: Rc<Material>,
    overrides: UniformOverrides,
    bindings: Vec<UniformBinding>,
    warnings: Vec<MaterialError>,
}

impl MaterialInstance {
    /// Create an instance and link `overrides` against `material`.
    ///
    /// Fails with [`MaterialError::MissingMaterial`] when there is no
    /// material or it has been deleted.
    pub fn create(
        name: impl Into<String>,
        material: Option<Rc<Material>>,
        overrides: UniformOverrides,
    ) -> Result<Self, MaterialError> {
        let name = name.into();
        let Some(material) = material else {
            log::error!("material instance '{name}' created without a material");
            return Err(MaterialError::MissingMaterial { instance: name });
        };
        let linked = Self::link_for(&name, &material, &overrides)?;

        log::info!(
            "material instance '{name}' linked against '{}' ({} bindings)",
            material.name(),
            linked.bindings.len()
        );
        Ok(Self {
            name,
            material,
            overrides,
            bindings: linked.bindings,
            warnings: linked.warnings,
        })
    }

    fn link_for(
        name: &str,
        material: &Material,
        overrides: &UniformOverrides,
    ) -> Result<linker::LinkedUniforms, MaterialError> {
        linker::link(material, overrides).map_err(|e| match e {
            MaterialError::MaterialDeleted { .. } => {
                log::error!(
                    "material instance '{name}': material '{}' is not loaded",
                    material.name()
                );
                MaterialError::MissingMaterial {
                    instance: name.to_string(),
                }
            }
            other => other,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn material(&self) -> &Rc<Material> {
        &self.material
    }

    /// The override values this instance was created with.
    pub fn overrides(&self) -> &UniformOverrides {
        &self.overrides
    }

    /// Type mismatches reported by the last link.
    pub fn link_warnings(&self) -> &[MaterialError] {
        &self.warnings
    }

    /// Rebind to another material, relinking the same overrides.
    ///
    /// Passing the current material is a no-op. On error the instance
    /// keeps its previous material and bindings.
    pub fn set_material(&mut self, material: Rc<Material>) -> Result<(), MaterialError> {
        if Rc::ptr_eq(&self.material, &material) {
            return Ok(());
        }
        let linked = Self::link_for(&self.name, &material, &self.overrides)?;

        log::info!(
            "material instance '{}' moved from '{}' to '{}'",
            self.name,
            self.material.name(),
            material.name()
        );
        self.material = material;
        self.bindings = linked.bindings;
        self.warnings = linked.warnings;
        Ok(())
    }

    /// Replace the overrides and relink against the current material.
    pub fn set_overrides(&mut self, overrides: UniformOverrides) -> Result<(), MaterialError> {
        let linked = Self::link_for(&self.name, &self.material, &overrides)?;
        self.overrides = overrides;
        self.bindings = linked.bindings;
        self.warnings = linked.warnings;
        Ok(())
    }

    /// Linked `(slot, value)` pairs in slot order.
    pub fn bindings(&self) -> impl Iterator<Item = (&UniformSlot, &UniformValue)> + '_ {
        let slots = self.material.slots();
        self.bindings
            .iter()
            .map(move |binding| (&slots[binding.slot], &binding.value))
    }

    pub fn binding_count(&self) -> usize {
        self.bindings.len()
    }

    /// Make the material's program current.
    pub fn use_program(&self, backend: &mut dyn ShaderBackend) -> Result<(), MaterialError> {
        self.ensure_loaded()?;
        self.material.use_program(backend)
    }

    /// Push every binding to the GPU in slot order.
    ///
    /// The program must already be current. A slot that fails to bind is
    /// logged and skipped; the rest of the bindings are still issued.
    pub fn bind(&self, backend: &mut dyn ShaderBackend) -> Result<(), MaterialError> {
        self.ensure_loaded()?;
        for (slot, value) in self.bindings() {
            if let Err(e) = slot.bind(backend, value) {
                log::error!("material instance '{}': {e}", self.name);
            }
        }
        Ok(())
    }

    /// Issue one binding immediately without storing the value.
    pub fn bind_uniform(
        &self,
        backend: &mut dyn ShaderBackend,
        name: &str,
        value: &UniformValue,
    ) -> Result<(), MaterialError> {
        self.ensure_loaded()?;
        let slot = self
            .material
            .slot(name)
            .ok_or_else(|| self.unknown_uniform(name))?;
        slot.bind(backend, value)
    }

    /// Replace the value of one linked binding.
    ///
    /// Unknown names and wrong kinds are rejected and leave every binding
    /// unchanged. The overrides are not touched, so a later relink restores
    /// the original value.
    pub fn set_uniform(&mut self, name: &str, value: UniformValue) -> Result<(), MaterialError> {
        let Some(slot) = self.material.slot(name) else {
            let error = self.unknown_uniform(name);
            log::error!("{error}");
            return Err(error);
        };
        if slot.kind() != value.kind() {
            let error = MaterialError::UniformTypeMismatch {
                name: name.to_string(),
                expected: slot.kind(),
                found: value.kind(),
            };
            log::error!("material instance '{}': {error}", self.name);
            return Err(error);
        }

        let index = slot.index();
        if let Some(binding) = self.bindings.iter_mut().find(|b| b.slot == index) {
            binding.value = value;
        }
        Ok(())
    }

    /// Current linked value of a uniform.
    pub fn get_uniform(&self, name: &str) -> Result<&UniformValue, MaterialError> {
        let index = self
            .material
            .registry()
            .index_of(name)
            .ok_or_else(|| self.unknown_uniform(name))?;
        self.bindings
            .iter()
            .find(|b| b.slot == index)
            .map(|b| &b.value)
            .ok_or_else(|| self.unknown_uniform(name))
    }

    /// Schema: `name`, `material`, then one editable entry per binding.
    pub fn attributes(&self) -> Vec<Attribute> {
        let mut attributes = vec![
            Attribute::text("name", self.name.as_str()),
            Attribute::text("material", self.material.name()),
        ];
        attributes.extend(
            self.bindings()
                .map(|(slot, value)| Attribute::uniform(slot.name(), *value)),
        );
        attributes
    }

    fn ensure_loaded(&self) -> Result<(), MaterialError> {
        if self.material.is_loaded() {
            Ok(())
        } else {
            log::error!(
                "material instance '{}': material '{}' was deleted",
                self.name,
                self.material.name()
            );
            Err(MaterialError::MissingMaterial {
                instance: self.name.clone(),
            })
        }
    }

    fn unknown_uniform(&self, name: &str) -> MaterialError {
        MaterialError::UnknownUniformName {
            owner: self.name.clone(),
            name: name.to_string(),
        }
    }
}
