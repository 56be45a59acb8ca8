//! Uniform slots resolved against one linked program.
//!
//! A [`UniformRegistry`] holds the slots of a single material in
//! declaration order. Order is explicit: every slot carries its sequential
//! index, and name lookups go through a separate index map.

use std::collections::HashMap;

use crate::backend::{ProgramHandle, ShaderBackend, UniformLocation};
use crate::error::MaterialError;
use crate::shader::UniformDeclaration;

use super::texture_units::{TextureUnit, TextureUnitAllocator};
use super::uniform::{UniformKind, UniformValue};

/// One uniform of a linked program.
#[derive(Debug, Clone, PartialEq)]
pub struct UniformSlot {
    index: usize,
    name: String,
    kind: UniformKind,
    location: Option<UniformLocation>,
    texture_unit: Option<TextureUnit>,
}

impl UniformSlot {
    /// Position in the registry (declaration order).
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> UniformKind {
        self.kind
    }

    /// GPU location, `None` when the driver reported the uniform inactive.
    pub fn location(&self) -> Option<UniformLocation> {
        self.location
    }

    /// Whether binding this slot issues any GPU call.
    pub fn is_bound(&self) -> bool {
        self.location.is_some()
    }

    /// Texture unit reserved for a sampler slot.
    pub fn texture_unit(&self) -> Option<TextureUnit> {
        self.texture_unit
    }

    /// Push one value to the GPU.
    ///
    /// The owning program must already be current. Slots without a
    /// location are a no-op. A value of the wrong kind is rejected before
    /// any call is issued.
    pub fn bind(
        &self,
        backend: &mut dyn ShaderBackend,
        value: &UniformValue,
    ) -> Result<(), MaterialError> {
        if value.kind() != self.kind {
            return Err(MaterialError::UniformTypeMismatch {
                name: self.name.clone(),
                expected: self.kind,
                found: value.kind(),
            });
        }
        let Some(location) = self.location else {
            return Ok(());
        };

        match value {
            UniformValue::Float(v) => backend.set_uniform_float(location, *v),
            UniformValue::Int(v) => backend.set_uniform_int(location, *v),
            UniformValue::Vec2(v) => backend.set_uniform_vec2(location, *v),
            UniformValue::Vec3(v) => backend.set_uniform_vec3(location, *v),
            UniformValue::Vec4(v) => backend.set_uniform_vec4(location, *v),
            UniformValue::Mat3(v) => backend.set_uniform_mat3(location, v),
            UniformValue::Mat4(v) => backend.set_uniform_mat4(location, v),
            UniformValue::Texture2D(texture) => {
                // Every sampler slot built by the registry owns a unit.
                let Some(unit) = self.texture_unit else {
                    log::error!("sampler '{}' has no texture unit, not bound", self.name);
                    return Ok(());
                };
                backend.active_texture(unit.index());
                backend.bind_texture_2d(*texture);
                backend.set_uniform_int(location, unit.index() as i32);
            }
        }
        Ok(())
    }
}

/// The ordered slots of one material.
#[derive(Debug, Clone, Default)]
pub struct UniformRegistry {
    slots: Vec<UniformSlot>,
    by_name: HashMap<String, usize>,
}

impl UniformRegistry {
    /// Resolve every declaration against a linked program.
    ///
    /// Samplers receive their texture units in declaration order. Returns
    /// the registry plus the declarations that had to be dropped.
    pub fn build(
        backend: &mut dyn ShaderBackend,
        program: ProgramHandle,
        declarations: &[UniformDeclaration],
        allocator: &mut TextureUnitAllocator,
    ) -> (Self, Vec<MaterialError>) {
        let mut registry = Self::default();
        let mut errors = Vec::new();

        for declaration in declarations {
            if registry.by_name.contains_key(&declaration.name) {
                continue;
            }

            let location = backend.uniform_location(program, &declaration.name);
            if location.is_none() {
                log::debug!(
                    "uniform '{}' has no location (inactive), binding it is a no-op",
                    declaration.name
                );
            }

            let texture_unit = if declaration.kind.is_sampler() {
                match allocator.allocate() {
                    Some(unit) => Some(unit),
                    None => {
                        errors.push(MaterialError::TextureUnitsExhausted {
                            name: declaration.name.clone(),
                            limit: allocator.limit(),
                        });
                        continue;
                    }
                }
            } else {
                None
            };

            registry.push(UniformSlot {
                index: registry.slots.len(),
                name: declaration.name.clone(),
                kind: declaration.kind,
                location,
                texture_unit,
            });
        }

        (registry, errors)
    }

    fn push(&mut self, slot: UniformSlot) {
        self.by_name.insert(slot.name.clone(), slot.index);
        self.slots.push(slot);
    }

    /// Slots in declaration order.
    pub fn slots(&self) -> &[UniformSlot] {
        &self.slots
    }

    pub fn iter(&self) -> std::slice::Iter<'_, UniformSlot> {
        self.slots.iter()
    }

    /// Look up a slot by name.
    pub fn get(&self, name: &str) -> Option<&UniformSlot> {
        self.by_name.get(name).map(|&index| &self.slots[index])
    }

    /// Index of the named slot.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl<'a> IntoIterator for &'a UniformRegistry {
    type Item = &'a UniformSlot;
    type IntoIter = std::slice::Iter<'a, UniformSlot>;

    fn into_iter(self) -> Self::IntoIter {
        self.slots.iter()
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec4;

    use super::*;
    use crate::backend::{BackendCall, DummyBackend, TextureHandle};
    use crate::shader::{ShaderInterface, ShaderStage};

    const VS: &str = "uniform mat4 mvp;\nvoid main() { gl_Position = mvp * vec4(1.0); }\n";
    const FS: &str = r#"
uniform sampler2D tex0;
uniform vec4 tint;
uniform sampler2D tex1;
uniform float unused;
void main() { gl_FragColor = texture2D(tex0, vec2(0.0)) * texture2D(tex1, vec2(0.0)) * tint; }
"#;

    fn build(limit: u32) -> (DummyBackend, UniformRegistry, Vec<MaterialError>) {
        let mut backend = DummyBackend::new();
        let vs = backend.compile_shader(ShaderStage::Vertex, VS).unwrap();
        let fs = backend.compile_shader(ShaderStage::Fragment, FS).unwrap();
        let program = backend.create_program().unwrap();
        backend.attach_shader(program, vs);
        backend.attach_shader(program, fs);
        backend.link_program(program).unwrap();

        let interface = ShaderInterface::parse(&format!("{VS}\n{FS}"));
        let mut allocator = TextureUnitAllocator::new(limit);
        let (registry, errors) =
            UniformRegistry::build(&mut backend, program, interface.declarations(), &mut allocator);
        (backend, registry, errors)
    }

    #[test]
    fn test_registry_order_and_lookup() {
        let (_, registry, errors) = build(16);
        assert!(errors.is_empty());

        let names: Vec<&str> = registry.iter().map(UniformSlot::name).collect();
        assert_eq!(names, ["mvp", "tex0", "tint", "tex1", "unused"]);
        for (i, slot) in registry.iter().enumerate() {
            assert_eq!(slot.index(), i);
        }
        assert_eq!(registry.index_of("tint"), Some(2));
        assert_eq!(registry.get("tint").map(UniformSlot::kind), Some(UniformKind::Vec4));
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn test_sampler_units_in_declaration_order() {
        let (_, registry, _) = build(16);
        let tex0 = registry.get("tex0").unwrap().texture_unit().unwrap();
        let tex1 = registry.get("tex1").unwrap().texture_unit().unwrap();
        assert_eq!(tex0.index(), 0);
        assert_eq!(tex1.index(), 1);
        assert_eq!(registry.get("tint").unwrap().texture_unit(), None);
    }

    #[test]
    fn test_inactive_uniform_is_unbound_slot() {
        let (mut backend, registry, _) = build(16);
        let unused = registry.get("unused").unwrap();
        assert!(!unused.is_bound());

        backend.clear_calls();
        unused
            .bind(&mut backend, &UniformValue::Float(1.0))
            .unwrap();
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn test_texture_unit_limit_drops_sampler() {
        let (_, registry, errors) = build(1);
        assert!(registry.get("tex0").is_some());
        assert!(registry.get("tex1").is_none());
        assert_eq!(
            errors,
            [MaterialError::TextureUnitsExhausted {
                name: "tex1".to_string(),
                limit: 1
            }]
        );
        // indices stay dense after a dropped declaration
        assert_eq!(registry.get("unused").unwrap().index(), 3);
    }

    #[test]
    fn test_sampler_bind_sequence() {
        let (mut backend, registry, _) = build(16);
        let tex1 = registry.get("tex1").unwrap();
        let texture = TextureHandle::from_raw(42);

        backend.clear_calls();
        tex1.bind(&mut backend, &UniformValue::Texture2D(texture))
            .unwrap();

        let location = tex1.location().unwrap();
        assert_eq!(
            backend.calls(),
            [
                BackendCall::ActiveTexture(1),
                BackendCall::BindTexture2d(texture),
                BackendCall::SetInt { location, value: 1 },
            ]
        );
    }

    #[test]
    fn test_bind_rejects_wrong_kind() {
        let (mut backend, registry, _) = build(16);
        backend.clear_calls();
        let result = registry
            .get("tint")
            .unwrap()
            .bind(&mut backend, &UniformValue::Float(1.0));

        assert!(matches!(
            result,
            Err(MaterialError::UniformTypeMismatch { expected: UniformKind::Vec4, found: UniformKind::Float, .. })
        ));
        assert!(backend.calls().is_empty());

        registry
            .get("tint")
            .unwrap()
            .bind(&mut backend, &UniformValue::Vec4(Vec4::ONE))
            .unwrap();
        assert_eq!(backend.calls().len(), 1);
    }

    #[test]
    fn test_sampler_without_unit_binds_nothing() {
        let (mut backend, registry, _) = build(16);
        let slot = UniformSlot {
            texture_unit: None,
            ..registry.get("tex0").unwrap().clone()
        };

        backend.clear_calls();
        slot.bind(&mut backend, &UniformValue::Texture2D(TextureHandle::from_raw(7)))
            .unwrap();
        assert!(backend.calls().is_empty());
    }
}
