//! Linking instance overrides against a material's slots.

use crate::error::MaterialError;

use super::material::Material;
use super::uniform::{UniformOverrides, UniformValue};

/// One linked `(slot, value)` pair. `slot` indexes the material registry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniformBinding {
    pub slot: usize,
    pub value: UniformValue,
}

/// Result of linking: one binding per slot plus the rejected overrides.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkedUniforms {
    pub bindings: Vec<UniformBinding>,
    pub warnings: Vec<MaterialError>,
}

/// Pair every slot of `material` with an override or its kind's default.
///
/// Overrides for names the material does not declare are ignored. An
/// override of the wrong kind is reported in `warnings` and the default
/// is used instead.
pub fn link(
    material: &Material,
    overrides: &UniformOverrides,
) -> Result<LinkedUniforms, MaterialError> {
    if !material.is_loaded() {
        return Err(MaterialError::MaterialDeleted {
            material: material.name().to_string(),
        });
    }

    let mut linked = LinkedUniforms {
        bindings: Vec::with_capacity(material.slots().len()),
        warnings: Vec::new(),
    };

    for slot in material.slots() {
        let default = slot.kind().default_value();
        let value = match overrides.get(slot.name()) {
            Some(value) if value.kind() == slot.kind() => *value,
            Some(value) => {
                let warning = MaterialError::UniformTypeMismatch {
                    name: slot.name().to_string(),
                    expected: slot.kind(),
                    found: value.kind(),
                };
                log::warn!("material '{}': {warning}, using default", material.name());
                linked.warnings.push(warning);
                default
            }
            None => default,
        };
        linked.bindings.push(UniformBinding {
            slot: slot.index(),
            value,
        });
    }

    Ok(linked)
}

#[cfg(test)]
mod tests {
    use glam::{Mat4, Vec4};

    use super::*;
    use crate::backend::{DummyBackend, TextureHandle};
    use crate::material::UniformKind;

    const VS: &str = "uniform mat4 mvp;\nvoid main() { gl_Position = mvp * vec4(1.0); }\n";
    const FS: &str = r#"
uniform vec4 color;
uniform sampler2D tex;
uniform int mode;
void main() { gl_FragColor = texture2D(tex, vec2(0.0)) * color * float(mode); }
"#;

    fn material(backend: &mut DummyBackend) -> Material {
        Material::compile_sources(backend, "lit", VS, FS).unwrap()
    }

    #[test]
    fn test_no_overrides_uses_defaults() {
        let mut backend = DummyBackend::new();
        let material = material(&mut backend);
        let linked = link(&material, &UniformOverrides::new()).unwrap();

        assert_eq!(linked.bindings.len(), material.slots().len());
        assert!(linked.warnings.is_empty());
        assert_eq!(linked.bindings[0].value, UniformValue::Mat4(Mat4::IDENTITY));
        assert_eq!(linked.bindings[1].value, UniformValue::Vec4(Vec4::ZERO));
        assert_eq!(linked.bindings[2].value, UniformValue::Texture2D(TextureHandle::NULL));
        assert_eq!(linked.bindings[3].value, UniformValue::Int(0));
        for (i, binding) in linked.bindings.iter().enumerate() {
            assert_eq!(binding.slot, i);
        }
    }

    #[test]
    fn test_matching_override_is_used() {
        let mut backend = DummyBackend::new();
        let material = material(&mut backend);
        let overrides = UniformOverrides::from([
            ("color".to_string(), UniformValue::Vec4(Vec4::ONE)),
            ("not_declared".to_string(), UniformValue::Float(2.0)),
        ]);
        let linked = link(&material, &overrides).unwrap();

        assert_eq!(linked.bindings.len(), 4);
        assert_eq!(linked.bindings[1].value, UniformValue::Vec4(Vec4::ONE));
        assert!(linked.warnings.is_empty());
    }

    #[test]
    fn test_mismatched_override_falls_back() {
        let mut backend = DummyBackend::new();
        let material = material(&mut backend);
        let overrides = UniformOverrides::from([("mode".to_string(), UniformValue::Float(1.0))]);
        let linked = link(&material, &overrides).unwrap();

        assert_eq!(linked.bindings[3].value, UniformValue::Int(0));
        assert_eq!(
            linked.warnings,
            [MaterialError::UniformTypeMismatch {
                name: "mode".to_string(),
                expected: UniformKind::Int,
                found: UniformKind::Float,
            }]
        );
    }

    #[test]
    fn test_deleted_material_cannot_link() {
        let mut backend = DummyBackend::new();
        let material = material(&mut backend);
        material.delete(&mut backend);

        assert_eq!(
            link(&material, &UniformOverrides::new()).err(),
            Some(MaterialError::MaterialDeleted {
                material: material.name().to_string()
            })
        );
    }
}
