//! Material instance data files.
//!
//! A data file is TOML:
//!
//! ```toml
//! [material]
//! name = "pbr"
//!
//! [define]
//! USE_NORMAL_MAP = true
//!
//! [vec4]
//! base_color = [1.0, 0.5, 0.5, 1.0]
//!
//! [float]
//! roughness = "0.4"
//!
//! [sampler2D]
//! albedo = "bricks"
//! ```
//!
//! Every table other than `material` and `define` is named after a GLSL
//! type and lists uniform values of that type. Problems with single entries
//! are recorded as diagnostics and the entry is skipped.

use toml::Value;

use crate::error::MaterialError;
use crate::material::{TextureLookup, UniformKind, UniformOverrides, UniformValue};
use crate::shader::ShaderDef;

const MATERIAL_TABLE: &str = "material";
const DEFINE_TABLE: &str = "define";

/// Parsed contents of one material instance data file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaterialInstanceData {
    /// Name of the shader program the material is built from.
    pub material: String,
    /// Defines for the material, in name order.
    pub defines: Vec<(String, ShaderDef)>,
    pub overrides: UniformOverrides,
    /// Entries that were skipped.
    pub diagnostics: Vec<MaterialError>,
}

impl MaterialInstanceData {
    /// Parse a data file. Texture names resolve through `textures`.
    pub fn parse(text: &str, textures: &dyn TextureLookup) -> Result<Self, MaterialError> {
        let table: toml::Table = text
            .parse()
            .map_err(|e: toml::de::Error| MaterialError::InstanceData(e.to_string()))?;

        let mut data = Self::default();
        for (section, value) in &table {
            let Value::Table(entries) = value else {
                data.skip(MaterialError::InstanceData(format!(
                    "top-level key '{section}' is not a table"
                )));
                continue;
            };
            match section.as_str() {
                MATERIAL_TABLE => data.material = material_name(entries)?,
                DEFINE_TABLE => data.read_defines(entries),
                _ => data.read_uniforms(section, entries, textures),
            }
        }

        if data.material.is_empty() {
            return Err(MaterialError::InstanceData(
                "missing [material] name".to_string(),
            ));
        }
        Ok(data)
    }

    fn skip(&mut self, error: MaterialError) {
        log::warn!("material instance data: {error}, skipped");
        self.diagnostics.push(error);
    }

    fn read_defines(&mut self, entries: &toml::Table) {
        for (name, value) in entries {
            let def = match value {
                Value::Boolean(v) => ShaderDef::Bool(*v),
                Value::String(v) => ShaderDef::Text(v.clone()),
                Value::Integer(v) => match i32::try_from(*v) {
                    Ok(v) => ShaderDef::Int(v),
                    Err(_) => ShaderDef::Text(v.to_string()),
                },
                Value::Float(v) => ShaderDef::Text(v.to_string()),
                other => {
                    self.skip(MaterialError::InstanceData(format!(
                        "define '{name}' has unsupported value {other}"
                    )));
                    continue;
                }
            };
            self.defines.push((name.clone(), def));
        }
        self.defines.sort();
    }

    fn read_uniforms(&mut self, section: &str, entries: &toml::Table, textures: &dyn TextureLookup) {
        let Some(kind) = UniformKind::from_glsl(section) else {
            for name in entries.keys() {
                self.skip(MaterialError::UnknownUniformType {
                    type_name: section.to_string(),
                    name: name.clone(),
                });
            }
            return;
        };

        for (name, value) in entries {
            match uniform_value(name, kind, value, textures) {
                Ok(value) => {
                    self.overrides.insert(name.clone(), value);
                }
                Err(e) => self.skip(e),
            }
        }
    }
}

fn material_name(entries: &toml::Table) -> Result<String, MaterialError> {
    match entries.get("name") {
        Some(Value::String(name)) if !name.is_empty() => Ok(name.clone()),
        _ => Err(MaterialError::InstanceData(
            "[material] needs a non-empty string 'name'".to_string(),
        )),
    }
}

/// Convert one TOML value into a uniform value of `kind`.
fn uniform_value(
    name: &str,
    kind: UniformKind,
    value: &Value,
    textures: &dyn TextureLookup,
) -> Result<UniformValue, MaterialError> {
    let invalid = |reason: String| MaterialError::InvalidUniformValue {
        name: name.to_string(),
        kind,
        reason,
    };

    match (kind, value) {
        (_, Value::String(text)) => UniformValue::parse(name, kind, text, textures),
        (UniformKind::Int, Value::Integer(v)) => i32::try_from(*v)
            .map(UniformValue::Int)
            .map_err(|_| invalid(format!("{v} is out of range"))),
        (UniformKind::Float, Value::Integer(v)) => Ok(UniformValue::Float(*v as f32)),
        (UniformKind::Float, Value::Float(v)) => Ok(UniformValue::Float(*v as f32)),
        (_, Value::Array(items)) => {
            let components = items
                .iter()
                .map(|item| match item {
                    Value::Float(v) => Ok(*v as f32),
                    Value::Integer(v) => Ok(*v as f32),
                    other => Err(invalid(format!("{other} is not a number"))),
                })
                .collect::<Result<Vec<f32>, _>>()?;
            UniformValue::from_components(name, kind, &components)
        }
        (_, other) => Err(invalid(format!("unsupported value {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use glam::{Vec3, Vec4};

    use super::*;
    use crate::backend::TextureHandle;

    fn textures() -> HashMap<String, TextureHandle> {
        HashMap::from([("bricks".to_string(), TextureHandle::from_raw(7))])
    }

    #[test]
    fn test_parse_full_file() {
        let text = r#"
[material]
name = "pbr"

[define]
USE_NORMAL_MAP = true
MAX_LIGHTS = 4

[vec4]
base_color = [1.0, 0.5, 0.5, 1]

[vec3]
emissive = "0.1, 0.2 0.3"

[float]
roughness = "0.4"
metallic = 1

[int]
mode = 2

[sampler2D]
albedo = "bricks"
"#;
        let data = MaterialInstanceData::parse(text, &textures()).unwrap();

        assert_eq!(data.material, "pbr");
        assert_eq!(
            data.defines,
            [
                ("MAX_LIGHTS".to_string(), ShaderDef::Int(4)),
                ("USE_NORMAL_MAP".to_string(), ShaderDef::Bool(true)),
            ]
        );
        assert_eq!(data.overrides["base_color"], UniformValue::Vec4(Vec4::new(1.0, 0.5, 0.5, 1.0)));
        assert_eq!(data.overrides["emissive"], UniformValue::Vec3(Vec3::new(0.1, 0.2, 0.3)));
        assert_eq!(data.overrides["roughness"], UniformValue::Float(0.4));
        assert_eq!(data.overrides["metallic"], UniformValue::Float(1.0));
        assert_eq!(data.overrides["mode"], UniformValue::Int(2));
        assert_eq!(
            data.overrides["albedo"],
            UniformValue::Texture2D(TextureHandle::from_raw(7))
        );
        assert!(data.diagnostics.is_empty());
    }

    #[test]
    fn test_bad_entries_are_skipped() {
        let text = r#"
[material]
name = "unlit"

[vec2]
offset = [1.0]
scale = "1 1"

[samplerCube]
sky = "clouds"

[sampler2D]
missing = "nowhere"
"#;
        let data = MaterialInstanceData::parse(text, &textures()).unwrap();

        assert_eq!(data.overrides.len(), 1);
        assert!(data.overrides.contains_key("scale"));
        assert_eq!(data.diagnostics.len(), 3);
        assert!(data.diagnostics.iter().any(|e| matches!(
            e,
            MaterialError::UnknownUniformType { type_name, .. } if type_name == "samplerCube"
        )));
    }

    #[test]
    fn test_keys_are_case_sensitive() {
        let text = "[material]\nname = \"m\"\n[float]\nRoughness = 0.5\nroughness = 0.25\n";
        let data = MaterialInstanceData::parse(text, &textures()).unwrap();
        assert_eq!(data.overrides["Roughness"], UniformValue::Float(0.5));
        assert_eq!(data.overrides["roughness"], UniformValue::Float(0.25));
    }

    #[test]
    fn test_missing_material_name() {
        let result = MaterialInstanceData::parse("[float]\nx = 1.0\n", &textures());
        assert!(matches!(result, Err(MaterialError::InstanceData(_))));
    }

    #[test]
    fn test_invalid_toml() {
        let result = MaterialInstanceData::parse("[material\nname = ", &textures());
        assert!(matches!(result, Err(MaterialError::InstanceData(_))));
    }
}
