//! Uniform kinds and values.

use std::collections::HashMap;
use std::fmt;

use glam::{Mat3, Mat4, Vec2, Vec3, Vec4};

use crate::backend::TextureHandle;
use crate::error::MaterialError;

/// The kind of a uniform slot, one per supported GLSL type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformKind {
    Float,
    Int,
    Vec2,
    Vec3,
    Vec4,
    Mat3,
    Mat4,
    Sampler2D,
}

impl UniformKind {
    /// All kinds, in declaration order of this enum.
    pub const ALL: [UniformKind; 8] = [
        UniformKind::Float,
        UniformKind::Int,
        UniformKind::Vec2,
        UniformKind::Vec3,
        UniformKind::Vec4,
        UniformKind::Mat3,
        UniformKind::Mat4,
        UniformKind::Sampler2D,
    ];

    /// Map a GLSL type token. Type tokens are case-sensitive.
    pub fn from_glsl(type_name: &str) -> Option<Self> {
        match type_name {
            "float" => Some(UniformKind::Float),
            "int" => Some(UniformKind::Int),
            "vec2" => Some(UniformKind::Vec2),
            "vec3" => Some(UniformKind::Vec3),
            "vec4" => Some(UniformKind::Vec4),
            "mat3" => Some(UniformKind::Mat3),
            "mat4" => Some(UniformKind::Mat4),
            "sampler2D" => Some(UniformKind::Sampler2D),
            _ => None,
        }
    }

    /// The GLSL type name.
    pub fn glsl_name(&self) -> &'static str {
        match self {
            UniformKind::Float => "float",
            UniformKind::Int => "int",
            UniformKind::Vec2 => "vec2",
            UniformKind::Vec3 => "vec3",
            UniformKind::Vec4 => "vec4",
            UniformKind::Mat3 => "mat3",
            UniformKind::Mat4 => "mat4",
            UniformKind::Sampler2D => "sampler2D",
        }
    }

    /// Number of `f32` components for float-based kinds.
    pub fn component_count(&self) -> Option<usize> {
        match self {
            UniformKind::Float => Some(1),
            UniformKind::Vec2 => Some(2),
            UniformKind::Vec3 => Some(3),
            UniformKind::Vec4 => Some(4),
            UniformKind::Mat3 => Some(9),
            UniformKind::Mat4 => Some(16),
            UniformKind::Int | UniformKind::Sampler2D => None,
        }
    }

    pub fn is_sampler(&self) -> bool {
        matches!(self, UniformKind::Sampler2D)
    }

    /// Entry of the default value table for this kind.
    ///
    /// Zero for scalars and vectors, identity for matrices, and the null
    /// texture for samplers.
    pub const fn default_value(self) -> UniformValue {
        match self {
            UniformKind::Float => UniformValue::Float(0.0),
            UniformKind::Int => UniformValue::Int(0),
            UniformKind::Vec2 => UniformValue::Vec2(Vec2::ZERO),
            UniformKind::Vec3 => UniformValue::Vec3(Vec3::ZERO),
            UniformKind::Vec4 => UniformValue::Vec4(Vec4::ZERO),
            UniformKind::Mat3 => UniformValue::Mat3(Mat3::IDENTITY),
            UniformKind::Mat4 => UniformValue::Mat4(Mat4::IDENTITY),
            UniformKind::Sampler2D => UniformValue::Texture2D(TextureHandle::NULL),
        }
    }
}

impl fmt::Display for UniformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.glsl_name())
    }
}

/// A concrete uniform value. Matrices are column-major.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Int(i32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat3(Mat3),
    Mat4(Mat4),
    Texture2D(TextureHandle),
}

/// Named per-instance override values.
pub type UniformOverrides = HashMap<String, UniformValue>;

/// Resolves texture names used in material instance data.
pub trait TextureLookup {
    fn texture(&self, name: &str) -> Option<TextureHandle>;
}

impl TextureLookup for HashMap<String, TextureHandle> {
    fn texture(&self, name: &str) -> Option<TextureHandle> {
        self.get(name).copied()
    }
}

impl UniformValue {
    /// The kind of slot this value can be bound to.
    pub fn kind(&self) -> UniformKind {
        match self {
            UniformValue::Float(_) => UniformKind::Float,
            UniformValue::Int(_) => UniformKind::Int,
            UniformValue::Vec2(_) => UniformKind::Vec2,
            UniformValue::Vec3(_) => UniformKind::Vec3,
            UniformValue::Vec4(_) => UniformKind::Vec4,
            UniformValue::Mat3(_) => UniformKind::Mat3,
            UniformValue::Mat4(_) => UniformKind::Mat4,
            UniformValue::Texture2D(_) => UniformKind::Sampler2D,
        }
    }

    /// Flat `f32` view of float-based values.
    pub fn as_f32_slice(&self) -> Option<&[f32]> {
        match self {
            UniformValue::Float(v) => Some(std::slice::from_ref(v)),
            UniformValue::Vec2(v) => Some(bytemuck::cast_slice(std::slice::from_ref(v))),
            UniformValue::Vec3(v) => Some(bytemuck::cast_slice(std::slice::from_ref(v))),
            UniformValue::Vec4(v) => Some(bytemuck::cast_slice(std::slice::from_ref(v))),
            UniformValue::Mat3(v) => Some(bytemuck::cast_slice(std::slice::from_ref(v))),
            UniformValue::Mat4(v) => Some(bytemuck::cast_slice(std::slice::from_ref(v))),
            UniformValue::Int(_) | UniformValue::Texture2D(_) => None,
        }
    }

    /// Build a float-based value from its components.
    pub fn from_components(
        name: &str,
        kind: UniformKind,
        components: &[f32],
    ) -> Result<Self, MaterialError> {
        let invalid = |reason: String| MaterialError::InvalidUniformValue {
            name: name.to_string(),
            kind,
            reason,
        };

        let expected = kind
            .component_count()
            .ok_or_else(|| invalid("not a floating-point kind".to_string()))?;
        if components.len() != expected {
            return Err(invalid(format!(
                "expected {expected} components, found {}",
                components.len()
            )));
        }

        Ok(match kind {
            UniformKind::Float => UniformValue::Float(components[0]),
            UniformKind::Vec2 => UniformValue::Vec2(Vec2::from_slice(components)),
            UniformKind::Vec3 => UniformValue::Vec3(Vec3::from_slice(components)),
            UniformKind::Vec4 => UniformValue::Vec4(Vec4::from_slice(components)),
            UniformKind::Mat3 => UniformValue::Mat3(Mat3::from_cols_slice(components)),
            UniformKind::Mat4 => UniformValue::Mat4(Mat4::from_cols_slice(components)),
            UniformKind::Int | UniformKind::Sampler2D => {
                return Err(invalid("not a floating-point kind".to_string()))
            }
        })
    }

    /// Parse a value from its text form.
    ///
    /// Numbers are separated by whitespace and/or commas. Sampler values
    /// are texture names resolved through `textures`.
    pub fn parse(
        name: &str,
        kind: UniformKind,
        text: &str,
        textures: &dyn TextureLookup,
    ) -> Result<Self, MaterialError> {
        let invalid = |reason: String| MaterialError::InvalidUniformValue {
            name: name.to_string(),
            kind,
            reason,
        };
        let text = text.trim();

        match kind {
            UniformKind::Int => text
                .parse::<i32>()
                .map(UniformValue::Int)
                .map_err(|e| invalid(format!("'{text}': {e}"))),
            UniformKind::Sampler2D => textures
                .texture(text)
                .map(UniformValue::Texture2D)
                .ok_or_else(|| invalid(format!("unknown texture '{text}'"))),
            _ => {
                let components = text
                    .split(|c: char| c == ',' || c.is_whitespace())
                    .filter(|s| !s.is_empty())
                    .map(|s| s.parse::<f32>().map_err(|e| invalid(format!("'{s}': {e}"))))
                    .collect::<Result<Vec<_>, _>>()?;
                Self::from_components(name, kind, &components)
            }
        }
    }
}

impl From<f32> for UniformValue {
    fn from(v: f32) -> Self {
        UniformValue::Float(v)
    }
}

impl From<i32> for UniformValue {
    fn from(v: i32) -> Self {
        UniformValue::Int(v)
    }
}

impl From<Vec2> for UniformValue {
    fn from(v: Vec2) -> Self {
        UniformValue::Vec2(v)
    }
}

impl From<Vec3> for UniformValue {
    fn from(v: Vec3) -> Self {
        UniformValue::Vec3(v)
    }
}

impl From<Vec4> for UniformValue {
    fn from(v: Vec4) -> Self {
        UniformValue::Vec4(v)
    }
}

impl From<Mat3> for UniformValue {
    fn from(v: Mat3) -> Self {
        UniformValue::Mat3(v)
    }
}

impl From<Mat4> for UniformValue {
    fn from(v: Mat4) -> Self {
        UniformValue::Mat4(v)
    }
}

impl From<TextureHandle> for UniformValue {
    fn from(v: TextureHandle) -> Self {
        UniformValue::Texture2D(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_textures() -> HashMap<String, TextureHandle> {
        HashMap::new()
    }

    #[test]
    fn test_glsl_names_round_trip() {
        for kind in UniformKind::ALL {
            assert_eq!(UniformKind::from_glsl(kind.glsl_name()), Some(kind));
        }
        assert_eq!(UniformKind::from_glsl("Vec4"), None);
        assert_eq!(UniformKind::from_glsl("samplerCube"), None);
    }

    #[test]
    fn test_default_value_table() {
        for kind in UniformKind::ALL {
            assert_eq!(kind.default_value().kind(), kind);
        }
        assert_eq!(
            UniformKind::Mat4.default_value(),
            UniformValue::Mat4(Mat4::IDENTITY)
        );
        assert_eq!(
            UniformKind::Sampler2D.default_value(),
            UniformValue::Texture2D(TextureHandle::NULL)
        );
    }

    #[test]
    fn test_parse_vectors() {
        let textures = no_textures();
        assert_eq!(
            UniformValue::parse("color", UniformKind::Vec4, "1.0, 0.5 0.25,1", &textures),
            Ok(UniformValue::Vec4(Vec4::new(1.0, 0.5, 0.25, 1.0)))
        );
        assert_eq!(
            UniformValue::parse("scale", UniformKind::Float, " 2.5 ", &textures),
            Ok(UniformValue::Float(2.5))
        );
        assert_eq!(
            UniformValue::parse("mode", UniformKind::Int, "3", &textures),
            Ok(UniformValue::Int(3))
        );
    }

    #[test]
    fn test_parse_matrix_is_column_major() {
        let text = "1 0 0 0  0 1 0 0  0 0 1 0  5 6 7 1";
        let value =
            UniformValue::parse("model", UniformKind::Mat4, text, &no_textures()).unwrap();
        assert_eq!(
            value,
            UniformValue::Mat4(Mat4::from_translation(Vec3::new(5.0, 6.0, 7.0)))
        );
    }

    #[test]
    fn test_parse_wrong_component_count() {
        let result = UniformValue::parse("color", UniformKind::Vec3, "1 2", &no_textures());
        assert!(matches!(
            result,
            Err(MaterialError::InvalidUniformValue { kind: UniformKind::Vec3, .. })
        ));
    }

    #[test]
    fn test_parse_texture_name() {
        let mut textures = no_textures();
        textures.insert("wool".to_string(), TextureHandle::from_raw(7));

        assert_eq!(
            UniformValue::parse("albedo", UniformKind::Sampler2D, "wool", &textures),
            Ok(UniformValue::Texture2D(TextureHandle::from_raw(7)))
        );
        assert!(UniformValue::parse("albedo", UniformKind::Sampler2D, "felt", &textures).is_err());
    }

    #[test]
    fn test_f32_slice() {
        let value = UniformValue::Vec3(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(value.as_f32_slice(), Some(&[1.0, 2.0, 3.0][..]));
        assert_eq!(UniformValue::Int(1).as_f32_slice(), None);
        assert_eq!(
            UniformValue::Mat3(Mat3::IDENTITY).as_f32_slice().map(<[f32]>::len),
            Some(9)
        );
    }
}
