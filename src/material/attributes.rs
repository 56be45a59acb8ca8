//! Enumerable attribute schema for materials and instances.
//!
//! Editors and debug views list these instead of reflecting on the types.

use std::fmt;

use super::uniform::UniformValue;

/// Value of one attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Text(String),
    Uniform(UniformValue),
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Text(text) => f.write_str(text),
            AttributeValue::Uniform(UniformValue::Float(v)) => write!(f, "{v}"),
            AttributeValue::Uniform(UniformValue::Int(v)) => write!(f, "{v}"),
            AttributeValue::Uniform(UniformValue::Texture2D(texture)) => {
                write!(f, "texture({})", texture.raw())
            }
            AttributeValue::Uniform(value) => {
                let components = value.as_f32_slice().unwrap_or_default();
                let parts: Vec<String> = components.iter().map(f32::to_string).collect();
                write!(f, "{}({})", value.kind(), parts.join(", "))
            }
        }
    }
}

/// One named entry of an attribute schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub value: AttributeValue,
    /// Whether an editor may change the value.
    pub read_only: bool,
}

impl Attribute {
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: AttributeValue::Text(value.into()),
            read_only: true,
        }
    }

    pub fn uniform(name: impl Into<String>, value: UniformValue) -> Self {
        Self {
            name: name.into(),
            value: AttributeValue::Uniform(value),
            read_only: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::{Vec2, Vec3};

    use super::*;
    use crate::backend::TextureHandle;

    #[test]
    fn test_display() {
        assert_eq!(Attribute::text("name", "brick").value.to_string(), "brick");
        assert_eq!(
            AttributeValue::Uniform(UniformValue::Vec2(Vec2::new(1.0, 0.5))).to_string(),
            "vec2(1, 0.5)"
        );
        assert_eq!(
            AttributeValue::Uniform(UniformValue::Vec3(Vec3::ZERO)).to_string(),
            "vec3(0, 0, 0)"
        );
        assert_eq!(
            AttributeValue::Uniform(UniformValue::Texture2D(TextureHandle::from_raw(3)))
                .to_string(),
            "texture(3)"
        );
        assert_eq!(AttributeValue::Uniform(UniformValue::Int(-2)).to_string(), "-2");
    }

    #[test]
    fn test_editability() {
        assert!(Attribute::text("material", "pbr").read_only);
        assert!(!Attribute::uniform("roughness", UniformValue::Float(0.5)).read_only);
    }
}
