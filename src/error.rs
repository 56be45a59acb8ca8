//! Error types for material building, linking and binding.
//!
//! Build-time errors (compile, link, parse) fail the material or instance
//! being built and are returned to the caller. Binding errors are reported
//! per uniform and never abort a whole draw.

use thiserror::Error;

use crate::backend::BackendError;
use crate::material::UniformKind;
use crate::shader::ShaderStage;

/// Errors produced by the material runtime.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MaterialError {
    /// A shader stage was rejected by the driver.
    #[error("material '{material}': {stage} shader failed to compile: {log}")]
    ShaderCompile {
        material: String,
        stage: ShaderStage,
        log: String,
    },

    /// The program could not be linked.
    #[error("material '{material}': program link failed: {log}")]
    ShaderLink { material: String, log: String },

    /// A `uniform` declaration used a type with no known uniform kind.
    #[error("unknown uniform type '{type_name}' for uniform '{name}'")]
    UnknownUniformType { type_name: String, name: String },

    /// The same uniform name was declared with two different types.
    #[error("uniform '{name}' redeclared as '{second}' (first declared as '{first}')")]
    ConflictingUniformDeclaration {
        name: String,
        first: String,
        second: String,
    },

    /// A sampler needed a texture unit beyond the configured limit.
    #[error("sampler '{name}' exceeds the limit of {limit} texture units")]
    TextureUnitsExhausted { name: String, limit: u32 },

    /// The instance has no valid material to link or bind against.
    #[error("material instance '{instance}' has no valid material")]
    MissingMaterial { instance: String },

    /// The material was deleted and has no program left.
    #[error("material '{material}' has been deleted")]
    MaterialDeleted { material: String },

    /// A value's kind does not match the uniform slot it was given to.
    #[error("uniform '{name}' expects {expected}, got {found}")]
    UniformTypeMismatch {
        name: String,
        expected: UniformKind,
        found: UniformKind,
    },

    /// No uniform with this name exists in the material registry.
    #[error("'{owner}' has no uniform variable '{name}'")]
    UnknownUniformName { owner: String, name: String },

    /// Text could not be converted into a uniform value.
    #[error("invalid {kind} value for '{name}': {reason}")]
    InvalidUniformValue {
        name: String,
        kind: UniformKind,
        reason: String,
    },

    /// An `#include` directive named a path that was never registered.
    #[error("include not found: \"{0}\"")]
    MissingInclude(String),

    /// A shader program name was never registered.
    #[error("shader '{0}' is not registered")]
    UnknownShader(String),

    /// A material instance data file could not be read.
    #[error("material instance data error: {0}")]
    InstanceData(String),

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),

    /// The backend failed outside of shader compilation or linking.
    #[error(transparent)]
    Backend(#[from] BackendError),
}

pub type MaterialResult<T> = Result<T, MaterialError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MaterialError::ShaderCompile {
            material: "default".to_string(),
            stage: ShaderStage::Vertex,
            log: "0:3: error: unexpected '}'".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "material 'default': vertex shader failed to compile: 0:3: error: unexpected '}'"
        );

        let err = MaterialError::UniformTypeMismatch {
            name: "color".to_string(),
            expected: UniformKind::Vec4,
            found: UniformKind::Float,
        };
        assert_eq!(err.to_string(), "uniform 'color' expects vec4, got float");

        let err = MaterialError::MaterialDeleted {
            material: "unlit".to_string(),
        };
        assert_eq!(err.to_string(), "material 'unlit' has been deleted");
    }

    #[test]
    fn test_backend_error_is_transparent() {
        let err: MaterialError = BackendError::ResourceCreationFailed("program".into()).into();
        assert_eq!(err.to_string(), "failed to create resource: program");
    }
}
