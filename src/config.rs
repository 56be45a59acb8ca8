//! Runtime configuration with TOML support.
//!
//! Every field has a default, so partial files (e.g. only `glsl_version`)
//! load correctly.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::MaterialError;
use crate::material::DEFAULT_MAX_TEXTURE_UNITS;
use crate::shader::ShaderDef;

/// Settings shared by every material built through a
/// [`ResourceRegistry`](crate::resources::ResourceRegistry).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Texture units available to one material.
    pub max_texture_units: u32,
    /// `#version` emitted for sources that carry none (e.g. `"330 core"`).
    pub glsl_version: Option<String>,
    /// Defines applied to every composed shader, before per-material ones.
    pub defines: BTreeMap<String, String>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_texture_units: DEFAULT_MAX_TEXTURE_UNITS,
            glsl_version: None,
            defines: BTreeMap::new(),
        }
    }
}

impl RuntimeConfig {
    /// Parse a configuration from TOML text. Missing fields use defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, MaterialError> {
        let config: Self =
            toml::from_str(content).map_err(|e| MaterialError::Config(e.to_string()))?;
        if config.max_texture_units == 0 {
            return Err(MaterialError::Config(
                "max_texture_units must be at least 1".to_string(),
            ));
        }
        Ok(config)
    }

    /// Load a configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, MaterialError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| MaterialError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Serialize to pretty TOML.
    pub fn to_toml_string(&self) -> Result<String, MaterialError> {
        toml::to_string_pretty(self).map_err(|e| MaterialError::Config(e.to_string()))
    }

    /// Global defines as composer definitions, in name order.
    pub fn shader_defs(&self) -> Vec<(String, ShaderDef)> {
        self.defines
            .iter()
            .map(|(name, value)| (name.clone(), ShaderDef::Text(value.clone())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.max_texture_units, 16);
        assert_eq!(config.glsl_version, None);
        assert!(config.defines.is_empty());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config = RuntimeConfig::from_toml_str("glsl_version = \"330 core\"\n").unwrap();
        assert_eq!(config.glsl_version.as_deref(), Some("330 core"));
        assert_eq!(config.max_texture_units, 16);
    }

    #[test]
    fn test_defines_table() {
        let config = RuntimeConfig::from_toml_str(
            "max_texture_units = 8\n[defines]\nMAX_LIGHTS = \"4\"\nUSE_FOG = \"\"\n",
        )
        .unwrap();
        assert_eq!(config.max_texture_units, 8);
        assert_eq!(
            config.shader_defs(),
            [
                ("MAX_LIGHTS".to_string(), ShaderDef::Text("4".to_string())),
                ("USE_FOG".to_string(), ShaderDef::Text(String::new())),
            ]
        );
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        assert!(matches!(
            RuntimeConfig::from_toml_str("max_texture_units = \"many\""),
            Err(MaterialError::Config(_))
        ));
        assert!(matches!(
            RuntimeConfig::from_toml_str("max_texture_units = 0"),
            Err(MaterialError::Config(_))
        ));
    }

    #[test]
    fn test_round_trips_through_toml() {
        let mut config = RuntimeConfig::default();
        config.defines.insert("QUALITY".to_string(), "2".to_string());
        let text = config.to_toml_string().unwrap();
        assert_eq!(RuntimeConfig::from_toml_str(&text).unwrap(), config);
    }
}
