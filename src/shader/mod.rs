//! Shader templating and interface discovery.
//!
//! - [`ShaderComposer`] expands `#include` directives and injects `#define`s
//!   (stage macro plus user macros) before a stage is handed to the driver.
//! - [`preprocess`] evaluates conditional directives so only compiled text
//!   is scanned.
//! - [`ShaderInterface`] scans composed GLSL for `uniform <type> <name>;`
//!   declarations, in source order.
//!
//! # Example
//!
//! ```ignore
//! let mut composer = ShaderComposer::new();
//! composer.register_include("common/camera.glsl", "uniform mat4 view_projection;");
//!
//! let vertex = composer.compose(source, ShaderStage::Vertex, &[("USE_SKINNING", ShaderDef::Bool(true))])?;
//! let fragment = composer.compose(source, ShaderStage::Fragment, &[])?;
//! let interface = ShaderInterface::parse_stages(&[&vertex, &fragment]);
//! ```

mod interface;
mod preprocess;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use crate::error::MaterialError;

pub use interface::{ShaderInterface, UniformDeclaration};
pub use preprocess::preprocess;

/// Shader stage in the graphics pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    /// Vertex shader.
    Vertex,
    /// Fragment shader.
    Fragment,
}

impl ShaderStage {
    /// Macro defined while composing this stage.
    pub fn define_name(&self) -> &'static str {
        match self {
            ShaderStage::Vertex => "VERTEX",
            ShaderStage::Fragment => "FRAGMENT",
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => write!(f, "vertex"),
            ShaderStage::Fragment => write!(f, "fragment"),
        }
    }
}

/// Shader definition value for compile-time conditionals.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShaderDef {
    /// Boolean definition (`#ifdef`, `#ifndef`).
    Bool(bool),
    /// Integer definition (`#if VAR == 5`).
    Int(i32),
    /// Unsigned integer definition.
    UInt(u32),
    /// Raw replacement text.
    Text(String),
}

impl ShaderDef {
    /// The `#define` body, or `None` when the macro must stay undefined.
    fn value(&self) -> Option<String> {
        match self {
            ShaderDef::Bool(true) => Some(String::new()),
            ShaderDef::Bool(false) => None,
            ShaderDef::Int(v) => Some(v.to_string()),
            ShaderDef::UInt(v) => Some(v.to_string()),
            ShaderDef::Text(v) => Some(v.clone()),
        }
    }
}

impl From<bool> for ShaderDef {
    fn from(v: bool) -> Self {
        ShaderDef::Bool(v)
    }
}

impl From<i32> for ShaderDef {
    fn from(v: i32) -> Self {
        ShaderDef::Int(v)
    }
}

impl From<u32> for ShaderDef {
    fn from(v: u32) -> Self {
        ShaderDef::UInt(v)
    }
}

impl From<&str> for ShaderDef {
    fn from(v: &str) -> Self {
        ShaderDef::Text(v.to_string())
    }
}

/// Shader composer for resolving includes and injecting defines.
///
/// # Include Syntax
///
/// ```glsl
/// #include "common/camera.glsl"
/// #include <common/lighting.glsl>
/// ```
///
/// # Multi-Stage Shaders
///
/// A single GLSL file can contain both stages using `#ifdef VERTEX` /
/// `#ifdef FRAGMENT` blocks. The composer defines the stage macro.
#[derive(Debug, Default)]
pub struct ShaderComposer {
    /// Registered include sources: path -> source text.
    includes: HashMap<String, String>,
    /// `#version` written when a source has none.
    default_version: Option<String>,
}

impl ShaderComposer {
    /// Create a new empty shader composer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the `#version` used for sources without one (e.g. `"330 core"`).
    pub fn with_default_version(mut self, version: impl Into<String>) -> Self {
        self.default_version = Some(version.into());
        self
    }

    /// Register a single include source.
    ///
    /// The path is what appears in `#include "path"` directives.
    pub fn register_include(&mut self, path: &str, source: &str) {
        self.includes.insert(path.to_string(), source.to_string());
    }

    /// Whether an include path is registered.
    pub fn has_include(&self, path: &str) -> bool {
        self.includes.contains_key(path)
    }

    /// Compose one stage of a GLSL shader.
    ///
    /// The `#version` line stays first, followed by the stage define, the
    /// user defines sorted by name, and then the include-resolved body.
    /// Each name is defined once; the last entry for a name wins.
    pub fn compose(
        &self,
        source: &str,
        stage: ShaderStage,
        shader_defs: &[(&str, ShaderDef)],
    ) -> Result<String, MaterialError> {
        let mut included = HashSet::new();
        let resolved = self.resolve_includes(source, &mut included)?;

        let (version, body) = split_version(&resolved);
        let mut result = String::with_capacity(resolved.len() + 64);
        match (version, &self.default_version) {
            (Some(line), _) => {
                result.push_str(line);
                result.push('\n');
            }
            (None, Some(default)) => {
                result.push_str("#version ");
                result.push_str(default);
                result.push('\n');
            }
            (None, None) => {}
        }

        result.push_str("#define ");
        result.push_str(stage.define_name());
        result.push('\n');

        // A later definition of a name replaces an earlier one.
        let mut defines: BTreeMap<&str, &ShaderDef> = BTreeMap::new();
        for (name, def) in shader_defs {
            defines.insert(*name, def);
        }

        for (name, def) in defines {
            if let Some(value) = def.value() {
                result.push_str("#define ");
                result.push_str(name);
                if !value.is_empty() {
                    result.push(' ');
                    result.push_str(&value);
                }
                result.push('\n');
            }
        }

        result.push_str(body);
        Ok(result)
    }

    /// Resolve `#include "path"` directives recursively.
    fn resolve_includes(
        &self,
        source: &str,
        included: &mut HashSet<String>,
    ) -> Result<String, MaterialError> {
        let mut result = String::with_capacity(source.len());

        for line in source.lines() {
            let trimmed = line.trim();
            if let Some(path) = parse_include_directive(trimmed) {
                // Skip if already included (prevent double-inclusion)
                if included.contains(path) {
                    continue;
                }
                included.insert(path.to_string());

                let include_source = self
                    .includes
                    .get(path)
                    .ok_or_else(|| MaterialError::MissingInclude(path.to_string()))?;

                let resolved = self.resolve_includes(include_source, included)?;
                result.push_str(&resolved);
            } else {
                result.push_str(line);
                result.push('\n');
            }
        }

        Ok(result)
    }
}

/// Split off a leading `#version` line, skipping blank lines before it.
fn split_version(source: &str) -> (Option<&str>, &str) {
    let trimmed = source.trim_start();
    if trimmed.starts_with("#version") {
        match trimmed.find('\n') {
            Some(end) => (Some(trimmed[..end].trim_end()), &trimmed[end + 1..]),
            None => (Some(trimmed.trim_end()), ""),
        }
    } else {
        (None, source)
    }
}

/// Parse a `#include "path"` directive, returning the path if found.
fn parse_include_directive(line: &str) -> Option<&str> {
    let rest = line.strip_prefix("#include")?;
    let rest = rest.trim();
    // Support both #include "path" and #include <path>
    if let Some(inner) = rest.strip_prefix('"') {
        inner.strip_suffix('"')
    } else if let Some(inner) = rest.strip_prefix('<') {
        inner.strip_suffix('>')
    } else {
        None
    }
}

/// Remove `//` and `/* */` comments, keeping newlines so line numbers hold.
pub(crate) fn strip_comments(source: &str) -> String {
    let mut result = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '/' {
            match chars.peek() {
                Some('/') => {
                    for next in chars.by_ref() {
                        if next == '\n' {
                            result.push('\n');
                            break;
                        }
                    }
                    continue;
                }
                Some('*') => {
                    chars.next();
                    let mut previous = '\0';
                    for next in chars.by_ref() {
                        if next == '\n' {
                            result.push('\n');
                        }
                        if previous == '*' && next == '/' {
                            break;
                        }
                        previous = next;
                    }
                    result.push(' ');
                    continue;
                }
                _ => {}
            }
        }
        result.push(c);
    }

    result
}

pub(crate) fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Whether `word` occurs in `text` as a whole identifier.
pub(crate) fn contains_word(text: &str, word: &str) -> bool {
    if word.is_empty() {
        return false;
    }
    text.match_indices(word).any(|(start, _)| {
        let before = text[..start].chars().next_back();
        let after = text[start + word.len()..].chars().next();
        !before.is_some_and(is_identifier_char) && !after.is_some_and(is_identifier_char)
    })
}
