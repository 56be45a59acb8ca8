//! Uniform interface discovery.
//!
//! Scans GLSL text for `uniform <type> <name>;` statements. The scan is a
//! small tokenizer rather than a pattern match so comments, preprocessor
//! lines, uniform blocks and function bodies never produce declarations.
//! Text in conditional branches that are not taken is removed first.

use std::collections::HashMap;

use crate::error::MaterialError;
use crate::material::UniformKind;

use super::{is_identifier_char, preprocess, strip_comments};

/// Precision qualifiers that may precede the type.
const PRECISION_QUALIFIERS: [&str; 3] = ["lowp", "mediump", "highp"];

/// One declared uniform, in first-seen order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformDeclaration {
    /// The GLSL type as written (qualifiers removed).
    pub type_name: String,
    /// The uniform name.
    pub name: String,
    /// The resolved uniform kind.
    pub kind: UniformKind,
}

/// The ordered uniform interface of one or more shader stages.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShaderInterface {
    declarations: Vec<UniformDeclaration>,
    errors: Vec<MaterialError>,
}

impl ShaderInterface {
    /// Parse one translation unit.
    ///
    /// Conditional directives are evaluated first, so declarations in
    /// branches that are not compiled are never seen. Declarations keep
    /// their order of first appearance; a name declared again with the
    /// same type collapses into the first declaration.
    pub fn parse(source: &str) -> Self {
        Self::parse_stages(&[source])
    }

    /// Parse several stages of one program as a single interface.
    ///
    /// Each stage is preprocessed on its own, so a macro defined in one
    /// stage does not select branches in the next.
    pub fn parse_stages(stages: &[&str]) -> Self {
        let cleaned: Vec<String> = stages
            .iter()
            .map(|stage| remove_preprocessor_lines(&preprocess(&strip_comments(stage))))
            .collect();
        Self::scan(&cleaned.join("\n"))
    }

    fn scan(cleaned: &str) -> Self {
        let mut interface = Self::default();
        let mut seen: HashMap<String, usize> = HashMap::new();
        let mut reported: Vec<String> = Vec::new();

        let mut start = 0;
        for (index, c) in cleaned.char_indices() {
            if !matches!(c, ';' | '{' | '}') {
                continue;
            }
            let statement = &cleaned[start..index];
            start = index + 1;
            if c != ';' {
                continue;
            }
            for declarator in parse_statement(statement) {
                interface.push(declarator, &mut seen, &mut reported);
            }
        }

        interface
    }

    fn push(
        &mut self,
        declarator: Declarator,
        seen: &mut HashMap<String, usize>,
        reported: &mut Vec<String>,
    ) {
        let Declarator { type_name, name } = declarator;

        let Some(kind) = UniformKind::from_glsl(&type_name) else {
            if !reported.contains(&name) {
                log::error!("unknown uniform type '{type_name}' for uniform '{name}'");
                reported.push(name.clone());
                self.errors
                    .push(MaterialError::UnknownUniformType { type_name, name });
            }
            return;
        };

        if let Some(&index) = seen.get(&name) {
            let first = &self.declarations[index];
            if first.kind != kind && !reported.contains(&name) {
                log::error!(
                    "uniform '{name}' redeclared as '{type_name}' (first declared as '{}')",
                    first.type_name
                );
                reported.push(name.clone());
                self.errors.push(MaterialError::ConflictingUniformDeclaration {
                    name,
                    first: first.type_name.clone(),
                    second: type_name,
                });
            }
            return;
        }

        seen.insert(name.clone(), self.declarations.len());
        self.declarations.push(UniformDeclaration {
            type_name,
            name,
            kind,
        });
    }

    /// Declarations in first-seen order.
    pub fn declarations(&self) -> &[UniformDeclaration] {
        &self.declarations
    }

    /// Declarations that were dropped or conflicted.
    pub fn errors(&self) -> &[MaterialError] {
        &self.errors
    }

    /// Take the reported errors.
    pub fn take_errors(&mut self) -> Vec<MaterialError> {
        std::mem::take(&mut self.errors)
    }

    /// Look up a declaration by name.
    pub fn get(&self, name: &str) -> Option<&UniformDeclaration> {
        self.declarations.iter().find(|d| d.name == name)
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }
}

struct Declarator {
    type_name: String,
    name: String,
}

fn remove_preprocessor_lines(source: &str) -> String {
    let mut result = String::with_capacity(source.len());
    for line in source.lines() {
        if !line.trim_start().starts_with('#') {
            result.push_str(line);
        }
        result.push('\n');
    }
    result
}

/// Split one `;`-terminated statement into uniform declarators.
fn parse_statement(statement: &str) -> Vec<Declarator> {
    let spaced = strip_initializers(statement).replace(',', " , ");
    let tokens: Vec<&str> = spaced.split_whitespace().collect();

    // Layout qualifiers may precede the keyword.
    let Some(keyword) = tokens.iter().position(|t| *t == "uniform") else {
        return Vec::new();
    };
    let rest = &tokens[keyword + 1..];

    let first_comma = rest.iter().position(|t| *t == ",").unwrap_or(rest.len());
    if first_comma == 0 {
        return Vec::new();
    }
    let type_tokens: Vec<&str> = rest[..first_comma - 1]
        .iter()
        .copied()
        .filter(|t| !PRECISION_QUALIFIERS.contains(t))
        .collect();
    let base_type = type_tokens.join(" ");

    std::iter::once(rest[first_comma - 1])
        .chain(rest[first_comma..].iter().copied().filter(|t| *t != ","))
        .map(|raw| split_array_suffix(raw, &base_type))
        .collect()
}

/// Drop `= <expr>` initializers, keeping the commas between declarators.
fn strip_initializers(statement: &str) -> String {
    let mut result = String::with_capacity(statement.len());
    let mut in_initializer = false;
    let mut depth = 0usize;
    for c in statement.chars() {
        if !in_initializer {
            if c == '=' {
                in_initializer = true;
            } else {
                result.push(c);
            }
            continue;
        }
        match c {
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                in_initializer = false;
                result.push(c);
            }
            _ => {}
        }
    }
    result
}

/// `lights[4]` becomes name `lights` with type `vec4[4]`.
fn split_array_suffix(raw: &str, base_type: &str) -> Declarator {
    let ident_end = raw
        .char_indices()
        .find(|(_, c)| !is_identifier_char(*c))
        .map_or(raw.len(), |(i, _)| i);
    let (name, suffix) = raw.split_at(ident_end);
    Declarator {
        type_name: format!("{base_type}{suffix}"),
        name: name.to_string(),
    }
}
