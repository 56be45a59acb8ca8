//! Conditional compilation for composed GLSL.
//!
//! [`preprocess`] evaluates `#define`/`#undef` and the
//! `#if`/`#ifdef`/`#ifndef`/`#elif`/`#else`/`#endif` family on a single
//! stage, so that only text the driver would actually compile reaches the
//! uniform scan. Lines in branches that are not taken, and the conditional
//! directives themselves, become empty lines; line numbers are preserved.
//!
//! `#if` expressions support integer literals, macro names, `defined X`,
//! `defined(X)`, parentheses and the C operators
//! `! ~ * / % + - << >> < > <= >= == != & ^ | && ||`. Names that are not
//! defined, or whose body is not an integer expression, evaluate to 0.

use std::collections::HashMap;

use super::is_identifier_char;

/// Evaluate the conditional directives of one translation unit.
pub fn preprocess(source: &str) -> String {
    let mut macros: HashMap<String, String> = HashMap::new();
    let mut stack: Vec<Conditional> = Vec::new();
    let mut result = String::with_capacity(source.len());

    for line in source.lines() {
        let active = stack.iter().all(|c| c.active);
        let Some((directive, rest)) = split_directive(line) else {
            if active {
                result.push_str(line);
            }
            result.push('\n');
            continue;
        };

        match directive {
            "ifdef" | "ifndef" | "if" => {
                let taken = active
                    && match directive {
                        "ifdef" => macros.contains_key(first_word(rest)),
                        "ifndef" => !macros.contains_key(first_word(rest)),
                        _ => evaluate(rest, &macros),
                    };
                stack.push(Conditional {
                    parent_active: active,
                    active: taken,
                    done: taken,
                });
            }
            "elif" => match stack.last_mut() {
                Some(top) => {
                    let taken = top.parent_active && !top.done && evaluate(rest, &macros);
                    top.active = taken;
                    top.done |= taken;
                }
                None => log::warn!("#elif without #if"),
            },
            "else" => match stack.last_mut() {
                Some(top) => {
                    top.active = top.parent_active && !top.done;
                    top.done = true;
                }
                None => log::warn!("#else without #if"),
            },
            "endif" => {
                if stack.pop().is_none() {
                    log::warn!("#endif without #if");
                }
            }
            "define" if active => {
                let name = first_word(rest);
                if !name.is_empty() {
                    let body = rest.trim_start()[name.len()..].trim();
                    macros.insert(name.to_string(), body.to_string());
                }
                result.push_str(line);
            }
            "undef" if active => {
                macros.remove(first_word(rest));
                result.push_str(line);
            }
            _ if active => result.push_str(line),
            _ => {}
        }
        result.push('\n');
    }

    if !stack.is_empty() {
        log::warn!("{} unterminated conditional block(s)", stack.len());
    }
    result
}

struct Conditional {
    /// Whether the enclosing text is compiled.
    parent_active: bool,
    /// Whether the current branch is compiled.
    active: bool,
    /// Whether some branch of this block was already taken.
    done: bool,
}

/// `#  ifdef FOO` gives `("ifdef", " FOO")`.
fn split_directive(line: &str) -> Option<(&str, &str)> {
    let rest = line.trim_start().strip_prefix('#')?.trim_start();
    let end = rest
        .find(|c: char| !is_identifier_char(c))
        .unwrap_or(rest.len());
    Some(rest.split_at(end))
}

fn first_word(text: &str) -> &str {
    let text = text.trim_start();
    let end = text
        .find(|c: char| !is_identifier_char(c))
        .unwrap_or(text.len());
    &text[..end]
}

/// Evaluate an `#if` expression; malformed expressions are false.
fn evaluate(expression: &str, macros: &HashMap<String, String>) -> bool {
    let tokens = match tokenize(expression, macros, 0) {
        Some(tokens) => tokens,
        None => {
            log::warn!("cannot evaluate '#if {}'", expression.trim());
            return false;
        }
    };
    let mut parser = ExpressionParser { tokens, position: 0 };
    match parser.expression(0) {
        Some(value) if parser.position == parser.tokens.len() => value != 0,
        _ => {
            log::warn!("cannot evaluate '#if {}'", expression.trim());
            false
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(i64),
    Operator(&'static str),
    Open,
    Close,
}

const OPERATORS: [&str; 20] = [
    "&&", "||", "==", "!=", "<=", ">=", "<<", ">>", "<", ">", "+", "-", "*", "/", "%", "!", "~",
    "&", "|", "^",
];

/// Nested macro bodies deeper than this evaluate to 0.
const MAX_EXPANSION_DEPTH: usize = 16;

/// Tokenize with `defined` resolved and macro names expanded.
fn tokenize(text: &str, macros: &HashMap<String, String>, depth: usize) -> Option<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut rest = text.trim_start();

    while !rest.is_empty() {
        let c = rest.chars().next()?;
        if c.is_ascii_digit() {
            let end = rest.find(|c: char| !is_identifier_char(c)).unwrap_or(rest.len());
            tokens.push(Token::Number(parse_number(&rest[..end])?));
            rest = &rest[end..];
        } else if is_identifier_char(c) {
            let end = rest.find(|c: char| !is_identifier_char(c)).unwrap_or(rest.len());
            let name = &rest[..end];
            rest = &rest[end..];
            if name == "defined" {
                let after = rest.trim_start();
                let (target, remaining) = match after.strip_prefix('(') {
                    Some(inner) => {
                        let close = inner.find(')')?;
                        (inner[..close].trim(), &inner[close + 1..])
                    }
                    None => {
                        let target = first_word(after);
                        (target, &after[target.len()..])
                    }
                };
                if target.is_empty() {
                    return None;
                }
                tokens.push(Token::Number(i64::from(macros.contains_key(target))));
                rest = remaining;
            } else {
                match macros.get(name) {
                    Some(body) if depth < MAX_EXPANSION_DEPTH && !body.is_empty() => {
                        let expanded = tokenize(body, macros, depth + 1)?;
                        tokens.push(Token::Open);
                        tokens.extend(expanded);
                        tokens.push(Token::Close);
                    }
                    _ => tokens.push(Token::Number(0)),
                }
            }
        } else if c == '(' {
            tokens.push(Token::Open);
            rest = &rest[1..];
        } else if c == ')' {
            tokens.push(Token::Close);
            rest = &rest[1..];
        } else {
            let operator = OPERATORS.iter().find(|op| rest.starts_with(*op))?;
            tokens.push(Token::Operator(*operator));
            rest = &rest[operator.len()..];
        }
        rest = rest.trim_start();
    }

    Some(tokens)
}

fn parse_number(literal: &str) -> Option<i64> {
    let digits = literal.trim_end_matches(['u', 'U']);
    if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).ok()
    } else if digits.len() > 1 && digits.starts_with('0') {
        i64::from_str_radix(&digits[1..], 8).ok()
    } else {
        digits.parse().ok()
    }
}

fn binary_precedence(operator: &str) -> Option<u8> {
    let precedence = match operator {
        "||" => 1,
        "&&" => 2,
        "|" => 3,
        "^" => 4,
        "&" => 5,
        "==" | "!=" => 6,
        "<" | ">" | "<=" | ">=" => 7,
        "<<" | ">>" => 8,
        "+" | "-" => 9,
        "*" | "/" | "%" => 10,
        _ => return None,
    };
    Some(precedence)
}

struct ExpressionParser {
    tokens: Vec<Token>,
    position: usize,
}

impl ExpressionParser {
    /// Precedence climbing over binary operators.
    fn expression(&mut self, min_precedence: u8) -> Option<i64> {
        let mut left = self.unary()?;
        while let Some(Token::Operator(operator)) = self.tokens.get(self.position).cloned() {
            let precedence = binary_precedence(operator)?;
            if precedence <= min_precedence {
                break;
            }
            self.position += 1;
            let right = self.expression(precedence)?;
            left = apply(operator, left, right)?;
        }
        Some(left)
    }

    fn unary(&mut self) -> Option<i64> {
        let token = self.tokens.get(self.position).cloned()?;
        self.position += 1;
        match token {
            Token::Number(value) => Some(value),
            Token::Open => {
                let value = self.expression(0)?;
                match self.tokens.get(self.position) {
                    Some(Token::Close) => {
                        self.position += 1;
                        Some(value)
                    }
                    _ => None,
                }
            }
            Token::Operator("!") => Some(i64::from(self.unary()? == 0)),
            Token::Operator("~") => Some(!self.unary()?),
            Token::Operator("-") => Some(self.unary()?.wrapping_neg()),
            Token::Operator("+") => self.unary(),
            _ => None,
        }
    }
}

fn apply(operator: &str, left: i64, right: i64) -> Option<i64> {
    let value = match operator {
        "||" => i64::from(left != 0 || right != 0),
        "&&" => i64::from(left != 0 && right != 0),
        "|" => left | right,
        "^" => left ^ right,
        "&" => left & right,
        "==" => i64::from(left == right),
        "!=" => i64::from(left != right),
        "<" => i64::from(left < right),
        ">" => i64::from(left > right),
        "<=" => i64::from(left <= right),
        ">=" => i64::from(left >= right),
        "<<" => left.checked_shl(u32::try_from(right).ok()?)?,
        ">>" => left.checked_shr(u32::try_from(right).ok()?)?,
        "+" => left.wrapping_add(right),
        "-" => left.wrapping_sub(right),
        "*" => left.wrapping_mul(right),
        "/" => left.checked_div(right)?,
        "%" => left.checked_rem(right)?,
        _ => return None,
    };
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kept(source: &str) -> Vec<String> {
        preprocess(source)
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_ifdef_else() {
        let source = "#ifdef HDR\nuniform vec4 tint;\n#else\nuniform vec3 tint;\n#endif\n";
        assert_eq!(kept(source), ["uniform vec3 tint;"]);
        assert_eq!(kept(&format!("#define HDR\n{source}")), ["uniform vec4 tint;"]);
    }

    #[test]
    fn test_ifndef_and_undef() {
        let source = "#define A\n#undef A\n#ifndef A\nyes;\n#endif\n";
        assert_eq!(kept(source), ["yes;"]);
    }

    #[test]
    fn test_line_count_is_preserved() {
        let source = "#ifdef NOPE\na;\nb;\n#endif\nc;\n";
        assert_eq!(preprocess(source).lines().count(), source.lines().count());
    }

    #[test]
    fn test_nested_blocks() {
        let source = r#"
#define OUTER
#ifdef OUTER
  #ifdef INNER
    inner;
  #else
    outer_only;
  #endif
#else
  #ifdef INNER
    never;
  #else
    never_either;
  #endif
#endif
"#;
        assert_eq!(kept(source), ["outer_only;"]);
    }

    #[test]
    fn test_if_elif_chain() {
        let source = "#define QUALITY 2\n#if QUALITY >= 3\nhigh;\n#elif QUALITY == 2\nmedium;\n#elif QUALITY == 2\nagain;\n#else\nlow;\n#endif\n";
        assert_eq!(kept(source), ["medium;"]);
    }

    #[test]
    fn test_defined_operator_and_logic() {
        let source = "#define A\n#if defined(A) && !defined B\nab;\n#endif\n#if defined A || (1 + 2 * 3 == 6)\nc;\n#endif\n";
        assert_eq!(kept(source), ["ab;", "c;"]);
    }

    #[test]
    fn test_macro_expansion_in_if() {
        let source = "#define BASE 4\n#define LIGHTS (BASE * 2)\n#if LIGHTS > 6 && UNDEFINED == 0\nmany;\n#endif\n";
        assert_eq!(kept(source), ["many;"]);
    }

    #[test]
    fn test_defines_in_dead_branches_are_ignored() {
        let source = "#ifdef NOPE\n#define FLAG\n#endif\n#ifdef FLAG\nflagged;\n#endif\n";
        assert!(kept(source).is_empty());
    }

    #[test]
    fn test_malformed_expression_is_false() {
        assert_eq!(kept("#if 1 +\nbad;\n#else\ngood;\n#endif\n"), ["good;"]);
        assert!(kept("#if 1 / 0\nbad;\n#endif\n").is_empty());
    }

    #[test]
    fn test_number_literals() {
        assert_eq!(parse_number("0x1F"), Some(31));
        assert_eq!(parse_number("010"), Some(8));
        assert_eq!(parse_number("7u"), Some(7));
        assert_eq!(parse_number("0"), Some(0));
    }
}
