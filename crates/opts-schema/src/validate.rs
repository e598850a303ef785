//! # Rule Interpreter
//!
//! Evaluates a value against a parsed [`SchemaFragment`] and returns every
//! violation found. Evaluation is a pure recursive descent over the rule
//! AST: no I/O, no shared state, safe to call from any number of threads
//! and once per row inside bulk writes.
//!
//! Type-specific constraints (string, number, array, object) apply only
//! when the value has the matching structural type; a wrong type is
//! reported once by the `type` rule.
//!
//! Unknown properties are not rejected here. Strictness is a caller policy.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::fragment::{
    JsonType, NumberConstraints, Rule, SchemaFragment, StringConstraints, StringFormat,
};

/// A single rule violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// Location inside the value: property names and `items[<i>]` joined by
    /// `.`; empty for the value itself.
    pub path: String,
    /// Human-readable description.
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// Accumulated violations from one validation call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Violations(Vec<Violation>);

impl Violations {
    /// Number of violations.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when the value is valid.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate the violations in discovery order.
    pub fn iter(&self) -> std::slice::Iter<'_, Violation> {
        self.0.iter()
    }

    /// Consume and return the inner list.
    pub fn into_inner(self) -> Vec<Violation> {
        self.0
    }

    /// Rendered messages, one per violation.
    pub fn messages(&self) -> Vec<String> {
        self.0.iter().map(Violation::to_string).collect()
    }
}

impl fmt::Display for Violations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{v}")?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Violations {
    type Item = &'a Violation;
    type IntoIter = std::slice::Iter<'a, Violation>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Validate `value` against `fragment`, returning all violations.
pub fn validate(value: &Value, fragment: &SchemaFragment) -> Violations {
    let mut out = Vec::new();
    check(value, fragment, "", &mut out);
    Violations(out)
}

fn check(value: &Value, fragment: &SchemaFragment, path: &str, out: &mut Vec<Violation>) {
    for rule in fragment.rules() {
        match rule {
            Rule::Type(types) => check_type(value, types, path, out),
            Rule::Enum(allowed) => check_enum(value, allowed, path, out),
            Rule::String(constraints) => {
                if let Value::String(s) = value {
                    check_string(s, constraints, path, out);
                }
            }
            Rule::Number(constraints) => {
                if let Some(n) = value.as_f64() {
                    check_number(n, constraints, path, out);
                }
            }
            Rule::ArrayOf(items) => {
                if let Value::Array(elements) = value {
                    for (i, element) in elements.iter().enumerate() {
                        let child = child_path(path, &format!("items[{i}]"));
                        check(element, items, &child, out);
                    }
                }
            }
            Rule::ObjectShape {
                properties,
                required,
            } => {
                if let Value::Object(obj) = value {
                    for name in required {
                        if !obj.contains_key(name) {
                            push(out, path, format!("missing required property '{name}'"));
                        }
                    }
                    for (name, child_value) in obj {
                        if let Some(child_fragment) = properties.get(name) {
                            check(child_value, child_fragment, &child_path(path, name), out);
                        }
                    }
                }
            }
        }
    }
}

fn check_type(value: &Value, types: &[JsonType], path: &str, out: &mut Vec<Violation>) {
    if types.iter().any(|t| t.matches(value)) {
        return;
    }
    let expected = types
        .iter()
        .map(JsonType::as_str)
        .collect::<Vec<_>>()
        .join(" or ");
    let actual = JsonType::of(value);
    if actual == JsonType::Number && types.contains(&JsonType::Integer) {
        push(out, path, format!("expected {expected}, got non-integer number {value}"));
    } else {
        push(out, path, format!("expected {expected}, got {actual}"));
    }
}

fn check_enum(value: &Value, allowed: &[Value], path: &str, out: &mut Vec<Violation>) {
    if allowed.iter().any(|candidate| json_eq(value, candidate)) {
        return;
    }
    let listed = allowed
        .iter()
        .map(Value::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    push(out, path, format!("value {value} is not one of [{listed}]"));
}

fn check_string(s: &str, c: &StringConstraints, path: &str, out: &mut Vec<Violation>) {
    let len = s.chars().count() as u64;
    if let Some(min) = c.min_length {
        if len < min {
            push(out, path, format!("length {len} is shorter than minLength {min}"));
        }
    }
    if let Some(max) = c.max_length {
        if len > max {
            push(out, path, format!("length {len} is longer than maxLength {max}"));
        }
    }
    if let Some(pattern) = &c.pattern {
        if !pattern.is_match(s) {
            push(
                out,
                path,
                format!("value does not match pattern '{}'", pattern.source()),
            );
        }
    }
    if let Some(StringFormat::Email) = c.format {
        if !is_email(s) {
            push(out, path, format!("'{s}' is not a valid email address"));
        }
    }
}

fn check_number(n: f64, c: &NumberConstraints, path: &str, out: &mut Vec<Violation>) {
    if let Some(min) = c.minimum {
        if n < min {
            push(out, path, format!("{n} is less than minimum {min}"));
        }
    }
    if let Some(max) = c.maximum {
        if n > max {
            push(out, path, format!("{n} is greater than maximum {max}"));
        }
    }
}

/// `local@domain.tld`: one `@`, no whitespace, a dot inside the domain.
fn is_email(s: &str) -> bool {
    if s.chars().any(char::is_whitespace) {
        return false;
    }
    let mut parts = s.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };
    !local.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

/// Structural equality with numbers compared by value (`1 == 1.0`).
fn json_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => match (x.as_u64(), y.as_u64()) {
                (Some(x), Some(y)) => x == y,
                _ => x.as_f64() == y.as_f64(),
            },
        },
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| json_eq(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).is_some_and(|y| json_eq(x, y)))
        }
        _ => a == b,
    }
}

fn child_path(parent: &str, segment: &str) -> String {
    if parent.is_empty() {
        segment.to_string()
    } else {
        format!("{parent}.{segment}")
    }
}

fn push(out: &mut Vec<Violation>, path: &str, message: String) {
    out.push(Violation {
        path: path.to_string(),
        message,
    });
}
