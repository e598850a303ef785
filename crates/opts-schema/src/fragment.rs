//! # Schema Fragment AST
//!
//! A schema fragment is parsed once, at registry replacement time, into a
//! closed set of rule nodes. The rule interpreter in [`crate::validate`]
//! only ever sees this AST, never the raw tree.
//!
//! ## Supported keywords
//!
//! | Keyword                                   | Node                       |
//! |-------------------------------------------|----------------------------|
//! | `type` (string or list)                   | [`Rule::Type`]             |
//! | `enum`                                    | [`Rule::Enum`]             |
//! | `minLength`, `maxLength`, `pattern`, `format` | [`Rule::String`]       |
//! | `minimum`, `maximum`                      | [`Rule::Number`]           |
//! | `items`                                   | [`Rule::ArrayOf`]          |
//! | `properties`, `required`                  | [`Rule::ObjectShape`]      |
//! | `meta.multiple`, `meta.tables`            | [`FragmentMeta`]           |
//!
//! Anything else is dropped. Parsing never fails: a fragment that uses an
//! unsupported keyword simply validates less. [`SchemaFragment::lint`]
//! reports what was dropped.

use std::collections::BTreeMap;
use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Keywords that carry documentation only and are silently accepted.
const ANNOTATION_KEYWORDS: &[&str] = &[
    "$schema",
    "$id",
    "$comment",
    "title",
    "description",
    "default",
    "examples",
    "deprecated",
    "readOnly",
    "writeOnly",
];

// ─── JSON Types ──────────────────────────────────────────────────────

/// A structural JSON type name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonType {
    /// `null`
    Null,
    /// `true` / `false`
    Boolean,
    /// A JSON object.
    Object,
    /// A JSON array.
    Array,
    /// Any JSON number.
    Number,
    /// A JSON number with no fractional part.
    Integer,
    /// A JSON string.
    String,
}

impl JsonType {
    /// Look up a type by its schema name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "null" => Some(Self::Null),
            "boolean" => Some(Self::Boolean),
            "object" => Some(Self::Object),
            "array" => Some(Self::Array),
            "number" => Some(Self::Number),
            "integer" => Some(Self::Integer),
            "string" => Some(Self::String),
            _ => None,
        }
    }

    /// The schema name of this type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean => "boolean",
            Self::Object => "object",
            Self::Array => "array",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::String => "string",
        }
    }

    /// The structural type of a value. Numbers report as `number`.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(_) => Self::Boolean,
            Value::Object(_) => Self::Object,
            Value::Array(_) => Self::Array,
            Value::Number(_) => Self::Number,
            Value::String(_) => Self::String,
        }
    }

    /// Whether `value` is structurally of this type.
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (Self::Null, Value::Null)
            | (Self::Boolean, Value::Bool(_))
            | (Self::Object, Value::Object(_))
            | (Self::Array, Value::Array(_))
            | (Self::Number, Value::Number(_))
            | (Self::String, Value::String(_)) => true,
            (Self::Integer, Value::Number(n)) => {
                n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.fract() == 0.0)
            }
            _ => false,
        }
    }
}

impl std::fmt::Display for JsonType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Constraint Nodes ────────────────────────────────────────────────

/// Recognized values of the `format` keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StringFormat {
    /// Simple `local@domain.tld` shape check.
    Email,
}

/// A compiled `pattern`, keeping its source for messages.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    /// The pattern as written in the schema.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Whether the pattern matches anywhere in `s`.
    pub fn is_match(&self, s: &str) -> bool {
        self.regex.is_match(s)
    }
}

/// Constraints applied only when the value is a string.
#[derive(Debug, Clone, Default)]
pub struct StringConstraints {
    /// Minimum length in Unicode scalar values.
    pub min_length: Option<u64>,
    /// Maximum length in Unicode scalar values.
    pub max_length: Option<u64>,
    /// Regular expression the string must match.
    pub pattern: Option<Pattern>,
    /// Named format check.
    pub format: Option<StringFormat>,
}

impl StringConstraints {
    fn is_empty(&self) -> bool {
        self.min_length.is_none()
            && self.max_length.is_none()
            && self.pattern.is_none()
            && self.format.is_none()
    }
}

/// Constraints applied only when the value is a number.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NumberConstraints {
    /// Inclusive lower bound.
    pub minimum: Option<f64>,
    /// Inclusive upper bound.
    pub maximum: Option<f64>,
}

/// One node of the schema AST.
#[derive(Debug, Clone)]
pub enum Rule {
    /// Value must be one of the listed structural types.
    Type(Vec<JsonType>),
    /// Value must structurally equal one of the listed values.
    Enum(Vec<Value>),
    /// String length, pattern and format constraints.
    String(StringConstraints),
    /// Numeric bounds.
    Number(NumberConstraints),
    /// Every array element must satisfy the item schema.
    ArrayOf(Arc<SchemaFragment>),
    /// Required keys and per-property schemas of an object.
    ObjectShape {
        /// Declared properties.
        properties: BTreeMap<String, Arc<SchemaFragment>>,
        /// Keys that must be present.
        required: Vec<String>,
    },
}

/// Store-level metadata attached to a key's fragment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FragmentMeta {
    /// More than one record per `(key, owner)` is allowed.
    #[serde(default)]
    pub multiple: bool,
    /// Candidate tables for a reference key. Presence makes the key a
    /// reference key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tables: Option<Vec<String>>,
}

impl FragmentMeta {
    /// Whether the key stores a foreign id rather than a scalar.
    pub fn is_reference(&self) -> bool {
        self.tables.is_some()
    }
}

// ─── Fragment ────────────────────────────────────────────────────────

/// A parsed schema fragment.
#[derive(Debug, Clone, Default)]
pub struct SchemaFragment {
    rules: Vec<Rule>,
    meta: FragmentMeta,
}

impl SchemaFragment {
    /// Build a fragment directly from rule nodes.
    pub fn from_rules(rules: Vec<Rule>, meta: FragmentMeta) -> Self {
        Self { rules, meta }
    }

    /// Parse a raw schema tree. Never fails.
    pub fn parse(raw: &Value) -> Self {
        let mut notes = Vec::new();
        let fragment = parse_node(raw, "", &mut notes);
        for note in &notes {
            tracing::debug!(note = %note, "schema keyword dropped");
        }
        fragment
    }

    /// Parse a raw schema tree and report every dropped keyword.
    pub fn lint(raw: &Value) -> Vec<String> {
        let mut notes = Vec::new();
        parse_node(raw, "", &mut notes);
        notes
    }

    /// The rule nodes, in evaluation order.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// The store metadata block.
    pub fn meta(&self) -> &FragmentMeta {
        &self.meta
    }

    /// A declared property's fragment, if this fragment describes an object.
    pub fn property(&self, name: &str) -> Option<&Arc<SchemaFragment>> {
        self.rules.iter().find_map(|rule| match rule {
            Rule::ObjectShape { properties, .. } => properties.get(name),
            _ => None,
        })
    }

    /// Names of all declared properties.
    pub fn property_names(&self) -> Vec<&str> {
        self.rules
            .iter()
            .filter_map(|rule| match rule {
                Rule::ObjectShape { properties, .. } => Some(properties.keys()),
                _ => None,
            })
            .flatten()
            .map(String::as_str)
            .collect()
    }

    /// The item schema, if this fragment describes an array.
    pub fn items(&self) -> Option<&Arc<SchemaFragment>> {
        self.rules.iter().find_map(|rule| match rule {
            Rule::ArrayOf(items) => Some(items),
            _ => None,
        })
    }

    /// Short names of the rule kinds present, for diagnostics.
    pub fn rule_kinds(&self) -> Vec<&'static str> {
        self.rules
            .iter()
            .map(|rule| match rule {
                Rule::Type(_) => "type",
                Rule::Enum(_) => "enum",
                Rule::String(_) => "string",
                Rule::Number(_) => "number",
                Rule::ArrayOf(_) => "items",
                Rule::ObjectShape { .. } => "object",
            })
            .collect()
    }
}

// ─── Parser ──────────────────────────────────────────────────────────

fn parse_node(raw: &Value, at: &str, notes: &mut Vec<String>) -> SchemaFragment {
    let obj = match raw {
        Value::Object(obj) => obj,
        other => {
            notes.push(format!(
                "{}: fragment is a {}, not an object; accepting any value",
                location(at),
                JsonType::of(other)
            ));
            return SchemaFragment::default();
        }
    };

    let mut rules = Vec::new();

    if let Some(raw_type) = obj.get("type") {
        if let Some(types) = parse_types(raw_type, at, notes) {
            rules.push(Rule::Type(types));
        }
    }

    match obj.get("enum") {
        Some(Value::Array(values)) => rules.push(Rule::Enum(values.clone())),
        Some(_) => notes.push(format!("{}: 'enum' must be an array", location(at))),
        None => {}
    }

    let strings = parse_string_constraints(obj, at, notes);
    if !strings.is_empty() {
        rules.push(Rule::String(strings));
    }

    let numbers = NumberConstraints {
        minimum: number_keyword(obj, "minimum", at, notes),
        maximum: number_keyword(obj, "maximum", at, notes),
    };
    if numbers.minimum.is_some() || numbers.maximum.is_some() {
        rules.push(Rule::Number(numbers));
    }

    match obj.get("items") {
        Some(items @ Value::Object(_)) => {
            let child = parse_node(items, &join(at, "items"), notes);
            rules.push(Rule::ArrayOf(Arc::new(child)));
        }
        Some(_) => notes.push(format!(
            "{}: only single-schema 'items' is supported",
            location(at)
        )),
        None => {}
    }

    if obj.contains_key("properties") || obj.contains_key("required") {
        let mut properties = BTreeMap::new();
        match obj.get("properties") {
            Some(Value::Object(props)) => {
                for (name, child) in props {
                    let child = parse_node(child, &join(at, name), notes);
                    properties.insert(name.clone(), Arc::new(child));
                }
            }
            Some(_) => notes.push(format!("{}: 'properties' must be an object", location(at))),
            None => {}
        }
        let required = match obj.get("required") {
            Some(Value::Array(names)) => names
                .iter()
                .filter_map(|n| match n.as_str() {
                    Some(s) => Some(s.to_string()),
                    None => {
                        notes.push(format!("{}: non-string entry in 'required'", location(at)));
                        None
                    }
                })
                .collect(),
            Some(_) => {
                notes.push(format!("{}: 'required' must be an array", location(at)));
                Vec::new()
            }
            None => Vec::new(),
        };
        rules.push(Rule::ObjectShape { properties, required });
    }

    let meta = parse_meta(obj.get("meta"), at, notes);

    for key in obj.keys() {
        if !is_known_keyword(key) {
            notes.push(format!("{}: unsupported keyword '{key}'", location(at)));
        }
    }

    SchemaFragment { rules, meta }
}

fn parse_types(raw: &Value, at: &str, notes: &mut Vec<String>) -> Option<Vec<JsonType>> {
    let names: Vec<&Value> = match raw {
        Value::Array(list) => list.iter().collect(),
        single => vec![single],
    };
    let mut types = Vec::new();
    for name in names {
        match name.as_str().and_then(JsonType::from_name) {
            Some(t) => types.push(t),
            None => notes.push(format!("{}: unknown type {name}", location(at))),
        }
    }
    // A type list where nothing was recognized constrains nothing.
    if types.is_empty() {
        None
    } else {
        Some(types)
    }
}

fn parse_string_constraints(
    obj: &Map<String, Value>,
    at: &str,
    notes: &mut Vec<String>,
) -> StringConstraints {
    let pattern = match obj.get("pattern") {
        Some(Value::String(source)) => match Regex::new(source) {
            Ok(regex) => Some(Pattern {
                source: source.clone(),
                regex,
            }),
            Err(e) => {
                notes.push(format!("{}: pattern does not compile: {e}", location(at)));
                None
            }
        },
        Some(_) => {
            notes.push(format!("{}: 'pattern' must be a string", location(at)));
            None
        }
        None => None,
    };

    let format = match obj.get("format") {
        Some(Value::String(name)) if name == "email" => Some(StringFormat::Email),
        Some(other) => {
            notes.push(format!("{}: unsupported format {other}", location(at)));
            None
        }
        None => None,
    };

    StringConstraints {
        min_length: length_keyword(obj, "minLength", at, notes),
        max_length: length_keyword(obj, "maxLength", at, notes),
        pattern,
        format,
    }
}

fn length_keyword(
    obj: &Map<String, Value>,
    keyword: &str,
    at: &str,
    notes: &mut Vec<String>,
) -> Option<u64> {
    let raw = obj.get(keyword)?;
    let parsed = raw
        .as_u64()
        .or_else(|| raw.as_f64().filter(|f| *f >= 0.0 && f.fract() == 0.0).map(|f| f as u64));
    if parsed.is_none() {
        notes.push(format!(
            "{}: '{keyword}' must be a non-negative integer",
            location(at)
        ));
    }
    parsed
}

fn number_keyword(
    obj: &Map<String, Value>,
    keyword: &str,
    at: &str,
    notes: &mut Vec<String>,
) -> Option<f64> {
    let raw = obj.get(keyword)?;
    let parsed = raw.as_f64();
    if parsed.is_none() {
        notes.push(format!("{}: '{keyword}' must be a number", location(at)));
    }
    parsed
}

fn parse_meta(raw: Option<&Value>, at: &str, notes: &mut Vec<String>) -> FragmentMeta {
    let Some(raw) = raw else {
        return FragmentMeta::default();
    };
    let Value::Object(meta) = raw else {
        notes.push(format!("{}: 'meta' must be an object", location(at)));
        return FragmentMeta::default();
    };

    let multiple = match meta.get("multiple") {
        Some(Value::Bool(b)) => *b,
        Some(_) => {
            notes.push(format!("{}: 'meta.multiple' must be a boolean", location(at)));
            false
        }
        None => false,
    };

    let tables = match meta.get("tables") {
        Some(Value::Array(list)) => Some(
            list.iter()
                .filter_map(|t| {
                    let name = t.as_str().map(str::to_string);
                    if name.is_none() {
                        notes.push(format!(
                            "{}: non-string entry in 'meta.tables'",
                            location(at)
                        ));
                    }
                    name
                })
                .collect(),
        ),
        Some(Value::String(single)) => Some(vec![single.clone()]),
        Some(_) => {
            notes.push(format!("{}: 'meta.tables' must be a list", location(at)));
            None
        }
        None => None,
    };

    FragmentMeta { multiple, tables }
}

fn is_known_keyword(key: &str) -> bool {
    matches!(
        key,
        "type"
            | "enum"
            | "minLength"
            | "maxLength"
            | "pattern"
            | "format"
            | "minimum"
            | "maximum"
            | "items"
            | "properties"
            | "required"
            | "meta"
    ) || ANNOTATION_KEYWORDS.contains(&key)
}

fn join(at: &str, segment: &str) -> String {
    if at.is_empty() {
        segment.to_string()
    } else {
        format!("{at}.{segment}")
    }
}

fn location(at: &str) -> &str {
    if at.is_empty() {
        "(root)"
    } else {
        at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_all_supported_keywords() {
        let fragment = SchemaFragment::parse(&json!({
            "type": ["string", "null"],
            "enum": ["a", "b", null],
            "minLength": 1,
            "maxLength": 8,
            "pattern": "^[a-z]+$",
            "format": "email",
            "minimum": 0,
            "maximum": 10.5,
            "items": { "type": "integer" },
            "properties": { "name": { "type": "string" } },
            "required": ["name"],
            "meta": { "multiple": true, "tables": ["users"] }
        }));
        assert_eq!(
            fragment.rule_kinds(),
            vec!["type", "enum", "string", "number", "items", "object"]
        );
        assert!(fragment.meta().multiple);
        assert_eq!(fragment.meta().tables, Some(vec!["users".to_string()]));
        assert!(fragment.property("name").is_some());
        assert!(fragment.items().is_some());
    }

    #[test]
    fn unknown_keywords_are_dropped_not_rejected() {
        let raw = json!({ "type": "string", "oneOf": [], "x-ui": { "widget": "select" } });
        let fragment = SchemaFragment::parse(&raw);
        assert_eq!(fragment.rule_kinds(), vec!["type"]);
        let notes = SchemaFragment::lint(&raw);
        assert_eq!(notes.len(), 2);
        assert!(notes.iter().any(|n| n.contains("'oneOf'")));
    }

    #[test]
    fn annotations_are_not_reported() {
        let raw = json!({ "type": "string", "title": "Region", "description": "where" });
        assert!(SchemaFragment::lint(&raw).is_empty());
    }

    #[test]
    fn bad_pattern_is_dropped() {
        let raw = json!({ "type": "string", "pattern": "([" });
        let fragment = SchemaFragment::parse(&raw);
        assert_eq!(fragment.rule_kinds(), vec!["type"]);
        assert!(SchemaFragment::lint(&raw)[0].contains("pattern does not compile"));
    }

    #[test]
    fn unknown_type_names_are_dropped() {
        let fragment = SchemaFragment::parse(&json!({ "type": ["string", "uuid"] }));
        match &fragment.rules()[0] {
            Rule::Type(types) => assert_eq!(types, &vec![JsonType::String]),
            other => panic!("expected Type rule, got {other:?}"),
        }
        let empty = SchemaFragment::parse(&json!({ "type": "uuid" }));
        assert!(empty.rules().is_empty());
    }

    #[test]
    fn non_object_fragment_accepts_anything() {
        let fragment = SchemaFragment::parse(&json!(true));
        assert!(fragment.rules().is_empty());
        assert_eq!(fragment.meta(), &FragmentMeta::default());
    }

    #[test]
    fn meta_tables_accepts_single_string() {
        let fragment = SchemaFragment::parse(&json!({ "meta": { "tables": "files" } }));
        assert!(fragment.meta().is_reference());
        assert_eq!(fragment.meta().tables, Some(vec!["files".to_string()]));
    }

    #[test]
    fn nested_notes_carry_location() {
        let notes = SchemaFragment::lint(&json!({
            "properties": { "region": { "type": "string", "const": "eu" } }
        }));
        assert_eq!(notes, vec!["region: unsupported keyword 'const'".to_string()]);
    }

    #[test]
    fn integer_matches_integral_floats_only() {
        assert!(JsonType::Integer.matches(&json!(3)));
        assert!(JsonType::Integer.matches(&json!(3.0)));
        assert!(!JsonType::Integer.matches(&json!(3.5)));
        assert!(!JsonType::Integer.matches(&json!("3")));
        assert!(JsonType::Number.matches(&json!(3.5)));
    }
}
