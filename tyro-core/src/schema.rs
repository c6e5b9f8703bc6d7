//! Schema algebra for parameter and return shapes
//!
//! A [`Schema`] is a plain value describing the shape of some JSON data. It is
//! interpreted by a single validator, [`Schema::validate`], which walks the
//! value and reports every mismatch it finds rather than stopping at the first
//! one. The same description drives the TypeScript names produced by
//! [`Schema::type_name`], so the server and generated clients never disagree
//! on a shape.
//!
//! Schemas serialize with an internal `type` tag, which lets method specs be
//! stored in and loaded from a JSON manifest:
//!
//! ```json
//! {"type": "object", "fields": {"x": {"type": "number"}}}
//! ```
//!
//! # Examples
//!
//! ```rust
//! use tyro_core::Schema;
//! use serde_json::json;
//!
//! let point = Schema::object([("x", Schema::Number), ("y", Schema::Number)]);
//! assert!(point.validate(&json!({"x": 1, "y": 2})).is_ok());
//!
//! let errors = point.validate(&json!({"x": "1"})).unwrap_err();
//! assert_eq!(errors.len(), 2);
//! assert_eq!(errors[0].to_string(), "/x: expected number, got string");
//! assert_eq!(errors[1].to_string(), "/y: expected number, got undefined");
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Description of a JSON shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Schema {
    /// Only `null`
    Null,
    /// `true` or `false`
    Boolean,
    /// Any JSON number
    Number,
    /// A number with no fractional part that fits in 64 bits
    Integer,
    /// Any JSON string
    String,
    /// Anything at all
    Any,
    /// The result of a handler that returns nothing, carried as `null`
    Void,
    /// A homogeneous array
    Array {
        /// Schema every element must satisfy
        items: Box<Schema>,
    },
    /// An object with declared fields
    ///
    /// Undeclared keys are tolerated and left untouched.
    Object {
        /// Declared fields, ordered by name
        #[serde(default)]
        fields: BTreeMap<String, Schema>,
    },
    /// `null` or the inner schema; as an object field it may also be absent
    Optional {
        /// Schema of the non-null case
        inner: Box<Schema>,
    },
}

impl Schema {
    /// Array whose elements all satisfy `items`
    pub fn array(items: Schema) -> Self {
        Schema::Array {
            items: Box::new(items),
        }
    }

    /// Object with the given fields
    pub fn object<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, Schema)>,
        K: Into<String>,
    {
        Schema::Object {
            fields: fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Nullable wrapper around `inner`
    pub fn optional(inner: Schema) -> Self {
        Schema::Optional {
            inner: Box::new(inner),
        }
    }

    /// Whether `null` satisfies this schema
    pub fn accepts_null(&self) -> bool {
        matches!(
            self,
            Schema::Null | Schema::Any | Schema::Void | Schema::Optional { .. }
        )
    }

    /// Check a value against the schema
    ///
    /// Returns every violation found, in document order.
    pub fn validate(&self, value: &Value) -> Result<(), Vec<Violation>> {
        let mut violations = Vec::new();
        self.check(Some(value), "", &mut violations);
        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }

    /// TypeScript rendering of the schema
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tyro_core::Schema;
    ///
    /// assert_eq!(Schema::array(Schema::String).type_name(), "Array<string>");
    /// assert_eq!(
    ///     Schema::object([("a", Schema::Number), ("b", Schema::optional(Schema::String))]).type_name(),
    ///     "{ a: number; b?: string | null }"
    /// );
    /// ```
    pub fn type_name(&self) -> String {
        match self {
            Schema::Null => "null".to_string(),
            Schema::Boolean => "boolean".to_string(),
            Schema::Number | Schema::Integer => "number".to_string(),
            Schema::String => "string".to_string(),
            Schema::Any => "unknown".to_string(),
            Schema::Void => "void".to_string(),
            Schema::Array { items } => format!("Array<{}>", items.type_name()),
            Schema::Object { fields } => object_type_name(fields, &BTreeMap::new()),
            Schema::Optional { inner } => format!("{} | null", inner.type_name()),
        }
    }

    /// Name used for the "expected" half of a violation
    fn expected_name(&self) -> String {
        match self {
            Schema::Integer => "integer".to_string(),
            other => other.type_name(),
        }
    }

    fn check(&self, value: Option<&Value>, path: &str, out: &mut Vec<Violation>) {
        let Some(value) = value else {
            if !matches!(self, Schema::Optional { .. }) {
                out.push(Violation::new(path, self.expected_name(), "undefined"));
            }
            return;
        };

        match (self, value) {
            (Schema::Any, _) => {}
            (Schema::Null | Schema::Void, Value::Null) => {}
            (Schema::Boolean, Value::Bool(_)) => {}
            (Schema::Number, Value::Number(_)) => {}
            (Schema::Integer, Value::Number(n)) if is_integral(n) => {}
            (Schema::String, Value::String(_)) => {}
            (Schema::Optional { .. }, Value::Null) => {}
            (Schema::Optional { inner }, value) => inner.check(Some(value), path, out),
            (Schema::Array { items }, Value::Array(elements)) => {
                for (index, element) in elements.iter().enumerate() {
                    items.check(Some(element), &format!("{}/{}", path, index), out);
                }
            }
            (Schema::Object { fields }, Value::Object(object)) => {
                out.extend(check_fields(fields, object, path, FieldMode::Declared));
            }
            (schema, value) => {
                out.push(Violation::new(path, schema.expected_name(), json_type_name(value)));
            }
        }
    }
}

/// Whole numbers, including ones written with a fraction part like `7.0`
fn is_integral(number: &serde_json::Number) -> bool {
    number.is_i64()
        || number.is_u64()
        || number
            .as_f64()
            .map_or(false, |f| f.is_finite() && f.fract() == 0.0)
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.type_name())
    }
}

/// How the presence of a declared field is checked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldMode {
    /// Every field is required unless its own schema is `Optional`
    Declared,
    /// Every field may be absent; present fields must match their schema
    AllOptional,
}

/// Validate the declared fields of an object
///
/// Only keys named in `fields` are inspected. This is the building block the
/// dispatcher uses to check the mandatory and optional parameter slices.
pub fn validate_fields(
    fields: &BTreeMap<String, Schema>,
    object: &Map<String, Value>,
    mode: FieldMode,
) -> Vec<Violation> {
    check_fields(fields, object, "", mode)
}

fn check_fields(
    fields: &BTreeMap<String, Schema>,
    object: &Map<String, Value>,
    path: &str,
    mode: FieldMode,
) -> Vec<Violation> {
    let mut out = Vec::new();
    for (name, schema) in fields {
        let field_path = format!("{}/{}", path, escape_pointer_token(name));
        match (object.get(name), mode) {
            (None, FieldMode::AllOptional) => {}
            (value, _) => schema.check(value, &field_path, &mut out),
        }
    }
    out
}

/// Render an object type from mandatory and optional fields
///
/// Optional fields are marked with `?`.
pub fn object_type_name(
    mandatory: &BTreeMap<String, Schema>,
    optional: &BTreeMap<String, Schema>,
) -> String {
    let mut members: Vec<String> = mandatory
        .iter()
        .map(|(name, schema)| match schema {
            Schema::Optional { .. } => format!("{}?: {}", name, schema.type_name()),
            _ => format!("{}: {}", name, schema.type_name()),
        })
        .collect();
    members.extend(
        optional
            .iter()
            .map(|(name, schema)| format!("{}?: {}", name, schema.type_name())),
    );

    if members.is_empty() {
        "{}".to_string()
    } else {
        format!("{{ {} }}", members.join("; "))
    }
}

/// One mismatch between a value and its schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// JSON pointer to the offending value, empty for the root
    pub path: String,
    /// Name of the expected type
    pub expected: String,
    /// Name of the type actually found, `undefined` when the value is missing
    pub actual: String,
}

impl Violation {
    fn new(path: &str, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self {
            path: path.to_string(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = if self.path.is_empty() { "/" } else { &self.path };
        write!(f, "{}: expected {}, got {}", path, self.expected, self.actual)
    }
}

/// Render violations as the messages carried in `data.errors`
pub fn messages(violations: &[Violation]) -> Vec<String> {
    violations.iter().map(ToString::to_string).collect()
}

/// Name of the JSON type of a value
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn escape_pointer_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn errors(schema: &Schema, value: Value) -> Vec<String> {
        messages(&schema.validate(&value).unwrap_err())
    }

    #[test]
    fn test_primitives() {
        assert!(Schema::Number.validate(&json!(1.5)).is_ok());
        assert!(Schema::Integer.validate(&json!(-3)).is_ok());
        assert!(Schema::Integer.validate(&json!(7.0)).is_ok());
        assert!(Schema::Integer.validate(&json!(-2.0)).is_ok());
        assert!(Schema::Boolean.validate(&json!(false)).is_ok());
        assert!(Schema::String.validate(&json!("")).is_ok());
        assert!(Schema::Null.validate(&json!(null)).is_ok());
        assert!(Schema::Void.validate(&json!(null)).is_ok());
        assert!(Schema::Any.validate(&json!({"a": [1]})).is_ok());

        assert_eq!(errors(&Schema::Integer, json!(1.5)), vec!["/: expected integer, got number"]);
        assert_eq!(errors(&Schema::Integer, json!(-0.25)), vec!["/: expected integer, got number"]);
        assert_eq!(errors(&Schema::Number, json!("7")), vec!["/: expected number, got string"]);
        assert_eq!(errors(&Schema::Void, json!(1)), vec!["/: expected void, got number"]);
    }

    #[test]
    fn test_nested_paths() {
        let schema = Schema::object([
            ("x", Schema::object([("a", Schema::array(Schema::object([("y", Schema::String)])))])),
        ]);

        let value = json!({"x": {"a": [{"y": "ok"}, {"y": 3}]}});
        assert_eq!(errors(&schema, value), vec!["/x/a/1/y: expected string, got number"]);
    }

    #[test]
    fn test_reports_every_violation() {
        let schema = Schema::object([("a", Schema::Number), ("b", Schema::String)]);
        let found = errors(&schema, json!({"a": "nope"}));

        assert_eq!(
            found,
            vec![
                "/a: expected number, got string".to_string(),
                "/b: expected string, got undefined".to_string(),
            ]
        );
    }

    #[test]
    fn test_optional() {
        let schema = Schema::object([("a", Schema::optional(Schema::Number))]);
        assert!(schema.validate(&json!({})).is_ok());
        assert!(schema.validate(&json!({"a": null})).is_ok());
        assert!(schema.validate(&json!({"a": 2})).is_ok());
        assert_eq!(errors(&schema, json!({"a": "2"})), vec!["/a: expected number, got string"]);
    }

    #[test]
    fn test_object_tolerates_undeclared_keys() {
        let schema = Schema::object([("a", Schema::Number)]);
        assert!(schema.validate(&json!({"a": 1, "b": true})).is_ok());
    }

    #[test]
    fn test_validate_fields_modes() {
        let fields: BTreeMap<String, Schema> =
            [("factor".to_string(), Schema::Number)].into_iter().collect();

        let empty = Map::new();
        assert_eq!(validate_fields(&fields, &empty, FieldMode::AllOptional), vec![]);
        assert_eq!(validate_fields(&fields, &empty, FieldMode::Declared).len(), 1);

        let mut with_null = Map::new();
        with_null.insert("factor".into(), Value::Null);
        let found = validate_fields(&fields, &with_null, FieldMode::AllOptional);
        assert_eq!(messages(&found), vec!["/factor: expected number, got null"]);
    }

    #[test]
    fn test_pointer_escaping() {
        let schema = Schema::object([("a/b", Schema::Number)]);
        assert_eq!(errors(&schema, json!({})), vec!["/a~1b: expected number, got undefined"]);
    }

    #[test]
    fn test_type_names() {
        assert_eq!(Schema::Integer.type_name(), "number");
        assert_eq!(Schema::Any.type_name(), "unknown");
        assert_eq!(Schema::object(Vec::<(String, Schema)>::new()).type_name(), "{}");
        assert_eq!(
            Schema::array(Schema::object([("id", Schema::String)])).type_name(),
            "Array<{ id: string }>"
        );
    }

    #[test]
    fn test_serde_shape() {
        let schema = Schema::object([("xs", Schema::array(Schema::optional(Schema::Integer)))]);
        let encoded = serde_json::to_value(&schema).unwrap();

        assert_eq!(
            encoded,
            json!({
                "type": "object",
                "fields": {
                    "xs": {"type": "array", "items": {"type": "optional", "inner": {"type": "integer"}}}
                }
            })
        );
        let decoded: Schema = serde_json::from_value(encoded).unwrap();
        assert_eq!(decoded, schema);
    }
}
