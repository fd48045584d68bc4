//! Built-in schema combinators.
//!
//! ```rust
//! use dotroute::schema::{number, object, string};
//!
//! let member = object([
//!     ("name", string()),
//!     ("age", number()),
//!     ("nickname", string().optional()),
//! ]);
//! ```
//!
//! Objects drop keys they do not declare. Missing required keys report
//! `Required`; present values of the wrong type report
//! `Expected <type>, received <type>`.

use serde_json::{Map, Number, Value};

use super::{Issue, Schema};

#[derive(Clone, Debug)]
enum Kind {
    Any,
    Array(Box<TypeSchema>),
    Boolean,
    Never,
    Number,
    Object(Vec<(String, TypeSchema)>),
    String,
}

/// A structural JSON schema.
#[derive(Clone, Debug)]
pub struct TypeSchema {
    kind: Kind,
    optional: bool,
    coerce: bool,
}

pub fn any() -> TypeSchema { TypeSchema::of(Kind::Any) }
pub fn boolean() -> TypeSchema { TypeSchema::of(Kind::Boolean) }
pub fn never() -> TypeSchema { TypeSchema::of(Kind::Never) }
pub fn number() -> TypeSchema { TypeSchema::of(Kind::Number) }
pub fn string() -> TypeSchema { TypeSchema::of(Kind::String) }

pub fn array(item: TypeSchema) -> TypeSchema {
    TypeSchema::of(Kind::Array(Box::new(item)))
}

pub fn object<I, K>(fields: I) -> TypeSchema
where
    I: IntoIterator<Item = (K, TypeSchema)>,
    K: Into<String>,
{
    TypeSchema::of(Kind::Object(fields.into_iter().map(|(k, s)| (k.into(), s)).collect()))
}

impl TypeSchema {
    fn of(kind: Kind) -> Self {
        Self { kind, optional: false, coerce: false }
    }

    /// Accepts a missing value (or `null`).
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Converts strings before checking: `"42"` passes `number().coerce()`
    /// as `42`, `"true"` passes `boolean().coerce()`. Meant for query strings
    /// and path parameters, which always arrive as text.
    pub fn coerce(mut self) -> Self {
        self.coerce = true;
        self
    }

    /// Validates a possibly-missing value at `path`.
    fn check(&self, value: Option<&Value>, path: &mut Vec<Value>, issues: &mut Vec<Issue>) -> Option<Value> {
        let value = match value {
            None | Some(Value::Null) if self.optional => return None,
            None => {
                issues.push(type_issue(self.kind.name(), "undefined", path, "Required".to_owned()));
                return None;
            }
            Some(v) => v,
        };

        match &self.kind {
            Kind::Any => Some(value.clone()),
            Kind::Never => {
                issues.push(mismatch("never", value, path));
                None
            }
            Kind::String => match value {
                Value::String(_) => Some(value.clone()),
                Value::Number(n) if self.coerce => Some(Value::String(n.to_string())),
                _ => {
                    issues.push(mismatch("string", value, path));
                    None
                }
            },
            Kind::Boolean => match value {
                Value::Bool(_) => Some(value.clone()),
                Value::String(s) if self.coerce && (s == "true" || s == "false") => {
                    Some(Value::Bool(s == "true"))
                }
                _ => {
                    issues.push(mismatch("boolean", value, path));
                    None
                }
            },
            Kind::Number => match value {
                Value::Number(_) => Some(value.clone()),
                Value::String(s) if self.coerce => match s.trim().parse::<f64>() {
                    Ok(n) if n.is_finite() => Some(number_value(n)),
                    _ => {
                        issues.push(type_issue(
                            "number",
                            "nan",
                            path,
                            "Expected number, received nan".to_owned(),
                        ));
                        None
                    }
                },
                _ => {
                    issues.push(mismatch("number", value, path));
                    None
                }
            },
            Kind::Array(item) => {
                let Value::Array(items) = value else {
                    issues.push(mismatch("array", value, path));
                    return None;
                };
                let mut out = Vec::with_capacity(items.len());
                for (i, v) in items.iter().enumerate() {
                    path.push(Value::from(i));
                    if let Some(parsed) = item.check(Some(v), path, issues) {
                        out.push(parsed);
                    }
                    path.pop();
                }
                Some(Value::Array(out))
            }
            Kind::Object(fields) => {
                let Value::Object(map) = value else {
                    issues.push(mismatch("object", value, path));
                    return None;
                };
                let mut out = Map::new();
                for (key, schema) in fields {
                    path.push(Value::String(key.clone()));
                    if let Some(parsed) = schema.check(map.get(key), path, issues) {
                        out.insert(key.clone(), parsed);
                    }
                    path.pop();
                }
                Some(Value::Object(out))
            }
        }
    }
}

impl Schema for TypeSchema {
    fn validate(&self, value: &Value) -> Result<Value, Vec<Issue>> {
        let mut issues = Vec::new();
        let parsed = self.check(Some(value), &mut Vec::new(), &mut issues);
        if issues.is_empty() {
            Ok(parsed.unwrap_or(Value::Null))
        } else {
            Err(issues)
        }
    }

    fn is_never(&self) -> bool {
        matches!(self.kind, Kind::Never)
    }
}

impl Kind {
    fn name(&self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::Array(_) => "array",
            Self::Boolean => "boolean",
            Self::Never => "never",
            Self::Number => "number",
            Self::Object(_) => "object",
            Self::String => "string",
        }
    }
}

fn received(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn mismatch(expected: &str, value: &Value, path: &[Value]) -> Issue {
    let got = received(value);
    type_issue(expected, got, path, format!("Expected {expected}, received {got}"))
}

fn type_issue(expected: &str, got: &str, path: &[Value], message: String) -> Issue {
    Issue {
        code: "invalid_type".to_owned(),
        expected: Some(expected.to_owned()),
        received: Some(got.to_owned()),
        path: path.to_vec(),
        message,
    }
}

/// Integral floats become JSON integers so `"2"` coerces to `2`, not `2.0`.
fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        Value::from(n as i64)
    } else {
        Number::from_f64(n).map_or(Value::Null, Value::Number)
    }
}
