//! Argument validators.
//!
//! Every function declares the shape of its arguments with the [`v`]
//! builders. Arguments are checked against the declaration before the
//! handler runs, so handlers only ever see well-formed input.
//!
//! ```rust
//! use alexandria_backend::values::v;
//! use serde_json::json;
//!
//! let args = v::object([("text", v::string())]);
//! assert!(args.validate(&json!({"text": "hi"})).is_ok());
//! assert!(args.validate(&json!({"text": 5})).is_err());
//! ```

use core::fmt;
use std::collections::BTreeMap;

use serde_json::Value;
use thiserror::Error;

/// Why a value was rejected.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Value has the wrong type.
    #[error("Value does not match validator.\nPath: {path}\nValue: {value}\nValidator: {validator}")]
    Mismatch {
        path: String,
        value: String,
        validator: String,
    },
    /// Required object field absent.
    #[error("Object is missing the required field `{field}`.\nPath: {path}")]
    MissingField { path: String, field: String },
    /// Object field not declared by the validator.
    #[error("Object contains extra field `{field}` that is not in the validator.\nPath: {path}")]
    ExtraField { path: String, field: String },
}

/// Shape a value must have.
#[derive(Debug, Clone, PartialEq)]
pub enum Validator {
    String,
    Number,
    Boolean,
    Null,
    Any,
    Literal(Value),
    Array(Box<Validator>),
    Object(BTreeMap<String, Validator>),
    /// Only meaningful as an object field: the field may be absent.
    Optional(Box<Validator>),
}

/// Validator builders.
pub mod v {
    use super::Validator;

    #[must_use]
    pub const fn string() -> Validator {
        Validator::String
    }

    #[must_use]
    pub const fn number() -> Validator {
        Validator::Number
    }

    #[must_use]
    pub const fn boolean() -> Validator {
        Validator::Boolean
    }

    #[must_use]
    pub const fn null() -> Validator {
        Validator::Null
    }

    #[must_use]
    pub const fn any() -> Validator {
        Validator::Any
    }

    #[must_use]
    pub fn literal(value: impl Into<serde_json::Value>) -> Validator {
        Validator::Literal(value.into())
    }

    #[must_use]
    pub fn array(item: Validator) -> Validator {
        Validator::Array(Box::new(item))
    }

    #[must_use]
    pub fn optional(inner: Validator) -> Validator {
        Validator::Optional(Box::new(inner))
    }

    #[must_use]
    pub fn object<'a>(fields: impl IntoIterator<Item = (&'a str, Validator)>) -> Validator {
        Validator::Object(
            fields
                .into_iter()
                .map(|(name, validator)| (name.to_owned(), validator))
                .collect(),
        )
    }

    /// Validator for functions that take no arguments.
    #[must_use]
    pub fn none() -> Validator {
        object([])
    }
}

impl Validator {
    /// Check `value` against this validator.
    ///
    /// # Errors
    ///
    /// Returns the first mismatch found, with the path to the offending value.
    pub fn validate(&self, value: &Value) -> Result<(), ValidationError> {
        self.check(value, "")
    }

    fn check(&self, value: &Value, path: &str) -> Result<(), ValidationError> {
        let matches = match (self, value) {
            (Self::Any, _)
            | (Self::String, Value::String(_))
            | (Self::Number, Value::Number(_))
            | (Self::Boolean, Value::Bool(_))
            | (Self::Null, Value::Null) => true,
            (Self::Literal(expected), actual) => expected == actual,
            (Self::Optional(inner), _) => return inner.check(value, path),
            (Self::Array(item), Value::Array(items)) => {
                for (i, element) in items.iter().enumerate() {
                    item.check(element, &format!("{path}[{i}]"))?;
                }
                true
            }
            (Self::Object(fields), Value::Object(map)) => {
                for (name, validator) in fields {
                    let field_path = format!("{path}.{name}");
                    match map.get(name) {
                        Some(field) => validator.check(field, &field_path)?,
                        None if matches!(validator, Self::Optional(_)) => {}
                        None => {
                            return Err(ValidationError::MissingField {
                                path: display_path(path),
                                field: name.clone(),
                            });
                        }
                    }
                }
                if let Some(extra) = map.keys().find(|key| !fields.contains_key(*key)) {
                    return Err(ValidationError::ExtraField {
                        path: display_path(path),
                        field: extra.clone(),
                    });
                }
                true
            }
            _ => false,
        };

        if matches {
            Ok(())
        } else {
            Err(ValidationError::Mismatch {
                path: display_path(path),
                value: value.to_string(),
                validator: self.to_string(),
            })
        }
    }
}

fn display_path(path: &str) -> String {
    if path.is_empty() {
        "(root)".to_owned()
    } else {
        path.to_owned()
    }
}

impl fmt::Display for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => f.write_str("v.string()"),
            Self::Number => f.write_str("v.number()"),
            Self::Boolean => f.write_str("v.boolean()"),
            Self::Null => f.write_str("v.null()"),
            Self::Any => f.write_str("v.any()"),
            Self::Literal(value) => write!(f, "v.literal({value})"),
            Self::Array(item) => write!(f, "v.array({item})"),
            Self::Optional(inner) => write!(f, "v.optional({inner})"),
            Self::Object(fields) => {
                f.write_str("v.object({")?;
                for (i, (name, validator)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{name}: {validator}")?;
                }
                f.write_str("})")
            }
        }
    }
}
