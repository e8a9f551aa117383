//! Backend function addressing.

use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Kind of backend function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FunctionKind {
    /// Read-only; results may be subscribed to.
    Query,
    /// Changes backend state; called explicitly.
    Mutation,
}

impl fmt::Display for FunctionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Query => f.write_str("query"),
            Self::Mutation => f.write_str("mutation"),
        }
    }
}

/// Errors that can occur when parsing a [`FunctionPath`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FunctionPathError {
    /// The input string is empty.
    #[error("function path cannot be empty")]
    Empty,
    /// No `:` or `.` between module and function name.
    #[error("function path '{0}' must have the form module:function")]
    MissingSeparator(String),
    /// Module or function name is empty or contains invalid characters.
    #[error("function path '{0}' contains an invalid identifier")]
    InvalidIdentifier(String),
}

/// Address of a backend function, e.g. `example:getExample`.
///
/// Parses both the call convention form `module:function` and the dotted
/// form `module.function`. Modules may be nested with `/`
/// (`admin/users:list`). Always displays in the `module:function` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FunctionPath {
    module: String,
    name: String,
}

impl FunctionPath {
    /// Parse a function path.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is empty, lacks a separator, or has an
    /// empty or non-identifier segment.
    pub fn parse(s: &str) -> Result<Self, FunctionPathError> {
        if s.is_empty() {
            return Err(FunctionPathError::Empty);
        }

        let (module, name) = s
            .rsplit_once(':')
            .or_else(|| s.rsplit_once('.'))
            .ok_or_else(|| FunctionPathError::MissingSeparator(s.to_owned()))?;

        let module_ok = !module.is_empty() && module.split('/').all(is_identifier);
        if !module_ok || !is_identifier(name) {
            return Err(FunctionPathError::InvalidIdentifier(s.to_owned()));
        }

        Ok(Self {
            module: module.to_owned(),
            name: name.to_owned(),
        })
    }

    /// Build a path from known-good parts.
    ///
    /// # Errors
    ///
    /// Returns an error if either part is not a valid identifier.
    pub fn new(module: &str, name: &str) -> Result<Self, FunctionPathError> {
        Self::parse(&format!("{module}:{name}"))
    }

    /// Module segment (`example` in `example:getExample`).
    #[must_use]
    pub fn module(&self) -> &str {
        &self.module
    }

    /// Function name segment (`getExample` in `example:getExample`).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

fn is_identifier(segment: &str) -> bool {
    let mut chars = segment.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl fmt::Display for FunctionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.module, self.name)
    }
}

impl FromStr for FunctionPath {
    type Err = FunctionPathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for FunctionPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FunctionPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_colon_form() {
        let path = FunctionPath::parse("example:getExample").unwrap();
        assert_eq!(path.module(), "example");
        assert_eq!(path.name(), "getExample");
        assert_eq!(path.to_string(), "example:getExample");
    }

    #[test]
    fn test_parse_dotted_form_normalizes() {
        let path = FunctionPath::parse("auth.currentUser").unwrap();
        assert_eq!(path.module(), "auth");
        assert_eq!(path.name(), "currentUser");
        assert_eq!(path.to_string(), "auth:currentUser");
        assert_eq!(path, FunctionPath::parse("auth:currentUser").unwrap());
    }

    #[test]
    fn test_parse_nested_module() {
        let path = FunctionPath::parse("admin/users:list").unwrap();
        assert_eq!(path.module(), "admin/users");
        assert_eq!(path.name(), "list");
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(FunctionPath::parse(""), Err(FunctionPathError::Empty));
        assert!(matches!(
            FunctionPath::parse("getExample"),
            Err(FunctionPathError::MissingSeparator(_))
        ));
        assert!(matches!(
            FunctionPath::parse(":getExample"),
            Err(FunctionPathError::InvalidIdentifier(_))
        ));
        assert!(matches!(
            FunctionPath::parse("example:"),
            Err(FunctionPathError::InvalidIdentifier(_))
        ));
        assert!(matches!(
            FunctionPath::parse("example:get-example"),
            Err(FunctionPathError::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn test_serde_uses_colon_form() {
        let path: FunctionPath = serde_json::from_str("\"example.createExample\"").unwrap();
        assert_eq!(
            serde_json::to_string(&path).unwrap(),
            "\"example:createExample\""
        );
        assert!(serde_json::from_str::<FunctionPath>("\"nope\"").is_err());
    }
}
