//! Request and response envelopes of the backend call convention.
//!
//! ```text
//! POST /api/query
//! {"path": "example:getExample", "args": {}, "format": "json"}
//!
//! {"status": "success", "value": {"message": "Hello from Convex!"}, "logLines": []}
//! {"status": "error", "errorMessage": "...", "logLines": []}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::function::FunctionPath;

/// Encoding of values in call envelopes. Only JSON is supported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueFormat {
    #[default]
    Json,
}

/// A call to a backend function.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionCall {
    pub path: FunctionPath,
    /// Arguments object. Missing means no arguments.
    #[serde(default = "empty_args")]
    pub args: Value,
    #[serde(default)]
    pub format: ValueFormat,
}

impl FunctionCall {
    #[must_use]
    pub fn new(path: FunctionPath, args: Value) -> Self {
        Self {
            path,
            args,
            format: ValueFormat::Json,
        }
    }
}

fn empty_args() -> Value {
    Value::Object(serde_json::Map::new())
}

/// Outcome of a backend function call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum FunctionResult {
    Success {
        value: Value,
        #[serde(rename = "logLines", default)]
        log_lines: Vec<String>,
    },
    Error {
        #[serde(rename = "errorMessage")]
        error_message: String,
        #[serde(rename = "errorData", default, skip_serializing_if = "Option::is_none")]
        error_data: Option<Value>,
        #[serde(rename = "logLines", default)]
        log_lines: Vec<String>,
    },
}

impl FunctionResult {
    #[must_use]
    pub const fn success(value: Value) -> Self {
        Self::Success {
            value,
            log_lines: Vec::new(),
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error_message: message.into(),
            error_data: None,
            log_lines: Vec::new(),
        }
    }

    /// Convert into the returned value or the error message.
    ///
    /// # Errors
    ///
    /// Returns the error message if the call failed.
    pub fn into_result(self) -> Result<Value, String> {
        match self {
            Self::Success { value, .. } => Ok(value),
            Self::Error { error_message, .. } => Err(error_message),
        }
    }
}
