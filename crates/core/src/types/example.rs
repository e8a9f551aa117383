//! Records returned by the `example` backend module.

use serde::{Deserialize, Serialize};

/// Result of `example:getExample`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExampleMessage {
    pub message: String,
}

impl ExampleMessage {
    /// The fixed greeting returned by `example:getExample`.
    pub const GREETING: &'static str = "Hello from Convex!";

    #[must_use]
    pub fn greeting() -> Self {
        Self {
            message: Self::GREETING.to_owned(),
        }
    }
}

/// Arguments of `example:createExample`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateExampleArgs {
    pub text: String,
}

impl CreateExampleArgs {
    /// Payload sent by the dashboard's mutation button.
    pub const DASHBOARD_TEXT: &'static str = "Hello from dashboard!";

    #[must_use]
    pub fn dashboard() -> Self {
        Self {
            text: Self::DASHBOARD_TEXT.to_owned(),
        }
    }
}

/// Result of `example:createExample`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateExampleResult {
    pub success: bool,
    pub text: String,
}
