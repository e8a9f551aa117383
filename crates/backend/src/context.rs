//! Per-call context handed to function handlers.

use serde::Serialize;

use alexandria_identity::SessionClaims;

/// The authenticated caller, as established from a verified session token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIdentity {
    /// `{issuer}|{subject}`, unique across providers.
    pub token_identifier: String,
    pub subject: String,
    pub issuer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl From<&SessionClaims> for UserIdentity {
    fn from(claims: &SessionClaims) -> Self {
        Self {
            token_identifier: claims.token_identifier(),
            subject: claims.sub.clone(),
            issuer: claims.iss.clone(),
            given_name: claims.first_name.clone(),
            email: claims.email.clone(),
        }
    }
}

/// Context of a single function invocation.
#[derive(Debug, Clone, Default)]
pub struct FunctionContext {
    identity: Option<UserIdentity>,
}

impl FunctionContext {
    #[must_use]
    pub const fn new(identity: Option<UserIdentity>) -> Self {
        Self { identity }
    }

    /// Context of an anonymous call.
    #[must_use]
    pub const fn anonymous() -> Self {
        Self { identity: None }
    }

    /// The caller's identity, or `None` for anonymous calls.
    #[must_use]
    pub const fn auth(&self) -> Option<&UserIdentity> {
        self.identity.as_ref()
    }
}
