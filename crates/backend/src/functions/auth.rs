//! The `auth` module.

use serde_json::Value;

use alexandria_core::FunctionPath;

use crate::context::FunctionContext;
use crate::error::FunctionError;
use crate::registry::{FunctionDefinition, NoArgs};
use crate::values::v;

pub(crate) fn definitions() -> Result<Vec<FunctionDefinition>, FunctionError> {
    Ok(vec![FunctionDefinition::query(
        FunctionPath::new("auth", "currentUser")?,
        v::none(),
        current_user,
    )])
}

/// `auth:currentUser`
///
/// Always `null`, even for authenticated callers. There is no user table to
/// look the caller up in yet; the identity is available via `ctx.auth()`.
///
/// # Errors
///
/// Never fails.
pub async fn current_user(ctx: FunctionContext, _args: NoArgs) -> Result<Value, FunctionError> {
    if let Some(identity) = ctx.auth() {
        tracing::debug!(subject = %identity.subject, "currentUser called by authenticated caller");
    }
    Ok(Value::Null)
}
