//! The `example` module: a fixed greeting and an echoing mutation.

use tracing::instrument;

use alexandria_core::{CreateExampleArgs, CreateExampleResult, ExampleMessage, FunctionPath};

use crate::context::FunctionContext;
use crate::error::FunctionError;
use crate::registry::{FunctionDefinition, NoArgs};
use crate::values::v;

const MODULE: &str = "example";

pub(crate) fn definitions() -> Result<Vec<FunctionDefinition>, FunctionError> {
    Ok(vec![
        FunctionDefinition::query(
            FunctionPath::new(MODULE, "getExample")?,
            v::none(),
            get_example,
        ),
        FunctionDefinition::mutation(
            FunctionPath::new(MODULE, "createExample")?,
            v::object([("text", v::string())]),
            create_example,
        ),
    ])
}

/// `example:getExample`
///
/// # Errors
///
/// Never fails.
pub async fn get_example(_ctx: FunctionContext, _args: NoArgs) -> Result<ExampleMessage, FunctionError> {
    Ok(ExampleMessage::greeting())
}

/// `example:createExample`: echoes the text back. Nothing is stored.
///
/// # Errors
///
/// Never fails once arguments have been validated.
#[instrument(skip_all, fields(authenticated = ctx.auth().is_some()))]
pub async fn create_example(
    ctx: FunctionContext,
    args: CreateExampleArgs,
) -> Result<CreateExampleResult, FunctionError> {
    tracing::debug!(len = args.text.len(), "createExample");
    Ok(CreateExampleResult {
        success: true,
        text: args.text,
    })
}
