//! Typed wrappers for the backend functions the pages call.

use futures::StreamExt;
use futures::stream::BoxStream;
use serde_json::json;

use alexandria_core::{CreateExampleArgs, CreateExampleResult, ExampleMessage, FunctionPath};

use super::{BackendClient, BackendError};

/// `example:getExample`
///
/// # Errors
///
/// Never fails; the path is a fixed identifier pair.
pub fn get_example_path() -> Result<FunctionPath, BackendError> {
    Ok(FunctionPath::new("example", "getExample")?)
}

/// `example:createExample`
///
/// # Errors
///
/// Never fails; the path is a fixed identifier pair.
pub fn create_example_path() -> Result<FunctionPath, BackendError> {
    Ok(FunctionPath::new("example", "createExample")?)
}

/// Fetch the example message.
///
/// # Errors
///
/// Returns an error if the call fails or the result has the wrong shape.
pub async fn get_example(
    client: &dyn BackendClient,
    token: Option<&str>,
) -> Result<ExampleMessage, BackendError> {
    let value = client.query(&get_example_path()?, json!({}), token).await?;
    Ok(serde_json::from_value(value)?)
}

/// Live example messages.
///
/// # Errors
///
/// Returns an error if the subscription cannot be opened.
pub async fn subscribe_example(
    client: &dyn BackendClient,
    token: Option<&str>,
) -> Result<BoxStream<'static, Result<ExampleMessage, BackendError>>, BackendError> {
    let stream = client.subscribe(&get_example_path()?, json!({}), token).await?;
    Ok(stream
        .map(|value| -> Result<ExampleMessage, BackendError> {
            Ok(serde_json::from_value(value?)?)
        })
        .boxed())
}

/// Run the example mutation.
///
/// # Errors
///
/// Returns an error if the call fails or the result has the wrong shape.
pub async fn create_example(
    client: &dyn BackendClient,
    token: Option<&str>,
    args: &CreateExampleArgs,
) -> Result<CreateExampleResult, BackendError> {
    let value = client
        .mutation(&create_example_path()?, serde_json::to_value(args)?, token)
        .await?;
    Ok(serde_json::from_value(value)?)
}
