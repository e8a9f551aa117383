//! Functions served by the backend.
//!
//! Each module registers its functions under its own name, so
//! `example.rs` provides `example:getExample` and `example:createExample`.

pub mod auth;
pub mod example;

use crate::error::FunctionError;
use crate::registry::FunctionRegistry;

/// Build the registry of every function the backend serves.
///
/// # Errors
///
/// Returns an error if a path is malformed or registered twice.
pub fn registry() -> Result<FunctionRegistry, FunctionError> {
    let mut registry = FunctionRegistry::new();
    for definition in example::definitions()?.into_iter().chain(auth::definitions()?) {
        registry.register(definition)?;
    }
    Ok(registry)
}
