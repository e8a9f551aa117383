//! Core types for Alexandria.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod example;
pub mod function;
pub mod id;
pub mod identity;
pub mod wire;

pub use email::{Email, EmailAddress, EmailError};
pub use example::{CreateExampleArgs, CreateExampleResult, ExampleMessage};
pub use function::{FunctionKind, FunctionPath, FunctionPathError};
pub use id::*;
pub use identity::{IdentityState, User};
pub use wire::{FunctionCall, FunctionResult, ValueFormat};
