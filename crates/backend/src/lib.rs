//! Alexandria backend.
//!
//! Serves the application's query and mutation functions over HTTP using
//! the call convention in [`alexandria_core::FunctionCall`]. Also usable
//! in-process: [`Backend`] is the same service without the HTTP layer.
//!
//! # Modules
//!
//! - [`functions`] - The functions themselves (`example`, `auth`)
//! - [`registry`] - Registration, argument validation, and dispatch
//! - [`subscriptions`] - Live query results pushed after mutations
//! - [`routes`] - HTTP API

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod backend;
pub mod config;
pub mod context;
pub mod error;
pub mod functions;
pub mod registry;
pub mod routes;
pub mod subscriptions;
pub mod values;

pub use backend::Backend;
pub use config::{BackendConfig, ConfigError, SentryConfig};
pub use context::{FunctionContext, UserIdentity};
pub use error::{ApiError, FunctionError};
pub use subscriptions::{QueryValue, Subscription};
