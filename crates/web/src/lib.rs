//! Alexandria web front-end library.
//!
//! Server-rendered pages (home, about, dashboard) on top of an identity
//! provider and the backend's query and mutation functions. Exposed as a
//! library so the router can be tested and embedded.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod backend;
pub mod config;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::WebConfig;
pub use routes::app;
pub use state::AppState;
