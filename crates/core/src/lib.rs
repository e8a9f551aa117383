//! Alexandria Core - Shared types library.
//!
//! This crate provides common types used across all Alexandria components:
//! - `web` - Server-rendered front-end (home, about, dashboard)
//! - `backend` - Query and mutation functions served over HTTP
//! - `identity` - Identity provider integration
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no HTTP clients.
//! This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Provider IDs, emails, identity state, function paths, and the
//!   call envelopes shared by the backend API and its clients

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
