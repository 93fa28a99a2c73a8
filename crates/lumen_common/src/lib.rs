//! Shared building blocks for the lumen workspace.
//!
//! Every other crate in the workspace pulls its error-to-HTTP rendering and
//! logging setup from here so the crates agree on one set of conventions.

pub mod error;
pub mod http;
pub mod logging;

pub use error::LumenError;
