//! # Stylebatch Config
//!
//! Configuration management for Stylebatch.
//! Supports layered configuration from files and environment variables,
//! validated in full before the server starts.

mod app_config;
mod loader;
mod validation;

pub use app_config::*;
pub use loader::*;
pub use validation::*;
