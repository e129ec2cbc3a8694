//! # Stylebatch REST
//!
//! REST API layer using Axum for Stylebatch.
//! Provides HTTP endpoints for job submission, status, resume and
//! cancellation, queue draining, and health checks.

pub mod controllers;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod responses;
pub mod router;
pub mod state;

pub use router::*;
pub use state::*;
