//! # Stylebatch Server Library
//!
//! Composition root and startup utilities for the Stylebatch server.

pub mod app;
pub mod observability;
pub mod startup;
