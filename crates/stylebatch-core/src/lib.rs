//! # Stylebatch Core
//!
//! Core types, traits, and error definitions for Stylebatch.
//! Every other crate in the workspace builds on the domain model,
//! status state machines, and error type defined here.

pub mod domain;
pub mod error;
pub mod id;
pub mod result;
pub mod telemetry;
pub mod traits;
pub mod validation;

pub use domain::*;
pub use error::*;
pub use id::*;
pub use result::*;
pub use traits::*;
pub use validation::*;

// Re-export shaku for injected trait objects
pub use shaku::Interface;
