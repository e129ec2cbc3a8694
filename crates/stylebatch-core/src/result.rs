//! Result type aliases for Stylebatch.

use crate::BatchError;

/// A specialized `Result` type for Stylebatch operations.
pub type BatchResult<T> = Result<T, BatchError>;
