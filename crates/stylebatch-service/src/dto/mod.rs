//! Data transfer objects.

mod job_dto;
mod queue_dto;

pub use job_dto::*;
pub use queue_dto::*;
