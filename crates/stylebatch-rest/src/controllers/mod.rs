//! REST API controllers.

pub mod health_controller;
pub mod job_controller;
pub mod queue_controller;
