//! # Stylebatch Service
//!
//! Batch processing services:
//!
//! - [`JobService`]: create, read, resume and cancel jobs.
//! - [`QueueDrainer`]: one stateless pass of the worker loop over the
//!   queue. Any number of drains may run at once, in one process or many;
//!   they coordinate only through the job store and the queue.
//! - [`ProgressAggregator`]: recomputes job counters from work item state.
//! - [`DrainScheduler`]: cron trigger that runs drains in-process.

pub mod dto;
pub mod job_service;
pub mod job_service_impl;
pub mod metrics;
pub mod progress;
pub mod scheduler;
pub mod worker;

pub use dto::*;
pub use job_service::*;
pub use job_service_impl::JobServiceImpl;
pub use progress::ProgressAggregator;
pub use scheduler::DrainScheduler;
pub use worker::{DrainSettings, QueueDrainer, QueueWorker};
