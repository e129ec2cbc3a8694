//! Domain model: jobs, work items, catalog records and generation types.

pub mod catalog;
pub mod generation;
pub mod job;
pub mod status;
pub mod work_item;

pub use catalog::*;
pub use generation::*;
pub use job::*;
pub use status::*;
pub use work_item::*;
