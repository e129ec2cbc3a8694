//! # Stylebatch Repository
//!
//! Job store for Stylebatch: jobs, work items and the read-only catalog,
//! backed by MySQL through SQLx.
//!
//! ```text
//! Service
//!   ↓  Arc<dyn JobRepository> / Arc<dyn WorkItemRepository> / Arc<dyn CatalogRepository>
//! MySqlJobRepository, MySqlWorkItemRepository, MySqlCatalogRepository
//!   ↓  Arc<dyn DatabasePoolInterface>
//! MySQL
//! ```
//!
//! Every status write is conditional on the row's current status, so the
//! state machines in `stylebatch_core` hold even when several workers race
//! on the same rows.

pub mod mysql;
pub mod pool;
pub mod traits;

pub use mysql::*;
pub use pool::*;
pub use traits::*;
