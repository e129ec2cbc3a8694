//! # Stylebatch Clients
//!
//! Clients for the collaborators the worker loop calls out to:
//!
//! - [`GenerationService`]: turns a prompt into image bytes.
//! - [`ArtifactStore`]: object storage for generated artifacts
//!   (upload, bulk delete, paginated prefix listing).
//!
//! Both are consumed as `Arc<dyn Trait>` so tests and local development
//! can swap in [`InMemoryArtifactStore`] or a mock generator.

pub mod generation;
pub mod memory;
pub mod storage;

pub use generation::{GenerationService, HttpGenerationClient};
pub use memory::InMemoryArtifactStore;
pub use storage::{
    build_artifact_store, ArtifactStore, HttpArtifactStore, StoredObject, MAX_DELETE_BATCH,
};
