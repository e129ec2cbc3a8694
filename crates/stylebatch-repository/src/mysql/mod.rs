//! MySQL repository implementations.

mod catalog_repository;
mod job_repository;
mod work_item_repository;

pub use catalog_repository::MySqlCatalogRepository;
pub use job_repository::MySqlJobRepository;
pub use work_item_repository::MySqlWorkItemRepository;

use stylebatch_core::BatchError;
use uuid::Uuid;

/// Renders status names as a SQL `IN` list.
///
/// Only fed with the static names of status enums, never user input.
fn sql_in_list<'a>(names: impl IntoIterator<Item = &'a str>) -> String {
    names
        .into_iter()
        .map(|name| format!("'{}'", name))
        .collect::<Vec<_>>()
        .join(", ")
}

fn parse_uuid(value: &str) -> Result<Uuid, BatchError> {
    Uuid::parse_str(value)
        .map_err(|e| BatchError::Internal(format!("Invalid UUID in database: {}", e)))
}

fn to_u32(value: i64, column: &str) -> Result<u32, BatchError> {
    u32::try_from(value)
        .map_err(|_| BatchError::Internal(format!("{} out of range: {}", column, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use stylebatch_core::JobStatus;

    #[test]
    fn test_sql_in_list() {
        let sources = JobStatus::sources_of(JobStatus::Running);
        assert_eq!(
            sql_in_list(sources.iter().map(JobStatus::as_str)),
            "'queued', 'running', 'error'"
        );
    }

    #[test]
    fn test_to_u32_rejects_negative() {
        assert!(to_u32(-1, "total").is_err());
        assert_eq!(to_u32(7, "total").unwrap(), 7);
    }
}
