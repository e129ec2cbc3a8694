//! Process-local artifact store.

use crate::storage::{ArtifactStore, StoredObject, MAX_DELETE_BATCH};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use stylebatch_core::{BatchError, BatchResult};

#[derive(Debug, Clone)]
struct StoredArtifact {
    bytes: Vec<u8>,
    content_type: String,
}

/// Artifact store that keeps objects in memory.
///
/// Enforces the same delete batch limit as the HTTP store. Public URLs
/// use the `memory://` scheme.
#[derive(Debug)]
pub struct InMemoryArtifactStore {
    bucket: String,
    objects: Mutex<BTreeMap<String, StoredArtifact>>,
}

impl InMemoryArtifactStore {
    pub fn new(bucket: &str) -> Self {
        Self {
            bucket: bucket.to_string(),
            objects: Mutex::new(BTreeMap::new()),
        }
    }

    /// Stores an object directly, e.g. to stage an orphaned upload.
    pub fn insert(&self, path: &str, bytes: Vec<u8>, content_type: &str) {
        self.objects.lock().insert(
            path.to_string(),
            StoredArtifact {
                bytes,
                content_type: content_type.to_string(),
            },
        );
    }

    pub fn contains(&self, path: &str) -> bool {
        self.objects.lock().contains_key(path)
    }

    /// Bytes and content type of a stored object.
    pub fn get(&self, path: &str) -> Option<(Vec<u8>, String)> {
        self.objects
            .lock()
            .get(path)
            .map(|a| (a.bytes.clone(), a.content_type.clone()))
    }

    /// All stored paths in order.
    pub fn paths(&self) -> Vec<String> {
        self.objects.lock().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.objects.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.lock().is_empty()
    }
}

#[async_trait]
impl ArtifactStore for InMemoryArtifactStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> BatchResult<String> {
        let path = path.trim_start_matches('/');
        self.insert(path, bytes, content_type);
        Ok(format!("memory://{}/{}", self.bucket, path))
    }

    async fn delete(&self, paths: &[String]) -> BatchResult<u64> {
        if paths.len() > MAX_DELETE_BATCH {
            return Err(BatchError::validation(format!(
                "at most {MAX_DELETE_BATCH} paths per delete, got {}",
                paths.len()
            )));
        }
        let mut objects = self.objects.lock();
        let removed = paths.iter().filter(|p| objects.remove(p.as_str()).is_some()).count();
        Ok(removed as u64)
    }

    async fn list(&self, prefix: &str) -> BatchResult<Vec<StoredObject>> {
        let prefix = prefix.trim_matches('/');
        let scoped = if prefix.is_empty() {
            String::new()
        } else {
            format!("{prefix}/")
        };
        Ok(self
            .objects
            .lock()
            .iter()
            .filter(|(path, _)| path.starts_with(&scoped))
            .map(|(path, artifact)| StoredObject {
                path: path.clone(),
                size: Some(artifact.bytes.len() as u64),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upload_list_delete() {
        let store = InMemoryArtifactStore::new("artifacts");
        let url = store.upload("job/a.png", vec![1, 2], "image/png").await.unwrap();
        store.insert("job/orphan.png", vec![3], "image/png");
        store.insert("jobx/other.png", vec![4], "image/png");

        assert_eq!(url, "memory://artifacts/job/a.png");
        assert_eq!(store.get("job/a.png"), Some((vec![1, 2], "image/png".to_string())));

        let listed: Vec<String> = store.list("job").await.unwrap().into_iter().map(|o| o.path).collect();
        assert_eq!(listed, vec!["job/a.png", "job/orphan.png"]);

        let removed = store
            .delete(&["job/a.png".to_string(), "job/missing.png".to_string()])
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert!(!store.contains("job/a.png"));
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_delete_enforces_batch_limit() {
        let store = InMemoryArtifactStore::new("artifacts");
        let paths: Vec<String> = (0..=MAX_DELETE_BATCH).map(|i| i.to_string()).collect();
        assert!(store.delete(&paths).await.is_err());
    }
}
