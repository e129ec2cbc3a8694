//! Shared fixtures for service tests: an in-memory job store, a queue
//! that can be told to fail, and a mock generation service.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use mockall::mock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use stylebatch_clients::{ArtifactStore, GenerationService, InMemoryArtifactStore, StoredObject};
use stylebatch_core::{
    BatchError, BatchResult, GeneratedImage, GenerationRequest, Job, JobId, JobStatus, Style,
    StyleId, SubjectList, SubjectListId, WorkItem, WorkItemChange, WorkItemId, WorkItemStatus,
};
use stylebatch_queue::{
    DurableQueue, InMemoryQueue, MessageId, QueueError, QueueMessage, QueueResult, QueueStats,
    TaskPayload,
};
use stylebatch_repository::{CatalogRepository, ItemCounts, JobRepository, WorkItemRepository};
use stylebatch_service::{DrainSettings, JobServiceImpl, QueueWorker};

pub const VT: Duration = Duration::from_secs(120);

/// Job store backed by hash maps, with the same conditional-write rules
/// as the MySQL repositories.
#[derive(Default)]
pub struct InMemoryStore {
    jobs: Mutex<HashMap<JobId, Job>>,
    items: Mutex<HashMap<WorkItemId, WorkItem>>,
    styles: Mutex<HashMap<StyleId, Style>>,
    subject_lists: Mutex<HashMap<SubjectListId, SubjectList>>,
    unavailable: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_style(&self, template: &str) -> StyleId {
        let style = Style {
            id: StyleId::new(),
            name: "watercolor".to_string(),
            prompt_template: template.to_string(),
            negative_prompt: Some("blurry".to_string()),
            parameters: serde_json::json!({"steps": 20}),
            created_at: Utc::now(),
        };
        let id = style.id;
        self.styles.lock().unwrap().insert(id, style);
        id
    }

    pub fn add_subject_list(&self, subjects: &[&str]) -> SubjectListId {
        let list = SubjectList {
            id: SubjectListId::new(),
            name: "animals".to_string(),
            subjects: subjects.iter().map(|s| (*s).to_string()).collect(),
            created_at: Utc::now(),
        };
        let id = list.id;
        self.subject_lists.lock().unwrap().insert(id, list);
        id
    }

    pub fn job(&self, id: JobId) -> Option<Job> {
        self.jobs.lock().unwrap().get(&id).cloned()
    }

    pub fn item(&self, id: WorkItemId) -> Option<WorkItem> {
        self.items.lock().unwrap().get(&id).cloned()
    }

    pub fn items_of(&self, job_id: JobId) -> Vec<WorkItem> {
        let mut items: Vec<WorkItem> = self
            .items
            .lock()
            .unwrap()
            .values()
            .filter(|i| i.job_id == job_id)
            .cloned()
            .collect();
        items.sort_by_key(|i| (i.created_at, i.id));
        items
    }

    /// Overwrites a stored item, bypassing transition rules.
    pub fn put_item(&self, item: WorkItem) {
        self.items.lock().unwrap().insert(item.id, item);
    }

    pub fn set_job_status(&self, id: JobId, status: JobStatus) {
        if let Some(job) = self.jobs.lock().unwrap().get_mut(&id) {
            job.status = status;
        }
    }

    /// Makes every work item read fail as if the database were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> BatchResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(BatchError::Database("connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl JobRepository for InMemoryStore {
    async fn create_with_items(&self, job: &Job, items: &[WorkItem]) -> BatchResult<()> {
        self.jobs.lock().unwrap().insert(job.id, job.clone());
        let mut stored = self.items.lock().unwrap();
        for item in items {
            stored.insert(item.id, item.clone());
        }
        Ok(())
    }

    async fn find_by_id(&self, id: JobId) -> BatchResult<Option<Job>> {
        Ok(self.job(id))
    }

    async fn update_status(
        &self,
        id: JobId,
        next: JobStatus,
        error: Option<&str>,
    ) -> BatchResult<bool> {
        let mut jobs = self.jobs.lock().unwrap();
        let Some(job) = jobs.get_mut(&id) else {
            return Ok(false);
        };
        Ok(job.set_status(next, error.map(str::to_string)).is_ok())
    }

    async fn apply_progress(
        &self,
        id: JobId,
        completed: u32,
        total: u32,
    ) -> BatchResult<Option<Job>> {
        let mut jobs = self.jobs.lock().unwrap();
        let Some(job) = jobs.get_mut(&id) else {
            return Ok(None);
        };
        if !job.is_cancelled() {
            // Counts are written even when the status edge is rejected.
            let _ = job.apply_progress(completed, total);
        }
        Ok(Some(job.clone()))
    }

    async fn delete(&self, id: JobId) -> BatchResult<bool> {
        Ok(self.jobs.lock().unwrap().remove(&id).is_some())
    }
}

#[async_trait]
impl WorkItemRepository for InMemoryStore {
    async fn find_by_id(&self, id: WorkItemId) -> BatchResult<Option<WorkItem>> {
        self.check_available()?;
        Ok(self.item(id))
    }

    async fn find_by_job(&self, job_id: JobId) -> BatchResult<Vec<WorkItem>> {
        Ok(self.items_of(job_id))
    }

    async fn find_by_job_and_status(
        &self,
        job_id: JobId,
        status: WorkItemStatus,
    ) -> BatchResult<Vec<WorkItem>> {
        Ok(self
            .items_of(job_id)
            .into_iter()
            .filter(|i| i.status == status)
            .collect())
    }

    async fn count_by_job(&self, job_id: JobId) -> BatchResult<ItemCounts> {
        let items = self.items_of(job_id);
        Ok(ItemCounts {
            total: items.len() as u32,
            done: items
                .iter()
                .filter(|i| i.status == WorkItemStatus::Done)
                .count() as u32,
        })
    }

    async fn compare_and_set(
        &self,
        id: WorkItemId,
        expected: WorkItemStatus,
        change: WorkItemChange,
    ) -> BatchResult<bool> {
        expected.transition_to(change.target())?;
        let mut items = self.items.lock().unwrap();
        match items.get_mut(&id) {
            Some(item) if item.status == expected => {
                item.apply(change)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_by_job(&self, job_id: JobId) -> BatchResult<u64> {
        let mut items = self.items.lock().unwrap();
        let before = items.len();
        items.retain(|_, i| i.job_id != job_id);
        Ok((before - items.len()) as u64)
    }
}

#[async_trait]
impl CatalogRepository for InMemoryStore {
    async fn find_style(&self, id: StyleId) -> BatchResult<Option<Style>> {
        Ok(self.styles.lock().unwrap().get(&id).cloned())
    }

    async fn find_subject_list(&self, id: SubjectListId) -> BatchResult<Option<SubjectList>> {
        Ok(self.subject_lists.lock().unwrap().get(&id).cloned())
    }
}

mock! {
    pub Generator {}

    #[async_trait]
    impl GenerationService for Generator {
        async fn generate(&self, request: &GenerationRequest) -> BatchResult<GeneratedImage>;
    }
}

pub fn png() -> GeneratedImage {
    GeneratedImage::new(vec![0x89, b'P', b'N', b'G'], "image/png")
}

/// Generator that succeeds exactly `times` times.
pub fn generator_ok(times: usize) -> MockGenerator {
    let mut generator = MockGenerator::new();
    generator.expect_generate().times(times).returning(|_| Ok(png()));
    generator
}

/// Generator that must never be called.
pub fn generator_unused() -> MockGenerator {
    let mut generator = MockGenerator::new();
    generator.expect_generate().never();
    generator
}

fn unavailable() -> QueueError {
    QueueError::Redis(redis::RedisError::from((
        redis::ErrorKind::IoError,
        "connection refused",
    )))
}

/// In-memory queue whose sends start failing after a number of
/// successes and whose reads can be switched off.
pub struct FlakyQueue {
    pub inner: InMemoryQueue,
    sends_before_failure: Option<usize>,
    sent: AtomicUsize,
    reads_fail: AtomicBool,
}

impl FlakyQueue {
    pub fn new(sends_before_failure: Option<usize>) -> Arc<Self> {
        Arc::new(Self {
            inner: InMemoryQueue::new("image_jobs"),
            sends_before_failure,
            sent: AtomicUsize::new(0),
            reads_fail: AtomicBool::new(false),
        })
    }

    pub fn fail_reads(&self) {
        self.reads_fail.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl DurableQueue for FlakyQueue {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn send(&self, payload: &TaskPayload, delay: Duration) -> QueueResult<MessageId> {
        if let Some(limit) = self.sends_before_failure {
            if self.sent.load(Ordering::SeqCst) >= limit {
                return Err(unavailable());
            }
        }
        self.sent.fetch_add(1, Ordering::SeqCst);
        self.inner.send(payload, delay).await
    }

    async fn read(&self, batch_size: u32, vt: Duration) -> QueueResult<Vec<QueueMessage>> {
        if self.reads_fail.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        self.inner.read(batch_size, vt).await
    }

    async fn delete(&self, message_id: MessageId) -> QueueResult<bool> {
        self.inner.delete(message_id).await
    }

    async fn stats(&self) -> QueueResult<QueueStats> {
        self.inner.stats().await
    }

    async fn health_check(&self) -> QueueResult<()> {
        Ok(())
    }
}

/// Artifact store whose uploads always fail.
pub struct BrokenUploads {
    pub inner: InMemoryArtifactStore,
}

#[async_trait]
impl ArtifactStore for BrokenUploads {
    fn bucket(&self) -> &str {
        self.inner.bucket()
    }

    async fn upload(&self, _path: &str, _bytes: Vec<u8>, _content_type: &str) -> BatchResult<String> {
        Err(BatchError::Storage("storage responded 503: unavailable".to_string()))
    }

    async fn delete(&self, paths: &[String]) -> BatchResult<u64> {
        self.inner.delete(paths).await
    }

    async fn list(&self, prefix: &str) -> BatchResult<Vec<StoredObject>> {
        self.inner.list(prefix).await
    }
}

pub fn settings() -> DrainSettings {
    DrainSettings {
        batch_size: 5,
        visibility_timeout: VT,
        max_attempts: 3,
    }
}

pub fn job_service(
    store: &Arc<InMemoryStore>,
    queue: Arc<dyn DurableQueue>,
    artifacts: Arc<dyn ArtifactStore>,
) -> JobServiceImpl {
    JobServiceImpl::new(store.clone(), store.clone(), store.clone(), queue, artifacts)
}

pub fn worker(
    store: &Arc<InMemoryStore>,
    queue: Arc<dyn DurableQueue>,
    generator: MockGenerator,
    artifacts: Arc<dyn ArtifactStore>,
) -> QueueWorker {
    QueueWorker::new(
        queue,
        store.clone(),
        store.clone(),
        store.clone(),
        Arc::new(generator),
        artifacts,
        settings(),
    )
}

/// The usual wiring: in-memory store, queue and artifact store.
pub struct Harness {
    pub store: Arc<InMemoryStore>,
    pub queue: Arc<InMemoryQueue>,
    pub artifacts: Arc<InMemoryArtifactStore>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            store: InMemoryStore::new(),
            queue: Arc::new(InMemoryQueue::new("image_jobs")),
            artifacts: Arc::new(InMemoryArtifactStore::new("artifacts")),
        }
    }

    pub fn jobs(&self) -> JobServiceImpl {
        job_service(&self.store, self.queue.clone(), self.artifacts.clone())
    }

    pub fn worker(&self, generator: MockGenerator) -> QueueWorker {
        worker(&self.store, self.queue.clone(), generator, self.artifacts.clone())
    }

    /// A style and a subject list with `subjects`.
    pub fn catalog(&self, subjects: &[&str]) -> (StyleId, SubjectListId) {
        (
            self.store.add_style("{subject} in watercolor"),
            self.store.add_subject_list(subjects),
        )
    }
}

pub fn create_request(style: StyleId, list: SubjectListId) -> stylebatch_service::CreateJobRequest {
    stylebatch_service::CreateJobRequest {
        style_id: style.to_string(),
        subject_list_id: list.to_string(),
    }
}
