//! Resource fetcher for the learner's resource view
//!
//! Loads a resource, then its course's ordered resource list and the course
//! itself, and keeps the open resource together with its quiz attempt.
//! Every load takes a generation ticket; when a newer load has started by the
//! time a response arrives, that response is dropped. The newest request
//! always decides what the view shows, whatever order the responses land in.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::Mutex;

use crate::models::{Course, Resource};
use crate::services::api::ApiClient;
use crate::services::content::{self, ResourceContent};
use crate::services::progress::CourseProgress;
use crate::services::quiz::QuizRunner;

/// Read access to courses and their resources
pub trait CourseCatalog: Send + Sync {
    fn resource(&self, id: &str) -> impl Future<Output = anyhow::Result<Resource>> + Send;

    fn course_resources(
        &self,
        course_id: &str,
    ) -> impl Future<Output = anyhow::Result<Vec<Resource>>> + Send;

    fn course(&self, course_id: &str) -> impl Future<Output = anyhow::Result<Course>> + Send;
}

impl CourseCatalog for ApiClient {
    async fn resource(&self, id: &str) -> anyhow::Result<Resource> {
        self.get_resource_for_learner(id)
            .await
            .with_context(|| format!("failed to load resource {}", id))
    }

    async fn course_resources(&self, course_id: &str) -> anyhow::Result<Vec<Resource>> {
        self.get_resources_by_course(course_id)
            .await
            .with_context(|| format!("failed to load resources of course {}", course_id))
    }

    async fn course(&self, course_id: &str) -> anyhow::Result<Course> {
        self.get_course(course_id)
            .await
            .with_context(|| format!("failed to load course {}", course_id))
    }
}

/// The resource currently shown, with its place in the course
#[derive(Debug, Clone)]
pub struct OpenResource {
    pub resource: Resource,
    pub siblings: Vec<Resource>,
    pub course: Option<Course>,
    /// Index of `resource` in `siblings`, `None` when it is not listed
    pub position: Option<usize>,
    /// Present when the resource carries questions
    pub quiz: Option<QuizRunner>,
}

impl OpenResource {
    fn new(resource: Resource, siblings: Vec<Resource>, course: Option<Course>) -> Self {
        let position = siblings.iter().position(|r| r.id == resource.id);
        let quiz = QuizRunner::new(resource.quizzes.clone()).ok();
        Self {
            resource,
            siblings,
            course,
            position,
            quiz,
        }
    }

    pub fn progress(&self) -> Option<CourseProgress> {
        self.position
            .map(|index| CourseProgress::new(index, self.siblings.len()))
    }

    pub fn previous_id(&self) -> Option<&str> {
        let index = self.position?;
        index
            .checked_sub(1)
            .and_then(|i| self.siblings.get(i))
            .map(|r| r.id.as_str())
    }

    pub fn next_id(&self) -> Option<&str> {
        let index = self.position?;
        self.siblings.get(index + 1).map(|r| r.id.as_str())
    }

    /// The finish-course action is only offered on the last resource
    pub fn is_last(&self) -> bool {
        self.progress().map(|p| p.is_last()).unwrap_or(false)
    }

    pub fn content(&self) -> ResourceContent {
        content::classify(self.resource.content_url())
    }

    pub fn course_title(&self) -> Option<&str> {
        self.course.as_ref().map(|c| c.title.as_str())
    }
}

/// Result of [`ResourceFetcher::open`]
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    Loaded(Box<OpenResource>),
    /// A newer load started while this one was in flight
    Superseded,
}

pub struct ResourceFetcher<C> {
    catalog: Arc<C>,
    generation: AtomicU64,
    open: Mutex<Option<OpenResource>>,
}

impl<C: CourseCatalog> ResourceFetcher<C> {
    pub fn new(catalog: Arc<C>) -> Self {
        Self {
            catalog,
            generation: AtomicU64::new(0),
            open: Mutex::new(None),
        }
    }

    fn is_current(&self, ticket: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == ticket
    }

    /// Loads `resource_id` and makes it the open resource
    pub async fn open(&self, resource_id: &str) -> anyhow::Result<FetchOutcome> {
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        log::debug!("opening resource {} (load #{})", resource_id, ticket);

        let resource = match self.catalog.resource(resource_id).await {
            Ok(resource) => resource,
            Err(e) => {
                if !self.is_current(ticket) {
                    log::warn!("dropping failed load #{} of {}: superseded", ticket, resource_id);
                    return Ok(FetchOutcome::Superseded);
                }
                *self.open.lock().await = None;
                return Err(e);
            }
        };

        if !self.is_current(ticket) {
            log::warn!("dropping load #{} of {}: superseded", ticket, resource_id);
            return Ok(FetchOutcome::Superseded);
        }

        let course_id = resource.course_id.clone();
        let (siblings, course) = futures::join!(
            self.catalog.course_resources(&course_id),
            self.catalog.course(&course_id)
        );
        let siblings = siblings.unwrap_or_else(|e| {
            log::warn!("{:#}", e);
            Vec::new()
        });
        let course = course
            .map_err(|e| log::warn!("{:#}", e))
            .ok();

        let loaded = OpenResource::new(resource, siblings, course);

        let mut open = self.open.lock().await;
        if !self.is_current(ticket) {
            log::warn!("dropping load #{} of {}: superseded", ticket, resource_id);
            return Ok(FetchOutcome::Superseded);
        }
        *open = Some(loaded.clone());
        log::info!(
            "opened resource {} ({:?} of {})",
            resource_id,
            loaded.position.map(|p| p + 1),
            loaded.siblings.len()
        );
        Ok(FetchOutcome::Loaded(Box::new(loaded)))
    }

    /// Runs `f` against the open resource, `None` when nothing is open
    pub async fn with_open<R>(&self, f: impl FnOnce(&mut OpenResource) -> R) -> Option<R> {
        let mut open = self.open.lock().await;
        open.as_mut().map(f)
    }

    pub async fn snapshot(&self) -> Option<OpenResource> {
        self.open.lock().await.clone()
    }

    /// Leaves the view; the quiz attempt is discarded
    pub async fn close(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        *self.open.lock().await = None;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::Quiz;
    use std::collections::HashMap;
    use tokio::sync::Notify;

    /// In-memory catalogue; a resource id listed in `gates` waits for its
    /// `Notify` before answering
    #[derive(Default)]
    pub(crate) struct FakeCatalog {
        pub resources: HashMap<String, Resource>,
        pub courses: HashMap<String, Course>,
        pub gates: HashMap<String, Arc<Notify>>,
        pub fail_siblings: bool,
    }

    pub(crate) fn resource(id: &str, course_id: &str, quizzes: Vec<Quiz>) -> Resource {
        Resource {
            id: id.to_string(),
            course_id: course_id.to_string(),
            title: format!("Resource {}", id),
            description: String::new(),
            file: None,
            link: None,
            subcategory_id: None,
            quizzes,
            created_at: None,
        }
    }

    pub(crate) fn course(id: &str, title: &str) -> Course {
        Course {
            id: id.to_string(),
            title: title.to_string(),
            description: String::new(),
            category: "General".to_string(),
            image: None,
            resources: Vec::new(),
        }
    }

    impl FakeCatalog {
        pub(crate) fn with_course(course_id: &str, ids: &[&str]) -> Self {
            let mut catalog = FakeCatalog::default();
            for id in ids {
                catalog
                    .resources
                    .insert(id.to_string(), resource(id, course_id, Vec::new()));
            }
            catalog
                .courses
                .insert(course_id.to_string(), course(course_id, "Rust Basics"));
            catalog
        }
    }

    impl CourseCatalog for FakeCatalog {
        async fn resource(&self, id: &str) -> anyhow::Result<Resource> {
            if let Some(gate) = self.gates.get(id) {
                gate.notified().await;
            }
            self.resources
                .get(id)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("resource {} not found", id))
        }

        async fn course_resources(&self, course_id: &str) -> anyhow::Result<Vec<Resource>> {
            if self.fail_siblings {
                anyhow::bail!("course list unavailable");
            }
            let mut list: Vec<Resource> = self
                .resources
                .values()
                .filter(|r| r.course_id == course_id)
                .cloned()
                .collect();
            list.sort_by(|a, b| a.id.cmp(&b.id));
            Ok(list)
        }

        async fn course(&self, course_id: &str) -> anyhow::Result<Course> {
            self.courses
                .get(course_id)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("course {} not found", course_id))
        }
    }

    fn loaded(outcome: FetchOutcome) -> OpenResource {
        match outcome {
            FetchOutcome::Loaded(open) => *open,
            FetchOutcome::Superseded => panic!("load was superseded"),
        }
    }

    #[tokio::test]
    async fn test_open_locates_resource_in_course() {
        let catalog = FakeCatalog::with_course("c1", &["r1", "r2", "r3"]);
        let fetcher = ResourceFetcher::new(Arc::new(catalog));

        let open = loaded(fetcher.open("r2").await.unwrap());
        assert_eq!(open.position, Some(1));
        assert_eq!(open.siblings.len(), 3);
        assert_eq!(open.previous_id(), Some("r1"));
        assert_eq!(open.next_id(), Some("r3"));
        assert!(!open.is_last());
        assert_eq!(open.course_title(), Some("Rust Basics"));
        assert_eq!(open.progress().unwrap().rounded(), 67);
        assert!(open.quiz.is_none());
    }

    #[tokio::test]
    async fn test_last_resource_and_quiz() {
        let mut catalog = FakeCatalog::with_course("c1", &["r1", "r2"]);
        let quiz = Quiz::new("?", vec!["A".into(), "B".into()], "A").unwrap();
        catalog
            .resources
            .insert("r2".into(), resource("r2", "c1", vec![quiz]));
        let fetcher = ResourceFetcher::new(Arc::new(catalog));

        let open = loaded(fetcher.open("r2").await.unwrap());
        assert!(open.is_last());
        assert_eq!(open.next_id(), None);
        assert_eq!(open.quiz.as_ref().map(|q| q.len()), Some(1));
    }

    #[tokio::test]
    async fn test_missing_resource_is_an_error_and_clears_view() {
        let catalog = FakeCatalog::with_course("c1", &["r1"]);
        let fetcher = ResourceFetcher::new(Arc::new(catalog));
        loaded(fetcher.open("r1").await.unwrap());

        assert!(fetcher.open("nope").await.is_err());
        assert!(fetcher.snapshot().await.is_none());
    }

    #[tokio::test]
    async fn test_sibling_failure_leaves_list_empty() {
        let mut catalog = FakeCatalog::with_course("c1", &["r1"]);
        catalog.fail_siblings = true;
        let fetcher = ResourceFetcher::new(Arc::new(catalog));

        let open = loaded(fetcher.open("r1").await.unwrap());
        assert!(open.siblings.is_empty());
        assert_eq!(open.position, None);
        assert!(open.progress().is_none());
    }

    #[tokio::test]
    async fn test_superseded_load_is_dropped() {
        let gate = Arc::new(Notify::new());
        let mut catalog = FakeCatalog::with_course("c1", &["r1", "r2"]);
        catalog.gates.insert("r1".into(), gate.clone());
        let fetcher = Arc::new(ResourceFetcher::new(Arc::new(catalog)));

        let slow = {
            let fetcher = fetcher.clone();
            tokio::spawn(async move { fetcher.open("r1").await })
        };
        // let the slow load take its ticket first
        tokio::task::yield_now().await;
        while fetcher.generation.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        let fast = loaded(fetcher.open("r2").await.unwrap());
        assert_eq!(fast.resource.id, "r2");

        gate.notify_one();
        let slow = slow.await.unwrap().unwrap();
        assert!(matches!(slow, FetchOutcome::Superseded));

        let shown = fetcher.snapshot().await.unwrap();
        assert_eq!(shown.resource.id, "r2");
    }

    #[tokio::test]
    async fn test_close_discards_view() {
        let catalog = FakeCatalog::with_course("c1", &["r1"]);
        let fetcher = ResourceFetcher::new(Arc::new(catalog));
        loaded(fetcher.open("r1").await.unwrap());

        fetcher.close().await;
        assert!(fetcher.snapshot().await.is_none());
        assert_eq!(fetcher.with_open(|open| open.resource.id.clone()).await, None);
    }
}
