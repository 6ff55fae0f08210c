//! Fully wired progress and certificate services over in-memory adapters.
//!
//! Side effects run on [`InlineTaskDispatcher`], so by the time a command
//! returns every notification, email and automatic certificate it triggered
//! has already been recorded.

use std::sync::Arc;
use std::time::Duration;

use mockable::Clock;

use crate::domain::ports::{
    LessonCompletionOutcome, ProgressCommand, RecordLessonCompletionRequest,
};
use crate::domain::{
    CertificateCodeSource, CertificatePorts, CertificateService, CertificateSettings,
    CompletionPolicy, CourseOutline, Enrollment, Error, LessonId, ProgressRepositories,
    ProgressService, ProgressSettings, RandomCodeSource, SideEffectPorts, SideEffectRunner,
    UserId, UserRole,
};
use crate::outbound::queue::InlineTaskDispatcher;

use super::{
    InMemoryCertificateStorage, InMemoryLearningStore, InMemoryProgressCache, MutableClock,
    RecordingEmailSender, RecordingEventSink, StubDocumentRenderer,
};

/// A student enrolled in a freshly seeded course.
#[derive(Debug, Clone)]
pub struct EnrolledLearner {
    pub student_id: UserId,
    pub instructor_id: UserId,
    pub outline: CourseOutline,
    pub enrollment: Enrollment,
}

impl EnrolledLearner {
    /// Lesson ids in course order.
    pub fn lessons(&self) -> Vec<LessonId> {
        self.outline.lesson_ids()
    }
}

/// Services plus handles on every adapter they were built from.
pub struct TestPipeline {
    pub store: Arc<InMemoryLearningStore>,
    pub cache: Arc<InMemoryProgressCache>,
    pub events: Arc<RecordingEventSink>,
    pub email: Arc<RecordingEmailSender>,
    pub renderer: Arc<StubDocumentRenderer>,
    pub storage: Arc<InMemoryCertificateStorage>,
    pub clock: Arc<MutableClock>,
    pub progress: Arc<ProgressService>,
    pub certificates: Arc<CertificateService>,
}

impl TestPipeline {
    /// Pipeline with default adapters and the given completion policy.
    pub fn new(policy: CompletionPolicy) -> Self {
        Self::builder().completion_policy(policy).build()
    }

    pub fn builder() -> TestPipelineBuilder {
        TestPipelineBuilder::default()
    }

    /// Seed an instructor, a course with the given module sizes and an
    /// enrolled student.
    pub fn enrolled_learner(&self, slug: &str, module_sizes: &[usize]) -> EnrolledLearner {
        let instructor_id =
            self.store
                .add_user("Ines Instructor", "ines@example.com", UserRole::Instructor);
        let student_id = self
            .store
            .add_user("Ada Lovelace", "ada@example.com", UserRole::Student);
        let outline = self
            .store
            .add_course(slug, "Rust Basics", instructor_id, module_sizes);
        let enrollment = self
            .store
            .enroll(student_id, outline.course.id, self.clock.utc());
        EnrolledLearner {
            student_id,
            instructor_id,
            outline,
            enrollment,
        }
    }

    /// Record a completion of `lesson_id` by `user_id` at the current clock.
    pub async fn complete(
        &self,
        user_id: UserId,
        lesson_id: LessonId,
    ) -> Result<LessonCompletionOutcome, Error> {
        self.progress
            .record_lesson_completion(RecordLessonCompletionRequest {
                user_id,
                lesson_id,
                course_slug: None,
                completed_at: None,
            })
            .await
    }
}

/// Builder for [`TestPipeline`].
pub struct TestPipelineBuilder {
    policy: CompletionPolicy,
    renderer: StubDocumentRenderer,
    storage: InMemoryCertificateStorage,
    email: RecordingEmailSender,
    events: RecordingEventSink,
    codes: Arc<dyn CertificateCodeSource>,
    render_timeout: Duration,
    max_write_attempts: u32,
}

impl Default for TestPipelineBuilder {
    fn default() -> Self {
        let progress = ProgressSettings::default();
        let certificate = CertificateSettings::default();
        Self {
            policy: progress.completion_policy,
            renderer: StubDocumentRenderer::new(),
            storage: InMemoryCertificateStorage::default(),
            email: RecordingEmailSender::default(),
            events: RecordingEventSink::default(),
            codes: Arc::new(RandomCodeSource),
            render_timeout: certificate.render_timeout,
            max_write_attempts: progress.max_write_attempts,
        }
    }
}

impl TestPipelineBuilder {
    pub fn completion_policy(mut self, policy: CompletionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn renderer(mut self, renderer: StubDocumentRenderer) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn storage(mut self, storage: InMemoryCertificateStorage) -> Self {
        self.storage = storage;
        self
    }

    pub fn email(mut self, email: RecordingEmailSender) -> Self {
        self.email = email;
        self
    }

    pub fn events(mut self, events: RecordingEventSink) -> Self {
        self.events = events;
        self
    }

    pub fn codes(mut self, codes: impl CertificateCodeSource + 'static) -> Self {
        self.codes = Arc::new(codes);
        self
    }

    pub fn render_timeout(mut self, timeout: Duration) -> Self {
        self.render_timeout = timeout;
        self
    }

    pub fn max_write_attempts(mut self, attempts: u32) -> Self {
        self.max_write_attempts = attempts;
        self
    }

    pub fn build(self) -> TestPipeline {
        let store = Arc::new(InMemoryLearningStore::new());
        let cache = Arc::new(InMemoryProgressCache::default());
        let events = Arc::new(self.events);
        let email = Arc::new(self.email);
        let renderer = Arc::new(self.renderer);
        let storage = Arc::new(self.storage);
        let clock = Arc::new(MutableClock::fixed());

        let effect_ports = SideEffectPorts {
            cache: cache.clone(),
            dispatcher: Arc::new(InlineTaskDispatcher),
            activity: events.clone(),
            notifications: events.clone(),
            users: store.clone(),
            email: email.clone(),
        };

        let certificates = Arc::new(CertificateService::new(
            CertificatePorts {
                certificates: store.clone(),
                enrollments: store.clone(),
                courses: store.clone(),
                quiz_attempts: store.clone(),
                users: store.clone(),
                renderer: renderer.clone(),
                storage: storage.clone(),
                cache: cache.clone(),
            },
            self.codes,
            SideEffectRunner::new(effect_ports.clone()),
            clock.clone(),
            CertificateSettings {
                completion_policy: self.policy,
                render_timeout: self.render_timeout,
                ..CertificateSettings::default()
            },
        ));

        let progress = Arc::new(ProgressService::new(
            ProgressRepositories {
                courses: store.clone(),
                enrollments: store.clone(),
                lesson_progress: store.clone(),
                quiz_attempts: store.clone(),
            },
            cache.clone(),
            SideEffectRunner::new(effect_ports).with_issuer(certificates.clone()),
            clock.clone(),
            ProgressSettings {
                completion_policy: self.policy,
                max_write_attempts: self.max_write_attempts,
                ..ProgressSettings::default()
            },
        ));

        TestPipeline {
            store,
            cache,
            events,
            email,
            renderer,
            storage,
            clock,
            progress,
            certificates,
        }
    }
}
