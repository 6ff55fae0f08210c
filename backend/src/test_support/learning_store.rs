//! In-memory stand-in for the PostgreSQL learning data.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::ports::{
    CertificateRepository, CertificateRepositoryError, CourseRepository, CourseRepositoryError,
    EnrollmentRepository, EnrollmentRepositoryError, LessonProgressRepository,
    LessonProgressRepositoryError, QuizAttemptRepository, QuizAttemptRepositoryError,
    UserDirectory, UserDirectoryError,
};
use crate::domain::{
    Certificate, CertificateCode, CertificateId, CourseId, CourseOutline, CourseSlug,
    CourseSummary, Enrollment, EnrollmentId, FinalQuizStatus, LessonContext, LessonId,
    LessonKind, LessonOutline, LessonProgress, LessonStatus, ModuleId, ModuleOutline,
    NewLessonProgress, ProgressPercent, UserId, UserProfile, UserRole,
};

/// Default duration of seeded lessons.
const LESSON_SECONDS: i32 = 300;

#[derive(Default)]
struct State {
    users: HashMap<UserId, UserProfile>,
    courses: HashMap<CourseId, CourseOutline>,
    enrollments: HashMap<EnrollmentId, Enrollment>,
    progress: HashMap<(UserId, LessonId), LessonProgress>,
    certificates: Vec<Certificate>,
    final_quizzes: HashMap<(UserId, CourseId), FinalQuizStatus>,
}

impl State {
    fn course_by_slug(&self, slug: &CourseSlug) -> Option<&CourseOutline> {
        self.courses
            .values()
            .find(|outline| outline.course.slug == *slug)
    }
}

/// Learning store implementing every repository port in memory.
#[derive(Default)]
pub struct InMemoryLearningStore {
    state: Mutex<State>,
}

impl InMemoryLearningStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a user and return its id.
    pub fn add_user(&self, display_name: &str, email: &str, role: UserRole) -> UserId {
        let id = UserId::random();
        self.state().users.insert(
            id,
            UserProfile {
                id,
                display_name: display_name.to_owned(),
                email: email.to_owned(),
                role,
            },
        );
        id
    }

    /// Change the display name of a registered user.
    pub fn rename_user(&self, user_id: &UserId, display_name: &str) {
        if let Some(profile) = self.state().users.get_mut(user_id) {
            display_name.clone_into(&mut profile.display_name);
        }
    }

    /// Create a course with one module per entry of `module_sizes`, each
    /// holding that many video lessons.
    ///
    /// # Panics
    ///
    /// Panics when `slug` is not a valid course slug.
    pub fn add_course(
        &self,
        slug: &str,
        title: &str,
        instructor_id: UserId,
        module_sizes: &[usize],
    ) -> CourseOutline {
        let slug = match CourseSlug::new(slug) {
            Ok(slug) => slug,
            Err(error) => panic!("seed slug `{slug}` is invalid: {error}"),
        };
        let modules = module_sizes
            .iter()
            .zip(1..)
            .map(|(&size, module_position)| ModuleOutline {
                id: ModuleId::random(),
                position: module_position,
                lessons: (1..)
                    .take(size)
                    .map(|position| LessonOutline {
                        id: LessonId::random(),
                        position,
                        kind: LessonKind::Video,
                        duration_seconds: LESSON_SECONDS,
                    })
                    .collect(),
            })
            .collect();
        let outline = CourseOutline {
            course: CourseSummary {
                id: CourseId::random(),
                slug,
                title: title.to_owned(),
                thumbnail_url: None,
                instructor_id,
            },
            modules,
        };
        self.state()
            .courses
            .insert(outline.course.id, outline.clone());
        outline
    }

    /// Enroll `user_id` in `course_id` with no progress.
    pub fn enroll(
        &self,
        user_id: UserId,
        course_id: CourseId,
        enrolled_at: DateTime<Utc>,
    ) -> Enrollment {
        let enrollment = Enrollment {
            id: EnrollmentId::random(),
            user_id,
            course_id,
            progress_percent: ProgressPercent::ZERO,
            last_accessed_lesson_id: None,
            last_accessed_module_id: None,
            completed_at: None,
            revision: 1,
            enrolled_at,
        };
        self.state()
            .enrollments
            .insert(enrollment.id, enrollment.clone());
        enrollment
    }

    /// Overwrite a stored enrollment, bypassing the revision check.
    pub fn put_enrollment(&self, enrollment: Enrollment) {
        self.state()
            .enrollments
            .insert(enrollment.id, enrollment);
    }

    pub fn set_final_quiz_status(
        &self,
        user_id: UserId,
        course_id: CourseId,
        status: FinalQuizStatus,
    ) {
        self.state()
            .final_quizzes
            .insert((user_id, course_id), status);
    }

    /// Store a certificate directly, bypassing issuance.
    pub fn put_certificate(&self, certificate: Certificate) {
        self.state().certificates.push(certificate);
    }

    pub fn enrollment(&self, enrollment_id: &EnrollmentId) -> Option<Enrollment> {
        self.state().enrollments.get(enrollment_id).cloned()
    }

    pub fn completed_lessons(&self, user_id: &UserId) -> usize {
        self.state()
            .progress
            .keys()
            .filter(|(user, _)| user == user_id)
            .count()
    }

    pub fn certificates(&self) -> Vec<Certificate> {
        self.state().certificates.clone()
    }
}

#[async_trait]
impl CourseRepository for InMemoryLearningStore {
    async fn find_lesson_context(
        &self,
        lesson_id: &LessonId,
    ) -> Result<Option<LessonContext>, CourseRepositoryError> {
        tokio::task::yield_now().await;
        let state = self.state();
        let context = state.courses.values().find_map(|outline| {
            outline.module_of(*lesson_id).map(|module_id| LessonContext {
                lesson_id: *lesson_id,
                module_id,
                outline: outline.clone(),
            })
        });
        Ok(context)
    }

    async fn find_outline_by_slug(
        &self,
        slug: &CourseSlug,
    ) -> Result<Option<CourseOutline>, CourseRepositoryError> {
        tokio::task::yield_now().await;
        Ok(self.state().course_by_slug(slug).cloned())
    }

    async fn find_summary_by_id(
        &self,
        course_id: &CourseId,
    ) -> Result<Option<CourseSummary>, CourseRepositoryError> {
        tokio::task::yield_now().await;
        Ok(self
            .state()
            .courses
            .get(course_id)
            .map(|outline| outline.course.clone()))
    }
}

#[async_trait]
impl EnrollmentRepository for InMemoryLearningStore {
    async fn find_by_id(
        &self,
        enrollment_id: &EnrollmentId,
    ) -> Result<Option<Enrollment>, EnrollmentRepositoryError> {
        tokio::task::yield_now().await;
        Ok(self.enrollment(enrollment_id))
    }

    async fn find_for_user_and_course(
        &self,
        user_id: &UserId,
        course_id: &CourseId,
    ) -> Result<Option<Enrollment>, EnrollmentRepositoryError> {
        tokio::task::yield_now().await;
        Ok(self
            .state()
            .enrollments
            .values()
            .find(|enrollment| enrollment.user_id == *user_id && enrollment.course_id == *course_id)
            .cloned())
    }

    async fn save_progress(
        &self,
        enrollment: &Enrollment,
        expected_revision: u32,
    ) -> Result<(), EnrollmentRepositoryError> {
        tokio::task::yield_now().await;
        let mut state = self.state();
        let stored = state
            .enrollments
            .get_mut(&enrollment.id)
            .ok_or_else(|| EnrollmentRepositoryError::missing(enrollment.id.to_string()))?;
        if stored.revision != expected_revision {
            return Err(EnrollmentRepositoryError::revision_mismatch(
                expected_revision,
                stored.revision,
            ));
        }
        *stored = enrollment.clone();
        Ok(())
    }

    async fn reset_progress(
        &self,
        enrollment: &Enrollment,
        lesson_ids: &[LessonId],
    ) -> Result<u64, EnrollmentRepositoryError> {
        tokio::task::yield_now().await;
        let mut state = self.state();
        let Some(stored) = state.enrollments.get_mut(&enrollment.id) else {
            return Err(EnrollmentRepositoryError::missing(enrollment.id.to_string()));
        };
        let user_id = stored.user_id;
        *stored = Enrollment {
            progress_percent: ProgressPercent::ZERO,
            last_accessed_lesson_id: None,
            last_accessed_module_id: None,
            completed_at: None,
            revision: stored.revision.saturating_add(1),
            ..stored.clone()
        };
        let before = state.progress.len();
        state
            .progress
            .retain(|(user, lesson), _| !(*user == user_id && lesson_ids.contains(lesson)));
        Ok(u64::try_from(before - state.progress.len()).unwrap_or(u64::MAX))
    }
}

#[async_trait]
impl LessonProgressRepository for InMemoryLearningStore {
    async fn insert(
        &self,
        progress: &NewLessonProgress,
    ) -> Result<LessonProgress, LessonProgressRepositoryError> {
        tokio::task::yield_now().await;
        let mut state = self.state();
        let key = (progress.user_id, progress.lesson_id);
        if state.progress.contains_key(&key) {
            return Err(LessonProgressRepositoryError::duplicate());
        }
        let row = LessonProgress {
            id: Uuid::new_v4(),
            user_id: progress.user_id,
            lesson_id: progress.lesson_id,
            status: LessonStatus::Completed,
            completed_at: progress.completed_at,
        };
        state.progress.insert(key, row.clone());
        Ok(row)
    }

    async fn find(
        &self,
        user_id: &UserId,
        lesson_id: &LessonId,
    ) -> Result<Option<LessonProgress>, LessonProgressRepositoryError> {
        tokio::task::yield_now().await;
        Ok(self.state().progress.get(&(*user_id, *lesson_id)).cloned())
    }

    async fn count_completed(
        &self,
        user_id: &UserId,
        lesson_ids: &[LessonId],
    ) -> Result<u32, LessonProgressRepositoryError> {
        let completed = self.list_completed(user_id, lesson_ids).await?;
        Ok(u32::try_from(completed.len()).unwrap_or(u32::MAX))
    }

    async fn list_completed(
        &self,
        user_id: &UserId,
        lesson_ids: &[LessonId],
    ) -> Result<Vec<LessonId>, LessonProgressRepositoryError> {
        tokio::task::yield_now().await;
        let state = self.state();
        let mut rows: Vec<&LessonProgress> = state
            .progress
            .values()
            .filter(|row| row.user_id == *user_id && lesson_ids.contains(&row.lesson_id))
            .collect();
        rows.sort_by_key(|row| row.completed_at);
        Ok(rows.into_iter().map(|row| row.lesson_id).collect())
    }
}

#[async_trait]
impl CertificateRepository for InMemoryLearningStore {
    async fn find_by_id(
        &self,
        certificate_id: &CertificateId,
    ) -> Result<Option<Certificate>, CertificateRepositoryError> {
        tokio::task::yield_now().await;
        Ok(self
            .state()
            .certificates
            .iter()
            .find(|certificate| certificate.id == *certificate_id)
            .cloned())
    }

    async fn find_by_enrollment(
        &self,
        enrollment_id: &EnrollmentId,
    ) -> Result<Option<Certificate>, CertificateRepositoryError> {
        tokio::task::yield_now().await;
        Ok(self
            .state()
            .certificates
            .iter()
            .find(|certificate| certificate.enrollment_id == *enrollment_id)
            .cloned())
    }

    async fn find_by_code(
        &self,
        code: &CertificateCode,
    ) -> Result<Option<Certificate>, CertificateRepositoryError> {
        tokio::task::yield_now().await;
        Ok(self
            .state()
            .certificates
            .iter()
            .find(|certificate| certificate.code == *code)
            .cloned())
    }

    async fn code_exists(&self, code: &CertificateCode) -> Result<bool, CertificateRepositoryError> {
        Ok(self.find_by_code(code).await?.is_some())
    }

    async fn insert(&self, certificate: &Certificate) -> Result<(), CertificateRepositoryError> {
        tokio::task::yield_now().await;
        let mut state = self.state();
        if state
            .certificates
            .iter()
            .any(|existing| existing.enrollment_id == certificate.enrollment_id)
        {
            return Err(CertificateRepositoryError::duplicate_enrollment());
        }
        if state
            .certificates
            .iter()
            .any(|existing| existing.code == certificate.code)
        {
            return Err(CertificateRepositoryError::duplicate_code());
        }
        state.certificates.push(certificate.clone());
        Ok(())
    }

    async fn list_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<Certificate>, CertificateRepositoryError> {
        tokio::task::yield_now().await;
        let mut certificates: Vec<Certificate> = self
            .state()
            .certificates
            .iter()
            .filter(|certificate| certificate.user_id == *user_id)
            .cloned()
            .collect();
        certificates.sort_by(|a, b| {
            b.issued_at
                .cmp(&a.issued_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(certificates)
    }

    async fn update_document_ref(
        &self,
        certificate_id: &CertificateId,
        document_ref: &str,
    ) -> Result<(), CertificateRepositoryError> {
        tokio::task::yield_now().await;
        let mut state = self.state();
        let certificate = state
            .certificates
            .iter_mut()
            .find(|certificate| certificate.id == *certificate_id)
            .ok_or_else(|| {
                CertificateRepositoryError::query(format!("certificate {certificate_id} not found"))
            })?;
        document_ref.clone_into(&mut certificate.document_ref);
        Ok(())
    }
}

#[async_trait]
impl QuizAttemptRepository for InMemoryLearningStore {
    async fn final_quiz_status(
        &self,
        user_id: &UserId,
        course_id: &CourseId,
    ) -> Result<FinalQuizStatus, QuizAttemptRepositoryError> {
        tokio::task::yield_now().await;
        Ok(self
            .state()
            .final_quizzes
            .get(&(*user_id, *course_id))
            .copied()
            .unwrap_or(FinalQuizStatus::NoFinalQuiz))
    }
}

#[async_trait]
impl UserDirectory for InMemoryLearningStore {
    async fn find_profile(
        &self,
        user_id: &UserId,
    ) -> Result<Option<UserProfile>, UserDirectoryError> {
        tokio::task::yield_now().await;
        Ok(self.state().users.get(user_id).cloned())
    }
}
