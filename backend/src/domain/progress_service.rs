//! Progress tracking domain service.
//!
//! [`ProgressService`] implements the progress driving ports. A lesson
//! completion is recorded in three steps:
//!
//! 1. insert the completion row, relying on the store's (user, lesson)
//!    uniqueness to reject duplicates. An existing row the enrollment does
//!    not yet reflect is left over from a request that failed mid-way, and
//!    the remaining steps are redone for it;
//! 2. recount the learner's completions within the course and write the new
//!    percentage with a compare-and-swap on the enrollment revision, retrying
//!    from a fresh read when another writer got there first;
//! 3. compare the state read by the winning write with the state it wrote to
//!    detect the transition to a completed course.
//!
//! Follow-up work is returned as [`SideEffect`] values and handed to the
//! [`SideEffectRunner`], so nothing after step 3 can fail the request.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mockable::Clock;
use rand::Rng;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::domain::ports::{
    CacheInvalidation, CacheKey, CourseRepository, CourseRepositoryError, EnrollmentRepository,
    EnrollmentRepositoryError, LessonCompletionOutcome, LessonProgressRepository,
    LessonProgressRepositoryError, ProgressCache, ProgressCommand, ProgressQuery,
    QuizAttemptRepository, RecordLessonCompletionRequest, ResetCourseProgressOutcome,
    ResetCourseProgressRequest,
};
use crate::domain::side_effects::{SideEffect, SideEffectRunner};
use crate::domain::{
    ActivityType, CompletionPolicy, CourseCompleted, CourseOutline, CourseProgressView,
    CourseSlug, CourseSummary, Enrollment, Error, FinalQuizStatus, LessonId, LessonProgress,
    ModuleId, NewActivity, NewLessonProgress, ProgressPercent, UserId, detect_completion,
    should_auto_issue,
};

/// Default number of compare-and-swap attempts before giving up.
pub const DEFAULT_MAX_WRITE_ATTEMPTS: u32 = 5;

/// Default lifetime of cached learn-page views.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Repositories read and written by the progress service.
#[derive(Clone)]
pub struct ProgressRepositories {
    pub courses: Arc<dyn CourseRepository>,
    pub enrollments: Arc<dyn EnrollmentRepository>,
    pub lesson_progress: Arc<dyn LessonProgressRepository>,
    pub quiz_attempts: Arc<dyn QuizAttemptRepository>,
}

/// Tunables of the progress service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSettings {
    pub completion_policy: CompletionPolicy,
    pub cache_ttl: Duration,
    pub max_write_attempts: u32,
}

impl Default for ProgressSettings {
    fn default() -> Self {
        Self {
            completion_policy: CompletionPolicy::default(),
            cache_ttl: DEFAULT_CACHE_TTL,
            max_write_attempts: DEFAULT_MAX_WRITE_ATTEMPTS,
        }
    }
}

/// Progress service implementing [`ProgressCommand`] and [`ProgressQuery`].
#[derive(Clone)]
pub struct ProgressService {
    repos: ProgressRepositories,
    cache: Arc<dyn ProgressCache>,
    effects: SideEffectRunner,
    clock: Arc<dyn Clock>,
    settings: ProgressSettings,
}

fn map_course_error(error: CourseRepositoryError) -> Error {
    match error {
        CourseRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("course repository unavailable: {message}"))
        }
        CourseRepositoryError::Query { message } => {
            Error::internal(format!("course repository error: {message}"))
        }
    }
}

fn map_enrollment_error(error: EnrollmentRepositoryError) -> Error {
    match error {
        EnrollmentRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("enrollment repository unavailable: {message}"))
        }
        EnrollmentRepositoryError::Query { message } => {
            Error::internal(format!("enrollment repository error: {message}"))
        }
        EnrollmentRepositoryError::RevisionMismatch { expected, actual } => {
            Error::conflict("enrollment was modified concurrently").with_details(json!({
                "expectedRevision": expected,
                "actualRevision": actual,
                "code": "revision_mismatch",
            }))
        }
        EnrollmentRepositoryError::Missing { enrollment_id } => {
            Error::not_found(format!("enrollment {enrollment_id} not found"))
        }
    }
}

fn map_lesson_progress_error(error: LessonProgressRepositoryError) -> Error {
    match error {
        LessonProgressRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("lesson progress repository unavailable: {message}"))
        }
        LessonProgressRepositoryError::Query { message } => {
            Error::internal(format!("lesson progress repository error: {message}"))
        }
        LessonProgressRepositoryError::Duplicate => Error::conflict("lesson already completed"),
    }
}

/// Stretch a TTL by up to a tenth so entries written together expire apart.
fn ttl_with_jitter(ttl: Duration) -> Duration {
    let spread = ttl.as_secs() / 10;
    if spread == 0 {
        return ttl;
    }
    ttl + Duration::from_secs(rand::thread_rng().gen_range(0..=spread))
}

fn lesson_count(lesson_ids: &[LessonId]) -> u64 {
    u64::try_from(lesson_ids.len()).unwrap_or(u64::MAX)
}

impl ProgressService {
    /// Create a service over the given ports.
    pub fn new(
        repos: ProgressRepositories,
        cache: Arc<dyn ProgressCache>,
        effects: SideEffectRunner,
        clock: Arc<dyn Clock>,
        settings: ProgressSettings,
    ) -> Self {
        Self {
            repos,
            cache,
            effects,
            clock,
            settings,
        }
    }

    async fn enrollment_for(
        &self,
        user_id: &UserId,
        course: &CourseSummary,
    ) -> Result<Enrollment, Error> {
        self.repos
            .enrollments
            .find_for_user_and_course(user_id, &course.id)
            .await
            .map_err(map_enrollment_error)?
            .ok_or_else(|| Error::not_found(format!("not enrolled in course {}", course.slug)))
    }

    async fn outline_by_slug(&self, slug: &CourseSlug) -> Result<CourseOutline, Error> {
        self.repos
            .courses
            .find_outline_by_slug(slug)
            .await
            .map_err(map_course_error)?
            .ok_or_else(|| Error::not_found(format!("course {slug} not found")))
    }

    /// Recount and write progress until the compare-and-swap succeeds.
    ///
    /// Returns the state read by the winning write together with the state it
    /// wrote.
    async fn write_progress(
        &self,
        course: &CourseSummary,
        lesson_ids: &[LessonId],
        lesson_id: LessonId,
        module_id: ModuleId,
        mut current: Enrollment,
    ) -> Result<(Enrollment, Enrollment), Error> {
        let total = lesson_count(lesson_ids);
        for attempt in 1..=self.settings.max_write_attempts {
            let completed = self
                .repos
                .lesson_progress
                .count_completed(&current.user_id, lesson_ids)
                .await
                .map_err(map_lesson_progress_error)?;
            let percent = ProgressPercent::from_counts(u64::from(completed), total)
                .map_err(|err| Error::invalid_state(err.to_string()))?;
            let next = current.with_progress(percent, lesson_id, module_id, self.clock.utc());

            match self
                .repos
                .enrollments
                .save_progress(&next, current.revision)
                .await
            {
                Ok(()) => return Ok((current, next)),
                Err(EnrollmentRepositoryError::RevisionMismatch { expected, actual }) => {
                    debug!(
                        enrollment_id = %current.id,
                        attempt,
                        expected,
                        actual,
                        "enrollment revision moved; retrying progress write"
                    );
                    current = self.enrollment_for(&current.user_id, course).await?;
                }
                Err(other) => return Err(map_enrollment_error(other)),
            }
        }

        warn!(
            enrollment_id = %current.id,
            attempts = self.settings.max_write_attempts,
            "progress write kept losing to concurrent writers"
        );
        Err(Error::service_unavailable(
            "enrollment progress is being updated concurrently; retry the request",
        ))
    }

    /// Handle a completion row that already exists.
    ///
    /// The row and the enrollment projection are written separately, so a
    /// request that failed after the insert leaves the enrollment behind the
    /// stored rows. Such a row is returned with a fresh read of the
    /// enrollment so the caller redoes the projection. A row the enrollment
    /// already reflects is a plain duplicate.
    async fn resume_unprojected(
        &self,
        course: &CourseSummary,
        lesson_ids: &[LessonId],
        user_id: &UserId,
        lesson_id: &LessonId,
    ) -> Result<(LessonProgress, Enrollment), Error> {
        let duplicate = || Error::conflict("lesson already completed");
        let enrollment = self.enrollment_for(user_id, course).await?;
        let completed = self
            .repos
            .lesson_progress
            .count_completed(&enrollment.user_id, lesson_ids)
            .await
            .map_err(map_lesson_progress_error)?;
        let percent = ProgressPercent::from_counts(u64::from(completed), lesson_count(lesson_ids))
            .map_err(|err| Error::invalid_state(err.to_string()))?;
        let lagging = percent != enrollment.progress_percent
            || (percent.is_complete() && enrollment.completed_at.is_none());
        if !lagging {
            return Err(duplicate());
        }

        let row = self
            .repos
            .lesson_progress
            .find(&enrollment.user_id, lesson_id)
            .await
            .map_err(map_lesson_progress_error)?
            .ok_or_else(duplicate)?;
        warn!(
            enrollment_id = %enrollment.id,
            %lesson_id,
            stored = enrollment.progress_percent.value(),
            counted = percent.value(),
            "completion row found without its progress write; resuming"
        );
        Ok((row, enrollment))
    }

    async fn wants_certificate(&self, event: &CourseCompleted) -> bool {
        let quiz = match self.settings.completion_policy {
            CompletionPolicy::RequireFinalQuiz => match self
                .repos
                .quiz_attempts
                .final_quiz_status(&event.user_id, &event.course_id)
                .await
            {
                Ok(status) => status,
                Err(error) => {
                    warn!(
                        enrollment_id = %event.enrollment_id,
                        error = %error,
                        "final quiz lookup failed; skipping automatic certificate"
                    );
                    return false;
                }
            },
            CompletionPolicy::OnFullProgress | CompletionPolicy::Manual => {
                FinalQuizStatus::NoFinalQuiz
            }
        };
        should_auto_issue(self.settings.completion_policy, quiz)
    }

    async fn completion_effects(
        &self,
        course: &CourseSummary,
        lesson_id: LessonId,
        updated: &Enrollment,
        completion: Option<CourseCompleted>,
    ) -> Vec<SideEffect> {
        let mut effects: Vec<SideEffect> =
            CacheInvalidation::for_progress_change(&course.slug, &updated.user_id)
                .into_iter()
                .map(SideEffect::InvalidateCache)
                .collect();
        effects.push(SideEffect::RecordActivity(NewActivity::new(
            updated.user_id,
            ActivityType::LessonCompleted,
            json!({
                "lessonId": lesson_id,
                "courseId": course.id,
                "courseSlug": course.slug,
                "progressPercent": updated.progress_percent,
            }),
        )));

        let Some(event) = completion else {
            return effects;
        };
        info!(
            enrollment_id = %event.enrollment_id,
            user_id = %event.user_id,
            course_id = %event.course_id,
            "course completed"
        );
        effects.push(SideEffect::InvalidateCache(CacheInvalidation::Key(
            CacheKey::dashboard(&course.instructor_id),
        )));
        effects.push(SideEffect::InvalidateCache(CacheInvalidation::Prefix(
            CacheKey::course_stats_prefix(&course.slug),
        )));
        effects.push(SideEffect::NotifyCourseCompleted {
            student_id: event.user_id,
            course: course.clone(),
        });
        effects.push(SideEffect::RecordActivity(NewActivity::new(
            event.user_id,
            ActivityType::CourseCompleted,
            json!({
                "courseId": course.id,
                "courseSlug": course.slug,
                "completedAt": event.completed_at,
            }),
        )));
        if self.wants_certificate(&event).await {
            effects.push(SideEffect::IssueCertificate {
                user_id: event.user_id,
                enrollment_id: event.enrollment_id,
            });
        }
        effects
    }

    async fn cached_view(&self, key: &CacheKey) -> Option<CourseProgressView> {
        let raw = match self.cache.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(error) => {
                warn!(%key, error = %error, "progress cache read failed; using store");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(view) => Some(view),
            Err(error) => {
                warn!(%key, error = %error, "discarding undecodable cached progress view");
                None
            }
        }
    }

    async fn store_view(&self, key: &CacheKey, view: &CourseProgressView) {
        let payload = match serde_json::to_string(view) {
            Ok(payload) => payload,
            Err(error) => {
                warn!(%key, error = %error, "failed to encode progress view for cache");
                return;
            }
        };
        let ttl = ttl_with_jitter(self.settings.cache_ttl);
        if let Err(error) = self.cache.set(key, &payload, ttl).await {
            warn!(%key, error = %error, "progress cache write failed");
        }
    }
}

#[async_trait]
impl ProgressCommand for ProgressService {
    async fn record_lesson_completion(
        &self,
        request: RecordLessonCompletionRequest,
    ) -> Result<LessonCompletionOutcome, Error> {
        let context = self
            .repos
            .courses
            .find_lesson_context(&request.lesson_id)
            .await
            .map_err(map_course_error)?
            .ok_or_else(|| Error::not_found(format!("lesson {} not found", request.lesson_id)))?;
        let course = &context.outline.course;
        if request
            .course_slug
            .as_ref()
            .is_some_and(|slug| *slug != course.slug)
        {
            return Err(Error::not_found("lesson not found in course"));
        }

        let lesson_ids = context.outline.lesson_ids();
        if lesson_ids.is_empty() {
            return Err(Error::invalid_state("course has no lessons"));
        }

        let enrollment = self.enrollment_for(&request.user_id, course).await?;

        let (inserted, enrollment) = match self
            .repos
            .lesson_progress
            .insert(&NewLessonProgress {
                user_id: request.user_id,
                lesson_id: context.lesson_id,
                completed_at: request.completed_at.unwrap_or_else(|| self.clock.utc()),
            })
            .await
        {
            Ok(row) => (row, enrollment),
            Err(LessonProgressRepositoryError::Duplicate) => {
                self.resume_unprojected(
                    course,
                    &lesson_ids,
                    &request.user_id,
                    &context.lesson_id,
                )
                .await?
            }
            Err(other) => return Err(map_lesson_progress_error(other)),
        };

        let (prior, updated) = self
            .write_progress(
                course,
                &lesson_ids,
                context.lesson_id,
                context.module_id,
                enrollment,
            )
            .await?;
        let completion = detect_completion(&prior, &updated);

        let progress = match self
            .repos
            .lesson_progress
            .find(&request.user_id, &context.lesson_id)
            .await
        {
            Ok(Some(row)) => row,
            Ok(None) => inserted,
            Err(error) => {
                warn!(lesson_id = %context.lesson_id, error = %error, "re-reading lesson progress failed");
                inserted
            }
        };

        let effects = self
            .completion_effects(course, context.lesson_id, &updated, completion)
            .await;
        self.effects.run(effects).await;

        info!(
            user_id = %request.user_id,
            lesson_id = %context.lesson_id,
            enrollment_id = %updated.id,
            progress = updated.progress_percent.value(),
            "lesson completion recorded"
        );
        Ok(LessonCompletionOutcome {
            progress,
            enrollment: updated,
            course_completed: completion.is_some(),
        })
    }

    async fn reset_course_progress(
        &self,
        request: ResetCourseProgressRequest,
    ) -> Result<ResetCourseProgressOutcome, Error> {
        let outline = self.outline_by_slug(&request.course_slug).await?;
        let course = &outline.course;
        if !request.actor.is_admin() && request.actor.user_id != course.instructor_id {
            return Err(Error::forbidden(
                "only administrators or the course instructor may reset progress",
            ));
        }

        let enrollment = self.enrollment_for(&request.user_id, course).await?;
        let lesson_ids = outline.lesson_ids();
        let deleted_lessons = self
            .repos
            .enrollments
            .reset_progress(&enrollment.reset(), &lesson_ids)
            .await
            .map_err(map_enrollment_error)?;
        let enrollment = self.enrollment_for(&request.user_id, course).await?;

        let mut effects: Vec<SideEffect> =
            CacheInvalidation::for_progress_change(&course.slug, &request.user_id)
                .into_iter()
                .map(SideEffect::InvalidateCache)
                .collect();
        effects.push(SideEffect::InvalidateCache(CacheInvalidation::Prefix(
            CacheKey::course_stats_prefix(&course.slug),
        )));
        effects.push(SideEffect::RecordActivity(NewActivity::new(
            request.actor.user_id,
            ActivityType::ProgressReset,
            json!({
                "targetUserId": request.user_id,
                "courseId": course.id,
                "courseSlug": course.slug,
                "deletedLessons": deleted_lessons,
            }),
        )));
        self.effects.run(effects).await;

        info!(
            actor_id = %request.actor.user_id,
            user_id = %request.user_id,
            course = %course.slug,
            deleted_lessons,
            "course progress reset"
        );
        Ok(ResetCourseProgressOutcome {
            enrollment,
            deleted_lessons,
        })
    }
}

#[async_trait]
impl ProgressQuery for ProgressService {
    async fn course_progress(
        &self,
        user_id: &UserId,
        course_slug: &CourseSlug,
    ) -> Result<CourseProgressView, Error> {
        let key = CacheKey::learn_page(course_slug, user_id);
        if let Some(view) = self.cached_view(&key).await {
            return Ok(view);
        }

        let outline = self.outline_by_slug(course_slug).await?;
        let enrollment = self.enrollment_for(user_id, &outline.course).await?;
        let lesson_ids = outline.lesson_ids();
        let completed_lesson_ids = self
            .repos
            .lesson_progress
            .list_completed(user_id, &lesson_ids)
            .await
            .map_err(map_lesson_progress_error)?;

        let view = CourseProgressView {
            course_slug: outline.course.slug.clone(),
            course_title: outline.course.title.clone(),
            enrollment_id: enrollment.id,
            total_lessons: u32::try_from(lesson_ids.len()).unwrap_or(u32::MAX),
            completed_lesson_ids,
            progress_percent: enrollment.progress_percent,
            last_accessed_lesson_id: enrollment.last_accessed_lesson_id,
            last_accessed_module_id: enrollment.last_accessed_module_id,
            completed_at: enrollment.completed_at,
        };
        self.store_view(&key, &view).await;
        Ok(view)
    }
}

#[cfg(test)]
#[path = "progress_service_tests.rs"]
mod tests;
