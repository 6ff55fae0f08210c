//! Builders wiring outbound adapters into the progress and certificate
//! services behind [`HttpState`].

use std::sync::Arc;

use mockable::{Clock, DefaultClock};
use tracing::{info, warn};
use url::Url;

use backend::domain::ports::{EmailSender, ProgressCache, TaskDispatcher};
use backend::domain::{
    CertificatePorts, CertificateService, CertificateSettings, ProgressRepositories,
    ProgressService, ProgressSettings, RandomCodeSource, SideEffectPorts, SideEffectRunner,
};
use backend::inbound::http::state::HttpState;
use backend::outbound::cache::{NoOpProgressCache, RedisProgressCache};
use backend::outbound::email::{LoggingEmailSender, SmtpEmailSender};
use backend::outbound::persistence::{
    DbPool, DieselActivityLogSink, DieselCertificateRepository, DieselCourseRepository,
    DieselEnrollmentRepository, DieselLessonProgressRepository, DieselNotificationSink,
    DieselQuizAttemptRepository, DieselUserDirectory,
};
use backend::outbound::queue::TokioTaskDispatcher;
use backend::outbound::renderer::HttpDocumentRenderer;
use backend::outbound::storage::FsCertificateStorage;
use backend::settings::AppSettings;

/// Redis is only touched on reads and invalidations, so a small pool suffices.
const REDIS_POOL_SIZE: u32 = 8;

fn startup_error(context: &str, error: impl std::fmt::Display) -> std::io::Error {
    std::io::Error::other(format!("{context}: {error}"))
}

/// Connect the Redis cache, degrading to no caching when it is unreachable.
async fn build_cache(settings: &AppSettings) -> Arc<dyn ProgressCache> {
    let Some(url) = settings.redis_url.as_deref() else {
        info!("redis not configured; progress views are not cached");
        return Arc::new(NoOpProgressCache);
    };
    match RedisProgressCache::connect(url, REDIS_POOL_SIZE).await {
        Ok(cache) => Arc::new(cache),
        Err(error) => {
            warn!(%error, "redis unavailable; progress views are not cached");
            Arc::new(NoOpProgressCache)
        }
    }
}

fn build_email(settings: &AppSettings) -> std::io::Result<Arc<dyn EmailSender>> {
    match settings.smtp() {
        Some(smtp) => {
            let sender = SmtpEmailSender::new(&smtp)
                .map_err(|err| startup_error("smtp configuration", err))?;
            Ok(Arc::new(sender))
        }
        None => {
            info!("smtp not configured; certificate emails are logged only");
            Ok(Arc::new(LoggingEmailSender))
        }
    }
}

/// Everything the services need that does not live in PostgreSQL.
struct RuntimeAdapters {
    cache: Arc<dyn ProgressCache>,
    email: Arc<dyn EmailSender>,
    renderer: Arc<HttpDocumentRenderer>,
    storage: Arc<FsCertificateStorage>,
    dispatcher: Arc<dyn TaskDispatcher>,
}

async fn build_runtime_adapters(settings: &AppSettings) -> std::io::Result<RuntimeAdapters> {
    let renderer_url = settings
        .renderer_url()
        .map_err(|err| startup_error("renderer", err))?;
    let endpoint =
        Url::parse(renderer_url).map_err(|err| startup_error("invalid renderer url", err))?;
    let renderer = HttpDocumentRenderer::new(endpoint, settings.render_timeout())
        .map_err(|err| startup_error("renderer client", err))?;
    let storage = FsCertificateStorage::new(settings.certificate_dir())
        .map_err(|err| startup_error("certificate storage", err))?;

    Ok(RuntimeAdapters {
        cache: build_cache(settings).await,
        email: build_email(settings)?,
        renderer: Arc::new(renderer),
        storage: Arc::new(storage),
        dispatcher: Arc::new(TokioTaskDispatcher::new()),
    })
}

/// Build the handler state from settings and a connected pool.
///
/// The certificate service is built first so the progress service's side
/// effect runner can issue certificates automatically.
pub async fn build_http_state(settings: &AppSettings, pool: &DbPool) -> std::io::Result<HttpState> {
    let completion_policy = settings
        .completion_policy()
        .map_err(|err| startup_error("completion policy", err))?;
    let adapters = build_runtime_adapters(settings).await?;

    let courses = Arc::new(DieselCourseRepository::new(pool.clone()));
    let enrollments = Arc::new(DieselEnrollmentRepository::new(pool.clone()));
    let users = Arc::new(DieselUserDirectory::new(pool.clone()));
    let quiz_attempts = Arc::new(DieselQuizAttemptRepository::new(pool.clone()));
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);

    let effect_ports = SideEffectPorts {
        cache: adapters.cache.clone(),
        dispatcher: adapters.dispatcher,
        activity: Arc::new(DieselActivityLogSink::new(pool.clone())),
        notifications: Arc::new(DieselNotificationSink::new(pool.clone())),
        users: users.clone(),
        email: adapters.email,
    };

    let certificates = Arc::new(CertificateService::new(
        CertificatePorts {
            certificates: Arc::new(DieselCertificateRepository::new(pool.clone())),
            enrollments: enrollments.clone(),
            courses: courses.clone(),
            quiz_attempts: quiz_attempts.clone(),
            users,
            renderer: adapters.renderer,
            storage: adapters.storage,
            cache: adapters.cache.clone(),
        },
        Arc::new(RandomCodeSource),
        SideEffectRunner::new(effect_ports.clone()),
        clock.clone(),
        CertificateSettings {
            completion_policy,
            render_timeout: settings.render_timeout(),
            download_base_url: settings.certificate_base_url().to_owned(),
            cache_ttl: settings.cache_ttl(),
            ..CertificateSettings::default()
        },
    ));

    let progress = Arc::new(ProgressService::new(
        ProgressRepositories {
            courses,
            enrollments,
            lesson_progress: Arc::new(DieselLessonProgressRepository::new(pool.clone())),
            quiz_attempts,
        },
        adapters.cache,
        SideEffectRunner::new(effect_ports).with_issuer(certificates.clone()),
        clock,
        ProgressSettings {
            completion_policy,
            cache_ttl: settings.cache_ttl(),
            ..ProgressSettings::default()
        },
    ));

    info!(policy = %completion_policy, "progress services ready");
    Ok(HttpState::from_services(progress, certificates))
}
