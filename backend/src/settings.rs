//! Application configuration loaded via OrthoConfig.
//!
//! Values come from CLI flags, `LMS_*` environment variables and an optional
//! configuration file, in increasing order of precedence for the first two.
//! Optional fields fall back to the defaults exposed by the accessors below.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;

use crate::domain::{CompletionPolicy, ParseCompletionPolicyError};
use crate::outbound::email::SmtpSettings;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_RENDER_TIMEOUT_SECS: u64 = 10;
const DEFAULT_CERTIFICATE_DIR: &str = "./var/certificates";
const DEFAULT_CERTIFICATE_BASE_URL: &str = "http://localhost:8080/files";
const DEFAULT_CACHE_TTL_SECS: u64 = 300;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;

/// Errors raised when resolving settings into runtime values.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("missing required setting `{0}`")]
    Missing(&'static str),
    #[error("invalid bind address `{value}`: {message}")]
    BindAddr { value: String, message: String },
    #[error(transparent)]
    CompletionPolicy(#[from] ParseCompletionPolicyError),
}

/// Runtime configuration of the backend process.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "LMS")]
pub struct AppSettings {
    /// PostgreSQL connection string.
    pub database_url: Option<String>,
    /// Redis connection string; caching is disabled when absent.
    pub redis_url: Option<String>,
    /// Socket address the HTTP server binds to.
    pub bind_addr: Option<String>,
    /// One of `on_full_progress`, `require_final_quiz` or `manual`.
    pub completion_policy: Option<String>,
    /// Endpoint of the certificate rendering service.
    pub renderer_url: Option<String>,
    pub render_timeout_secs: Option<u64>,
    /// Directory certificate documents are written to.
    pub certificate_dir: Option<PathBuf>,
    /// Public base URL under which stored certificates are served.
    pub certificate_base_url: Option<String>,
    pub cache_ttl_secs: Option<u64>,
    pub smtp_host: Option<String>,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    /// Sender mailbox, e.g. `Courses <noreply@example.com>`.
    pub mail_from: Option<String>,
    /// Apply embedded migrations before serving.
    #[ortho_config(default = false)]
    pub run_migrations: bool,
    pub db_max_connections: Option<u32>,
}

impl AppSettings {
    pub fn database_url(&self) -> Result<&str, SettingsError> {
        self.database_url
            .as_deref()
            .ok_or(SettingsError::Missing("database_url"))
    }

    pub fn renderer_url(&self) -> Result<&str, SettingsError> {
        self.renderer_url
            .as_deref()
            .ok_or(SettingsError::Missing("renderer_url"))
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, SettingsError> {
        let raw = self.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR);
        raw.parse().map_err(|err: std::net::AddrParseError| SettingsError::BindAddr {
            value: raw.to_owned(),
            message: err.to_string(),
        })
    }

    pub fn completion_policy(&self) -> Result<CompletionPolicy, SettingsError> {
        match self.completion_policy.as_deref() {
            Some(raw) => Ok(raw.parse()?),
            None => Ok(CompletionPolicy::default()),
        }
    }

    pub fn render_timeout(&self) -> Duration {
        Duration::from_secs(
            self.render_timeout_secs
                .unwrap_or(DEFAULT_RENDER_TIMEOUT_SECS),
        )
    }

    pub fn certificate_dir(&self) -> PathBuf {
        self.certificate_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CERTIFICATE_DIR))
    }

    pub fn certificate_base_url(&self) -> &str {
        self.certificate_base_url
            .as_deref()
            .unwrap_or(DEFAULT_CERTIFICATE_BASE_URL)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs.unwrap_or(DEFAULT_CACHE_TTL_SECS))
    }

    pub fn db_max_connections(&self) -> u32 {
        self.db_max_connections
            .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS)
    }

    /// SMTP settings when both a host and a sender are configured.
    pub fn smtp(&self) -> Option<SmtpSettings> {
        let host = self.smtp_host.clone()?;
        let from = self.mail_from.clone()?;
        Some(SmtpSettings {
            host,
            username: self.smtp_username.clone(),
            password: self.smtp_password.clone(),
            from,
        })
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for configuration parsing.

    use super::*;
    use std::ffi::OsString;

    use env_lock::lock_env;
    use rstest::rstest;

    const KEYS: [&str; 15] = [
        "LMS_DATABASE_URL",
        "LMS_REDIS_URL",
        "LMS_BIND_ADDR",
        "LMS_COMPLETION_POLICY",
        "LMS_RENDERER_URL",
        "LMS_RENDER_TIMEOUT_SECS",
        "LMS_CERTIFICATE_DIR",
        "LMS_CERTIFICATE_BASE_URL",
        "LMS_CACHE_TTL_SECS",
        "LMS_SMTP_HOST",
        "LMS_SMTP_USERNAME",
        "LMS_SMTP_PASSWORD",
        "LMS_MAIL_FROM",
        "LMS_RUN_MIGRATIONS",
        "LMS_DB_MAX_CONNECTIONS",
    ];

    fn load_from_empty_args() -> AppSettings {
        AppSettings::load_from_iter([OsString::from("backend")]).expect("config should load")
    }

    fn cleared_with(overrides: &[(&str, &str)]) -> Vec<(&'static str, Option<String>)> {
        KEYS.iter()
            .map(|key| {
                let value = overrides
                    .iter()
                    .find(|(name, _)| name == key)
                    .map(|(_, value)| (*value).to_owned());
                (*key, value)
            })
            .collect()
    }

    #[rstest]
    fn defaults_apply_when_unset() {
        let _guard = lock_env(cleared_with(&[]));

        let settings = load_from_empty_args();

        assert!(matches!(
            settings.database_url(),
            Err(SettingsError::Missing("database_url"))
        ));
        assert!(matches!(
            settings.renderer_url(),
            Err(SettingsError::Missing("renderer_url"))
        ));
        assert_eq!(
            settings.bind_addr().expect("default address"),
            "0.0.0.0:8080".parse::<SocketAddr>().expect("socket address")
        );
        assert_eq!(
            settings.completion_policy().expect("default policy"),
            CompletionPolicy::OnFullProgress
        );
        assert_eq!(settings.render_timeout(), Duration::from_secs(10));
        assert_eq!(settings.cache_ttl(), Duration::from_secs(300));
        assert_eq!(settings.certificate_dir(), PathBuf::from("./var/certificates"));
        assert_eq!(settings.certificate_base_url(), "http://localhost:8080/files");
        assert_eq!(settings.db_max_connections(), 10);
        assert!(!settings.run_migrations);
        assert!(settings.redis_url.is_none());
        assert!(settings.smtp().is_none());
    }

    #[rstest]
    fn environment_overrides_are_respected() {
        let _guard = lock_env(cleared_with(&[
            ("LMS_DATABASE_URL", "postgres://lms@localhost/lms"),
            ("LMS_RENDERER_URL", "http://renderer:3000/render"),
            ("LMS_BIND_ADDR", "127.0.0.1:9090"),
            ("LMS_COMPLETION_POLICY", "require_final_quiz"),
            ("LMS_RENDER_TIMEOUT_SECS", "3"),
            ("LMS_SMTP_HOST", "smtp.example.com"),
            ("LMS_MAIL_FROM", "Courses <noreply@example.com>"),
            ("LMS_RUN_MIGRATIONS", "true"),
        ]));

        let settings = load_from_empty_args();

        assert_eq!(
            settings.database_url().expect("database url"),
            "postgres://lms@localhost/lms"
        );
        assert_eq!(
            settings.renderer_url().expect("renderer url"),
            "http://renderer:3000/render"
        );
        assert_eq!(
            settings.bind_addr().expect("address"),
            "127.0.0.1:9090".parse::<SocketAddr>().expect("socket address")
        );
        assert_eq!(
            settings.completion_policy().expect("policy"),
            CompletionPolicy::RequireFinalQuiz
        );
        assert_eq!(settings.render_timeout(), Duration::from_secs(3));
        assert!(settings.run_migrations);
        let smtp = settings.smtp().expect("smtp configured");
        assert_eq!(smtp.host, "smtp.example.com");
        assert!(smtp.username.is_none());
    }

    #[rstest]
    fn unknown_completion_policy_is_rejected() {
        let _guard = lock_env(cleared_with(&[("LMS_COMPLETION_POLICY", "eventually")]));

        let settings = load_from_empty_args();

        assert!(matches!(
            settings.completion_policy(),
            Err(SettingsError::CompletionPolicy(_))
        ));
    }

    #[rstest]
    fn malformed_bind_address_is_rejected() {
        let _guard = lock_env(cleared_with(&[("LMS_BIND_ADDR", "not-an-address")]));

        let settings = load_from_empty_args();

        assert!(matches!(
            settings.bind_addr(),
            Err(SettingsError::BindAddr { .. })
        ));
    }
}
