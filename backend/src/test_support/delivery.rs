//! Recording and stub adapters for the cache, sinks and certificate delivery.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::ports::{
    ActivityLogSink, CacheKey, CertificateStorage, CertificateStorageError, DocumentRenderError,
    DocumentRenderer, EmailSendError, EmailSender, EventSinkError, NotificationSink,
    ProgressCache, ProgressCacheError,
};
use crate::domain::{CertificateDocument, NewActivity, NewNotification, OutgoingEmail};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Cache keeping entries in a map. TTLs are accepted and ignored.
#[derive(Debug, Default)]
pub struct InMemoryProgressCache {
    entries: Mutex<HashMap<String, String>>,
}

impl InMemoryProgressCache {
    pub fn contains(&self, key: &CacheKey) -> bool {
        lock(&self.entries).contains_key(key.as_str())
    }

    /// Stored keys in lexical order.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = lock(&self.entries).keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Seed an entry without going through the port.
    pub fn insert_raw(&self, key: &CacheKey, value: &str) {
        lock(&self.entries).insert(key.as_str().to_owned(), value.to_owned());
    }
}

#[async_trait]
impl ProgressCache for InMemoryProgressCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<String>, ProgressCacheError> {
        Ok(lock(&self.entries).get(key.as_str()).cloned())
    }

    async fn set(
        &self,
        key: &CacheKey,
        value: &str,
        _ttl: Duration,
    ) -> Result<(), ProgressCacheError> {
        self.insert_raw(key, value);
        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> Result<(), ProgressCacheError> {
        lock(&self.entries).remove(key.as_str());
        Ok(())
    }

    async fn delete_by_prefix(&self, prefix: &CacheKey) -> Result<u64, ProgressCacheError> {
        let mut entries = lock(&self.entries);
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix.as_str()));
        Ok(u64::try_from(before - entries.len()).unwrap_or(u64::MAX))
    }
}

/// Notification and activity sink remembering every appended row.
#[derive(Debug, Default)]
pub struct RecordingEventSink {
    notifications: Mutex<Vec<NewNotification>>,
    activities: Mutex<Vec<NewActivity>>,
    failing: bool,
}

impl RecordingEventSink {
    /// Sink rejecting every write.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn notifications(&self) -> Vec<NewNotification> {
        lock(&self.notifications).clone()
    }

    pub fn activities(&self) -> Vec<NewActivity> {
        lock(&self.activities).clone()
    }
}

#[async_trait]
impl NotificationSink for RecordingEventSink {
    async fn append(&self, notification: &NewNotification) -> Result<(), EventSinkError> {
        if self.failing {
            return Err(EventSinkError::write("notification sink offline"));
        }
        lock(&self.notifications).push(notification.clone());
        Ok(())
    }
}

#[async_trait]
impl ActivityLogSink for RecordingEventSink {
    async fn append(&self, activity: &NewActivity) -> Result<(), EventSinkError> {
        if self.failing {
            return Err(EventSinkError::write("activity sink offline"));
        }
        lock(&self.activities).push(activity.clone());
        Ok(())
    }
}

/// Email sender remembering every message it was asked to deliver.
#[derive(Debug, Default)]
pub struct RecordingEmailSender {
    sent: Mutex<Vec<OutgoingEmail>>,
    failing: bool,
}

impl RecordingEmailSender {
    /// Sender whose transport always fails.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<OutgoingEmail> {
        lock(&self.sent).clone()
    }
}

#[async_trait]
impl EmailSender for RecordingEmailSender {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), EmailSendError> {
        if self.failing {
            return Err(EmailSendError::transport("smtp relay refused connection"));
        }
        lock(&self.sent).push(email.clone());
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
enum RenderMode {
    #[default]
    Succeed,
    Fail,
    Stall(Duration),
}

/// Renderer producing a small fake PDF for each document.
#[derive(Debug, Default)]
pub struct StubDocumentRenderer {
    mode: RenderMode,
    calls: AtomicUsize,
    documents: Mutex<Vec<CertificateDocument>>,
}

impl StubDocumentRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Renderer answering every request with a 502.
    pub fn failing() -> Self {
        Self {
            mode: RenderMode::Fail,
            ..Self::default()
        }
    }

    /// Renderer that waits `delay` before answering.
    pub fn slow(delay: Duration) -> Self {
        Self {
            mode: RenderMode::Stall(delay),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn documents(&self) -> Vec<CertificateDocument> {
        lock(&self.documents).clone()
    }
}

#[async_trait]
impl DocumentRenderer for StubDocumentRenderer {
    async fn render(&self, document: &CertificateDocument) -> Result<Vec<u8>, DocumentRenderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.mode {
            RenderMode::Succeed => {}
            RenderMode::Fail => {
                return Err(DocumentRenderError::rejected(502_u16, "renderer unavailable"));
            }
            RenderMode::Stall(delay) => tokio::time::sleep(delay).await,
        }
        lock(&self.documents).push(document.clone());
        Ok(format!("%PDF-1.7 stub {}", document.code).into_bytes())
    }
}

/// Storage keeping documents in a map keyed by path.
#[derive(Debug, Default)]
pub struct InMemoryCertificateStorage {
    documents: Mutex<HashMap<String, Vec<u8>>>,
    failing: bool,
}

impl InMemoryCertificateStorage {
    /// Storage rejecting every write.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        lock(&self.documents).get(path).cloned()
    }

    pub fn len(&self) -> usize {
        lock(&self.documents).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CertificateStorage for InMemoryCertificateStorage {
    async fn store(&self, path: &str, bytes: &[u8]) -> Result<String, CertificateStorageError> {
        if self.failing {
            return Err(CertificateStorageError::io("disk full"));
        }
        lock(&self.documents).insert(path.to_owned(), bytes.to_vec());
        Ok(path.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::domain::{CourseSlug, UserId};

    #[rstest]
    #[tokio::test]
    async fn prefix_deletion_only_touches_matching_keys() {
        let cache = InMemoryProgressCache::default();
        let slug = CourseSlug::new("rust-basics").expect("valid slug");
        let prefix = CacheKey::course_stats_prefix(&slug);
        let stats = CacheKey::new(format!("{prefix}weekly")).expect("valid key");
        let other = CacheKey::certificates(&UserId::random());
        cache.insert_raw(&stats, "{}");
        cache.insert_raw(&other, "[]");

        let removed = cache.delete_by_prefix(&prefix).await.expect("delete");

        assert_eq!(removed, 1);
        assert!(!cache.contains(&stats));
        assert!(cache.contains(&other));
    }
}
