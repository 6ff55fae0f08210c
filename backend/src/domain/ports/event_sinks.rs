//! Append-only sinks for notifications and activity logs.
//!
//! Both sinks are written best-effort from background tasks; nothing in the
//! pipeline reads them back.

use async_trait::async_trait;

use crate::domain::{NewActivity, NewNotification};

use super::define_port_error;

define_port_error! {
    /// Errors raised by notification and activity sinks.
    pub enum EventSinkError {
        /// Sink connection could not be established.
        Connection { message: String } => "event sink connection failed: {message}",
        /// The row could not be written.
        Write { message: String } => "event sink write failed: {message}",
    }
}

/// Port for appending in-app notifications.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn append(&self, notification: &NewNotification) -> Result<(), EventSinkError>;
}

/// Port for appending audit activity rows.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ActivityLogSink: Send + Sync {
    async fn append(&self, activity: &NewActivity) -> Result<(), EventSinkError>;
}

/// Fixture sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureEventSink;

#[async_trait]
impl NotificationSink for FixtureEventSink {
    async fn append(&self, _notification: &NewNotification) -> Result<(), EventSinkError> {
        Ok(())
    }
}

#[async_trait]
impl ActivityLogSink for FixtureEventSink {
    async fn append(&self, _activity: &NewActivity) -> Result<(), EventSinkError> {
        Ok(())
    }
}
