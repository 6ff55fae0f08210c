//! PostgreSQL-backed notification and activity log sinks.
//!
//! Both tables are append-only from this service's point of view.

use async_trait::async_trait;
use diesel_async::RunQueryDsl;
use tracing::debug;
use uuid::Uuid;

use crate::domain::ports::{ActivityLogSink, EventSinkError, NotificationSink};
use crate::domain::{NewActivity, NewNotification};

use super::diesel_basic_error_mapping::{map_basic_diesel_error, map_basic_pool_error};
use super::models::{NewActivityRow, NewNotificationRow};
use super::pool::{DbPool, PoolError};
use super::schema::{activity_logs, notifications};

fn map_pool_error(error: PoolError) -> EventSinkError {
    map_basic_pool_error(error, |message| EventSinkError::connection(message))
}

fn map_diesel_error(error: diesel::result::Error) -> EventSinkError {
    map_basic_diesel_error(error, EventSinkError::write, EventSinkError::connection)
}

/// Notification sink writing to the `notifications` table.
#[derive(Clone)]
pub struct DieselNotificationSink {
    pool: DbPool,
}

impl DieselNotificationSink {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationSink for DieselNotificationSink {
    async fn append(&self, notification: &NewNotification) -> Result<(), EventSinkError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row = NewNotificationRow {
            id: Uuid::new_v4(),
            recipient_id: *notification.recipient_id.as_uuid(),
            kind: notification.kind.as_str(),
            content: &notification.content,
            metadata: &notification.metadata,
        };
        diesel::insert_into(notifications::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        debug!(
            recipient_id = %notification.recipient_id,
            kind = notification.kind.as_str(),
            "notification appended"
        );
        Ok(())
    }
}

/// Activity sink writing to the `activity_logs` table.
#[derive(Clone)]
pub struct DieselActivityLogSink {
    pool: DbPool,
}

impl DieselActivityLogSink {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ActivityLogSink for DieselActivityLogSink {
    async fn append(&self, activity: &NewActivity) -> Result<(), EventSinkError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row = NewActivityRow {
            id: Uuid::new_v4(),
            user_id: *activity.user_id.as_uuid(),
            activity_type: activity.activity_type.as_str(),
            details: &activity.details,
            ip_address: activity.ip_address.as_deref(),
        };
        diesel::insert_into(activity_logs::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn query_failures_map_to_write_errors() {
        let error = map_diesel_error(diesel::result::Error::NotFound);
        assert!(matches!(error, EventSinkError::Write { .. }));
    }

    #[rstest]
    fn pool_failures_map_to_connection_errors() {
        let error = map_pool_error(PoolError::checkout("pool exhausted"));
        assert_eq!(error, EventSinkError::connection("pool exhausted"));
    }
}
