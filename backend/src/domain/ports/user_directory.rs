//! Port for looking up user profiles owned by the identity subsystem.
use async_trait::async_trait;

use crate::domain::{UserId, UserProfile};

use super::define_port_error;

define_port_error! {
    /// Errors raised by user directory adapters.
    pub enum UserDirectoryError {
        /// Directory connection could not be established.
        Connection { message: String } =>
            "user directory connection failed: {message}",
        /// Query failed during execution.
        Query { message: String } =>
            "user directory query failed: {message}",
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Fetch the profile of a user.
    async fn find_profile(&self, user_id: &UserId)
    -> Result<Option<UserProfile>, UserDirectoryError>;
}

/// Fixture implementation that knows no users.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureUserDirectory;

#[async_trait]
impl UserDirectory for FixtureUserDirectory {
    async fn find_profile(
        &self,
        _user_id: &UserId,
    ) -> Result<Option<UserProfile>, UserDirectoryError> {
        Ok(None)
    }
}
