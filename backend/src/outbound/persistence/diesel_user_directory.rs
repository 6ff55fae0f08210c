//! PostgreSQL-backed `UserDirectory` implementation.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{UserDirectory, UserDirectoryError};
use crate::domain::{UserId, UserProfile, UserRole};

use super::diesel_basic_error_mapping::{map_basic_diesel_error, map_basic_pool_error};
use super::models::UserRow;
use super::pool::{DbPool, PoolError};
use super::schema::users;

/// Diesel-backed implementation of the user profile read port.
#[derive(Clone)]
pub struct DieselUserDirectory {
    pool: DbPool,
}

impl DieselUserDirectory {
    /// Create a new directory with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> UserDirectoryError {
    map_basic_pool_error(error, |message| UserDirectoryError::connection(message))
}

fn map_diesel_error(error: diesel::result::Error) -> UserDirectoryError {
    map_basic_diesel_error(
        error,
        UserDirectoryError::query,
        UserDirectoryError::connection,
    )
}

fn row_to_profile(row: UserRow) -> Result<UserProfile, UserDirectoryError> {
    let role: UserRole = row
        .role
        .parse()
        .map_err(|err| UserDirectoryError::query(format!("invalid stored role: {err}")))?;
    Ok(UserProfile {
        id: UserId::from_uuid(row.id),
        display_name: row.display_name,
        email: row.email,
        role,
    })
}

#[async_trait]
impl UserDirectory for DieselUserDirectory {
    async fn find_profile(
        &self,
        user_id: &UserId,
    ) -> Result<Option<UserProfile>, UserDirectoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row = users::table
            .filter(users::id.eq(user_id.as_uuid()))
            .select(UserRow::as_select())
            .first::<UserRow>(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        row.map(row_to_profile).transpose()
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use uuid::Uuid;

    use super::*;

    fn row(role: &str) -> UserRow {
        UserRow {
            id: Uuid::new_v4(),
            display_name: "Ada Lovelace".to_owned(),
            email: "ada@example.com".to_owned(),
            role: role.to_owned(),
        }
    }

    #[rstest]
    fn rows_convert_to_profiles() {
        let profile = row_to_profile(row("instructor")).expect("valid row");
        assert_eq!(profile.role, UserRole::Instructor);
        assert_eq!(profile.display_name, "Ada Lovelace");
    }

    #[rstest]
    fn unknown_role_is_a_query_error() {
        assert!(matches!(
            row_to_profile(row("owner")),
            Err(UserDirectoryError::Query { .. })
        ));
    }
}
