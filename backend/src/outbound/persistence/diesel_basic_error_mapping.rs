//! Shared Diesel error mapping for repositories with basic query semantics.
//!
//! Every learning repository exposes `Connection` and `Query` variants. The
//! helpers here translate pool and Diesel failures into those two
//! constructors and let callers intercept unique violations by constraint
//! name before the generic mapping applies.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::debug;

use super::pool::PoolError;

/// Map pool errors into a repository-specific connection error constructor.
pub fn map_basic_pool_error<E, C>(error: PoolError, connection: C) -> E
where
    C: FnOnce(String) -> E,
{
    let message = match error {
        PoolError::Checkout { message } | PoolError::Build { message } => message,
    };
    connection(message)
}

/// Map common Diesel error variants into query/connection constructors.
///
/// `NotFound` and query-builder failures map to query errors; a closed
/// connection maps to a connection error so services can answer 503.
pub fn map_basic_diesel_error<E, Q, C>(error: DieselError, query: Q, connection: C) -> E
where
    Q: Fn(&'static str) -> E,
    C: Fn(&'static str) -> E,
{
    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(
                ?kind,
                message = info.message(),
                constraint = info.constraint_name(),
                "diesel operation failed"
            );
        }
        _ => debug!(
            error_type = %std::any::type_name_of_val(&error),
            "diesel operation failed"
        ),
    }

    match error {
        DieselError::NotFound => query("record not found"),
        DieselError::QueryBuilderError(_) => query("database query error"),
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            connection("database connection error")
        }
        DieselError::DatabaseError(_, _) => query("database error"),
        _ => query("database error"),
    }
}

/// Constraint name of a unique violation, when the error is one.
///
/// PostgreSQL reports the constraint name on the error. The message is
/// checked as a fallback for drivers that omit it.
pub fn unique_violation_constraint(error: &DieselError) -> Option<String> {
    let DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) = error else {
        return None;
    };
    Some(
        info.constraint_name()
            .map_or_else(|| info.message().to_owned(), str::to_owned),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[derive(Debug, PartialEq, Eq)]
    enum SampleError {
        Query(&'static str),
        Connection(String),
    }

    fn map(error: DieselError) -> SampleError {
        map_basic_diesel_error(error, SampleError::Query, |message| {
            SampleError::Connection(message.to_owned())
        })
    }

    #[rstest]
    fn not_found_maps_to_query() {
        assert_eq!(map(DieselError::NotFound), SampleError::Query("record not found"));
    }

    #[rstest]
    fn closed_connection_maps_to_connection() {
        let error = DieselError::DatabaseError(
            DatabaseErrorKind::ClosedConnection,
            Box::new("server closed the connection".to_owned()),
        );
        assert_eq!(
            map(error),
            SampleError::Connection("database connection error".to_owned())
        );
    }

    #[rstest]
    fn pool_errors_keep_their_message() {
        let mapped = map_basic_pool_error(PoolError::checkout("timed out"), SampleError::Connection);
        assert_eq!(mapped, SampleError::Connection("timed out".to_owned()));
    }

    #[rstest]
    fn unique_violation_reports_the_constraint_text() {
        let error = DieselError::DatabaseError(
            DatabaseErrorKind::UniqueViolation,
            Box::new("duplicate key violates certificates_code_key".to_owned()),
        );
        let constraint = unique_violation_constraint(&error).expect("unique violation");
        assert!(constraint.contains("certificates_code_key"));
    }

    #[rstest]
    fn other_errors_are_not_unique_violations() {
        assert!(unique_violation_constraint(&DieselError::NotFound).is_none());
    }
}
