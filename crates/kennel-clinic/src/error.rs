//! Error types for the clinic store.

use kennel_fixtures::StoreError;
use sqlx::error::ErrorKind;
use thiserror::Error;

/// Errors returned by [`ClinicDatabase`](crate::ClinicDatabase) and
/// [`ClinicStore`](crate::ClinicStore).
#[derive(Debug, Error)]
pub enum ClinicError {
	/// Underlying database error.
	#[error("Database error: {0}")]
	Database(#[from] sqlx::Error),

	/// The store's transaction was already committed or rolled back.
	#[error("Transaction scope is closed")]
	Closed,
}

impl ClinicError {
	/// Returns true if a table constraint rejected the statement.
	pub fn is_constraint_violation(&self) -> bool {
		match self {
			Self::Database(sqlx::Error::Database(db_err)) => {
				matches!(
					db_err.kind(),
					ErrorKind::ForeignKeyViolation
						| ErrorKind::UniqueViolation
						| ErrorKind::NotNullViolation
						| ErrorKind::CheckViolation
				) || db_err.message().contains("constraint failed")
			}
			_ => false,
		}
	}
}

impl From<ClinicError> for StoreError {
	fn from(error: ClinicError) -> Self {
		if error.is_constraint_violation() {
			return StoreError::Constraint(error.to_string());
		}
		match error {
			ClinicError::Closed => StoreError::Closed,
			other => StoreError::Database(other.to_string()),
		}
	}
}

/// Result type alias for clinic operations.
pub type ClinicResult<T> = Result<T, ClinicError>;
