//! Error types for fixture declaration, loading and persistence.
//!
//! Every failure that aborts a test unit before its body runs is a
//! [`FixtureError`]. The hook wraps it in a [`SetupFailure`] so a report reads
//! as a setup problem rather than an assertion failure.

use thiserror::Error;

/// Errors that can occur while preparing fixtures for a test unit.
#[derive(Debug, Error)]
pub enum FixtureError {
	/// Malformed or conflicting declaration, or a missing rollback isolation
	/// under strict mode.
	#[error("Configuration error: {0}")]
	Configuration(String),

	/// No dataset exists for the requested entity kind and test unit.
	#[error("Fixture not found for entity kind `{kind}` and test unit `{unit}` (expected {expected})")]
	NotFound {
		/// Entity kind that was requested.
		kind: String,
		/// Test unit that requested it.
		unit: String,
		/// Identifiers the source looked for (file paths or a map key), comma separated.
		expected: String,
	},

	/// The dataset exists but could not be parsed or decoded.
	#[error("Invalid fixture format in {source_id}: {cause}")]
	Format {
		/// Identifier of the offending dataset.
		source_id: String,
		/// Underlying parse failure.
		#[source]
		cause: FormatCause,
	},

	/// The store rejected a record.
	#[error("Failed to persist record {index} of entity kind `{kind}` for test unit `{unit}`: {cause}")]
	Persistence {
		/// Entity kind being loaded.
		kind: String,
		/// Test unit the load ran for.
		unit: String,
		/// Position of the record inside its dataset.
		index: usize,
		/// Error reported by the store.
		#[source]
		cause: StoreError,
	},

	/// A per-class load already failed earlier in this process.
	#[error("Fixtures for test unit `{unit}` failed to load in an earlier cycle: {reason}")]
	PoisonedLoad {
		/// Test unit whose load failed.
		unit: String,
		/// Message of the original failure.
		reason: String,
	},
}

impl FixtureError {
	/// Returns true for errors caused by the declaration or environment
	/// rather than by the dataset or the store.
	pub fn is_configuration(&self) -> bool {
		matches!(self, Self::Configuration(_))
	}
}

/// Underlying cause of a [`FixtureError::Format`].
#[derive(Debug, Error)]
pub enum FormatCause {
	/// JSON syntax or decoding error.
	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),

	/// YAML syntax error (when the `yaml` feature is enabled).
	#[cfg(feature = "yaml")]
	#[error("YAML error: {0}")]
	Yaml(#[from] serde_yaml::Error),

	/// The dataset could not be read.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	/// A record had the wrong shape or could not become an entity.
	#[error("record {index}: {message}")]
	InvalidRecord {
		/// Position of the record inside its dataset.
		index: usize,
		/// What was wrong with it.
		message: String,
	},

	/// The dataset's top level is not a sequence or a single record.
	#[error("{0}")]
	Shape(String),

	/// The dataset's format is not enabled in this build.
	#[error("Unsupported format: {0}")]
	Unsupported(String),
}

/// Errors reported by an entity store.
#[derive(Debug, Error)]
pub enum StoreError {
	/// A constraint (foreign key, uniqueness, not-null) rejected the write.
	#[error("Constraint violation: {0}")]
	Constraint(String),

	/// Any other database failure.
	#[error("Database error: {0}")]
	Database(String),

	/// The transaction scope backing the store has already completed.
	#[error("Transaction scope is closed")]
	Closed,
}

/// A fixture failure attributed to the test unit it aborted.
#[derive(Debug, Error)]
#[error("fixture setup failed for test unit `{unit}`: {error}")]
pub struct SetupFailure {
	/// Test unit that could not be prepared.
	pub unit: String,
	/// What went wrong.
	#[source]
	pub error: FixtureError,
}

impl SetupFailure {
	/// Wraps an error for the given unit.
	pub fn new(unit: impl Into<String>, error: FixtureError) -> Self {
		Self {
			unit: unit.into(),
			error,
		}
	}
}

/// Result type alias for fixture operations.
pub type FixtureResult<T> = Result<T, FixtureError>;
