//! Fixture framework configuration.
//!
//! Settings can be built in code or read from the environment:
//!
//! | Variable                 | Meaning                                   | Default    |
//! |--------------------------|-------------------------------------------|------------|
//! | `KENNEL_FIXTURES_STRICT` | Missing rollback isolation is fatal       | `true`     |
//! | `KENNEL_FIXTURES_DIR`    | Directory searched for dataset files      | `fixtures` |

use std::path::PathBuf;

use crate::error::{FixtureError, FixtureResult};

/// Environment variable controlling strict mode.
pub const STRICT_ENV: &str = "KENNEL_FIXTURES_STRICT";

/// Environment variable naming the fixtures directory.
pub const DIR_ENV: &str = "KENNEL_FIXTURES_DIR";

/// Configuration for fixture loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureSettings {
	/// Fail (instead of warn) when a unit declaring fixtures is not rollback
	/// isolated.
	pub strict: bool,
	/// Directory holding `{kind}-{unit}.json` datasets.
	pub fixtures_dir: PathBuf,
}

impl Default for FixtureSettings {
	fn default() -> Self {
		Self {
			strict: true,
			fixtures_dir: PathBuf::from("fixtures"),
		}
	}
}

impl FixtureSettings {
	/// Create default settings.
	pub fn new() -> Self {
		Self::default()
	}

	/// Set strict mode.
	pub fn with_strict(mut self, strict: bool) -> Self {
		self.strict = strict;
		self
	}

	/// Set the fixtures directory.
	pub fn with_fixtures_dir(mut self, dir: impl Into<PathBuf>) -> Self {
		self.fixtures_dir = dir.into();
		self
	}

	/// Read settings from the process environment, falling back to defaults.
	///
	/// # Errors
	///
	/// Returns [`FixtureError::Configuration`] if a variable holds an invalid
	/// value.
	pub fn from_env() -> FixtureResult<Self> {
		Self::from_lookup(|key| std::env::var(key).ok())
	}

	/// Read settings through an arbitrary key lookup.
	pub fn from_lookup<F>(lookup: F) -> FixtureResult<Self>
	where
		F: Fn(&str) -> Option<String>,
	{
		let mut settings = Self::default();

		if let Some(raw) = lookup(STRICT_ENV) {
			settings.strict = parse_bool(STRICT_ENV, &raw)?;
		}

		if let Some(dir) = lookup(DIR_ENV) {
			let dir = dir.trim();
			if dir.is_empty() {
				return Err(FixtureError::Configuration(format!("{} must not be empty", DIR_ENV)));
			}
			settings.fixtures_dir = PathBuf::from(dir);
		}

		Ok(settings)
	}
}

fn parse_bool(key: &str, raw: &str) -> FixtureResult<bool> {
	match raw.trim().to_ascii_lowercase().as_str() {
		"1" | "true" | "yes" | "on" => Ok(true),
		"0" | "false" | "no" | "off" => Ok(false),
		other => Err(FixtureError::Configuration(format!(
			"{} must be a boolean, got `{}`",
			key, other
		))),
	}
}
