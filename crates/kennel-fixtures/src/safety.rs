//! Check that fixture loading is always paired with rollback isolation.
//!
//! The check is a static property of the test unit: it runs whenever a
//! declaration is present, whether or not this cycle loads anything.

use crate::declaration::FixtureDeclaration;
use crate::error::FixtureError;
use crate::settings::FixtureSettings;

/// Result of a [`TransactionalSafetyCheck`].
#[derive(Debug)]
pub enum SafetyOutcome {
	/// Rollback isolated, or nothing declared.
	Passed,

	/// Not isolated in lenient mode; loading continues.
	Warning(String),

	/// Not isolated in strict mode; the unit must not run.
	Fatal(FixtureError),
}

impl SafetyOutcome {
	/// Returns true if the check passed without a warning.
	pub fn is_passed(&self) -> bool {
		matches!(self, Self::Passed)
	}

	/// Returns true if the unit must be aborted.
	pub fn is_fatal(&self) -> bool {
		matches!(self, Self::Fatal(_))
	}
}

/// Guard verifying that a unit declaring fixtures is enrolled in rollback
/// isolation.
#[derive(Debug, Clone, Copy)]
pub struct TransactionalSafetyCheck {
	strict: bool,
}

impl TransactionalSafetyCheck {
	/// Creates a check; `strict` makes a missing enrollment fatal.
	pub fn new(strict: bool) -> Self {
		Self { strict }
	}

	/// Creates a check from settings.
	pub fn from_settings(settings: &FixtureSettings) -> Self {
		Self::new(settings.strict)
	}

	/// Whether a missing enrollment is fatal.
	pub fn is_strict(&self) -> bool {
		self.strict
	}

	/// Inspects a unit's declaration against its isolation signal.
	pub fn check(
		&self,
		unit: &str,
		declaration: Option<&FixtureDeclaration>,
		rollback_isolated: bool,
	) -> SafetyOutcome {
		if declaration.is_none() || rollback_isolated {
			return SafetyOutcome::Passed;
		}

		if self.strict {
			SafetyOutcome::Fatal(FixtureError::Configuration(format!(
				"test unit `{}` declares fixtures but is not rollback isolated; \
				 run it inside a rolled-back transaction so fixture data cannot leak",
				unit
			)))
		} else {
			SafetyOutcome::Warning(format!(
				"test unit `{}` declares fixtures without rollback isolation; \
				 fixture data may leak into other tests",
				unit
			))
		}
	}
}

impl Default for TransactionalSafetyCheck {
	fn default() -> Self {
		Self::from_settings(&FixtureSettings::default())
	}
}
