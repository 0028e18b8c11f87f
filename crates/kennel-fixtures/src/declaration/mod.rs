//! Fixture declarations attached to test units.
//!
//! A [`FixtureDeclaration`] names the entity kinds a test unit needs, in load
//! order, and how often they are loaded ([`Lifecycle`]).
//!
//! ```
//! use kennel_fixtures::declaration::{FixtureDeclaration, Lifecycle};
//!
//! let declaration = FixtureDeclaration::new(["Owner", "Pet"]).unwrap().per_class();
//! assert_eq!(declaration.lifecycle(), Lifecycle::PerClass);
//! assert_eq!(declaration.entity_kinds()[0].as_str(), "Owner");
//! ```

pub mod registry;

use std::fmt;
use std::str::FromStr;

use crate::error::{FixtureError, FixtureResult};

pub use registry::{DeclarationRegistry, TestUnit, UnitRegistration};

/// Checks that a name can be embedded in a dataset file name.
pub(crate) fn validate_name(what: &str, name: &str) -> FixtureResult<()> {
	if name.is_empty() {
		return Err(FixtureError::Configuration(format!("{} name must not be empty", what)));
	}
	if name.contains(['/', '\\']) || name.contains("..") || name.chars().any(char::is_whitespace) {
		return Err(FixtureError::Configuration(format!(
			"{} name `{}` must not contain path separators, `..` or whitespace",
			what, name
		)));
	}
	Ok(())
}

/// Reference to a persistable entity type (e.g. `Owner`, `Pet`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityKind(String);

impl EntityKind {
	/// Creates a validated entity kind.
	///
	/// # Errors
	///
	/// Returns [`FixtureError::Configuration`] if the name is empty or contains
	/// path separators, `..`, whitespace or `-`.
	pub fn new(name: impl Into<String>) -> FixtureResult<Self> {
		let name = name.into();
		validate_name("Entity kind", &name)?;
		// `-` separates the kind from the unit in dataset file names.
		if name.contains('-') {
			return Err(FixtureError::Configuration(format!(
				"Entity kind name `{}` must not contain `-`",
				name
			)));
		}
		Ok(Self(name))
	}

	/// Returns the kind name.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for EntityKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl AsRef<str> for EntityKind {
	fn as_ref(&self) -> &str {
		&self.0
	}
}

impl FromStr for EntityKind {
	type Err = FixtureError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::new(s)
	}
}

/// How often a test unit's fixtures are loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Lifecycle {
	/// Load before every test method (default).
	#[default]
	PerMethod,

	/// Load once per process run for the unit.
	PerClass,
}

impl fmt::Display for Lifecycle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::PerMethod => write!(f, "PER_METHOD"),
			Self::PerClass => write!(f, "PER_CLASS"),
		}
	}
}

impl FromStr for Lifecycle {
	type Err = FixtureError;

	/// Parses `PER_METHOD` / `PER_CLASS`, ignoring case and accepting `-`.
	///
	/// ```
	/// use kennel_fixtures::declaration::Lifecycle;
	///
	/// assert_eq!("per-class".parse::<Lifecycle>().unwrap(), Lifecycle::PerClass);
	/// assert!("per_suite".parse::<Lifecycle>().is_err());
	/// ```
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
			"PER_METHOD" => Ok(Self::PerMethod),
			"PER_CLASS" => Ok(Self::PerClass),
			_ => Err(FixtureError::Configuration(format!(
				"unknown lifecycle `{}` (expected PER_METHOD or PER_CLASS)",
				s
			))),
		}
	}
}

/// Ordered set of entity kinds to load, plus a lifecycle mode.
///
/// Immutable once built: the builder methods consume `self`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FixtureDeclaration {
	entity_kinds: Vec<EntityKind>,
	lifecycle: Lifecycle,
}

impl FixtureDeclaration {
	/// Creates a per-method declaration from kind names, validating each one.
	pub fn new<I, K>(kinds: I) -> FixtureResult<Self>
	where
		I: IntoIterator<Item = K>,
		K: AsRef<str>,
	{
		let entity_kinds = kinds
			.into_iter()
			.map(|kind| EntityKind::new(kind.as_ref()))
			.collect::<FixtureResult<Vec<_>>>()?;
		Ok(Self::from_kinds(entity_kinds))
	}

	/// Creates a per-method declaration from already validated kinds.
	pub fn from_kinds(entity_kinds: Vec<EntityKind>) -> Self {
		Self {
			entity_kinds,
			lifecycle: Lifecycle::default(),
		}
	}

	/// Sets the lifecycle mode.
	pub fn with_lifecycle(mut self, lifecycle: Lifecycle) -> Self {
		self.lifecycle = lifecycle;
		self
	}

	/// Loads once per process run.
	pub fn per_class(self) -> Self {
		self.with_lifecycle(Lifecycle::PerClass)
	}

	/// Loads before every test method.
	pub fn per_method(self) -> Self {
		self.with_lifecycle(Lifecycle::PerMethod)
	}

	/// Declared kinds, in load order. Duplicates are kept.
	pub fn entity_kinds(&self) -> &[EntityKind] {
		&self.entity_kinds
	}

	/// Declared lifecycle mode.
	pub fn lifecycle(&self) -> Lifecycle {
		self.lifecycle
	}
}
