//! Declaration lookup for test units.
//!
//! Test units are registered explicitly (or collected from
//! [`declare_fixtures!`](crate::declare_fixtures) submissions) together with an
//! optional parent. Resolution walks the parent chain, so a sub-unit inherits
//! the nearest ancestor's declaration unless it carries its own.

use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;

use super::{validate_name, FixtureDeclaration};
use crate::error::{FixtureError, FixtureResult};

/// A test unit (suite) and the fixture metadata attached to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestUnit {
	name: String,
	parent: Option<String>,
	declaration: Option<FixtureDeclaration>,
}

impl TestUnit {
	/// Creates a unit with no parent and no declaration.
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			parent: None,
			declaration: None,
		}
	}

	/// Sets the unit this one inherits from.
	pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
		self.parent = Some(parent.into());
		self
	}

	/// Attaches a fixture declaration.
	pub fn with_declaration(mut self, declaration: FixtureDeclaration) -> Self {
		self.declaration = Some(declaration);
		self
	}

	/// Unit name.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Parent unit name, if any.
	pub fn parent(&self) -> Option<&str> {
		self.parent.as_deref()
	}

	/// The unit's own declaration (not inherited).
	pub fn declaration(&self) -> Option<&FixtureDeclaration> {
		self.declaration.as_ref()
	}
}

/// Registration-time association of a test unit, collected with `inventory`.
///
/// Submitted by [`declare_fixtures!`](crate::declare_fixtures); the builder
/// runs when [`DeclarationRegistry::from_inventory`] is called.
pub struct UnitRegistration {
	build: fn() -> FixtureResult<TestUnit>,
}

impl UnitRegistration {
	/// Creates a registration from a unit builder.
	pub const fn new(build: fn() -> FixtureResult<TestUnit>) -> Self {
		Self { build }
	}

	/// Builds the registered unit.
	pub fn build(&self) -> FixtureResult<TestUnit> {
		(self.build)()
	}
}

inventory::collect!(UnitRegistration);

/// Explicitly owned table of test units and their declarations.
#[derive(Debug, Default)]
pub struct DeclarationRegistry {
	units: RwLock<HashMap<String, TestUnit>>,
}

impl DeclarationRegistry {
	/// Creates an empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Builds a registry from every `declare_fixtures!` submission linked into
	/// the current binary.
	///
	/// # Errors
	///
	/// Returns the first invalid or conflicting registration.
	pub fn from_inventory() -> FixtureResult<Self> {
		let registry = Self::new();
		for registration in inventory::iter::<UnitRegistration> {
			registry.register(registration.build()?)?;
		}
		Ok(registry)
	}

	/// Registers a test unit.
	///
	/// Registering an identical definition twice is a no-op.
	///
	/// # Errors
	///
	/// Returns [`FixtureError::Configuration`] if the unit name is invalid or a
	/// different definition is already registered under the same name.
	pub fn register(&self, unit: TestUnit) -> FixtureResult<()> {
		validate_name("Test unit", unit.name())?;

		let mut units = self.units.write();
		match units.get(unit.name()) {
			Some(existing) if *existing == unit => Ok(()),
			Some(existing) => Err(FixtureError::Configuration(format!(
				"test unit `{}` is registered twice with conflicting definitions \
				 (parent {:?}, declaration {:?} vs parent {:?}, declaration {:?})",
				unit.name(),
				existing.parent(),
				existing.declaration(),
				unit.parent(),
				unit.declaration()
			))),
			None => {
				units.insert(unit.name.clone(), unit);
				Ok(())
			}
		}
	}

	/// Returns a copy of the registered unit.
	pub fn unit(&self, name: &str) -> Option<TestUnit> {
		self.units.read().get(name).cloned()
	}

	/// Checks if a unit is registered.
	pub fn contains(&self, name: &str) -> bool {
		self.units.read().contains_key(name)
	}

	/// Returns the number of registered units.
	pub fn len(&self) -> usize {
		self.units.read().len()
	}

	/// Returns true if no units are registered.
	pub fn is_empty(&self) -> bool {
		self.units.read().is_empty()
	}

	/// Resolves the declaration in effect for a unit.
	///
	/// Returns `Ok(None)` when neither the unit nor any ancestor declares
	/// fixtures, or when the unit is not registered at all.
	///
	/// # Errors
	///
	/// Returns [`FixtureError::Configuration`] if the ancestry refers to an
	/// unregistered unit or loops back on itself.
	pub fn resolve(&self, name: &str) -> FixtureResult<Option<FixtureDeclaration>> {
		let units = self.units.read();
		let mut visited = HashSet::new();
		let mut current = name;

		loop {
			let Some(unit) = units.get(current) else {
				if current == name {
					return Ok(None);
				}
				return Err(FixtureError::Configuration(format!(
					"test unit `{}` inherits from unregistered unit `{}`",
					name, current
				)));
			};

			if !visited.insert(current) {
				return Err(FixtureError::Configuration(format!(
					"test unit `{}` has a cyclic ancestry through `{}`",
					name, current
				)));
			}

			if let Some(declaration) = unit.declaration() {
				return Ok(Some(declaration.clone()));
			}

			match unit.parent() {
				Some(parent) => current = parent,
				None => return Ok(None),
			}
		}
	}
}
