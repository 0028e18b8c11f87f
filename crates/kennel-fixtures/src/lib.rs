//! Declarative, lifecycle-aware fixture loading for test suites.
//!
//! A test unit declares the entity kinds it needs, in load order, and how often
//! they are loaded. Before each invocation the [`FixtureHook`] resolves the
//! declaration, verifies the unit runs inside a rolled-back transaction, asks
//! the [`LifecycleTracker`] whether this invocation should load, and loads the
//! datasets for `(kind, unit)` through the [`FixtureLoader`].
//!
//! # Features
//!
//! - `json` - JSON datasets (enabled by default)
//! - `yaml` - YAML datasets
//! - `full` - All features enabled
//!
//! # Quick Start
//!
//! Declare fixtures next to the tests that use them:
//!
//! ```ignore
//! use kennel_fixtures::declare_fixtures;
//!
//! declare_fixtures!("owner_listing" => ["Owner", "Pet"], PerClass);
//! declare_fixtures!("pet_listing" => ["Owner", "Pet"]);
//! declare_fixtures!("pet_search" extends "pet_listing");
//! ```
//!
//! and provide `fixtures/Owner-owner_listing.json`,
//! `fixtures/Pet-owner_listing.json` and so on. Build the declarations and
//! the tracker once per test process:
//!
//! ```ignore
//! use kennel_fixtures::prelude::*;
//!
//! let settings = FixtureSettings::from_env()?;
//! let declarations = Arc::new(DeclarationRegistry::from_inventory()?);
//! let tracker = LifecycleTracker::new();
//! ```
//!
//! Then, in each test, hand clones of both to a hook around that test's
//! repositories:
//!
//! ```ignore
//! let hook = FixtureHook::new(
//!     declarations.clone(),
//!     FixtureLoader::new(Arc::new(DirectorySource::from_settings(&settings)), kinds),
//!     tracker.clone(),
//!     &settings,
//! );
//! hook.run(&ExecutionContext::isolated("owner_listing"), |report| async move {
//!     // test body
//! })
//! .await;
//! ```
//!
//! # Architecture
//!
//! - [`declaration`] - Declarations, test units and their registry
//! - [`lifecycle`] - Per-process record of per-class loads
//! - [`safety`] - Rollback isolation check
//! - [`fixtures`] - Dataset resolution, parsing and persistence
//! - [`hook`] - Per-cycle state machine
//! - [`settings`] - Strict mode and fixtures directory

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod declaration;
pub mod error;
pub mod fixtures;
pub mod hook;
pub mod lifecycle;
pub mod logging;
pub mod prelude;
pub mod safety;
pub mod settings;

// Re-export commonly used types at crate root
pub use declaration::{DeclarationRegistry, EntityKind, FixtureDeclaration, Lifecycle, TestUnit};
pub use error::{FixtureError, FixtureResult, SetupFailure, StoreError};
pub use fixtures::{Entity, EntityId, FixtureLoader, KindRegistry, Repository};
pub use hook::{CycleReport, ExecutionContext, FixtureHook, HookState};
pub use lifecycle::LifecycleTracker;
pub use settings::FixtureSettings;

#[doc(hidden)]
pub use inventory;

/// Registers a test unit and its fixture declaration at link time.
///
/// The unit is picked up by [`DeclarationRegistry::from_inventory`].
///
/// ```ignore
/// // PER_METHOD (default) declaration
/// declare_fixtures!("pet_listing" => ["Owner", "Pet"]);
///
/// // PER_CLASS declaration
/// declare_fixtures!("owner_listing" => ["Owner"], PerClass);
///
/// // Sub-unit inheriting its parent's declaration
/// declare_fixtures!("pet_search" extends "pet_listing");
///
/// // Sub-unit overriding it
/// declare_fixtures!("pet_detail" extends "pet_listing" => ["Pet"]);
/// ```
///
/// Kind names are validated when the registry is built; an invalid name
/// makes [`DeclarationRegistry::from_inventory`] fail.
#[macro_export]
macro_rules! declare_fixtures {
	(
		$unit:literal
		$(extends $parent:literal)?
		$(=> [$($kind:literal),* $(,)?] $(, $lifecycle:ident)?)?
	) => {
		#[allow(unsafe_attr_outside_unsafe)]
		const _: () = {
			fn __build() -> $crate::error::FixtureResult<$crate::declaration::TestUnit> {
				#[allow(unused_mut)]
				let mut unit = $crate::declaration::TestUnit::new($unit);
				$(
					unit = unit.with_parent($parent);
				)?
				$(
					let kinds: &[&str] = &[$($kind),*];
					#[allow(unused_mut)]
					let mut declaration =
						$crate::declaration::FixtureDeclaration::new(kinds.iter().copied())?;
					$(
						declaration =
							declaration.with_lifecycle($crate::declaration::Lifecycle::$lifecycle);
					)?
					unit = unit.with_declaration(declaration);
				)?
				Ok(unit)
			}

			$crate::inventory::submit! {
				$crate::declaration::UnitRegistration::new(__build)
			}
		};
	};
}
