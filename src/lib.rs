//! # Kennel
//!
//! Declarative, lifecycle-aware test fixtures for the Kennel pet clinic.
//!
//! A test unit declares which entity kinds it needs and whether they are
//! loaded before every method or once per process. Datasets are plain JSON
//! files named `{kind}-{unit}.json`, loaded in declaration order inside the
//! test's rolled-back transaction.
//!
//! ## Feature Flags
//!
//! - `clinic` (default) - `Owner`/`Pet` entities and the SQLite store
//! - `yaml` - YAML datasets
//! - `full` - All features enabled
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use kennel::prelude::*;
//!
//! declare_fixtures!("owner_listing" => ["Owner", "Pet"], PerClass);
//!
//! // Once per test process.
//! let db = ClinicDatabase::in_memory().await?;
//! let settings = FixtureSettings::from_env()?;
//! let declarations = Arc::new(DeclarationRegistry::from_inventory()?);
//! let tracker = LifecycleTracker::new();
//!
//! // In each test.
//! let store = Arc::new(db.begin_test_transaction().await?);
//! let hook = FixtureHook::new(
//!     declarations.clone(),
//!     FixtureLoader::new(
//!         Arc::new(DirectorySource::from_settings(&settings)),
//!         Arc::new(store.fixture_kinds()?),
//!     ),
//!     tracker.clone(),
//!     &settings,
//! );
//!
//! let ctx = ExecutionContext::new("owner_listing")
//!     .with_rollback_isolation(store.is_rollback_isolated());
//! hook.run(&ctx, |_| async {
//!     let owners = store.find_all::<Owner>().await.unwrap();
//!     assert_eq!(owners.len(), 2);
//! })
//! .await;
//! ```

/// Fixture declarations, lifecycle tracking and loading.
pub use kennel_fixtures as fixtures;

/// Clinic entities and the SQLite store.
#[cfg(feature = "clinic")]
pub use kennel_clinic as clinic;

pub use kennel_fixtures::declare_fixtures;

/// Convenience re-exports for common usage.
pub mod prelude {
	pub use kennel_fixtures::prelude::*;

	#[cfg(feature = "clinic")]
	pub use kennel_clinic::{ClinicDatabase, ClinicError, ClinicStore, Owner, Pet, Record};
}
