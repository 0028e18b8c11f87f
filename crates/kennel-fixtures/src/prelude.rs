//! Convenience re-exports for common usage.
//!
//! ```
//! use kennel_fixtures::prelude::*;
//!
//! let declaration = FixtureDeclaration::new(["Owner"]).unwrap().per_class();
//! assert_eq!(declaration.lifecycle(), Lifecycle::PerClass);
//! ```

// Error types
pub use crate::error::{FixtureError, FixtureResult, SetupFailure, StoreError};

// Declarations
pub use crate::declaration::{
	DeclarationRegistry, EntityKind, FixtureDeclaration, Lifecycle, TestUnit,
};

// Loading
pub use crate::fixtures::{
	DirectorySource, Entity, EntityId, FixtureLoader, FixtureSource, InMemorySource, KindRegistry,
	LoadReport, Repository,
};

// Orchestration
pub use crate::hook::{CycleReport, ExecutionContext, FixtureHook, HookState};
pub use crate::lifecycle::LifecycleTracker;
pub use crate::safety::{SafetyOutcome, TransactionalSafetyCheck};
pub use crate::settings::FixtureSettings;

pub use crate::declare_fixtures;
