//! Dataset resolution, parsing and persistence.
//!
//! - [`FixtureSource`] finds the dataset for an `(entity kind, test unit)` pair
//! - [`FixtureParser`] turns it into ordered raw records
//! - [`KindRegistry`] maps each kind to the persister that stores its records
//! - [`FixtureLoader`] ties the three together

pub mod format;
pub mod loader;
pub mod parser;
pub mod registry;
pub mod source;

pub use format::{FixtureDocument, FixtureFormat};
pub use loader::{FixtureLoader, LoadReport};
pub use parser::FixtureParser;
pub use registry::{
	Entity, EntityId, EntityPersister, KindRegistry, RecordLocation, RecordPersister, Repository,
};
pub use source::{DirectorySource, FixtureSource, InMemorySource, dataset_stem};
