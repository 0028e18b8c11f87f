//! Entity kinds and the persisters that turn raw records into stored rows.
//!
//! Each declared [`EntityKind`] needs a [`RecordPersister`] in the
//! [`KindRegistry`]. The usual persister is [`EntityPersister`], which decodes
//! a record into a typed [`Entity`] and hands it to a [`Repository`].

use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::declaration::EntityKind;
use crate::error::{FixtureError, FixtureResult, FormatCause, StoreError};

/// Identifier assigned by the store to a persisted entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub i64);

impl fmt::Display for EntityId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// A persistable entity type that fixtures can be decoded into.
pub trait Entity: DeserializeOwned + Send + Sync + 'static {
	/// Kind name used in declarations and dataset file names.
	const KIND: &'static str;
}

/// Store operation used by fixture loading.
#[async_trait]
pub trait Repository<E: Entity>: Send + Sync {
	/// Persists an entity in the current transaction scope and returns its id.
	async fn create(&self, entity: E) -> Result<EntityId, StoreError>;
}

/// Where a record came from, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordLocation {
	/// Entity kind being loaded.
	pub kind: EntityKind,
	/// Test unit the load runs for.
	pub unit: String,
	/// Dataset identifier.
	pub source_id: String,
	/// Position inside the dataset.
	pub index: usize,
}

/// Persists raw records of one entity kind.
#[async_trait]
pub trait RecordPersister: Send + Sync {
	/// The kind this persister handles.
	fn kind(&self) -> &EntityKind;

	/// Decodes and persists a single record.
	///
	/// # Errors
	///
	/// Returns [`FixtureError::Format`] if the record does not decode into the
	/// kind's entity, or [`FixtureError::Persistence`] if the store rejects it.
	async fn persist(&self, record: Value, location: &RecordLocation) -> FixtureResult<EntityId>;
}

/// Persister decoding records into `E` and storing them through `R`.
pub struct EntityPersister<E, R> {
	kind: EntityKind,
	repository: Arc<R>,
	_entity: PhantomData<fn() -> E>,
}

impl<E, R> EntityPersister<E, R>
where
	E: Entity,
	R: Repository<E>,
{
	/// Creates a persister for `E::KIND`.
	///
	/// # Errors
	///
	/// Returns [`FixtureError::Configuration`] if `E::KIND` is not a valid
	/// kind name.
	pub fn new(repository: Arc<R>) -> FixtureResult<Self> {
		Ok(Self {
			kind: EntityKind::new(E::KIND)?,
			repository,
			_entity: PhantomData,
		})
	}
}

#[async_trait]
impl<E, R> RecordPersister for EntityPersister<E, R>
where
	E: Entity,
	R: Repository<E> + 'static,
{
	fn kind(&self) -> &EntityKind {
		&self.kind
	}

	async fn persist(&self, record: Value, location: &RecordLocation) -> FixtureResult<EntityId> {
		let entity: E = serde_json::from_value(record).map_err(|e| FixtureError::Format {
			source_id: location.source_id.clone(),
			cause: FormatCause::InvalidRecord {
				index: location.index,
				message: format!("cannot decode into `{}`: {}", self.kind, e),
			},
		})?;

		self.repository
			.create(entity)
			.await
			.map_err(|cause| FixtureError::Persistence {
				kind: location.kind.to_string(),
				unit: location.unit.clone(),
				index: location.index,
				cause,
			})
	}
}

/// Explicitly owned map from entity kind to persister.
#[derive(Default)]
pub struct KindRegistry {
	persisters: RwLock<HashMap<EntityKind, Arc<dyn RecordPersister>>>,
}

impl fmt::Debug for KindRegistry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("KindRegistry")
			.field("kinds", &self.kinds())
			.finish()
	}
}

impl KindRegistry {
	/// Creates an empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers a persister under its kind, replacing any previous one.
	pub fn register_persister<P: RecordPersister + 'static>(&self, persister: P) {
		let kind = persister.kind().clone();
		self.persisters.write().insert(kind, Arc::new(persister));
	}

	/// Registers `repository` as the store for entity type `E`.
	pub fn register<E, R>(&self, repository: Arc<R>) -> FixtureResult<()>
	where
		E: Entity,
		R: Repository<E> + 'static,
	{
		self.register_persister(EntityPersister::<E, R>::new(repository)?);
		Ok(())
	}

	/// Registers `repository` for `E`, builder style.
	pub fn with<E, R>(self, repository: Arc<R>) -> FixtureResult<Self>
	where
		E: Entity,
		R: Repository<E> + 'static,
	{
		self.register::<E, R>(repository)?;
		Ok(self)
	}

	/// Gets the persister for a kind.
	pub fn get(&self, kind: &EntityKind) -> Option<Arc<dyn RecordPersister>> {
		self.persisters.read().get(kind).cloned()
	}

	/// Checks if a kind has a persister.
	pub fn contains(&self, kind: &EntityKind) -> bool {
		self.persisters.read().contains_key(kind)
	}

	/// Returns all registered kinds, sorted.
	pub fn kinds(&self) -> Vec<EntityKind> {
		let mut kinds: Vec<EntityKind> = self.persisters.read().keys().cloned().collect();
		kinds.sort();
		kinds
	}

	/// Returns the number of registered kinds.
	pub fn len(&self) -> usize {
		self.persisters.read().len()
	}

	/// Returns true if no kinds are registered.
	pub fn is_empty(&self) -> bool {
		self.persisters.read().is_empty()
	}
}
