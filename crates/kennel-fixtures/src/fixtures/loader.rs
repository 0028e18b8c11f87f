//! Loading of datasets into the store.

use std::sync::Arc;

use super::{FixtureParser, FixtureSource, KindRegistry, RecordLocation};
use super::registry::EntityId;
use crate::declaration::{EntityKind, FixtureDeclaration};
use crate::error::{FixtureError, FixtureResult};

/// Entities persisted by one [`FixtureLoader::load_all`] call, in load order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
	loaded: Vec<(EntityKind, Vec<EntityId>)>,
}

impl LoadReport {
	/// Creates an empty report.
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends the ids persisted for a kind.
	pub fn push(&mut self, kind: EntityKind, ids: Vec<EntityId>) {
		self.loaded.push((kind, ids));
	}

	/// Loaded kinds with their ids, in load order.
	pub fn entries(&self) -> &[(EntityKind, Vec<EntityId>)] {
		&self.loaded
	}

	/// Ids persisted for the first occurrence of `kind`.
	pub fn ids(&self, kind: &str) -> Option<&[EntityId]> {
		self.loaded
			.iter()
			.find(|(k, _)| k.as_str() == kind)
			.map(|(_, ids)| ids.as_slice())
	}

	/// Total number of persisted records.
	pub fn total_records(&self) -> usize {
		self.loaded.iter().map(|(_, ids)| ids.len()).sum()
	}

	/// Returns true if nothing was loaded.
	pub fn is_empty(&self) -> bool {
		self.loaded.is_empty()
	}
}

/// Resolves, parses and persists datasets for `(entity kind, test unit)`
/// pairs.
///
/// Records are persisted one by one in dataset order, and kinds in
/// declaration order. Nothing is loaded concurrently.
#[derive(Clone)]
pub struct FixtureLoader {
	source: Arc<dyn FixtureSource>,
	parser: FixtureParser,
	kinds: Arc<KindRegistry>,
}

impl std::fmt::Debug for FixtureLoader {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("FixtureLoader")
			.field("kinds", &self.kinds)
			.finish_non_exhaustive()
	}
}

impl FixtureLoader {
	/// Creates a loader over a dataset source and a kind registry.
	pub fn new(source: Arc<dyn FixtureSource>, kinds: Arc<KindRegistry>) -> Self {
		Self {
			source,
			parser: FixtureParser::new(),
			kinds,
		}
	}

	/// Kind registry used by this loader.
	pub fn kinds(&self) -> &KindRegistry {
		&self.kinds
	}

	/// Loads the dataset for one kind and unit.
	///
	/// # Errors
	///
	/// - [`FixtureError::Configuration`] if no persister is registered for the
	///   kind.
	/// - [`FixtureError::NotFound`] if no dataset exists for the pair.
	/// - [`FixtureError::Format`] if the dataset or a record cannot be decoded.
	/// - [`FixtureError::Persistence`] if the store rejects a record. Records
	///   before it stay persisted in the caller's transaction scope.
	pub async fn load(&self, kind: &EntityKind, unit: &str) -> FixtureResult<Vec<EntityId>> {
		let persister = self.kinds.get(kind).ok_or_else(|| {
			FixtureError::Configuration(format!(
				"test unit `{}` declares entity kind `{}`, which has no registered persister (known kinds: {:?})",
				unit,
				kind,
				self.kinds.kinds()
			))
		})?;

		let document = self.source.resolve(kind, unit)?;
		let records = self.parser.parse(&document)?;

		tracing::debug!(
			"Loading {} record(s) of `{}` for test unit `{}` from {}",
			records.len(),
			kind,
			unit,
			document.source_id
		);

		let mut ids = Vec::with_capacity(records.len());
		for (index, record) in records.into_iter().enumerate() {
			let location = RecordLocation {
				kind: kind.clone(),
				unit: unit.to_string(),
				source_id: document.source_id.clone(),
				index,
			};
			ids.push(persister.persist(record, &location).await?);
		}

		Ok(ids)
	}

	/// Loads every kind of a declaration for `unit`, in declaration order,
	/// stopping at the first failure.
	pub async fn load_all(
		&self,
		declaration: &FixtureDeclaration,
		unit: &str,
	) -> FixtureResult<LoadReport> {
		let mut report = LoadReport::new();
		for kind in declaration.entity_kinds() {
			let ids = self.load(kind, unit).await?;
			report.push(kind.clone(), ids);
		}
		Ok(report)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::{FormatCause, StoreError};
	use crate::fixtures::{Entity, InMemorySource, Repository};
	use async_trait::async_trait;
	use parking_lot::Mutex;
	use rstest::{fixture, rstest};
	use serde::Deserialize;

	#[derive(Debug, Deserialize)]
	struct Owner {
		last_name: String,
	}

	impl Entity for Owner {
		const KIND: &'static str = "Owner";
	}

	#[derive(Debug, Deserialize)]
	struct Pet {
		name: String,
		owner: String,
	}

	impl Entity for Pet {
		const KIND: &'static str = "Pet";
	}

	/// Journal of every write, shared by both repositories.
	#[derive(Default)]
	struct Journal {
		writes: Mutex<Vec<String>>,
	}

	#[async_trait]
	impl Repository<Owner> for Journal {
		async fn create(&self, entity: Owner) -> Result<EntityId, StoreError> {
			let mut writes = self.writes.lock();
			writes.push(format!("Owner:{}", entity.last_name));
			Ok(EntityId(writes.len() as i64))
		}
	}

	#[async_trait]
	impl Repository<Pet> for Journal {
		async fn create(&self, entity: Pet) -> Result<EntityId, StoreError> {
			let mut writes = self.writes.lock();
			if !writes.iter().any(|w| *w == format!("Owner:{}", entity.owner)) {
				return Err(StoreError::Constraint(format!("owner {} does not exist", entity.owner)));
			}
			writes.push(format!("Pet:{}", entity.name));
			Ok(EntityId(writes.len() as i64))
		}
	}

	#[fixture]
	fn journal() -> Arc<Journal> {
		Arc::new(Journal::default())
	}

	fn loader(journal: &Arc<Journal>, source: InMemorySource) -> FixtureLoader {
		let kinds = KindRegistry::new()
			.with::<Owner, _>(journal.clone())
			.unwrap()
			.with::<Pet, _>(journal.clone())
			.unwrap();
		FixtureLoader::new(Arc::new(source), Arc::new(kinds))
	}

	fn clinic_source() -> InMemorySource {
		InMemorySource::new()
			.with_json(
				"Owner",
				"pet_listing",
				r#"[{"last_name": "Franklin"}, {"last_name": "Davis"}]"#,
			)
			.with_json("Pet", "pet_listing", r#"[{"name": "Leo", "owner": "Franklin"}]"#)
	}

	#[rstest]
	#[tokio::test]
	async fn test_load_persists_in_dataset_order(journal: Arc<Journal>) {
		let loader = loader(&journal, clinic_source());

		let ids = loader.load(&EntityKind::new("Owner").unwrap(), "pet_listing").await.unwrap();
		assert_eq!(ids, vec![EntityId(1), EntityId(2)]);
		assert_eq!(*journal.writes.lock(), vec!["Owner:Franklin", "Owner:Davis"]);
	}

	#[rstest]
	#[tokio::test]
	async fn test_load_all_follows_declaration_order(journal: Arc<Journal>) {
		let loader = loader(&journal, clinic_source());
		let declaration = FixtureDeclaration::new(["Owner", "Pet"]).unwrap();

		let report = loader.load_all(&declaration, "pet_listing").await.unwrap();
		assert_eq!(report.total_records(), 3);
		assert_eq!(report.ids("Pet"), Some(&[EntityId(3)][..]));
		assert_eq!(
			*journal.writes.lock(),
			vec!["Owner:Franklin", "Owner:Davis", "Pet:Leo"]
		);
	}

	#[rstest]
	#[tokio::test]
	async fn test_reversed_order_fails_on_reference(journal: Arc<Journal>) {
		let loader = loader(&journal, clinic_source());
		let declaration = FixtureDeclaration::new(["Pet", "Owner"]).unwrap();

		let result = loader.load_all(&declaration, "pet_listing").await;
		match result {
			Err(FixtureError::Persistence { kind, unit, index, cause }) => {
				assert_eq!(kind, "Pet");
				assert_eq!(unit, "pet_listing");
				assert_eq!(index, 0);
				assert!(matches!(cause, StoreError::Constraint(_)));
			}
			other => panic!("Expected persistence error, got {:?}", other),
		}
		assert!(journal.writes.lock().is_empty());
	}

	#[rstest]
	#[tokio::test]
	async fn test_missing_dataset_is_not_found(journal: Arc<Journal>) {
		let loader = loader(&journal, clinic_source());

		let result = loader.load(&EntityKind::new("Owner").unwrap(), "vet_listing").await;
		assert!(matches!(
			result,
			Err(FixtureError::NotFound { ref kind, ref unit, .. }) if kind == "Owner" && unit == "vet_listing"
		));
	}

	#[rstest]
	#[tokio::test]
	async fn test_unregistered_kind_is_configuration_error(journal: Arc<Journal>) {
		let loader = loader(&journal, clinic_source());

		let result = loader.load(&EntityKind::new("Visit").unwrap(), "pet_listing").await;
		assert!(matches!(result, Err(ref e) if e.is_configuration()));
	}

	#[rstest]
	#[tokio::test]
	async fn test_malformed_dataset_is_format_error(journal: Arc<Journal>) {
		let source = InMemorySource::new().with_json("Owner", "broken", "[{\"last_name\": ");
		let loader = loader(&journal, source);

		let result = loader.load(&EntityKind::new("Owner").unwrap(), "broken").await;
		assert!(matches!(
			result,
			Err(FixtureError::Format {
				cause: FormatCause::Json(_),
				..
			})
		));
		assert!(journal.writes.lock().is_empty());
	}

	#[rstest]
	#[tokio::test]
	async fn test_empty_declaration_loads_nothing(journal: Arc<Journal>) {
		let loader = loader(&journal, InMemorySource::new());
		let declaration = FixtureDeclaration::new(Vec::<&str>::new()).unwrap();

		let report = loader.load_all(&declaration, "anything").await.unwrap();
		assert!(report.is_empty());
		assert_eq!(report.total_records(), 0);
	}
}
