//! Dataset resolution for `(entity kind, test unit)` pairs.
//!
//! Resolution is deterministic and derived from the two names only: a
//! [`DirectorySource`] looks for `{kind}-{unit}.json` (and, with the `yaml`
//! feature, `.yaml`/`.yml`) inside its root directory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;

use super::{FixtureDocument, FixtureFormat};
use crate::declaration::EntityKind;
use crate::error::{FixtureError, FixtureResult, FormatCause};
use crate::settings::FixtureSettings;

/// Locates the dataset for an entity kind and test unit.
pub trait FixtureSource: Send + Sync {
	/// Resolves the dataset.
	///
	/// # Errors
	///
	/// Returns [`FixtureError::NotFound`] naming the pair when no dataset
	/// exists.
	fn resolve(&self, kind: &EntityKind, unit: &str) -> FixtureResult<FixtureDocument>;
}

/// File name stem shared by every format: `{kind}-{unit}`.
pub fn dataset_stem(kind: &EntityKind, unit: &str) -> String {
	format!("{}-{}", kind, unit)
}

/// Reads datasets from files in a directory.
#[derive(Debug, Clone)]
pub struct DirectorySource {
	root: PathBuf,
}

impl DirectorySource {
	/// Creates a source rooted at `root`.
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self { root: root.into() }
	}

	/// Creates a source rooted at the configured fixtures directory.
	pub fn from_settings(settings: &FixtureSettings) -> Self {
		Self::new(settings.fixtures_dir.clone())
	}

	/// Root directory.
	pub fn root(&self) -> &Path {
		&self.root
	}

	/// Candidate paths, in probing order.
	pub fn candidates(&self, kind: &EntityKind, unit: &str) -> Vec<(PathBuf, FixtureFormat)> {
		let stem = dataset_stem(kind, unit);
		let stem = stem.as_str();
		FixtureFormat::enabled()
			.iter()
			.flat_map(|format| {
				format
					.extensions()
					.iter()
					.map(move |ext| (self.root.join(format!("{}.{}", stem, ext)), *format))
			})
			.collect()
	}
}

impl FixtureSource for DirectorySource {
	fn resolve(&self, kind: &EntityKind, unit: &str) -> FixtureResult<FixtureDocument> {
		let candidates = self.candidates(kind, unit);
		for (path, format) in &candidates {
			let format = *format;
			match std::fs::read_to_string(path) {
				Ok(content) => {
					return Ok(FixtureDocument::new(path.display().to_string(), format, content));
				}
				Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
				Err(e) => {
					return Err(FixtureError::Format {
						source_id: path.display().to_string(),
						cause: FormatCause::Io(e),
					});
				}
			}
		}

		Err(FixtureError::NotFound {
			kind: kind.to_string(),
			unit: unit.to_string(),
			expected: candidates
				.iter()
				.map(|(path, _)| path.display().to_string())
				.collect::<Vec<_>>()
				.join(", "),
		})
	}
}

/// Datasets held in memory, keyed by `(kind, unit)`.
#[derive(Debug, Default)]
pub struct InMemorySource {
	documents: RwLock<HashMap<(String, String), (FixtureFormat, String)>>,
}

impl InMemorySource {
	/// Creates an empty source.
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds (or replaces) a dataset.
	pub fn insert(&self, kind: &str, unit: &str, format: FixtureFormat, content: impl Into<String>) {
		self.documents
			.write()
			.insert((kind.to_string(), unit.to_string()), (format, content.into()));
	}

	/// Adds a JSON dataset, builder style.
	pub fn with_json(self, kind: &str, unit: &str, content: impl Into<String>) -> Self {
		self.insert(kind, unit, FixtureFormat::Json, content);
		self
	}

	/// Returns the number of datasets.
	pub fn len(&self) -> usize {
		self.documents.read().len()
	}

	/// Returns true if the source holds no datasets.
	pub fn is_empty(&self) -> bool {
		self.documents.read().is_empty()
	}
}

impl FixtureSource for InMemorySource {
	fn resolve(&self, kind: &EntityKind, unit: &str) -> FixtureResult<FixtureDocument> {
		let key = (kind.to_string(), unit.to_string());
		let source_id = format!("memory:{}", dataset_stem(kind, unit));
		match self.documents.read().get(&key) {
			Some((format, content)) => Ok(FixtureDocument::new(source_id, *format, content.clone())),
			None => Err(FixtureError::NotFound {
				kind: key.0,
				unit: key.1,
				expected: source_id,
			}),
		}
	}
}
