//! Dataset formats and resolved documents.

use std::fmt;
use std::path::Path;

/// Supported dataset formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum FixtureFormat {
	/// JSON format (default).
	#[default]
	Json,

	/// YAML format (requires `yaml` feature).
	Yaml,
}

impl FixtureFormat {
	/// Determines the format from a file extension.
	///
	/// ```
	/// # use kennel_fixtures::fixtures::FixtureFormat;
	/// assert_eq!(FixtureFormat::from_extension("json"), Some(FixtureFormat::Json));
	/// assert_eq!(FixtureFormat::from_extension("yml"), Some(FixtureFormat::Yaml));
	/// assert_eq!(FixtureFormat::from_extension("csv"), None);
	/// ```
	pub fn from_extension(ext: &str) -> Option<Self> {
		match ext.to_lowercase().as_str() {
			"json" => Some(Self::Json),
			"yaml" | "yml" => Some(Self::Yaml),
			_ => None,
		}
	}

	/// Determines the format from a file path.
	pub fn from_path(path: &Path) -> Option<Self> {
		path.extension()
			.and_then(|ext| ext.to_str())
			.and_then(Self::from_extension)
	}

	/// Extensions a directory source probes for this format, in order.
	pub fn extensions(&self) -> &'static [&'static str] {
		match self {
			Self::Json => &["json"],
			Self::Yaml => &["yaml", "yml"],
		}
	}

	/// Formats compiled into this build, in probing order.
	pub fn enabled() -> &'static [FixtureFormat] {
		#[cfg(feature = "yaml")]
		{
			&[Self::Json, Self::Yaml]
		}
		#[cfg(not(feature = "yaml"))]
		{
			&[Self::Json]
		}
	}
}

impl fmt::Display for FixtureFormat {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Json => write!(f, "JSON"),
			Self::Yaml => write!(f, "YAML"),
		}
	}
}

/// Raw dataset text resolved for an `(entity kind, test unit)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureDocument {
	/// Identifier used in diagnostics (a path or a map key).
	pub source_id: String,
	/// Format of `content`.
	pub format: FixtureFormat,
	/// Unparsed dataset text.
	pub content: String,
}

impl FixtureDocument {
	/// Creates a document.
	pub fn new(source_id: impl Into<String>, format: FixtureFormat, content: impl Into<String>) -> Self {
		Self {
			source_id: source_id.into(),
			format,
			content: content.into(),
		}
	}

	/// Creates a JSON document.
	pub fn json(source_id: impl Into<String>, content: impl Into<String>) -> Self {
		Self::new(source_id, FixtureFormat::Json, content)
	}
}
