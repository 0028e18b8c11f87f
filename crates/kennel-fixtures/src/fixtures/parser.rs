//! Parsing of resolved datasets into raw records.
//!
//! A dataset is either a sequence of record objects or a single record
//! object, which is treated as a one-element sequence.

use serde_json::Value;

use super::{FixtureDocument, FixtureFormat};
use crate::error::{FixtureError, FixtureResult, FormatCause};

/// Parser for fixture datasets.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureParser;

impl FixtureParser {
	/// Creates a new fixture parser.
	pub fn new() -> Self {
		Self
	}

	/// Parses a document into its ordered records.
	///
	/// # Errors
	///
	/// Returns [`FixtureError::Format`] carrying the document's source id when
	/// the text is not valid, the top level is neither a sequence nor an
	/// object, or a record is not an object.
	pub fn parse(&self, document: &FixtureDocument) -> FixtureResult<Vec<Value>> {
		self.parse_value(document)
			.and_then(Self::into_records)
			.map_err(|cause| FixtureError::Format {
				source_id: document.source_id.clone(),
				cause,
			})
	}

	fn parse_value(&self, document: &FixtureDocument) -> Result<Value, FormatCause> {
		match document.format {
			FixtureFormat::Json => Ok(serde_json::from_str(&document.content)?),
			FixtureFormat::Yaml => self.parse_yaml(&document.content),
		}
	}

	#[cfg(feature = "yaml")]
	fn parse_yaml(&self, content: &str) -> Result<Value, FormatCause> {
		Ok(serde_yaml::from_str(content)?)
	}

	#[cfg(not(feature = "yaml"))]
	fn parse_yaml(&self, _content: &str) -> Result<Value, FormatCause> {
		Err(FormatCause::Unsupported(
			"YAML support requires the 'yaml' feature".to_string(),
		))
	}

	fn into_records(value: Value) -> Result<Vec<Value>, FormatCause> {
		let records = match value {
			Value::Array(records) => records,
			Value::Object(_) => vec![value],
			_ => {
				return Err(FormatCause::Shape(
					"expected a sequence of records or a single record object".to_string(),
				));
			}
		};

		if let Some(index) = records.iter().position(|record| !record.is_object()) {
			return Err(FormatCause::InvalidRecord {
				index,
				message: "record must be an object".to_string(),
			});
		}

		Ok(records)
	}
}
