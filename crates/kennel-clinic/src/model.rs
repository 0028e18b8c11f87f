//! Clinic entities.
//!
//! Ids are optional in fixture records. When present they are inserted as
//! given, so later records can reference them.

use kennel_fixtures::Entity;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Table-backed entity that can be read back with
/// [`ClinicStore::find`](crate::ClinicStore::find).
pub trait Record: Entity + for<'r> FromRow<'r, sqlx::sqlite::SqliteRow> + Unpin {
	/// Table the entity lives in.
	const TABLE: &'static str;
}

/// A pet owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Owner {
	/// Primary key.
	#[serde(default)]
	pub id: Option<i64>,
	/// Given name.
	pub first_name: String,
	/// Family name.
	pub last_name: String,
	/// Street address.
	#[serde(default)]
	pub address: String,
	/// City.
	#[serde(default)]
	pub city: String,
	/// Phone number, digits only.
	#[serde(default)]
	pub telephone: String,
}

impl Entity for Owner {
	const KIND: &'static str = "Owner";
}

impl Record for Owner {
	const TABLE: &'static str = "owners";
}

/// A pet, always belonging to an [`Owner`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Pet {
	/// Primary key.
	#[serde(default)]
	pub id: Option<i64>,
	/// Pet name.
	pub name: String,
	/// `cat`, `dog`, `lizard` and so on.
	pub species: String,
	/// ISO-8601 birth date.
	#[serde(default)]
	pub birth_date: Option<String>,
	/// Id of the owning [`Owner`].
	pub owner_id: i64,
}

impl Entity for Pet {
	const KIND: &'static str = "Pet";
}

impl Record for Pet {
	const TABLE: &'static str = "pets";
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;

	#[rstest]
	fn test_owner_fixture_record_without_id() {
		let owner: Owner = serde_json::from_value(json!({
			"first_name": "George",
			"last_name": "Franklin",
			"city": "Madison"
		}))
		.unwrap();

		assert_eq!(owner.id, None);
		assert_eq!(owner.address, "");
		assert_eq!(owner.city, "Madison");
	}

	#[rstest]
	fn test_pet_requires_owner() {
		let result = serde_json::from_value::<Pet>(json!({"name": "Leo", "species": "cat"}));
		assert!(result.is_err());
	}
}
