//! Clinic table definitions.

/// Statements creating the clinic tables, in dependency order.
pub const SCHEMA: &[&str] = &[
	"CREATE TABLE IF NOT EXISTS owners (
		id INTEGER PRIMARY KEY AUTOINCREMENT,
		first_name TEXT NOT NULL,
		last_name TEXT NOT NULL,
		address TEXT NOT NULL DEFAULT '',
		city TEXT NOT NULL DEFAULT '',
		telephone TEXT NOT NULL DEFAULT ''
	)",
	"CREATE TABLE IF NOT EXISTS pets (
		id INTEGER PRIMARY KEY AUTOINCREMENT,
		name TEXT NOT NULL,
		species TEXT NOT NULL,
		birth_date TEXT,
		owner_id INTEGER NOT NULL REFERENCES owners (id)
	)",
	"CREATE INDEX IF NOT EXISTS idx_pets_owner_id ON pets (owner_id)",
];
