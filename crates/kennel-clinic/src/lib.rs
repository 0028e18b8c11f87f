//! Pet clinic entities and a transactional SQLite store.
//!
//! This crate is the persistence collaborator for `kennel-fixtures`: it
//! implements [`Repository`](kennel_fixtures::Repository) for [`Owner`] and
//! [`Pet`], exposes `find`/`find_all` for test assertions, and reports whether
//! a test runs inside a rolled-back transaction.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use kennel_clinic::{ClinicDatabase, Owner};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = ClinicDatabase::in_memory().await?;
//! let store = Arc::new(db.begin_test_transaction().await?);
//! let kinds = store.fixture_kinds()?;
//! assert_eq!(kinds.len(), 2);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod model;
pub mod schema;
pub mod store;

pub use error::{ClinicError, ClinicResult};
pub use model::{Owner, Pet, Record};
pub use store::{ClinicDatabase, ClinicStore};
