//! SQLite-backed clinic store.
//!
//! A [`ClinicDatabase`] owns an in-memory SQLite pool holding a single
//! connection. Each test opens a [`ClinicStore`] on it: either a rolled-back
//! transaction scope, which gives the test rollback isolation, or an
//! autocommit scope, which does not.
//!
//! ```rust,no_run
//! use kennel_clinic::{ClinicDatabase, Owner};
//!
//! # async fn example() -> kennel_clinic::ClinicResult<()> {
//! let db = ClinicDatabase::in_memory().await?;
//! let store = db.begin_test_transaction().await?;
//! assert!(store.is_rollback_isolated());
//!
//! let owners = store.find_all::<Owner>().await?;
//! assert!(owners.is_empty());
//! // Everything written through `store` is rolled back when it is dropped.
//! # Ok(())
//! # }
//! ```

use std::ops::{Deref, DerefMut};
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use kennel_fixtures::{EntityId, FixtureResult, KindRegistry, Repository, StoreError};
use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{Sqlite, SqliteConnection, Transaction};
use tokio::sync::{MappedMutexGuard, Mutex, MutexGuard};

use crate::error::{ClinicError, ClinicResult};
use crate::model::{Owner, Pet, Record};
use crate::schema::SCHEMA;

/// Database holding the clinic tables.
#[derive(Debug, Clone)]
pub struct ClinicDatabase {
	pool: SqlitePool,
}

impl ClinicDatabase {
	/// Opens a private in-memory database and creates the clinic tables.
	///
	/// The pool keeps exactly one connection open for its whole lifetime, since
	/// an in-memory database disappears with its last connection.
	pub async fn in_memory() -> ClinicResult<Self> {
		let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
		let pool = SqlitePoolOptions::new()
			.min_connections(1)
			.max_connections(1)
			.idle_timeout(None)
			.max_lifetime(None)
			.connect_with(options)
			.await?;

		let db = Self { pool };
		db.migrate().await?;
		Ok(db)
	}

	/// Wraps an existing pool. The clinic tables must already exist, or be
	/// created with [`migrate`](Self::migrate).
	pub fn from_pool(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Creates the clinic tables if they do not exist.
	pub async fn migrate(&self) -> ClinicResult<()> {
		for statement in SCHEMA {
			sqlx::query(statement).execute(&self.pool).await?;
		}
		Ok(())
	}

	/// Underlying pool.
	pub fn pool(&self) -> &SqlitePool {
		&self.pool
	}

	/// Opens a store whose writes are rolled back when it is dropped.
	pub async fn begin_test_transaction(&self) -> ClinicResult<ClinicStore> {
		let tx = self.pool.begin().await?;
		tracing::debug!("Began rollback-isolated clinic transaction");
		Ok(ClinicStore::new(Scope::Transaction(tx)))
	}

	/// Opens a store whose writes are committed immediately.
	pub fn autocommit(&self) -> ClinicStore {
		ClinicStore::new(Scope::Autocommit(self.pool.clone()))
	}
}

#[derive(Debug)]
enum Scope {
	Transaction(Transaction<'static, Sqlite>),
	Autocommit(SqlitePool),
	Closed,
}

enum ScopedConnection<'a> {
	Transaction(MappedMutexGuard<'a, SqliteConnection>),
	Pooled(PoolConnection<Sqlite>),
}

impl Deref for ScopedConnection<'_> {
	type Target = SqliteConnection;

	fn deref(&self) -> &Self::Target {
		match self {
			Self::Transaction(conn) => &**conn,
			Self::Pooled(conn) => &**conn,
		}
	}
}

impl DerefMut for ScopedConnection<'_> {
	fn deref_mut(&mut self) -> &mut Self::Target {
		match self {
			Self::Transaction(conn) => &mut **conn,
			Self::Pooled(conn) => &mut **conn,
		}
	}
}

/// Clinic repository bound to one transaction scope.
///
/// Dropping a transactional store rolls back everything written through it.
#[derive(Debug)]
pub struct ClinicStore {
	scope: Mutex<Scope>,
	isolated: bool,
}

impl ClinicStore {
	fn new(scope: Scope) -> Self {
		let isolated = matches!(scope, Scope::Transaction(_));
		Self {
			scope: Mutex::new(scope),
			isolated,
		}
	}

	/// Whether writes through this store are rolled back at the end of the
	/// test.
	pub fn is_rollback_isolated(&self) -> bool {
		self.isolated
	}

	/// Persister registry for the clinic entity kinds, backed by this store.
	pub fn fixture_kinds(self: &Arc<Self>) -> FixtureResult<KindRegistry> {
		KindRegistry::new()
			.with::<Owner, _>(Arc::clone(self))?
			.with::<Pet, _>(Arc::clone(self))
	}

	async fn acquire(&self) -> ClinicResult<ScopedConnection<'_>> {
		let scope = self.scope.lock().await;
		let pool = match &*scope {
			Scope::Transaction(_) => None,
			Scope::Autocommit(pool) => Some(pool.clone()),
			Scope::Closed => return Err(ClinicError::Closed),
		};

		match pool {
			Some(pool) => {
				drop(scope);
				Ok(ScopedConnection::Pooled(pool.acquire().await?))
			}
			None => MutexGuard::try_map(scope, |scope| match scope {
				Scope::Transaction(tx) => Some(&mut **tx),
				_ => None,
			})
			.map(ScopedConnection::Transaction)
			.map_err(|_| ClinicError::Closed),
		}
	}

	/// Rolls back the transaction now. A no-op for autocommit stores.
	pub async fn rollback(&self) -> ClinicResult<()> {
		let mut scope = self.scope.lock().await;
		if let Scope::Transaction(tx) = std::mem::replace(&mut *scope, Scope::Closed) {
			tx.rollback().await?;
			tracing::debug!("Rolled back clinic transaction");
		}
		Ok(())
	}

	/// Commits the transaction, defeating rollback isolation. A no-op for
	/// autocommit stores.
	pub async fn commit(&self) -> ClinicResult<()> {
		let mut scope = self.scope.lock().await;
		if let Scope::Transaction(tx) = std::mem::replace(&mut *scope, Scope::Closed) {
			tx.commit().await?;
			tracing::debug!("Committed clinic transaction");
		}
		Ok(())
	}

	/// Inserts an owner and returns its id.
	pub async fn create_owner(&self, owner: &Owner) -> ClinicResult<i64> {
		let mut conn = self.acquire().await?;
		let result = sqlx::query(
			"INSERT INTO owners (id, first_name, last_name, address, city, telephone)
			 VALUES (?, ?, ?, ?, ?, ?)",
		)
		.bind(owner.id)
		.bind(&owner.first_name)
		.bind(&owner.last_name)
		.bind(&owner.address)
		.bind(&owner.city)
		.bind(&owner.telephone)
		.execute(&mut *conn)
		.await?;
		Ok(result.last_insert_rowid())
	}

	/// Inserts a pet and returns its id. The owner must already exist.
	pub async fn create_pet(&self, pet: &Pet) -> ClinicResult<i64> {
		let mut conn = self.acquire().await?;
		let result = sqlx::query(
			"INSERT INTO pets (id, name, species, birth_date, owner_id) VALUES (?, ?, ?, ?, ?)",
		)
		.bind(pet.id)
		.bind(&pet.name)
		.bind(&pet.species)
		.bind(&pet.birth_date)
		.bind(pet.owner_id)
		.execute(&mut *conn)
		.await?;
		Ok(result.last_insert_rowid())
	}

	/// Finds a row by id.
	pub async fn find<R: Record>(&self, id: i64) -> ClinicResult<Option<R>> {
		let mut conn = self.acquire().await?;
		let sql = format!("SELECT * FROM {} WHERE id = ?", R::TABLE);
		let row = sqlx::query_as::<_, R>(&sql)
			.bind(id)
			.fetch_optional(&mut *conn)
			.await?;
		Ok(row)
	}

	/// Returns every row, ordered by id.
	pub async fn find_all<R: Record>(&self) -> ClinicResult<Vec<R>> {
		let mut conn = self.acquire().await?;
		let sql = format!("SELECT * FROM {} ORDER BY id", R::TABLE);
		let rows = sqlx::query_as::<_, R>(&sql).fetch_all(&mut *conn).await?;
		Ok(rows)
	}

	/// Returns the pets of one owner, ordered by id.
	pub async fn find_pets_by_owner(&self, owner_id: i64) -> ClinicResult<Vec<Pet>> {
		let mut conn = self.acquire().await?;
		let rows = sqlx::query_as::<_, Pet>("SELECT * FROM pets WHERE owner_id = ? ORDER BY id")
			.bind(owner_id)
			.fetch_all(&mut *conn)
			.await?;
		Ok(rows)
	}
}

#[async_trait]
impl Repository<Owner> for ClinicStore {
	async fn create(&self, entity: Owner) -> Result<EntityId, StoreError> {
		Ok(EntityId(self.create_owner(&entity).await?))
	}
}

#[async_trait]
impl Repository<Pet> for ClinicStore {
	async fn create(&self, entity: Pet) -> Result<EntityId, StoreError> {
		Ok(EntityId(self.create_pet(&entity).await?))
	}
}
