//! Integration-test scaffolding: a throwaway Postgres database per test,
//! plus tracking and teardown of any Qdrant collections the test names.

mod error;

pub use error::{Error, Result};

use std::{collections::HashSet, env, str::FromStr, sync::Mutex, thread, time::Duration};

use qdrant_client::Qdrant;
use sqlx::{
	ConnectOptions, Connection, Executor,
	postgres::{PgConnectOptions, PgConnection},
};
use tokio::{runtime::Builder, time};
use uuid::Uuid;

const QDRANT_CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// Base DSN for integration tests. Unset means "skip".
pub fn env_dsn() -> Option<String> {
	env::var("FOLIO_PG_DSN").ok()
}

pub fn env_qdrant_url() -> Option<String> {
	env::var("FOLIO_QDRANT_URL").ok()
}

/// A freshly created database that removes itself when the test is done.
/// Prefer the explicit [`cleanup`](Self::cleanup); `Drop` only covers the
/// panic path, on a throwaway runtime.
pub struct TestDatabase {
	name: String,
	dsn: String,
	admin_options: PgConnectOptions,
	cleaned: bool,
	collections: Mutex<HashSet<String>>,
}
impl TestDatabase {
	pub async fn new(base_dsn: &str) -> Result<Self> {
		let base_options = PgConnectOptions::from_str(base_dsn)
			.map_err(|err| Error::Message(format!("Failed to parse FOLIO_PG_DSN: {err}.")))?;
		let (admin_options, mut admin) = admin_connect(&base_options).await?;
		let name = format!("folio_test_{}", Uuid::new_v4().simple());

		admin
			.execute(format!(r#"CREATE DATABASE "{name}""#).as_str())
			.await
			.map_err(|err| Error::Message(format!("Failed to create test database: {err}.")))?;

		let dsn = base_options.database(&name).to_url_lossy().to_string();

		Ok(Self { name, dsn, admin_options, cleaned: false, collections: Mutex::new(HashSet::new()) })
	}

	pub fn dsn(&self) -> &str {
		&self.dsn
	}

	/// Derives a collection name unique to this database and registers it
	/// for teardown.
	pub fn collection_name(&self, prefix: &str) -> String {
		let collection = format!("{prefix}_{}", self.name);

		self.collections.lock().unwrap_or_else(|err| err.into_inner()).insert(collection.clone());

		collection
	}

	pub async fn cleanup(mut self) -> Result<()> {
		let db_result = drop_database(&self.name, &self.admin_options).await;
		let qdrant_result = scrub_collections(&self.tracked_collections()).await;

		self.cleaned = true;

		db_result.and(qdrant_result)
	}

	fn tracked_collections(&self) -> Vec<String> {
		self.collections
			.lock()
			.unwrap_or_else(|err| err.into_inner())
			.iter()
			.cloned()
			.collect()
	}
}
impl Drop for TestDatabase {
	fn drop(&mut self) {
		if self.cleaned {
			return;
		}

		let name = self.name.clone();
		let admin_options = self.admin_options.clone();
		let collections = self.tracked_collections();
		// Drop runs inside the test's async runtime; blocking teardown
		// needs a runtime of its own on a separate thread.
		let teardown = thread::spawn(move || {
			let Ok(runtime) = Builder::new_current_thread().enable_all().build() else {
				eprintln!("Test teardown could not build a runtime; leaking {name}.");

				return;
			};

			if let Err(err) = runtime.block_on(scrub_collections(&collections)) {
				eprintln!("Test Qdrant teardown failed: {err}.");
			}
			if let Err(err) = runtime.block_on(drop_database(&name, &admin_options)) {
				eprintln!("Test database teardown failed: {err}.");
			}
		});
		let _ = teardown.join();
	}
}

// The base DSN may point at a database we are about to drop, so maintenance
// statements go through `postgres` or `template1` instead.
async fn admin_connect(
	base_options: &PgConnectOptions,
) -> Result<(PgConnectOptions, PgConnection)> {
	let mut last_err = None;

	for database in ["postgres", "template1"] {
		let options = base_options.clone().database(database);

		match PgConnection::connect_with(&options).await {
			Ok(conn) => return Ok((options, conn)),
			Err(err) => last_err = Some(err),
		}
	}

	Err(Error::Message(format!("Failed to connect to an admin database: {last_err:?}.")))
}

async fn drop_database(name: &str, admin_options: &PgConnectOptions) -> Result<()> {
	let mut conn = PgConnection::connect_with(admin_options).await.map_err(|err| {
		Error::Message(format!("Failed to connect to admin database for teardown: {err}."))
	})?;
	// Stray pool connections would otherwise block the drop.
	let _ = sqlx::query(
		"\
SELECT pg_terminate_backend(pid)
FROM pg_stat_activity
WHERE datname = $1 AND pid <> pg_backend_pid()",
	)
	.bind(name)
	.fetch_all(&mut conn)
	.await;

	sqlx::query(format!(r#"DROP DATABASE IF EXISTS "{name}""#).as_str())
		.execute(&mut conn)
		.await
		.map_err(|err| Error::Message(format!("Failed to drop test database: {err}.")))?;

	Ok(())
}

/// Deletes the tracked collections, retrying while Qdrant finishes any
/// in-flight writes against them.
async fn scrub_collections(collections: &[String]) -> Result<()> {
	if collections.is_empty() {
		return Ok(());
	}

	let Some(qdrant_url) = env_qdrant_url() else {
		eprintln!("Skipping Qdrant teardown; set FOLIO_QDRANT_URL to delete test collections.");

		return Ok(());
	};
	let client = Qdrant::from_url(&qdrant_url)
		.build()
		.map_err(|err| Error::Message(format!("Failed to build Qdrant client: {err}.")))?;
	let mut remaining = collections.iter().cloned().collect::<HashSet<_>>();
	let mut backoff = Duration::from_millis(100);
	let max_attempts = 6;

	for attempt in 1..=max_attempts {
		let listed = time::timeout(QDRANT_CALL_TIMEOUT, client.list_collections())
			.await
			.map_err(|_| Error::Message("Qdrant list_collections timed out.".to_string()))?
			.map_err(|err| Error::Message(format!("Failed to list Qdrant collections: {err}.")))?
			.collections
			.into_iter()
			.map(|collection| collection.name)
			.collect::<HashSet<_>>();

		remaining.retain(|collection| listed.contains(collection));

		if remaining.is_empty() {
			return Ok(());
		}

		for collection in remaining.iter().cloned().collect::<Vec<_>>() {
			match time::timeout(QDRANT_CALL_TIMEOUT, client.delete_collection(collection.clone()))
				.await
			{
				Ok(Ok(_)) => {},
				Ok(Err(err)) if attempt == max_attempts =>
					return Err(Error::Message(format!(
						"Failed to delete Qdrant collection {collection:?} after {attempt} attempts: {err}."
					))),
				Err(_) if attempt == max_attempts =>
					return Err(Error::Message(format!(
						"Timed out deleting Qdrant collection {collection:?} after {attempt} attempts."
					))),
				_ => {},
			}
		}

		time::sleep(backoff).await;

		backoff = backoff.saturating_mul(2).min(Duration::from_secs(2));
	}

	Ok(())
}
