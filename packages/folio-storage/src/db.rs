use sqlx::{PgPool, postgres::PgPoolOptions};

use crate::{Result, schema, search::SearchBackend};

#[derive(Clone)]
pub struct Db {
	pub pool: PgPool,
}
impl Db {
	pub async fn connect(cfg: &folio_config::Postgres) -> Result<Self> {
		let pool =
			PgPoolOptions::new().max_connections(cfg.pool_max_conns).connect(&cfg.dsn).await?;

		Ok(Self { pool })
	}

	pub async fn ensure_schema(&self) -> Result<()> {
		let sql = schema::render_schema();
		let lock_id: i64 = 6_061_114;
		// Advisory locks are held per connection. Use a single transaction so
		// the lock is scoped to one connection and automatically released
		// when the transaction ends.
		let mut tx = self.pool.begin().await?;

		sqlx::query("SELECT pg_advisory_xact_lock($1)").bind(lock_id).execute(&mut *tx).await?;

		for statement in sql.split(';') {
			let trimmed = statement.trim();

			if trimmed.is_empty() {
				continue;
			}

			sqlx::query(trimmed).execute(&mut *tx).await?;
		}

		tx.commit().await?;

		Ok(())
	}

	/// Wipes every table. Destructive; only the operator CLI reaches this.
	pub async fn reset(&self) -> Result<()> {
		sqlx::query(
			"\
TRUNCATE entries, source_records, autocomplete_entries, registered_queries, \
uploads, upload_status_history, vector_tasks, vector_task_history, vector_slots",
		)
		.execute(&self.pool)
		.await?;

		Ok(())
	}

	/// Resolves the full-text strategy once at startup. "auto" probes the
	/// deployment for the managed ranked-search index, which only a hosted
	/// search-capable deployment provisions; everything else runs against
	/// the local tsvector index.
	pub async fn detect_search_backend(&self, configured: &str) -> Result<SearchBackend> {
		match configured {
			"local" => return Ok(SearchBackend::Local),
			"managed" => return Ok(SearchBackend::Managed),
			_ => {},
		}

		let managed: Option<bool> =
			sqlx::query_scalar("SELECT to_regclass('entries_managed_search_idx') IS NOT NULL")
				.fetch_optional(&self.pool)
				.await?;

		if managed.unwrap_or(false) {
			tracing::info!("Detected managed search deployment.");

			Ok(SearchBackend::Managed)
		} else {
			tracing::info!("Using local full-text index.");

			Ok(SearchBackend::Local)
		}
	}
}
