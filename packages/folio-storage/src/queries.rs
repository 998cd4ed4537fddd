use serde_json::Value;
use sqlx::PgExecutor;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Result, models::RegisteredQueryRow};

/// Registers a query for a session. Registration is idempotent on the
/// params value: re-submitting the same params returns the existing query
/// id with a refreshed access stamp.
pub async fn register<'e, E>(
	executor: E,
	query_id: Uuid,
	session_id: Uuid,
	params: &Value,
	now: OffsetDateTime,
) -> Result<Uuid>
where
	E: PgExecutor<'e>,
{
	let query_id: Uuid = sqlx::query_scalar(
		"\
INSERT INTO registered_queries (query_id, session_id, params, created_at, last_accessed)
VALUES ($1, $2, $3, $4, $4)
ON CONFLICT (session_id, params) DO UPDATE SET last_accessed = EXCLUDED.last_accessed
RETURNING query_id",
	)
	.bind(query_id)
	.bind(session_id)
	.bind(params)
	.bind(now)
	.fetch_one(executor)
	.await?;

	Ok(query_id)
}

pub async fn get<'e, E>(executor: E, query_id: Uuid) -> Result<Option<RegisteredQueryRow>>
where
	E: PgExecutor<'e>,
{
	let row = sqlx::query_as::<_, RegisteredQueryRow>(
		"\
SELECT query_id, session_id, params, created_at, last_accessed, n_hits
FROM registered_queries
WHERE query_id = $1
LIMIT 1",
	)
	.bind(query_id)
	.fetch_optional(executor)
	.await?;

	Ok(row)
}

pub async fn touch<'e, E>(executor: E, query_id: Uuid, now: OffsetDateTime) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query("UPDATE registered_queries SET last_accessed = $1 WHERE query_id = $2")
		.bind(now)
		.bind(query_id)
		.execute(executor)
		.await?;

	Ok(())
}

/// Records the hit count observed the last time the query ran, for display
/// in the session's query history.
pub async fn set_hits<'e, E>(executor: E, query_id: Uuid, n_hits: i64) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query("UPDATE registered_queries SET n_hits = $1 WHERE query_id = $2")
		.bind(n_hits)
		.bind(query_id)
		.execute(executor)
		.await?;

	Ok(())
}

pub async fn session_history<'e, E>(
	executor: E,
	session_id: Uuid,
) -> Result<Vec<RegisteredQueryRow>>
where
	E: PgExecutor<'e>,
{
	let rows = sqlx::query_as::<_, RegisteredQueryRow>(
		"\
SELECT query_id, session_id, params, created_at, last_accessed, n_hits
FROM registered_queries
WHERE session_id = $1
ORDER BY created_at DESC",
	)
	.bind(session_id)
	.fetch_all(executor)
	.await?;

	Ok(rows)
}
