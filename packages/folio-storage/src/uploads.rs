use serde_json::Value;
use sqlx::{PgExecutor, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
	Result,
	models::{UploadRow, UploadStatusRow},
};

pub async fn create<'e, E>(
	executor: E,
	file_id: Uuid,
	filename: &str,
	status: &str,
	now: OffsetDateTime,
) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query(
		"\
INSERT INTO uploads (file_id, filename, date_uploaded, status, detail, status_at)
VALUES ($1, $2, $3, $4, 'null'::jsonb, $3)",
	)
	.bind(file_id)
	.bind(filename)
	.bind(now)
	.bind(status)
	.execute(executor)
	.await?;

	Ok(())
}

/// Advances the upload's status, archiving the previous status into the
/// history in the same transaction.
pub async fn update_status(
	pool: &PgPool,
	file_id: Uuid,
	status: &str,
	detail: &Value,
	now: OffsetDateTime,
) -> Result<()> {
	let mut tx = pool.begin().await?;

	sqlx::query(
		"\
INSERT INTO upload_status_history (file_id, status, detail, at)
SELECT file_id, status, detail, status_at
FROM uploads
WHERE file_id = $1",
	)
	.bind(file_id)
	.execute(&mut *tx)
	.await?;
	sqlx::query(
		"\
UPDATE uploads
SET status = $1, detail = $2, status_at = $3
WHERE file_id = $4",
	)
	.bind(status)
	.bind(detail)
	.bind(now)
	.bind(file_id)
	.execute(&mut *tx)
	.await?;

	tx.commit().await?;

	Ok(())
}

pub async fn get<'e, E>(executor: E, file_id: Uuid) -> Result<Option<UploadRow>>
where
	E: PgExecutor<'e>,
{
	let row = sqlx::query_as::<_, UploadRow>(
		"\
SELECT file_id, filename, date_uploaded, status, detail, status_at
FROM uploads
WHERE file_id = $1
LIMIT 1",
	)
	.bind(file_id)
	.fetch_optional(executor)
	.await?;

	Ok(row)
}

pub async fn history<'e, E>(executor: E, file_id: Uuid) -> Result<Vec<UploadStatusRow>>
where
	E: PgExecutor<'e>,
{
	let rows = sqlx::query_as::<_, UploadStatusRow>(
		"\
SELECT status, detail, at
FROM upload_status_history
WHERE file_id = $1
ORDER BY history_id",
	)
	.bind(file_id)
	.fetch_all(executor)
	.await?;

	Ok(rows)
}

pub async fn list_recent<'e, E>(executor: E, limit: i64) -> Result<Vec<UploadRow>>
where
	E: PgExecutor<'e>,
{
	let rows = sqlx::query_as::<_, UploadRow>(
		"\
SELECT file_id, filename, date_uploaded, status, detail, status_at
FROM uploads
ORDER BY date_uploaded DESC
LIMIT $1",
	)
	.bind(limit)
	.fetch_all(executor)
	.await?;

	Ok(rows)
}
