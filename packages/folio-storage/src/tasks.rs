use folio_domain::task::{SlotVector, StatusStamp, TaskSnapshot, TaskState};
use serde_json::Value;
use sqlx::{PgExecutor, PgPool};
use time::OffsetDateTime;

use crate::{
	Error, Result,
	models::{SlotRow, TaskHistoryRow, TaskRow},
};

/// Creates a task with its text slots in one transaction. A duplicate task
/// id is a [`Error::Conflict`]; callers surface it as a client error
/// instead of re-running the batch.
pub async fn create_task(
	pool: &PgPool,
	task_id: &str,
	texts: &[String],
	doc_ids: &[String],
	now: OffsetDateTime,
) -> Result<()> {
	if texts.len() != doc_ids.len() {
		return Err(Error::InvalidArgument(format!(
			"Texts and doc ids differ in length: {} vs {}.",
			texts.len(),
			doc_ids.len()
		)));
	}

	let mut tx = pool.begin().await?;
	let created = sqlx::query(
		"\
INSERT INTO vector_tasks (task_id, created_at, status, detail, status_at)
VALUES ($1, $2, $3, 'null'::jsonb, $2)",
	)
	.bind(task_id)
	.bind(now)
	.bind(TaskState::Vectorizing.as_str())
	.execute(&mut *tx)
	.await;

	if let Err(err) = created {
		let err = Error::from(err);

		if err.is_unique_violation() {
			return Err(Error::Conflict(format!("Task {task_id:?} already exists.")));
		}

		return Err(err);
	}

	let positions: Vec<i32> = (0..texts.len() as i32).collect();

	sqlx::query(
		"\
INSERT INTO vector_slots (task_id, position, doc_id, text)
SELECT $1, * FROM UNNEST($2::int[], $3::text[], $4::text[])",
	)
	.bind(task_id)
	.bind(&positions)
	.bind(doc_ids)
	.bind(texts)
	.execute(&mut *tx)
	.await?;

	tx.commit().await?;

	Ok(())
}

pub async fn get_task(pool: &PgPool, task_id: &str) -> Result<Option<TaskSnapshot>> {
	let Some(row) = sqlx::query_as::<_, TaskRow>(
		"\
SELECT task_id, created_at, status, detail, status_at
FROM vector_tasks
WHERE task_id = $1
LIMIT 1",
	)
	.bind(task_id)
	.fetch_optional(pool)
	.await?
	else {
		return Ok(None);
	};
	let history_rows = sqlx::query_as::<_, TaskHistoryRow>(
		"\
SELECT status, detail, at
FROM vector_task_history
WHERE task_id = $1
ORDER BY history_id",
	)
	.bind(task_id)
	.fetch_all(pool)
	.await?;
	let history =
		history_rows.into_iter().map(|row| stamp(&row.status, row.detail, row.at)).collect::<Result<Vec<_>>>()?;
	let current_status = stamp(&row.status, row.detail, row.status_at)?;

	Ok(Some(TaskSnapshot { task_id: row.task_id, created_at: row.created_at, current_status, history }))
}

/// Advances the task's status, archiving the previous status into the
/// history in the same transaction.
pub async fn update_status(
	pool: &PgPool,
	task_id: &str,
	state: TaskState,
	detail: &Value,
	now: OffsetDateTime,
) -> Result<()> {
	let mut tx = pool.begin().await?;

	sqlx::query(
		"\
INSERT INTO vector_task_history (task_id, status, detail, at)
SELECT task_id, status, detail, status_at
FROM vector_tasks
WHERE task_id = $1",
	)
	.bind(task_id)
	.execute(&mut *tx)
	.await?;

	let updated = sqlx::query(
		"\
UPDATE vector_tasks
SET status = $1, detail = $2, status_at = $3
WHERE task_id = $4",
	)
	.bind(state.as_str())
	.bind(detail)
	.bind(now)
	.bind(task_id)
	.execute(&mut *tx)
	.await?;

	if updated.rows_affected() == 0 {
		return Err(Error::NotFound(format!("Task {task_id:?} does not exist.")));
	}

	tx.commit().await?;

	Ok(())
}

pub async fn fetch_slots<'e, E>(executor: E, task_id: &str) -> Result<Vec<SlotRow>>
where
	E: PgExecutor<'e>,
{
	let rows = sqlx::query_as::<_, SlotRow>(
		"\
SELECT position, doc_id, text, vec
FROM vector_slots
WHERE task_id = $1
ORDER BY position",
	)
	.bind(task_id)
	.fetch_all(executor)
	.await?;

	Ok(rows)
}

pub async fn store_vectors<'e, E>(executor: E, task_id: &str, vectors: &[SlotVector]) -> Result<()>
where
	E: PgExecutor<'e>,
{
	if vectors.is_empty() {
		return Ok(());
	}

	let positions: Vec<i32> = vectors.iter().map(|slot| slot.position as i32).collect();
	let vecs: Vec<String> = vectors
		.iter()
		.map(|slot| {
			let joined =
				slot.vector.iter().map(f32::to_string).collect::<Vec<_>>().join(",");

			format!("{{{joined}}}")
		})
		.collect();

	sqlx::query(
		"\
UPDATE vector_slots
SET vec = batch.vec::real[]
FROM (SELECT * FROM UNNEST($2::int[], $3::text[])) AS batch (position, vec)
WHERE vector_slots.task_id = $1 AND vector_slots.position = batch.position",
	)
	.bind(task_id)
	.bind(&positions)
	.bind(&vecs)
	.execute(executor)
	.await?;

	Ok(())
}

/// Completed vectors in submission order. Slots the encoder has not filled
/// yet are skipped.
pub async fn fetch_vectors<'e, E>(executor: E, task_id: &str) -> Result<Vec<SlotVector>>
where
	E: PgExecutor<'e>,
{
	let rows = sqlx::query_as::<_, SlotRow>(
		"\
SELECT position, doc_id, text, vec
FROM vector_slots
WHERE task_id = $1 AND vec IS NOT NULL
ORDER BY position",
	)
	.bind(task_id)
	.fetch_all(executor)
	.await?;
	let vectors = rows
		.into_iter()
		.filter_map(|row| {
			let vector = row.vec?;

			Some(SlotVector { position: row.position.max(0) as u32, doc_id: row.doc_id, vector })
		})
		.collect();

	Ok(vectors)
}

fn stamp(status: &str, detail: Value, at: OffsetDateTime) -> Result<StatusStamp> {
	let state = TaskState::parse(status)
		.ok_or_else(|| Error::InvalidArgument(format!("Unknown task state {status:?}.")))?;

	Ok(StatusStamp::new(state, at, detail))
}
