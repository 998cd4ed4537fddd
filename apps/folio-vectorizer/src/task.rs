use std::time::Duration;

use folio_domain::task::{SlotVector, TaskState};
use serde_json::{Value, json};
use sqlx::PgPool;
use time::OffsetDateTime;
use tokio::sync::Mutex;

use crate::{
	Result,
	runner::{BoxFuture, EncodeError, ModelRunner},
};

/// One text waiting for its vector.
#[derive(Clone, Debug)]
pub struct TextSlot {
	pub position: u32,
	pub doc_id: String,
	pub text: String,
}

/// Persistence seam for the task state machine, so the machine itself can
/// be exercised without Postgres.
pub trait TaskStore
where
	Self: Send + Sync,
{
	fn fetch_slots<'a>(&'a self, task_id: &'a str) -> BoxFuture<'a, Result<Vec<TextSlot>>>;

	fn set_status<'a>(
		&'a self,
		task_id: &'a str,
		state: TaskState,
		detail: Value,
	) -> BoxFuture<'a, Result<()>>;

	fn store_vectors<'a>(
		&'a self,
		task_id: &'a str,
		vectors: Vec<SlotVector>,
	) -> BoxFuture<'a, Result<()>>;
}

pub struct PgTaskStore {
	pub pool: PgPool,
}
impl TaskStore for PgTaskStore {
	fn fetch_slots<'a>(&'a self, task_id: &'a str) -> BoxFuture<'a, Result<Vec<TextSlot>>> {
		Box::pin(async move {
			let rows = folio_storage::tasks::fetch_slots(&self.pool, task_id).await?;
			let slots = rows
				.into_iter()
				.map(|row| TextSlot {
					position: row.position.max(0) as u32,
					doc_id: row.doc_id,
					text: row.text,
				})
				.collect();

			Ok(slots)
		})
	}

	fn set_status<'a>(
		&'a self,
		task_id: &'a str,
		state: TaskState,
		detail: Value,
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			folio_storage::tasks::update_status(
				&self.pool,
				task_id,
				state,
				&detail,
				OffsetDateTime::now_utc(),
			)
			.await?;

			Ok(())
		})
	}

	fn store_vectors<'a>(
		&'a self,
		task_id: &'a str,
		vectors: Vec<SlotVector>,
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			folio_storage::tasks::store_vectors(&self.pool, task_id, &vectors).await?;

			Ok(())
		})
	}
}

#[derive(Clone, Copy, Debug)]
pub struct RunnerConfig {
	pub batch_size: usize,
	pub max_attempts: u32,
	pub retry_delay: Duration,
}
impl RunnerConfig {
	pub fn from_config(cfg: &folio_config::Vectorizer) -> Self {
		Self {
			batch_size: cfg.batch_size.max(1) as usize,
			max_attempts: cfg.max_attempts.max(1),
			retry_delay: Duration::from_secs(cfg.retry_delay_secs),
		}
	}
}

/// Drives one task to a terminal state. Encoder calls are serialized
/// through `gpu`; the accelerator cannot hold two batches at once.
///
/// Resource exhaustion retries the same batch after a fixed delay until
/// `max_attempts` consecutive failures, which parks the task in
/// `OutOfAttempts`. Any other encoder failure is `RuntimeError`. The
/// attempt counter resets once a batch goes through.
pub async fn run_task(
	store: &dyn TaskStore,
	runner: &dyn ModelRunner,
	gpu: &Mutex<()>,
	cfg: RunnerConfig,
	task_id: &str,
) -> Result<()> {
	let slots = store.fetch_slots(task_id).await?;
	let total = slots.len();
	let mut done = 0_usize;

	for chunk in slots.chunks(cfg.batch_size) {
		let texts: Vec<String> = chunk.iter().map(|slot| slot.text.clone()).collect();
		let mut attempt = 0_u32;
		let vectors = loop {
			let encoded = {
				let _gpu = gpu.lock().await;

				runner.encode(&texts).await
			};

			match encoded {
				Ok(vectors) => break vectors,
				Err(EncodeError::ResourceExhausted) => {
					attempt += 1;

					if attempt >= cfg.max_attempts {
						tracing::error!(task_id, attempt, "Out of encode attempts.");
						store
							.set_status(
								task_id,
								TaskState::OutOfAttempts,
								json!({ "attempts": attempt }),
							)
							.await?;

						return Ok(());
					}

					tracing::warn!(task_id, attempt, "Encoder out of resources; backing off.");
					store
						.set_status(task_id, TaskState::Retrying, json!({ "attempt": attempt }))
						.await?;
					tokio::time::sleep(cfg.retry_delay).await;
				},
				Err(EncodeError::Runtime(message)) => {
					tracing::error!(task_id, %message, "Encoder failed.");
					store.set_status(task_id, TaskState::RuntimeError, json!(message)).await?;

					return Ok(());
				},
			}
		};

		if vectors.len() != chunk.len() {
			let message =
				format!("Encoder returned {} vectors for {} texts.", vectors.len(), chunk.len());

			store.set_status(task_id, TaskState::RuntimeError, json!(message)).await?;

			return Ok(());
		}

		let slot_vectors = chunk
			.iter()
			.zip(vectors)
			.map(|(slot, vector)| SlotVector {
				position: slot.position,
				doc_id: slot.doc_id.clone(),
				vector,
			})
			.collect::<Vec<_>>();

		store.store_vectors(task_id, slot_vectors).await?;

		done += chunk.len();

		store
			.set_status(task_id, TaskState::Vectorizing, json!({ "done": done, "total": total }))
			.await?;
	}

	store.set_status(task_id, TaskState::Done, json!({ "total": total })).await?;

	Ok(())
}
