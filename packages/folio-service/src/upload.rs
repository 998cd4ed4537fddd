use std::sync::Arc;

use folio_client::VectorizeOutcome;
use folio_domain::{ris, task::SubmitRequest};
use folio_storage::uploads;
use serde_json::{Value, json};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Error, FolioService, Result};

/// Stages an upload moves through. `Vectorizing` can be the last recorded
/// status when polling gave up; the remote task may still finish.
#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
	Received,
	Parsing,
	Ingesting,
	Vectorizing,
	Indexed,
	/// Terminal state of an upload that inserted nothing: every record was
	/// dropped or already known.
	Empty,
	Failed,
}
impl UploadStatus {
	pub const ALL: [Self; 7] = [
		Self::Received,
		Self::Parsing,
		Self::Ingesting,
		Self::Vectorizing,
		Self::Indexed,
		Self::Empty,
		Self::Failed,
	];

	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Received => "received",
			Self::Parsing => "parsing",
			Self::Ingesting => "ingesting",
			Self::Vectorizing => "vectorizing",
			Self::Indexed => "indexed",
			Self::Empty => "empty",
			Self::Failed => "failed",
		}
	}

	pub fn parse(tag: &str) -> Option<Self> {
		Self::ALL.iter().copied().find(|status| status.as_str() == tag)
	}
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct UploadStatusStamp {
	pub status: UploadStatus,
	pub detail: Value,
	#[serde(with = "time::serde::rfc3339")]
	pub at: OffsetDateTime,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct UploadListItem {
	pub file_id: Uuid,
	pub filename: String,
	#[serde(with = "time::serde::rfc3339")]
	pub date_uploaded: OffsetDateTime,
	pub current: UploadStatusStamp,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct UploadStatusReport {
	pub file_id: Uuid,
	pub filename: String,
	#[serde(with = "time::serde::rfc3339")]
	pub date_uploaded: OffsetDateTime,
	pub current: UploadStatusStamp,
	pub history: Vec<UploadStatusStamp>,
}

impl FolioService {
	/// Accepts an upload and kicks off the parse/ingest/vectorize pipeline
	/// in the background. Returns immediately with the id callers poll
	/// [`FolioService::upload_status`] with.
	pub async fn start_upload(self: Arc<Self>, filename: String, payload: String) -> Result<Uuid> {
		let file_id = Uuid::new_v4();

		uploads::create(
			&self.db.pool,
			file_id,
			&filename,
			UploadStatus::Received.as_str(),
			OffsetDateTime::now_utc(),
		)
		.await?;

		let service = self;

		tokio::spawn(async move {
			if let Err(err) = service.run_upload_pipeline(file_id, payload).await {
				tracing::error!(%file_id, %err, "Upload pipeline failed.");

				let _ = service
					.set_upload_status(file_id, UploadStatus::Failed, json!(err.to_string()))
					.await;
			}
		});

		Ok(file_id)
	}

	pub async fn upload_status(&self, file_id: Uuid) -> Result<UploadStatusReport> {
		let Some(row) = uploads::get(&self.db.pool, file_id).await? else {
			return Err(Error::NotFound { message: format!("Upload {file_id} does not exist.") });
		};
		let history = uploads::history(&self.db.pool, file_id)
			.await?
			.into_iter()
			.map(|row| decode_stamp(&row.status, row.detail, row.at))
			.collect::<Result<Vec<_>>>()?;
		let current = decode_stamp(&row.status, row.detail, row.status_at)?;

		Ok(UploadStatusReport {
			file_id: row.file_id,
			filename: row.filename,
			date_uploaded: row.date_uploaded,
			current,
			history,
		})
	}

	/// The most recent uploads, newest first, without their histories.
	pub async fn recent_uploads(&self, limit: i64) -> Result<Vec<UploadListItem>> {
		let rows = uploads::list_recent(&self.db.pool, limit).await?;
		let items = rows
			.into_iter()
			.map(|row| {
				let current = decode_stamp(&row.status, row.detail, row.status_at)?;

				Ok(UploadListItem {
					file_id: row.file_id,
					filename: row.filename,
					date_uploaded: row.date_uploaded,
					current,
				})
			})
			.collect::<Result<Vec<_>>>()?;

		Ok(items)
	}

	async fn run_upload_pipeline(&self, file_id: Uuid, payload: String) -> Result<()> {
		self.set_upload_status(file_id, UploadStatus::Parsing, Value::Null).await?;

		let records = ris::parse(&payload)?;

		self.set_upload_status(
			file_id,
			UploadStatus::Ingesting,
			json!({ "records": records.len() }),
		)
		.await?;

		let outcome = self
			.ingest_records_with_progress(&records, move |progress| async move {
				self.set_upload_status(
					file_id,
					UploadStatus::Ingesting,
					json!({
						"processed": progress.processed,
						"received": progress.received,
						"inserted": progress.inserted,
						"duplicates": progress.duplicates,
					}),
				)
				.await
			})
			.await?;
		let report = serde_json::to_value(&outcome.report)
			.map_err(|err| Error::Storage { message: err.to_string() })?;

		if outcome.new_docs.is_empty() {
			// Nothing inserted: every record dropped or already known.
			self.set_upload_status(file_id, UploadStatus::Empty, report).await?;

			return Ok(());
		}

		self.set_upload_status(file_id, UploadStatus::Vectorizing, report.clone()).await?;

		let submit = SubmitRequest {
			task_id: file_id.to_string(),
			texts: outcome.new_docs.iter().map(|doc| doc.text.clone()).collect(),
			doc_ids: outcome.new_docs.iter().map(|doc| doc.doc_id.to_string()).collect(),
		};
		let poll_timeout =
			std::time::Duration::from_secs(self.cfg.vectorizer.poll_timeout_secs);

		match folio_client::vectorize(self.vectorizer.as_ref(), &submit, poll_timeout).await? {
			VectorizeOutcome::Done(vectors) => {
				self.vectors
					.upsert(
						vectors.into_iter().map(|slot| (slot.doc_id, slot.vector)).collect(),
					)
					.await?;
				self.set_upload_status(file_id, UploadStatus::Indexed, report).await?;
			},
			VectorizeOutcome::Failed(snapshot) => {
				self.set_upload_status(
					file_id,
					UploadStatus::Failed,
					json!({
						"task_id": snapshot.task_id,
						"state": snapshot.current_status.state.as_str(),
					}),
				)
				.await?;
			},
			VectorizeOutcome::TimedOut { task_id } => {
				// Not a failure; the task keeps running on the vectorizer.
				self.set_upload_status(
					file_id,
					UploadStatus::Vectorizing,
					json!({ "task_id": task_id, "note": "Polling timed out; task still running." }),
				)
				.await?;
			},
		}

		Ok(())
	}

	async fn set_upload_status(
		&self,
		file_id: Uuid,
		status: UploadStatus,
		detail: Value,
	) -> Result<()> {
		uploads::update_status(
			&self.db.pool,
			file_id,
			status.as_str(),
			&detail,
			OffsetDateTime::now_utc(),
		)
		.await?;

		Ok(())
	}
}

fn decode_stamp(status: &str, detail: Value, at: OffsetDateTime) -> Result<UploadStatusStamp> {
	let status = UploadStatus::parse(status).ok_or_else(|| Error::Storage {
		message: format!("Unknown upload status {status:?}."),
	})?;

	Ok(UploadStatusStamp { status, detail, at })
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn statuses_round_trip_through_tags() {
		for status in UploadStatus::ALL {
			assert_eq!(UploadStatus::parse(status.as_str()), Some(status));
		}
		assert_eq!(UploadStatus::parse("exploded"), None);
	}
}
