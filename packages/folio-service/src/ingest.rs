use std::collections::BTreeMap;

use folio_domain::{
	prepare::{self, DropReason},
	ris::RisRecord,
};
use folio_storage::entries;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{FolioService, Result};

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct IngestReport {
	pub received: u64,
	pub inserted: u64,
	pub duplicates: u64,
	/// Drop counts keyed by reason label. Dropped records never abort the
	/// batch.
	pub dropped: BTreeMap<String, u64>,
}

/// A freshly inserted entry and the text its vector is computed from.
#[derive(Debug, Clone)]
pub struct NewDoc {
	pub doc_id: Uuid,
	pub text: String,
}

#[derive(Debug)]
pub struct IngestOutcome {
	pub report: IngestReport,
	pub new_docs: Vec<NewDoc>,
}

/// Per-chunk progress, reported after each committed transaction.
#[derive(Clone, Copy, Debug)]
pub struct IngestProgress {
	pub processed: u64,
	pub received: u64,
	pub inserted: u64,
	pub duplicates: u64,
}

impl FolioService {
	pub async fn ingest_records(&self, records: &[RisRecord]) -> Result<IngestOutcome> {
		self.ingest_records_with_progress(records, |_| async { Ok(()) }).await
	}

	/// Ingests a parsed batch. Every record in the batch shares one
	/// `date_added` stamp; that stamp is what "last added" reads back.
	/// `progress` runs after each committed chunk; a progress error aborts
	/// the remaining chunks but never the chunks already committed.
	pub async fn ingest_records_with_progress<F, Fut>(
		&self,
		records: &[RisRecord],
		progress: F,
	) -> Result<IngestOutcome>
	where
		F: Fn(IngestProgress) -> Fut,
		Fut: Future<Output = Result<()>>,
	{
		let now = OffsetDateTime::now_utc();
		let batch_size = self.cfg.ingest.batch_size.max(1) as usize;
		let mut report = IngestReport { received: records.len() as u64, ..Default::default() };
		let mut new_docs = Vec::new();
		let mut processed = 0_u64;

		for chunk in records.chunks(batch_size) {
			let mut tx = self.db.pool.begin().await?;

			for record in chunk {
				let entry = match prepare::prepare(&record.entry, now) {
					Ok(entry) => entry,
					Err(reason) => {
						*report.dropped.entry(drop_label(&reason).to_string()).or_default() += 1;

						tracing::debug!(%reason, "Dropped record during ingest.");

						continue;
					},
				};
				let doc_id = Uuid::new_v4();
				let search_text = prepare::doc_text(&entry, false);
				let inserted =
					entries::insert_entry(&mut *tx, doc_id, &entry, &search_text).await?;
				let Some(doc_id) = inserted else {
					report.duplicates += 1;

					continue;
				};

				entries::insert_source_record(&mut *tx, doc_id, &record.raw, "ris", now).await?;
				entries::insert_autocomplete_pairs(
					&mut *tx,
					&prepare::autocomplete_pairs(&entry)
						.into_iter()
						.map(|(field, value)| (field.to_string(), value))
						.collect::<Vec<_>>(),
				)
				.await?;

				report.inserted += 1;

				new_docs.push(NewDoc { doc_id, text: search_text });
			}

			tx.commit().await?;

			processed += chunk.len() as u64;

			tracing::info!(
				processed,
				inserted = report.inserted,
				duplicates = report.duplicates,
				received = report.received,
				"Ingest progress.",
			);

			progress(IngestProgress {
				processed,
				received: report.received,
				inserted: report.inserted,
				duplicates: report.duplicates,
			})
			.await?;
		}

		if report.inserted > 0 {
			self.refresh_reference_types().await?;
		}

		Ok(IngestOutcome { report, new_docs })
	}
}

fn drop_label(reason: &DropReason) -> &'static str {
	match reason {
		DropReason::MissingTitle => "missing_title",
		DropReason::MissingReferenceType => "missing_reference_type",
		DropReason::UnknownReferenceType(_) => "unknown_reference_type",
		DropReason::BadYear(_) => "bad_year",
	}
}
