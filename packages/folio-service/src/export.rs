use folio_storage::entries;
use uuid::Uuid;

use crate::{Error, FolioService, Result};

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ExportResponse {
	pub n_records: u64,
	/// The matching source records, concatenated in their original
	/// interchange form.
	pub payload: String,
}

impl FolioService {
	/// Exports the raw source records behind a registered query's hits.
	pub async fn export(&self, session_id: Uuid, query_id: Uuid) -> Result<ExportResponse> {
		self.sessions.touch(session_id)?;

		let params = self.registered_params(session_id, query_id).await?;
		// Oversized result sets export their first `export_cap` records.
		let cap = i64::from(self.cfg.ingest.export_cap);
		let ids = self.collect_ids(&params, None, cap).await?;
		let records = entries::get_source_records_by_ids(&self.db.pool, &ids).await?;
		let n_records = records.len() as u64;
		let payload =
			records.into_iter().map(|record| record.raw).collect::<Vec<_>>().join("\n");

		tracing::info!(%query_id, n_records, "Exported source records.");

		Ok(ExportResponse { n_records, payload })
	}

	/// Exports one entry's raw source record.
	pub async fn export_entry(&self, doc_id: &str) -> Result<ExportResponse> {
		let id = crate::entries::parse_doc_id(doc_id)?;
		let records = entries::get_source_records_by_ids(&self.db.pool, &[id]).await?;
		let record = records.into_iter().next().ok_or_else(|| Error::NotFound {
			message: format!("No source record for entry {doc_id:?}."),
		})?;

		Ok(ExportResponse { n_records: 1, payload: record.raw })
	}
}
