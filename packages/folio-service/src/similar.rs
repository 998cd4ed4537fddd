use std::collections::HashMap;

use folio_domain::entry::Entry;
use folio_storage::entries;
use uuid::Uuid;

use crate::{Error, FolioService, Result};

impl FolioService {
	/// Nearest neighbours of an entry in vector space, most similar first.
	/// Entries whose vectors are not indexed yet simply never appear.
	pub async fn similar(&self, doc_id: &str, limit: u64) -> Result<Vec<Entry>> {
		let Some(vector) = self.vectors.find_vector(doc_id).await? else {
			return Err(Error::NotFound {
				message: format!("Entry {doc_id} has no vector; it may still be indexing."),
			});
		};
		let hits = self.vectors.nearest(vector, doc_id, limit).await?;
		let ids = hits
			.iter()
			.filter_map(|(doc_id, _)| Uuid::parse_str(doc_id).ok())
			.collect::<Vec<_>>();
		let rows = entries::get_entries_by_ids(&self.db.pool, &ids).await?;
		let mut by_id: HashMap<String, Entry> = rows
			.into_iter()
			.map(|row| row.into_entry().map(|entry| (entry.doc_id.clone(), entry)))
			.collect::<Result<_, _>>()?;
		// Splice scores back in, preserving similarity order.
		let items = hits
			.into_iter()
			.filter_map(|(doc_id, score)| {
				let mut entry = by_id.remove(&doc_id)?;

				entry.score = Some(score);

				Some(entry)
			})
			.collect();

		Ok(items)
	}
}
