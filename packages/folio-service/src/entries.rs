use folio_domain::{
	entry::Entry,
	page::{PageParams, PagedResult},
};
use folio_storage::entries;
use uuid::Uuid;

use crate::{Error, FolioService, Result};

impl FolioService {
	pub async fn entry(&self, doc_id: &str) -> Result<Entry> {
		let entry_id = parse_doc_id(doc_id)?;
		let Some(row) = entries::get_entry(&self.db.pool, entry_id).await? else {
			return Err(Error::NotFound { message: format!("Entry {doc_id} does not exist.") });
		};

		Ok(row.into_entry()?)
	}

	/// The most recently ingested batch, paged.
	pub async fn last_added(&self, page: PageParams) -> Result<PagedResult<Entry>> {
		page.validate()?;

		let limit = i64::from(page.size);
		let offset = page.skip().min(i64::MAX as u64) as i64;
		let rows = entries::last_added_page(&self.db.pool, limit, offset).await?;
		let n_hits = entries::last_added_count(&self.db.pool).await?;
		let items = rows.into_iter().map(|row| row.into_entry()).collect::<Result<Vec<_>, _>>()?;

		Ok(PagedResult::new(n_hits, &page, items))
	}

	/// Reference types actually present in the collection, for building
	/// facet menus. Served from a cache refreshed after each ingest.
	pub async fn reference_types(&self) -> Result<Vec<String>> {
		Ok(self.ref_types.read().await.clone())
	}

	pub(crate) async fn refresh_reference_types(&self) -> Result<()> {
		let types = entries::distinct_reference_types(&self.db.pool).await?;

		*self.ref_types.write().await = types;

		Ok(())
	}

	pub async fn autocomplete(&self, field: &str, prefix: &str, limit: i64) -> Result<Vec<String>> {
		if !matches!(field, "title" | "author" | "keyword") {
			return Err(Error::InvalidRequest {
				message: format!("Unknown autocomplete field {field:?}."),
			});
		}

		Ok(entries::autocomplete_values(&self.db.pool, field, prefix, limit).await?)
	}
}

pub(crate) fn parse_doc_id(doc_id: &str) -> Result<Uuid> {
	Uuid::parse_str(doc_id)
		.map_err(|_| Error::InvalidRequest { message: format!("Malformed doc id {doc_id:?}.") })
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn doc_ids_must_be_uuids() {
		assert!(parse_doc_id("6d9efeb8-6173-47d4-90d9-2d9b1079a618").is_ok());
		assert!(parse_doc_id("not-a-doc").is_err());
	}
}
