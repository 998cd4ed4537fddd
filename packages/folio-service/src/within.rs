use folio_domain::{
	entry::Entry,
	page::{PageParams, PagedResult},
	query::QueryParams,
};
use uuid::Uuid;

use crate::{FolioService, Result, search::SearchRequest};

/// A narrowing search: run `params` against only the hits of a previously
/// registered query.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct WithinRequest {
	pub session_id: Uuid,
	pub query_id: Uuid,
	#[serde(flatten)]
	pub params: QueryParams,
	#[serde(flatten)]
	pub page: PageParams,
}

impl FolioService {
	pub async fn search_within(&self, req: &WithinRequest) -> Result<PagedResult<Entry>> {
		self.sessions.touch(req.session_id)?;

		let parent_params = self.registered_params(req.session_id, req.query_id).await?;
		// Oversized parents are truncated, not rejected: the narrowing runs
		// against the first `max_within_ids` hits.
		let cap = i64::from(self.cfg.search.max_within_ids);
		let parent_ids = self.collect_ids(&parent_params, None, cap).await?;
		let parent_n_hits = parent_ids.len() as u64;
		let result = self
			.search_scoped(
				&SearchRequest { params: req.params.clone(), page: req.page },
				Some(&parent_ids),
			)
			.await?;

		Ok(result.with_parent(parent_n_hits))
	}
}
