use folio_domain::{
	entry::Entry,
	page::{PageParams, PagedResult},
	query::{Filter, QueryParams, build_filter},
};
use folio_storage::search::{self, SearchBackend};
use uuid::Uuid;

use crate::{FolioService, Result};

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct SearchRequest {
	#[serde(flatten)]
	pub params: QueryParams,
	#[serde(flatten)]
	pub page: PageParams,
}

impl FolioService {
	pub async fn search(&self, req: &SearchRequest) -> Result<PagedResult<Entry>> {
		self.search_scoped(req, None).await
	}

	/// Runs one page of a search, optionally scoped to a parent id set from
	/// a "search within results" narrowing.
	pub(crate) async fn search_scoped(
		&self,
		req: &SearchRequest,
		within: Option<&[Uuid]>,
	) -> Result<PagedResult<Entry>> {
		req.page.validate()?;

		let filter = build_filter(&req.params)?;
		let limit = i64::from(req.page.size);
		let offset = req.page.skip().min(i64::MAX as u64) as i64;
		let sort_keys = req.page.sort_keys();
		let (rows, n_hits) = match &filter {
			Filter::All => {
				let rows =
					search::structured_page(&self.db.pool, &[], within, &sort_keys, limit, offset)
						.await?;
				let n_hits = search::structured_count(&self.db.pool, &[], within).await?;

				(rows, n_hits)
			},
			Filter::Clauses(clauses) => {
				let rows = search::structured_page(
					&self.db.pool,
					clauses,
					within,
					&sort_keys,
					limit,
					offset,
				)
				.await?;
				let n_hits = search::structured_count(&self.db.pool, clauses, within).await?;

				(rows, n_hits)
			},
			Filter::FullText(text) => match self.backend {
				SearchBackend::Managed => {
					let (rows, n_total) = search::managed_text_page(
						&self.db.pool,
						text,
						within,
						&sort_keys,
						limit,
						offset,
					)
					.await?;
					// An empty page past the end carries no windowed total.
					let n_hits = match n_total {
						Some(n_total) => n_total,
						None =>
							search::text_count(&self.db.pool, self.backend, text, within).await?,
					};

					(rows, n_hits)
				},
				SearchBackend::Local => {
					let rows = search::local_text_page(
						&self.db.pool,
						text,
						within,
						&sort_keys,
						limit,
						offset,
					)
					.await?;
					let n_hits =
						search::text_count(&self.db.pool, self.backend, text, within).await?;

					(rows, n_hits)
				},
			},
		};
		let items = rows.into_iter().map(|row| row.into_entry()).collect::<Result<Vec<_>, _>>()?;

		tracing::debug!(n_hits, page = req.page.page, "Search page served.");

		Ok(PagedResult::new(n_hits, &req.page, items))
	}

	/// Collects the full hit id set of a filter, up to `cap` ids.
	pub(crate) async fn collect_ids(
		&self,
		params: &QueryParams,
		within: Option<&[Uuid]>,
		cap: i64,
	) -> Result<Vec<Uuid>> {
		let filter = build_filter(params)?;
		let ids = match &filter {
			Filter::All => {
				search::collect_structured_ids(&self.db.pool, &[], within, cap).await?
			},
			Filter::Clauses(clauses) =>
				search::collect_structured_ids(&self.db.pool, clauses, within, cap).await?,
			Filter::FullText(text) =>
				search::collect_text_ids(&self.db.pool, self.backend, text, within, cap).await?,
		};

		Ok(ids)
	}
}
