use folio_domain::{
	entry::Entry,
	page::{PageParams, PagedResult},
	query::{QueryParams, build_filter},
};
use folio_storage::queries;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Error, FolioService, Result, search::SearchRequest};

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RegisterQueryRequest {
	pub session_id: Uuid,
	#[serde(flatten)]
	pub params: QueryParams,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RegisterQueryResponse {
	pub query_id: Uuid,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct QueryHistoryItem {
	pub query_id: Uuid,
	pub params: QueryParams,
	#[serde(with = "time::serde::rfc3339")]
	pub created_at: OffsetDateTime,
	#[serde(with = "time::serde::rfc3339")]
	pub last_accessed: OffsetDateTime,
	pub n_hits: Option<u64>,
}

impl FolioService {
	/// Registers a query for the session. Registration is idempotent on the
	/// params value, so repeated submissions of the same form land on one
	/// query id.
	pub async fn register_query(&self, req: &RegisterQueryRequest) -> Result<RegisterQueryResponse> {
		self.sessions.touch(req.session_id)?;
		// Reject malformed params at registration time, not first use.
		build_filter(&req.params)?;

		let params = serde_json::to_value(&req.params)
			.map_err(|err| Error::InvalidRequest { message: err.to_string() })?;
		let query_id = queries::register(
			&self.db.pool,
			Uuid::new_v4(),
			req.session_id,
			&params,
			OffsetDateTime::now_utc(),
		)
		.await?;

		Ok(RegisterQueryResponse { query_id })
	}

	/// One page of a registered query's results. Records the observed hit
	/// count on the query for its history listing.
	pub async fn run_registered(
		&self,
		session_id: Uuid,
		query_id: Uuid,
		page: PageParams,
	) -> Result<PagedResult<Entry>> {
		self.sessions.touch(session_id)?;

		let params = self.registered_params(session_id, query_id).await?;
		let result = self.search_scoped(&SearchRequest { params, page }, None).await?;

		queries::set_hits(&self.db.pool, query_id, result.n_hits.min(i64::MAX as u64) as i64)
			.await?;
		queries::touch(&self.db.pool, query_id, OffsetDateTime::now_utc()).await?;

		Ok(result)
	}

	pub async fn query_history(&self, session_id: Uuid) -> Result<Vec<QueryHistoryItem>> {
		self.sessions.touch(session_id)?;

		let rows = queries::session_history(&self.db.pool, session_id).await?;
		let items = rows
			.into_iter()
			.map(|row| {
				let params =
					serde_json::from_value(row.params).map_err(|err| Error::Storage {
						message: format!("Stored query params failed to decode: {err}."),
					})?;

				Ok(QueryHistoryItem {
					query_id: row.query_id,
					params,
					created_at: row.created_at,
					last_accessed: row.last_accessed,
					n_hits: row.n_hits.map(|n| n.max(0) as u64),
				})
			})
			.collect::<Result<Vec<_>>>()?;

		Ok(items)
	}

	/// Loads a registered query's params, enforcing that it belongs to the
	/// calling session.
	pub(crate) async fn registered_params(
		&self,
		session_id: Uuid,
		query_id: Uuid,
	) -> Result<QueryParams> {
		let Some(row) = queries::get(&self.db.pool, query_id).await? else {
			return Err(Error::NotFound { message: format!("Query {query_id} is not registered.") });
		};

		if row.session_id != session_id {
			return Err(Error::NotFound { message: format!("Query {query_id} is not registered.") });
		}

		serde_json::from_value(row.params).map_err(|err| Error::Storage {
			message: format!("Stored query params failed to decode: {err}."),
		})
	}
}
