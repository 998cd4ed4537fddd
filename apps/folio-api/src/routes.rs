use axum::{
	Json, Router,
	extract::{Path, Query, State},
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{get, post},
};
use folio_domain::{
	entry::Entry,
	page::{PageParams, PagedResult, SortDirection},
};
use folio_service::{
	Error as ServiceError, ExportResponse, QueryHistoryItem, RegisterQueryRequest,
	RegisterQueryResponse, SearchRequest, UploadListItem, UploadStatusReport, WithinRequest,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/session", post(open_session))
		.route("/v1/search", post(search))
		.route("/v1/within", post(within))
		.route("/v1/queries", post(register_query).get(query_history))
		.route("/v1/queries/{query_id}", get(run_query))
		.route("/v1/entries/{doc_id}", get(entry))
		.route("/v1/entries/{doc_id}/similar", get(similar))
		.route("/v1/entries/{doc_id}/export", get(export_entry))
		.route("/v1/last-added", get(last_added))
		.route("/v1/reference-types", get(reference_types))
		.route("/v1/autocomplete", get(autocomplete))
		.route("/v1/export", get(export))
		.route("/v1/upload", post(upload))
		.route("/v1/uploads", get(recent_uploads))
		.route("/v1/upload-status/{file_id}", get(upload_status))
		.with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

#[derive(Debug, Serialize)]
struct SessionResponse {
	session_id: Uuid,
}

async fn open_session(State(state): State<AppState>) -> Json<SessionResponse> {
	Json(SessionResponse { session_id: state.service.sessions.create() })
}

async fn search(
	State(state): State<AppState>,
	Json(payload): Json<SearchRequest>,
) -> Result<Json<PagedResult<Entry>>, ApiError> {
	let response = state.service.search(&payload).await?;
	Ok(Json(response))
}

async fn within(
	State(state): State<AppState>,
	Json(payload): Json<WithinRequest>,
) -> Result<Json<PagedResult<Entry>>, ApiError> {
	let response = state.service.search_within(&payload).await?;
	Ok(Json(response))
}

async fn register_query(
	State(state): State<AppState>,
	Json(payload): Json<RegisterQueryRequest>,
) -> Result<Json<RegisterQueryResponse>, ApiError> {
	let response = state.service.register_query(&payload).await?;
	Ok(Json(response))
}

#[derive(Debug, Deserialize)]
struct SessionQuery {
	session_id: Uuid,
}

async fn query_history(
	State(state): State<AppState>,
	Query(query): Query<SessionQuery>,
) -> Result<Json<Vec<QueryHistoryItem>>, ApiError> {
	let response = state.service.query_history(query.session_id).await?;
	Ok(Json(response))
}

#[derive(Debug, Deserialize)]
struct PageQuery {
	session_id: Uuid,
	page: Option<u32>,
	size: Option<u32>,
	#[serde(default)]
	sort_author: SortDirection,
	#[serde(default)]
	sort_year: SortDirection,
}
impl PageQuery {
	fn page_params(&self, default_size: u32) -> PageParams {
		PageParams {
			page: self.page.unwrap_or(1),
			size: self.size.unwrap_or(default_size),
			sort_author: self.sort_author,
			sort_year: self.sort_year,
		}
	}
}

async fn run_query(
	State(state): State<AppState>,
	Path(query_id): Path<Uuid>,
	Query(query): Query<PageQuery>,
) -> Result<Json<PagedResult<Entry>>, ApiError> {
	let page = query.page_params(state.service.cfg.search.default_page_size);
	let response = state.service.run_registered(query.session_id, query_id, page).await?;
	Ok(Json(response))
}

async fn entry(
	State(state): State<AppState>,
	Path(doc_id): Path<String>,
) -> Result<Json<Entry>, ApiError> {
	let response = state.service.entry(&doc_id).await?;
	Ok(Json(response))
}

#[derive(Debug, Deserialize)]
struct SimilarQuery {
	limit: Option<u64>,
}

async fn similar(
	State(state): State<AppState>,
	Path(doc_id): Path<String>,
	Query(query): Query<SimilarQuery>,
) -> Result<Json<Vec<Entry>>, ApiError> {
	let response = state.service.similar(&doc_id, query.limit.unwrap_or(10)).await?;
	Ok(Json(response))
}

#[derive(Debug, Deserialize)]
struct LastAddedQuery {
	page: Option<u32>,
	size: Option<u32>,
}

async fn last_added(
	State(state): State<AppState>,
	Query(query): Query<LastAddedQuery>,
) -> Result<Json<PagedResult<Entry>>, ApiError> {
	let page = PageParams {
		page: query.page.unwrap_or(1),
		size: query.size.unwrap_or(state.service.cfg.search.default_page_size),
		..PageParams::default()
	};
	let response = state.service.last_added(page).await?;
	Ok(Json(response))
}

async fn reference_types(
	State(state): State<AppState>,
) -> Result<Json<Vec<String>>, ApiError> {
	let response = state.service.reference_types().await?;
	Ok(Json(response))
}

#[derive(Debug, Deserialize)]
struct AutocompleteQuery {
	field: String,
	prefix: String,
	limit: Option<i64>,
}

async fn autocomplete(
	State(state): State<AppState>,
	Query(query): Query<AutocompleteQuery>,
) -> Result<Json<Vec<String>>, ApiError> {
	let response = state
		.service
		.autocomplete(&query.field, &query.prefix, query.limit.unwrap_or(10).clamp(1, 100))
		.await?;
	Ok(Json(response))
}

#[derive(Debug, Deserialize)]
struct ExportQuery {
	session_id: Uuid,
	query_id: Uuid,
}

async fn export(
	State(state): State<AppState>,
	Query(query): Query<ExportQuery>,
) -> Result<Json<ExportResponse>, ApiError> {
	let response = state.service.export(query.session_id, query.query_id).await?;
	Ok(Json(response))
}

async fn export_entry(
	State(state): State<AppState>,
	Path(doc_id): Path<String>,
) -> Result<Json<ExportResponse>, ApiError> {
	let response = state.service.export_entry(&doc_id).await?;
	Ok(Json(response))
}

#[derive(Debug, Deserialize)]
struct UploadRequest {
	filename: String,
	payload: String,
}

#[derive(Debug, Serialize)]
struct UploadResponse {
	file_id: Uuid,
}

async fn upload(
	State(state): State<AppState>,
	Json(payload): Json<UploadRequest>,
) -> Result<Json<UploadResponse>, ApiError> {
	let file_id = state.service.start_upload(payload.filename, payload.payload).await?;
	Ok(Json(UploadResponse { file_id }))
}

async fn upload_status(
	State(state): State<AppState>,
	Path(file_id): Path<Uuid>,
) -> Result<Json<UploadStatusReport>, ApiError> {
	let response = state.service.upload_status(file_id).await?;
	Ok(Json(response))
}

#[derive(Debug, Deserialize)]
struct RecentUploadsQuery {
	limit: Option<i64>,
}

async fn recent_uploads(
	State(state): State<AppState>,
	Query(query): Query<RecentUploadsQuery>,
) -> Result<Json<Vec<UploadListItem>>, ApiError> {
	let response = state.service.recent_uploads(query.limit.unwrap_or(20).clamp(1, 100)).await?;
	Ok(Json(response))
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: &'static str,
	message: String,
}

impl From<ServiceError> for ApiError {
	fn from(err: ServiceError) -> Self {
		let message = err.to_string();
		let (status, error_code) = match err {
			ServiceError::InvalidRequest { .. } => (StatusCode::BAD_REQUEST, "invalid_request"),
			ServiceError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
			ServiceError::Conflict { .. } => (StatusCode::CONFLICT, "conflict"),
			ServiceError::SessionExpired => (StatusCode::UNAUTHORIZED, "session_expired"),
			ServiceError::Storage { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "storage"),
			ServiceError::Qdrant { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "qdrant"),
			ServiceError::Vectorizer { .. } => (StatusCode::BAD_GATEWAY, "vectorizer"),
		};

		Self { status, error_code, message }
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body =
			ErrorBody { error_code: self.error_code.to_string(), message: self.message };

		(self.status, Json(body)).into_response()
	}
}
