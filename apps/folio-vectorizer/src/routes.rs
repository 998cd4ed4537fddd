use std::sync::Arc;

use axum::{
	Json, Router,
	extract::{Path, State},
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{get, post},
};
use folio_domain::task::{SlotVector, SubmitRequest, TaskSnapshot, TaskState};
use serde::Serialize;
use time::OffsetDateTime;

use crate::{
	Error,
	state::AppState,
	task::{self, PgTaskStore},
};

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/vectorize", post(vectorize))
		.route("/check-status/{task_id}", get(check_status))
		.route("/get-vectors/{task_id}", get(get_vectors))
		.with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

/// Accepts a batch and starts encoding it in the background. The response
/// is the task's initial snapshot; progress is polled via `check-status`.
async fn vectorize(
	State(state): State<AppState>,
	Json(payload): Json<SubmitRequest>,
) -> Result<Json<TaskSnapshot>, ApiError> {
	if payload.texts.is_empty() {
		return Err(ApiError::bad_request("Refusing an empty batch."));
	}

	folio_storage::tasks::create_task(
		&state.db.pool,
		&payload.task_id,
		&payload.texts,
		&payload.doc_ids,
		OffsetDateTime::now_utc(),
	)
	.await
	.map_err(Error::from)?;

	let snapshot = load_snapshot(&state, &payload.task_id).await?;
	let task_id = payload.task_id.clone();
	let store = PgTaskStore { pool: state.db.pool.clone() };
	let runner = Arc::clone(&state.runner);
	let gpu = Arc::clone(&state.gpu);
	let cfg = state.runner_cfg;

	tokio::spawn(async move {
		if let Err(err) = task::run_task(&store, runner.as_ref(), &gpu, cfg, &task_id).await {
			tracing::error!(task_id, %err, "Task runner failed.");
		}
	});

	Ok(Json(snapshot))
}

async fn check_status(
	State(state): State<AppState>,
	Path(task_id): Path<String>,
) -> Result<Json<TaskSnapshot>, ApiError> {
	let snapshot = load_snapshot(&state, &task_id).await?;

	Ok(Json(snapshot))
}

/// Vectors are only handed out once the task is done; before that the
/// caller gets a conflict instead of a partial batch.
async fn get_vectors(
	State(state): State<AppState>,
	Path(task_id): Path<String>,
) -> Result<Json<Vec<SlotVector>>, ApiError> {
	let snapshot = load_snapshot(&state, &task_id).await?;

	if snapshot.current_status.state != TaskState::Done {
		return Err(ApiError::new(
			StatusCode::CONFLICT,
			"not_done",
			format!("Task {task_id:?} is {}.", snapshot.current_status.state.as_str()),
		));
	}

	let vectors =
		folio_storage::tasks::fetch_vectors(&state.db.pool, &task_id).await.map_err(Error::from)?;

	Ok(Json(vectors))
}

async fn load_snapshot(state: &AppState, task_id: &str) -> Result<TaskSnapshot, ApiError> {
	folio_storage::tasks::get_task(&state.db.pool, task_id)
		.await
		.map_err(Error::from)?
		.ok_or_else(|| {
			ApiError::new(
				StatusCode::NOT_FOUND,
				"not_found",
				format!("Task {task_id:?} does not exist."),
			)
		})
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
impl ApiError {
	fn new(status: StatusCode, error_code: &'static str, message: String) -> Self {
		Self { status, error_code, message }
	}

	fn bad_request(message: impl Into<String>) -> Self {
		Self::new(StatusCode::BAD_REQUEST, "invalid_request", message.into())
	}
}

impl From<Error> for ApiError {
	fn from(err: Error) -> Self {
		let message = err.to_string();
		let (status, error_code) = match &err {
			Error::Storage(folio_storage::Error::Conflict(_)) =>
				(StatusCode::CONFLICT, "duplicate_task"),
			Error::Storage(folio_storage::Error::NotFound(_)) =>
				(StatusCode::NOT_FOUND, "not_found"),
			Error::Storage(folio_storage::Error::InvalidArgument(_)) =>
				(StatusCode::BAD_REQUEST, "invalid_request"),
			_ => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
		};

		Self::new(status, error_code, message)
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body =
			ErrorBody { error_code: self.error_code.to_string(), message: self.message };

		(self.status, Json(body)).into_response()
	}
}
