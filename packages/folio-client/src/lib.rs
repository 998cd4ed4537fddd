//! Client for the vectorizer RPC surface: task submission plus the polling
//! loop that waits out long-running batches.

use std::{
	future::Future,
	pin::Pin,
	time::{Duration, Instant},
};

use folio_domain::task::{SlotVector, SubmitRequest, TaskSnapshot};

pub type Result<T, E = Error> = std::result::Result<T, E>;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Http(#[from] reqwest::Error),
	#[error("Vectorizer returned {status}: {message}")]
	Remote { status: u16, message: String },
}

pub trait TaskApi
where
	Self: Send + Sync,
{
	fn submit<'a>(&'a self, req: &'a SubmitRequest) -> BoxFuture<'a, Result<TaskSnapshot>>;

	fn status<'a>(&'a self, task_id: &'a str) -> BoxFuture<'a, Result<TaskSnapshot>>;

	fn vectors<'a>(&'a self, task_id: &'a str) -> BoxFuture<'a, Result<Vec<SlotVector>>>;
}

pub struct HttpTaskApi {
	http: reqwest::Client,
	base_url: String,
}
impl HttpTaskApi {
	pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
		let http = reqwest::Client::builder().timeout(timeout).build()?;

		Ok(Self { http, base_url: base_url.into().trim_end_matches('/').to_string() })
	}

	async fn decode<T>(response: reqwest::Response) -> Result<T>
	where
		T: serde::de::DeserializeOwned,
	{
		let status = response.status();

		if !status.is_success() {
			let message = response.text().await.unwrap_or_default();

			return Err(Error::Remote { status: status.as_u16(), message });
		}

		Ok(response.json().await?)
	}
}
impl TaskApi for HttpTaskApi {
	fn submit<'a>(&'a self, req: &'a SubmitRequest) -> BoxFuture<'a, Result<TaskSnapshot>> {
		Box::pin(async move {
			let response =
				self.http.post(format!("{}/vectorize", self.base_url)).json(req).send().await?;

			Self::decode(response).await
		})
	}

	fn status<'a>(&'a self, task_id: &'a str) -> BoxFuture<'a, Result<TaskSnapshot>> {
		Box::pin(async move {
			let response =
				self.http.get(format!("{}/check-status/{task_id}", self.base_url)).send().await?;

			Self::decode(response).await
		})
	}

	fn vectors<'a>(&'a self, task_id: &'a str) -> BoxFuture<'a, Result<Vec<SlotVector>>> {
		Box::pin(async move {
			let response =
				self.http.get(format!("{}/get-vectors/{task_id}", self.base_url)).send().await?;

			Self::decode(response).await
		})
	}
}

#[derive(Debug)]
pub enum VectorizeOutcome {
	Done(Vec<SlotVector>),
	/// The task reached a terminal failure state on the vectorizer side.
	Failed(TaskSnapshot),
	/// Our wall-clock budget ran out. The remote task keeps running; it is
	/// reported separately from failure so callers can surface "still in
	/// progress" instead of "broken".
	TimedOut { task_id: String },
}

/// Poll cadence grows with batch size; huge collections take hours and do
/// not need second-level status resolution.
pub fn poll_interval(n_texts: usize) -> Duration {
	let secs = if n_texts > 50_000 {
		120
	} else if n_texts > 10_000 {
		40
	} else if n_texts > 1_000 {
		20
	} else {
		10
	};

	Duration::from_secs(secs)
}

/// Submits a batch and polls until the task leaves its in-flight states or
/// `poll_timeout` elapses.
pub async fn vectorize(
	api: &dyn TaskApi,
	req: &SubmitRequest,
	poll_timeout: Duration,
) -> Result<VectorizeOutcome> {
	let submitted = api.submit(req).await?;

	tracing::info!(
		task_id = %req.task_id,
		n_texts = req.texts.len(),
		state = submitted.current_status.state.as_str(),
		"Submitted vectorization task.",
	);

	let interval = poll_interval(req.texts.len());
	let deadline = Instant::now() + poll_timeout;
	let mut snapshot = submitted;

	loop {
		let state = snapshot.current_status.state;

		if state == folio_domain::task::TaskState::Done {
			let vectors = api.vectors(&req.task_id).await?;

			return Ok(VectorizeOutcome::Done(vectors));
		}
		if state.is_terminal() {
			return Ok(VectorizeOutcome::Failed(snapshot));
		}
		if Instant::now() >= deadline {
			tracing::warn!(task_id = %req.task_id, "Gave up polling; task still in flight.");

			return Ok(VectorizeOutcome::TimedOut { task_id: req.task_id.clone() });
		}

		tokio::time::sleep(interval).await;

		snapshot = api.status(&req.task_id).await?;
	}
}
