use std::{future::Future, pin::Pin, time::Duration};

use serde_json::Value;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Encoder failures split by recoverability: resource exhaustion (the
/// accelerator ran out of memory under concurrent load) is retried with
/// backoff, anything else kills the task.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
	#[error("Encoder out of resources.")]
	ResourceExhausted,
	#[error("Encoder failed: {0}")]
	Runtime(String),
}

pub trait ModelRunner
where
	Self: Send + Sync,
{
	fn encode<'a>(
		&'a self,
		texts: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>, EncodeError>>;
}

/// Talks to the external encoder process over HTTP.
pub struct RemoteRunner {
	http: reqwest::Client,
	url: String,
}
impl RemoteRunner {
	pub fn new(cfg: &folio_config::Vectorizer) -> Result<Self, EncodeError> {
		let http = reqwest::Client::builder()
			.timeout(Duration::from_millis(cfg.encoder_timeout_ms))
			.build()
			.map_err(|err| EncodeError::Runtime(err.to_string()))?;

		Ok(Self { http, url: format!("{}/encode", cfg.encoder_url) })
	}

	async fn call(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EncodeError> {
		let body = serde_json::json!({ "input": texts });
		let response = self
			.http
			.post(&self.url)
			.json(&body)
			.send()
			.await
			.map_err(|err| EncodeError::Runtime(err.to_string()))?;
		let status = response.status();

		if !status.is_success() {
			let message = response.text().await.unwrap_or_default();

			return Err(classify_failure(status.as_u16(), &message));
		}

		let json: Value =
			response.json().await.map_err(|err| EncodeError::Runtime(err.to_string()))?;

		parse_embeddings(json)
	}
}
impl ModelRunner for RemoteRunner {
	fn encode<'a>(
		&'a self,
		texts: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>, EncodeError>> {
		Box::pin(self.call(texts))
	}
}

/// The encoder reports accelerator memory exhaustion as 507 or as an error
/// string mentioning it; both mean "retry later", not "broken input".
fn classify_failure(status: u16, message: &str) -> EncodeError {
	let lowered = message.to_lowercase();

	if status == 507 || lowered.contains("out of memory") || lowered.contains("oom") {
		EncodeError::ResourceExhausted
	} else {
		EncodeError::Runtime(format!("Encoder returned {status}: {message}"))
	}
}

fn parse_embeddings(json: Value) -> Result<Vec<Vec<f32>>, EncodeError> {
	let rows = json
		.get("embeddings")
		.and_then(|value| value.as_array())
		.ok_or_else(|| EncodeError::Runtime("Response is missing embeddings array.".to_string()))?;
	let mut out = Vec::with_capacity(rows.len());

	for row in rows {
		let row = row
			.as_array()
			.ok_or_else(|| EncodeError::Runtime("Embedding must be an array.".to_string()))?;
		let mut vector = Vec::with_capacity(row.len());

		for value in row {
			let number = value
				.as_f64()
				.ok_or_else(|| EncodeError::Runtime("Embedding value must be numeric.".to_string()))?;

			vector.push(number as f32);
		}

		out.push(vector);
	}

	Ok(out)
}
