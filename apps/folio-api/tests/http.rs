//! In-process HTTP tests over the real router. Skipped unless
//! `FOLIO_PG_DSN` and `FOLIO_QDRANT_URL` point at reachable servers.

use axum::{
	body::{self, Body},
	http::{Request, StatusCode},
};
use tower::util::ServiceExt;

use folio_api::{routes, state::AppState};
use folio_testkit::TestDatabase;

fn test_config(dsn: String, qdrant_url: String, collection: String) -> folio_config::Config {
	folio_config::Config {
		service: folio_config::Service {
			http_bind: "127.0.0.1:0".to_string(),
			vectorizer_bind: "127.0.0.1:0".to_string(),
			vectorizer_url: "http://127.0.0.1:1".to_string(),
			log_level: "info".to_string(),
		},
		storage: folio_config::Storage {
			postgres: folio_config::Postgres { dsn, pool_max_conns: 4 },
			qdrant: folio_config::Qdrant { url: qdrant_url, collection, vector_dim: 4 },
		},
		search: folio_config::Search {
			backend: "local".to_string(),
			default_page_size: 10,
			max_within_ids: 300_000,
		},
		sessions: folio_config::Sessions { ttl_secs: 3_600 },
		ingest: folio_config::Ingest { batch_size: 500, export_cap: 10_000 },
		vectorizer: folio_config::Vectorizer {
			encoder_url: "http://127.0.0.1:1".to_string(),
			encoder_timeout_ms: 1_000,
			batch_size: 8,
			max_attempts: 3,
			retry_delay_secs: 0,
			poll_timeout_secs: 5,
		},
	}
}

async fn test_env() -> Option<(TestDatabase, String, String)> {
	let base_dsn = match folio_testkit::env_dsn() {
		Some(value) => value,
		None => {
			eprintln!("Skipping HTTP tests; set FOLIO_PG_DSN to run this test.");

			return None;
		},
	};
	let qdrant_url = match folio_testkit::env_qdrant_url() {
		Some(value) => value,
		None => {
			eprintln!("Skipping HTTP tests; set FOLIO_QDRANT_URL to run this test.");

			return None;
		},
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let collection = test_db.collection_name("folio_http");

	Some((test_db, qdrant_url, collection))
}

#[tokio::test]
#[ignore = "Requires external Postgres and Qdrant. Set FOLIO_PG_DSN and FOLIO_QDRANT_URL to run."]
async fn health_ok() {
	let Some((test_db, qdrant_url, collection)) = test_env().await else {
		return;
	};
	let config = test_config(test_db.dsn().to_string(), qdrant_url, collection);
	let state = AppState::new(config).await.expect("Failed to initialize app state.");
	let app = routes::router(state);
	let response = app
		.oneshot(
			Request::builder()
				.uri("/health")
				.body(Body::empty())
				.expect("Failed to build request."),
		)
		.await
		.expect("Failed to call /health.");

	assert_eq!(response.status(), StatusCode::OK);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres and Qdrant. Set FOLIO_PG_DSN and FOLIO_QDRANT_URL to run."]
async fn empty_search_serves_an_empty_page() {
	let Some((test_db, qdrant_url, collection)) = test_env().await else {
		return;
	};
	let config = test_config(test_db.dsn().to_string(), qdrant_url, collection);
	let state = AppState::new(config).await.expect("Failed to initialize app state.");
	let app = routes::router(state);
	let response = app
		.oneshot(
			Request::builder()
				.method("POST")
				.uri("/v1/search")
				.header("content-type", "application/json")
				.body(Body::from("{}"))
				.expect("Failed to build request."),
		)
		.await
		.expect("Failed to call /v1/search.");

	assert_eq!(response.status(), StatusCode::OK);

	let bytes = body::to_bytes(response.into_body(), usize::MAX)
		.await
		.expect("Failed to read response body.");
	let json: serde_json::Value = serde_json::from_slice(&bytes).expect("Failed to parse response.");

	assert_eq!(json["n_hits"], 0);
	assert_eq!(json["items"], serde_json::json!([]));

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres and Qdrant. Set FOLIO_PG_DSN and FOLIO_QDRANT_URL to run."]
async fn malformed_year_maps_to_invalid_request() {
	let Some((test_db, qdrant_url, collection)) = test_env().await else {
		return;
	};
	let config = test_config(test_db.dsn().to_string(), qdrant_url, collection);
	let state = AppState::new(config).await.expect("Failed to initialize app state.");
	let app = routes::router(state);
	let payload = serde_json::json!({ "year": "long ago" });
	let response = app
		.oneshot(
			Request::builder()
				.method("POST")
				.uri("/v1/search")
				.header("content-type", "application/json")
				.body(Body::from(payload.to_string()))
				.expect("Failed to build request."),
		)
		.await
		.expect("Failed to call /v1/search.");

	assert_eq!(response.status(), StatusCode::BAD_REQUEST);

	let bytes = body::to_bytes(response.into_body(), usize::MAX)
		.await
		.expect("Failed to read response body.");
	let json: serde_json::Value = serde_json::from_slice(&bytes).expect("Failed to parse response.");

	assert_eq!(json["error_code"], "invalid_request");

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres and Qdrant. Set FOLIO_PG_DSN and FOLIO_QDRANT_URL to run."]
async fn unknown_session_maps_to_session_expired() {
	let Some((test_db, qdrant_url, collection)) = test_env().await else {
		return;
	};
	let config = test_config(test_db.dsn().to_string(), qdrant_url, collection);
	let state = AppState::new(config).await.expect("Failed to initialize app state.");
	let app = routes::router(state);
	let payload = serde_json::json!({ "session_id": uuid::Uuid::new_v4() });
	let response = app
		.oneshot(
			Request::builder()
				.method("POST")
				.uri("/v1/queries")
				.header("content-type", "application/json")
				.body(Body::from(payload.to_string()))
				.expect("Failed to build request."),
		)
		.await
		.expect("Failed to call /v1/queries.");

	assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

	let bytes = body::to_bytes(response.into_body(), usize::MAX)
		.await
		.expect("Failed to read response body.");
	let json: serde_json::Value = serde_json::from_slice(&bytes).expect("Failed to parse response.");

	assert_eq!(json["error_code"], "session_expired");

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}
