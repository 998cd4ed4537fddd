//! End-to-end flows against real Postgres and Qdrant. Skipped unless
//! `FOLIO_PG_DSN` (and `FOLIO_QDRANT_URL` where vectors are involved) are
//! set.

use std::sync::Arc;

use folio_client::{BoxFuture, TaskApi};
use folio_config::Config;
use folio_domain::{
	page::PageParams,
	query::QueryParams,
	ris,
	task::{SlotVector, StatusStamp, SubmitRequest, TaskSnapshot, TaskState},
};
use folio_service::{
	FolioService, RegisterQueryRequest, SearchRequest, UploadStatus, WithinRequest,
};
use folio_testkit::TestDatabase;
use time::OffsetDateTime;

const SAMPLE_RIS: &str = "\
TY  - JOUR
TI  - Van den vos Reynaerde
AU  - Willem die Madocke maecte
PY  - 1260
KW  - Reynaert
ER  -
TY  - BOOK
TI  - Reynardus vulpes
AU  - Balduinus Iuvenis
PY  - 1272-1279
ER  -
TY  - JOUR
TI  - Die hystorie van Reynaert die vos
AU  - Gheraert Leeu
PY  - 1479
ER  -
";

/// Resolves every task instantly so tests never wait on the poll loop.
struct InstantVectorizer;
impl TaskApi for InstantVectorizer {
	fn submit<'a>(&'a self, req: &'a SubmitRequest) -> BoxFuture<'a, folio_client::Result<TaskSnapshot>> {
		let task_id = req.task_id.clone();

		Box::pin(async move {
			Ok(TaskSnapshot {
				task_id,
				created_at: OffsetDateTime::now_utc(),
				current_status: StatusStamp::new(
					TaskState::Done,
					OffsetDateTime::now_utc(),
					serde_json::Value::Null,
				),
				history: Vec::new(),
			})
		})
	}

	fn status<'a>(&'a self, task_id: &'a str) -> BoxFuture<'a, folio_client::Result<TaskSnapshot>> {
		Box::pin(async move {
			Ok(TaskSnapshot {
				task_id: task_id.to_string(),
				created_at: OffsetDateTime::now_utc(),
				current_status: StatusStamp::new(
					TaskState::Done,
					OffsetDateTime::now_utc(),
					serde_json::Value::Null,
				),
				history: Vec::new(),
			})
		})
	}

	fn vectors<'a>(&'a self, _task_id: &'a str) -> BoxFuture<'a, folio_client::Result<Vec<SlotVector>>> {
		Box::pin(async move { Ok(Vec::new()) })
	}
}

async fn test_db() -> Option<TestDatabase> {
	let base_dsn = folio_testkit::env_dsn()?;

	Some(TestDatabase::new(&base_dsn).await.expect("Failed to create test database."))
}

fn test_config(dsn: String, qdrant_url: String, collection: String) -> Config {
	Config {
		service: folio_config::Service {
			http_bind: "127.0.0.1:0".to_string(),
			vectorizer_bind: "127.0.0.1:0".to_string(),
			vectorizer_url: "http://127.0.0.1:0".to_string(),
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
			encoder_url: "http://127.0.0.1:0".to_string(),
			encoder_timeout_ms: 1_000,
			batch_size: 8,
			max_attempts: 3,
			retry_delay_secs: 0,
			poll_timeout_secs: 5,
		},
	}
}

async fn build_service(test_db: &TestDatabase, qdrant_url: String) -> Arc<FolioService> {
	let collection = test_db.collection_name("folio_flow");
	let cfg = test_config(test_db.dsn().to_string(), qdrant_url, collection);
	let service = FolioService::new(cfg, Arc::new(InstantVectorizer))
		.await
		.expect("Failed to build service.");

	Arc::new(service)
}

#[tokio::test]
#[ignore = "Requires external Postgres and Qdrant. Set FOLIO_PG_DSN and FOLIO_QDRANT_URL to run."]
async fn registered_query_pages_and_narrows() {
	let Some(test_db) = test_db().await else {
		eprintln!("Skipping registered_query_pages_and_narrows; set FOLIO_PG_DSN.");

		return;
	};
	let Some(qdrant_url) = folio_testkit::env_qdrant_url() else {
		eprintln!("Skipping registered_query_pages_and_narrows; set FOLIO_QDRANT_URL.");

		return;
	};
	let service = build_service(&test_db, qdrant_url).await;
	let records = ris::parse(SAMPLE_RIS).expect("Failed to parse sample.");

	service.ingest_records(&records).await.expect("Ingest failed.");

	let session_id = service.sessions.create();
	let params = QueryParams { title: Some("reynaert".to_string()), ..QueryParams::default() };
	let registered = service
		.register_query(&RegisterQueryRequest { session_id, params: params.clone() })
		.await
		.expect("Register failed.");
	let again = service
		.register_query(&RegisterQueryRequest { session_id, params: params.clone() })
		.await
		.expect("Re-register failed.");

	assert_eq!(registered.query_id, again.query_id);

	let page = service
		.run_registered(session_id, registered.query_id, PageParams::default())
		.await
		.expect("Paging failed.");

	assert_eq!(page.n_hits, 2);

	let history = service.query_history(session_id).await.expect("History failed.");

	assert_eq!(history.len(), 1);
	assert_eq!(history[0].n_hits, Some(2));

	// Narrow the Reynaert hits down to the incunable.
	let narrowed = service
		.search_within(&WithinRequest {
			session_id,
			query_id: registered.query_id,
			params: QueryParams { year: Some("1479".to_string()), ..QueryParams::default() },
			page: PageParams::default(),
		})
		.await
		.expect("Within failed.");

	assert_eq!(narrowed.n_hits, 1);
	assert_eq!(narrowed.parent_n_hits, Some(2));

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres and Qdrant. Set FOLIO_PG_DSN and FOLIO_QDRANT_URL to run."]
async fn re_ingesting_a_batch_is_idempotent() {
	let Some(test_db) = test_db().await else {
		eprintln!("Skipping re_ingesting_a_batch_is_idempotent; set FOLIO_PG_DSN.");

		return;
	};
	let Some(qdrant_url) = folio_testkit::env_qdrant_url() else {
		eprintln!("Skipping re_ingesting_a_batch_is_idempotent; set FOLIO_QDRANT_URL.");

		return;
	};
	let service = build_service(&test_db, qdrant_url).await;
	let records = ris::parse(SAMPLE_RIS).expect("Failed to parse sample.");
	let first = service.ingest_records(&records).await.expect("First ingest failed.");
	let second = service.ingest_records(&records).await.expect("Second ingest failed.");

	assert_eq!(first.report.inserted, 3);
	assert_eq!(second.report.inserted, 0);
	assert_eq!(second.report.duplicates, 3);

	let all = service
		.search(&SearchRequest::default())
		.await
		.expect("Match-all search failed.");

	assert_eq!(all.n_hits, 3);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres and Qdrant. Set FOLIO_PG_DSN and FOLIO_QDRANT_URL to run."]
async fn ingest_reports_progress_per_chunk() {
	let Some(test_db) = test_db().await else {
		eprintln!("Skipping ingest_reports_progress_per_chunk; set FOLIO_PG_DSN.");

		return;
	};
	let Some(qdrant_url) = folio_testkit::env_qdrant_url() else {
		eprintln!("Skipping ingest_reports_progress_per_chunk; set FOLIO_QDRANT_URL.");

		return;
	};
	let collection = test_db.collection_name("folio_flow");
	let mut cfg = test_config(test_db.dsn().to_string(), qdrant_url, collection);

	// Three sample records in one-record chunks.
	cfg.ingest.batch_size = 1;

	let service = FolioService::new(cfg, Arc::new(InstantVectorizer))
		.await
		.expect("Failed to build service.");
	let records = ris::parse(SAMPLE_RIS).expect("Failed to parse sample.");
	let seen = std::sync::Mutex::new(Vec::new());
	let outcome = service
		.ingest_records_with_progress(&records, async |progress| {
			seen.lock().expect("progress lock").push(progress.processed);

			Ok(())
		})
		.await
		.expect("Ingest failed.");

	assert_eq!(outcome.report.inserted, 3);
	assert_eq!(*seen.lock().expect("progress lock"), vec![1, 2, 3]);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres and Qdrant. Set FOLIO_PG_DSN and FOLIO_QDRANT_URL to run."]
async fn oversized_parent_sets_are_capped_not_rejected() {
	let Some(test_db) = test_db().await else {
		eprintln!("Skipping oversized_parent_sets_are_capped_not_rejected; set FOLIO_PG_DSN.");

		return;
	};
	let Some(qdrant_url) = folio_testkit::env_qdrant_url() else {
		eprintln!("Skipping oversized_parent_sets_are_capped_not_rejected; set FOLIO_QDRANT_URL.");

		return;
	};
	let collection = test_db.collection_name("folio_flow");
	let mut cfg = test_config(test_db.dsn().to_string(), qdrant_url, collection);

	// Three sample entries against a two-id cap.
	cfg.search.max_within_ids = 2;

	let service = Arc::new(
		FolioService::new(cfg, Arc::new(InstantVectorizer))
			.await
			.expect("Failed to build service."),
	);
	let records = ris::parse(SAMPLE_RIS).expect("Failed to parse sample.");

	service.ingest_records(&records).await.expect("Ingest failed.");

	let session_id = service.sessions.create();
	let registered = service
		.register_query(&RegisterQueryRequest { session_id, params: QueryParams::default() })
		.await
		.expect("Register failed.");
	let narrowed = service
		.search_within(&WithinRequest {
			session_id,
			query_id: registered.query_id,
			params: QueryParams::default(),
			page: PageParams::default(),
		})
		.await
		.expect("Within failed.");

	assert_eq!(narrowed.parent_n_hits, Some(2));
	assert_eq!(narrowed.n_hits, 2);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres and Qdrant. Set FOLIO_PG_DSN and FOLIO_QDRANT_URL to run."]
async fn full_text_term_overrides_structured_filters() {
	let Some(test_db) = test_db().await else {
		eprintln!("Skipping full_text_term_overrides_structured_filters; set FOLIO_PG_DSN.");

		return;
	};
	let Some(qdrant_url) = folio_testkit::env_qdrant_url() else {
		eprintln!("Skipping full_text_term_overrides_structured_filters; set FOLIO_QDRANT_URL.");

		return;
	};
	let service = build_service(&test_db, qdrant_url).await;
	let records = ris::parse(SAMPLE_RIS).expect("Failed to parse sample.");

	service.ingest_records(&records).await.expect("Ingest failed.");

	// The year filter alone matches nothing; the full-text term must win.
	let hits = service
		.search(&SearchRequest {
			params: QueryParams {
				year: Some("1900".to_string()),
				..QueryParams::full_text_only("vulpes")
			},
			page: PageParams::default(),
		})
		.await
		.expect("Full-text search failed.");

	assert_eq!(hits.n_hits, 1);
	assert_eq!(hits.items[0].prepared.title, "Reynardus vulpes");

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres and Qdrant. Set FOLIO_PG_DSN and FOLIO_QDRANT_URL to run."]
async fn duplicates_only_upload_terminates_as_empty() {
	let Some(test_db) = test_db().await else {
		eprintln!("Skipping duplicates_only_upload_terminates_as_empty; set FOLIO_PG_DSN.");

		return;
	};
	let Some(qdrant_url) = folio_testkit::env_qdrant_url() else {
		eprintln!("Skipping duplicates_only_upload_terminates_as_empty; set FOLIO_QDRANT_URL.");

		return;
	};
	let service = build_service(&test_db, qdrant_url).await;
	let records = ris::parse(SAMPLE_RIS).expect("Failed to parse sample.");

	service.ingest_records(&records).await.expect("Ingest failed.");

	let file_id = Arc::clone(&service)
		.start_upload("sample.ris".to_string(), SAMPLE_RIS.to_string())
		.await
		.expect("Upload failed.");
	let mut current = UploadStatus::Received;

	for _ in 0..100 {
		current = service.upload_status(file_id).await.expect("Status failed.").current.status;

		if matches!(current, UploadStatus::Indexed | UploadStatus::Empty | UploadStatus::Failed) {
			break;
		}

		tokio::time::sleep(std::time::Duration::from_millis(50)).await;
	}

	assert_eq!(current, UploadStatus::Empty);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres and Qdrant. Set FOLIO_PG_DSN and FOLIO_QDRANT_URL to run."]
async fn unknown_sessions_are_rejected() {
	let Some(test_db) = test_db().await else {
		eprintln!("Skipping unknown_sessions_are_rejected; set FOLIO_PG_DSN.");

		return;
	};
	let Some(qdrant_url) = folio_testkit::env_qdrant_url() else {
		eprintln!("Skipping unknown_sessions_are_rejected; set FOLIO_QDRANT_URL.");

		return;
	};
	let service = build_service(&test_db, qdrant_url).await;
	let result = service
		.register_query(&RegisterQueryRequest {
			session_id: uuid::Uuid::new_v4(),
			params: QueryParams::default(),
		})
		.await;

	assert!(matches!(result, Err(folio_service::Error::SessionExpired)));

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}
