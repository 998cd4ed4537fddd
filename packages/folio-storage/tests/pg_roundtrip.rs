//! Round trips against a real Postgres. These tests create a throwaway
//! database per run and are skipped unless `FOLIO_PG_DSN` points at a
//! reachable server.

use folio_domain::{
	entry::{PreparedEntry, ReferenceType},
	page::{SortField, SortKey},
	query::{Clause, TextMatch},
	task::TaskState,
};
use folio_storage::{db::Db, entries, queries, search, tasks};
use folio_testkit::TestDatabase;
use time::OffsetDateTime;
use uuid::Uuid;

async fn test_db() -> Option<TestDatabase> {
	let base_dsn = folio_testkit::env_dsn()?;

	Some(TestDatabase::new(&base_dsn).await.expect("Failed to create test database."))
}

async fn connect(test_db: &TestDatabase) -> Db {
	let cfg = folio_config::Postgres { dsn: test_db.dsn().to_string(), pool_max_conns: 4 };
	let db = Db::connect(&cfg).await.expect("Failed to connect.");

	db.ensure_schema().await.expect("Failed to apply schema.");

	db
}

fn prepared(title: &str, year: Option<i32>) -> PreparedEntry {
	let mut entry = PreparedEntry {
		type_of_reference: ReferenceType::JournalArticle,
		title: title.to_string(),
		secondary_title: None,
		tertiary_title: None,
		year,
		end_year: year.map(|y| y + 1),
		authors: vec!["Willem die Madocke maecte".to_string()],
		first_authors: Vec::new(),
		secondary_authors: Vec::new(),
		tertiary_authors: Vec::new(),
		keywords: vec!["Reynaert".to_string()],
		journal_name: None,
		start_page: None,
		end_page: None,
		volume: None,
		number: None,
		edition: None,
		issn: None,
		publisher: None,
		place_published: None,
		urls: Vec::new(),
		note: None,
		research_notes: None,
		label: None,
		name_of_database: None,
		content_hash: String::new(),
		date_added: OffsetDateTime::now_utc(),
	};

	entry.content_hash = folio_domain::prepare::content_hash(&entry);

	entry
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set FOLIO_PG_DSN to run."]
async fn insert_is_idempotent_on_content_hash() {
	let Some(test_db) = test_db().await else {
		eprintln!("Skipping insert_is_idempotent_on_content_hash; set FOLIO_PG_DSN.");

		return;
	};
	let db = connect(&test_db).await;
	let entry = prepared("Van den vos Reynaerde", Some(1260));
	let first = entries::insert_entry(&db.pool, Uuid::new_v4(), &entry, "van den vos reynaerde")
		.await
		.expect("First insert failed.");
	let second = entries::insert_entry(&db.pool, Uuid::new_v4(), &entry, "van den vos reynaerde")
		.await
		.expect("Second insert failed.");

	assert!(first.is_some());
	assert!(second.is_none());
	assert_eq!(entries::count_entries(&db.pool).await.expect("Count failed."), 1);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set FOLIO_PG_DSN to run."]
async fn year_range_matches_by_interval_intersection() {
	let Some(test_db) = test_db().await else {
		eprintln!("Skipping year_range_matches_by_interval_intersection; set FOLIO_PG_DSN.");

		return;
	};
	let db = connect(&test_db).await;
	let mut spanning = prepared("Reynardus vulpes", Some(1272));

	spanning.end_year = Some(1279);

	let undated = prepared("Reynke de vos", None);

	for entry in [&spanning, &undated] {
		entries::insert_entry(&db.pool, Uuid::new_v4(), entry, &entry.title.to_lowercase())
			.await
			.expect("Insert failed.");
	}

	// [1275, 1280) intersects [1272, 1279); the undated entry never matches.
	let hits = search::structured_count(
		&db.pool,
		&[Clause::YearRange { start: 1275, end: 1280 }],
		None,
	)
	.await
	.expect("Count failed.");
	let misses = search::structured_count(
		&db.pool,
		&[Clause::YearRange { start: 1279, end: 1290 }],
		None,
	)
	.await
	.expect("Count failed.");

	assert_eq!(hits, 1);
	assert_eq!(misses, 0);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set FOLIO_PG_DSN to run."]
async fn author_match_spans_all_author_roles() {
	let Some(test_db) = test_db().await else {
		eprintln!("Skipping author_match_spans_all_author_roles; set FOLIO_PG_DSN.");

		return;
	};
	let db = connect(&test_db).await;
	let mut entry = prepared("Reynaert den vos", Some(1479));

	entry.authors = Vec::new();
	entry.secondary_authors = vec!["Gheraert Leeu".to_string()];

	entries::insert_entry(&db.pool, Uuid::new_v4(), &entry, "reynaert den vos")
		.await
		.expect("Insert failed.");

	let matcher = TextMatch { pattern: "leeu".to_string(), regex: false, case_sensitive: false };
	let hits = search::structured_count(&db.pool, &[Clause::Author(matcher)], None)
		.await
		.expect("Count failed.");

	assert_eq!(hits, 1);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set FOLIO_PG_DSN to run."]
async fn local_text_search_hits_the_search_text_column() {
	let Some(test_db) = test_db().await else {
		eprintln!("Skipping local_text_search_hits_the_search_text_column; set FOLIO_PG_DSN.");

		return;
	};
	let db = connect(&test_db).await;
	let entry = prepared("Die hystorie van Reynaert die vos", Some(1479));

	entries::insert_entry(&db.pool, Uuid::new_v4(), &entry, "die hystorie van reynaert die vos")
		.await
		.expect("Insert failed.");

	let rows = search::local_text_page(&db.pool, "hystorie", None, &[], 10, 0)
		.await
		.expect("Search failed.");
	let none = search::local_text_page(&db.pool, "madoc", None, &[], 10, 0)
		.await
		.expect("Search failed.");

	assert_eq!(rows.len(), 1);
	assert!(none.is_empty());

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set FOLIO_PG_DSN to run."]
async fn ranked_text_search_honors_secondary_sort_keys() {
	let Some(test_db) = test_db().await else {
		eprintln!("Skipping ranked_text_search_honors_secondary_sort_keys; set FOLIO_PG_DSN.");

		return;
	};
	let db = connect(&test_db).await;
	let older = prepared("Reynaert ballade", Some(1300));
	let newer = prepared("Reynaert ballade", Some(1400));

	for entry in [&older, &newer] {
		let mut entry = entry.clone();

		// Distinct hashes; the titles are intentionally identical so the
		// rank ties and the year key decides the order.
		entry.keywords.push(entry.year.expect("year is set").to_string());
		entry.content_hash = folio_domain::prepare::content_hash(&entry);

		entries::insert_entry(&db.pool, Uuid::new_v4(), &entry, "reynaert ballade")
			.await
			.expect("Insert failed.");
	}

	let year_asc = [SortKey { field: SortField::Year, descending: false }];
	let (rows, n_total) =
		search::managed_text_page(&db.pool, "ballade", None, &year_asc, 10, 0)
			.await
			.expect("Search failed.");

	assert_eq!(n_total, Some(2));
	assert_eq!(rows[0].year, Some(1300));
	assert_eq!(rows[1].year, Some(1400));

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set FOLIO_PG_DSN to run."]
async fn query_registration_is_idempotent_per_session() {
	let Some(test_db) = test_db().await else {
		eprintln!("Skipping query_registration_is_idempotent_per_session; set FOLIO_PG_DSN.");

		return;
	};
	let db = connect(&test_db).await;
	let session_id = Uuid::new_v4();
	let params = serde_json::json!({ "title": "reynaert" });
	let now = OffsetDateTime::now_utc();
	let first = queries::register(&db.pool, Uuid::new_v4(), session_id, &params, now)
		.await
		.expect("First register failed.");
	let second = queries::register(&db.pool, Uuid::new_v4(), session_id, &params, now)
		.await
		.expect("Second register failed.");
	let other_session = queries::register(&db.pool, Uuid::new_v4(), Uuid::new_v4(), &params, now)
		.await
		.expect("Third register failed.");

	assert_eq!(first, second);
	assert_ne!(first, other_session);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set FOLIO_PG_DSN to run."]
async fn task_lifecycle_round_trips() {
	let Some(test_db) = test_db().await else {
		eprintln!("Skipping task_lifecycle_round_trips; set FOLIO_PG_DSN.");

		return;
	};
	let db = connect(&test_db).await;
	let now = OffsetDateTime::now_utc();
	let texts = vec!["text a".to_string(), "text b".to_string()];
	let doc_ids = vec!["doc-a".to_string(), "doc-b".to_string()];

	tasks::create_task(&db.pool, "task-1", &texts, &doc_ids, now)
		.await
		.expect("Create task failed.");

	let duplicate = tasks::create_task(&db.pool, "task-1", &texts, &doc_ids, now).await;

	assert!(matches!(duplicate, Err(folio_storage::Error::Conflict(_))));

	tasks::update_status(&db.pool, "task-1", TaskState::Done, &serde_json::Value::Null, now)
		.await
		.expect("Update failed.");

	let snapshot = tasks::get_task(&db.pool, "task-1")
		.await
		.expect("Get task failed.")
		.expect("Task missing.");

	assert_eq!(snapshot.current_status.state, TaskState::Done);
	assert_eq!(snapshot.history.len(), 1);
	assert_eq!(snapshot.history[0].state, TaskState::Vectorizing);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}
