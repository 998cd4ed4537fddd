/// Schema statements executed by [`crate::db::Db::ensure_schema`]. Statements
/// are idempotent; the whole script runs under an advisory lock.
pub fn render_schema() -> String {
	r#"
CREATE TABLE IF NOT EXISTS entries (
	entry_id UUID PRIMARY KEY,
	type_of_reference TEXT NOT NULL,
	title TEXT NOT NULL,
	secondary_title TEXT,
	tertiary_title TEXT,
	year INT,
	end_year INT,
	authors TEXT[] NOT NULL DEFAULT '{}',
	first_authors TEXT[] NOT NULL DEFAULT '{}',
	secondary_authors TEXT[] NOT NULL DEFAULT '{}',
	tertiary_authors TEXT[] NOT NULL DEFAULT '{}',
	keywords TEXT[] NOT NULL DEFAULT '{}',
	journal_name TEXT,
	start_page TEXT,
	end_page TEXT,
	volume TEXT,
	number TEXT,
	edition TEXT,
	issn TEXT,
	publisher TEXT,
	place_published TEXT,
	urls TEXT[] NOT NULL DEFAULT '{}',
	note TEXT,
	research_notes TEXT,
	label TEXT,
	name_of_database TEXT,
	content_hash TEXT NOT NULL UNIQUE,
	date_added TIMESTAMPTZ NOT NULL,
	search_text TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS entries_year_idx ON entries (year, end_year);

CREATE INDEX IF NOT EXISTS entries_date_added_idx ON entries (date_added DESC);

CREATE INDEX IF NOT EXISTS entries_search_text_idx
	ON entries USING GIN (to_tsvector('simple', search_text));

CREATE TABLE IF NOT EXISTS source_records (
	entry_id UUID PRIMARY KEY,
	raw TEXT NOT NULL,
	format TEXT NOT NULL,
	created_at TIMESTAMPTZ NOT NULL
);

CREATE TABLE IF NOT EXISTS autocomplete_entries (
	field TEXT NOT NULL,
	value TEXT NOT NULL,
	PRIMARY KEY (field, value)
);

CREATE TABLE IF NOT EXISTS registered_queries (
	query_id UUID PRIMARY KEY,
	session_id UUID NOT NULL,
	params JSONB NOT NULL,
	created_at TIMESTAMPTZ NOT NULL,
	last_accessed TIMESTAMPTZ NOT NULL,
	n_hits BIGINT,
	UNIQUE (session_id, params)
);

CREATE TABLE IF NOT EXISTS uploads (
	file_id UUID PRIMARY KEY,
	filename TEXT NOT NULL,
	date_uploaded TIMESTAMPTZ NOT NULL,
	status TEXT NOT NULL,
	detail JSONB NOT NULL DEFAULT 'null'::jsonb,
	status_at TIMESTAMPTZ NOT NULL
);

CREATE TABLE IF NOT EXISTS upload_status_history (
	history_id BIGINT GENERATED ALWAYS AS IDENTITY PRIMARY KEY,
	file_id UUID NOT NULL,
	status TEXT NOT NULL,
	detail JSONB NOT NULL DEFAULT 'null'::jsonb,
	at TIMESTAMPTZ NOT NULL
);

CREATE INDEX IF NOT EXISTS upload_status_history_file_idx
	ON upload_status_history (file_id, history_id);

CREATE TABLE IF NOT EXISTS vector_tasks (
	task_id TEXT PRIMARY KEY,
	created_at TIMESTAMPTZ NOT NULL,
	status TEXT NOT NULL,
	detail JSONB NOT NULL DEFAULT 'null'::jsonb,
	status_at TIMESTAMPTZ NOT NULL
);

CREATE TABLE IF NOT EXISTS vector_task_history (
	history_id BIGINT GENERATED ALWAYS AS IDENTITY PRIMARY KEY,
	task_id TEXT NOT NULL,
	status TEXT NOT NULL,
	detail JSONB NOT NULL DEFAULT 'null'::jsonb,
	at TIMESTAMPTZ NOT NULL
);

CREATE INDEX IF NOT EXISTS vector_task_history_task_idx
	ON vector_task_history (task_id, history_id);

CREATE TABLE IF NOT EXISTS vector_slots (
	task_id TEXT NOT NULL,
	position INT NOT NULL,
	doc_id TEXT NOT NULL,
	text TEXT NOT NULL,
	vec REAL[],
	PRIMARY KEY (task_id, position)
)
"#
	.to_string()
}
