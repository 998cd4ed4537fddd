use folio_domain::entry::PreparedEntry;
use sqlx::PgExecutor;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
	Result,
	models::{EntryRow, SourceRecordRow},
};

pub(crate) const ENTRY_COLUMNS: &str = "\
entry_id, type_of_reference, title, secondary_title, tertiary_title, \
year, end_year, authors, first_authors, secondary_authors, tertiary_authors, \
keywords, journal_name, start_page, end_page, volume, number, edition, issn, \
publisher, place_published, urls, note, research_notes, label, \
name_of_database, content_hash, date_added";

/// Inserts one prepared entry. Returns `None` when an entry with the same
/// content hash already exists; the duplicate is silently skipped so that
/// re-running an ingest converges instead of failing.
pub async fn insert_entry<'e, E>(
	executor: E,
	entry_id: Uuid,
	entry: &PreparedEntry,
	search_text: &str,
) -> Result<Option<Uuid>>
where
	E: PgExecutor<'e>,
{
	let inserted: Option<Uuid> = sqlx::query_scalar(
		"\
INSERT INTO entries (
\tentry_id,
\ttype_of_reference,
\ttitle,
\tsecondary_title,
\ttertiary_title,
\tyear,
\tend_year,
\tauthors,
\tfirst_authors,
\tsecondary_authors,
\ttertiary_authors,
\tkeywords,
\tjournal_name,
\tstart_page,
\tend_page,
\tvolume,
\tnumber,
\tedition,
\tissn,
\tpublisher,
\tplace_published,
\turls,
\tnote,
\tresearch_notes,
\tlabel,
\tname_of_database,
\tcontent_hash,
\tdate_added,
\tsearch_text
)
VALUES (
\t$1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17,$18,$19,$20,
\t$21,$22,$23,$24,$25,$26,$27,$28,$29
)
ON CONFLICT (content_hash) DO NOTHING
RETURNING entry_id",
	)
	.bind(entry_id)
	.bind(entry.type_of_reference.as_str())
	.bind(entry.title.as_str())
	.bind(entry.secondary_title.as_deref())
	.bind(entry.tertiary_title.as_deref())
	.bind(entry.year)
	.bind(entry.end_year)
	.bind(&entry.authors)
	.bind(&entry.first_authors)
	.bind(&entry.secondary_authors)
	.bind(&entry.tertiary_authors)
	.bind(&entry.keywords)
	.bind(entry.journal_name.as_deref())
	.bind(entry.start_page.as_deref())
	.bind(entry.end_page.as_deref())
	.bind(entry.volume.as_deref())
	.bind(entry.number.as_deref())
	.bind(entry.edition.as_deref())
	.bind(entry.issn.as_deref())
	.bind(entry.publisher.as_deref())
	.bind(entry.place_published.as_deref())
	.bind(&entry.urls)
	.bind(entry.note.as_deref())
	.bind(entry.research_notes.as_deref())
	.bind(entry.label.as_deref())
	.bind(entry.name_of_database.as_deref())
	.bind(entry.content_hash.as_str())
	.bind(entry.date_added)
	.bind(search_text)
	.fetch_optional(executor)
	.await?;

	Ok(inserted)
}

pub async fn insert_source_record<'e, E>(
	executor: E,
	entry_id: Uuid,
	raw: &str,
	format: &str,
	created_at: OffsetDateTime,
) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query(
		"\
INSERT INTO source_records (entry_id, raw, format, created_at)
VALUES ($1, $2, $3, $4)
ON CONFLICT (entry_id) DO NOTHING",
	)
	.bind(entry_id)
	.bind(raw)
	.bind(format)
	.bind(created_at)
	.execute(executor)
	.await?;

	Ok(())
}

pub async fn insert_autocomplete_pairs<'e, E>(executor: E, pairs: &[(String, String)]) -> Result<()>
where
	E: PgExecutor<'e>,
{
	if pairs.is_empty() {
		return Ok(());
	}

	let fields: Vec<&str> = pairs.iter().map(|(field, _)| field.as_str()).collect();
	let values: Vec<&str> = pairs.iter().map(|(_, value)| value.as_str()).collect();

	sqlx::query(
		"\
INSERT INTO autocomplete_entries (field, value)
SELECT * FROM UNNEST($1::text[], $2::text[])
ON CONFLICT (field, value) DO NOTHING",
	)
	.bind(&fields)
	.bind(&values)
	.execute(executor)
	.await?;

	Ok(())
}

pub async fn get_entry<'e, E>(executor: E, entry_id: Uuid) -> Result<Option<EntryRow>>
where
	E: PgExecutor<'e>,
{
	let row = sqlx::query_as::<_, EntryRow>(&format!(
		"SELECT {ENTRY_COLUMNS} FROM entries WHERE entry_id = $1 LIMIT 1"
	))
	.bind(entry_id)
	.fetch_optional(executor)
	.await?;

	Ok(row)
}

pub async fn get_entries_by_ids<'e, E>(executor: E, entry_ids: &[Uuid]) -> Result<Vec<EntryRow>>
where
	E: PgExecutor<'e>,
{
	let rows = sqlx::query_as::<_, EntryRow>(&format!(
		"SELECT {ENTRY_COLUMNS} FROM entries WHERE entry_id = ANY($1)"
	))
	.bind(entry_ids)
	.fetch_all(executor)
	.await?;

	Ok(rows)
}

/// The most recent ingest batch: every entry sharing the latest
/// `date_added` stamp.
pub async fn last_added_page<'e, E>(executor: E, limit: i64, offset: i64) -> Result<Vec<EntryRow>>
where
	E: PgExecutor<'e>,
{
	let rows = sqlx::query_as::<_, EntryRow>(&format!(
		"\
SELECT {ENTRY_COLUMNS}
FROM entries
WHERE date_added = (SELECT MAX(date_added) FROM entries)
ORDER BY entry_id
LIMIT $1 OFFSET $2"
	))
	.bind(limit)
	.bind(offset)
	.fetch_all(executor)
	.await?;

	Ok(rows)
}

pub async fn last_added_count<'e, E>(executor: E) -> Result<u64>
where
	E: PgExecutor<'e>,
{
	let count: i64 = sqlx::query_scalar(
		"SELECT COUNT(*) FROM entries WHERE date_added = (SELECT MAX(date_added) FROM entries)",
	)
	.fetch_one(executor)
	.await?;

	Ok(count.max(0) as u64)
}

pub async fn distinct_reference_types<'e, E>(executor: E) -> Result<Vec<String>>
where
	E: PgExecutor<'e>,
{
	let types: Vec<String> = sqlx::query_scalar(
		"SELECT DISTINCT type_of_reference FROM entries ORDER BY type_of_reference",
	)
	.fetch_all(executor)
	.await?;

	Ok(types)
}

pub async fn count_entries<'e, E>(executor: E) -> Result<u64>
where
	E: PgExecutor<'e>,
{
	let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM entries").fetch_one(executor).await?;

	Ok(count.max(0) as u64)
}

pub async fn autocomplete_values<'e, E>(
	executor: E,
	field: &str,
	prefix: &str,
	limit: i64,
) -> Result<Vec<String>>
where
	E: PgExecutor<'e>,
{
	let pattern = format!("{}%", crate::search::escape_like(prefix));
	let values: Vec<String> = sqlx::query_scalar(
		"\
SELECT value
FROM autocomplete_entries
WHERE field = $1 AND value ILIKE $2
ORDER BY value
LIMIT $3",
	)
	.bind(field)
	.bind(pattern)
	.bind(limit)
	.fetch_all(executor)
	.await?;

	Ok(values)
}

pub async fn get_source_records_by_ids<'e, E>(
	executor: E,
	entry_ids: &[Uuid],
) -> Result<Vec<SourceRecordRow>>
where
	E: PgExecutor<'e>,
{
	let rows = sqlx::query_as::<_, SourceRecordRow>(
		"\
SELECT entry_id, raw, format, created_at
FROM source_records
WHERE entry_id = ANY($1)
ORDER BY entry_id",
	)
	.bind(entry_ids)
	.fetch_all(executor)
	.await?;

	Ok(rows)
}
