use folio_domain::{
	page::{SortField, SortKey},
	query::{Clause, TextMatch},
};
use sqlx::{PgExecutor, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
	Result,
	entries::ENTRY_COLUMNS,
	models::{EntryRow, RankedEntryRow},
};

/// Which full-text strategy the deployment supports. Resolved once at
/// startup by [`crate::db::Db::detect_search_backend`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SearchBackend {
	/// Plain tsvector matching over the local GIN index.
	Local,
	/// Hosted ranked search: relevance-ordered results and the hit total in
	/// a single round trip.
	Managed,
}

const TITLE_COLUMNS: [&str; 3] = ["title", "secondary_title", "tertiary_title"];

pub fn escape_like(input: &str) -> String {
	let mut out = String::with_capacity(input.len());

	for c in input.chars() {
		if matches!(c, '%' | '_' | '\\') {
			out.push('\\');
		}

		out.push(c);
	}

	out
}

/// One page of a structured (clause-based) search. An empty clause list is
/// the unfiltered match-all.
pub async fn structured_page<'e, E>(
	executor: E,
	clauses: &[Clause],
	within: Option<&[Uuid]>,
	sort_keys: &[SortKey],
	limit: i64,
	offset: i64,
) -> Result<Vec<EntryRow>>
where
	E: PgExecutor<'e>,
{
	let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {ENTRY_COLUMNS} FROM entries"));

	push_where(&mut qb, clauses, within);
	push_order(&mut qb, sort_keys);
	qb.push(" LIMIT ").push_bind(limit).push(" OFFSET ").push_bind(offset);

	let rows = qb.build_query_as::<EntryRow>().fetch_all(executor).await?;

	Ok(rows)
}

pub async fn structured_count<'e, E>(
	executor: E,
	clauses: &[Clause],
	within: Option<&[Uuid]>,
) -> Result<u64>
where
	E: PgExecutor<'e>,
{
	let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM entries");

	push_where(&mut qb, clauses, within);

	let count: i64 = qb.build_query_scalar().fetch_one(executor).await?;

	Ok(count.max(0) as u64)
}

/// Structured hit ids for "search within results" re-scoping, capped to
/// `cap` ids.
pub async fn collect_structured_ids<'e, E>(
	executor: E,
	clauses: &[Clause],
	within: Option<&[Uuid]>,
	cap: i64,
) -> Result<Vec<Uuid>>
where
	E: PgExecutor<'e>,
{
	let mut qb = QueryBuilder::<Postgres>::new("SELECT entry_id FROM entries");

	push_where(&mut qb, clauses, within);
	qb.push(" LIMIT ").push_bind(cap);

	let ids: Vec<Uuid> = qb.build_query_scalar().fetch_all(executor).await?;

	Ok(ids)
}

/// One page of a local full-text search. The tsvector strategy has no
/// useful relevance score, so the caller's sort keys apply as-is.
pub async fn local_text_page<'e, E>(
	executor: E,
	text: &str,
	within: Option<&[Uuid]>,
	sort_keys: &[SortKey],
	limit: i64,
	offset: i64,
) -> Result<Vec<EntryRow>>
where
	E: PgExecutor<'e>,
{
	let mut qb = QueryBuilder::<Postgres>::new(format!(
		"SELECT {ENTRY_COLUMNS} FROM entries \
WHERE to_tsvector('simple', search_text) @@ plainto_tsquery('simple', "
	));

	qb.push_bind(text).push(")");
	push_within(&mut qb, within);
	push_order(&mut qb, sort_keys);
	qb.push(" LIMIT ").push_bind(limit).push(" OFFSET ").push_bind(offset);

	let rows = qb.build_query_as::<EntryRow>().fetch_all(executor).await?;

	Ok(rows)
}

pub async fn text_count<'e, E>(
	executor: E,
	backend: SearchBackend,
	text: &str,
	within: Option<&[Uuid]>,
) -> Result<u64>
where
	E: PgExecutor<'e>,
{
	let mut qb = QueryBuilder::<Postgres>::new(format!(
		"SELECT COUNT(*) FROM entries \
WHERE to_tsvector('simple', search_text) @@ {}('simple', ",
		tsquery_fn(backend)
	));

	qb.push_bind(text).push(")");
	push_within(&mut qb, within);

	let count: i64 = qb.build_query_scalar().fetch_one(executor).await?;

	Ok(count.max(0) as u64)
}

/// One page of a managed ranked search: relevance ordering first, then the
/// caller's sort keys, plus the hit total computed over the same match set
/// in one round trip. Returns the page and the total; the total is `None`
/// when the page itself is empty.
pub async fn managed_text_page<'e, E>(
	executor: E,
	text: &str,
	within: Option<&[Uuid]>,
	sort_keys: &[SortKey],
	limit: i64,
	offset: i64,
) -> Result<(Vec<EntryRow>, Option<u64>)>
where
	E: PgExecutor<'e>,
{
	let mut qb = QueryBuilder::<Postgres>::new(format!(
		"SELECT {ENTRY_COLUMNS}, COUNT(*) OVER () AS n_total FROM entries \
WHERE to_tsvector('simple', search_text) @@ websearch_to_tsquery('simple', "
	));

	qb.push_bind(text).push(")");
	push_within(&mut qb, within);
	qb.push(
		" ORDER BY ts_rank(to_tsvector('simple', search_text), \
websearch_to_tsquery('simple', ",
	);
	qb.push_bind(text).push(")) DESC");

	for key in sort_keys {
		qb.push(", ")
			.push(sort_column(key.field))
			.push(if key.descending { " DESC" } else { " ASC" })
			.push(" NULLS LAST");
	}

	qb.push(", entry_id");
	qb.push(" LIMIT ").push_bind(limit).push(" OFFSET ").push_bind(offset);

	let rows = qb.build_query_as::<RankedEntryRow>().fetch_all(executor).await?;
	let n_total = rows.first().map(|row| row.n_total.max(0) as u64);
	let entries = rows.into_iter().map(|row| row.entry).collect();

	Ok((entries, n_total))
}

pub async fn collect_text_ids<'e, E>(
	executor: E,
	backend: SearchBackend,
	text: &str,
	within: Option<&[Uuid]>,
	cap: i64,
) -> Result<Vec<Uuid>>
where
	E: PgExecutor<'e>,
{
	let mut qb = QueryBuilder::<Postgres>::new(format!(
		"SELECT entry_id FROM entries \
WHERE to_tsvector('simple', search_text) @@ {}('simple', ",
		tsquery_fn(backend)
	));

	qb.push_bind(text).push(")");
	push_within(&mut qb, within);
	qb.push(" LIMIT ").push_bind(cap);

	let ids: Vec<Uuid> = qb.build_query_scalar().fetch_all(executor).await?;

	Ok(ids)
}

fn tsquery_fn(backend: SearchBackend) -> &'static str {
	match backend {
		SearchBackend::Local => "plainto_tsquery",
		SearchBackend::Managed => "websearch_to_tsquery",
	}
}

fn push_where<'a>(qb: &mut QueryBuilder<'a, Postgres>, clauses: &'a [Clause], within: Option<&'a [Uuid]>) {
	qb.push(" WHERE TRUE");

	for clause in clauses {
		qb.push(" AND ");

		match clause {
			Clause::TypeOfReference(ty) => {
				qb.push("type_of_reference = ").push_bind(ty.as_str());
			},
			Clause::Title(matcher) => push_column_match(qb, &TITLE_COLUMNS, matcher),
			Clause::Author(matcher) => push_unnest_match(
				qb,
				"authors || first_authors || secondary_authors || tertiary_authors",
				matcher,
			),
			Clause::Keyword(matcher) => push_unnest_match(qb, "keywords", matcher),
			// NULL years fail every comparison, so undated entries never
			// match a year clause.
			Clause::YearSingle(year) => {
				qb.push("(year >= ")
					.push_bind(*year)
					.push(" AND end_year <= ")
					.push_bind(*year + 1)
					.push(")");
			},
			Clause::YearRange { start, end } => {
				qb.push("(year < ")
					.push_bind(*end)
					.push(" AND end_year > ")
					.push_bind(*start)
					.push(")");
			},
		}
	}

	push_within(qb, within);
}

fn push_within<'a>(qb: &mut QueryBuilder<'a, Postgres>, within: Option<&'a [Uuid]>) {
	if let Some(ids) = within {
		qb.push(" AND entry_id = ANY(").push_bind(ids).push(")");
	}
}

/// `(col1 OP pattern OR col2 OP pattern ...)` over plain columns.
fn push_column_match(qb: &mut QueryBuilder<'_, Postgres>, columns: &[&str], matcher: &TextMatch) {
	let (op, pattern) = match_op(matcher);

	qb.push("(");

	for (i, column) in columns.iter().enumerate() {
		if i > 0 {
			qb.push(" OR ");
		}

		qb.push(*column).push(" ").push(op).push(" ").push_bind(pattern.clone());
	}

	qb.push(")");
}

/// Match against every element of an array expression.
fn push_unnest_match(qb: &mut QueryBuilder<'_, Postgres>, arrays: &str, matcher: &TextMatch) {
	let (op, pattern) = match_op(matcher);

	qb.push("EXISTS (SELECT 1 FROM unnest(")
		.push(arrays)
		.push(") AS item WHERE item ")
		.push(op)
		.push(" ")
		.push_bind(pattern)
		.push(")");
}

fn match_op(matcher: &TextMatch) -> (&'static str, String) {
	match (matcher.regex, matcher.case_sensitive) {
		(true, true) => ("~", matcher.pattern.clone()),
		(true, false) => ("~*", matcher.pattern.clone()),
		(false, true) => ("LIKE", format!("%{}%", escape_like(&matcher.pattern))),
		(false, false) => ("ILIKE", format!("%{}%", escape_like(&matcher.pattern))),
	}
}

fn sort_column(field: SortField) -> &'static str {
	match field {
		SortField::Author => "authors[1]",
		SortField::Year => "year",
	}
}

fn push_order(qb: &mut QueryBuilder<'_, Postgres>, sort_keys: &[SortKey]) {
	qb.push(" ORDER BY ");

	if sort_keys.is_empty() {
		// Newest material first when no explicit ordering was asked for.
		qb.push("year DESC NULLS LAST, entry_id");

		return;
	}

	for key in sort_keys {
		let direction = if key.descending { "DESC" } else { "ASC" };

		qb.push(sort_column(key.field)).push(" ").push(direction).push(" NULLS LAST, ");
	}

	qb.push("entry_id");
}
