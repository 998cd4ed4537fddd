use serde::Serialize;
use time::OffsetDateTime;

use crate::{
	entry::{PreparedEntry, RawEntry, ReferenceType},
	year::{self, YearError},
};

/// Expected per-record preparation failures. These drop the one record and
/// never abort the batch.
#[derive(Debug, thiserror::Error)]
pub enum DropReason {
	#[error("Missing required title.")]
	MissingTitle,
	#[error("Missing reference type.")]
	MissingReferenceType,
	#[error("Unknown reference type: {0:?}.")]
	UnknownReferenceType(String),
	#[error("Bad year: {0}")]
	BadYear(#[from] YearError),
}

/// Normalizes and validates one raw document. Year normalization happens
/// here, once, at ingestion time.
pub fn prepare(raw: &RawEntry, now: OffsetDateTime) -> Result<PreparedEntry, DropReason> {
	let span = year::normalize(raw.year.as_ref())?;
	let title = raw
		.title
		.as_deref()
		.map(str::trim)
		.filter(|title| !title.is_empty())
		.ok_or(DropReason::MissingTitle)?;
	let type_tag = raw.type_of_reference.as_deref().ok_or(DropReason::MissingReferenceType)?;
	let type_of_reference = ReferenceType::parse(type_tag)
		.ok_or_else(|| DropReason::UnknownReferenceType(type_tag.to_string()))?;

	let mut entry = PreparedEntry {
		type_of_reference,
		title: title.to_string(),
		secondary_title: raw.secondary_title.clone(),
		tertiary_title: raw.tertiary_title.clone(),
		year: span.map(|span| span.year),
		end_year: span.map(|span| span.end_year),
		authors: raw.authors.clone(),
		first_authors: raw.first_authors.clone(),
		secondary_authors: raw.secondary_authors.clone(),
		tertiary_authors: raw.tertiary_authors.clone(),
		keywords: raw.keywords.clone(),
		journal_name: raw.journal_name.clone(),
		start_page: raw.start_page.clone(),
		end_page: raw.end_page.clone(),
		volume: raw.volume.clone(),
		number: raw.number.clone(),
		edition: raw.edition.clone(),
		issn: raw.issn.clone(),
		publisher: raw.publisher.clone(),
		place_published: raw.place_published.clone(),
		urls: raw.urls.clone(),
		note: raw.note.clone(),
		research_notes: raw.research_notes.clone(),
		label: raw.label.clone(),
		name_of_database: raw.name_of_database.clone(),
		content_hash: String::new(),
		date_added: now,
	};

	entry.content_hash = content_hash(&entry);

	Ok(entry)
}

/// Deterministic fingerprint over the normalized content fields. The
/// ingestion timestamp stays out of the hash so re-ingesting the same
/// document always collides.
pub fn content_hash(entry: &PreparedEntry) -> String {
	#[derive(Serialize)]
	struct HashInput<'a> {
		type_of_reference: &'static str,
		title: &'a str,
		secondary_title: Option<&'a str>,
		tertiary_title: Option<&'a str>,
		year: Option<i32>,
		end_year: Option<i32>,
		authors: &'a [String],
		first_authors: &'a [String],
		secondary_authors: &'a [String],
		tertiary_authors: &'a [String],
		keywords: &'a [String],
		journal_name: Option<&'a str>,
		start_page: Option<&'a str>,
		end_page: Option<&'a str>,
		volume: Option<&'a str>,
		number: Option<&'a str>,
		edition: Option<&'a str>,
		issn: Option<&'a str>,
		publisher: Option<&'a str>,
		place_published: Option<&'a str>,
		urls: &'a [String],
		note: Option<&'a str>,
	}

	let input = HashInput {
		type_of_reference: entry.type_of_reference.as_str(),
		title: &entry.title,
		secondary_title: entry.secondary_title.as_deref(),
		tertiary_title: entry.tertiary_title.as_deref(),
		year: entry.year,
		end_year: entry.end_year,
		authors: &entry.authors,
		first_authors: &entry.first_authors,
		secondary_authors: &entry.secondary_authors,
		tertiary_authors: &entry.tertiary_authors,
		keywords: &entry.keywords,
		journal_name: entry.journal_name.as_deref(),
		start_page: entry.start_page.as_deref(),
		end_page: entry.end_page.as_deref(),
		volume: entry.volume.as_deref(),
		number: entry.number.as_deref(),
		edition: entry.edition.as_deref(),
		issn: entry.issn.as_deref(),
		publisher: entry.publisher.as_deref(),
		place_published: entry.place_published.as_deref(),
		urls: &entry.urls,
		note: entry.note.as_deref(),
	};
	let encoded = serde_json::to_vec(&input).expect("hash input serialization is infallible");

	blake3::hash(&encoded).to_hex().to_string()
}

/// The text handed to the vectorizer for one entry: titles joined with "; ",
/// optionally followed by the keywords.
pub fn doc_text(entry: &PreparedEntry, ignore_keywords: bool) -> String {
	let mut out = entry.title.clone();

	for extra in [entry.secondary_title.as_deref(), entry.tertiary_title.as_deref()] {
		if let Some(extra) = extra.map(str::trim).filter(|extra| !extra.is_empty()) {
			out.push_str("; ");
			out.push_str(extra);
		}
	}

	if !ignore_keywords && !entry.keywords.is_empty() {
		out.push_str("; ");
		out.push_str(&entry.keywords.join("; "));
	}

	out
}

/// Deduplicated (field, value) pairs feeding the autocomplete index.
pub fn autocomplete_pairs(entry: &PreparedEntry) -> Vec<(&'static str, String)> {
	let mut pairs = std::collections::BTreeSet::new();

	pairs.insert(("title", entry.title.clone()));

	for authors in
		[&entry.authors, &entry.first_authors, &entry.secondary_authors, &entry.tertiary_authors]
	{
		for author in authors {
			pairs.insert(("author", author.clone()));
		}
	}
	for keyword in &entry.keywords {
		pairs.insert(("keyword", keyword.clone()));
	}

	pairs.into_iter().collect()
}
