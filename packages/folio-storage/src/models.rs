use folio_domain::entry::{Entry, PreparedEntry, ReferenceType};
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Error, Result};

#[derive(Debug, sqlx::FromRow)]
pub struct EntryRow {
	pub entry_id: Uuid,
	pub type_of_reference: String,
	pub title: String,
	pub secondary_title: Option<String>,
	pub tertiary_title: Option<String>,
	pub year: Option<i32>,
	pub end_year: Option<i32>,
	pub authors: Vec<String>,
	pub first_authors: Vec<String>,
	pub secondary_authors: Vec<String>,
	pub tertiary_authors: Vec<String>,
	pub keywords: Vec<String>,
	pub journal_name: Option<String>,
	pub start_page: Option<String>,
	pub end_page: Option<String>,
	pub volume: Option<String>,
	pub number: Option<String>,
	pub edition: Option<String>,
	pub issn: Option<String>,
	pub publisher: Option<String>,
	pub place_published: Option<String>,
	pub urls: Vec<String>,
	pub note: Option<String>,
	pub research_notes: Option<String>,
	pub label: Option<String>,
	pub name_of_database: Option<String>,
	pub content_hash: String,
	pub date_added: OffsetDateTime,
}
impl EntryRow {
	pub fn into_entry(self) -> Result<Entry> {
		let type_of_reference = ReferenceType::parse(&self.type_of_reference).ok_or_else(|| {
			Error::InvalidArgument(format!(
				"Stored entry {} has unknown reference type {:?}.",
				self.entry_id, self.type_of_reference
			))
		})?;

		Ok(Entry {
			doc_id: self.entry_id.to_string(),
			prepared: PreparedEntry {
				type_of_reference,
				title: self.title,
				secondary_title: self.secondary_title,
				tertiary_title: self.tertiary_title,
				year: self.year,
				end_year: self.end_year,
				authors: self.authors,
				first_authors: self.first_authors,
				secondary_authors: self.secondary_authors,
				tertiary_authors: self.tertiary_authors,
				keywords: self.keywords,
				journal_name: self.journal_name,
				start_page: self.start_page,
				end_page: self.end_page,
				volume: self.volume,
				number: self.number,
				edition: self.edition,
				issn: self.issn,
				publisher: self.publisher,
				place_published: self.place_published,
				urls: self.urls,
				note: self.note,
				research_notes: self.research_notes,
				label: self.label,
				name_of_database: self.name_of_database,
				content_hash: self.content_hash,
				date_added: self.date_added,
			},
			score: None,
		})
	}
}

/// [`EntryRow`] plus the windowed total the managed text strategy computes
/// in the same round trip as the page itself.
#[derive(Debug, sqlx::FromRow)]
pub struct RankedEntryRow {
	#[sqlx(flatten)]
	pub entry: EntryRow,
	pub n_total: i64,
}

#[derive(Debug, sqlx::FromRow)]
pub struct RegisteredQueryRow {
	pub query_id: Uuid,
	pub session_id: Uuid,
	pub params: Value,
	pub created_at: OffsetDateTime,
	pub last_accessed: OffsetDateTime,
	pub n_hits: Option<i64>,
}

#[derive(Debug, sqlx::FromRow)]
pub struct UploadRow {
	pub file_id: Uuid,
	pub filename: String,
	pub date_uploaded: OffsetDateTime,
	pub status: String,
	pub detail: Value,
	pub status_at: OffsetDateTime,
}

#[derive(Debug, sqlx::FromRow)]
pub struct UploadStatusRow {
	pub status: String,
	pub detail: Value,
	pub at: OffsetDateTime,
}

#[derive(Debug, sqlx::FromRow)]
pub struct TaskRow {
	pub task_id: String,
	pub created_at: OffsetDateTime,
	pub status: String,
	pub detail: Value,
	pub status_at: OffsetDateTime,
}

#[derive(Debug, sqlx::FromRow)]
pub struct TaskHistoryRow {
	pub status: String,
	pub detail: Value,
	pub at: OffsetDateTime,
}

#[derive(Debug, sqlx::FromRow)]
pub struct SlotRow {
	pub position: i32,
	pub doc_id: String,
	pub text: String,
	pub vec: Option<Vec<f32>>,
}

#[derive(Debug, sqlx::FromRow)]
pub struct SourceRecordRow {
	pub entry_id: Uuid,
	pub raw: String,
	pub format: String,
	pub created_at: OffsetDateTime,
}
