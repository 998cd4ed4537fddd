use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Reference formats the collection accepts, in their RIS spellings.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum ReferenceType {
	#[serde(rename = "JOUR")]
	JournalArticle,
	#[serde(rename = "BOOK")]
	Book,
	#[serde(rename = "CHAP")]
	BookChapter,
	#[serde(rename = "EJOUR")]
	EJournal,
	#[serde(rename = "WEB")]
	Web,
	#[serde(rename = "JFULL")]
	JournalIssue,
	#[serde(rename = "ADVS")]
	ArchivalMaterial,
}
impl ReferenceType {
	pub const ALL: [Self; 7] = [
		Self::JournalArticle,
		Self::Book,
		Self::BookChapter,
		Self::EJournal,
		Self::Web,
		Self::JournalIssue,
		Self::ArchivalMaterial,
	];

	pub fn as_str(&self) -> &'static str {
		match self {
			Self::JournalArticle => "JOUR",
			Self::Book => "BOOK",
			Self::BookChapter => "CHAP",
			Self::EJournal => "EJOUR",
			Self::Web => "WEB",
			Self::JournalIssue => "JFULL",
			Self::ArchivalMaterial => "ADVS",
		}
	}

	pub fn parse(tag: &str) -> Option<Self> {
		Self::ALL.iter().copied().find(|ty| ty.as_str() == tag)
	}
}

/// A year value as it arrives from the interchange format: either already an
/// integer or an arbitrary string ("1987", "197X", "1987-1990", "1987-").
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(untagged)]
pub enum YearField {
	Int(i64),
	Text(String),
}

/// One unvalidated input document, straight out of the interchange parser.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct RawEntry {
	pub type_of_reference: Option<String>,
	pub title: Option<String>,
	pub secondary_title: Option<String>,
	pub tertiary_title: Option<String>,
	pub year: Option<YearField>,
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
}

/// A validated, normalized entry ready for insertion. Immutable after
/// ingestion; `content_hash` is the dedup fingerprint.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PreparedEntry {
	pub type_of_reference: ReferenceType,
	pub title: String,
	pub secondary_title: Option<String>,
	pub tertiary_title: Option<String>,
	/// Exclusive upper bound convention: a plain year 1987 stores
	/// end_year 1988. Both absent when the source had no year at all.
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
	#[serde(with = "time::serde::rfc3339")]
	pub date_added: OffsetDateTime,
}

/// An entry as returned to callers, with the store-internal id rewritten to
/// a public string id.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Entry {
	pub doc_id: String,
	#[serde(flatten)]
	pub prepared: PreparedEntry,
	/// Vector-similarity score; set only on "more like this" results.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub score: Option<f32>,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn reference_type_round_trips_through_tags() {
		for ty in ReferenceType::ALL {
			assert_eq!(ReferenceType::parse(ty.as_str()), Some(ty));
		}
		assert_eq!(ReferenceType::parse("THES"), None);
	}

	#[test]
	fn year_field_accepts_both_shapes() {
		let int: YearField = serde_json::from_str("1987").expect("int year");
		let text: YearField = serde_json::from_str("\"1987-1990\"").expect("text year");

		assert_eq!(int, YearField::Int(1987));
		assert_eq!(text, YearField::Text("1987-1990".to_string()));
	}
}
