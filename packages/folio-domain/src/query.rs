use regex::Regex;
use serde::{Deserialize, Serialize};

/// One structured search request. Compared by value: registering the same
/// params twice for a session must resolve to the same stored query.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct QueryParams {
	pub type_of_reference: Option<String>,
	pub title: Option<String>,
	pub author: Option<String>,
	pub keywords: Option<String>,
	pub year: Option<String>,
	pub use_regex_title: bool,
	pub use_case_title: bool,
	pub use_regex_author: bool,
	pub use_case_author: bool,
	pub use_regex_keywords: bool,
	pub use_case_keywords: bool,
	pub full_text: Option<String>,
}
impl QueryParams {
	pub fn full_text_only(text: impl Into<String>) -> Self {
		Self { full_text: Some(text.into()), ..Self::default() }
	}
}

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
	#[error("Invalid year format: {0:?}.")]
	InvalidYearFormat(String),
	#[error("Invalid regex pattern in {field}: {message}")]
	InvalidRegex { field: &'static str, message: String },
}

/// Substring or regex match against a text field, case-insensitive unless
/// requested otherwise.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TextMatch {
	pub pattern: String,
	pub regex: bool,
	pub case_sensitive: bool,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Clause {
	/// Exact match on the reference type tag.
	TypeOfReference(String),
	/// Matches title OR secondary_title OR tertiary_title.
	Title(TextMatch),
	/// Matches any of the four author-role lists.
	Author(TextMatch),
	Keyword(TextMatch),
	/// Inclusive single-year match under the exclusive end_year convention:
	/// year >= value AND end_year <= value + 1.
	YearSingle(i32),
	/// Interval intersection: [year, end_year) ∩ [start, end) is non-empty.
	YearRange { start: i32, end: i32 },
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Filter {
	/// Zero clauses: unfiltered match-all.
	All,
	/// Full-text directive. Takes precedence over every structured field.
	FullText(String),
	/// Conjunction of structured clauses.
	Clauses(Vec<Clause>),
}

/// Translates structured params into a backend-agnostic filter expression.
pub fn build_filter(params: &QueryParams) -> Result<Filter, QueryError> {
	// Documented shortcut: a full-text term discards all other filters.
	if let Some(text) = params.full_text.as_deref()
		&& !text.trim().is_empty()
	{
		return Ok(Filter::FullText(text.trim().to_string()));
	}

	let mut clauses = Vec::new();

	if let Some(ty) = params.type_of_reference.as_deref()
		&& !ty.is_empty()
	{
		clauses.push(Clause::TypeOfReference(ty.to_string()));
	}
	if let Some(title) = params.title.as_deref()
		&& !title.is_empty()
	{
		clauses.push(Clause::Title(text_match(
			"title",
			title,
			params.use_regex_title,
			params.use_case_title,
		)?));
	}
	if let Some(author) = params.author.as_deref()
		&& !author.is_empty()
	{
		clauses.push(Clause::Author(text_match(
			"author",
			author,
			params.use_regex_author,
			params.use_case_author,
		)?));
	}
	if let Some(keywords) = params.keywords.as_deref()
		&& !keywords.is_empty()
	{
		clauses.push(Clause::Keyword(text_match(
			"keywords",
			keywords,
			params.use_regex_keywords,
			params.use_case_keywords,
		)?));
	}
	if let Some(year) = params.year.as_deref()
		&& !year.is_empty()
	{
		clauses.push(year_clause(year)?);
	}

	if clauses.is_empty() { Ok(Filter::All) } else { Ok(Filter::Clauses(clauses)) }
}

fn text_match(
	field: &'static str,
	pattern: &str,
	use_regex: bool,
	use_case: bool,
) -> Result<TextMatch, QueryError> {
	if use_regex {
		// Reject broken patterns here instead of surfacing a store error.
		Regex::new(pattern)
			.map_err(|err| QueryError::InvalidRegex { field, message: err.to_string() })?;
	}

	Ok(TextMatch { pattern: pattern.to_string(), regex: use_regex, case_sensitive: use_case })
}

fn year_clause(year: &str) -> Result<Clause, QueryError> {
	let year = year.trim();

	if let Some((start, end)) = year.split_once('-') {
		let start: i32 =
			start.parse().map_err(|_| QueryError::InvalidYearFormat(year.to_string()))?;
		let end: i32 = if end.is_empty() {
			start + 1
		} else {
			end.parse().map_err(|_| QueryError::InvalidYearFormat(year.to_string()))?
		};

		return Ok(Clause::YearRange { start, end });
	}

	let value: i32 = year.parse().map_err(|_| QueryError::InvalidYearFormat(year.to_string()))?;

	Ok(Clause::YearSingle(value))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn empty_params_build_match_all() {
		let filter = build_filter(&QueryParams::default()).expect("empty params are valid");

		assert_eq!(filter, Filter::All);
	}

	#[test]
	fn full_text_overrides_other_filters() {
		let params = QueryParams {
			title: Some("Van den vos Reynaerde".to_string()),
			year: Some("1987".to_string()),
			full_text: Some("reynaert".to_string()),
			..QueryParams::default()
		};
		let filter = build_filter(&params).expect("params are valid");

		assert_eq!(filter, Filter::FullText("reynaert".to_string()));
	}

	#[test]
	fn clauses_are_conjoined() {
		let params = QueryParams {
			type_of_reference: Some("JOUR".to_string()),
			author: Some("Kestemont".to_string()),
			year: Some("1987-1990".to_string()),
			..QueryParams::default()
		};
		let Filter::Clauses(clauses) = build_filter(&params).expect("params are valid") else {
			panic!("expected clauses");
		};

		assert_eq!(clauses.len(), 3);
		assert_eq!(clauses[0], Clause::TypeOfReference("JOUR".to_string()));
		assert_eq!(clauses[2], Clause::YearRange { start: 1987, end: 1990 });
	}

	#[test]
	fn text_match_defaults_to_case_insensitive_substring() {
		let params = QueryParams { title: Some("reynaert".to_string()), ..QueryParams::default() };
		let Filter::Clauses(clauses) = build_filter(&params).expect("params are valid") else {
			panic!("expected clauses");
		};
		let Clause::Title(matcher) = &clauses[0] else {
			panic!("expected title clause");
		};

		assert!(!matcher.regex);
		assert!(!matcher.case_sensitive);
	}

	#[test]
	fn open_ended_year_range_is_single_year() {
		let params = QueryParams { year: Some("1987-".to_string()), ..QueryParams::default() };
		let Filter::Clauses(clauses) = build_filter(&params).expect("params are valid") else {
			panic!("expected clauses");
		};

		assert_eq!(clauses[0], Clause::YearRange { start: 1987, end: 1988 });
	}

	#[test]
	fn malformed_year_is_rejected_not_swallowed() {
		let params = QueryParams { year: Some("long ago".to_string()), ..QueryParams::default() };
		let err = build_filter(&params).expect_err("malformed year must fail");

		assert!(matches!(err, QueryError::InvalidYearFormat(_)));
	}

	#[test]
	fn broken_regex_is_rejected() {
		let params = QueryParams {
			author: Some("(".to_string()),
			use_regex_author: true,
			..QueryParams::default()
		};
		let err = build_filter(&params).expect_err("broken regex must fail");

		assert!(matches!(err, QueryError::InvalidRegex { field: "author", .. }));
	}
}
