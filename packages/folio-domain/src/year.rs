use std::sync::LazyLock;

use regex::Regex;

use crate::entry::YearField;

/// Undefined trailing digits (e.g. "197X") are resolved to the middle of the
/// decade. A single deterministic guess, not a range.
const PLACEHOLDER_DIGIT: char = '5';

static RANGE_RE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^([0-9]{4})-([0-9]{4})?").expect("static pattern"));

#[derive(Debug, thiserror::Error)]
#[error("Unparseable year value: {0:?}.")]
pub struct YearError(pub String);

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct YearSpan {
	pub year: i32,
	/// Exclusive upper bound; a plain year stores `year + 1`.
	pub end_year: i32,
}

/// Normalizes the many input shapes of the year field. `None` input is not
/// an error: the record passes through without a span and stays unreachable
/// by year-range queries.
pub fn normalize(raw: Option<&YearField>) -> Result<Option<YearSpan>, YearError> {
	let Some(raw) = raw else {
		return Ok(None);
	};

	match raw {
		YearField::Int(value) => {
			let year = i32::try_from(*value).map_err(|_| YearError(value.to_string()))?;

			Ok(Some(YearSpan { year, end_year: year + 1 }))
		},
		YearField::Text(text) => normalize_text(text.trim()).map(Some),
	}
}

fn normalize_text(text: &str) -> Result<YearSpan, YearError> {
	if let Ok(year) = text.parse::<i32>() {
		return Ok(YearSpan { year, end_year: year + 1 });
	}

	// Substitute the masked digit first so masked ranges ("197X-",
	// "197X-1985") still reach the range branch below.
	if text.contains('X') {
		let guessed = text.replace('X', &PLACEHOLDER_DIGIT.to_string());

		return normalize_text(&guessed).map_err(|_| YearError(text.to_string()));
	}

	if text.contains('-') {
		let captures = RANGE_RE.captures(text).ok_or_else(|| YearError(text.to_string()))?;
		let start: i32 = captures[1].parse().map_err(|_| YearError(text.to_string()))?;
		let end = match captures.get(2) {
			Some(end) => end.as_str().parse().map_err(|_| YearError(text.to_string()))?,
			// Open-ended ranges ("1987-") fall back to the start year.
			None => start + 1,
		};

		return Ok(YearSpan { year: start, end_year: end });
	}

	Err(YearError(text.to_string()))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::entry::YearField;

	fn text(value: &str) -> Option<YearField> {
		Some(YearField::Text(value.to_string()))
	}

	#[test]
	fn plain_integer_year() {
		let span = normalize(Some(&YearField::Int(1987))).expect("valid year").expect("span");

		assert_eq!(span, YearSpan { year: 1987, end_year: 1988 });
	}

	#[test]
	fn plain_text_year() {
		let span = normalize(text("1987").as_ref()).expect("valid year").expect("span");

		assert_eq!(span, YearSpan { year: 1987, end_year: 1988 });
	}

	#[test]
	fn range_year() {
		let span = normalize(text("1987-1990").as_ref()).expect("valid year").expect("span");

		assert_eq!(span, YearSpan { year: 1987, end_year: 1990 });
	}

	#[test]
	fn open_ended_range_year() {
		let span = normalize(text("1987-").as_ref()).expect("valid year").expect("span");

		assert_eq!(span, YearSpan { year: 1987, end_year: 1988 });
	}

	#[test]
	fn placeholder_digit_year() {
		let span = normalize(text("197X").as_ref()).expect("valid year").expect("span");

		assert_eq!(span, YearSpan { year: 1975, end_year: 1976 });
	}

	#[test]
	fn placeholder_digit_open_ended_range() {
		let span = normalize(text("197X-").as_ref()).expect("valid year").expect("span");

		assert_eq!(span, YearSpan { year: 1975, end_year: 1976 });
	}

	#[test]
	fn placeholder_digit_closed_range() {
		let span = normalize(text("197X-1985").as_ref()).expect("valid year").expect("span");

		assert_eq!(span, YearSpan { year: 1975, end_year: 1985 });
	}

	#[test]
	fn garbage_year_fails() {
		normalize(text("abc").as_ref()).expect_err("garbage must fail");
	}

	#[test]
	fn missing_year_passes_through() {
		assert!(normalize(None).expect("missing year is not an error").is_none());
	}
}
