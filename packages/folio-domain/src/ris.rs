use crate::entry::{RawEntry, YearField};

/// One parsed interchange record together with its original text, which is
/// persisted verbatim as the source-of-truth copy for later export.
#[derive(Clone, Debug)]
pub struct RisRecord {
	pub raw: String,
	pub entry: RawEntry,
}

#[derive(Debug, thiserror::Error)]
pub enum RisError {
	#[error("Input contains no records.")]
	Empty,
	#[error("Malformed line {line}: {text:?}.")]
	MalformedLine { line: usize, text: String },
	#[error("Record starting at line {line} is missing its ER terminator.")]
	UnterminatedRecord { line: usize },
}

/// Reads RIS-formatted text: records open with `TY  - ` and close with
/// `ER  - `; repeated tags accumulate into lists. Unknown tags are skipped,
/// not rejected.
pub fn parse(input: &str) -> Result<Vec<RisRecord>, RisError> {
	let mut records = Vec::new();
	let mut current: Option<(usize, RawEntry, Vec<&str>)> = None;

	for (idx, line) in input.lines().enumerate() {
		let line_no = idx + 1;
		let trimmed = line.trim_end();

		if trimmed.is_empty() {
			continue;
		}

		let Some((tag, value)) = split_tag(trimmed) else {
			if current.is_some() {
				// Continuation line of the previous value; kept only in the
				// raw copy.
				if let Some((_, _, lines)) = current.as_mut() {
					lines.push(trimmed);
				}

				continue;
			}

			return Err(RisError::MalformedLine { line: line_no, text: trimmed.to_string() });
		};

		match tag {
			"TY" => {
				if let Some((line, _, _)) = &current {
					return Err(RisError::UnterminatedRecord { line: *line });
				}

				let mut entry = RawEntry::default();

				apply_tag(&mut entry, tag, value);
				current = Some((line_no, entry, vec![trimmed]));
			},
			"ER" => {
				let Some((_, entry, mut lines)) = current.take() else {
					return Err(RisError::MalformedLine {
						line: line_no,
						text: trimmed.to_string(),
					});
				};

				lines.push(trimmed);
				records.push(RisRecord { raw: lines.join("\n"), entry });
			},
			_ => {
				let Some((_, entry, lines)) = current.as_mut() else {
					return Err(RisError::MalformedLine {
						line: line_no,
						text: trimmed.to_string(),
					});
				};

				apply_tag(entry, tag, value);
				lines.push(trimmed);
			},
		}
	}

	if let Some((line, _, _)) = current {
		return Err(RisError::UnterminatedRecord { line });
	}
	if records.is_empty() {
		return Err(RisError::Empty);
	}

	Ok(records)
}

fn split_tag(line: &str) -> Option<(&str, &str)> {
	let (tag, rest) = line.split_at_checked(2)?;

	if !tag.bytes().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit()) {
		return None;
	}

	let value = rest.strip_prefix("  - ").or_else(|| rest.strip_prefix("  -"))?;

	Some((tag, value.trim()))
}

fn apply_tag(entry: &mut RawEntry, tag: &str, value: &str) {
	if value.is_empty() {
		return;
	}

	let value = value.to_string();

	match tag {
		"TY" => entry.type_of_reference = Some(value),
		"TI" | "T1" => entry.title = Some(value),
		"T2" => entry.secondary_title = Some(value),
		"T3" => entry.tertiary_title = Some(value),
		"AU" => entry.authors.push(value),
		"A1" => entry.first_authors.push(value),
		"A2" => entry.secondary_authors.push(value),
		"A3" => entry.tertiary_authors.push(value),
		"KW" => entry.keywords.push(value),
		"PY" | "Y1" => entry.year = Some(YearField::Text(value)),
		"JO" | "JF" => entry.journal_name = Some(value),
		"SP" => entry.start_page = Some(value),
		"EP" => entry.end_page = Some(value),
		"VL" => entry.volume = Some(value),
		"IS" => entry.number = Some(value),
		"ET" => entry.edition = Some(value),
		"SN" => entry.issn = Some(value),
		"PB" => entry.publisher = Some(value),
		"CY" => entry.place_published = Some(value),
		"UR" => entry.urls.push(value),
		"N1" => entry.note = Some(value),
		"RN" => entry.research_notes = Some(value),
		"LB" => entry.label = Some(value),
		"DB" => entry.name_of_database = Some(value),
		_ => {},
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const SAMPLE: &str = "\
TY  - JOUR
TI  - Van den vos Reynaerde
T2  - Tijdschrift voor Nederlandse Taal- en Letterkunde
AU  - Bouwman, A.
AU  - Besamusca, B.
KW  - Reynaert
PY  - 1987
ER  -
TY  - BOOK
TI  - Stemmen op schrift
AU  - Van Oostrom, F.
PY  - 2006
ER  -
";

	#[test]
	fn parses_multiple_records() {
		let records = parse(SAMPLE).expect("sample is valid");

		assert_eq!(records.len(), 2);
		assert_eq!(records[0].entry.title.as_deref(), Some("Van den vos Reynaerde"));
		assert_eq!(records[0].entry.authors.len(), 2);
		assert_eq!(records[1].entry.type_of_reference.as_deref(), Some("BOOK"));
	}

	#[test]
	fn raw_copy_preserves_the_record_text() {
		let records = parse(SAMPLE).expect("sample is valid");

		assert!(records[0].raw.starts_with("TY  - JOUR"));
		assert!(records[0].raw.ends_with("ER  -"));
	}

	#[test]
	fn unterminated_record_is_rejected() {
		let err = parse("TY  - JOUR\nTI  - No terminator\n").expect_err("must fail");

		assert!(matches!(err, RisError::UnterminatedRecord { line: 1 }));
	}

	#[test]
	fn empty_input_is_rejected() {
		assert!(matches!(parse(""), Err(RisError::Empty)));
	}

	#[test]
	fn unknown_tags_are_skipped() {
		let records =
			parse("TY  - JOUR\nTI  - Title\nZZ  - ignored\nER  -\n").expect("sample is valid");

		assert_eq!(records[0].entry.title.as_deref(), Some("Title"));
	}
}
