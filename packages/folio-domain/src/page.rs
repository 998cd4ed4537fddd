use serde::{Deserialize, Serialize};

pub const MAX_PAGE_SIZE: u32 = 100;
/// Pages shown on each side of the current one: a fixed 9-page window.
const WINDOW_RADIUS: u32 = 4;

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
	Ascending,
	Descending,
	#[default]
	#[serde(rename = "")]
	Unsorted,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SortField {
	Author,
	Year,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SortKey {
	pub field: SortField,
	pub descending: bool,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct PageParams {
	pub page: u32,
	pub size: u32,
	pub sort_author: SortDirection,
	pub sort_year: SortDirection,
}
impl Default for PageParams {
	fn default() -> Self {
		Self {
			page: 1,
			size: 10,
			sort_author: SortDirection::Unsorted,
			sort_year: SortDirection::Unsorted,
		}
	}
}
impl PageParams {
	pub fn validate(&self) -> Result<(), PageError> {
		if self.page == 0 {
			return Err(PageError::PageOutOfRange(self.page));
		}
		if self.size == 0 || self.size > MAX_PAGE_SIZE {
			return Err(PageError::SizeOutOfRange(self.size));
		}

		Ok(())
	}

	pub fn skip(&self) -> u64 {
		u64::from(self.page - 1) * u64::from(self.size)
	}

	/// Requested ordering, author key before year key. An unsorted direction
	/// drops the key from the ordering entirely.
	pub fn sort_keys(&self) -> Vec<SortKey> {
		let mut keys = Vec::with_capacity(2);

		if let Some(descending) = direction(self.sort_author) {
			keys.push(SortKey { field: SortField::Author, descending });
		}
		if let Some(descending) = direction(self.sort_year) {
			keys.push(SortKey { field: SortField::Year, descending });
		}

		keys
	}
}

#[derive(Debug, thiserror::Error)]
pub enum PageError {
	#[error("Page number {0} is out of range; pages start at 1.")]
	PageOutOfRange(u32),
	#[error("Page size {0} is out of range; sizes are 1-{MAX_PAGE_SIZE}.")]
	SizeOutOfRange(u32),
}

fn direction(dir: SortDirection) -> Option<bool> {
	match dir {
		SortDirection::Ascending => Some(false),
		SortDirection::Descending => Some(true),
		SortDirection::Unsorted => None,
	}
}

/// One page of results with navigation metadata.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PagedResult<T> {
	pub n_hits: u64,
	pub page: u32,
	pub size: u32,
	pub from_page: u32,
	pub to_page: u32,
	pub total_pages: u32,
	/// Size of the parent result set when this page came out of a
	/// "search within results" narrowing.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub parent_n_hits: Option<u64>,
	pub items: Vec<T>,
}
impl<T> PagedResult<T> {
	pub fn new(n_hits: u64, params: &PageParams, items: Vec<T>) -> Self {
		let (from_page, to_page, total_pages) = window(params.page, n_hits, params.size);

		Self {
			n_hits,
			page: params.page,
			size: params.size,
			from_page,
			to_page,
			total_pages,
			parent_n_hits: None,
			items,
		}
	}

	pub fn with_parent(mut self, parent_n_hits: u64) -> Self {
		self.parent_n_hits = Some(parent_n_hits);

		self
	}
}

/// Sliding navigation window centered on the current page, clamped to
/// [1, total_pages].
pub fn window(page: u32, n_hits: u64, size: u32) -> (u32, u32, u32) {
	let total_pages = n_hits.div_ceil(u64::from(size)).min(u64::from(u32::MAX)) as u32;
	let from_page = page.saturating_sub(WINDOW_RADIUS).max(1);
	let to_page = page.saturating_add(WINDOW_RADIUS).min(total_pages);

	(from_page, to_page, total_pages)
}
