#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Sqlx(#[from] sqlx::Error),
	#[error("Invalid argument: {0}")]
	InvalidArgument(String),
	#[error("Not found: {0}")]
	NotFound(String),
	#[error("Conflict: {0}")]
	Conflict(String),
	#[error(transparent)]
	Qdrant(#[from] Box<qdrant_client::QdrantError>),
}
impl From<qdrant_client::QdrantError> for Error {
	fn from(err: qdrant_client::QdrantError) -> Self {
		Self::Qdrant(Box::new(err))
	}
}
impl Error {
	/// Unique-constraint violations are an expected steady-state condition
	/// (content-hash dedup, duplicate task ids), so callers need to tell
	/// them apart from real storage failures.
	pub fn is_unique_violation(&self) -> bool {
		let Self::Sqlx(sqlx::Error::Database(err)) = self else {
			return false;
		};

		err.code().as_deref() == Some("23505")
	}
}
