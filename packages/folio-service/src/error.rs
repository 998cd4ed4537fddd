pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error("Conflict: {message}")]
	Conflict { message: String },
	#[error("Session is unknown or has expired.")]
	SessionExpired,
	#[error("Storage error: {message}")]
	Storage { message: String },
	#[error("Qdrant error: {message}")]
	Qdrant { message: String },
	#[error("Vectorizer error: {message}")]
	Vectorizer { message: String },
}
impl From<sqlx::Error> for Error {
	fn from(err: sqlx::Error) -> Self {
		Self::Storage { message: err.to_string() }
	}
}

impl From<folio_storage::Error> for Error {
	fn from(err: folio_storage::Error) -> Self {
		match err {
			folio_storage::Error::Sqlx(inner) => Self::Storage { message: inner.to_string() },
			folio_storage::Error::InvalidArgument(message) => Self::InvalidRequest { message },
			folio_storage::Error::NotFound(message) => Self::NotFound { message },
			folio_storage::Error::Conflict(message) => Self::Conflict { message },
			folio_storage::Error::Qdrant(inner) => Self::Qdrant { message: inner.to_string() },
		}
	}
}

impl From<folio_domain::query::QueryError> for Error {
	fn from(err: folio_domain::query::QueryError) -> Self {
		Self::InvalidRequest { message: err.to_string() }
	}
}

impl From<folio_domain::page::PageError> for Error {
	fn from(err: folio_domain::page::PageError) -> Self {
		Self::InvalidRequest { message: err.to_string() }
	}
}

impl From<folio_domain::ris::RisError> for Error {
	fn from(err: folio_domain::ris::RisError) -> Self {
		Self::InvalidRequest { message: err.to_string() }
	}
}

impl From<folio_client::Error> for Error {
	fn from(err: folio_client::Error) -> Self {
		Self::Vectorizer { message: err.to_string() }
	}
}
