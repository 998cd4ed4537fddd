mod error;
mod types;

pub use error::{Error, Result};
pub use types::{Config, Ingest, Postgres, Qdrant, Search, Service, Sessions, Storage, Vectorizer};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::Read { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::Parse { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	for (label, value) in [
		("service.http_bind", &cfg.service.http_bind),
		("service.vectorizer_bind", &cfg.service.vectorizer_bind),
		("service.vectorizer_url", &cfg.service.vectorizer_url),
		("storage.postgres.dsn", &cfg.storage.postgres.dsn),
		("storage.qdrant.url", &cfg.storage.qdrant.url),
		("storage.qdrant.collection", &cfg.storage.qdrant.collection),
		("vectorizer.encoder_url", &cfg.vectorizer.encoder_url),
	] {
		if value.trim().is_empty() {
			return Err(Error::Invalid(format!("{label} must be non-empty.")));
		}
	}

	for (label, value) in [
		("storage.postgres.pool_max_conns", u64::from(cfg.storage.postgres.pool_max_conns)),
		("storage.qdrant.vector_dim", u64::from(cfg.storage.qdrant.vector_dim)),
		("search.max_within_ids", u64::from(cfg.search.max_within_ids)),
		("sessions.ttl_secs", cfg.sessions.ttl_secs),
		("ingest.batch_size", u64::from(cfg.ingest.batch_size)),
		("ingest.export_cap", u64::from(cfg.ingest.export_cap)),
		("vectorizer.batch_size", u64::from(cfg.vectorizer.batch_size)),
		("vectorizer.max_attempts", u64::from(cfg.vectorizer.max_attempts)),
		("vectorizer.poll_timeout_secs", cfg.vectorizer.poll_timeout_secs),
	] {
		if value == 0 {
			return Err(Error::Invalid(format!("{label} must be greater than zero.")));
		}
	}

	if !matches!(cfg.search.backend.as_str(), "auto" | "local" | "managed") {
		return Err(Error::Invalid(
			"search.backend must be one of auto, local, or managed.".to_string(),
		));
	}
	if cfg.search.default_page_size == 0 || cfg.search.default_page_size > 100 {
		return Err(Error::Invalid(
			"search.default_page_size must be in the range 1-100.".to_string(),
		));
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	cfg.search.backend = cfg.search.backend.trim().to_ascii_lowercase();

	if let Some(stripped) = cfg.service.vectorizer_url.strip_suffix('/') {
		cfg.service.vectorizer_url = stripped.to_string();
	}
	if let Some(stripped) = cfg.vectorizer.encoder_url.strip_suffix('/') {
		cfg.vectorizer.encoder_url = stripped.to_string();
	}
}
