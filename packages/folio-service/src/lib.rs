pub mod entries;
pub mod export;
pub mod ingest;
pub mod queries;
pub mod search;
pub mod sessions;
pub mod similar;
pub mod upload;
pub mod within;

mod error;

pub use error::{Error, Result};

use std::sync::Arc;

use folio_client::TaskApi;
use folio_config::Config;
use folio_storage::{db::Db, qdrant::VectorStore, search::SearchBackend};

pub use export::ExportResponse;
pub use ingest::{IngestOutcome, IngestProgress, IngestReport, NewDoc};
pub use queries::{QueryHistoryItem, RegisterQueryRequest, RegisterQueryResponse};
pub use search::SearchRequest;
pub use sessions::SessionStore;
pub use upload::{UploadListItem, UploadStatus, UploadStatusReport};
pub use within::WithinRequest;

pub struct FolioService {
	pub cfg: Config,
	pub db: Db,
	pub vectors: VectorStore,
	pub backend: SearchBackend,
	pub sessions: SessionStore,
	pub vectorizer: Arc<dyn TaskApi>,
	// Facet menu cache; refreshed after each ingest.
	ref_types: tokio::sync::RwLock<Vec<String>>,
}
impl FolioService {
	/// Connects storage, applies the schema, and resolves the full-text
	/// strategy for this deployment.
	pub async fn new(cfg: Config, vectorizer: Arc<dyn TaskApi>) -> Result<Self> {
		let db = Db::connect(&cfg.storage.postgres).await?;

		db.ensure_schema().await?;

		let backend = db.detect_search_backend(&cfg.search.backend).await?;
		let vectors = VectorStore::new(&cfg.storage.qdrant)?;

		vectors.ensure_collection().await?;

		let sessions = SessionStore::new(std::time::Duration::from_secs(cfg.sessions.ttl_secs));
		let ref_types = tokio::sync::RwLock::new(
			folio_storage::entries::distinct_reference_types(&db.pool).await?,
		);

		Ok(Self { cfg, db, vectors, backend, sessions, vectorizer, ref_types })
	}

	/// Wipes the whole collection, vector index included.
	pub async fn reset(&self) -> Result<()> {
		self.db.reset().await?;
		self.vectors.delete_collection().await?;
		self.vectors.ensure_collection().await?;

		self.ref_types.write().await.clear();

		tracing::warn!("Collection reset; all entries and vectors are gone.");

		Ok(())
	}
}
