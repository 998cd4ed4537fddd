use std::sync::Arc;

use folio_storage::db::Db;
use tokio::sync::Mutex;

use crate::{
	runner::{ModelRunner, RemoteRunner},
	task::RunnerConfig,
};

#[derive(Clone)]
pub struct AppState {
	pub db: Db,
	pub runner: Arc<dyn ModelRunner>,
	// Single permit; the encoder handles one batch at a time.
	pub gpu: Arc<Mutex<()>>,
	pub runner_cfg: RunnerConfig,
}
impl AppState {
	pub async fn new(config: &folio_config::Config) -> color_eyre::Result<Self> {
		let db = Db::connect(&config.storage.postgres).await?;

		db.ensure_schema().await?;

		let runner = RemoteRunner::new(&config.vectorizer)?;

		Ok(Self {
			db,
			runner: Arc::new(runner),
			gpu: Arc::new(Mutex::new(())),
			runner_cfg: RunnerConfig::from_config(&config.vectorizer),
		})
	}
}
