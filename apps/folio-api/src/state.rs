use std::{sync::Arc, time::Duration};

use folio_client::HttpTaskApi;
use folio_service::FolioService;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<FolioService>,
}
impl AppState {
	pub async fn new(config: folio_config::Config) -> color_eyre::Result<Self> {
		let vectorizer = HttpTaskApi::new(
			config.service.vectorizer_url.clone(),
			Duration::from_secs(30),
		)?;
		let service = FolioService::new(config, Arc::new(vectorizer)).await?;

		Ok(Self { service: Arc::new(service) })
	}
}
