use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub search: Search,
	pub sessions: Sessions,
	pub ingest: Ingest,
	pub vectorizer: Vectorizer,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub vectorizer_bind: String,
	/// Base URL the API and CLI use to reach the vectorizer RPC surface.
	pub vectorizer_url: String,
	pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
	pub qdrant: Qdrant,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Qdrant {
	pub url: String,
	pub collection: String,
	pub vector_dim: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Search {
	/// "auto" probes the deployment once at connect time; "local" and
	/// "managed" force a strategy.
	#[serde(default = "default_backend")]
	pub backend: String,
	#[serde(default = "default_page_size")]
	pub default_page_size: u32,
	/// Cap on the id set a "search within results" narrowing may re-scope.
	#[serde(default = "default_max_within_ids")]
	pub max_within_ids: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Sessions {
	pub ttl_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Ingest {
	pub batch_size: u32,
	/// Maximum number of source records a single export request may return.
	pub export_cap: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Vectorizer {
	pub encoder_url: String,
	pub encoder_timeout_ms: u64,
	pub batch_size: u32,
	pub max_attempts: u32,
	pub retry_delay_secs: u64,
	/// Caller-side wall-clock ceiling on polling; the remote task is not
	/// cancelled when it elapses.
	pub poll_timeout_secs: u64,
}

fn default_backend() -> String {
	"auto".to_string()
}

fn default_page_size() -> u32 {
	10
}

fn default_max_within_ids() -> u32 {
	300_000
}
