use std::{fs, path::PathBuf, sync::Arc, time::Duration};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{self, eyre};
use uuid::Uuid;

use folio_client::{HttpTaskApi, VectorizeOutcome};
use folio_domain::{ris, task::SubmitRequest};
use folio_service::FolioService;

#[derive(Debug, Parser)]
#[command(
	version = folio_cli::VERSION,
	rename_all = "kebab",
	styles = folio_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	#[command(subcommand)]
	pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
	/// Parse a RIS file and load its records into the collection.
	Ingest {
		#[arg(value_name = "FILE")]
		file: PathBuf,
		/// Also vectorize the newly inserted entries. Without this flag
		/// they stay searchable but invisible to similarity queries.
		#[arg(long)]
		vectorize: bool,
	},
	/// Drop every entry, registered query, upload, and vector.
	Reset {
		/// Required; resets are not reversible.
		#[arg(long)]
		yes: bool,
	},
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = folio_config::load(&args.config)?;
	init_tracing(&config)?;
	let vectorizer = HttpTaskApi::new(
		config.service.vectorizer_url.clone(),
		Duration::from_secs(30),
	)?;
	let poll_timeout = Duration::from_secs(config.vectorizer.poll_timeout_secs);
	let service = FolioService::new(config, Arc::new(vectorizer)).await?;

	match args.command {
		Command::Ingest { file, vectorize } =>
			ingest(&service, &file, vectorize, poll_timeout).await,
		Command::Reset { yes } => {
			if !yes {
				return Err(eyre!("Refusing to reset without --yes."));
			}

			service.reset().await?;

			println!("Collection reset.");

			Ok(())
		},
	}
}

async fn ingest(
	service: &FolioService,
	file: &PathBuf,
	vectorize: bool,
	poll_timeout: Duration,
) -> color_eyre::Result<()> {
	let payload = fs::read_to_string(file)?;
	let records = ris::parse(&payload)?;

	println!("Parsed {} record(s) from {}.", records.len(), file.display());

	let outcome = service.ingest_records(&records).await?;
	let report = &outcome.report;

	println!(
		"Ingested: {} inserted, {} duplicate(s), {} received.",
		report.inserted, report.duplicates, report.received
	);

	for (reason, count) in &report.dropped {
		println!("Dropped {count} record(s): {reason}.");
	}

	if !vectorize || outcome.new_docs.is_empty() {
		return Ok(());
	}

	let submit = SubmitRequest {
		task_id: Uuid::new_v4().to_string(),
		texts: outcome.new_docs.iter().map(|doc| doc.text.clone()).collect(),
		doc_ids: outcome.new_docs.iter().map(|doc| doc.doc_id.to_string()).collect(),
	};

	match folio_client::vectorize(service.vectorizer.as_ref(), &submit, poll_timeout).await? {
		VectorizeOutcome::Done(vectors) => {
			let n = vectors.len();

			service
				.vectors
				.upsert(vectors.into_iter().map(|slot| (slot.doc_id, slot.vector)).collect())
				.await?;

			let indexed = service.vectors.point_count().await?;

			println!("Vectorized {n} entries; {indexed} vectors indexed in total.");

			Ok(())
		},
		VectorizeOutcome::Failed(snapshot) => Err(eyre!(
			"Vectorization task {} failed in state {}.",
			snapshot.task_id,
			snapshot.current_status.state.as_str()
		)),
		VectorizeOutcome::TimedOut { task_id } => {
			println!(
				"Polling timed out; task {task_id} is still running on the vectorizer."
			);

			Ok(())
		},
	}
}

fn init_tracing(config: &folio_config::Config) -> eyre::Result<()> {
	let filter = tracing_subscriber::EnvFilter::try_new(&config.service.log_level)
		.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
	tracing_subscriber::fmt().with_env_filter(filter).init();
	Ok(())
}
