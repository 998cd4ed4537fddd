use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;
	let args = folio_vectorizer::Args::parse();
	folio_vectorizer::run(args).await
}
