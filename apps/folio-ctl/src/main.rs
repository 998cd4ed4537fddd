use clap::Parser;

use folio_ctl::Args;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;
	let args = Args::parse();
	folio_ctl::run(args).await
}
