use anyhow::Result;
use clap::Parser;
use nft_metadata_gen::cli;
use nft_metadata_gen::config::Config;
use nft_metadata_gen::upload::{self, NftStorageClient};
use std::path::PathBuf;
use tracing::error;

/// Upload artwork and metadata to NFT.Storage and record the metadata CID
#[derive(Parser)]
#[command(name = "upload", version, about)]
struct Args {
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// NFT.Storage API token
    #[arg(
        long,
        env = "NFT_STORAGE_TOKEN",
        hide_env_values = true,
        value_parser = clap::builder::NonEmptyStringValueParser::new()
    )]
    token: String,

    /// Override the delay between artwork uploads (milliseconds)
    #[arg(long)]
    delay_ms: Option<u64>,
}

fn main() {
    cli::init_logging();
    let args: Args = cli::parse_args();

    if let Err(err) = run(args) {
        error!("Error during upload: {:#}", err);
        std::process::exit(cli::EXIT_FAILURE);
    }
}

fn run(args: Args) -> Result<()> {
    let mut cfg = Config::load_or_default(&args.config)?;
    if let Some(delay_ms) = args.delay_ms {
        cfg.upload.delay_ms = delay_ms;
    }

    let client = NftStorageClient::new(&cfg.upload.endpoint, args.token)?;
    let report = upload::upload_collection(&cfg, &client)?;

    println!("Upload completed successfully!");
    println!(
        "Artwork: {} uploaded, {} skipped, {} failed",
        report.uploaded, report.skipped, report.failed
    );
    println!("Metadata CID: {}", report.metadata_cid);
    Ok(())
}
