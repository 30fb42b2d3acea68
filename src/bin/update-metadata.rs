use anyhow::{Context, Result};
use clap::Parser;
use nft_metadata_gen::cli;
use nft_metadata_gen::config::Config;
use nft_metadata_gen::patcher;
use std::path::PathBuf;
use tracing::error;

/// Point every metadata record's image at the uploaded artwork CID
#[derive(Parser)]
#[command(name = "update-metadata", version, about)]
struct Args {
    /// IPFS CID of the uploaded images directory
    #[arg(value_name = "IPFS_CID")]
    cid: String,

    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,
}

fn main() {
    cli::init_logging();
    let args: Args = cli::parse_args();

    if let Err(err) = run(args) {
        error!("{:#}", err);
        std::process::exit(cli::EXIT_FAILURE);
    }
}

fn run(args: Args) -> Result<()> {
    let cfg = Config::load_or_default(&args.config)?;
    let dir = &cfg.output.metadata_dir;

    let report = patcher::patch_image_uris(dir, &args.cid, &cfg.metadata.image_extension)
        .with_context(|| format!("メタデータの更新に失敗しました: {:?}", dir))?;

    println!("\nMetadata update complete! ({} files)", report.patched);
    println!("You can now upload the metadata directory to IPFS");
    Ok(())
}
