use nft_metadata_gen::cli;
use nft_metadata_gen::config::Config;
use nft_metadata_gen::generator::BatchRun;
use nft_metadata_gen::identifier::IdentifierGenerator;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::error;

/// Generate one metadata file per token plus a hash summary
#[derive(Parser)]
#[command(name = "nft-metadata-gen", version, about)]
struct Args {
    /// Path to the YAML config (built-in defaults are used if it does not exist)
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Override the collection size
    #[arg(long)]
    count: Option<u32>,

    /// Override the metadata output directory
    #[arg(short, long)]
    output: Option<PathBuf>,
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
    let mut cfg = Config::load_or_default(&args.config)?;
    if let Some(count) = args.count {
        cfg.count = count;
    }
    if let Some(output) = args.output {
        cfg.output.metadata_dir = output;
    }

    let mut source = IdentifierGenerator::from_config(&cfg)
        .context("乱数生成器の初期化に失敗しました")?;
    let report = BatchRun::new(&cfg)
        .run(&mut source)
        .with_context(|| format!("メタデータ生成に失敗しました: {:?}", cfg.output.metadata_dir))?;

    println!("\nGeneration Complete!");
    println!("-------------------");
    println!("Total NFTs: {}", report.summary.total_nfts);
    println!("Unique Hashes: {}", report.summary.hashes.len());
    println!("Retries: {}", report.retries);
    println!("Summary: {}", report.summary_path.display());
    println!("-------------------");

    Ok(())
}
