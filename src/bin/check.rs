use anyhow::Result;
use clap::Parser;
use nft_metadata_gen::audit;
use nft_metadata_gen::cli;
use nft_metadata_gen::config::Config;
use std::path::PathBuf;
use tracing::error;

/// Verify a generated collection: hash uniqueness, summary consistency, trait distribution
#[derive(Parser)]
#[command(name = "check", version, about)]
struct Args {
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Also verify that all artwork files share the same dimensions
    #[arg(long)]
    artwork: bool,
}

fn main() {
    cli::init_logging();
    let args: Args = cli::parse_args();

    match run(args) {
        Ok(true) => {}
        Ok(false) => std::process::exit(cli::EXIT_FAILURE),
        Err(err) => {
            error!("{:#}", err);
            std::process::exit(cli::EXIT_FAILURE);
        }
    }
}

fn run(args: Args) -> Result<bool> {
    let cfg = Config::load_or_default(&args.config)?;
    let report = audit::audit_collection(&cfg, args.artwork)?;
    let total = report.total;
    let max_examples = 20usize;

    println!("==============================");
    println!(" NFT Collection Check");
    println!(" Total tokens: {}", total);
    println!("==============================\n");

    for (trait_type, values) in &report.trait_stats {
        // Edition / Hash はトークンごとに一意なので分布を出さない
        if values.len() == total && total > 1 {
            println!("▶ Trait: {} ({} distinct values)\n", trait_type, values.len());
            continue;
        }

        println!("▶ Trait: {}", trait_type);

        let mut sorted: Vec<_> = values.iter().collect();
        sorted.sort_by(|a, b| b.1.cmp(a.1));

        for (value, count) in sorted {
            let ratio = *count as f64 / total as f64 * 100.0;
            println!("  {:30} {:5} ({:.2}%)", value, count, ratio);
        }
        println!();
    }

    println!("==============================");
    println!(" Uniqueness / Consistency Check");
    println!(" Violations: {}", report.violation_count());
    println!("==============================");

    if report.is_clean() {
        println!("✅ 問題は見つかりませんでした");
        return Ok(true);
    }

    println!("❌ 問題が見つかりました（各項目最大 {} 件表示）:", max_examples);
    for (hash, ids) in report.duplicate_hashes.iter().take(max_examples) {
        println!("  - duplicate hash {} : {:?}", hash, ids);
    }
    if !report.missing_ids.is_empty() {
        let shown: Vec<_> = report.missing_ids.iter().take(max_examples).collect();
        println!("  - missing ids : {:?}", shown);
    }
    for msg in report.summary_mismatches.iter().take(max_examples) {
        println!("  - summary : {}", msg);
    }
    for msg in report.artwork_issues.iter().take(max_examples) {
        println!("  - artwork : {}", msg);
    }

    Ok(false)
}
