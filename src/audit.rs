use anyhow::{Context, Result};
use std::collections::{BTreeMap, HashMap};
use std::fs;

use crate::artwork;
use crate::config::Config;
use crate::metadata::{self, HashSummary, NftMetadata};

#[derive(Debug, Default)]
pub struct AuditReport {
    pub total: usize,
    /// trait_type -> value -> 出現数
    pub trait_stats: BTreeMap<String, BTreeMap<String, usize>>,
    pub duplicate_hashes: Vec<(String, Vec<u32>)>,
    pub missing_ids: Vec<u32>,
    pub summary_mismatches: Vec<String>,
    pub artwork_issues: Vec<String>,
}

impl AuditReport {
    pub fn violation_count(&self) -> usize {
        self.duplicate_hashes.len()
            + self.missing_ids.len()
            + self.summary_mismatches.len()
            + self.artwork_issues.len()
    }

    pub fn is_clean(&self) -> bool {
        self.violation_count() == 0
    }
}

/// 生成済みメタデータを検査する
pub fn audit_collection(cfg: &Config, check_artwork: bool) -> Result<AuditReport> {
    let dir = &cfg.output.metadata_dir;
    let mut report = AuditReport::default();
    let mut records: BTreeMap<u32, NftMetadata> = BTreeMap::new();

    for entry in fs::read_dir(dir)
        .with_context(|| format!("metadata ディレクトリが読めません: {:?}", dir))?
    {
        let path = entry?.path();
        let Some(token_id) = metadata::token_id_from_path(&path) else {
            continue;
        };
        let meta: NftMetadata = metadata::read_json(&path)
            .with_context(|| format!("JSON パース失敗: {:?}", path))?;
        records.insert(token_id, meta);
    }

    report.total = records.len();

    let mut by_hash: HashMap<&str, Vec<u32>> = HashMap::new();
    for (token_id, meta) in &records {
        for attr in &meta.attributes {
            *report
                .trait_stats
                .entry(attr.trait_type.clone())
                .or_default()
                .entry(attr.value.clone())
                .or_insert(0) += 1;
        }
        by_hash.entry(meta.unique_hash.as_str()).or_default().push(*token_id);
    }

    report.duplicate_hashes = by_hash
        .into_iter()
        .filter(|(_, ids)| ids.len() > 1)
        .map(|(hash, ids)| (hash.to_string(), ids))
        .collect();
    report.duplicate_hashes.sort();

    if let Some(&max_id) = records.keys().next_back() {
        report.missing_ids = (1..=max_id).filter(|id| !records.contains_key(id)).collect();
    }

    check_summary(cfg, &records, &mut report);

    if check_artwork {
        check_artwork_dimensions(cfg, &mut report)?;
    }

    Ok(report)
}

fn check_summary(cfg: &Config, records: &BTreeMap<u32, NftMetadata>, report: &mut AuditReport) {
    let path = cfg.summary_path();
    let summary: HashSummary = match metadata::read_json(&path) {
        Ok(summary) => summary,
        Err(err) => {
            report
                .summary_mismatches
                .push(format!("summary {:?} unreadable: {}", path, err));
            return;
        }
    };

    if summary.total_nfts as usize != records.len() {
        report.summary_mismatches.push(format!(
            "totalNFTs is {} but {} records were found",
            summary.total_nfts,
            records.len()
        ));
    }

    for (token_id, meta) in records {
        match summary.hashes.get(token_id) {
            Some(hash) if *hash == meta.unique_hash => {}
            Some(hash) => report.summary_mismatches.push(format!(
                "#{}: summary hash {} != record hash {}",
                token_id, hash, meta.unique_hash
            )),
            None => report
                .summary_mismatches
                .push(format!("#{}: missing from summary", token_id)),
        }
    }

    for token_id in summary.hashes.keys() {
        if !records.contains_key(token_id) {
            report
                .summary_mismatches
                .push(format!("#{}: in summary but no record file", token_id));
        }
    }
}

/// 全アートワークのサイズが揃っているか
fn check_artwork_dimensions(cfg: &Config, report: &mut AuditReport) -> Result<()> {
    let files = artwork::collect_artwork(&cfg.artwork.dir, &cfg.artwork.extension)?;
    let mut reference: Option<(u32, (u32, u32))> = None;

    for (token_id, path) in files {
        let dims = match artwork::dimensions(&path) {
            Ok(dims) => dims,
            Err(err) => {
                report.artwork_issues.push(format!("#{}: {:#}", token_id, err));
                continue;
            }
        };

        match reference {
            None => reference = Some((token_id, dims)),
            Some((ref_id, ref_dims)) if ref_dims != dims => {
                report.artwork_issues.push(format!(
                    "#{}: size {}x{} differs from #{} ({}x{})",
                    token_id, dims.0, dims.1, ref_id, ref_dims.0, ref_dims.1
                ));
            }
            Some(_) => {}
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::BatchRun;
    use crate::identifier::IdentifierGenerator;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn generate(count: u32) -> (tempfile::TempDir, Config) {
        let root = tempfile::tempdir().unwrap();
        let mut cfg = Config::default();
        cfg.count = count;
        cfg.output.metadata_dir = root.path().join("metadata");
        cfg.artwork.dir = root.path().join("art");
        let mut source = IdentifierGenerator::with_rng(&cfg, StdRng::seed_from_u64(9));
        BatchRun::new(&cfg).run(&mut source).unwrap();
        (root, cfg)
    }

    #[test]
    fn test_fresh_collection_is_clean() {
        let (_root, cfg) = generate(5);
        let report = audit_collection(&cfg, false).unwrap();
        assert!(report.is_clean(), "{:?}", report);
        assert_eq!(report.total, 5);
        assert_eq!(report.trait_stats["Collection"]["Digital Revolution"], 5);
        assert_eq!(report.trait_stats["Edition"].len(), 5);
    }

    #[test]
    fn test_duplicate_hash_and_gap_are_reported() {
        let (_root, cfg) = generate(4);
        let dir = &cfg.output.metadata_dir;

        let mut two: NftMetadata = metadata::read_json(&dir.join("2.json")).unwrap();
        let one: NftMetadata = metadata::read_json(&dir.join("1.json")).unwrap();
        two.unique_hash = one.unique_hash.clone();
        metadata::write_json_pretty(&dir.join("2.json"), &two).unwrap();
        fs::remove_file(dir.join("3.json")).unwrap();

        let report = audit_collection(&cfg, false).unwrap();
        assert_eq!(report.duplicate_hashes, vec![(one.unique_hash, vec![1, 2])]);
        assert_eq!(report.missing_ids, vec![3]);
        assert!(report.summary_mismatches.iter().any(|m| m.contains("totalNFTs is 4")));
        assert!(report.summary_mismatches.iter().any(|m| m.starts_with("#2: summary hash")));
        assert!(!report.is_clean());
    }

    #[test]
    fn test_artwork_size_mismatch() {
        let (_root, cfg) = generate(1);
        fs::create_dir_all(&cfg.artwork.dir).unwrap();
        image::RgbaImage::new(4, 4).save(cfg.artwork.dir.join("1.png")).unwrap();
        image::RgbaImage::new(4, 2).save(cfg.artwork.dir.join("2.png")).unwrap();

        let report = audit_collection(&cfg, true).unwrap();
        assert_eq!(report.artwork_issues.len(), 1);
        assert!(report.artwork_issues[0].starts_with("#2: size 4x2"));
    }
}
