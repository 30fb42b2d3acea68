use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::{GenError, Result};
use crate::identifier::{Candidate, IdentifierSource};
use crate::metadata::{self, Attribute, HashSummary, NftMetadata};

/// 1回の生成実行の結果
#[derive(Debug, Clone)]
pub struct GenerationReport {
    pub summary: HashSummary,
    pub summary_path: PathBuf,
    pub retries: u32,
}

/// One generation run. Owns the set of accepted identifiers and the id -> hash
/// accumulator; neither outlives the run.
pub struct BatchRun<'a> {
    cfg: &'a Config,
    used_hashes: HashSet<String>,
    hashes: BTreeMap<u32, String>,
    retries: u32,
}

impl<'a> BatchRun<'a> {
    pub fn new(cfg: &'a Config) -> Self {
        Self {
            cfg,
            used_hashes: HashSet::new(),
            hashes: BTreeMap::new(),
            retries: 0,
        }
    }

    pub fn run<S: IdentifierSource>(mut self, source: &mut S) -> Result<GenerationReport> {
        let cfg = self.cfg;
        cfg.validate()?;
        let total = cfg.count;
        let dir = &cfg.output.metadata_dir;
        fs::create_dir_all(dir)?;

        info!(total, dir = %dir.display(), "generating unique metadata");

        let mut failed = 0usize;
        for token_id in 1..=total {
            let candidate = self.accept_unique(token_id, source)?;
            let record = build_metadata(token_id, cfg, candidate);

            let path = dir.join(format!("{}.json", token_id));
            if let Err(err) = metadata::write_json_pretty(&path, &record) {
                error!(token_id, path = %path.display(), error = %err, "failed to write metadata");
                failed += 1;
            }

            if token_id % cfg.output.progress_every == 0 {
                info!("Generated {}/{} NFTs", token_id, total);
            }
        }

        // サマリーは全件書けたときだけ出す
        if failed > 0 {
            return Err(GenError::WriteFailures { failed, total });
        }

        remove_stale_records(dir, total)?;

        let summary = HashSummary {
            total_nfts: total,
            generated_at: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            hashes: self.hashes,
        };
        let summary_path = cfg.summary_path();
        metadata::write_json_pretty(&summary_path, &summary)?;

        info!(
            total,
            unique_hashes = summary.hashes.len(),
            retries = self.retries,
            summary = %summary_path.display(),
            "generation complete"
        );

        Ok(GenerationReport {
            summary,
            summary_path,
            retries: self.retries,
        })
    }

    /// 衝突しない候補が出るまで最大 max_attempts 回まで再生成する
    fn accept_unique<S: IdentifierSource>(
        &mut self,
        token_id: u32,
        source: &mut S,
    ) -> Result<Candidate> {
        let max_attempts = self.cfg.identifier.max_attempts;

        for attempt in 1..=max_attempts {
            let candidate = source.next_candidate(token_id)?;
            if self.used_hashes.insert(candidate.hash.clone()) {
                self.hashes.insert(token_id, candidate.hash.clone());
                return Ok(candidate);
            }

            warn!(token_id, attempt, hash = %candidate.hash, "duplicate hash, regenerating");
            self.retries += 1;
        }

        Err(GenError::UniquenessExhausted {
            id: token_id,
            attempts: max_attempts,
        })
    }
}

/// 前回の実行で残った id > total のレコードを削除する
fn remove_stale_records(dir: &Path, total: u32) -> Result<()> {
    let mut removed = 0usize;
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        match metadata::token_id_from_path(&path) {
            Some(token_id) if token_id > total && path.is_file() => {
                fs::remove_file(&path)?;
                removed += 1;
            }
            _ => {}
        }
    }
    if removed > 0 {
        warn!(removed, total, "removed stale records from a previous run");
    }
    Ok(())
}

/// NFT メタデータを構築
pub fn build_metadata(token_id: u32, cfg: &Config, candidate: Candidate) -> NftMetadata {
    let meta = &cfg.metadata;
    let name = if meta.name.is_empty() {
        format!("#{}", token_id)
    } else {
        format!("{} #{}", meta.name, token_id)
    };
    let description = metadata::render_template(&meta.description, token_id, cfg.count, &candidate.hash);
    let image = metadata::render_template(&meta.image, token_id, cfg.count, &candidate.hash);

    let mut attributes = vec![
        Attribute::new("Edition", token_id),
        Attribute::new("Collection", &meta.name),
    ];
    attributes.extend(
        meta.traits
            .iter()
            .map(|t| Attribute::new(&t.trait_type, &t.value)),
    );
    attributes.extend(candidate.traits);
    if meta.include_hash_trait {
        attributes.push(Attribute::new("Hash", &candidate.hash));
    }

    NftMetadata {
        name,
        description,
        image,
        attributes,
        unique_hash: candidate.hash,
        unique_elements: candidate.unique_elements,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TraitValue;
    use std::collections::VecDeque;

    /// 決められた順に候補を返すテスト用ソース
    struct Scripted(VecDeque<&'static str>);

    impl IdentifierSource for Scripted {
        fn next_candidate(&mut self, _id: u32) -> Result<Candidate> {
            let hash = self.0.pop_front().expect("script exhausted");
            Ok(Candidate::plain(hash))
        }
    }

    fn config(dir: &std::path::Path, count: u32) -> Config {
        let mut cfg = Config::default();
        cfg.count = count;
        cfg.output.metadata_dir = dir.to_path_buf();
        cfg
    }

    #[test]
    fn test_collision_is_retried() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path(), 2);
        let mut source = Scripted(VecDeque::from(vec!["QmA", "QmA", "QmA", "QmB"]));

        let report = BatchRun::new(&cfg).run(&mut source).unwrap();
        assert_eq!(report.retries, 2);
        assert_eq!(report.summary.hashes[&1], "QmA");
        assert_eq!(report.summary.hashes[&2], "QmB");
    }

    #[test]
    fn test_uniqueness_exhaustion_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(dir.path(), 2);
        cfg.identifier.max_attempts = 3;
        let mut source = Scripted(VecDeque::from(vec!["QmA", "QmA", "QmA", "QmA"]));

        let err = BatchRun::new(&cfg).run(&mut source).unwrap_err();
        assert!(matches!(err, GenError::UniquenessExhausted { id: 2, attempts: 3 }));
        assert!(err.to_string().contains("NFT #2 after 3 attempts"));
        assert!(!dir.path().join("2.json").exists());
        assert!(!cfg.summary_path().exists());
    }

    #[test]
    fn test_last_allowed_attempt_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(dir.path(), 2);
        cfg.identifier.max_attempts = 2;
        let mut source = Scripted(VecDeque::from(vec!["QmA", "QmA", "QmB"]));

        let report = BatchRun::new(&cfg).run(&mut source).unwrap();
        assert_eq!(report.summary.hashes.len(), 2);
    }

    #[test]
    fn test_blocked_record_does_not_stop_later_records() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path(), 3);
        fs::create_dir_all(dir.path().join("2.json").join("occupied")).unwrap();
        let mut source = Scripted(VecDeque::from(vec!["QmA", "QmB", "QmC"]));

        let err = BatchRun::new(&cfg).run(&mut source).unwrap_err();
        assert!(matches!(err, GenError::WriteFailures { failed: 1, total: 3 }));
        assert!(dir.path().join("1.json").is_file());
        assert!(dir.path().join("3.json").is_file());
        assert!(!dir.path().join("2.json.tmp").exists());
        assert!(!cfg.summary_path().exists());
    }

    #[test]
    fn test_zero_progress_interval_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(dir.path(), 2);
        cfg.output.progress_every = 0;
        let mut source = Scripted(VecDeque::from(vec!["QmA", "QmB"]));

        let err = BatchRun::new(&cfg).run(&mut source).unwrap_err();
        assert!(matches!(err, GenError::InvalidConfig(_)));
        assert!(!dir.path().join("1.json").exists());
    }

    #[test]
    fn test_smaller_rerun_removes_stale_records() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path(), 3);
        let mut source = Scripted(VecDeque::from(vec!["QmA", "QmB", "QmC"]));
        BatchRun::new(&cfg).run(&mut source).unwrap();

        let cfg = config(dir.path(), 1);
        let mut source = Scripted(VecDeque::from(vec!["QmD"]));
        let report = BatchRun::new(&cfg).run(&mut source).unwrap();
        assert_eq!(report.summary.hashes.len(), 1);

        let mut names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        assert_eq!(names, vec!["1.json", "hash_summary.json"]);
    }

    #[test]
    fn test_build_metadata_attribute_order() {
        let mut cfg = Config::default();
        cfg.metadata.traits.push(TraitValue {
            trait_type: "Series".to_string(),
            value: "Genesis".to_string(),
        });
        cfg.metadata.description = "Edition {id}/{total}".to_string();

        let meta = build_metadata(5, &cfg, Candidate::plain("Qm123"));
        assert_eq!(meta.name, "Digital Revolution #5");
        assert_eq!(meta.description, "Edition 5/608");
        assert_eq!(meta.image, "ipfs://Qm123/5.png");
        let types: Vec<&str> = meta.attributes.iter().map(|a| a.trait_type.as_str()).collect();
        assert_eq!(types, vec!["Edition", "Collection", "Series", "Hash"]);
        assert_eq!(meta.attributes[0].value, "5");
        assert_eq!(meta.attributes[3].value, "Qm123");
        assert_eq!(meta.unique_hash, "Qm123");
    }

    #[test]
    fn test_empty_collection_name() {
        let mut cfg = Config::default();
        cfg.metadata.name = String::new();
        cfg.metadata.include_hash_trait = false;
        let meta = build_metadata(9, &cfg, Candidate::plain("Qm9"));
        assert_eq!(meta.name, "#9");
        assert_eq!(meta.attributes.len(), 2);
    }
}
