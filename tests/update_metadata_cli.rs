//! CLI tests for the post-upload patcher.

use assert_cmd::Command;
use nft_metadata_gen::metadata::NftMetadata;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn generate(root: &Path, count: u32) -> PathBuf {
    let config = root.join("config.yaml");
    let yaml = format!(
        "count: {count}\noutput:\n  metadata_dir: \"{}\"\nmetadata:\n  image: \"ipfs://<CID>/{{id}}.png\"\n",
        root.join("metadata").display()
    );
    fs::write(&config, yaml).unwrap();
    Command::cargo_bin("nft-metadata-gen")
        .unwrap()
        .arg("--config")
        .arg(&config)
        .assert()
        .success();
    config
}

fn snapshot(dir: &Path) -> Vec<(String, Vec<u8>)> {
    let mut files: Vec<_> = fs::read_dir(dir)
        .unwrap()
        .map(|e| {
            let path = e.unwrap().path();
            (
                path.file_name().unwrap().to_string_lossy().to_string(),
                fs::read(&path).unwrap(),
            )
        })
        .collect();
    files.sort();
    files
}

fn update_metadata() -> Command {
    Command::cargo_bin("update-metadata").unwrap()
}

#[test]
fn test_missing_cid_prints_usage_and_exits_one() {
    let root = TempDir::new().unwrap();
    let config = generate(root.path(), 2);
    let before = snapshot(&root.path().join("metadata"));

    update_metadata()
        .arg("--config")
        .arg(&config)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Usage"))
        .stderr(predicate::str::contains("IPFS_CID"));

    assert_eq!(snapshot(&root.path().join("metadata")), before);
}

#[test]
fn test_blank_cid_exits_one_without_changes() {
    let root = TempDir::new().unwrap();
    let config = generate(root.path(), 2);
    let before = snapshot(&root.path().join("metadata"));

    update_metadata()
        .arg("--config")
        .arg(&config)
        .arg("  ")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("must not be empty"));

    assert_eq!(snapshot(&root.path().join("metadata")), before);
}

#[test]
fn test_patch_rewrites_image_and_is_idempotent() {
    let root = TempDir::new().unwrap();
    let config = generate(root.path(), 3);
    let dir = root.path().join("metadata");

    let before: Vec<NftMetadata> = (1..=3)
        .map(|id| serde_json::from_slice(&fs::read(dir.join(format!("{id}.json"))).unwrap()).unwrap())
        .collect();
    assert!(before.iter().all(|m| m.image.contains("<CID>")));
    let summary_before = fs::read(dir.join("hash_summary.json")).unwrap();

    update_metadata()
        .arg("--config")
        .arg(&config)
        .arg("bafyimages")
        .assert()
        .success()
        .stdout(predicate::str::contains("3 files"));
    let once = snapshot(&dir);

    for (id, old) in (1..=3u32).zip(before) {
        let meta: NftMetadata =
            serde_json::from_slice(&fs::read(dir.join(format!("{id}.json"))).unwrap()).unwrap();
        assert_eq!(meta.image, format!("ipfs://bafyimages/{id}.png"));
        assert_eq!(NftMetadata { image: old.image.clone(), ..meta }, old);
    }
    assert_eq!(fs::read(dir.join("hash_summary.json")).unwrap(), summary_before);

    update_metadata()
        .arg("--config")
        .arg(&config)
        .arg("bafyimages")
        .assert()
        .success();
    assert_eq!(snapshot(&dir), once);
}
