//! Rewrites the `image` field of generated records once the real content
//! locator is known. Every other field, including field order, is kept.

use std::fs;
use std::path::Path;

use serde_json::Value;
use tracing::{debug, info};

use crate::error::{GenError, Result};
use crate::metadata;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatchReport {
    pub patched: usize,
    pub skipped: usize,
}

pub fn image_uri(locator: &str, token_id: u32, image_ext: &str) -> String {
    format!("ipfs://{}/{}.{}", locator, token_id, image_ext)
}

/// ディレクトリ内の全 `<id>.json` の image を差し替える
pub fn patch_image_uris(dir: &Path, locator: &str, image_ext: &str) -> Result<PatchReport> {
    let locator = locator.trim();
    if locator.is_empty() {
        return Err(GenError::EmptyLocator);
    }

    let mut records = Vec::new();
    let mut report = PatchReport::default();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        match metadata::token_id_from_path(&path) {
            Some(token_id) if path.is_file() => records.push((token_id, path)),
            _ => {
                debug!(path = %path.display(), "not a token record, skipping");
                report.skipped += 1;
            }
        }
    }
    records.sort_by_key(|(token_id, _)| *token_id);

    for (token_id, path) in records {
        patch_record(&path, &image_uri(locator, token_id, image_ext))?;
        debug!(token_id, "updated metadata");
        report.patched += 1;
    }

    info!(patched = report.patched, locator, "metadata update complete");
    Ok(report)
}

/// 1ファイルの image だけを書き換える
pub fn patch_record(path: &Path, image: &str) -> Result<()> {
    let mut record: Value = metadata::read_json(path)?;
    let object = record
        .as_object_mut()
        .ok_or_else(|| GenError::InvalidRecord(path.to_path_buf()))?;
    object.insert("image".to_string(), Value::String(image.to_string()));
    metadata::write_json_pretty(path, &record)
}
