use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NftMetadata {
    pub name: String,
    pub description: String,
    pub image: String,
    pub attributes: Vec<Attribute>,
    #[serde(rename = "uniqueHash")]
    pub unique_hash: String,
    #[serde(
        rename = "uniqueElements",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub unique_elements: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub trait_type: String,
    pub value: String,
}

impl Attribute {
    pub fn new(trait_type: impl Into<String>, value: impl ToString) -> Self {
        Self {
            trait_type: trait_type.into(),
            value: value.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HashSummary {
    #[serde(rename = "totalNFTs")]
    pub total_nfts: u32,
    #[serde(rename = "generatedAt")]
    pub generated_at: String,
    pub hashes: BTreeMap<u32, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentInfo {
    #[serde(rename = "metadataCid")]
    pub metadata_cid: String,
    pub timestamp: String,
    #[serde(rename = "totalNFTs")]
    pub total_nfts: u32,
}

/// `{id}` `{total}` `{hash}` のプレースホルダを置換
pub fn render_template(template: &str, id: u32, total: u32, hash: &str) -> String {
    template
        .replace("{id}", &id.to_string())
        .replace("{total}", &total.to_string())
        .replace("{hash}", hash)
}

/// `<id>.json` のファイル名からトークンIDを取り出す
pub fn token_id_from_path(path: &Path) -> Option<u32> {
    if path.extension().and_then(|s| s.to_str()) != Some("json") {
        return None;
    }
    path.file_stem()
        .and_then(|s| s.to_str())
        .and_then(|s| s.parse::<u32>().ok())
        .filter(|id| *id > 0)
}

/// 整形済み JSON を一時ファイル経由で書き込む（途中失敗で壊れたファイルを残さない）
pub fn write_json_pretty<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    if let Err(err) = fs::write(&tmp, json).and_then(|_| fs::rename(&tmp, path)) {
        let _ = fs::remove_file(&tmp);
        return Err(err.into());
    }
    Ok(())
}

pub fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}
