use serde::Deserialize;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::GenError;

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("設定ファイルの読み込みに失敗しました: {:?}", path))?;
        let config: Config = serde_yaml::from_str(&text)
            .with_context(|| format!("設定ファイルの解析に失敗しました: {:?}", path))?;
        config.validate()?;
        Ok(config)
    }

    /// ファイルがあれば読み込み、無ければ組み込みの既定値を使う
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            info!(path = %path.display(), "config file not found, using built-in defaults");
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<(), GenError> {
        let id = &self.identifier;
        if id.hex_len == 0 || id.hex_len > 64 {
            return Err(GenError::InvalidConfig(format!(
                "identifier.hex_len must be within 1..=64, got {}",
                id.hex_len
            )));
        }
        if id.max_attempts == 0 {
            return Err(GenError::InvalidConfig(
                "identifier.max_attempts must be at least 1".to_string(),
            ));
        }
        if id.seed_bytes == 0 {
            return Err(GenError::InvalidConfig(
                "identifier.seed_bytes must be at least 1".to_string(),
            ));
        }
        if self.output.progress_every == 0 {
            return Err(GenError::InvalidConfig(
                "output.progress_every must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn summary_path(&self) -> PathBuf {
        self.output.metadata_dir.join(&self.output.summary_file)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub count: u32,
    pub output: OutputConfig,
    pub metadata: MetadataConfig,
    pub identifier: IdentifierConfig,
    pub artwork: ArtworkConfig,
    pub upload: UploadConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            count: 608,
            output: OutputConfig::default(),
            metadata: MetadataConfig::default(),
            identifier: IdentifierConfig::default(),
            artwork: ArtworkConfig::default(),
            upload: UploadConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub metadata_dir: PathBuf,
    pub summary_file: String,
    pub progress_every: u32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            metadata_dir: PathBuf::from("metadata"),
            summary_file: "hash_summary.json".to_string(),
            progress_every: 50,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    pub name: String,
    /// `{id}` `{total}` `{hash}` を置換する
    pub description: String,
    /// 既定は `ipfs://{hash}/{id}.png`
    pub image: String,
    pub image_extension: String,
    pub traits: Vec<TraitValue>,
    pub include_hash_trait: bool,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            name: "Digital Revolution".to_string(),
            description: "Part of the Digital Revolution collection, representing the convergence of art and technology.".to_string(),
            image: "ipfs://{hash}/{id}.png".to_string(),
            image_extension: "png".to_string(),
            traits: Vec::new(),
            include_hash_trait: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TraitValue {
    pub trait_type: String,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashStrategy {
    Random,
    Variations,
    Content,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IdentifierConfig {
    pub strategy: HashStrategy,
    pub prefix: String,
    pub hex_len: usize,
    pub seed_bytes: usize,
    pub max_attempts: u32,
}

impl Default for IdentifierConfig {
    fn default() -> Self {
        Self {
            strategy: HashStrategy::Random,
            prefix: "Qm".to_string(),
            hex_len: 44,
            seed_bytes: 32,
            max_attempts: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ArtworkConfig {
    pub dir: PathBuf,
    pub extension: String,
    pub png_compression: Option<PngCompressionConfig>,
}

impl Default for ArtworkConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("art"),
            extension: "png".to_string(),
            png_compression: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PngCompressionConfig {
    pub enabled: bool,
    pub level: u8,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub endpoint: String,
    pub delay_ms: u64,
    pub deployment_record: PathBuf,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.nft.storage".to_string(),
            delay_ms: 1000,
            deployment_record: PathBuf::from("deployment-info.json"),
        }
    }
}
