//! Artwork and metadata upload to an IPFS pinning service.
//!
//! The transport sits behind [`UploadClient`]; [`NftStorageClient`] talks to the
//! NFT.Storage HTTP API. Uploads are sequential with an optional fixed delay
//! between calls. A failure on one artwork file is logged and the batch moves on.

use anyhow::{Context, Result};
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use std::fs;
use std::thread;
use std::time::Duration;
use tracing::{error, info};

use crate::artwork;
use crate::config::Config;
use crate::error::{self, GenError};
use crate::identifier::artwork_path;
use crate::metadata::{self, DeploymentInfo, HashSummary};
use crate::patcher;

/// アップロードする1ファイル分
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub bytes: Vec<u8>,
    pub mime: String,
}

pub trait UploadClient {
    /// Stores a single file and returns its CID.
    fn store_blob(&self, file: UploadFile) -> error::Result<String>;

    /// Stores a set of files as one directory and returns the directory CID.
    fn store_directory(&self, files: Vec<UploadFile>) -> error::Result<String>;
}

pub struct NftStorageClient {
    client: Client,
    endpoint: String,
    token: String,
}

#[derive(Deserialize)]
struct StoreResponse {
    ok: bool,
    value: Option<StoreValue>,
    error: Option<StoreError>,
}

#[derive(Deserialize)]
struct StoreValue {
    cid: String,
}

#[derive(Deserialize)]
struct StoreError {
    message: Option<String>,
}

impl NftStorageClient {
    pub fn new(endpoint: impl Into<String>, token: impl Into<String>) -> error::Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(120)).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    fn upload_url(&self) -> String {
        format!("{}/upload", self.endpoint)
    }

    fn parse_response(response: reqwest::blocking::Response) -> error::Result<String> {
        let status = response.status();
        let body: StoreResponse = response
            .json()
            .map_err(|e| GenError::Upload(format!("unexpected response ({status}): {e}")))?;

        match (body.ok, body.value) {
            (true, Some(value)) => Ok(value.cid),
            _ => {
                let message = body
                    .error
                    .and_then(|e| e.message)
                    .unwrap_or_else(|| "no error message".to_string());
                Err(GenError::Upload(format!("{status}: {message}")))
            }
        }
    }
}

impl UploadClient for NftStorageClient {
    fn store_blob(&self, file: UploadFile) -> error::Result<String> {
        let response = self
            .client
            .post(self.upload_url())
            .bearer_auth(&self.token)
            .header(CONTENT_TYPE, file.mime)
            .body(file.bytes)
            .send()?;
        Self::parse_response(response)
    }

    fn store_directory(&self, files: Vec<UploadFile>) -> error::Result<String> {
        let mut form = Form::new();
        for file in files {
            let part = Part::bytes(file.bytes)
                .file_name(file.name)
                .mime_str(&file.mime)?;
            form = form.part("file", part);
        }

        let response = self
            .client
            .post(self.upload_url())
            .bearer_auth(&self.token)
            .multipart(form)
            .send()?;
        Self::parse_response(response)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadReport {
    pub uploaded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub metadata_cid: String,
}

/// アートワークを1枚ずつアップロードし、最後にメタデータ一式をまとめてアップロードする
pub fn upload_collection<C: UploadClient>(cfg: &Config, client: &C) -> Result<UploadReport> {
    let summary_path = cfg.summary_path();
    let summary: HashSummary = metadata::read_json(&summary_path)
        .with_context(|| format!("ハッシュサマリーの読み込みに失敗しました: {:?}", summary_path))?;

    let delay = Duration::from_millis(cfg.upload.delay_ms);
    let mut report = UploadReport::default();

    info!(total = summary.total_nfts, "starting artwork upload");

    for token_id in 1..=summary.total_nfts {
        let path = artwork_path(&cfg.artwork, token_id);
        if !path.is_file() {
            info!(token_id, path = %path.display(), "artwork not found, skipping");
            report.skipped += 1;
            continue;
        }

        match upload_artwork(cfg, client, token_id) {
            Ok(cid) => {
                info!(token_id, %cid, "artwork uploaded");
                report.uploaded += 1;
            }
            Err(err) => {
                error!(token_id, error = %format!("{err:#}"), "artwork upload failed");
                report.failed += 1;
            }
        }

        if !delay.is_zero() && token_id < summary.total_nfts {
            thread::sleep(delay);
        }
    }

    info!(
        uploaded = report.uploaded,
        skipped = report.skipped,
        failed = report.failed,
        "artwork upload complete, uploading metadata directory"
    );

    let mut files = Vec::with_capacity(summary.total_nfts as usize);
    for token_id in 1..=summary.total_nfts {
        let path = cfg.output.metadata_dir.join(format!("{}.json", token_id));
        let bytes = fs::read(&path)
            .with_context(|| format!("メタデータの読み込みに失敗しました: {:?}", path))?;
        files.push(UploadFile {
            name: format!("{}.json", token_id),
            bytes,
            mime: "application/json".to_string(),
        });
    }

    let metadata_cid = client
        .store_directory(files)
        .context("メタデータディレクトリのアップロードに失敗しました")?;
    info!(%metadata_cid, "metadata directory uploaded");

    let deployment = DeploymentInfo {
        metadata_cid: metadata_cid.clone(),
        timestamp: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        total_nfts: summary.total_nfts,
    };
    let record_path = &cfg.upload.deployment_record;
    metadata::write_json_pretty(record_path, &deployment)
        .with_context(|| format!("デプロイ情報の書き込みに失敗しました: {:?}", record_path))?;

    report.metadata_cid = metadata_cid;
    Ok(report)
}

/// 1枚分: 圧縮 → アップロード → image を実 CID に差し替え
fn upload_artwork<C: UploadClient>(cfg: &Config, client: &C, token_id: u32) -> Result<String> {
    let path = artwork_path(&cfg.artwork, token_id);

    if let Some(c) = &cfg.artwork.png_compression {
        if c.enabled {
            artwork::compress_png(&path, c.level)?;
        }
    }

    let bytes = fs::read(&path)
        .with_context(|| format!("画像の読み込みに失敗しました: {:?}", path))?;
    let name = format!("{}.{}", token_id, cfg.artwork.extension);
    let mime = mime_guess::from_path(&path)
        .first_or_octet_stream()
        .essence_str()
        .to_string();

    let cid = client.store_blob(UploadFile { name, bytes, mime })?;

    let metadata_path = cfg.output.metadata_dir.join(format!("{}.json", token_id));
    let image = patcher::image_uri(&cid, token_id, &cfg.metadata.image_extension);
    patcher::patch_record(&metadata_path, &image)
        .with_context(|| format!("メタデータの更新に失敗しました: {:?}", metadata_path))?;

    Ok(cid)
}
