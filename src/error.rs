use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenError {
    #[error("failed to generate unique hash for NFT #{id} after {attempts} attempts")]
    UniquenessExhausted { id: u32, attempts: u32 },

    #[error("failed to write {failed} of {total} metadata records")]
    WriteFailures { failed: usize, total: u32 },

    #[error("artwork for NFT #{id} not found: {}", path.display())]
    MissingArtwork { id: u32, path: PathBuf },

    #[error("content locator must not be empty")]
    EmptyLocator,

    #[error("metadata record is not a JSON object: {}", .0.display())]
    InvalidRecord(PathBuf),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("upload failed: {0}")]
    Upload(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, GenError>;
