//! CID-like identifiers: a fixed prefix followed by a truncated SHA-256 hex digest.

use rand::rngs::{OsRng, StdRng};
use rand::{Rng, RngCore, SeedableRng};
use serde::Serialize;
use serde_json::json;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::PathBuf;

use crate::config::{ArtworkConfig, Config, HashStrategy, IdentifierConfig};
use crate::error::{GenError, Result};
use crate::math;
use crate::metadata::Attribute;

/// 1トークン分の識別子候補
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub hash: String,
    pub unique_elements: Option<serde_json::Value>,
    pub traits: Vec<Attribute>,
}

impl Candidate {
    pub fn plain(hash: impl Into<String>) -> Self {
        Self {
            hash: hash.into(),
            unique_elements: None,
            traits: Vec::new(),
        }
    }
}

/// Produces identifier candidates for the batch writer.
pub trait IdentifierSource {
    fn next_candidate(&mut self, id: u32) -> Result<Candidate>;
}

pub struct IdentifierGenerator<R = StdRng> {
    config: IdentifierConfig,
    artwork: ArtworkConfig,
    rng: R,
}

impl IdentifierGenerator<StdRng> {
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let rng = StdRng::from_rng(OsRng).map_err(|e| GenError::Io(std::io::Error::other(e)))?;
        Ok(Self::with_rng(cfg, rng))
    }
}

impl<R: RngCore> IdentifierGenerator<R> {
    pub fn with_rng(cfg: &Config, rng: R) -> Self {
        Self {
            config: cfg.identifier.clone(),
            artwork: cfg.artwork.clone(),
            rng,
        }
    }

    fn format(&self, digest_hex: &str) -> String {
        format_identifier(&self.config.prefix, self.config.hex_len, digest_hex)
    }

    fn random_candidate(&mut self, id: u32) -> Result<Candidate> {
        #[derive(Serialize)]
        struct RandomElements {
            id: u32,
            timestamp: i64,
            random: f64,
            seed: String,
        }

        let mut seed = vec![0u8; self.config.seed_bytes];
        self.rng
            .try_fill_bytes(&mut seed)
            .map_err(|e| GenError::Io(std::io::Error::other(e)))?;

        let elements = RandomElements {
            id,
            timestamp: chrono::Utc::now().timestamp_millis(),
            random: self.rng.r#gen::<f64>(),
            seed: hex::encode(&seed),
        };
        let digest = sha256_hex(&serde_json::to_vec(&elements)?);
        Ok(Candidate::plain(self.format(&digest)))
    }

    fn variations_candidate(&mut self, id: u32) -> Result<Candidate> {
        let timestamp = chrono::Utc::now().timestamp_millis();
        let random: f64 = self.rng.r#gen();
        let f = id as f64;

        let time_hash = sha256_hex(format!("{id}-{timestamp}-{random}").as_bytes());
        let position_hash = sha256_json(&json!({
            "x": f.sin() * 1000.0,
            "y": f.cos() * 1000.0,
            "z": f.tan() * 1000.0,
        }))?;
        let color_hash = sha256_json(&json!({
            "r": (f.sin() * 255.0) % 255.0,
            "g": (f.cos() * 255.0) % 255.0,
            "b": (f.tan() * 255.0) % 255.0,
        }))?;
        let math_hash = sha256_json(&json!({
            "fibonacci": math::fibonacci(id % 100).to_string(),
            "prime": math::is_prime(id as u64),
            "factorial": math::factorial(id % 10),
        }))?;
        let trait_hash = sha256_json(&json!({
            "rarity": id % 10 + 1,
            "power": (f.sin() * 100.0) % 100.0,
            "level": id % 100 + 1,
            "experience": id as u64 * 100,
            "strength": (f.cos() * 50.0) % 50.0,
        }))?;

        let elements = json!({
            "timeHash": time_hash,
            "positionHash": position_hash,
            "colorHash": color_hash,
            "mathHash": math_hash,
            "traitHash": trait_hash,
        });
        let digest = sha256_json(&elements)?;

        let floor = |v: f64| v.floor() as i64;
        let traits = vec![
            Attribute::new("Rarity", id % 10 + 1),
            Attribute::new("Power", floor((f.sin() * 100.0) % 100.0)),
            Attribute::new("Level", id % 100 + 1),
            Attribute::new("Experience", id as u64 * 100),
            Attribute::new("Strength", floor((f.cos() * 50.0) % 50.0)),
            Attribute::new("TimeSignature", timestamp),
            Attribute::new("PositionX", floor(f.sin() * 1000.0)),
            Attribute::new("PositionY", floor(f.cos() * 1000.0)),
            Attribute::new("ColorR", floor((f.sin() * 255.0) % 255.0)),
            Attribute::new("ColorG", floor((f.cos() * 255.0) % 255.0)),
            Attribute::new("ColorB", floor((f.tan() * 255.0) % 255.0)),
        ];

        Ok(Candidate {
            hash: self.format(&digest),
            unique_elements: Some(elements),
            traits,
        })
    }

    fn content_candidate(&self, id: u32) -> Result<Candidate> {
        let path = artwork_path(&self.artwork, id);
        if !path.is_file() {
            return Err(GenError::MissingArtwork { id, path });
        }
        let bytes = fs::read(&path)?;
        Ok(Candidate::plain(self.format(&sha256_hex(&bytes))))
    }
}

impl<R: RngCore> IdentifierSource for IdentifierGenerator<R> {
    fn next_candidate(&mut self, id: u32) -> Result<Candidate> {
        match self.config.strategy {
            HashStrategy::Random => self.random_candidate(id),
            HashStrategy::Variations => self.variations_candidate(id),
            HashStrategy::Content => self.content_candidate(id),
        }
    }
}

pub fn artwork_path(artwork: &ArtworkConfig, id: u32) -> PathBuf {
    artwork.dir.join(format!("{}.{}", id, artwork.extension))
}

pub fn format_identifier(prefix: &str, hex_len: usize, digest_hex: &str) -> String {
    let end = hex_len.min(digest_hex.len());
    format!("{}{}", prefix, &digest_hex[..end])
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

fn sha256_json(value: &serde_json::Value) -> Result<String> {
    Ok(sha256_hex(&serde_json::to_vec(value)?))
}
