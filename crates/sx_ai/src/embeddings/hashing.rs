//! Offline bag-of-words embedder.
//!
//! Each lower-cased word is hashed (SHA-256, stable across builds) into one of
//! `dims` buckets with a hash-derived sign; the vector is L2-normalized. Lets
//! the evidence store work without a model server, and gives tests a
//! deterministic embedder with meaningful lexical similarity.

use sha2::{Digest, Sha256};
use sx_core::error::AppError;

use super::Embedder;

pub const MODEL_LABEL: &str = "hashing-bow-v1";
pub const DEFAULT_DIMS: usize = 512;

const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "does", "do", "for", "from", "how", "in",
    "is", "it", "of", "on", "or", "the", "to", "what", "when", "which", "who", "why", "with",
];

#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dims: usize,
}

impl HashingEmbedder {
    pub fn new(dims: usize) -> Self {
        Self { dims: dims.max(1) }
    }

    pub fn dims(&self) -> usize {
        self.dims
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIMS)
    }
}

impl Embedder for HashingEmbedder {
    fn embed(&self, _model: &str, input: &str) -> Result<Vec<f32>, AppError> {
        let mut v = vec![0.0f32; self.dims];
        for word in input
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(|w| w.to_lowercase())
            .filter(|w| !STOP_WORDS.contains(&w.as_str()))
        {
            let digest = Sha256::digest(word.as_bytes());
            let mut bucket_bytes = [0u8; 8];
            bucket_bytes.copy_from_slice(&digest[..8]);
            let bucket = (u64::from_le_bytes(bucket_bytes) % self.dims as u64) as usize;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            v[bucket] += sign;
        }

        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in v.iter_mut() {
                *x /= norm;
            }
        }
        Ok(v)
    }
}
