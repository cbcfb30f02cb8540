use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Returned in place of hits when a query arrives before the store is ready.
pub const NOT_INITIALIZED_MESSAGE: &str =
    "The sports knowledge base is not initialized. Please wait for the system to process the knowledge base.";

/// A document read from the knowledge base, before chunking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    /// File name only, e.g. `cricket.pdf`.
    pub name: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EvidenceChunk {
    pub chunk_id: String,
    pub source_name: String,
    /// Position in ingestion order across the whole store.
    pub ordinal: u32,
    pub text: String,
    pub text_sha256: String,
}

impl EvidenceChunk {
    pub fn new(source_name: &str, ordinal: u32, text: impl Into<String>) -> Self {
        let text = text.into();
        let text_sha256 = sha256_hex(text.as_bytes());
        let chunk_id = sha256_hex(format!("v1|{source_name}|{ordinal}|{text_sha256}").as_bytes());
        Self {
            chunk_id,
            source_name: source_name.to_string(),
            ordinal,
            text,
            text_sha256,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredChunk {
    pub chunk: EvidenceChunk,
    pub score: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct IndexStatus {
    pub ready: bool,
    pub model: Option<String>,
    pub dims: Option<u32>,
    pub chunk_count: u32,
    #[serde(default)]
    pub sources: Vec<String>,
    pub built_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Retrieval {
    NotInitialized,
    Hits(Vec<ScoredChunk>),
}

pub(crate) fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_ids_depend_on_source_ordinal_and_text() {
        let a = EvidenceChunk::new("cricket.pdf", 0, "lbw".to_string());
        let b = EvidenceChunk::new("cricket.pdf", 0, "lbw".to_string());
        let c = EvidenceChunk::new("cricket.pdf", 1, "lbw".to_string());
        let d = EvidenceChunk::new("tennis.pdf", 0, "lbw".to_string());
        assert_eq!(a, b);
        assert_ne!(a.chunk_id, c.chunk_id);
        assert_ne!(a.chunk_id, d.chunk_id);
        assert_eq!(a.text_sha256, c.text_sha256);
        assert_eq!(a.chunk_id.len(), 64);
    }
}
