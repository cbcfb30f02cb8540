use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use sx_core::error::{codes, AppError};
use tracing::info;

use super::model::{EvidenceChunk, IndexStatus, ScoredChunk};
use crate::embeddings::Embedder;
use crate::retrieve;

/// An immutable, queryable similarity index over evidence chunks.
pub struct EvidenceIndex {
    status: IndexStatus,
    chunks: Vec<EvidenceChunk>,
    vectors: BTreeMap<String, Vec<f32>>,
    embedder: Arc<dyn Embedder>,
}

impl std::fmt::Debug for EvidenceIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvidenceIndex")
            .field("status", &self.status)
            .field("chunks", &self.chunks.len())
            .finish()
    }
}

impl EvidenceIndex {
    /// Embed every chunk. Chunks must already be in ingestion order.
    pub fn build(
        chunks: Vec<EvidenceChunk>,
        embedder: Arc<dyn Embedder>,
        model: &str,
        built_at: &str,
    ) -> Result<Self, AppError> {
        if chunks.is_empty() {
            return Err(AppError::new(
                codes::EVIDENCE_EMPTY,
                "No chunks available; add documents to the knowledge base",
            ));
        }

        let mut dims: Option<u32> = None;
        let mut vectors = BTreeMap::new();
        for chunk in chunks.iter() {
            let v = embedder.embed(model, &chunk.text).map_err(|e| {
                AppError::new(codes::AI_EMBEDDINGS_FAILED, "Failed to compute embeddings")
                    .with_details(format!("chunk_id={}; err={}", chunk.chunk_id, e))
                    .with_retryable(e.retryable)
            })?;
            let this_dims = v.len() as u32;
            match dims {
                Some(d) if d != this_dims => {
                    return Err(AppError::new(
                        codes::INDEX_BUILD_FAILED,
                        "Embedding dimension mismatch across chunks",
                    )
                    .with_details(format!(
                        "expected={}; got={}; chunk_id={}",
                        d, this_dims, chunk.chunk_id
                    )));
                }
                Some(_) => {}
                None => dims = Some(this_dims),
            }
            vectors.insert(chunk.chunk_id.clone(), v);
        }

        let sources: BTreeSet<String> = chunks.iter().map(|c| c.source_name.clone()).collect();
        let status = IndexStatus {
            ready: true,
            model: Some(model.to_string()),
            dims,
            chunk_count: chunks.len() as u32,
            sources: sources.into_iter().collect(),
            built_at: Some(built_at.to_string()),
        };
        Ok(Self {
            status,
            chunks,
            vectors,
            embedder,
        })
    }

    pub fn status(&self) -> &IndexStatus {
        &self.status
    }

    pub fn chunks(&self) -> &[EvidenceChunk] {
        &self.chunks
    }

    pub fn vector(&self, chunk_id: &str) -> Option<&[f32]> {
        self.vectors.get(chunk_id).map(Vec::as_slice)
    }

    pub fn embedder(&self) -> &dyn Embedder {
        self.embedder.as_ref()
    }

    /// Top `k` chunks for `text`, most similar first.
    pub fn query(&self, text: &str, k: u32) -> Result<Vec<ScoredChunk>, AppError> {
        retrieve::rank(self, text, k)
    }
}

/// On-disk layout of a persisted index.
#[derive(Debug, Clone)]
pub struct IndexStore {
    root: PathBuf,
}

impl IndexStore {
    pub fn open(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        self.root.as_path()
    }

    fn status_path(&self) -> PathBuf {
        self.root.join("index_status.json")
    }

    fn chunks_path(&self) -> PathBuf {
        self.root.join("index_chunks.json")
    }

    fn vectors_path(&self) -> PathBuf {
        self.root.join("index_vectors.json")
    }

    pub fn exists(&self) -> bool {
        self.status_path().exists()
    }

    fn ensure_dirs(&self) -> Result<(), AppError> {
        fs::create_dir_all(&self.root).map_err(|e| {
            AppError::new(codes::INDEX_IO_FAILED, "Failed to create index directory")
                .with_details(format!("path={}; err={}", self.root.display(), e))
        })
    }

    pub fn status(&self) -> Result<IndexStatus, AppError> {
        if !self.exists() {
            return Ok(IndexStatus::default());
        }
        read_json(&self.status_path(), "index status")
    }

    /// Persist chunks and vectors first; the status file is written last so a
    /// crash mid-save never leaves a status pointing at missing data.
    pub fn save(&self, index: &EvidenceIndex) -> Result<(), AppError> {
        self.ensure_dirs()?;
        write_json_atomic(&self.chunks_path(), &index.chunks, "index chunks")?;
        write_json_atomic(&self.vectors_path(), &index.vectors, "index vectors")?;
        write_json_atomic(&self.status_path(), &index.status, "index status")?;
        info!(
            path = %self.root.display(),
            chunks = index.chunks.len(),
            "Saved evidence index"
        );
        Ok(())
    }

    /// Load a persisted index, or `None` when nothing has been saved yet.
    pub fn load(&self, embedder: Arc<dyn Embedder>) -> Result<Option<EvidenceIndex>, AppError> {
        if !self.exists() {
            return Ok(None);
        }
        let status: IndexStatus = read_json(&self.status_path(), "index status")?;
        if !status.ready {
            return Ok(None);
        }
        let mut chunks: Vec<EvidenceChunk> = read_json(&self.chunks_path(), "index chunks")?;
        let vectors: BTreeMap<String, Vec<f32>> = read_json(&self.vectors_path(), "index vectors")?;

        let dims = status.dims.unwrap_or(0) as usize;
        for c in chunks.iter() {
            match vectors.get(&c.chunk_id) {
                Some(v) if v.len() == dims => {}
                Some(v) => {
                    return Err(AppError::new(codes::INDEX_IO_FAILED, "Index vector dims mismatch")
                        .with_details(format!(
                            "chunk_id={}; expected={}; got={}",
                            c.chunk_id,
                            dims,
                            v.len()
                        )))
                }
                None => {
                    return Err(AppError::new(
                        codes::INDEX_IO_FAILED,
                        "Index is inconsistent; rebuild the index",
                    )
                    .with_details(format!("missing vector for chunk_id={}", c.chunk_id)))
                }
            }
        }
        chunks.sort_by_key(|c| c.ordinal);

        Ok(Some(EvidenceIndex {
            status,
            chunks,
            vectors,
            embedder,
        }))
    }
}

fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T, AppError> {
    let bytes = fs::read(path).map_err(|e| {
        AppError::new(codes::INDEX_IO_FAILED, format!("Failed to read {what}"))
            .with_details(format!("path={}; err={}", path.display(), e))
    })?;
    serde_json::from_slice(&bytes).map_err(|e| {
        AppError::new(codes::INDEX_IO_FAILED, format!("Failed to decode {what}"))
            .with_details(format!("path={}; err={}", path.display(), e))
    })
}

fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T, what: &str) -> Result<(), AppError> {
    let tmp = path.with_extension("tmp");
    let json = serde_json::to_vec_pretty(value).map_err(|e| {
        AppError::new(codes::INDEX_IO_FAILED, format!("Failed to encode {what}"))
            .with_details(e.to_string())
    })?;
    fs::write(&tmp, &json).map_err(|e| {
        AppError::new(codes::INDEX_IO_FAILED, format!("Failed to write {what}"))
            .with_details(format!("path={}; err={}", tmp.display(), e))
    })?;
    fs::rename(&tmp, path).map_err(|e| {
        AppError::new(codes::INDEX_IO_FAILED, format!("Failed to finalize {what} write"))
            .with_details(format!("tmp={}; dest={}; err={}", tmp.display(), path.display(), e))
    })
}
