use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use std::thread::JoinHandle;
use std::time::Instant;

use sx_core::config::Settings;
use sx_core::error::{codes, AppError};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::{debug, error, info, warn};

use super::index::{EvidenceIndex, IndexStore};
use super::ingest::{chunk_documents, load_documents};
use super::model::{IndexStatus, Retrieval};
use crate::embeddings::{self, Embedder};

/// Everything needed to load or build the evidence index.
#[derive(Clone)]
pub struct EvidenceInit {
    pub knowledge_base_dir: PathBuf,
    pub index_dir: PathBuf,
    pub model: String,
    pub embedder: Arc<dyn Embedder>,
    pub force_rebuild: bool,
}

impl EvidenceInit {
    pub fn from_settings(settings: &Settings, force_rebuild: bool) -> Result<Self, AppError> {
        Ok(Self {
            knowledge_base_dir: settings.knowledge_base_dir.clone(),
            index_dir: settings.index_dir.clone(),
            model: embeddings::model_label(settings),
            embedder: embeddings::from_settings(settings)?,
            force_rebuild,
        })
    }
}

/// Shared read-only access to the evidence index.
///
/// The index is set at most once. Until then every query answers
/// [`Retrieval::NotInitialized`] without blocking.
#[derive(Debug, Clone, Default)]
pub struct EvidenceHandle {
    cell: Arc<OnceLock<EvidenceIndex>>,
}

impl EvidenceHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_index(index: EvidenceIndex) -> Self {
        let cell = OnceLock::new();
        let _ = cell.set(index);
        Self {
            cell: Arc::new(cell),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.get().is_some()
    }

    pub fn status(&self) -> IndexStatus {
        self.cell
            .get()
            .map(|idx| idx.status().clone())
            .unwrap_or_default()
    }

    pub fn query(&self, text: &str, k: u32) -> Result<Retrieval, AppError> {
        match self.cell.get() {
            Some(index) => Ok(Retrieval::Hits(index.query(text, k)?)),
            None => Ok(Retrieval::NotInitialized),
        }
    }

    /// Load the persisted index, or build and persist one from the knowledge
    /// base. A second call after success is a no-op.
    pub fn initialize(&self, init: &EvidenceInit) -> Result<IndexStatus, AppError> {
        if let Some(existing) = self.cell.get() {
            debug!("Evidence index already initialized");
            return Ok(existing.status().clone());
        }
        let started = Instant::now();
        let index = load_or_build(init)?;
        let status = index.status().clone();
        if self.cell.set(index).is_err() {
            debug!("Evidence index initialized concurrently; keeping the first one");
        }
        info!(
            chunks = status.chunk_count,
            sources = ?status.sources,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Evidence index ready"
        );
        Ok(self.status())
    }

    /// Run [`initialize`](Self::initialize) on a background thread. Failures
    /// are logged and leave the store uninitialized.
    pub fn spawn_initialization(&self, init: EvidenceInit) -> JoinHandle<()> {
        let handle = self.clone();
        std::thread::spawn(move || {
            if let Err(e) = handle.initialize(&init) {
                error!(
                    code = %e.code,
                    details = e.details.as_deref().unwrap_or(""),
                    "Evidence index initialization failed: {}",
                    e.message
                );
            }
        })
    }
}

pub fn load_or_build(init: &EvidenceInit) -> Result<EvidenceIndex, AppError> {
    let store = IndexStore::open(init.index_dir.clone());
    if !init.force_rebuild {
        if let Some(index) = store.load(init.embedder.clone())? {
            if index.status().model.as_deref() == Some(init.model.as_str()) {
                info!(path = %store.root().display(), "Loaded persisted evidence index");
                return Ok(index);
            }
            warn!(
                indexed_with = index.status().model.as_deref().unwrap_or("unknown"),
                configured = %init.model,
                "Persisted index was built with a different model; rebuilding"
            );
        } else {
            info!("No persisted evidence index found; building from knowledge base");
        }
    }
    build_and_save(init, &store)
}

pub fn build_and_save(init: &EvidenceInit, store: &IndexStore) -> Result<EvidenceIndex, AppError> {
    let kb = init.knowledge_base_dir.as_path();
    if !kb.exists() {
        fs::create_dir_all(kb).map_err(|e| {
            AppError::new(codes::INDEX_IO_FAILED, "Failed to create knowledge base directory")
                .with_details(format!("path={}; err={}", kb.display(), e))
        })?;
        warn!(
            path = %kb.display(),
            "Created knowledge base directory; add tennis and cricket documents there"
        );
    }

    let docs = load_documents(kb)?;
    let chunks = chunk_documents(&docs);
    info!(documents = docs.len(), chunks = chunks.len(), "Embedding knowledge base");
    let index = EvidenceIndex::build(chunks, init.embedder.clone(), &init.model, &now_rfc3339()?)?;
    store.save(&index)?;
    Ok(index)
}

fn now_rfc3339() -> Result<String, AppError> {
    OffsetDateTime::now_utc().format(&Rfc3339).map_err(|e| {
        AppError::new(codes::INDEX_BUILD_FAILED, "Failed to format time").with_details(e.to_string())
    })
}
