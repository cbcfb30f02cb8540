use std::fs;
use std::path::Path;

use sx_core::error::{codes, AppError};
use tracing::{info, warn};

use super::chunking::{chunk_text, normalize_text, CHUNK_OVERLAP, MAX_CHUNK_CHARS};
use super::model::{EvidenceChunk, SourceDocument};

const SUPPORTED_EXTENSIONS: &[&str] = &["pdf", "txt", "md"];

/// Read every supported document in `dir`, sorted by file name.
///
/// Files that cannot be read are logged and skipped. Fails with
/// `EVIDENCE_EMPTY` when the directory is missing or nothing usable is found.
pub fn load_documents(dir: &Path) -> Result<Vec<SourceDocument>, AppError> {
    if !dir.is_dir() {
        return Err(AppError::new(codes::EVIDENCE_EMPTY, "Knowledge base directory not found")
            .with_details(format!("path={}", dir.display())));
    }
    let entries = fs::read_dir(dir).map_err(|e| {
        AppError::new(codes::INDEX_IO_FAILED, "Failed to list knowledge base directory")
            .with_details(format!("path={}; err={}", dir.display(), e))
    })?;

    let mut paths = entries
        .flatten()
        .map(|ent| ent.path())
        .filter(|p| p.is_file() && is_supported(p))
        .collect::<Vec<_>>();
    paths.sort_by_key(|p| p.file_name().map(|n| n.to_os_string()));

    let mut docs = Vec::new();
    for path in paths {
        let Some(name) = path.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
            warn!("Skipping document with non UTF-8 name: {}", path.display());
            continue;
        };
        match extract_text(&path) {
            Ok(text) if !text.trim().is_empty() => {
                info!(source = %name, bytes = text.len(), "Loaded document");
                docs.push(SourceDocument { name, text });
            }
            Ok(_) => warn!(source = %name, "Document has no extractable text; skipping"),
            Err(e) => warn!(source = %name, error = %e, "Failed to read document; skipping"),
        }
    }

    if docs.is_empty() {
        return Err(AppError::new(codes::EVIDENCE_EMPTY, "No documents found in knowledge base")
            .with_details(format!("path={}", dir.display())));
    }
    Ok(docs)
}

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SUPPORTED_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn extract_text(path: &Path) -> Result<String, AppError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    let raw = if ext == "pdf" {
        extract_pdf_text(path)?
    } else {
        fs::read_to_string(path).map_err(|e| {
            AppError::new(codes::INDEX_IO_FAILED, "Failed to read document")
                .with_details(format!("path={}; err={}", path.display(), e))
        })?
    };
    Ok(normalize_text(&raw))
}

fn extract_pdf_text(path: &Path) -> Result<String, AppError> {
    let pdf_err = |e: lopdf::Error| {
        AppError::new(codes::INDEX_IO_FAILED, "Failed to extract PDF text")
            .with_details(format!("path={}; err={}", path.display(), e))
    };
    let doc = lopdf::Document::load(path).map_err(pdf_err)?;
    let pages = doc.get_pages().keys().copied().collect::<Vec<u32>>();
    if pages.is_empty() {
        return Ok(String::new());
    }
    doc.extract_text(&pages).map_err(pdf_err)
}

/// Split documents into chunks, numbering them in ingestion order.
pub fn chunk_documents(docs: &[SourceDocument]) -> Vec<EvidenceChunk> {
    let mut out = Vec::new();
    let mut ordinal: u32 = 0;
    for doc in docs {
        for text in chunk_text(&doc.text, MAX_CHUNK_CHARS, CHUNK_OVERLAP) {
            out.push(EvidenceChunk::new(&doc.name, ordinal, text));
            ordinal += 1;
        }
    }
    out
}
