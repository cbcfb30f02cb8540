pub mod chunking;
pub mod handle;
pub mod index;
pub mod ingest;
pub mod model;

pub use handle::{build_and_save, load_or_build, EvidenceHandle, EvidenceInit};
pub use index::{EvidenceIndex, IndexStore};
pub use model::{
    EvidenceChunk, IndexStatus, Retrieval, ScoredChunk, SourceDocument, NOT_INITIALIZED_MESSAGE,
};
