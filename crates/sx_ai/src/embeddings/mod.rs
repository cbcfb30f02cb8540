use std::sync::Arc;

use sx_core::config::{EmbedderKind, Settings};
use sx_core::error::AppError;

use crate::ollama::OllamaClient;

pub trait Embedder: Send + Sync {
    fn embed(&self, model: &str, input: &str) -> Result<Vec<f32>, AppError>;
}

pub mod hashing;
pub mod ollama_embed;

pub use hashing::HashingEmbedder;
pub use ollama_embed::OllamaEmbedder;

/// Construct the embedder selected in settings.
pub fn from_settings(settings: &Settings) -> Result<Arc<dyn Embedder>, AppError> {
    match settings.embedder {
        EmbedderKind::Ollama => {
            let client = OllamaClient::new(&settings.ollama_base_url)?;
            Ok(Arc::new(OllamaEmbedder::new(client)))
        }
        EmbedderKind::Hashing => Ok(Arc::new(HashingEmbedder::default())),
    }
}

/// Model label recorded in the index for the selected embedder.
pub fn model_label(settings: &Settings) -> String {
    match settings.embedder {
        EmbedderKind::Ollama => settings.embed_model.clone(),
        EmbedderKind::Hashing => hashing::MODEL_LABEL.to_string(),
    }
}
