use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{codes, AppError};

pub const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";
pub const DEFAULT_EMBED_MODEL: &str = "nomic-embed-text";
pub const DEFAULT_TOP_K: u32 = 3;
pub const DEFAULT_SEARCH_MAX_RESULTS: u32 = 5;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EmbedderKind {
    /// Embeddings from a local Ollama server.
    Ollama,
    /// Offline feature-hashing embedder; no model server required.
    Hashing,
}

impl FromStr for EmbedderKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "hashing" => Ok(Self::Hashing),
            other => Err(AppError::new(codes::CONFIG_INVALID, "Unknown embedder kind")
                .with_details(format!("SX_EMBEDDER={other}; expected ollama|hashing"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Settings {
    pub knowledge_base_dir: PathBuf,
    pub index_dir: PathBuf,
    pub top_k: u32,
    pub embedder: EmbedderKind,
    pub embed_model: String,
    pub ollama_base_url: String,
    pub llm_model: Option<String>,
    #[serde(skip_serializing)]
    pub tavily_api_key: Option<String>,
    pub search_max_results: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            knowledge_base_dir: PathBuf::from("knowledge_base"),
            index_dir: PathBuf::from("sx_index"),
            top_k: DEFAULT_TOP_K,
            embedder: EmbedderKind::Hashing,
            embed_model: DEFAULT_EMBED_MODEL.to_string(),
            ollama_base_url: DEFAULT_OLLAMA_URL.to_string(),
            llm_model: None,
            tavily_api_key: None,
            search_max_results: DEFAULT_SEARCH_MAX_RESULTS,
        }
    }
}

impl Settings {
    /// Load settings from the process environment, reading `.env` first when present.
    pub fn from_env() -> Result<Self, AppError> {
        match dotenvy::dotenv() {
            Ok(path) => info!("Loaded environment from {}", path.display()),
            Err(e) if e.not_found() => debug!("No .env file found"),
            Err(e) => {
                return Err(AppError::new(codes::CONFIG_INVALID, "Failed to read .env file")
                    .with_details(e.to_string()))
            }
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut s = Self::default();

        if let Some(v) = get("SX_KNOWLEDGE_BASE_DIR") {
            s.knowledge_base_dir = PathBuf::from(v);
        }
        if let Some(v) = get("SX_INDEX_DIR") {
            s.index_dir = PathBuf::from(v);
        }
        if let Some(v) = get("SX_TOP_K") {
            s.top_k = parse_bounded("SX_TOP_K", &v, 1, 50)?;
        }
        if let Some(v) = get("SX_EMBEDDER") {
            s.embedder = v.parse()?;
        }
        if let Some(v) = get("SX_EMBED_MODEL") {
            s.embed_model = v;
        }
        if let Some(v) = get("SX_OLLAMA_URL") {
            s.ollama_base_url = v;
        }
        s.llm_model = get("SX_LLM_MODEL");
        s.tavily_api_key = get("TAVILY_API_KEY");
        if let Some(v) = get("SX_SEARCH_MAX_RESULTS") {
            s.search_max_results = parse_bounded("SX_SEARCH_MAX_RESULTS", &v, 1, 20)?;
        }
        Ok(s)
    }
}

fn parse_bounded(key: &str, raw: &str, min: u32, max: u32) -> Result<u32, AppError> {
    let v: u32 = raw.parse().map_err(|_| {
        AppError::new(codes::CONFIG_INVALID, "Expected a positive integer")
            .with_details(format!("{key}={raw}"))
    })?;
    if v < min || v > max {
        return Err(AppError::new(codes::CONFIG_INVALID, "Value out of range")
            .with_details(format!("{key}={v}; allowed={min}..={max}")));
    }
    Ok(v)
}
