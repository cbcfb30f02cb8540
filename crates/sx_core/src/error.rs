use serde::{Deserialize, Serialize};
use std::fmt;

/// Single structured error shape used by every stage of the answer pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppError {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
    pub retryable: bool,
}

/// Coarse classification of error codes, used by callers to decide between
/// degrading inside a request and reporting to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Upstream,
    EmptyEvidence,
    PipelineExhaustion,
    Input,
    Storage,
    Other,
}

impl ErrorKind {
    /// Process exit status for a command that failed with this kind.
    pub fn exit_code(self) -> u8 {
        match self {
            ErrorKind::Other => 1,
            ErrorKind::Input => 2,
            ErrorKind::Configuration => 3,
            ErrorKind::Storage => 4,
            ErrorKind::Upstream => 5,
            ErrorKind::EmptyEvidence | ErrorKind::PipelineExhaustion => 6,
        }
    }

    /// One-line suggestion printed under a failed command.
    pub fn hint(self) -> Option<&'static str> {
        match self {
            ErrorKind::Configuration => Some("check the SX_* settings in the environment or .env"),
            ErrorKind::Storage => Some("rebuild the index with `sportexpert ingest --force`"),
            ErrorKind::Upstream => Some("check that Ollama is running (`sportexpert health`)"),
            ErrorKind::EmptyEvidence => Some("add .pdf, .txt or .md files to the knowledge base directory"),
            ErrorKind::Input | ErrorKind::PipelineExhaustion | ErrorKind::Other => None,
        }
    }
}

pub mod codes {
    pub const CONFIG_INVALID: &str = "CONFIG_INVALID";
    pub const AI_REMOTE_NOT_ALLOWED: &str = "AI_REMOTE_NOT_ALLOWED";
    pub const EVIDENCE_NOT_INITIALIZED: &str = "EVIDENCE_NOT_INITIALIZED";

    pub const AI_OLLAMA_UNREACHABLE: &str = "AI_OLLAMA_UNREACHABLE";
    pub const AI_OLLAMA_UNHEALTHY: &str = "AI_OLLAMA_UNHEALTHY";
    pub const AI_EMBEDDINGS_FAILED: &str = "AI_EMBEDDINGS_FAILED";
    pub const AI_LLM_FAILED: &str = "AI_LLM_FAILED";
    pub const SEARCH_UNAVAILABLE: &str = "SEARCH_UNAVAILABLE";

    pub const EVIDENCE_EMPTY: &str = "EVIDENCE_EMPTY";
    pub const AI_CITATION_REQUIRED: &str = "AI_CITATION_REQUIRED";

    pub const PIPELINE_EXHAUSTED: &str = "PIPELINE_EXHAUSTED";

    pub const QUERY_EMPTY: &str = "QUERY_EMPTY";
    pub const RETRIEVAL_FAILED: &str = "RETRIEVAL_FAILED";

    pub const INDEX_IO_FAILED: &str = "INDEX_IO_FAILED";
    pub const INDEX_BUILD_FAILED: &str = "INDEX_BUILD_FAILED";
}

impl AppError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
            retryable: false,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    pub fn kind(&self) -> ErrorKind {
        use codes::*;
        match self.code.as_str() {
            CONFIG_INVALID | AI_REMOTE_NOT_ALLOWED | EVIDENCE_NOT_INITIALIZED => {
                ErrorKind::Configuration
            }
            AI_OLLAMA_UNREACHABLE | AI_OLLAMA_UNHEALTHY | AI_EMBEDDINGS_FAILED | AI_LLM_FAILED
            | SEARCH_UNAVAILABLE => ErrorKind::Upstream,
            EVIDENCE_EMPTY | AI_CITATION_REQUIRED => ErrorKind::EmptyEvidence,
            PIPELINE_EXHAUSTED => ErrorKind::PipelineExhaustion,
            QUERY_EMPTY | RETRIEVAL_FAILED => ErrorKind::Input,
            INDEX_IO_FAILED | INDEX_BUILD_FAILED => ErrorKind::Storage,
            _ => ErrorKind::Other,
        }
    }

    /// Text shown to a caller when the failure is absorbed inside a request.
    pub fn unavailability_note(&self) -> String {
        match &self.details {
            Some(d) => format!("{} ({d})", self.message),
            None => self.message.clone(),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {}
