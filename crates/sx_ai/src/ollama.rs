use std::time::Duration;

use sx_core::error::{codes, AppError};

#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: String,
}

impl OllamaClient {
    /// Create a client for Ollama. This is strictly limited to `127.0.0.1`.
    pub fn new(base_url: &str) -> Result<Self, AppError> {
        let base_url = base_url.trim_end_matches('/').to_string();

        let rest = base_url.strip_prefix("http://127.0.0.1").ok_or_else(|| {
            remote_not_allowed(&base_url)
        })?;
        // Only an optional `:<port>` may follow the host.
        if !rest.is_empty() {
            let port = rest.strip_prefix(':').ok_or_else(|| remote_not_allowed(&base_url))?;
            match port.parse::<u16>() {
                Ok(p) if p > 0 => {}
                _ => return Err(remote_not_allowed(&base_url)),
            }
        }

        Ok(Self { base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn health_check(&self) -> Result<(), AppError> {
        let url = format!("{}/api/tags", self.base_url);
        let resp = ureq::get(&url).timeout(Duration::from_millis(800)).call();

        match resp {
            Ok(r) if r.status() == 200 => Ok(()),
            Ok(r) => Err(
                AppError::new(codes::AI_OLLAMA_UNHEALTHY, "Ollama health check failed")
                    .with_details(format!("status={}", r.status())),
            ),
            Err(ureq::Error::Status(status, _)) => Err(
                AppError::new(codes::AI_OLLAMA_UNHEALTHY, "Ollama health check failed")
                    .with_details(format!("status={status}")),
            ),
            Err(e) => Err(AppError::new(
                codes::AI_OLLAMA_UNREACHABLE,
                "Failed to reach Ollama on 127.0.0.1",
            )
            .with_details(e.to_string())
            .with_retryable(true)),
        }
    }
}

fn remote_not_allowed(base_url: &str) -> AppError {
    AppError::new(
        codes::AI_REMOTE_NOT_ALLOWED,
        "Ollama base URL must be localhost (127.0.0.1)",
    )
    .with_details(format!("base_url={base_url}"))
}
