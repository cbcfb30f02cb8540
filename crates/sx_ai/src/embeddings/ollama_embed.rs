use std::time::Duration;

use serde::{Deserialize, Serialize};
use sx_core::error::{codes, AppError};

use super::Embedder;
use crate::ollama::OllamaClient;

const MAX_INPUT_BYTES: usize = 12_000;

#[derive(Debug, Clone)]
pub struct OllamaEmbedder {
    client: OllamaClient,
}

impl OllamaEmbedder {
    pub fn new(client: OllamaClient) -> Self {
        Self { client }
    }
}

#[derive(Debug, Clone, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
struct EmbeddingsResponse {
    embedding: Vec<f32>,
}

fn bounded(input: &str) -> &str {
    if input.len() <= MAX_INPUT_BYTES {
        return input;
    }
    let mut end = MAX_INPUT_BYTES;
    while !input.is_char_boundary(end) {
        end -= 1;
    }
    &input[..end]
}

impl Embedder for OllamaEmbedder {
    fn embed(&self, model: &str, input: &str) -> Result<Vec<f32>, AppError> {
        let url = format!("{}/api/embeddings", self.client.base_url());
        let req = EmbeddingsRequest {
            model,
            prompt: bounded(input),
        };
        let resp = ureq::post(&url)
            .timeout(Duration::from_secs(10))
            .send_json(serde_json::to_value(req).map_err(|e| {
                AppError::new(codes::AI_EMBEDDINGS_FAILED, "Failed to encode embeddings request")
                    .with_details(e.to_string())
            })?);

        match resp {
            Ok(r) => {
                let v: EmbeddingsResponse = r.into_json().map_err(|e| {
                    AppError::new(codes::AI_EMBEDDINGS_FAILED, "Failed to decode embeddings response")
                        .with_details(e.to_string())
                })?;
                if v.embedding.is_empty() {
                    return Err(AppError::new(
                        codes::AI_EMBEDDINGS_FAILED,
                        "Embeddings response was empty",
                    ));
                }
                Ok(v.embedding)
            }
            Err(ureq::Error::Status(status, _)) => Err(
                AppError::new(codes::AI_EMBEDDINGS_FAILED, "Embeddings request failed")
                    .with_details(format!("status={status}")),
            ),
            Err(e) => Err(
                AppError::new(codes::AI_EMBEDDINGS_FAILED, "Failed to call embeddings endpoint")
                    .with_details(e.to_string())
                    .with_retryable(true),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounded_input_respects_char_boundaries() {
        let s = "é".repeat(MAX_INPUT_BYTES);
        let cut = bounded(&s);
        assert!(cut.len() <= MAX_INPUT_BYTES);
        assert!(s.starts_with(cut));
        assert_eq!(bounded("short"), "short");
    }
}
