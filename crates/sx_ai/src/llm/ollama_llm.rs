use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use sx_core::error::{codes, AppError};
use tracing::debug;

use super::Llm;
use crate::ollama::OllamaClient;

const GENERATE_TIMEOUT: Duration = Duration::from_secs(30);

const MAX_ANSWER_TOKENS: u32 = 512;

/// Greedy decoding: the same prompt yields the same draft.
const TEMPERATURE: f32 = 0.0;

#[derive(Debug, Clone)]
pub struct OllamaLlm {
    client: OllamaClient,
}

impl OllamaLlm {
    pub fn new(client: OllamaClient) -> Self {
        Self { client }
    }

    fn request<'a>(&self, model: &'a str, prompt: &'a str) -> GenerateRequest<'a> {
        GenerateRequest {
            model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: TEMPERATURE,
                num_predict: MAX_ANSWER_TOKENS,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Clone, Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Clone, Deserialize)]
struct GenerateResponse {
    response: String,
}

impl Llm for OllamaLlm {
    fn generate(&self, model: &str, prompt: &str) -> Result<String, AppError> {
        let url = format!("{}/api/generate", self.client.base_url());
        let started = Instant::now();
        let resp = ureq::post(&url)
            .timeout(GENERATE_TIMEOUT)
            .send_json(self.request(model, prompt));

        let text = match resp {
            Ok(r) => {
                let v: GenerateResponse = r.into_json().map_err(|e| {
                    AppError::new(codes::AI_LLM_FAILED, "Failed to decode generate response")
                        .with_details(e.to_string())
                })?;
                v.response
            }
            Err(ureq::Error::Status(status, _)) => {
                return Err(AppError::new(codes::AI_LLM_FAILED, "Generate request failed")
                    .with_details(format!("model={model}; status={status}")))
            }
            Err(e) => {
                return Err(AppError::new(codes::AI_LLM_FAILED, "Failed to call generate endpoint")
                    .with_details(e.to_string())
                    .with_retryable(true))
            }
        };

        debug!(
            %model,
            elapsed_ms = started.elapsed().as_millis() as u64,
            chars = text.len(),
            "LLM generation finished"
        );
        if text.trim().is_empty() {
            return Err(AppError::new(codes::AI_LLM_FAILED, "Generate response was empty")
                .with_details(format!("model={model}")));
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn llm() -> OllamaLlm {
        OllamaLlm::new(OllamaClient::new("http://127.0.0.1:11434").unwrap())
    }

    #[test]
    fn request_is_non_streaming_and_deterministic() {
        let v = serde_json::to_value(llm().request("llama3.2", "What is LBW?")).unwrap();
        assert_eq!(v["stream"], false);
        assert_eq!(v["options"]["temperature"], 0.0);
        assert_eq!(v["options"]["num_predict"], MAX_ANSWER_TOKENS);
    }

    #[test]
    fn unreachable_server_is_retryable() {
        let unreachable = OllamaLlm::new(OllamaClient::new("http://127.0.0.1:9").unwrap());
        let err = unreachable.generate("m", "p").unwrap_err();
        assert_eq!(err.code, codes::AI_LLM_FAILED);
        assert!(err.retryable);
    }
}
