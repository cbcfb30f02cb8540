use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use sx_core::answer::WEB_PROVIDER;
use tracing::{info, warn};

use super::{SearchOutcome, SearchResult, WebSearch};

pub const TAVILY_ENDPOINT: &str = "https://api.tavily.com/search";
pub const SEARCH_TIMEOUT: Duration = Duration::from_secs(10);

pub const NOT_CONFIGURED_MESSAGE: &str =
    "The Tavily Search tool is not configured. Please set TAVILY_API_KEY to enable this feature.";

#[derive(Debug, Clone)]
pub struct TavilySearch {
    api_key: Option<String>,
    endpoint: String,
    max_results: u32,
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    search_depth: &'a str,
    max_results: u32,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<RawResult>,
}

#[derive(Debug, Deserialize)]
struct RawResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    score: f32,
}

impl TavilySearch {
    pub fn new(api_key: Option<String>, max_results: u32) -> Self {
        Self {
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            endpoint: TAVILY_ENDPOINT.to_string(),
            max_results: max_results.max(1),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn failure(&self, err: impl std::fmt::Display) -> SearchOutcome {
        SearchOutcome::Unavailable(format!("Error performing Tavily search via API: {err}"))
    }
}

impl WebSearch for TavilySearch {
    fn provider(&self) -> &str {
        WEB_PROVIDER
    }

    fn search(&self, query: &str) -> SearchOutcome {
        let Some(api_key) = self.api_key.as_deref() else {
            warn!("Web search requested but TAVILY_API_KEY is not set");
            return SearchOutcome::Unavailable(NOT_CONFIGURED_MESSAGE.to_string());
        };

        let started = Instant::now();
        let body = SearchRequest {
            api_key,
            query,
            search_depth: "basic",
            max_results: self.max_results,
        };
        let resp = ureq::post(&self.endpoint)
            .timeout(SEARCH_TIMEOUT)
            .send_json(&body);
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let resp = match resp {
            Ok(r) => r,
            Err(ureq::Error::Status(status, _)) => {
                warn!(status, elapsed_ms, "Tavily search returned an error status");
                return self.failure(format!("status={status}"));
            }
            Err(e) => {
                warn!(error = %e, elapsed_ms, "Tavily search call failed");
                return self.failure(e);
            }
        };
        let parsed: SearchResponse = match resp.into_json() {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "Failed to decode Tavily response");
                return self.failure(e);
            }
        };

        let results = into_results(parsed);

        info!(results = results.len(), elapsed_ms, "Tavily search completed");
        if results.is_empty() {
            SearchOutcome::NoResults
        } else {
            SearchOutcome::Results(results)
        }
    }
}

fn into_results(parsed: SearchResponse) -> Vec<SearchResult> {
    parsed
        .results
        .into_iter()
        .filter(|r| !r.url.trim().is_empty() && !r.content.trim().is_empty())
        .map(|r| SearchResult {
            title: r.title,
            url: r.url.trim().to_string(),
            content: r.content.trim().to_string(),
            score: r.score,
        })
        .collect()
}
