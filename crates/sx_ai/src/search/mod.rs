use serde::{Deserialize, Serialize};

pub mod tavily;

pub use tavily::TavilySearch;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub content: String,
    pub score: f32,
}

/// Result of one web search call. Failures are values, never faults.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    Results(Vec<SearchResult>),
    NoResults,
    Unavailable(String),
}

pub trait WebSearch: Send + Sync {
    /// Provider name used in citation tags, e.g. `Tavily`.
    fn provider(&self) -> &str;

    fn search(&self, query: &str) -> SearchOutcome;
}
