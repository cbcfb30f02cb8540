//! Research stage: pick one evidence source for a query and draft an answer.

use std::sync::Arc;

use serde::Serialize;
use sx_core::answer::Citation;
use sx_core::query::Query;
use sx_core::topics::{Topic, TopicTaxonomy};
use tracing::{info, warn};

use crate::draft::Composer;
use crate::evidence::{EvidenceHandle, Retrieval, ScoredChunk, NOT_INITIALIZED_MESSAGE};
use crate::search::{SearchOutcome, SearchResult, WebSearch};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    KnowledgeBase,
    WebSearch,
    NoRetrieval,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvidenceSourceKind {
    KnowledgeBase,
    WebSearch,
}

/// What the single tool invocation of a research run produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Evidence {
    Local(Vec<ScoredChunk>),
    Web {
        provider: String,
        results: Vec<SearchResult>,
    },
    Unavailable {
        source: EvidenceSourceKind,
        message: String,
    },
    /// Off-topic query; no source was consulted.
    NoRetrieval,
}

impl Evidence {
    /// Citation for the most relevant piece of evidence, if any exists.
    pub fn primary_citation(&self) -> Option<Citation> {
        match self {
            Evidence::Local(hits) => hits.first().map(|h| Citation::file(h.chunk.source_name.clone())),
            Evidence::Web { provider, results } => results.first().map(|r| Citation::Internet {
                provider: provider.clone(),
                url: Some(r.url.clone()),
            }),
            Evidence::Unavailable { .. } | Evidence::NoRetrieval => None,
        }
    }

    /// Whether `citation` names something this evidence actually contains.
    pub fn supports(&self, citation: &Citation) -> bool {
        match (self, citation) {
            (Evidence::Local(hits), Citation::File(name)) => {
                hits.iter().any(|h| &h.chunk.source_name == name)
            }
            (
                Evidence::Web { provider, results },
                Citation::Internet {
                    provider: cited,
                    url,
                },
            ) => {
                provider.eq_ignore_ascii_case(cited)
                    && !results.is_empty()
                    && url
                        .as_deref()
                        .map_or(true, |u| results.iter().any(|r| r.url == u))
            }
            (_, Citation::Unavailable) => self.primary_citation().is_none(),
            _ => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResearchOutput {
    pub topic: Topic,
    pub route: Route,
    pub evidence: Evidence,
    pub draft: String,
}

pub struct ResearchStage {
    taxonomy: TopicTaxonomy,
    evidence: EvidenceHandle,
    search: Arc<dyn WebSearch>,
    composer: Arc<dyn Composer>,
    top_k: u32,
}

impl ResearchStage {
    pub fn new(
        taxonomy: TopicTaxonomy,
        evidence: EvidenceHandle,
        search: Arc<dyn WebSearch>,
        composer: Arc<dyn Composer>,
        top_k: u32,
    ) -> Self {
        Self {
            taxonomy,
            evidence,
            search,
            composer,
            top_k,
        }
    }

    pub fn run(&self, query: &Query) -> ResearchOutput {
        let topic = self.taxonomy.classify(query.as_str());
        let (route, evidence) = match &topic {
            Topic::Local { sport } => {
                info!(%sport, "Researcher is querying the local knowledge base");
                (Route::KnowledgeBase, self.consult_store(query))
            }
            Topic::Outdoor { sport } => {
                info!(sport = sport.as_deref().unwrap_or("general"), "Researcher is performing web search");
                (Route::WebSearch, self.consult_web(query))
            }
            Topic::OffTopic => {
                info!("Query is outside the sports taxonomy; no evidence source consulted");
                (Route::NoRetrieval, Evidence::NoRetrieval)
            }
        };
        let draft = self.composer.compose(query, &evidence);
        ResearchOutput {
            topic,
            route,
            evidence,
            draft,
        }
    }

    fn consult_store(&self, query: &Query) -> Evidence {
        match self.evidence.query(query.as_str(), self.top_k) {
            Ok(Retrieval::Hits(hits)) => {
                if hits.is_empty() {
                    info!("No specific matches found in local knowledge base");
                } else {
                    let sources = hits
                        .iter()
                        .map(|h| h.chunk.source_name.as_str())
                        .collect::<Vec<_>>();
                    info!(hits = hits.len(), ?sources, "Found relevant knowledge base chunks");
                }
                Evidence::Local(hits)
            }
            Ok(Retrieval::NotInitialized) => {
                warn!("Knowledge base queried before initialization completed");
                Evidence::Unavailable {
                    source: EvidenceSourceKind::KnowledgeBase,
                    message: NOT_INITIALIZED_MESSAGE.to_string(),
                }
            }
            Err(e) => {
                warn!(code = %e.code, "Knowledge base query failed: {}", e.message);
                Evidence::Unavailable {
                    source: EvidenceSourceKind::KnowledgeBase,
                    message: format!(
                        "The sports knowledge base is unavailable: {}",
                        e.unavailability_note()
                    ),
                }
            }
        }
    }

    fn consult_web(&self, query: &Query) -> Evidence {
        let provider = self.search.provider().to_string();
        match self.search.search(query.as_str()) {
            SearchOutcome::Results(results) => Evidence::Web { provider, results },
            SearchOutcome::NoResults => Evidence::Web {
                provider,
                results: Vec::new(),
            },
            SearchOutcome::Unavailable(message) => Evidence::Unavailable {
                source: EvidenceSourceKind::WebSearch,
                message,
            },
        }
    }
}
