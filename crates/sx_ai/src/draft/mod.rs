use std::sync::Arc;

use sx_core::answer::{with_citation, Citation};
use sx_core::query::Query;
use tracing::warn;

use crate::guardrails::enforce_citations;
use crate::llm::Llm;
use crate::research::Evidence;

mod prompts;

pub const NO_LOCAL_MATCH_MESSAGE: &str =
    "I could not find information about this in the local sports knowledge base.";
pub const NO_WEB_MATCH_MESSAGE: &str = "I could not find information about this in web search results.";

/// Turns retrieved evidence into a draft answer.
pub trait Composer: Send + Sync {
    fn compose(&self, query: &Query, evidence: &Evidence) -> String;
}

/// Deterministic composer: quotes the best evidence and tags it.
///
/// Local drafts keep only the chunks from the top hit's file so the single
/// citation covers every quoted line.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractiveComposer;

impl Composer for ExtractiveComposer {
    fn compose(&self, _query: &Query, evidence: &Evidence) -> String {
        match evidence {
            Evidence::Local(hits) => {
                let Some(top) = hits.first() else {
                    return NO_LOCAL_MATCH_MESSAGE.to_string();
                };
                let source = top.chunk.source_name.as_str();
                let body = hits
                    .iter()
                    .filter(|h| h.chunk.source_name == source)
                    .map(|h| h.chunk.text.trim())
                    .collect::<Vec<_>>()
                    .join("\n\n");
                with_citation(&body, &Citation::file(source))
            }
            Evidence::Web { results, .. } => {
                let Some(citation) = evidence.primary_citation() else {
                    return NO_WEB_MATCH_MESSAGE.to_string();
                };
                let body = results
                    .first()
                    .map(|r| r.content.as_str())
                    .unwrap_or_default();
                with_citation(body, &citation)
            }
            Evidence::Unavailable { message, .. } => message.clone(),
            Evidence::NoRetrieval => String::new(),
        }
    }
}

/// Composer backed by a local LLM. Falls back to [`ExtractiveComposer`] when
/// there is nothing to summarize or the model call fails.
pub struct LlmComposer {
    llm: Arc<dyn Llm>,
    model: String,
}

impl LlmComposer {
    pub fn new(llm: Arc<dyn Llm>, model: impl Into<String>) -> Self {
        Self {
            llm,
            model: model.into(),
        }
    }
}

impl Composer for LlmComposer {
    fn compose(&self, query: &Query, evidence: &Evidence) -> String {
        let (Some(citation), Some(blocks)) = (evidence.primary_citation(), evidence_blocks(evidence))
        else {
            return ExtractiveComposer.compose(query, evidence);
        };

        let prompt = prompts::research_prompt(query.as_str(), &blocks, &citation.to_string());
        match self.llm.generate(&self.model, &prompt) {
            Ok(text) => {
                let text = text.trim().to_string();
                if let Err(e) = enforce_citations(&text) {
                    warn!(model = %self.model, code = %e.code, "LLM draft has no citation tag");
                }
                text
            }
            Err(e) => {
                warn!(
                    model = %self.model,
                    code = %e.code,
                    "LLM drafting failed; using extractive draft: {}",
                    e.message
                );
                ExtractiveComposer.compose(query, evidence)
            }
        }
    }
}

fn evidence_blocks(evidence: &Evidence) -> Option<String> {
    let blocks: Vec<String> = match evidence {
        Evidence::Local(hits) => hits
            .iter()
            .map(|h| format!("[{}]\n{}", Citation::file(h.chunk.source_name.clone()), h.chunk.text))
            .collect(),
        Evidence::Web { provider, results } => results
            .iter()
            .map(|r| {
                let tag = Citation::Internet {
                    provider: provider.clone(),
                    url: Some(r.url.clone()),
                };
                format!("[{tag}]\n{}: {}", r.title, r.content)
            })
            .collect(),
        Evidence::Unavailable { .. } | Evidence::NoRetrieval => Vec::new(),
    };
    if blocks.is_empty() {
        None
    } else {
        Some(blocks.join("\n\n---\n\n"))
    }
}
