//! Review stage: scope enforcement and citation repair on the research draft.

use serde::Serialize;
use sx_core::answer::{
    is_refusal, strip_citations, with_citation, Citation, Outcome, REFUSAL_MESSAGE,
};
use tracing::{info, warn};

use crate::guardrails::{
    enforce_citations, has_canonical_citation, required_citation, unsupported_citations,
};
use crate::research::ResearchOutput;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReviewAction {
    /// Draft already carried valid citations.
    Approved,
    /// Draft had no tag; one was appended from the evidence.
    CitationAdded,
    /// Draft cited something not in the evidence; tags were rewritten.
    CitationReplaced,
    /// Draft's tags were valid but inline or repeated; collapsed to one
    /// trailing tag.
    CitationNormalized,
    Refused,
    /// Research produced nothing to review.
    Empty,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReviewOutput {
    pub outcome: Outcome,
    pub action: ReviewAction,
    pub text: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReviewStage;

impl ReviewStage {
    pub fn new() -> Self {
        Self
    }

    pub fn review(&self, research: &ResearchOutput) -> ReviewOutput {
        if !research.topic.in_scope() || is_refusal(&research.draft) {
            info!("POLICY REJECTION: query is outside the sports domain");
            return ReviewOutput {
                outcome: Outcome::Refused,
                action: ReviewAction::Refused,
                text: REFUSAL_MESSAGE.to_string(),
            };
        }

        let draft = research.draft.trim();
        if draft.is_empty() {
            warn!("Research produced an empty draft");
            return ReviewOutput {
                outcome: Outcome::Delivered,
                action: ReviewAction::Empty,
                text: String::new(),
            };
        }

        let required = required_citation(&research.evidence);
        let (action, text) = match enforce_citations(draft) {
            Ok(citations) => {
                let unsupported = unsupported_citations(&citations, &research.evidence);
                if unsupported.is_empty() && has_canonical_citation(draft, &citations) {
                    (ReviewAction::Approved, draft.to_string())
                } else if unsupported.is_empty() {
                    let kept = citations
                        .iter()
                        .find(|c| !matches!(c, Citation::Internet { url: None, .. }))
                        .cloned()
                        .unwrap_or(required);
                    info!(
                        tags = citations.len(),
                        citation = %kept,
                        "Collapsing draft citations to a single trailing tag"
                    );
                    (
                        ReviewAction::CitationNormalized,
                        with_citation(&strip_citations(draft), &kept),
                    )
                } else {
                    let cited: Vec<String> = unsupported.iter().map(|c| c.to_string()).collect();
                    warn!(
                        unsupported = ?cited,
                        replacement = %required,
                        "Draft cited sources absent from the evidence"
                    );
                    (
                        ReviewAction::CitationReplaced,
                        with_citation(&strip_citations(draft), &required),
                    )
                }
            }
            Err(_) => {
                info!(citation = %required, "Draft was missing a citation; appending one");
                (ReviewAction::CitationAdded, with_citation(draft, &required))
            }
        };

        ReviewOutput {
            outcome: Outcome::Delivered,
            action,
            text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence::{EvidenceChunk, ScoredChunk};
    use crate::research::{Evidence, EvidenceSourceKind, Route};
    use pretty_assertions::assert_eq;
    use sx_core::topics::Topic;

    fn cricket_research(draft: &str) -> ResearchOutput {
        ResearchOutput {
            topic: Topic::Local {
                sport: "cricket".to_string(),
            },
            route: Route::KnowledgeBase,
            evidence: Evidence::Local(vec![ScoredChunk {
                chunk: EvidenceChunk::new("cricket.pdf", 2, "LBW stands for leg before wicket."),
                score: 0.8,
            }]),
            draft: draft.to_string(),
        }
    }

    #[test]
    fn valid_draft_is_approved_unchanged() {
        let out = ReviewStage.review(&cricket_research("LBW is leg before wicket.\n\nSource: cricket.pdf"));
        assert_eq!(out.action, ReviewAction::Approved);
        assert_eq!(out.text, "LBW is leg before wicket.\n\nSource: cricket.pdf");
    }

    #[test]
    fn missing_citation_is_appended_from_evidence() {
        let out = ReviewStage.review(&cricket_research("LBW is leg before wicket."));
        assert_eq!(out.action, ReviewAction::CitationAdded);
        assert_eq!(out.text, "LBW is leg before wicket.\n\nSource: cricket.pdf");
    }

    #[test]
    fn fabricated_citation_is_replaced() {
        let out = ReviewStage.review(&cricket_research("LBW is leg before wicket.\n\nSource: wisden.pdf"));
        assert_eq!(out.action, ReviewAction::CitationReplaced);
        assert_eq!(out.text, "LBW is leg before wicket.\n\nSource: cricket.pdf");
    }

    #[test]
    fn inline_tag_keeps_the_rest_of_the_sentence() {
        let out = ReviewStage.review(&cricket_research(
            "An over has six balls (Source: cricket.pdf) and is bowled by one bowler.",
        ));
        assert_eq!(out.action, ReviewAction::CitationNormalized);
        assert_eq!(
            out.text,
            "An over has six balls and is bowled by one bowler.\n\nSource: cricket.pdf"
        );
    }

    #[test]
    fn repeated_valid_tags_collapse_to_one() {
        let out = ReviewStage.review(&cricket_research(
            "LBW is leg before wicket [Source: cricket.pdf].\n\nSource: cricket.pdf\nSource: cricket.pdf",
        ));
        assert_eq!(out.action, ReviewAction::CitationNormalized);
        assert_eq!(out.text, "LBW is leg before wicket.\n\nSource: cricket.pdf");
        assert_eq!(sx_core::answer::find_citations(&out.text).len(), 1);
    }

    #[test]
    fn off_topic_is_refused_with_exact_message() {
        let research = ResearchOutput {
            topic: Topic::OffTopic,
            route: Route::NoRetrieval,
            evidence: Evidence::NoRetrieval,
            draft: String::new(),
        };
        let out = ReviewStage.review(&research);
        assert_eq!(out.outcome, Outcome::Refused);
        assert_eq!(out.text, REFUSAL_MESSAGE);
    }

    #[test]
    fn unavailable_source_is_marked_not_fabricated() {
        let research = ResearchOutput {
            topic: Topic::Outdoor {
                sport: Some("soccer".to_string()),
            },
            route: Route::WebSearch,
            evidence: Evidence::Unavailable {
                source: EvidenceSourceKind::WebSearch,
                message: "Search is not configured.".to_string(),
            },
            draft: "Search is not configured.".to_string(),
        };
        let out = ReviewStage.review(&research);
        assert_eq!(out.action, ReviewAction::CitationAdded);
        assert_eq!(out.text, "Search is not configured.\n\nSource: unavailable");
    }

    #[test]
    fn empty_draft_yields_empty_review() {
        let out = ReviewStage.review(&cricket_research("   "));
        assert_eq!(out.action, ReviewAction::Empty);
        assert!(out.text.is_empty());
    }
}
