//! Two-stage coordinator: research, then review.
//!
//! Each stage appends one [`StageOutput`] to the run's stream. The final
//! answer is the last non-empty output in that stream.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use sx_core::answer::Outcome;
use sx_core::config::Settings;
use sx_core::error::{codes, AppError};
use sx_core::query::Query;
use sx_core::topics::{Topic, TopicTaxonomy};
use tracing::{debug, info, info_span};

use crate::draft::{Composer, ExtractiveComposer, LlmComposer};
use crate::evidence::EvidenceHandle;
use crate::llm::OllamaLlm;
use crate::ollama::OllamaClient;
use crate::research::{ResearchStage, Route};
use crate::review::{ReviewAction, ReviewStage};
use crate::search::TavilySearch;

pub const EXHAUSTED_MESSAGE: &str = "No response generated by the pipeline";

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Research,
    Review,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Research => write!(f, "Researcher"),
            Stage::Review => write!(f, "Reviewer"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Start,
    Researching,
    Reviewing,
    Delivered,
    Refused,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StageOutput {
    pub stage: Stage,
    pub text: String,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FinalAnswer {
    pub text: String,
    pub outcome: Outcome,
    pub state: PipelineState,
    pub topic: Topic,
    pub route: Route,
    pub review_action: ReviewAction,
    pub stages: Vec<StageOutput>,
}

pub struct Coordinator {
    research: ResearchStage,
    review: ReviewStage,
}

impl Coordinator {
    pub fn new(research: ResearchStage, review: ReviewStage) -> Self {
        Self { research, review }
    }

    /// Wire the default stages from settings around an existing evidence handle.
    pub fn from_settings(settings: &Settings, evidence: EvidenceHandle) -> Result<Self, AppError> {
        let search = Arc::new(TavilySearch::new(
            settings.tavily_api_key.clone(),
            settings.search_max_results,
        ));
        let composer: Arc<dyn Composer> = match settings.llm_model.as_deref() {
            Some(model) => {
                let client = OllamaClient::new(&settings.ollama_base_url)?;
                info!(%model, "Drafting answers with local LLM");
                Arc::new(LlmComposer::new(Arc::new(OllamaLlm::new(client)), model))
            }
            None => Arc::new(ExtractiveComposer),
        };
        let research = ResearchStage::new(
            TopicTaxonomy::default(),
            evidence,
            search,
            composer,
            settings.top_k,
        );
        Ok(Self::new(research, ReviewStage::new()))
    }

    pub fn ask(&self, raw: &str) -> Result<FinalAnswer, AppError> {
        let query = Query::parse(raw)?;
        let _span = info_span!("ask", query = %query.as_str()).entered();
        let mut state = PipelineState::Start;
        let mut stages: Vec<StageOutput> = Vec::with_capacity(2);

        advance(&mut state, PipelineState::Researching);
        let started = Instant::now();
        let research = self.research.run(&query);
        stages.push(StageOutput {
            stage: Stage::Research,
            text: research.draft.clone(),
            elapsed_ms: started.elapsed().as_millis() as u64,
        });
        info!(
            stage = %Stage::Research,
            route = ?research.route,
            elapsed_ms = stages[0].elapsed_ms,
            "Stage complete"
        );

        advance(&mut state, PipelineState::Reviewing);
        let started = Instant::now();
        let review = self.review.review(&research);
        stages.push(StageOutput {
            stage: Stage::Review,
            text: review.text.clone(),
            elapsed_ms: started.elapsed().as_millis() as u64,
        });
        info!(
            stage = %Stage::Review,
            action = ?review.action,
            elapsed_ms = stages[1].elapsed_ms,
            "Stage complete"
        );

        let text = select_final(&stages)
            .map(|s| s.text.trim().to_string())
            .ok_or_else(|| AppError::new(codes::PIPELINE_EXHAUSTED, EXHAUSTED_MESSAGE))?;

        advance(
            &mut state,
            match review.outcome {
                Outcome::Delivered => PipelineState::Delivered,
                Outcome::Refused => PipelineState::Refused,
            },
        );

        Ok(FinalAnswer {
            text,
            outcome: review.outcome,
            state,
            topic: research.topic,
            route: research.route,
            review_action: review.action,
            stages,
        })
    }
}

fn advance(state: &mut PipelineState, next: PipelineState) {
    debug!(from = ?state, to = ?next, "Pipeline transition");
    *state = next;
}

/// Last stage output with non-blank text.
pub fn select_final(outputs: &[StageOutput]) -> Option<&StageOutput> {
    outputs.iter().rev().find(|o| !o.text.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn out(stage: Stage, text: &str) -> StageOutput {
        StageOutput {
            stage,
            text: text.to_string(),
            elapsed_ms: 0,
        }
    }

    #[test]
    fn selects_last_non_empty_output() {
        let outputs = vec![out(Stage::Research, "draft"), out(Stage::Review, "final")];
        assert_eq!(select_final(&outputs).map(|o| o.stage), Some(Stage::Review));

        let outputs = vec![out(Stage::Research, "draft"), out(Stage::Review, "  \n")];
        assert_eq!(select_final(&outputs).map(|o| o.text.as_str()), Some("draft"));
    }

    #[test]
    fn all_empty_stream_selects_nothing() {
        let outputs = vec![out(Stage::Research, ""), out(Stage::Review, " ")];
        assert!(select_final(&outputs).is_none());
        assert!(select_final(&[]).is_none());
    }

    #[test]
    fn stage_names_render_as_roles() {
        assert_eq!(Stage::Research.to_string(), "Researcher");
        assert_eq!(Stage::Review.to_string(), "Reviewer");
    }
}
