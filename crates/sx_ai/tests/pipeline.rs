use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use sx_ai::draft::{Composer, ExtractiveComposer, LlmComposer, NO_LOCAL_MATCH_MESSAGE};
use sx_ai::embeddings::HashingEmbedder;
use sx_ai::evidence::{EvidenceChunk, EvidenceHandle, EvidenceIndex, NOT_INITIALIZED_MESSAGE};
use sx_ai::llm::Llm;
use sx_ai::pipeline::{Coordinator, PipelineState, Stage};
use sx_ai::research::{Evidence, ResearchStage, Route};
use sx_ai::review::{ReviewAction, ReviewStage};
use sx_ai::search::tavily::NOT_CONFIGURED_MESSAGE;
use sx_ai::search::{SearchOutcome, SearchResult, TavilySearch, WebSearch};
use sx_core::answer::{find_citations, Citation, Outcome, REFUSAL_MESSAGE};
use sx_core::error::{codes, AppError};
use sx_core::query::Query;
use sx_core::topics::{Topic, TopicTaxonomy};

struct StubSearch {
    calls: AtomicUsize,
    outcome: SearchOutcome,
}

impl StubSearch {
    fn returning(outcome: SearchOutcome) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            outcome,
        }
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl WebSearch for StubSearch {
    fn provider(&self) -> &str {
        "Tavily"
    }

    fn search(&self, _query: &str) -> SearchOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcome.clone()
    }
}

fn soccer_results() -> SearchOutcome {
    SearchOutcome::Results(vec![SearchResult {
        title: "Laws of the Game: Substitutions".to_string(),
        url: "https://www.theifab.example/laws/substitutions".to_string(),
        content: "Teams may use a maximum of five substitutes in top-level competitions.".to_string(),
        score: 0.92,
    }])
}

fn sports_index() -> EvidenceHandle {
    let chunks = vec![
        EvidenceChunk::new(
            "cricket.pdf",
            0,
            "LBW stands for leg before wicket. A batter is given out LBW when the ball would have hit the stumps.",
        ),
        EvidenceChunk::new("cricket.pdf", 1, "An over consists of six legal deliveries."),
        EvidenceChunk::new(
            "tennis.pdf",
            2,
            "A tiebreak is played at six games all; the first player to seven points with a two point margin wins.",
        ),
    ];
    let index = EvidenceIndex::build(
        chunks,
        Arc::new(HashingEmbedder::default()),
        "hashing-bow-v1",
        "2026-01-01T00:00:00Z",
    )
    .expect("build index");
    EvidenceHandle::from_index(index)
}

fn coordinator(evidence: EvidenceHandle, search: Arc<dyn WebSearch>, composer: Arc<dyn Composer>) -> Coordinator {
    let research = ResearchStage::new(TopicTaxonomy::default(), evidence, search, composer, 3);
    Coordinator::new(research, ReviewStage::new())
}

#[test]
fn cricket_question_is_answered_from_the_knowledge_base() {
    let search = Arc::new(StubSearch::returning(soccer_results()));
    let c = coordinator(sports_index(), search.clone(), Arc::new(ExtractiveComposer));

    let answer = c.ask("What is LBW in cricket?").expect("ask");
    assert_eq!(answer.outcome, Outcome::Delivered);
    assert_eq!(answer.state, PipelineState::Delivered);
    assert_eq!(answer.route, Route::KnowledgeBase);
    assert!(answer.text.contains("leg before wicket"));
    assert!(answer.text.ends_with("Source: cricket.pdf"));
    assert_eq!(find_citations(&answer.text), vec![Citation::file("cricket.pdf")]);
    assert_eq!(search.call_count(), 0);

    let stages = answer.stages.iter().map(|s| s.stage).collect::<Vec<_>>();
    assert_eq!(stages, vec![Stage::Research, Stage::Review]);
}

#[test]
fn tennis_question_cites_tennis_document() {
    let search = Arc::new(StubSearch::returning(SearchOutcome::NoResults));
    let c = coordinator(sports_index(), search, Arc::new(ExtractiveComposer));
    let answer = c.ask("How does a tennis tiebreak work?").expect("ask");
    assert_eq!(
        answer.topic,
        Topic::Local {
            sport: "tennis".to_string()
        }
    );
    assert!(answer.text.ends_with("Source: tennis.pdf"));
}

#[test]
fn question_without_matching_evidence_says_so() {
    let index = EvidenceIndex::build(
        vec![EvidenceChunk::new("cricket.pdf", 0, "An over consists of six legal deliveries.")],
        Arc::new(HashingEmbedder::default()),
        "hashing-bow-v1",
        "2026-01-01T00:00:00Z",
    )
    .expect("build index");
    let search = Arc::new(StubSearch::returning(soccer_results()));
    let c = coordinator(EvidenceHandle::from_index(index), search, Arc::new(ExtractiveComposer));

    let answer = c.ask("How does a tennis tiebreak work?").expect("ask");
    assert_eq!(answer.route, Route::KnowledgeBase);
    assert!(answer.text.starts_with(NO_LOCAL_MATCH_MESSAGE));
    assert!(!answer.text.contains("six legal deliveries"));
    assert_eq!(find_citations(&answer.text), vec![Citation::Unavailable]);
}

#[test]
fn outdoor_question_uses_web_search() {
    let search = Arc::new(StubSearch::returning(soccer_results()));
    let c = coordinator(sports_index(), search.clone(), Arc::new(ExtractiveComposer));

    let answer = c.ask("How many substitutes are allowed in soccer?").expect("ask");
    assert_eq!(answer.route, Route::WebSearch);
    assert_eq!(search.call_count(), 1);
    assert!(answer.text.contains("five substitutes"));
    assert!(answer
        .text
        .ends_with("Source: Internet (Tavily) - https://www.theifab.example/laws/substitutions"));
}

#[test]
fn off_topic_question_is_refused_without_tool_calls() {
    let search = Arc::new(StubSearch::returning(soccer_results()));
    let c = coordinator(sports_index(), search.clone(), Arc::new(ExtractiveComposer));

    let answer = c.ask("What is the capital of France?").expect("ask");
    assert_eq!(answer.text, REFUSAL_MESSAGE);
    assert_eq!(answer.outcome, Outcome::Refused);
    assert_eq!(answer.state, PipelineState::Refused);
    assert_eq!(answer.route, Route::NoRetrieval);
    assert_eq!(search.call_count(), 0);
}

#[test]
fn missing_search_credential_yields_unavailable_not_fabricated_source() {
    let c = coordinator(
        sports_index(),
        Arc::new(TavilySearch::new(None, 5)),
        Arc::new(ExtractiveComposer),
    );
    let answer = c.ask("Explain the offside rule in soccer").expect("ask");
    assert_eq!(answer.outcome, Outcome::Delivered);
    assert!(answer.text.starts_with(NOT_CONFIGURED_MESSAGE));
    assert_eq!(find_citations(&answer.text), vec![Citation::Unavailable]);
}

#[test]
fn uninitialized_store_is_reported_in_the_answer() {
    let search = Arc::new(StubSearch::returning(SearchOutcome::NoResults));
    let c = coordinator(EvidenceHandle::new(), search, Arc::new(ExtractiveComposer));
    let answer = c.ask("What is LBW in cricket?").expect("ask");
    assert!(answer.text.starts_with(NOT_INITIALIZED_MESSAGE));
    assert!(answer.text.ends_with("Source: unavailable"));
}

#[test]
fn empty_web_results_are_stated_plainly() {
    let search = Arc::new(StubSearch::returning(SearchOutcome::NoResults));
    let c = coordinator(sports_index(), search, Arc::new(ExtractiveComposer));
    let answer = c.ask("Who won the golf major last week?").expect("ask");
    assert!(answer
        .text
        .starts_with("I could not find information about this in web search results."));
    assert!(answer.text.ends_with("Source: unavailable"));
}

#[test]
fn empty_query_fails_before_the_pipeline() {
    let search = Arc::new(StubSearch::returning(soccer_results()));
    let c = coordinator(sports_index(), search.clone(), Arc::new(ExtractiveComposer));
    let err = c.ask("   \n").expect_err("empty query");
    assert_eq!(err.code, codes::QUERY_EMPTY);
    assert_eq!(err.message, "No query provided");
    assert_eq!(search.call_count(), 0);
}

struct UncitedLlm;

impl Llm for UncitedLlm {
    fn generate(&self, _model: &str, _prompt: &str) -> Result<String, AppError> {
        Ok("LBW means leg before wicket.".to_string())
    }
}

struct FabricatingLlm;

impl Llm for FabricatingLlm {
    fn generate(&self, _model: &str, _prompt: &str) -> Result<String, AppError> {
        Ok("LBW means leg before wicket.\n\nSource: Internet (Tavily) - https://made.up/page".to_string())
    }
}

#[test]
fn review_appends_missing_citation() {
    let search = Arc::new(StubSearch::returning(SearchOutcome::NoResults));
    let composer = Arc::new(LlmComposer::new(Arc::new(UncitedLlm), "llama3.2"));
    let c = coordinator(sports_index(), search, composer);

    let answer = c.ask("What is LBW in cricket?").expect("ask");
    assert_eq!(answer.review_action, ReviewAction::CitationAdded);
    assert_eq!(answer.text, "LBW means leg before wicket.\n\nSource: cricket.pdf");
    assert_eq!(answer.stages[0].text, "LBW means leg before wicket.");
}

#[test]
fn review_replaces_fabricated_citation() {
    let search = Arc::new(StubSearch::returning(SearchOutcome::NoResults));
    let composer = Arc::new(LlmComposer::new(Arc::new(FabricatingLlm), "llama3.2"));
    let c = coordinator(sports_index(), search, composer);

    let answer = c.ask("What is LBW in cricket?").expect("ask");
    assert_eq!(answer.review_action, ReviewAction::CitationReplaced);
    assert_eq!(find_citations(&answer.text), vec![Citation::file("cricket.pdf")]);
}

struct SilentComposer;

impl Composer for SilentComposer {
    fn compose(&self, _query: &Query, _evidence: &Evidence) -> String {
        String::new()
    }
}

#[test]
fn empty_stage_outputs_exhaust_the_pipeline() {
    let search = Arc::new(StubSearch::returning(SearchOutcome::NoResults));
    let c = coordinator(sports_index(), search, Arc::new(SilentComposer));
    let err = c.ask("What is LBW in cricket?").expect_err("exhausted");
    assert_eq!(err.code, codes::PIPELINE_EXHAUSTED);
    assert_eq!(err.message, "No response generated by the pipeline");
}
