use std::sync::Arc;

use sx_ai::embeddings::{Embedder, HashingEmbedder};
use sx_ai::evidence::{EvidenceChunk, EvidenceIndex};
use sx_ai::retrieve::rank;
use sx_core::error::{codes, AppError};

struct CountABEmbedder;

impl Embedder for CountABEmbedder {
    fn embed(&self, _model: &str, input: &str) -> Result<Vec<f32>, AppError> {
        let mut a = 0u32;
        let mut b = 0u32;
        for ch in input.chars() {
            if ch == 'a' {
                a += 1;
            } else if ch == 'b' {
                b += 1;
            }
        }
        Ok(vec![a as f32, b as f32])
    }
}

fn index_of(texts: &[(&str, &str)], embedder: Arc<dyn Embedder>) -> EvidenceIndex {
    let chunks = texts
        .iter()
        .enumerate()
        .map(|(i, (source, text))| EvidenceChunk::new(source, i as u32, *text))
        .collect();
    EvidenceIndex::build(chunks, embedder, "test-model", "2026-01-01T00:00:00Z").expect("build")
}

#[test]
fn ties_break_by_ingestion_order() {
    let index = index_of(
        &[("one.txt", "aab"), ("two.txt", "aaaabb"), ("three.txt", "bbb")],
        Arc::new(CountABEmbedder),
    );
    let hits = rank(&index, "aab", 3).expect("rank");
    let order = hits.iter().map(|h| h.chunk.source_name.as_str()).collect::<Vec<_>>();
    assert_eq!(order, vec!["one.txt", "two.txt", "three.txt"]);
    assert!((hits[0].score - hits[1].score).abs() < 1e-6);

    let again = rank(&index, "aab", 3).expect("rank again");
    assert_eq!(hits, again);
}

#[test]
fn top_k_is_clamped() {
    let index = index_of(&[("a.txt", "a"), ("b.txt", "ab")], Arc::new(CountABEmbedder));
    assert_eq!(rank(&index, "a", 0).expect("k=0").len(), 1);
    assert_eq!(rank(&index, "a", 500).expect("k=500").len(), 2);
}

#[test]
fn lexical_match_ranks_relevant_file_first() {
    let index = index_of(
        &[
            ("tennis.pdf", "A tiebreak is played when the set reaches six games all."),
            ("cricket.pdf", "LBW stands for leg before wicket; the umpire rules on LBW appeals."),
            ("cricket.pdf", "An over has six legal deliveries."),
        ],
        Arc::new(HashingEmbedder::default()),
    );
    let hits = rank(&index, "What does LBW mean in cricket?", 2).expect("rank");
    assert_eq!(hits[0].chunk.source_name, "cricket.pdf");
    assert!(hits[0].chunk.text.contains("leg before wicket"));
}

#[test]
fn empty_query_is_rejected_and_stop_words_match_nothing() {
    let index = index_of(&[("a.txt", "serve and volley")], Arc::new(HashingEmbedder::default()));
    let err = rank(&index, "   ", 3).expect_err("blank query");
    assert_eq!(err.code, codes::RETRIEVAL_FAILED);
    assert!(rank(&index, "what is the", 3).expect("stop words").is_empty());
}

#[test]
fn unrelated_chunks_are_not_returned() {
    let index = index_of(
        &[("a.txt", "aaaa"), ("b.txt", "bbbb"), ("ab.txt", "ab")],
        Arc::new(CountABEmbedder),
    );
    let hits = rank(&index, "bb", 3).expect("rank");
    let order = hits.iter().map(|h| h.chunk.source_name.as_str()).collect::<Vec<_>>();
    assert_eq!(order, vec!["b.txt", "ab.txt"]);

    let cricket_only = index_of(
        &[("cricket.pdf", "An over consists of six legal deliveries.")],
        Arc::new(HashingEmbedder::default()),
    );
    assert!(rank(&cricket_only, "How does a tennis tiebreak work?", 3)
        .expect("rank")
        .is_empty());
}
