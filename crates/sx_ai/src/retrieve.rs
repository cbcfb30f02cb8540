use std::cmp::Ordering;

use sx_core::error::{codes, AppError};

use crate::evidence::{EvidenceIndex, ScoredChunk};

pub const MAX_TOP_K: u32 = 50;

/// Chunks scoring at or below this are dropped.
pub const MIN_SCORE: f32 = 0.0;

/// Rank index chunks against `query` by cosine similarity.
///
/// Only chunks scoring above [`MIN_SCORE`] are returned, so a query sharing
/// nothing with the store yields no hits. Ties are broken by ingestion order
/// so repeated queries return the same sequence.
pub fn rank(index: &EvidenceIndex, query: &str, top_k: u32) -> Result<Vec<ScoredChunk>, AppError> {
    let q = query.trim();
    if q.is_empty() {
        return Err(AppError::new(codes::RETRIEVAL_FAILED, "Query must not be empty"));
    }
    let top_k = top_k.clamp(1, MAX_TOP_K) as usize;

    let status = index.status();
    let model = status
        .model
        .as_deref()
        .ok_or_else(|| AppError::new(codes::EVIDENCE_NOT_INITIALIZED, "Index status missing model"))?;
    let dims = status
        .dims
        .ok_or_else(|| AppError::new(codes::EVIDENCE_NOT_INITIALIZED, "Index status missing dims"))?;

    let qv = index.embedder().embed(model, q)?;
    if qv.len() as u32 != dims {
        return Err(AppError::new(
            codes::RETRIEVAL_FAILED,
            "Query embedding dims do not match index dims",
        )
        .with_details(format!("index_dims={dims}; query_dims={}", qv.len())));
    }
    let qnorm = l2_norm(&qv);
    if qnorm == 0.0 {
        // Nothing to compare against (e.g. a query made only of stop words).
        return Ok(Vec::new());
    }

    let mut hits: Vec<(usize, f32)> = Vec::new();
    for (pos, chunk) in index.chunks().iter().enumerate() {
        let Some(v) = index.vector(&chunk.chunk_id) else {
            continue;
        };
        let vnorm = l2_norm(v);
        if vnorm == 0.0 {
            continue;
        }
        let score = cosine_similarity(&qv, v, qnorm, vnorm);
        if score <= MIN_SCORE {
            continue;
        }
        hits.push((pos, score));
    }

    let chunks = index.chunks();
    hits.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then(chunks[a.0].ordinal.cmp(&chunks[b.0].ordinal))
    });
    hits.truncate(top_k);

    Ok(hits
        .into_iter()
        .map(|(pos, score)| ScoredChunk {
            chunk: chunks[pos].clone(),
            score,
        })
        .collect())
}

fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

fn cosine_similarity(a: &[f32], b: &[f32], a_norm: f32, b_norm: f32) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    dot / (a_norm * b_norm)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_of_parallel_vectors_is_one() {
        let a = [1.0, 2.0, 3.0];
        let b = [2.0, 4.0, 6.0];
        let s = cosine_similarity(&a, &b, l2_norm(&a), l2_norm(&b));
        assert!((s - 1.0).abs() < 1e-6);
    }

    #[test]
    fn orthogonal_vectors_score_zero() {
        let a = [1.0, 0.0];
        let b = [0.0, 3.0];
        assert_eq!(cosine_similarity(&a, &b, l2_norm(&a), l2_norm(&b)), 0.0);
    }
}
