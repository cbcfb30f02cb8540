use sx_core::answer::{find_citations, Citation};
use sx_core::error::{codes, AppError};

use crate::research::Evidence;

/// Enforce that an answer carries at least one `Source:` tag.
pub fn enforce_citations(output: &str) -> Result<Vec<Citation>, AppError> {
    let citations = find_citations(output);
    if citations.is_empty() {
        return Err(AppError::new(
            codes::AI_CITATION_REQUIRED,
            "Answer must include a source citation",
        ));
    }
    Ok(citations)
}

/// Citations that name something absent from `evidence`.
pub fn unsupported_citations<'a>(citations: &'a [Citation], evidence: &Evidence) -> Vec<&'a Citation> {
    citations.iter().filter(|c| !evidence.supports(c)).collect()
}

/// Whether `draft` ends with a single tag, alone on its last line and in
/// rendered form.
pub fn has_canonical_citation(draft: &str, citations: &[Citation]) -> bool {
    match citations {
        [only] => draft
            .trim_end()
            .lines()
            .last()
            .is_some_and(|line| line.trim() == only.to_string()),
        _ => false,
    }
}

/// The citation an answer built on `evidence` must carry.
pub fn required_citation(evidence: &Evidence) -> Citation {
    evidence.primary_citation().unwrap_or(Citation::Unavailable)
}
