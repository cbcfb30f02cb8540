//! Answer text conventions shared by the research and review stages.
//!
//! Every delivered answer carries one citation tag on its own line:
//!
//! ```text
//! Source: cricket.pdf
//! Source: Internet (Tavily) - https://example.com/page
//! Source: unavailable
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

/// Fixed policy message returned for anything outside the sports domain.
pub const REFUSAL_MESSAGE: &str =
    "Sorry, I am only trained in sports area. Other than outdoor sports, I do not have knowledge or expertise.";

const REFUSAL_MARKER: &str = "Other than outdoor sports, I do not have knowledge";

pub const WEB_PROVIDER: &str = "Tavily";

const TAG_PREFIX: &str = "Source:";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Delivered,
    Refused,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum Citation {
    File(String),
    Internet { provider: String, url: Option<String> },
    Unavailable,
}

impl Citation {
    pub fn file(name: impl Into<String>) -> Self {
        Self::File(name.into())
    }

    pub fn web(url: impl Into<String>) -> Self {
        let url = url.into();
        Self::Internet {
            provider: WEB_PROVIDER.to_string(),
            url: if url.trim().is_empty() { None } else { Some(url) },
        }
    }

    /// Parse the text that follows `Source:`.
    pub fn parse_value(value: &str) -> Option<Self> {
        let v = value.trim().trim_end_matches(']').trim().trim_end_matches('.').trim();
        if v.is_empty() {
            return None;
        }
        if v.eq_ignore_ascii_case("unavailable") {
            return Some(Self::Unavailable);
        }
        if let Some(rest) = v.strip_prefix("Internet (") {
            let close = rest.find(')')?;
            let provider = rest[..close].trim().to_string();
            let tail = rest[close + 1..].trim();
            let url = tail.strip_prefix('-').map(str::trim).unwrap_or(tail);
            return Some(Self::Internet {
                provider,
                url: if url.is_empty() { None } else { Some(url.to_string()) },
            });
        }
        Some(Self::File(v.to_string()))
    }
}

impl fmt::Display for Citation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Citation::File(name) => write!(f, "{TAG_PREFIX} {name}"),
            Citation::Internet {
                provider,
                url: Some(url),
            } => write!(f, "{TAG_PREFIX} Internet ({provider}) - {url}"),
            Citation::Internet { provider, url: None } => {
                write!(f, "{TAG_PREFIX} Internet ({provider})")
            }
            Citation::Unavailable => write!(f, "{TAG_PREFIX} unavailable"),
        }
    }
}

/// Byte ranges of one tag within a line: `start..end` covers any enclosing
/// brackets, `value` is the text after `Source:`.
struct TagSpan {
    start: usize,
    end: usize,
    value: Range<usize>,
}

fn tag_spans(line: &str) -> Vec<TagSpan> {
    let mut spans = Vec::new();
    let mut from = 0;
    while let Some(found) = line[from..].find(TAG_PREFIX) {
        let pos = from + found;
        let value_start = pos + TAG_PREFIX.len();
        let before = line[from..pos].trim_end();
        let closer = match before.chars().last() {
            Some('[') => Some(']'),
            Some('(') => Some(')'),
            _ => None,
        };
        let start = if closer.is_some() { from + before.len() - 1 } else { pos };

        let after = &line[value_start..];
        let skip = provider_len(after);
        let next_tag = after[skip..]
            .find(TAG_PREFIX)
            .map_or(after.len(), |i| i + skip);
        let close_at = closing(&after[skip..next_tag], closer.unwrap_or(']')).map(|i| i + skip);
        let (value_end, end) = match close_at {
            Some(i) => (i, i + 1),
            None => (next_tag, next_tag),
        };

        spans.push(TagSpan {
            start,
            end: value_start + end,
            value: value_start..value_start + value_end,
        });
        from = value_start + end;
    }
    spans
}

/// Length of a leading `Internet (<provider>)` so its parenthesis is not
/// taken for the end of the tag.
fn provider_len(after: &str) -> usize {
    let trimmed = after.trim_start();
    trimmed
        .strip_prefix("Internet (")
        .and_then(|rest| rest.find(')').map(|close| after.len() - rest.len() + close + 1))
        .unwrap_or(0)
}

/// Position of the unbalanced `close` in `s`, if any.
fn closing(s: &str, close: char) -> Option<usize> {
    let open = if close == ')' { '(' } else { '[' };
    let mut depth = 0usize;
    for (i, c) in s.char_indices() {
        if c == open {
            depth += 1;
        } else if c == close {
            if depth == 0 {
                return Some(i);
            }
            depth -= 1;
        }
    }
    None
}

/// Every citation tag found in `text`, in order of appearance.
///
/// Accepts bare (`Source: x`), bracketed (`[Source: x]`) and parenthesized
/// (`(Source: x)`) forms. A bracketed tag ends at its closing bracket, so
/// prose after it on the same line is not part of the value.
pub fn find_citations(text: &str) -> Vec<Citation> {
    text.lines()
        .flat_map(|line| {
            tag_spans(line)
                .into_iter()
                .filter_map(|span| Citation::parse_value(&line[span.value]))
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Remove citation tags and their brackets, keeping the surrounding prose.
/// Lines left empty by the removal are dropped.
pub fn strip_citations(text: &str) -> String {
    let mut lines = Vec::new();
    for line in text.lines() {
        let spans = tag_spans(line);
        if spans.is_empty() {
            lines.push(line.to_string());
            continue;
        }
        let mut kept = String::new();
        let mut cursor = 0;
        for span in &spans {
            push_prose(&mut kept, &line[cursor..span.start]);
            cursor = span.end;
        }
        push_prose(&mut kept, &line[cursor..]);
        if !kept.is_empty() {
            lines.push(kept);
        }
    }
    lines.join("\n").trim_end().to_string()
}

fn push_prose(out: &mut String, piece: &str) {
    let piece = if out.is_empty() { piece.trim_end() } else { piece.trim() };
    if piece.trim().is_empty() {
        return;
    }
    if !out.is_empty() && !piece.starts_with(['.', ',', ';', ':', '!', '?']) {
        out.push(' ');
    }
    out.push_str(piece);
}

pub fn with_citation(body: &str, citation: &Citation) -> String {
    let body = body.trim_end();
    if body.is_empty() {
        return citation.to_string();
    }
    format!("{body}\n\n{citation}")
}

pub fn is_refusal(text: &str) -> bool {
    text.contains(REFUSAL_MARKER)
}
