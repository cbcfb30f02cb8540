use serde::{Deserialize, Serialize};

use crate::error::{codes, AppError};

/// A user question, trimmed and guaranteed non-empty.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Query(String);

impl Query {
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let text = raw.trim();
        if text.is_empty() {
            return Err(AppError::new(codes::QUERY_EMPTY, "No query provided"));
        }
        Ok(Self(text.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_blank_queries() {
        for raw in ["", "   ", "\n\t "] {
            let err = Query::parse(raw).expect_err("blank");
            assert_eq!(err.code, codes::QUERY_EMPTY);
        }
    }

    #[test]
    fn trims_surrounding_whitespace() {
        let q = Query::parse("  who won wimbledon? \n").unwrap();
        assert_eq!(q.as_str(), "who won wimbledon?");
    }
}
