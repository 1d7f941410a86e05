//! Match predicates
//!
//! Ranking is not modelled; a query only decides which documents match.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::document::Document;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryParseError {
    #[error("Empty query")]
    Empty,
    #[error("Malformed clause: {0}")]
    Malformed(String),
}

/// Match predicate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Query {
    /// Matches every document
    All,
    /// Field equals the textual value
    Term { field: String, value: String },
    /// Every sub-query matches
    And(Vec<Query>),
}

impl Query {
    pub fn term(field: impl Into<String>, value: impl Into<String>) -> Self {
        Query::Term {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Parse `*:*`, `field:value` and `a AND b` forms
    pub fn parse(text: &str) -> Result<Self, QueryParseError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(QueryParseError::Empty);
        }

        let clauses: Vec<&str> = text.split(" AND ").map(str::trim).collect();
        let mut parsed = Vec::with_capacity(clauses.len());
        for clause in clauses {
            if clause == "*:*" {
                parsed.push(Query::All);
                continue;
            }
            let (field, value) = clause
                .split_once(':')
                .ok_or_else(|| QueryParseError::Malformed(clause.to_string()))?;
            if field.is_empty() || value.is_empty() {
                return Err(QueryParseError::Malformed(clause.to_string()));
            }
            parsed.push(Query::term(field, value));
        }

        if parsed.len() == 1 {
            Ok(parsed.remove(0))
        } else {
            Ok(Query::And(parsed))
        }
    }

    pub fn matches(&self, doc: &Document, unique_key: &str) -> bool {
        match self {
            Query::All => true,
            Query::Term { field, value } => {
                if field == unique_key {
                    doc.id == *value
                } else {
                    doc.get(field).map(|v| v.matches_text(value)).unwrap_or(false)
                }
            }
            Query::And(queries) => queries.iter().all(|q| q.matches(doc, unique_key)),
        }
    }
}

impl std::str::FromStr for Query {
    type Err = QueryParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
