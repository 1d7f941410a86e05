//! Sort key definitions
//!
//! A `SortKey` is the ordered list of (field, direction) pairs that either a
//! segment asserts its documents satisfy, or a request asks results in.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use thiserror::Error;

use crate::document::{Document, FieldValue};

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn reverse(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

impl std::fmt::Display for SortDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortDirection::Asc => write!(f, "asc"),
            SortDirection::Desc => write!(f, "desc"),
        }
    }
}

/// One (field, direction) pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortField {
    pub field: String,
    pub direction: SortDirection,
}

impl SortField {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// Sort parse error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SortParseError {
    #[error("Empty sort clause in '{0}'")]
    EmptyClause(String),
    #[error("Missing sort direction for field '{0}'")]
    MissingDirection(String),
    #[error("Unknown sort direction '{0}'")]
    UnknownDirection(String),
}

/// Ordered sequence of sort fields
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortKey {
    pub fields: Vec<SortField>,
}

impl SortKey {
    pub fn new(fields: Vec<SortField>) -> Self {
        Self { fields }
    }

    /// Index order (no explicit sort)
    pub fn index_order() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Parse the `"field dir, field dir"` form
    pub fn parse(text: &str) -> Result<Self, SortParseError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Self::default());
        }

        let mut fields = Vec::new();
        for clause in text.split(',') {
            let mut parts = clause.split_whitespace();
            let field = parts
                .next()
                .ok_or_else(|| SortParseError::EmptyClause(text.to_string()))?;
            let direction = match parts.next() {
                Some(d) if d.eq_ignore_ascii_case("asc") => SortDirection::Asc,
                Some(d) if d.eq_ignore_ascii_case("desc") => SortDirection::Desc,
                Some(d) => return Err(SortParseError::UnknownDirection(d.to_string())),
                None => return Err(SortParseError::MissingDirection(field.to_string())),
            };
            if let Some(extra) = parts.next() {
                return Err(SortParseError::UnknownDirection(extra.to_string()));
            }
            fields.push(SortField {
                field: field.to_string(),
                direction,
            });
        }

        Ok(Self { fields })
    }

    /// Whether `self` is a leading prefix of `other`, matching both field
    /// identity and direction at every position.
    ///
    /// An empty key is a prefix of nothing: index order carries no ranking
    /// guarantee worth stopping on.
    pub fn is_prefix_of(&self, other: &SortKey) -> bool {
        !self.fields.is_empty()
            && self.fields.len() <= other.fields.len()
            && self.fields.iter().zip(other.fields.iter()).all(|(a, b)| a == b)
    }

    /// Extract this key's sort values from a document
    pub fn values_for(&self, doc: &Document, unique_key: &str) -> SortValues {
        SortValues(
            self.fields
                .iter()
                .map(|f| doc.value_of(&f.field, unique_key))
                .collect(),
        )
    }

    /// Compare two value tuples under this key.
    ///
    /// Missing values sort last regardless of direction.
    pub fn compare(&self, a: &SortValues, b: &SortValues) -> Ordering {
        for (i, field) in self.fields.iter().enumerate() {
            let ord = match (a.0.get(i).and_then(Option::as_ref), b.0.get(i).and_then(Option::as_ref)) {
                (Some(x), Some(y)) => {
                    let ord = x.compare(y);
                    match field.direction {
                        SortDirection::Asc => ord,
                        SortDirection::Desc => ord.reverse(),
                    }
                }
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}

impl std::fmt::Display for SortKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .fields
            .iter()
            .map(|s| format!("{} {}", s.field, s.direction))
            .collect();
        write!(f, "{}", parts.join(", "))
    }
}

impl std::str::FromStr for SortKey {
    type Err = SortParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Per-document sort values, positionally aligned with a `SortKey`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SortValues(pub Vec<Option<FieldValue>>);
