//! Document and field value definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// A single stored/indexed field value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldValue {
    Long(i64),
    Double(f64),
    Text(String),
    Date(DateTime<Utc>),
}

impl FieldValue {
    /// Rank used to order values of different kinds against each other
    fn kind_rank(&self) -> u8 {
        match self {
            FieldValue::Long(_) => 0,
            FieldValue::Double(_) => 1,
            FieldValue::Date(_) => 2,
            FieldValue::Text(_) => 3,
        }
    }

    /// Total order over field values.
    ///
    /// Values of the same kind compare naturally (doubles via `total_cmp`);
    /// values of different kinds compare by kind.
    pub fn compare(&self, other: &FieldValue) -> Ordering {
        match (self, other) {
            (FieldValue::Long(a), FieldValue::Long(b)) => a.cmp(b),
            (FieldValue::Double(a), FieldValue::Double(b)) => a.total_cmp(b),
            (FieldValue::Text(a), FieldValue::Text(b)) => a.cmp(b),
            (FieldValue::Date(a), FieldValue::Date(b)) => a.cmp(b),
            _ => self.kind_rank().cmp(&other.kind_rank()),
        }
    }

    /// Whether this value equals the textual form used in term queries
    pub fn matches_text(&self, text: &str) -> bool {
        match self {
            FieldValue::Long(v) => text.parse::<i64>().map(|t| t == *v).unwrap_or(false),
            FieldValue::Double(v) => text.parse::<f64>().map(|t| t == *v).unwrap_or(false),
            FieldValue::Text(v) => v == text,
            FieldValue::Date(v) => DateTime::parse_from_rfc3339(text)
                .map(|t| t.with_timezone(&Utc) == *v)
                .unwrap_or(false),
        }
    }

    /// Rough in-memory footprint, used for segment size accounting
    pub fn approx_bytes(&self) -> usize {
        match self {
            FieldValue::Text(s) => s.len(),
            _ => 8,
        }
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::Long(v) => write!(f, "{}", v),
            FieldValue::Double(v) => write!(f, "{}", v),
            FieldValue::Text(v) => write!(f, "{}", v),
            FieldValue::Date(v) => write!(f, "{}", v.to_rfc3339()),
        }
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Long(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Double(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(v: DateTime<Utc>) -> Self {
        FieldValue::Date(v)
    }
}

/// A document: a unique key plus named field values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Unique key
    pub id: String,
    /// Field values (the unique key is not repeated here)
    pub fields: BTreeMap<String, FieldValue>,
}

impl Document {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style field setter
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.set_field(name, value);
        self
    }

    pub fn set_field(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Field lookup that also resolves the unique key field by name
    pub fn value_of(&self, name: &str, unique_key: &str) -> Option<FieldValue> {
        if name == unique_key {
            Some(FieldValue::Text(self.id.clone()))
        } else {
            self.fields.get(name).cloned()
        }
    }

    pub fn approx_bytes(&self) -> usize {
        self.id.len()
            + self
                .fields
                .iter()
                .map(|(k, v)| k.len() + v.approx_bytes())
                .sum::<usize>()
    }
}
