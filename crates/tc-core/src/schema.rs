//! Index schema definitions
//!
//! Field declarations plus dynamic-field suffix/prefix rules.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::document::{Document, FieldValue};
use crate::sort::SortKey;

/// Field type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Long,
    Double,
    Text,
    Date,
}

impl FieldType {
    fn accepts(&self, value: &FieldValue) -> bool {
        matches!(
            (self, value),
            (FieldType::Long, FieldValue::Long(_))
                | (FieldType::Double, FieldValue::Double(_))
                | (FieldType::Text, FieldValue::Text(_))
                | (FieldType::Date, FieldValue::Date(_))
        )
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldType::Long => write!(f, "long"),
            FieldType::Double => write!(f, "double"),
            FieldType::Text => write!(f, "text"),
            FieldType::Date => write!(f, "date"),
        }
    }
}

fn default_true() -> bool {
    true
}

/// Field definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Whether the field can be used in a sort
    #[serde(default = "default_true")]
    pub sortable: bool,
}

/// Dynamic field rule, `*_suffix` or `prefix_*`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamicField {
    pub pattern: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default = "default_true")]
    pub sortable: bool,
}

impl DynamicField {
    fn matches(&self, name: &str) -> bool {
        if let Some(suffix) = self.pattern.strip_prefix('*') {
            name.ends_with(suffix)
        } else if let Some(prefix) = self.pattern.strip_suffix('*') {
            name.starts_with(prefix)
        } else {
            self.pattern == name
        }
    }
}

/// Schema error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("Undefined field: {0}")]
    UndefinedField(String),
    #[error("Field {0} is not sortable")]
    NotSortable(String),
    #[error("Field {field} expects {expected} values")]
    WrongType { field: String, expected: FieldType },
    #[error("Document is missing unique key field {0}")]
    MissingUniqueKey(String),
}

/// Index schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSchema {
    /// Schema name
    pub name: String,
    /// Unique key field name
    pub unique_key: String,
    #[serde(default)]
    pub fields: Vec<FieldDef>,
    #[serde(default)]
    pub dynamic_fields: Vec<DynamicField>,
}

impl Default for IndexSchema {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            unique_key: "id".to_string(),
            fields: vec![FieldDef {
                name: "id".to_string(),
                field_type: FieldType::Text,
                sortable: true,
            }],
            dynamic_fields: vec![
                DynamicField {
                    pattern: "*_l1".to_string(),
                    field_type: FieldType::Long,
                    sortable: true,
                },
                DynamicField {
                    pattern: "*_s".to_string(),
                    field_type: FieldType::Text,
                    sortable: true,
                },
                DynamicField {
                    pattern: "*_d".to_string(),
                    field_type: FieldType::Double,
                    sortable: true,
                },
                DynamicField {
                    pattern: "*_dt".to_string(),
                    field_type: FieldType::Date,
                    sortable: true,
                },
            ],
        }
    }
}

impl IndexSchema {
    /// Add an explicit field (builder style)
    pub fn with_field(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.fields.push(FieldDef {
            name: name.into(),
            field_type,
            sortable: true,
        });
        self
    }

    /// Resolve a field by name: explicit fields first, then dynamic rules in
    /// declaration order
    pub fn field(&self, name: &str) -> Option<(FieldType, bool)> {
        if let Some(f) = self.fields.iter().find(|f| f.name == name) {
            return Some((f.field_type, f.sortable));
        }
        self.dynamic_fields
            .iter()
            .find(|d| d.matches(name))
            .map(|d| (d.field_type, d.sortable))
    }

    /// Check every field in the sort is defined and sortable
    pub fn validate_sort(&self, sort: &SortKey) -> Result<(), SchemaError> {
        for sf in &sort.fields {
            match self.field(&sf.field) {
                None => return Err(SchemaError::UndefinedField(sf.field.clone())),
                Some((_, false)) => return Err(SchemaError::NotSortable(sf.field.clone())),
                Some(_) => {}
            }
        }
        Ok(())
    }

    /// Check a document against the schema
    pub fn validate_document(&self, doc: &Document) -> Result<(), SchemaError> {
        if doc.id.is_empty() {
            return Err(SchemaError::MissingUniqueKey(self.unique_key.clone()));
        }
        for (name, value) in &doc.fields {
            let (field_type, _) = self
                .field(name)
                .ok_or_else(|| SchemaError::UndefinedField(name.clone()))?;
            if !field_type.accepts(value) {
                return Err(SchemaError::WrongType {
                    field: name.clone(),
                    expected: field_type,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> IndexSchema {
        IndexSchema::default().with_field("timestamp", FieldType::Date)
    }

    #[test]
    fn test_dynamic_field_resolution() {
        let schema = schema();
        assert_eq!(schema.field("odd_l1"), Some((FieldType::Long, true)));
        assert_eq!(schema.field("timestamp"), Some((FieldType::Date, true)));
        assert_eq!(schema.field("title"), None);
    }

    #[test]
    fn test_validate_sort() {
        let schema = schema();
        assert!(schema
            .validate_sort(&SortKey::parse("timestamp desc, id asc").unwrap())
            .is_ok());
        assert_eq!(
            schema.validate_sort(&SortKey::parse("title asc").unwrap()),
            Err(SchemaError::UndefinedField("title".to_string()))
        );
    }

    #[test]
    fn test_validate_document() {
        let schema = schema();
        let ok = Document::new("1").with_field("odd_l1", 1i64);
        assert!(schema.validate_document(&ok).is_ok());

        let bad = Document::new("2").with_field("odd_l1", "one");
        assert!(matches!(
            schema.validate_document(&bad),
            Err(SchemaError::WrongType { .. })
        ));
    }
}
