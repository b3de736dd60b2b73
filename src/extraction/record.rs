//! SPARQL JSON result rows and their validated form
//!
//! A result document looks like
//! `{"head": {"vars": [...]}, "results": {"bindings": [{"event1": {"type": "uri", "value": "..."}}]}}`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// One tagged value as the endpoint sends it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawValue {
    /// `uri`, `literal`, `typed-literal` or `bnode`
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
    #[serde(rename = "xml:lang", default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datatype: Option<String>,
}

impl RawValue {
    pub fn uri(value: impl Into<String>) -> Self {
        Self { kind: "uri".to_string(), value: value.into(), language: None, datatype: None }
    }

    pub fn literal(value: impl Into<String>) -> Self {
        Self { kind: "literal".to_string(), value: value.into(), language: None, datatype: None }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn value_kind(&self) -> ValueKind {
        match self.kind.as_str() {
            "uri" => ValueKind::Uri,
            // SPARQL 1.0 JSON used a separate tag for typed literals
            "literal" | "typed-literal" => ValueKind::Literal,
            "bnode" => ValueKind::BlankNode,
            _ => ValueKind::Unknown,
        }
    }
}

/// Kind of a raw value after normalising the wire tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Uri,
    Literal,
    BlankNode,
    Unknown,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Uri => f.write_str("uri"),
            ValueKind::Literal => f.write_str("literal"),
            ValueKind::BlankNode => f.write_str("bnode"),
            ValueKind::Unknown => f.write_str("unknown"),
        }
    }
}

/// One result row: variable name -> tagged value. Unbound variables are simply absent.
pub type RawRecord = HashMap<String, RawValue>;

/// Top-level SPARQL JSON results document.
#[derive(Debug, Clone, Deserialize)]
pub struct SparqlResults {
    pub results: ResultBindings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResultBindings {
    pub bindings: Vec<RawRecord>,
}

/// A value that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypedValue {
    /// Reference to an entity
    Uri(String),
    /// Free text or a typed literal (dates, numbers)
    Literal { text: String, language: Option<String>, datatype: Option<String> },
}

impl TypedValue {
    pub fn text(&self) -> &str {
        match self {
            TypedValue::Uri(uri) => uri,
            TypedValue::Literal { text, .. } => text,
        }
    }
}

/// A fully typed record. Every field of the schema has an entry; optional fields that were
/// missing resolve to `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidRecord {
    values: HashMap<String, Option<TypedValue>>,
}

impl ValidRecord {
    pub(crate) fn insert(&mut self, field: &str, value: Option<TypedValue>) {
        self.values.insert(field.to_string(), value);
    }

    /// The value of `field`, `None` when absent or not part of the schema.
    pub fn get(&self, field: &str) -> Option<&TypedValue> {
        self.values.get(field).and_then(Option::as_ref)
    }

    /// Text of `field`, `None` when absent.
    pub fn text(&self, field: &str) -> Option<&str> {
        self.get(field).map(TypedValue::text)
    }

    /// `true` when `field` belongs to the schema but resolved to an explicit absence.
    pub fn is_absent(&self, field: &str) -> bool {
        matches!(self.values.get(field), Some(None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_raw_value_with_language() {
        let raw: RawValue =
            serde_json::from_str(r#"{"type": "literal", "value": "human", "xml:lang": "en"}"#)
                .unwrap();
        assert_eq!(raw.value_kind(), ValueKind::Literal);
        assert_eq!(raw.language.as_deref(), Some("en"));
    }

    #[test]
    fn test_typed_literal_is_literal() {
        let raw: RawValue = serde_json::from_str(
            r#"{"type": "typed-literal", "value": "1952-03-11T00:00:00Z",
                "datatype": "http://www.w3.org/2001/XMLSchema#dateTime"}"#,
        )
        .unwrap();
        assert_eq!(raw.value_kind(), ValueKind::Literal);
        assert!(raw.datatype.is_some());
    }

    #[test]
    fn test_unknown_kind() {
        let raw = RawValue { kind: "triple".to_string(), value: "x".to_string(), language: None, datatype: None };
        assert_eq!(raw.value_kind(), ValueKind::Unknown);
    }

    #[test]
    fn test_absent_versus_unknown_field() {
        let mut record = ValidRecord::default();
        record.insert("genreLabel", None);
        assert!(record.is_absent("genreLabel"));
        assert!(!record.is_absent("author"));
        assert!(record.get("genreLabel").is_none());
    }
}
