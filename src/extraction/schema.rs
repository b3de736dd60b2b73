//! Declarative record schemas: `(field name, value kind, required?)` tuples

use std::fmt;

/// Kind a field's value must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Entity reference
    Uri,
    /// Label, free text or typed literal
    Literal,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Uri => f.write_str("uri"),
            FieldKind::Literal => f.write_str("literal"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    pub required: bool,
}

impl FieldSpec {
    pub fn required(name: impl Into<String>, kind: FieldKind) -> Self {
        Self { name: name.into(), kind, required: true }
    }

    pub fn optional(name: impl Into<String>, kind: FieldKind) -> Self {
        Self { name: name.into(), kind, required: false }
    }
}

/// Ordered set of field specifications consumed by the validator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordSchema {
    fields: Vec<FieldSpec>,
}

impl RecordSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn require(self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.field(FieldSpec::required(name, kind))
    }

    pub fn optional(self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.field(FieldSpec::optional(name, kind))
    }

    /// Add a field. A later spec with the same name replaces the earlier one.
    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.fields.retain(|f| f.name != spec.name);
        self.fields.push(spec);
        self
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_order_and_replacement() {
        let schema = RecordSchema::new()
            .require("entity", FieldKind::Uri)
            .optional("genreLabel", FieldKind::Literal)
            .require("genreLabel", FieldKind::Literal);

        let names: Vec<&str> = schema.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["entity", "genreLabel"]);
        assert!(schema.get("genreLabel").unwrap().required);
    }
}
