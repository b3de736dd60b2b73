//! Record validation against a [`RecordSchema`]
//!
//! Validation is pure and scoped to a single record: the caller logs and skips a failed
//! record and carries on with the rest of the batch.

use thiserror::Error;

use crate::extraction::record::{RawRecord, RawValue, TypedValue, ValidRecord, ValueKind};
use crate::extraction::schema::{FieldKind, RecordSchema};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordValidationError {
    #[error("missing required field '{0}'")]
    MissingField(String),

    #[error("field '{field}' must be a {expected}, got {found}")]
    WrongKind { field: String, expected: FieldKind, found: ValueKind },

    #[error("field '{0}' does not contain an entity identifier")]
    EmptyIdentifier(String),
}

/// Check `record` against `schema` and produce its typed form.
///
/// Required fields must be present with the declared kind. Optional fields that are
/// missing, or present with another kind, resolve to an explicit absence.
/// Fields not named by the schema are ignored.
pub fn validate(
    record: &RawRecord,
    schema: &RecordSchema,
) -> Result<ValidRecord, RecordValidationError> {
    let mut valid = ValidRecord::default();

    for spec in schema.fields() {
        let typed = match record.get(&spec.name) {
            Some(raw) => match typed_value(raw, spec.kind) {
                Some(value) => Some(value),
                None if spec.required => {
                    return Err(RecordValidationError::WrongKind {
                        field: spec.name.clone(),
                        expected: spec.kind,
                        found: raw.value_kind(),
                    })
                }
                None => None,
            },
            None if spec.required => {
                return Err(RecordValidationError::MissingField(spec.name.clone()))
            }
            None => None,
        };
        valid.insert(&spec.name, typed);
    }

    Ok(valid)
}

fn typed_value(raw: &RawValue, expected: FieldKind) -> Option<TypedValue> {
    match (expected, raw.value_kind()) {
        (FieldKind::Uri, ValueKind::Uri) => Some(TypedValue::Uri(raw.value.clone())),
        (FieldKind::Literal, ValueKind::Literal) => Some(TypedValue::Literal {
            text: raw.value.clone(),
            language: raw.language.clone(),
            datatype: raw.datatype.clone(),
        }),
        _ => None,
    }
}
