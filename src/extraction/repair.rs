//! Decoding of SPARQL JSON responses, with progressively more lenient repair passes
//!
//! Wikidata occasionally returns bodies that are not valid JSON: raw control characters
//! inside labels, or backslashes that do not start an escape sequence. When the strict
//! decode fails, [`ResponseRepair`] tries these passes in order, each one applying the
//! previous transformations plus its own:
//!
//! 1. [`RepairPass::StripControl`]: replace runs of control characters
//!    (`U+0000..=U+001F`, `U+007F..=U+009F`) with a space, then decode strictly.
//! 2. [`RepairPass::StripStrayBackslashes`]: also drop backslashes that do not begin a
//!    valid JSON escape, then decode strictly.
//! 3. [`RepairPass::Lenient`]: also collapse newlines and carriage returns to spaces, then
//!    decode leniently. Malformed bindings are dropped one by one instead of failing the
//!    whole document.
//!
//! The first pass that decodes wins; later passes are never run.

use regex::Regex;
use serde_json::Value;
use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;

use crate::extraction::record::{RawRecord, SparqlResults};

/// Response body could not be decoded into result bindings.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("failed to decode response body: {0}")]
pub struct DecodeError(pub String);

impl From<serde_json::Error> for DecodeError {
    fn from(err: serde_json::Error) -> Self {
        DecodeError(err.to_string())
    }
}

/// Decode a body strictly: valid JSON, `results.bindings` present, every binding well-formed.
pub fn decode_strict(body: &str) -> Result<Vec<RawRecord>, DecodeError> {
    let document: SparqlResults = serde_json::from_str(body)?;
    Ok(document.results.bindings)
}

/// Decode a body leniently: the document must be valid JSON with a `results.bindings`
/// array, but bindings that do not have the expected shape are skipped.
///
/// Returns the decoded records and the number of bindings dropped.
pub fn decode_lenient(body: &str) -> Result<(Vec<RawRecord>, usize), DecodeError> {
    let document: Value = serde_json::from_str(body)?;
    let bindings = document
        .get("results")
        .and_then(|results| results.get("bindings"))
        .and_then(Value::as_array)
        .ok_or_else(|| DecodeError("missing results.bindings array".to_string()))?;

    let mut records = Vec::with_capacity(bindings.len());
    let mut dropped = 0;
    for binding in bindings {
        match serde_json::from_value::<RawRecord>(binding.clone()) {
            Ok(record) => records.push(record),
            Err(_) => dropped += 1,
        }
    }
    Ok((records, dropped))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairPass {
    StripControl,
    StripStrayBackslashes,
    Lenient,
}

impl fmt::Display for RepairPass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepairPass::StripControl => f.write_str("strip-control"),
            RepairPass::StripStrayBackslashes => f.write_str("strip-stray-backslashes"),
            RepairPass::Lenient => f.write_str("lenient"),
        }
    }
}

/// Result of a successful repair.
#[derive(Debug, Clone, PartialEq)]
pub struct RepairOutcome {
    pub records: Vec<RawRecord>,
    /// The pass that produced `records`
    pub pass: RepairPass,
    /// Every pass that ran, in order. The last element is `pass`.
    pub attempted: Vec<RepairPass>,
    /// Bindings skipped by the lenient pass
    pub dropped_bindings: usize,
}

/// Ordered fallback passes applied when [`decode_strict`] fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseRepair;

impl ResponseRepair {
    pub fn new() -> Self {
        Self
    }

    /// Try each pass in turn on `body`. Fails only when all passes fail; the error
    /// carries the message of the last one.
    pub fn repair(&self, body: &str) -> Result<RepairOutcome, DecodeError> {
        let mut attempted = Vec::with_capacity(3);

        attempted.push(RepairPass::StripControl);
        let without_control = strip_control_characters(body);
        if let Ok(records) = decode_strict(&without_control) {
            return Ok(RepairOutcome {
                records,
                pass: RepairPass::StripControl,
                attempted,
                dropped_bindings: 0,
            });
        }

        attempted.push(RepairPass::StripStrayBackslashes);
        let without_backslashes = strip_stray_backslashes(&without_control);
        if let Ok(records) = decode_strict(&without_backslashes) {
            return Ok(RepairOutcome {
                records,
                pass: RepairPass::StripStrayBackslashes,
                attempted,
                dropped_bindings: 0,
            });
        }

        attempted.push(RepairPass::Lenient);
        let single_line = collapse_newlines(&without_backslashes);
        let (records, dropped_bindings) = decode_lenient(&single_line)?;
        Ok(RepairOutcome { records, pass: RepairPass::Lenient, attempted, dropped_bindings })
    }
}

fn control_characters() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"[\x00-\x1F\x7F-\x9F]+").expect("control character pattern is valid")
    })
}

/// Replace each run of C0/C1 control characters with a single space.
pub fn strip_control_characters(text: &str) -> String {
    control_characters().replace_all(text, " ").into_owned()
}

/// Drop backslashes that do not start one of JSON's escapes
/// (`\" \\ \/ \b \f \n \r \t \uXXXX`). A valid escape is copied as a unit, so the
/// second backslash of `\\` is never inspected on its own.
pub fn strip_stray_backslashes(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;

    while let Some(pos) = text[cursor..].find('\\') {
        let at = cursor + pos;
        out.push_str(&text[cursor..at]);

        let escape_len = match bytes.get(at + 1) {
            Some(b'"' | b'\\' | b'/' | b'b' | b'f' | b'n' | b'r' | b't') => 2,
            Some(b'u')
                if bytes
                    .get(at + 2..at + 6)
                    .map_or(false, |hex| hex.iter().all(u8::is_ascii_hexdigit)) =>
            {
                6
            }
            _ => 0,
        };

        out.push_str(&text[at..at + escape_len]);
        cursor = at + escape_len.max(1);
    }

    out.push_str(&text[cursor..]);
    out
}

fn collapse_newlines(text: &str) -> String {
    text.replace(['\n', '\r'], " ")
}
