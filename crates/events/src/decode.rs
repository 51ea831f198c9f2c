//! Lenient boundary decoder for violation messages.
//!
//! Two failure granularities:
//!
//! - **Batch-level** (`ValidationError`): the header is unusable (no jurisdiction,
//!   bad frame range, wrong schema). Nothing in the batch is processed.
//! - **Entry-level** (`SkippedEntry`): one person entry is malformed. It is dropped
//!   and reported; every other entry is decoded normally.
//!
//! Legacy `violation_frame.v1` bodies are migrated to the canonical batch here.

use std::collections::BTreeSet;

use serde_json::{Map, Value as JsonValue};

use siteguard_core::{PersonId, ValidationError, ValidationResult};

use crate::model::{MissingItem, Violation, ViolationBatch};
use crate::schema::Schema;

/// Structurally validated header of a violation message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchHeader {
    pub schema: Schema,
    pub frame_start: u64,
    pub frame_end: u64,
    pub state: String,
    /// Caller-supplied person count; `None` when the message omits it.
    pub persons: Option<u32>,
    /// Number of raw person entries (before entry-level validation).
    pub entries: usize,
    /// Distinct well-formed `person_id`s among the raw entries.
    pub distinct_persons: u32,
}

impl BatchHeader {
    /// `false` when a supplied `persons` count disagrees with the entries.
    pub fn persons_consistent(&self) -> bool {
        self.persons.is_none_or(|p| p == self.distinct_persons)
    }
}

/// A person entry dropped by the decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    /// Position of the entry in the incoming `violations` array.
    pub index: usize,
    pub reason: String,
}

/// Decoded value plus the entries that had to be skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded<T> {
    pub value: T,
    pub skipped: Vec<SkippedEntry>,
}

/// Validate only the header of a violation message.
pub fn decode_header(schema: Schema, body: &JsonValue) -> ValidationResult<BatchHeader> {
    let obj = body.as_object().ok_or(ValidationError::NotAnObject)?;

    let (frame_start, frame_end, persons) = match schema {
        Schema::ViolationFrameV1 => {
            let frame_id = required_u64(obj, "frame_id")?;
            (frame_id, frame_id, None)
        }
        Schema::ViolationBatchV2 => {
            let start = required_u64(obj, "frame_start")?;
            let end = required_u64(obj, "frame_end")?;
            if end < start {
                return Err(ValidationError::FrameRange { start, end });
            }
            (start, end, optional_u32(obj, "persons")?)
        }
        Schema::EnrichedBatchV2 => {
            return Err(ValidationError::unexpected_schema(
                "a violation schema",
                schema.as_str(),
            ));
        }
    };

    let state = required_state(obj)?;
    let raw_entries = violation_entries(obj)?;
    let distinct_persons = raw_entries
        .iter()
        .filter_map(|e| e.get("person_id").and_then(JsonValue::as_u64))
        .collect::<BTreeSet<_>>()
        .len();

    Ok(BatchHeader {
        schema,
        frame_start,
        frame_end,
        state,
        persons,
        entries: raw_entries.len(),
        distinct_persons: u32::try_from(distinct_persons).unwrap_or(u32::MAX),
    })
}

/// Decode a violation message into the canonical batch.
///
/// When the message carries no `persons` count (always the case for v1), it is
/// derived from the successfully decoded entries.
pub fn decode_violations(
    schema: Schema,
    body: &JsonValue,
) -> ValidationResult<Decoded<ViolationBatch>> {
    let header = decode_header(schema, body)?;
    let obj = body.as_object().ok_or(ValidationError::NotAnObject)?;

    let mut violations = Vec::with_capacity(header.entries);
    let mut skipped = Vec::new();
    for (index, entry) in violation_entries(obj)?.iter().enumerate() {
        match decode_entry(entry) {
            Ok(violation) => violations.push(violation),
            Err(reason) => skipped.push(SkippedEntry { index, reason }),
        }
    }

    let mut batch = ViolationBatch::new(
        header.frame_start,
        header.frame_end,
        header.state,
        violations,
    );
    if let Some(persons) = header.persons {
        batch.persons = persons;
    }

    Ok(Decoded {
        value: batch,
        skipped,
    })
}

fn required_state(obj: &Map<String, JsonValue>) -> ValidationResult<String> {
    match obj.get("state") {
        None | Some(JsonValue::Null) => Err(ValidationError::missing("state")),
        Some(JsonValue::String(s)) if s.trim().is_empty() => {
            Err(ValidationError::invalid("state", "cannot be blank"))
        }
        Some(JsonValue::String(s)) => Ok(s.clone()),
        Some(other) => Err(ValidationError::invalid(
            "state",
            format!("expected a string, found {}", kind(other)),
        )),
    }
}

fn required_u64(obj: &Map<String, JsonValue>, field: &'static str) -> ValidationResult<u64> {
    match obj.get(field) {
        None | Some(JsonValue::Null) => Err(ValidationError::missing(field)),
        Some(value) => value.as_u64().ok_or_else(|| not_a_count(field, value)),
    }
}

fn optional_u32(
    obj: &Map<String, JsonValue>,
    field: &'static str,
) -> ValidationResult<Option<u32>> {
    match obj.get(field) {
        None | Some(JsonValue::Null) => Ok(None),
        Some(value) => value
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| not_a_count(field, value)),
    }
}

fn not_a_count(field: &'static str, value: &JsonValue) -> ValidationError {
    ValidationError::invalid(field, format!("expected a non-negative integer, found {value}"))
}

fn violation_entries(obj: &Map<String, JsonValue>) -> ValidationResult<&[JsonValue]> {
    match obj.get("violations") {
        None | Some(JsonValue::Null) => Ok(&[]),
        Some(JsonValue::Array(entries)) => Ok(entries.as_slice()),
        Some(other) => Err(ValidationError::invalid(
            "violations",
            format!("expected an array, found {}", kind(other)),
        )),
    }
}

fn decode_entry(entry: &JsonValue) -> Result<Violation, String> {
    let obj = entry
        .as_object()
        .ok_or_else(|| format!("entry must be an object, found {}", kind(entry)))?;

    let person_id = match obj.get("person_id") {
        None | Some(JsonValue::Null) => return Err("missing `person_id`".to_string()),
        Some(value) => value
            .as_u64()
            .map(PersonId::new)
            .ok_or_else(|| format!("`person_id` must be a non-negative integer, found {value}"))?,
    };

    let items = match obj.get("missing") {
        None | Some(JsonValue::Null) => return Err("missing `missing`".to_string()),
        Some(JsonValue::Array(items)) => items,
        Some(other) => return Err(format!("`missing` must be an array, found {}", kind(other))),
    };

    let missing = items
        .iter()
        .enumerate()
        .map(|(i, item)| decode_item(item).map_err(|reason| format!("missing[{i}]: {reason}")))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Violation::new(person_id, missing))
}

fn decode_item(value: &JsonValue) -> Result<MissingItem, String> {
    let text = match value {
        JsonValue::Object(record) => match record.get("item") {
            Some(JsonValue::String(s)) => s.clone(),
            Some(JsonValue::Number(n)) => n.to_string(),
            Some(other) => return Err(format!("`item` must be a string, found {}", kind(other))),
            None => return Err("record has no `item`".to_string()),
        },
        JsonValue::String(s) => s.clone(),
        JsonValue::Number(n) => n.to_string(),
        other => return Err(format!("unsupported item {}", kind(other))),
    };
    MissingItem::new(text).map_err(|e| e.to_string())
}

fn kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}
