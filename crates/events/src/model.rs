use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use siteguard_core::{PersonId, ValidationError};

/// A required safety item (or hazard code) found absent for a person.
///
/// Upstream detectors send either a record (`{"item": "hardhat"}`) or a bare value
/// (`"hardhat"`); both deserialize into this one shape. Always serializes as the record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawMissingItem")]
pub struct MissingItem {
    item: String,
}

impl MissingItem {
    /// Create an item; blank codes are rejected.
    pub fn new(item: impl Into<String>) -> Result<Self, ValidationError> {
        let item = item.into();
        if item.trim().is_empty() {
            return Err(ValidationError::invalid("item", "cannot be blank"));
        }
        Ok(Self { item })
    }

    pub fn item(&self) -> &str {
        &self.item
    }
}

/// Wire representations accepted for a missing item.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawMissingItem {
    Record { item: String },
    NumericRecord { item: serde_json::Number },
    Text(String),
    Number(serde_json::Number),
}

impl TryFrom<RawMissingItem> for MissingItem {
    type Error = ValidationError;

    fn try_from(raw: RawMissingItem) -> Result<Self, Self::Error> {
        match raw {
            RawMissingItem::Record { item } | RawMissingItem::Text(item) => MissingItem::new(item),
            RawMissingItem::NumericRecord { item: n } | RawMissingItem::Number(n) => {
                MissingItem::new(n.to_string())
            }
        }
    }
}

/// All missing items observed for one person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub person_id: PersonId,
    pub missing: Vec<MissingItem>,
}

impl Violation {
    pub fn new(person_id: impl Into<PersonId>, missing: Vec<MissingItem>) -> Self {
        Self {
            person_id: person_id.into(),
            missing,
        }
    }
}

/// Violations observed across a contiguous frame range (canonical, schema v2).
///
/// `persons` is caller-supplied and advisory: it should equal the number of distinct
/// `person_id`s, but nothing downstream recomputes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViolationBatch {
    pub frame_start: u64,
    pub frame_end: u64,
    pub state: String,
    pub persons: u32,
    pub violations: Vec<Violation>,
}

impl ViolationBatch {
    /// Build a batch whose `persons` count is derived from `violations`.
    pub fn new(
        frame_start: u64,
        frame_end: u64,
        state: impl Into<String>,
        violations: Vec<Violation>,
    ) -> Self {
        let persons = distinct_persons(&violations);
        Self {
            frame_start,
            frame_end,
            state: state.into(),
            persons,
            violations,
        }
    }

    /// Number of distinct `person_id` values present in `violations`.
    pub fn distinct_persons(&self) -> u32 {
        distinct_persons(&self.violations)
    }

    /// Whether the advisory `persons` count agrees with the violations.
    pub fn persons_consistent(&self) -> bool {
        self.persons == self.distinct_persons()
    }

    /// Total number of missing items across every person.
    pub fn item_count(&self) -> usize {
        self.violations.iter().map(|v| v.missing.len()).sum()
    }
}

/// Legacy single-frame violation report (schema v1).
///
/// Kept only as an inbound shape: it migrates to a `ViolationBatch` at the decoder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameReport {
    pub frame_id: u64,
    pub state: String,
    pub violations: Vec<Violation>,
}

impl FrameReport {
    /// Build a report from per-person detections (`person_id -> [item codes]`).
    ///
    /// Blank item codes are dropped.
    pub fn from_detections<I, S>(frame_id: u64, state: impl Into<String>, detections: I) -> Self
    where
        I: IntoIterator<Item = (PersonId, Vec<S>)>,
        S: Into<String>,
    {
        let violations = detections
            .into_iter()
            .map(|(person_id, items)| {
                let missing = items
                    .into_iter()
                    .filter_map(|i| MissingItem::new(i).ok())
                    .collect();
                Violation::new(person_id, missing)
            })
            .collect();

        Self {
            frame_id,
            state: state.into(),
            violations,
        }
    }

    /// Migrate to the canonical batch shape: a one-frame range, persons derived.
    pub fn into_batch(self) -> ViolationBatch {
        ViolationBatch::new(self.frame_id, self.frame_id, self.state, self.violations)
    }
}

impl From<FrameReport> for ViolationBatch {
    fn from(report: FrameReport) -> Self {
        report.into_batch()
    }
}

/// A missing item augmented with regulatory text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedItem {
    pub item: String,
    pub rule: String,
    pub consequence: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedViolation {
    pub person_id: PersonId,
    pub missing: Vec<EnrichedItem>,
}

/// A `ViolationBatch` after enrichment. Header fields are copied, never recomputed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedBatch {
    pub frame_start: u64,
    pub frame_end: u64,
    pub state: String,
    pub persons: u32,
    pub violations: Vec<EnrichedViolation>,
}

impl EnrichedBatch {
    /// Every `(person, item)` pair in batch order.
    pub fn items(&self) -> impl Iterator<Item = (PersonId, &EnrichedItem)> + '_ {
        self.violations
            .iter()
            .flat_map(|v| v.missing.iter().map(move |item| (v.person_id, item)))
    }

    pub fn item_count(&self) -> usize {
        self.violations.iter().map(|v| v.missing.len()).sum()
    }
}

fn distinct_persons(violations: &[Violation]) -> u32 {
    let ids: BTreeSet<PersonId> = violations.iter().map(|v| v.person_id).collect();
    u32::try_from(ids.len()).unwrap_or(u32::MAX)
}
