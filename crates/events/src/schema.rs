//! Versioned message contract.
//!
//! Every envelope carries exactly one `Schema` tag. Old shapes are never silently
//! reinterpreted as new ones: a v1 frame report stays tagged `violation_frame.v1`
//! until the decoder migrates it.

use core::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use siteguard_core::ValidationError;

use crate::model::{EnrichedBatch, FrameReport, ViolationBatch};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Schema {
    /// Legacy single-frame report keyed by `frame_id`.
    #[serde(rename = "violation_frame.v1")]
    ViolationFrameV1,
    /// Canonical batch keyed by `frame_start`/`frame_end`.
    #[serde(rename = "violation_batch.v2")]
    ViolationBatchV2,
    /// Enrichment result.
    #[serde(rename = "enriched_batch.v2")]
    EnrichedBatchV2,
}

impl Schema {
    pub const ALL: [Schema; 3] = [
        Schema::ViolationFrameV1,
        Schema::ViolationBatchV2,
        Schema::EnrichedBatchV2,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Schema::ViolationFrameV1 => "violation_frame.v1",
            Schema::ViolationBatchV2 => "violation_batch.v2",
            Schema::EnrichedBatchV2 => "enriched_batch.v2",
        }
    }

    /// Whether this schema carries raw (not yet enriched) violations.
    pub fn is_violation(&self) -> bool {
        matches!(self, Schema::ViolationFrameV1 | Schema::ViolationBatchV2)
    }
}

impl core::fmt::Display for Schema {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Schema {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Schema::ALL
            .into_iter()
            .find(|schema| schema.as_str() == s)
            .ok_or_else(|| ValidationError::unexpected_schema("a known schema", s))
    }
}

/// A payload type bound to one schema tag.
pub trait Contract:
    Serialize + DeserializeOwned + Clone + core::fmt::Debug + Send + Sync + 'static
{
    const SCHEMA: Schema;
}

impl Contract for FrameReport {
    const SCHEMA: Schema = Schema::ViolationFrameV1;
}

impl Contract for ViolationBatch {
    const SCHEMA: Schema = Schema::ViolationBatchV2;
}

impl Contract for EnrichedBatch {
    const SCHEMA: Schema = Schema::EnrichedBatchV2;
}
