use std::sync::Arc;

use serde_json::Value as JsonValue;

use siteguard_core::ValidationResult;
use siteguard_events::{
    EnrichedBatch, EnrichedItem, EnrichedViolation, Schema, SkippedEntry, ViolationBatch,
    decode_violations,
};

use crate::catalog::RuleCatalog;

/// Result of enriching an encoded violation message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enrichment {
    pub batch: EnrichedBatch,
    /// Person entries the decoder dropped as malformed.
    pub skipped: Vec<SkippedEntry>,
    /// Items that matched no rule and carry the sentinel text.
    pub fallbacks: usize,
}

/// Augments violation batches with regulatory text.
///
/// Deterministic and stateless apart from the injected catalog:
/// - every missing item yields exactly one enriched item (misses use sentinels)
/// - person and item order is preserved
/// - `frame_start`, `frame_end`, `state`, `persons` are copied unchanged
#[derive(Debug, Clone)]
pub struct Enricher {
    catalog: Arc<RuleCatalog>,
}

impl Enricher {
    pub fn new(catalog: Arc<RuleCatalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &RuleCatalog {
        &self.catalog
    }

    pub fn enrich(&self, batch: &ViolationBatch) -> EnrichedBatch {
        self.enrich_counted(batch).0
    }

    /// Decode (migrating legacy frames, skipping malformed entries) and enrich.
    ///
    /// Fails only when the batch header is unusable.
    pub fn enrich_message(&self, schema: Schema, body: &JsonValue) -> ValidationResult<Enrichment> {
        let decoded = decode_violations(schema, body)?;
        let (batch, fallbacks) = self.enrich_counted(&decoded.value);
        Ok(Enrichment {
            batch,
            skipped: decoded.skipped,
            fallbacks,
        })
    }

    fn enrich_counted(&self, batch: &ViolationBatch) -> (EnrichedBatch, usize) {
        let mut fallbacks = 0;
        let violations = batch
            .violations
            .iter()
            .map(|violation| EnrichedViolation {
                person_id: violation.person_id,
                missing: violation
                    .missing
                    .iter()
                    .map(|missing| {
                        let hit = self.catalog.lookup(&batch.state, missing.item());
                        if !hit.is_found() {
                            fallbacks += 1;
                        }
                        EnrichedItem {
                            item: missing.item().to_string(),
                            rule: hit.rule().to_string(),
                            consequence: hit.consequence().to_string(),
                        }
                    })
                    .collect(),
            })
            .collect();

        let enriched = EnrichedBatch {
            frame_start: batch.frame_start,
            frame_end: batch.frame_end,
            state: batch.state.clone(),
            persons: batch.persons,
            violations,
        };
        (enriched, fallbacks)
    }
}
