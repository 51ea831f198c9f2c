//! Human-readable alert rendering.

use siteguard_events::EnrichedBatch;

const DEFAULT_TITLE: &str = "⚠️ Compliance Alert";

/// Renders enriched batches as alert text.
///
/// Output is deterministic: a header line naming the frame range, jurisdiction and
/// person count, then one numbered line per (person, item) in batch order.
///
/// A batch with no violations still renders its header, followed by
/// `No violations recorded.`, so every batch can be acknowledged downstream.
#[derive(Debug, Clone)]
pub struct AlertFormatter {
    title: String,
}

impl Default for AlertFormatter {
    fn default() -> Self {
        Self::new(DEFAULT_TITLE)
    }
}

impl AlertFormatter {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }

    pub fn format(&self, batch: &EnrichedBatch) -> String {
        let frames = if batch.frame_start == batch.frame_end {
            format!("Frame {}", batch.frame_start)
        } else {
            format!("Frames {}-{}", batch.frame_start, batch.frame_end)
        };
        let mut out = format!(
            "{} - {} | State: {} | Persons: {}\n",
            self.title, frames, batch.state, batch.persons
        );

        if batch.item_count() == 0 {
            out.push_str("No violations recorded.\n");
            return out;
        }

        for (n, (person_id, item)) in batch.items().enumerate() {
            out.push_str(&format!(
                "{}. 👤 Person {}: {} → {}, Consequence: {}\n",
                n + 1,
                person_id,
                item.item,
                item.rule,
                item.consequence
            ));
        }
        out
    }
}

/// Render with the default title.
pub fn format_alert(batch: &EnrichedBatch) -> String {
    AlertFormatter::default().format(batch)
}
