use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Free-form provenance attached to features and events (module name,
/// orientation, repeat index, copy count). Kept as a JSON object so the
/// manifest layout stays flat for downstream analysis.
pub type Metadata = serde_json::Map<String, Value>;

/// A labeled half-open span `[start, end)` of the final sequence. Features
/// are append-only and ordered by creation; a zero-width feature
/// (`start == end`) marks an input that was deliberately absent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub label: String,
    pub start: usize,
    pub end: usize,
    #[serde(flatten)]
    pub metadata: Metadata,
}

impl Feature {
    pub fn new(label: &str, start: usize, end: usize, metadata: Metadata) -> Self {
        Self {
            label: label.to_string(),
            start,
            end,
            metadata,
        }
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// A discrete, positionless annotation pinned to the cursor at record time.
/// Documents structural deviations (anchor inversion, spacer deletion,
/// relocation) that are not themselves sequence content.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub event: String,
    pub position: usize,
    #[serde(flatten)]
    pub metadata: Metadata,
}

impl Event {
    pub fn new(event: &str, position: usize, metadata: Metadata) -> Self {
        Self {
            event: event.to_string(),
            position,
            metadata,
        }
    }
}
