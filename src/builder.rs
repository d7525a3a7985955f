use crate::annotation::{Event, Feature, Metadata};
use crate::construct::Construct;
use crate::error::AssemblyError;
use crate::filler::FillerCycler;
use crate::part::{Module, Orientation};
use serde_json::json;

/// Label used for the padding span `finish()` appends after the last
/// placed part.
pub const DOWNSTREAM_FILLER_LABEL: &str = "downstream_filler";

/// Incrementally assembles one construct while tracking annotations.
///
/// The builder is a one-shot state machine: it accepts appends while
/// active, and every operation fails with `BuilderFinalized` once
/// `finish()` has run. The write cursor only ever moves forward; recipes
/// whose coordinate arithmetic would move it backward fail loudly instead
/// of corrupting the layout.
#[derive(Debug)]
pub struct SequenceBuilder {
    sequence: Vec<u8>,
    cursor: usize,
    filler: FillerCycler,
    features: Vec<Feature>,
    events: Vec<Event>,
    finished: bool,
}

impl SequenceBuilder {
    pub fn new(filler: FillerCycler) -> Self {
        Self {
            sequence: Vec::new(),
            cursor: 0,
            filler,
            features: Vec::new(),
            events: Vec::new(),
            finished: false,
        }
    }

    /// Builder with the output buffer sized up front for a known target
    /// length, avoiding reallocation across a megabase of appends.
    pub fn with_capacity(filler: FillerCycler, capacity: usize) -> Self {
        let mut ret = Self::new(filler);
        ret.sequence.reserve_exact(capacity);
        ret
    }

    #[inline(always)]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    fn ensure_active(&self) -> Result<(), AssemblyError> {
        if self.finished {
            return Err(AssemblyError::BuilderFinalized);
        }
        Ok(())
    }

    /// Writes `bytes` at the cursor and advances it. With a label, records
    /// a feature spanning the written bytes; empty `bytes` with a label
    /// records a zero-width feature marking a deliberately absent part.
    pub fn append_sequence(
        &mut self,
        bytes: &[u8],
        label: Option<&str>,
        metadata: Metadata,
    ) -> Result<(), AssemblyError> {
        self.ensure_active()?;
        let start = self.cursor;
        self.sequence.extend_from_slice(bytes);
        self.cursor += bytes.len();
        if let Some(label) = label {
            self.features
                .push(Feature::new(label, start, self.cursor, metadata));
        }
        Ok(())
    }

    /// Draws `length` bases from the filler cycler and appends them. A
    /// zero-length draw is a no-op and records nothing.
    pub fn append_filler(&mut self, length: usize, label: Option<&str>) -> Result<(), AssemblyError> {
        self.ensure_active()?;
        if length == 0 {
            return Ok(());
        }
        let bytes = self.filler.take(length);
        self.append_sequence(&bytes, label, Metadata::new())
    }

    /// Orients the module, appends it, and augments the metadata with the
    /// module name and orientation for provenance.
    pub fn append_module(
        &mut self,
        module: &Module,
        orientation: Orientation,
        label: &str,
        mut metadata: Metadata,
    ) -> Result<(), AssemblyError> {
        self.ensure_active()?;
        let bytes = module.oriented(orientation);
        metadata.insert("module".to_string(), json!(module.name()));
        metadata.insert("orientation".to_string(), json!(orientation.symbol()));
        self.append_sequence(&bytes, Some(label), metadata)
    }

    /// `copies` tandem copies of the module as one contiguous block,
    /// recorded as a single feature carrying `copies` and `unit_length` so
    /// downstream analysis never re-derives the count from span lengths.
    pub fn append_module_block(
        &mut self,
        module: &Module,
        orientation: Orientation,
        copies: usize,
        label: &str,
        mut metadata: Metadata,
    ) -> Result<(), AssemblyError> {
        self.ensure_active()?;
        let block = module.oriented(orientation).repeat(copies);
        metadata.insert("module".to_string(), json!(module.name()));
        metadata.insert("orientation".to_string(), json!(orientation.symbol()));
        metadata.insert("copies".to_string(), json!(copies));
        metadata.insert("unit_length".to_string(), json!(module.len()));
        self.append_sequence(&block, Some(label), metadata)
    }

    /// Pads with filler up to `target`. The backward check here is the
    /// runtime guard against recipe coordinate errors (a stacked block
    /// overflowing into a reserved position).
    pub fn append_to(&mut self, target: usize) -> Result<(), AssemblyError> {
        self.ensure_active()?;
        if target < self.cursor {
            return Err(AssemblyError::BackwardPlacement {
                target,
                cursor: self.cursor,
            });
        }
        self.append_filler(target - self.cursor, None)
    }

    /// Pins a positionless event annotation to the current cursor.
    pub fn record_event(&mut self, name: &str, metadata: Metadata) -> Result<(), AssemblyError> {
        self.ensure_active()?;
        self.events.push(Event::new(name, self.cursor, metadata));
        Ok(())
    }

    /// Pads the remainder with filler up to `target_length`, records the
    /// padding span, and returns the completed construct. The builder is
    /// finished afterwards; further operations fail.
    pub fn finish(&mut self, target_length: usize) -> Result<Construct, AssemblyError> {
        self.ensure_active()?;
        if self.cursor > target_length {
            return Err(AssemblyError::ConstructOverflow {
                cursor: self.cursor,
                limit: target_length,
                context: "Construct exceeds target length".to_string(),
            });
        }
        let padding = target_length - self.cursor;
        if padding > 0 {
            self.append_filler(padding, Some(DOWNSTREAM_FILLER_LABEL))?;
        }
        self.finished = true;
        Ok(Construct::new(
            std::mem::take(&mut self.sequence),
            std::mem::take(&mut self.features),
            std::mem::take(&mut self.events),
        ))
    }
}
