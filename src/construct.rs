use crate::annotation::{Event, Feature};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Base counts of a finished construct, reported in the manifest so
/// downstream analysis can sanity-check composition without rescanning
/// the FASTA.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseComposition {
    pub a: usize,
    pub c: usize,
    pub g: usize,
    pub t: usize,
}

impl BaseComposition {
    pub fn from_sequence(sequence: &[u8]) -> Self {
        let mut ret = Self::default();
        for base in sequence {
            match base.to_ascii_uppercase() {
                b'A' => ret.a += 1,
                b'C' => ret.c += 1,
                b'G' => ret.g += 1,
                b'T' => ret.t += 1,
                _ => {}
            }
        }
        ret
    }

    pub fn total(&self) -> usize {
        self.a + self.c + self.g + self.t
    }

    pub fn gc_fraction(&self) -> f32 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        (self.c + self.g) as f32 / total as f32
    }
}

/// The final output of one assembly: a sequence of exact target length
/// plus its ordered feature and event annotations. Immutable once built.
#[derive(Clone, Debug)]
pub struct Construct {
    sequence: Vec<u8>,
    features: Vec<Feature>,
    events: Vec<Event>,
}

impl Construct {
    pub fn new(sequence: Vec<u8>, features: Vec<Feature>, events: Vec<Event>) -> Self {
        Self {
            sequence,
            features,
            events,
        }
    }

    #[inline(always)]
    pub fn sequence(&self) -> &[u8] {
        &self.sequence
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// The bytes a feature annotates. `None` if the span lies outside the
    /// sequence, which would indicate a corrupted annotation.
    pub fn feature_bytes(&self, feature: &Feature) -> Option<&[u8]> {
        if feature.start > feature.end || feature.end > self.sequence.len() {
            return None;
        }
        Some(&self.sequence[feature.start..feature.end])
    }

    pub fn composition(&self) -> BaseComposition {
        BaseComposition::from_sequence(&self.sequence)
    }

    pub fn get_forward_string(&self) -> String {
        String::from_utf8_lossy(&self.sequence).to_string()
    }
}

impl fmt::Display for Construct {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.sequence))
    }
}
