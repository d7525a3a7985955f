use crate::error::AssemblyError;
use crate::nucleotide;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Placement orientation of a module. Forward is the module's own sequence,
/// reverse is its reverse-complement. Orientation is requested at placement
/// time and never stored on the module itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Orientation {
    #[serde(rename = "+")]
    Forward,
    #[serde(rename = "-")]
    Reverse,
}

impl Orientation {
    pub fn parse(symbol: &str) -> Result<Self, AssemblyError> {
        match symbol {
            "+" => Ok(Orientation::Forward),
            "-" => Ok(Orientation::Reverse),
            other => Err(AssemblyError::UnknownOrientation(other.to_string())),
        }
    }

    #[inline(always)]
    pub fn symbol(&self) -> &'static str {
        match self {
            Orientation::Forward => "+",
            Orientation::Reverse => "-",
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// A named, immutable biological part: enhancer module, promoter, CTCF
/// motif. Loaded once per run, never mutated afterwards.
#[derive(Clone, Debug)]
pub struct Module {
    name: String,
    sequence: Vec<u8>,
}

impl Module {
    pub fn new(name: &str, sequence: &str) -> Self {
        Self {
            name: name.to_string(),
            sequence: nucleotide::normalize(sequence),
        }
    }

    #[inline(always)]
    pub fn name(&self) -> &str {
        &self.name
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

    /// Oriented view of the part. The reverse-complement is recomputed per
    /// call; callers place the result immediately.
    pub fn oriented(&self, orientation: Orientation) -> Vec<u8> {
        match orientation {
            Orientation::Forward => self.sequence.clone(),
            Orientation::Reverse => nucleotide::reverse_complement(&self.sequence),
        }
    }
}

/// Holds all parts a recipe run can address by name.
#[derive(Clone, Debug, Default)]
pub struct PartRegistry {
    modules: HashMap<String, Module>,
}

impl PartRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, module: Module) {
        self.modules.insert(module.name().to_string(), module);
    }

    pub fn get(&self, name: &str) -> Result<&Module, AssemblyError> {
        self.modules
            .get(name)
            .ok_or_else(|| AssemblyError::UnknownModule(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// The §4.1 contract: look a module up and produce its oriented
    /// sequence from a raw symbol.
    pub fn orient(&self, name: &str, symbol: &str) -> Result<Vec<u8>, AssemblyError> {
        let module = self.get(name)?;
        let orientation = Orientation::parse(symbol)?;
        Ok(module.oriented(orientation))
    }
}
